//! Recording implementations of the host surfaces.
//!
//! Every recorder is cheap to clone; clones share the same log so a test can
//! hand one copy to the code under test and inspect another.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use field_common::{FeatureId, FeatureRecord, FieldError, FieldResult, Viewport};
use field_layers::{LegendWidget, MapSurface};
use playback::{FrameData, FrameSink, PlaybackView};
use renderer::{Color, Legend};

/// A call made on a [`RecordingSurface`].
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCall {
    Paint { id: FeatureId, color: Color },
    Hide(FeatureId),
    Legend(Legend),
}

/// Map surface and legend widget that record every call.
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    calls: Arc<Mutex<Vec<SurfaceCall>>>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<SurfaceCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn paints(&self) -> Vec<(FeatureId, Color)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                SurfaceCall::Paint { id, color } => Some((id, color)),
                _ => None,
            })
            .collect()
    }

    pub fn hides(&self) -> Vec<FeatureId> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                SurfaceCall::Hide(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn legends(&self) -> Vec<Legend> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                SurfaceCall::Legend(legend) => Some(legend),
                _ => None,
            })
            .collect()
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn push(&self, call: SurfaceCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl MapSurface for RecordingSurface {
    fn paint_feature(&mut self, feature: &FeatureRecord, color: Color) {
        self.push(SurfaceCall::Paint {
            id: feature.id,
            color,
        });
    }

    fn hide_feature(&mut self, id: FeatureId) {
        self.push(SurfaceCall::Hide(id));
    }
}

impl LegendWidget for RecordingSurface {
    fn show_legend(&mut self, legend: &Legend) {
        self.push(SurfaceCall::Legend(legend.clone()));
    }
}

/// A call made on a [`RecordingView`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    Slider(usize),
    Playing(bool),
    Loading(bool),
    Error(String),
}

/// Playback controls that record every update.
#[derive(Debug, Clone, Default)]
pub struct RecordingView {
    events: Arc<Mutex<Vec<ViewEvent>>>,
}

impl RecordingView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ViewEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn sliders(&self) -> Vec<usize> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ViewEvent::Slider(index) => Some(index),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ViewEvent::Error(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    /// Whether the spinner is showing after the last update.
    pub fn is_loading(&self) -> bool {
        self.events()
            .into_iter()
            .rev()
            .find_map(|e| match e {
                ViewEvent::Loading(loading) => Some(loading),
                _ => None,
            })
            .unwrap_or(false)
    }

    fn push(&self, event: ViewEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl PlaybackView for RecordingView {
    fn set_slider(&mut self, index: usize) {
        self.push(ViewEvent::Slider(index));
    }

    fn set_playing(&mut self, playing: bool) {
        self.push(ViewEvent::Playing(playing));
    }

    fn set_loading(&mut self, loading: bool) {
        self.push(ViewEvent::Loading(loading));
    }

    fn notify_error(&mut self, message: &str) {
        self.push(ViewEvent::Error(message.to_string()));
    }
}

/// Frame sink that records applied frames, viewports and teardowns.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    frames: Arc<Mutex<Vec<FrameData>>>,
    viewports: Arc<Mutex<Vec<Viewport>>>,
    teardowns: Arc<AtomicUsize>,
    fail_teardown: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `teardown` return an error, as a broken raster would.
    pub fn failing_teardown() -> Self {
        Self {
            fail_teardown: true,
            ..Self::default()
        }
    }

    pub fn frames(&self) -> Vec<FrameData> {
        self.frames.lock().unwrap().clone()
    }

    pub fn applied_indices(&self) -> Vec<usize> {
        self.frames().iter().map(|f| f.index).collect()
    }

    pub fn viewports(&self) -> Vec<Viewport> {
        self.viewports.lock().unwrap().clone()
    }

    pub fn teardowns(&self) -> usize {
        self.teardowns.load(Ordering::SeqCst)
    }
}

impl FrameSink for RecordingSink {
    fn apply_frame(&mut self, frame: &FrameData) -> FieldResult<()> {
        self.frames.lock().unwrap().push(frame.clone());
        Ok(())
    }

    fn viewport_changed(&mut self, viewport: &Viewport) -> FieldResult<()> {
        self.viewports.lock().unwrap().push(*viewport);
        Ok(())
    }

    fn teardown(&mut self) -> FieldResult<()> {
        self.teardowns.fetch_add(1, Ordering::SeqCst);
        if self.fail_teardown {
            return Err(FieldError::Render("raster already released".to_string()));
        }
        Ok(())
    }
}
