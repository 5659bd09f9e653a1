//! Frames and the seams between the controller, the data source and the view.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use field_common::{FieldError, FieldResult, VectorSample, Viewport};
use serde::{Deserialize, Serialize};

/// Data for one time index. Scalar and vector parts are loaded independently
/// and either may be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameData {
    pub index: usize,
    #[serde(default)]
    pub scalar: Option<Vec<Option<f64>>>,
    #[serde(default)]
    pub vectors: Option<Vec<VectorSample>>,
}

impl FrameData {
    pub fn scalar(index: usize, values: Vec<Option<f64>>) -> Self {
        Self {
            index,
            scalar: Some(values),
            vectors: None,
        }
    }

    pub fn vectors(index: usize, samples: Vec<VectorSample>) -> Self {
        Self {
            index,
            scalar: None,
            vectors: Some(samples),
        }
    }
}

/// Loads the frame at a time index.
#[async_trait]
pub trait FrameSource: Send + Sync + 'static {
    async fn load_frame(&self, index: usize) -> FieldResult<FrameData>;
}

#[async_trait]
impl<T: FrameSource + ?Sized> FrameSource for Arc<T> {
    async fn load_frame(&self, index: usize) -> FieldResult<FrameData> {
        (**self).load_frame(index).await
    }
}

/// Receives frames accepted by the controller.
pub trait FrameSink: Send + 'static {
    /// Swap the layers to a new frame.
    fn apply_frame(&mut self, frame: &FrameData) -> FieldResult<()>;

    /// Re-render for a new viewport (pan, zoom or resize).
    fn viewport_changed(&mut self, viewport: &Viewport) -> FieldResult<()>;

    /// Release rendering resources when the window closes.
    fn teardown(&mut self) -> FieldResult<()> {
        Ok(())
    }
}

/// Shared sinks let the host keep reading the layers while the controller
/// drives them.
impl<S: FrameSink> FrameSink for Arc<Mutex<S>> {
    fn apply_frame(&mut self, frame: &FrameData) -> FieldResult<()> {
        lock(self)?.apply_frame(frame)
    }

    fn viewport_changed(&mut self, viewport: &Viewport) -> FieldResult<()> {
        lock(self)?.viewport_changed(viewport)
    }

    fn teardown(&mut self) -> FieldResult<()> {
        lock(self)?.teardown()
    }
}

fn lock<S>(sink: &Mutex<S>) -> FieldResult<std::sync::MutexGuard<'_, S>> {
    sink.lock()
        .map_err(|_| FieldError::Internal("frame sink lock poisoned".to_string()))
}

/// Playback controls of the host UI: time slider, play button, spinner and
/// blocking notifications.
pub trait PlaybackView: Send + 'static {
    fn set_slider(&mut self, index: usize);
    fn set_playing(&mut self, playing: bool);
    fn set_loading(&mut self, loading: bool);
    fn notify_error(&mut self, message: &str);
}
