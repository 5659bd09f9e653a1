//! Headless host surfaces: an in-memory map of feature colors, a legend
//! holder and playback controls that report through tracing.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use field_common::{FeatureId, FeatureRecord};
use field_layers::{LegendWidget, MapSurface};
use playback::PlaybackView;
use renderer::{Color, Legend};
use tracing::{debug, error, info};

#[derive(Debug, Default)]
struct MapState {
    colors: BTreeMap<FeatureId, Color>,
    legend: Option<Legend>,
    repaints: u64,
}

/// Map surface that keeps the current color of every visible feature.
#[derive(Debug, Clone, Default)]
pub struct HeadlessMap {
    state: Arc<Mutex<MapState>>,
}

impl HeadlessMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Visible features and their CSS colors, by id.
    pub fn styles(&self) -> BTreeMap<FeatureId, String> {
        self.with_state(|s| s.colors.iter().map(|(id, c)| (*id, c.to_css())).collect())
    }

    pub fn legend(&self) -> Option<Legend> {
        self.with_state(|s| s.legend.clone())
    }

    pub fn repaints(&self) -> u64 {
        self.with_state(|s| s.repaints)
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut MapState) -> T) -> T {
        let mut guard = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }
}

impl MapSurface for HeadlessMap {
    fn paint_feature(&mut self, feature: &FeatureRecord, color: Color) {
        self.with_state(|s| {
            s.colors.insert(feature.id, color);
            s.repaints += 1;
        });
    }

    fn hide_feature(&mut self, id: FeatureId) {
        self.with_state(|s| {
            s.colors.remove(&id);
        });
    }
}

impl LegendWidget for HeadlessMap {
    fn show_legend(&mut self, legend: &Legend) {
        info!(
            title = %legend.title,
            ticks = ?legend.ticks.iter().map(|t| t.label.as_str()).collect::<Vec<_>>(),
            "Legend updated"
        );
        self.with_state(|s| s.legend = Some(legend.clone()));
    }
}

/// Playback controls rendered as log lines.
#[derive(Debug, Clone)]
pub struct ConsoleView {
    timestamps: Arc<Vec<String>>,
}

impl ConsoleView {
    pub fn new(timestamps: Vec<String>) -> Self {
        Self {
            timestamps: Arc::new(timestamps),
        }
    }

    fn label(&self, index: usize) -> &str {
        self.timestamps.get(index).map_or("?", String::as_str)
    }
}

impl PlaybackView for ConsoleView {
    fn set_slider(&mut self, index: usize) {
        info!(index = index, timestamp = %self.label(index), "Frame");
    }

    fn set_playing(&mut self, playing: bool) {
        info!(playing = playing, "Playback {}", if playing { "started" } else { "paused" });
    }

    fn set_loading(&mut self, loading: bool) {
        if loading {
            debug!("Loading frame");
        }
    }

    fn notify_error(&mut self, message: &str) {
        error!(error = %message, "Failed to load data");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use field_common::{GeoPoint, Geometry};

    #[test]
    fn test_map_tracks_visible_colors() {
        let mut map = HeadlessMap::new();
        let feature = FeatureRecord::new(3, Geometry::Point(GeoPoint::new(0.0, 0.0)));

        map.paint_feature(&feature, Color::rgb(255, 0, 0));
        let css = Color::rgb(255, 0, 0).to_css();
        assert_eq!(map.styles().get(&FeatureId(3)), Some(&css));

        map.hide_feature(FeatureId(3));
        assert!(map.styles().is_empty());
        assert_eq!(map.repaints(), 1);
    }

    #[test]
    fn test_console_view_labels() {
        let view = ConsoleView::new(vec!["2024-06-01T00:00:00Z".to_string()]);
        assert_eq!(view.label(0), "2024-06-01T00:00:00Z");
        assert_eq!(view.label(5), "?");
    }
}
