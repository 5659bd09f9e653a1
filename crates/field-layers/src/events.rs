//! Hover and click callbacks for scalar-field features.
//!
//! The engine only reports what is under the pointer; interpreting a click
//! (point query, path query) is up to the host.

use field_common::{FeatureId, FeatureRecord, Geometry};
use renderer::format_value;
use serde::Serialize;

/// The feature under the pointer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureEvent {
    pub id: FeatureId,
    pub geometry: Geometry,
    pub value: Option<f64>,
    /// Transient label text for the current value
    pub label: String,
}

impl FeatureEvent {
    /// Event for `feature`, labelled with the legend's precision.
    pub fn from_feature(feature: &FeatureRecord, min_diff: f64) -> Self {
        Self {
            id: feature.id,
            geometry: feature.geometry.clone(),
            value: feature.current_value,
            label: format_value(feature.current_value.unwrap_or(f64::NAN), min_diff),
        }
    }
}

pub type FeatureCallback = Box<dyn Fn(&FeatureEvent) + Send + Sync>;

/// Registered callbacks plus pointer state.
#[derive(Default)]
pub struct FeatureEvents {
    hover: Vec<FeatureCallback>,
    click: Vec<FeatureCallback>,
    hovered: Option<FeatureId>,
    inside_layer: bool,
}

impl FeatureEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_hover<F>(&mut self, callback: F)
    where
        F: Fn(&FeatureEvent) + Send + Sync + 'static,
    {
        self.hover.push(Box::new(callback));
    }

    pub fn on_click<F>(&mut self, callback: F)
    where
        F: Fn(&FeatureEvent) + Send + Sync + 'static,
    {
        self.click.push(Box::new(callback));
    }

    /// Pointer moved over `hit`. Hover callbacks fire when the pointer enters
    /// a feature; moving within the same feature is silent.
    pub fn pointer_move(&mut self, hit: Option<FeatureEvent>) -> Option<FeatureEvent> {
        let hit_id = hit.as_ref().map(|e| e.id);
        if hit_id == self.hovered {
            return None;
        }
        self.hovered = hit_id;

        let event = hit?;
        for callback in &self.hover {
            callback(&event);
        }
        Some(event)
    }

    /// Pointer clicked over `hit`. Sets the inside-layer flag and fires the
    /// click callbacks with the raw feature.
    pub fn pointer_click(&mut self, hit: Option<FeatureEvent>) -> Option<FeatureEvent> {
        self.inside_layer = hit.is_some();
        let event = hit?;
        for callback in &self.click {
            callback(&event);
        }
        Some(event)
    }

    /// Whether the last click landed on a feature of this layer.
    pub fn inside_layer(&self) -> bool {
        self.inside_layer
    }

    pub fn hovered(&self) -> Option<FeatureId> {
        self.hovered
    }

    /// Forget pointer state, e.g. after the layer was replaced.
    pub fn reset(&mut self) {
        self.hovered = None;
        self.inside_layer = false;
    }
}
