//! Host rendering surfaces. The engine paints through these and never
//! touches a UI toolkit directly.

use field_common::{FeatureId, FeatureRecord};
use renderer::{Color, Legend};

/// Tile-based map canvas holding the scalar-field features.
pub trait MapSurface: Send + 'static {
    /// Show `feature` filled with `color`, replacing any previous style.
    fn paint_feature(&mut self, feature: &FeatureRecord, color: Color);

    /// Remove a feature from the map (no data at the current time).
    fn hide_feature(&mut self, id: FeatureId);
}

/// Colorbar widget: title, gradient and tick labels.
pub trait LegendWidget: Send + 'static {
    fn show_legend(&mut self, legend: &Legend);
}
