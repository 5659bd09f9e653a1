//! Color mapping and raster drawing for field visualization.
//!
//! - Value → color normalization (linear / logarithmic) over curated palettes
//! - Colorbar ticks, value labels and legend models
//! - Arrow glyphs for vector fields
//! - PNG encoding of raster surfaces

pub mod arrows;
pub mod colormap;
pub mod legend;
pub mod png;

pub use colormap::{color_for, Color, ColorMapper, ColorStop, Palette, PaletteKind, ScaleMode};
pub use legend::{colorbar_ticks, format_value, Legend};
