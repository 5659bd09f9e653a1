//! Vector-field layer: arrow glyphs drawn on a raster sized to the viewport.

use field_common::{FieldResult, VectorSample, Viewport};
use metrics::counter;
use renderer::arrows::{new_surface, ArrowGlyph, ArrowOutcome, ArrowStyle};
use renderer::png::encode_surface;
use renderer::ColorMapper;
use serde::Serialize;
use tiny_skia::Pixmap;
use tracing::debug;

/// Outcome of one raster pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VectorStats {
    pub drawn: usize,
    /// Samples projecting outside the raster
    pub skipped_outside: usize,
    /// Arrows shorter than the pixel floor
    pub skipped_short: usize,
}

pub struct VectorLayer {
    samples: Vec<VectorSample>,
    vmin: f64,
    vmax: f64,
    mapper: ColorMapper,
    /// Pixels per unit of `(u, v)`
    scale: f64,
    viewport: Viewport,
    glyph: ArrowGlyph,
    pixmap: Pixmap,
    stats: VectorStats,
}

impl VectorLayer {
    /// Allocate a raster for `viewport` and draw `samples` onto it.
    pub fn build(
        samples: Vec<VectorSample>,
        vmin: f64,
        vmax: f64,
        mapper: ColorMapper,
        scale: f64,
        viewport: Viewport,
    ) -> FieldResult<Self> {
        let mut layer = Self {
            samples,
            vmin,
            vmax,
            mapper,
            scale,
            viewport,
            glyph: ArrowGlyph::new(ArrowStyle::default())?,
            pixmap: new_surface(viewport.width, viewport.height)?,
            stats: VectorStats::default(),
        };
        layer.render();
        Ok(layer)
    }

    /// Re-render for a pan, zoom or resize. The raster is reallocated when
    /// the pixel size changes.
    pub fn set_viewport(&mut self, viewport: Viewport) -> FieldResult<VectorStats> {
        if viewport.width != self.pixmap.width() || viewport.height != self.pixmap.height() {
            self.pixmap = new_surface(viewport.width, viewport.height)?;
        }
        self.viewport = viewport;
        Ok(self.render())
    }

    /// Swap in the samples of another frame and re-render.
    pub fn set_frame(&mut self, samples: Vec<VectorSample>) -> VectorStats {
        self.samples = samples;
        self.render()
    }

    /// Replace samples and color domain together, keeping the raster.
    pub fn set_data(&mut self, samples: Vec<VectorSample>, vmin: f64, vmax: f64) -> VectorStats {
        self.samples = samples;
        self.vmin = vmin;
        self.vmax = vmax;
        self.render()
    }

    fn render(&mut self) -> VectorStats {
        self.pixmap.fill(tiny_skia::Color::TRANSPARENT);

        let mut stats = VectorStats::default();
        for sample in &self.samples {
            let (x, y) = self.viewport.project(sample.x, sample.y);
            if !self.viewport.contains_pixel(x, y) {
                stats.skipped_outside += 1;
                continue;
            }

            // Screen y grows downward, so north-pointing v flips sign.
            let dx = (sample.u * self.scale) as f32;
            let dy = (-sample.v * self.scale) as f32;
            let color = self.mapper.color_for(sample.color_source(), self.vmin, self.vmax);

            match self.glyph.draw(&mut self.pixmap, x as f32, y as f32, dx, dy, color) {
                ArrowOutcome::Drawn => stats.drawn += 1,
                ArrowOutcome::TooShort => stats.skipped_short += 1,
            }
        }

        counter!("vector_arrows_drawn_total").increment(stats.drawn as u64);
        debug!(
            drawn = stats.drawn,
            skipped_outside = stats.skipped_outside,
            skipped_short = stats.skipped_short,
            width = self.viewport.width,
            height = self.viewport.height,
            "Rendered vector layer"
        );

        self.stats = stats;
        stats
    }

    /// Clear the raster.
    pub fn clear(&mut self) {
        self.pixmap.fill(tiny_skia::Color::TRANSPARENT);
        self.stats = VectorStats::default();
    }

    pub fn stats(&self) -> VectorStats {
        self.stats
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn samples(&self) -> &[VectorSample] {
        &self.samples
    }

    /// Export the raster as PNG.
    pub fn encode_png(&self) -> FieldResult<Vec<u8>> {
        encode_surface(&self.pixmap)
    }
}
