//! The layer engine: one scalar layer, at most one vector layer, the legend
//! and the host surfaces, driven frame by frame by the playback controller.

use field_common::{FeatureRecord, FieldError, FieldResult, FieldSnapshot, VectorSample, VectorSnapshot, Viewport};
use interpolation::Sample;
use playback::{FrameData, FrameSink};
use renderer::legend::min_tick_diff;
use renderer::{ColorMapper, Legend, PaletteKind};
use tracing::{debug, info};

use crate::events::{FeatureEvent, FeatureEvents};
use crate::scalar::{ScalarLayer, UpdateStats};
use crate::surface::{LegendWidget, MapSurface};
use crate::vector::{VectorLayer, VectorStats};

/// Hit radius for point features, in pixels.
pub const POINT_HIT_RADIUS_PX: f64 = 6.0;

/// Pixels per m/s of current when no scale is configured.
pub const DEFAULT_VECTOR_SCALE: f64 = 20.0;

/// How the engine colors and labels its layers.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Legend title of the scalar field, e.g. "Salinity (psu)"
    pub title: String,
    pub scalar_mapper: ColorMapper,
    pub vector_mapper: ColorMapper,
    pub vector_scale: f64,
    pub legend_ticks: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            title: String::new(),
            scalar_mapper: ColorMapper::for_kind(PaletteKind::Generic),
            vector_mapper: ColorMapper::for_kind(PaletteKind::Vector),
            vector_scale: DEFAULT_VECTOR_SCALE,
            legend_ticks: 5,
        }
    }
}

pub struct FieldLayerEngine<M, L> {
    options: EngineOptions,
    surface: M,
    legend_widget: L,
    viewport: Viewport,
    scalar: Option<ScalarLayer>,
    /// Color domain of the scalar field: global range of the whole snapshot
    scalar_range: (f64, f64),
    vector: Option<VectorLayer>,
    legend: Option<Legend>,
    events: FeatureEvents,
    frame_index: Option<usize>,
}

impl<M: MapSurface, L: LegendWidget> FieldLayerEngine<M, L> {
    pub fn new(surface: M, legend_widget: L, viewport: Viewport, options: EngineOptions) -> Self {
        Self {
            options,
            surface,
            legend_widget,
            viewport,
            scalar: None,
            scalar_range: (0.0, 0.0),
            vector: None,
            legend: None,
            events: FeatureEvents::new(),
            frame_index: None,
        }
    }

    /// Replace the scalar layer with a new snapshot shown at `index`.
    ///
    /// Colors use the snapshot's global range so that a value keeps its
    /// color across frames.
    pub fn load_scalar(
        &mut self,
        features: Vec<FeatureRecord>,
        snapshot: &FieldSnapshot,
        index: usize,
    ) -> FieldResult<usize> {
        let values = snapshot.values_at(index)?;
        let (vmin, vmax) = snapshot.global_range().unwrap_or((0.0, 0.0));

        if let Some(mut previous) = self.scalar.take() {
            previous.clear(&mut self.surface);
        }
        self.events.reset();

        let mut layer = ScalarLayer::build(features, values, vmin, vmax, self.options.scalar_mapper.clone())?;
        let painted = layer.render(&mut self.surface);

        self.scalar = Some(layer);
        self.scalar_range = (vmin, vmax);
        self.frame_index = Some(index);
        self.refresh_legend();

        info!(
            features = self.scalar.as_ref().map_or(0, |l| l.features().len()),
            frames = snapshot.frame_count(),
            painted = painted,
            vmin = vmin,
            vmax = vmax,
            "Loaded scalar layer"
        );
        Ok(painted)
    }

    /// Move the scalar layer to another frame's values.
    pub fn apply_scalar_values(&mut self, values: &[Option<f64>]) -> FieldResult<UpdateStats> {
        let (vmin, vmax) = self.scalar_range;
        let layer = self
            .scalar
            .as_mut()
            .ok_or_else(|| FieldError::Render("no scalar layer loaded".to_string()))?;
        layer.update(values, vmin, vmax, &mut self.surface)
    }

    /// Show a vector snapshot at `index`, colored
    /// against the magnitude range of all frames.
    pub fn load_vectors(&mut self, snapshot: &VectorSnapshot, index: usize) -> FieldResult<VectorStats> {
        let samples = snapshot.frame(index)?.to_vec();
        let (vmin, vmax) = snapshot.magnitude_range().unwrap_or((0.0, 0.0));
        self.load_vector_samples(samples, vmin, vmax)
    }

    /// Show explicit samples with a color domain. An existing vector layer is
    /// redrawn in place; otherwise one is built for the current viewport.
    pub fn load_vector_samples(&mut self, samples: Vec<VectorSample>, vmin: f64, vmax: f64) -> FieldResult<VectorStats> {
        if let Some(layer) = self.vector.as_mut() {
            return Ok(layer.set_data(samples, vmin, vmax));
        }

        let layer = VectorLayer::build(
            samples,
            vmin,
            vmax,
            self.options.vector_mapper.clone(),
            self.options.vector_scale,
            self.viewport,
        )?;
        let stats = layer.stats();
        self.vector = Some(layer);
        Ok(stats)
    }

    /// Swap the vector layer to another frame's samples.
    pub fn apply_vector_samples(&mut self, samples: Vec<VectorSample>) -> FieldResult<VectorStats> {
        let layer = self
            .vector
            .as_mut()
            .ok_or_else(|| FieldError::Render("no vector layer loaded".to_string()))?;
        Ok(layer.set_frame(samples))
    }

    /// New viewport: re-render the vector raster.
    pub fn set_viewport(&mut self, viewport: Viewport) -> FieldResult<()> {
        self.viewport = viewport;
        if let Some(layer) = self.vector.as_mut() {
            layer.set_viewport(viewport)?;
        }
        Ok(())
    }

    pub fn on_feature_hover<F>(&mut self, callback: F)
    where
        F: Fn(&FeatureEvent) + Send + Sync + 'static,
    {
        self.events.on_hover(callback);
    }

    pub fn on_feature_click<F>(&mut self, callback: F)
    where
        F: Fn(&FeatureEvent) + Send + Sync + 'static,
    {
        self.events.on_click(callback);
    }

    /// Pointer moved to a map position. Returns the hover event if the
    /// pointer entered a feature.
    pub fn pointer_move(&mut self, lon: f64, lat: f64) -> Option<FeatureEvent> {
        let hit = self.hit(lon, lat);
        self.events.pointer_move(hit)
    }

    /// Pointer clicked at a map position. Returns the clicked feature.
    pub fn pointer_click(&mut self, lon: f64, lat: f64) -> Option<FeatureEvent> {
        let hit = self.hit(lon, lat);
        self.events.pointer_click(hit)
    }

    /// Whether the last click landed on a scalar-field feature.
    pub fn inside_layer(&self) -> bool {
        self.events.inside_layer()
    }

    fn hit(&self, lon: f64, lat: f64) -> Option<FeatureEvent> {
        let layer = self.scalar.as_ref()?;
        let feature = layer.hit_test(lon, lat, &self.viewport, POINT_HIT_RADIUS_PX)?;
        Some(FeatureEvent::from_feature(feature, self.label_precision()))
    }

    fn label_precision(&self) -> f64 {
        self.legend
            .as_ref()
            .map(|legend| {
                let ticks: Vec<f64> = legend.ticks.iter().map(|t| t.value).collect();
                min_tick_diff(&ticks)
            })
            .unwrap_or(0.0)
    }

    fn refresh_legend(&mut self) {
        let (vmin, vmax) = self.scalar_range;
        let legend = Legend::build(
            self.options.title.clone(),
            &self.options.scalar_mapper,
            vmin,
            vmax,
            self.options.legend_ticks,
        );
        self.legend_widget.show_legend(&legend);
        self.legend = Some(legend);
    }

    /// Interpolation samples for path queries over the current frame.
    pub fn sample_set(&self) -> Vec<Sample> {
        self.scalar.as_ref().map(|l| l.sample_set()).unwrap_or_default()
    }

    pub fn scalar_layer(&self) -> Option<&ScalarLayer> {
        self.scalar.as_ref()
    }

    pub fn vector_layer(&self) -> Option<&VectorLayer> {
        self.vector.as_ref()
    }

    pub fn legend(&self) -> Option<&Legend> {
        self.legend.as_ref()
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Index of the frame currently shown.
    pub fn frame_index(&self) -> Option<usize> {
        self.frame_index
    }

    pub fn surface(&self) -> &M {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut M {
        &mut self.surface
    }

    /// Export the vector raster as PNG.
    pub fn vector_png(&self) -> FieldResult<Vec<u8>> {
        self.vector
            .as_ref()
            .ok_or_else(|| FieldError::Render("no vector layer loaded".to_string()))?
            .encode_png()
    }
}

impl<M: MapSurface, L: LegendWidget> FrameSink for FieldLayerEngine<M, L> {
    fn apply_frame(&mut self, frame: &FrameData) -> FieldResult<()> {
        if let Some(values) = &frame.scalar {
            if self.scalar.is_some() {
                self.apply_scalar_values(values)?;
            } else {
                debug!(index = frame.index, "Scalar frame arrived without a scalar layer, ignoring");
            }
        }

        if let Some(samples) = &frame.vectors {
            match self.vector.as_mut() {
                Some(layer) => {
                    layer.set_frame(samples.clone());
                }
                None => {
                    let (vmin, vmax) = finite_range(samples);
                    self.load_vector_samples(samples.clone(), vmin, vmax)?;
                }
            }
        }

        self.frame_index = Some(frame.index);
        Ok(())
    }

    fn viewport_changed(&mut self, viewport: &Viewport) -> FieldResult<()> {
        self.set_viewport(*viewport)
    }

    fn teardown(&mut self) -> FieldResult<()> {
        if let Some(layer) = self.vector.as_mut() {
            layer.clear();
        }
        self.events.reset();
        Ok(())
    }
}

fn finite_range(samples: &[VectorSample]) -> (f64, f64) {
    samples
        .iter()
        .map(VectorSample::color_source)
        .filter(|v| v.is_finite())
        .fold(None, |acc: Option<(f64, f64)>, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
        .unwrap_or((0.0, 0.0))
}
