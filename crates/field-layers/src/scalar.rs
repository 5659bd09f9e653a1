//! Scalar-field layer: one styled map feature per mesh cell.
//!
//! Features with no data at the current time are absent from the map rather
//! than drawn with a placeholder color. Per-frame updates go through the
//! [`FeatureColorCache`] so a feature is repainted only when its RGBA changes.

use std::collections::HashMap;

use field_common::{FeatureId, FeatureRecord, FieldError, FieldResult, GeoPoint, Geometry, Viewport};
use interpolation::Sample;
use metrics::counter;
use renderer::{Color, ColorMapper};
use serde::Serialize;
use tracing::debug;

use crate::cache::FeatureColorCache;
use crate::surface::MapSurface;

/// Outcome of one [`ScalarLayer::update`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UpdateStats {
    /// Features whose color changed (or that came back from no data)
    pub repainted: usize,
    /// Features that lost their value and were removed from the map
    pub hidden: usize,
    /// Features whose color was unchanged; no surface call was made
    pub unchanged: usize,
}

pub struct ScalarLayer {
    features: Vec<FeatureRecord>,
    positions: HashMap<FeatureId, usize>,
    centroids: Vec<(FeatureId, GeoPoint)>,
    mapper: ColorMapper,
    vmin: f64,
    vmax: f64,
    cache: FeatureColorCache,
}

impl ScalarLayer {
    /// Bind `values` (one per feature, in feature order) to `features`.
    ///
    /// Centroids for interpolation are computed here once per snapshot.
    pub fn build(
        mut features: Vec<FeatureRecord>,
        values: &[Option<f64>],
        vmin: f64,
        vmax: f64,
        mapper: ColorMapper,
    ) -> FieldResult<Self> {
        check_width(features.len(), values.len())?;

        for (feature, value) in features.iter_mut().zip(values) {
            feature.current_value = value.filter(|v| v.is_finite());
        }

        let positions = features
            .iter()
            .enumerate()
            .map(|(i, f)| (f.id, i))
            .collect();
        let centroids = features
            .iter()
            .filter_map(|f| f.geometry.centroid().map(|c| (f.id, c)))
            .collect();

        Ok(Self {
            features,
            positions,
            centroids,
            mapper,
            vmin,
            vmax,
            cache: FeatureColorCache::new(),
        })
    }

    /// Style callback: color for a feature at its current value, recorded in
    /// the cache. `None` for unknown features and features without data.
    pub fn style(&mut self, id: FeatureId) -> Option<Color> {
        let feature = &self.features[*self.positions.get(&id)?];
        let value = feature.current_value?;
        let color = self.mapper.color_for(value, self.vmin, self.vmax);
        self.cache.record(id, color);
        Some(color)
    }

    /// Paint every feature that has data. Returns the number painted.
    pub fn render<M: MapSurface + ?Sized>(&mut self, surface: &mut M) -> usize {
        let mut painted = 0;
        for i in 0..self.features.len() {
            let id = self.features[i].id;
            if let Some(color) = self.style(id) {
                surface.paint_feature(&self.features[i], color);
                painted += 1;
            }
        }
        counter!("field_repaints_total").increment(painted as u64);
        debug!(features = self.features.len(), painted = painted, "Rendered scalar layer");
        painted
    }

    /// Move every feature to a new frame, repainting only changed colors.
    pub fn update<M: MapSurface + ?Sized>(
        &mut self,
        values: &[Option<f64>],
        vmin: f64,
        vmax: f64,
        surface: &mut M,
    ) -> FieldResult<UpdateStats> {
        check_width(self.features.len(), values.len())?;
        self.vmin = vmin;
        self.vmax = vmax;

        let mut stats = UpdateStats::default();
        for (feature, value) in self.features.iter_mut().zip(values) {
            let value = value.filter(|v| v.is_finite());
            feature.current_value = value;

            match value {
                None => {
                    if self.cache.remove(feature.id) {
                        surface.hide_feature(feature.id);
                        stats.hidden += 1;
                    }
                }
                Some(v) => {
                    let color = self.mapper.color_for(v, vmin, vmax);
                    if self.cache.record(feature.id, color) {
                        surface.paint_feature(feature, color);
                        stats.repainted += 1;
                    } else {
                        stats.unchanged += 1;
                    }
                }
            }
        }

        counter!("field_repaints_total").increment(stats.repainted as u64);
        counter!("field_repaints_skipped_total").increment(stats.unchanged as u64);
        debug!(
            repainted = stats.repainted,
            hidden = stats.hidden,
            unchanged = stats.unchanged,
            "Updated scalar layer"
        );
        Ok(stats)
    }

    /// Interpolation samples: centroid plus current value of every feature
    /// with data.
    pub fn sample_set(&self) -> Vec<Sample> {
        self.centroids
            .iter()
            .filter_map(|(id, c)| {
                let value = self.feature(*id)?.current_value?;
                Some(Sample::new(c.lat, c.lng, value))
            })
            .collect()
    }

    /// Feature id → centroid, built once per snapshot.
    pub fn centroids(&self) -> &[(FeatureId, GeoPoint)] {
        &self.centroids
    }

    /// The visible feature under a map position. Polygons are hit by
    /// containment, points within `radius_px` pixels.
    pub fn hit_test(&self, lon: f64, lat: f64, viewport: &Viewport, radius_px: f64) -> Option<&FeatureRecord> {
        let (px, py) = viewport.project(lon, lat);
        self.features
            .iter()
            .filter(|f| f.current_value.is_some())
            .find(|f| match &f.geometry {
                Geometry::Polygon(_) => f.geometry.contains(lon, lat),
                Geometry::Point(p) => {
                    let (x, y) = viewport.project(p.lng, p.lat);
                    (x - px).hypot(y - py) <= radius_px
                }
            })
    }

    pub fn feature(&self, id: FeatureId) -> Option<&FeatureRecord> {
        self.positions.get(&id).map(|i| &self.features[*i])
    }

    pub fn features(&self) -> &[FeatureRecord] {
        &self.features
    }

    /// Ids of features currently on the map.
    pub fn visible_ids(&self) -> Vec<FeatureId> {
        self.features
            .iter()
            .filter(|f| self.cache.contains(f.id))
            .map(|f| f.id)
            .collect()
    }

    pub fn range(&self) -> (f64, f64) {
        (self.vmin, self.vmax)
    }

    pub fn mapper(&self) -> &ColorMapper {
        &self.mapper
    }

    pub fn cache(&self) -> &FeatureColorCache {
        &self.cache
    }

    /// Remove every feature from the map.
    pub fn clear<M: MapSurface + ?Sized>(&mut self, surface: &mut M) {
        for feature in &self.features {
            if self.cache.remove(feature.id) {
                surface.hide_feature(feature.id);
            }
        }
    }
}

fn check_width(features: usize, values: usize) -> FieldResult<()> {
    if features != values {
        return Err(FieldError::InvalidSnapshot(format!(
            "{} features but {} values",
            features, values
        )));
    }
    Ok(())
}
