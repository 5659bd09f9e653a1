//! Last-applied color per feature.

use std::collections::HashMap;

use field_common::FeatureId;
use renderer::Color;

/// Maps each painted feature to the packed RGBA key of its current color.
/// A feature absent from the cache is not on the map.
#[derive(Debug, Clone, Default)]
pub struct FeatureColorCache {
    colors: HashMap<FeatureId, u32>,
}

impl FeatureColorCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `color` for `id`. Returns `true` if it differs from the cached
    /// color, i.e. the feature needs a repaint.
    pub fn record(&mut self, id: FeatureId, color: Color) -> bool {
        self.colors.insert(id, color.key()) != Some(color.key())
    }

    /// Forget a feature. Returns `true` if it was cached.
    pub fn remove(&mut self, id: FeatureId) -> bool {
        self.colors.remove(&id).is_some()
    }

    pub fn get(&self, id: FeatureId) -> Option<u32> {
        self.colors.get(&id).copied()
    }

    pub fn contains(&self, id: FeatureId) -> bool {
        self.colors.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn clear(&mut self) {
        self.colors.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_reports_changes_only() {
        let mut cache = FeatureColorCache::new();
        let id = FeatureId(7);
        assert!(cache.record(id, Color::rgb(1, 2, 3)));
        assert!(!cache.record(id, Color::rgb(1, 2, 3)));
        assert!(cache.record(id, Color::new(1, 2, 3, 200)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_remove() {
        let mut cache = FeatureColorCache::new();
        cache.record(FeatureId(1), Color::rgb(0, 0, 0));
        assert!(cache.remove(FeatureId(1)));
        assert!(!cache.remove(FeatureId(1)));
        assert!(cache.is_empty());
    }
}
