//! Tests for the scalar and vector layers, hit-testing and chart export.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use field_common::{BoundingBox, FeatureId, FieldSnapshot, VectorSample, VectorSnapshot};
use field_layers::{EngineOptions, FieldLayerEngine, TraceSet, ViewportWatch};
use interpolation::ProfilePoint;
use playback::{AnimationTokens, FrameData, FrameSink, PlaybackConfig, PlaybackController};
use renderer::arrows::alpha_at;
use renderer::{color_for, PaletteKind};
use test_utils::{
    estuary_viewport, square, three_step_snapshot, ts, two_cells, uniform_vectors, RecordingSurface,
    RecordingView, ScriptedFrames, SurfaceCall,
};

type Engine = FieldLayerEngine<RecordingSurface, RecordingSurface>;

fn engine(surface: &RecordingSurface) -> Engine {
    FieldLayerEngine::new(
        surface.clone(),
        surface.clone(),
        estuary_viewport(),
        EngineOptions {
            title: "Salinity (psu)".to_string(),
            ..EngineOptions::default()
        },
    )
}

fn generic(value: f64, vmin: f64, vmax: f64) -> renderer::Color {
    color_for(value, vmin, vmax, PaletteKind::Generic, false)
}

// ============================================================================
// Scalar layer tests
// ============================================================================

#[test]
fn test_load_scalar_paints_and_shows_legend() {
    let surface = RecordingSurface::new();
    let mut engine = engine(&surface);

    let painted = engine.load_scalar(two_cells(), &three_step_snapshot(), 0).unwrap();
    assert_eq!(painted, 2);

    assert_eq!(
        surface.paints(),
        vec![
            (FeatureId(0), generic(1.0, 1.0, 5.0)),
            (FeatureId(1), generic(2.0, 1.0, 5.0)),
        ]
    );
    let legends = surface.legends();
    assert_eq!(legends.len(), 1);
    assert_eq!(legends[0].title, "Salinity (psu)");
    assert_eq!(engine.frame_index(), Some(0));
}

#[test]
fn test_last_frame_hides_missing_and_uses_top_color() {
    let surface = RecordingSurface::new();
    let mut engine = engine(&surface);
    let snapshot = three_step_snapshot();
    engine.load_scalar(two_cells(), &snapshot, 0).unwrap();
    surface.clear();

    let values = snapshot.values_at(2).unwrap().to_vec();
    engine.apply_frame(&FrameData::scalar(2, values)).unwrap();

    let top = renderer::ColorMapper::for_kind(PaletteKind::Generic)
        .palette()
        .stops()
        .last()
        .unwrap()
        .color;
    assert_eq!(surface.paints(), vec![(FeatureId(0), top)]);
    assert_eq!(surface.hides(), vec![FeatureId(1)]);
    assert_eq!(generic(5.0, 1.0, 5.0), top);

    let layer = engine.scalar_layer().unwrap();
    assert_eq!(layer.visible_ids(), vec![FeatureId(0)]);
    assert_eq!(engine.frame_index(), Some(2));
}

#[test]
fn test_repeated_frame_repaints_nothing() {
    let surface = RecordingSurface::new();
    let mut engine = engine(&surface);
    engine.load_scalar(two_cells(), &three_step_snapshot(), 0).unwrap();

    let frame = vec![Some(3.0), Some(4.0)];
    let first = engine.apply_scalar_values(&frame).unwrap();
    assert_eq!(first.repainted, 2);

    surface.clear();
    let second = engine.apply_scalar_values(&frame).unwrap();
    assert_eq!(second.repainted, 0);
    assert_eq!(second.unchanged, 2);
    assert!(surface.calls().is_empty());
}

#[test]
fn test_feature_returns_after_no_data() {
    let surface = RecordingSurface::new();
    let mut engine = engine(&surface);
    engine.load_scalar(two_cells(), &three_step_snapshot(), 2).unwrap();
    assert_eq!(surface.paints().len(), 1);

    surface.clear();
    let stats = engine.apply_scalar_values(&[Some(1.0), Some(2.0)]).unwrap();
    assert_eq!(stats.repainted, 2);
    assert!(surface
        .paints()
        .contains(&(FeatureId(1), generic(2.0, 1.0, 5.0))));
}

#[test]
fn test_nan_value_is_treated_as_no_data() {
    let surface = RecordingSurface::new();
    let mut engine = engine(&surface);
    engine.load_scalar(two_cells(), &three_step_snapshot(), 0).unwrap();
    surface.clear();

    let stats = engine.apply_scalar_values(&[Some(f64::NAN), Some(2.0)]).unwrap();
    assert_eq!(stats.hidden, 1);
    assert_eq!(surface.hides(), vec![FeatureId(0)]);
}

#[test]
fn test_value_row_width_mismatch_is_rejected() {
    let surface = RecordingSurface::new();
    let mut engine = engine(&surface);
    engine.load_scalar(two_cells(), &three_step_snapshot(), 0).unwrap();

    assert!(engine.apply_scalar_values(&[Some(1.0)]).is_err());
}

#[test]
fn test_constant_field_uses_degenerate_color() {
    let surface = RecordingSurface::new();
    let mut engine = engine(&surface);
    let snapshot = FieldSnapshot::new(vec![ts(0)], vec![vec![Some(4.0), Some(4.0)]]).unwrap();
    engine.load_scalar(two_cells(), &snapshot, 0).unwrap();

    let paints = surface.paints();
    assert_eq!(paints.len(), 2);
    assert_eq!(paints[0].1, paints[1].1);
    assert_eq!(paints[0].1, generic(4.0, 4.0, 4.0));
}

#[test]
fn test_reload_clears_previous_layer() {
    let surface = RecordingSurface::new();
    let mut engine = engine(&surface);
    engine.load_scalar(two_cells(), &three_step_snapshot(), 0).unwrap();
    surface.clear();

    let snapshot = FieldSnapshot::new(vec![ts(0)], vec![vec![Some(1.0)]]).unwrap();
    engine.load_scalar(vec![square(7, 0.0, 0.0, 1.0)], &snapshot, 0).unwrap();

    let calls = surface.calls();
    assert_eq!(calls[0], SurfaceCall::Hide(FeatureId(0)));
    assert_eq!(calls[1], SurfaceCall::Hide(FeatureId(1)));
    assert_eq!(surface.paints().len(), 1);
}

#[test]
fn test_sample_set_skips_features_without_data() {
    let surface = RecordingSurface::new();
    let mut engine = engine(&surface);
    engine.load_scalar(two_cells(), &three_step_snapshot(), 2).unwrap();

    let samples = engine.sample_set();
    assert_eq!(samples.len(), 1);
    assert_eq!(samples[0].value, 5.0);
    assert!((samples[0].lng - 0.5).abs() < 1e-9);
    assert!((samples[0].lat - 0.5).abs() < 1e-9);
}

// ============================================================================
// Hit-testing tests
// ============================================================================

#[test]
fn test_click_reports_feature_under_pointer() {
    let surface = RecordingSurface::new();
    let mut engine = engine(&surface);
    engine.load_scalar(two_cells(), &three_step_snapshot(), 0).unwrap();

    let clicked = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&clicked);
    engine.on_feature_click(move |event| seen.lock().unwrap().push(event.id));

    let event = engine.pointer_click(1.5, 0.5).unwrap();
    assert_eq!(event.id, FeatureId(1));
    assert_eq!(event.value, Some(2.0));
    assert!(!event.label.is_empty());
    assert!(engine.inside_layer());

    assert!(engine.pointer_click(2.5, 1.5).is_none());
    assert!(!engine.inside_layer());
    assert_eq!(*clicked.lock().unwrap(), vec![FeatureId(1)]);
}

#[test]
fn test_features_without_data_are_not_hit() {
    let surface = RecordingSurface::new();
    let mut engine = engine(&surface);
    engine.load_scalar(two_cells(), &three_step_snapshot(), 2).unwrap();

    assert!(engine.pointer_move(1.5, 0.5).is_none());
    assert_eq!(engine.pointer_move(0.5, 0.5).map(|e| e.id), Some(FeatureId(0)));
}

#[test]
fn test_hover_fires_once_per_feature() {
    let surface = RecordingSurface::new();
    let mut engine = engine(&surface);
    engine.load_scalar(two_cells(), &three_step_snapshot(), 0).unwrap();

    let hovered = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&hovered);
    engine.on_feature_hover(move |event| seen.lock().unwrap().push(event.id));

    engine.pointer_move(0.2, 0.5);
    engine.pointer_move(0.8, 0.5);
    engine.pointer_move(1.5, 0.5);
    assert_eq!(*hovered.lock().unwrap(), vec![FeatureId(0), FeatureId(1)]);
}

// ============================================================================
// Vector layer tests
// ============================================================================

#[test]
fn test_vector_stats_count_skips() {
    let surface = RecordingSurface::new();
    let mut engine = engine(&surface);

    let samples = vec![
        VectorSample::new(1.0, 0.5, 1.0, 0.0),
        VectorSample::new(50.0, 0.5, 1.0, 0.0),
        VectorSample::new(1.0, 0.5, 0.01, 0.0),
    ];
    let stats = engine.load_vector_samples(samples, 0.0, 1.0).unwrap();

    assert_eq!(stats.drawn, 1);
    assert_eq!(stats.skipped_outside, 1);
    assert_eq!(stats.skipped_short, 1);
}

#[test]
fn test_arrow_is_drawn_along_its_direction() {
    let surface = RecordingSurface::new();
    let mut engine = engine(&surface);
    engine
        .load_vector_samples(vec![VectorSample::new(1.0, 0.5, 1.0, 0.0)], 0.0, 1.0)
        .unwrap();

    let (x, y) = estuary_viewport().project(1.0, 0.5);
    let layer = engine.vector_layer().unwrap();
    // 1 m/s at the default scale is a 20 px arrow pointing east
    assert!(alpha_at(layer.pixmap(), (x + 10.0) as u32, y as u32) > 0);
    assert_eq!(alpha_at(layer.pixmap(), (x - 10.0) as u32, y as u32), 0);
}

#[test]
fn test_viewport_resize_reallocates_raster() {
    let surface = RecordingSurface::new();
    let mut engine = engine(&surface);
    engine
        .load_vector_samples(uniform_vectors(4, 3, test_utils::bbox::ESTUARY, 1.0, 1.0), 0.0, 2.0)
        .unwrap();
    assert_eq!(engine.vector_layer().unwrap().stats().drawn, 12);

    engine.set_viewport(estuary_viewport().resized(200, 100)).unwrap();
    let layer = engine.vector_layer().unwrap();
    assert_eq!((layer.pixmap().width(), layer.pixmap().height()), (200, 100));
    assert_eq!(layer.stats().drawn, 12);
}

#[test]
fn test_pan_away_skips_every_arrow() {
    let surface = RecordingSurface::new();
    let mut engine = engine(&surface);
    engine
        .load_vector_samples(uniform_vectors(2, 2, test_utils::bbox::ESTUARY, 1.0, 0.0), 0.0, 1.0)
        .unwrap();

    engine
        .set_viewport(field_common::Viewport::new(400, 300, test_utils::bbox::ELSEWHERE))
        .unwrap();
    let stats = engine.vector_layer().unwrap().stats();
    assert_eq!(stats.drawn, 0);
    assert_eq!(stats.skipped_outside, 4);
}

#[test]
fn test_reloading_vectors_recolors_in_place() {
    let surface = RecordingSurface::new();
    let mut engine = engine(&surface);
    let sample = VectorSample::new(1.0, 0.5, 1.0, 0.0);
    engine.load_vector_samples(vec![sample], 0.0, 1.0).unwrap();

    let (x, y) = estuary_viewport().project(1.0, 0.5);
    let (px, py) = ((x + 10.0) as u32, y as u32);
    // Top of the speed ramp is dark red
    let before = engine.vector_layer().unwrap().pixmap().pixel(px, py).unwrap();
    assert!(before.alpha() > 0);
    assert_eq!(before.green(), 0);

    let snapshot = VectorSnapshot {
        timestamps: vec![ts(0), ts(1)],
        frames: vec![vec![sample], vec![VectorSample::new(1.0, 0.5, 4.0, 0.0)]],
    };
    let stats = engine.load_vectors(&snapshot, 0).unwrap();
    assert_eq!(stats.drawn, 1);

    // Same arrow, now at the bottom of the [1, 4] domain: light gray
    let layer = engine.vector_layer().unwrap();
    assert_eq!(layer.samples(), &[sample]);
    let after = layer.pixmap().pixel(px, py).unwrap();
    assert!(after.alpha() > 0);
    assert!(after.green() > 0);
}

#[test]
fn test_vector_frame_creates_layer_on_first_apply() {
    let surface = RecordingSurface::new();
    let mut engine = engine(&surface);
    assert!(engine.vector_layer().is_none());

    let frame = FrameData::vectors(1, uniform_vectors(2, 1, test_utils::bbox::ESTUARY, 0.5, 0.5));
    engine.apply_frame(&frame).unwrap();

    assert_eq!(engine.vector_layer().unwrap().stats().drawn, 2);
    assert_eq!(engine.frame_index(), Some(1));
}

#[test]
fn test_vector_png_export() {
    let surface = RecordingSurface::new();
    let mut engine = engine(&surface);
    assert!(engine.vector_png().is_err());

    engine
        .load_vector_samples(vec![VectorSample::new(1.0, 0.5, 1.0, 1.0)], 0.0, 2.0)
        .unwrap();
    let png = engine.vector_png().unwrap();
    assert_eq!(&png[..8], &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
}

#[test]
fn test_teardown_clears_raster() {
    let surface = RecordingSurface::new();
    let mut engine = engine(&surface);
    engine
        .load_vector_samples(vec![VectorSample::new(1.0, 0.5, 1.0, 0.0)], 0.0, 1.0)
        .unwrap();

    FrameSink::teardown(&mut engine).unwrap();
    let layer = engine.vector_layer().unwrap();
    assert!(layer.pixmap().pixels().iter().all(|p| p.alpha() == 0));
    assert_eq!(layer.stats().drawn, 0);
}

// ============================================================================
// Chart tests
// ============================================================================

fn profile() -> Vec<ProfilePoint> {
    vec![
        ProfilePoint {
            distance: 0.0,
            value: 1.0,
            lat: 0.0,
            lng: 0.0,
        },
        ProfilePoint {
            distance: 500.0,
            value: 2.5,
            lat: 0.0,
            lng: 0.0045,
        },
    ]
}

#[test]
fn test_profile_trace_csv() {
    let set = TraceSet::from_profile("salinity", &profile());
    assert_eq!(set.to_csv(), "distance_m,salinity\n0,1\n500,2.5\n");
}

#[test]
fn test_point_series_keeps_gaps() {
    let set = TraceSet::point_series("cell 1", &three_step_snapshot(), 1).unwrap();
    assert_eq!(set.traces[0].y, vec![Some(2.0), Some(4.0), None]);
    assert_eq!(set.x[1] - set.x[0], 3600.0);

    let csv = set.to_csv();
    let last = csv.lines().last().unwrap();
    assert!(last.ends_with(','));

    assert!(TraceSet::point_series("x", &three_step_snapshot(), 5).is_err());
}

#[test]
fn test_payload_columns() {
    let payload = TraceSet::from_profile("salinity", &profile()).to_payload();
    assert_eq!(payload.columns, vec!["distance_m", "salinity"]);
    assert_eq!(payload.data[1], vec![Some(500.0), Some(2.5)]);

    let json = serde_json::to_value(field_layers::ChartPayload::from_profile(&profile())).unwrap();
    assert_eq!(json["columns"][3], "lng");
    assert_eq!(json["data"][1][0], 500.0);
}

// ============================================================================
// Playback-driven tests
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_playback_drives_engine() {
    let surface = RecordingSurface::new();
    let mut engine = engine(&surface);
    let snapshot = FieldSnapshot::new(
        vec![ts(0), ts(1), ts(2)],
        vec![vec![Some(0.0)], vec![Some(1.0)], vec![Some(2.0)]],
    )
    .unwrap();
    engine
        .load_scalar(vec![square(0, 0.0, 0.0, 1.0)], &snapshot, 0)
        .unwrap();
    engine
        .load_vector_samples(uniform_vectors(2, 2, test_utils::bbox::ESTUARY, 1.0, 0.0), 0.0, 1.0)
        .unwrap();
    surface.clear();

    let engine = Arc::new(Mutex::new(engine));
    let watch = ViewportWatch::new(estuary_viewport());
    let tokens = AnimationTokens::new();

    let handle = PlaybackController::spawn(
        tokens.begin(),
        PlaybackConfig::new(3),
        ScriptedFrames::new(),
        Arc::clone(&engine),
        RecordingView::new(),
        Some(watch.subscribe()),
    );

    handle.seek(2).await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(engine.lock().unwrap().frame_index(), Some(2));
    assert_eq!(
        surface.paints(),
        vec![(FeatureId(0), generic(2.0, 0.0, 2.0))]
    );

    watch.resize(100, 80);
    tokio::time::sleep(Duration::from_millis(10)).await;
    {
        let engine = engine.lock().unwrap();
        let layer = engine.vector_layer().unwrap();
        assert_eq!((layer.pixmap().width(), layer.pixmap().height()), (100, 80));
        assert_eq!(engine.viewport().bounds, BoundingBox::new(-1.0, -1.0, 3.0, 2.0));
    }

    handle.close().await;
}
