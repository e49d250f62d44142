use std::sync::Arc;

use model::{Coordinate, Feature, FeatureCollection, FeatureId, Geometry, GeometryType};
use render_protocol::{
    ContainerTarget, DataSourceHandle, InteractionSlot, LayerId, LayerSlot, LoadingState,
    LoadingStateChange,
};
use spatial::{Extent, SpatialReference, SpatialReferenceRegistry};
use style::{ColorParam, Symbology, VectorSymbology};
use view::ViewportState;

use super::*;

fn mercator() -> Arc<SpatialReference> {
    SpatialReferenceRegistry::global().web_mercator().expect("web mercator")
}

fn renderer(grid: bool) -> GridViewRenderer {
    GridViewRenderer::new(
        &RendererConfig {
            grid,
            ..RendererConfig::default()
        },
        mercator(),
    )
    .expect("default renderer config is valid")
}

fn vector_layer(id: u64, source: u64) -> LayerDescriptor {
    LayerDescriptor {
        id: LayerId(id),
        name: format!("layer {id}"),
        visible: true,
        symbology: Symbology::Vector(Arc::new(VectorSymbology::polygon())),
        source: DataSourceHandle(source),
    }
}

fn containers(count: usize) -> Vec<ContainerTarget> {
    vec![
        ContainerTarget {
            width: 400,
            height: 300,
        };
        count
    ]
}

fn data_layer_of(renderer: &GridViewRenderer, instance: usize) -> Vec<LayerId> {
    renderer
        .frame()
        .expect("frame published")
        .frames[instance]
        .data_layers()
        .collect()
}

fn square(id: u64) -> Feature {
    Feature::new(Geometry::Polygon(vec![vec![
        Coordinate::new(0.0, 0.0),
        Coordinate::new(10.0, 0.0),
        Coordinate::new(10.0, 10.0),
        Coordinate::new(0.0, 0.0),
    ]]))
    .with_id(id)
}

#[test]
fn grid_mode_maps_layers_to_instances_in_inverse_order() {
    let mut renderer = renderer(true);
    renderer.resize(800, 800);
    renderer
        .set_layers((1..=5).map(|id| vector_layer(id, id)).collect())
        .expect("distinct layers");

    renderer
        .redraw(&mercator(), &containers(5))
        .expect("redraw succeeds");

    assert_eq!(renderer.instances().len(), 5);
    assert_eq!(renderer.grid(), GridLayout { rows: 2, columns: 3 });
    assert_eq!(data_layer_of(&renderer, 0), vec![LayerId(5)]);
    assert_eq!(data_layer_of(&renderer, 4), vec![LayerId(1)]);
    assert_eq!(renderer.background_layers().len(), 5);
}

#[test]
fn overlay_mode_stacks_all_layers_on_one_instance() {
    let mut renderer = renderer(false);
    renderer
        .set_layers(vec![vector_layer(1, 1), vector_layer(2, 2)])
        .expect("distinct layers");
    renderer
        .redraw(&mercator(), &containers(1))
        .expect("redraw succeeds");

    assert_eq!(renderer.instances().len(), 1);
    assert_eq!(data_layer_of(&renderer, 0), vec![LayerId(1), LayerId(2)]);
    let frame = &renderer.frame().expect("frame published").frames[0];
    assert!(matches!(frame.layers[0], LayerSlot::Background { .. }));
}

#[test]
fn hidden_layers_release_their_binding() {
    let mut renderer = renderer(true);
    renderer
        .set_layers(vec![vector_layer(1, 1), vector_layer(2, 2)])
        .expect("distinct layers");
    let mut hidden = vector_layer(2, 2);
    hidden.visible = false;
    renderer
        .set_layers(vec![vector_layer(1, 1), hidden])
        .expect("distinct layers");

    assert!(renderer.binding(LayerId(2)).is_none());
    renderer
        .redraw(&mercator(), &containers(1))
        .expect("redraw succeeds");
    assert_eq!(renderer.instances().len(), 1);
}

#[test]
fn binding_survives_unchanged_source_and_is_replaced_on_new_source() {
    let mut renderer = renderer(false);
    renderer
        .set_layers(vec![vector_layer(1, 10)])
        .expect("single layer");
    let original = renderer.binding(LayerId(1)).expect("bound").handle;

    renderer
        .set_layers(vec![vector_layer(1, 10)])
        .expect("single layer");
    assert_eq!(renderer.binding(LayerId(1)).expect("bound").handle, original);

    renderer
        .set_layers(vec![vector_layer(1, 11)])
        .expect("single layer");
    let replaced = renderer.binding(LayerId(1)).expect("bound").handle;
    assert_ne!(replaced, original);
    assert!(renderer.binding_state.resources.get(original).is_none());
}

#[test]
fn symbology_change_keeps_data_and_renews_style_cache() {
    let mut renderer = renderer(false);
    renderer
        .set_layers(vec![vector_layer(1, 10)])
        .expect("single layer");
    renderer
        .deliver_features(LayerId(1), Ok([square(1)].into_iter().collect()))
        .expect("vector layer");
    let handle = renderer.binding(LayerId(1)).expect("bound").handle;
    let before = Arc::clone(&renderer.styled_features(LayerId(1)).expect("vector layer")[0].style);

    let mut recolored = VectorSymbology::polygon();
    recolored.fill = ColorParam::fixed(render_protocol::Rgba::WHITE);
    let mut layer = vector_layer(1, 10);
    layer.symbology = Symbology::Vector(Arc::new(recolored));
    renderer.set_layers(vec![layer]).expect("single layer");

    assert_eq!(renderer.binding(LayerId(1)).expect("bound").handle, handle);
    let styled = renderer.styled_features(LayerId(1)).expect("vector layer");
    assert_eq!(styled.len(), 1);
    assert!(!Arc::ptr_eq(&before, &styled[0].style));
    assert_eq!(styled[0].style.fill, Some(render_protocol::Rgba::WHITE));
}

#[test]
fn projection_change_rebuilds_background_and_reports_viewport() {
    let mut renderer = renderer(false);
    let first = renderer
        .redraw(&mercator(), &containers(1))
        .expect("redraw succeeds")
        .expect("first redraw reports the viewport");
    assert_eq!(first.max_extent, Some(mercator().extent()));
    assert!(matches!(
        renderer.background_source(),
        Some(BackgroundSource::OsmTiles { .. })
    ));

    assert_eq!(
        renderer
            .redraw(&mercator(), &containers(1))
            .expect("redraw succeeds"),
        None
    );

    let wgs84 = SpatialReferenceRegistry::global().wgs84().expect("wgs84");
    let viewport = renderer
        .redraw(&wgs84, &containers(1))
        .expect("redraw succeeds")
        .expect("projection change reports the viewport");
    assert_eq!(viewport.max_extent, Some(wgs84.extent()));
    assert_eq!(renderer.camera().projection().code(), "EPSG:4326");
    assert_eq!(renderer.camera().zoom(), DEFAULT_ZOOM_LEVEL);
    assert!(matches!(
        renderer.background_source(),
        Some(BackgroundSource::PlaceholderImage { .. })
    ));
    assert_eq!(renderer.background_layers()[0].source_generation, 2);
}

#[test]
fn draw_stays_attached_while_instance_count_changes() {
    let mut renderer = renderer(true);
    renderer
        .set_layers(vec![vector_layer(1, 1)])
        .expect("single layer");
    renderer
        .redraw(&mercator(), &containers(1))
        .expect("redraw succeeds");
    renderer
        .attach_draw(GeometryType::Polygon)
        .expect("draw attaches");

    renderer
        .set_layers(vec![vector_layer(1, 1), vector_layer(2, 2), vector_layer(3, 3)])
        .expect("distinct layers");
    renderer
        .redraw(&mercator(), &containers(3))
        .expect("redraw succeeds");

    let frame = renderer.frame().expect("frame published");
    assert_eq!(frame.frames.len(), 3);
    for view in frame.frames.iter() {
        assert!(view.has_draw_scratch());
        assert!(
            view.interactions
                .contains(&InteractionSlot::Draw(GeometryType::Polygon))
        );
    }

    renderer.detach_draw().expect("draw detaches");
    let frame = renderer.frame().expect("frame published");
    assert!(frame.frames.iter().all(|view| !view.has_draw_scratch()));
}

#[test]
fn select_interaction_follows_inverse_index() {
    let mut renderer = renderer(true);
    renderer
        .set_layers(vec![vector_layer(1, 1), vector_layer(2, 2), vector_layer(3, 3)])
        .expect("distinct layers");
    renderer
        .redraw(&mercator(), &containers(3))
        .expect("redraw succeeds");

    let instance = renderer
        .set_selection_target(Some(LayerId(1)))
        .expect("selection attaches");
    assert_eq!(instance, Some(2));
    let frame = renderer.frame().expect("frame published");
    assert_eq!(
        frame.frames[2].interactions.as_slice(),
        &[InteractionSlot::Select { layer: LayerId(1) }]
    );
    assert!(frame.frames[0].interactions.is_empty());

    renderer.set_grid_mode(false);
    renderer
        .redraw(&mercator(), &containers(1))
        .expect("redraw succeeds");
    assert_eq!(renderer.instance_for_layer(LayerId(1)), Some(0));
}

#[test]
fn select_targets_instance_rendering_layer_before_redraw() {
    let mut renderer = renderer(true);
    renderer
        .set_layers(vec![vector_layer(1, 1), vector_layer(2, 2)])
        .expect("distinct layers");
    renderer
        .redraw(&mercator(), &containers(2))
        .expect("redraw succeeds");
    renderer
        .set_layers(vec![vector_layer(3, 3), vector_layer(1, 1), vector_layer(2, 2)])
        .expect("distinct layers");

    let instance = renderer
        .set_selection_target(Some(LayerId(1)))
        .expect("selection attaches")
        .expect("layer 1 is rendered");
    assert_eq!(instance, 1);
    assert_eq!(data_layer_of(&renderer, instance), vec![LayerId(1)]);
    let frame = renderer.frame().expect("frame published");
    assert_eq!(
        frame.frames[instance].interactions.as_slice(),
        &[InteractionSlot::Select { layer: LayerId(1) }]
    );
    assert_eq!(renderer.instance_for_layer(LayerId(3)), None);

    renderer
        .redraw(&mercator(), &containers(3))
        .expect("redraw succeeds");
    assert_eq!(renderer.instance_for_layer(LayerId(1)), Some(1));
    assert_eq!(data_layer_of(&renderer, 1), vec![LayerId(1)]);
    assert_eq!(
        renderer.frame().expect("frame published").frames[1]
            .interactions
            .as_slice(),
        &[InteractionSlot::Select { layer: LayerId(1) }]
    );
}

#[test]
fn container_mismatch_is_tolerated() {
    let mut renderer = renderer(true);
    renderer
        .set_layers(vec![vector_layer(1, 1), vector_layer(2, 2)])
        .expect("distinct layers");
    renderer
        .redraw(&mercator(), &containers(1))
        .expect("mismatch is logged, not fatal");
    assert_eq!(renderer.instances().len(), 2);
    assert_eq!(renderer.instances()[1].target(), None);
}

#[test]
fn failed_and_empty_deliveries_update_loading_state() {
    let mut renderer = renderer(false);
    renderer
        .set_layers(vec![vector_layer(1, 1)])
        .expect("single layer");
    let changes = renderer.subscribe_loading_state();
    let viewport = ViewportState::new(Extent::new(0.0, 0.0, 100.0, 100.0), 1.0);

    let requests = renderer.fetch_requests(&viewport, None);
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].projection, "EPSG:3857");
    assert_eq!(renderer.loading_state(LayerId(1)), LoadingState::Loading);

    renderer
        .deliver_features(LayerId(1), Ok([square(7)].into_iter().collect()))
        .expect("vector layer");
    renderer
        .deliver_features(LayerId(1), Err(FetchError::Network("timeout".to_owned())))
        .expect("errors never abort");
    assert_eq!(renderer.loading_state(LayerId(1)), LoadingState::Error);
    assert_eq!(renderer.layer_feature_ids(LayerId(1)), vec![FeatureId::Number(7)]);

    renderer
        .deliver_features(LayerId(1), Err(FetchError::EmptyResult))
        .expect("vector layer");
    assert_eq!(renderer.loading_state(LayerId(1)), LoadingState::Ok);
    assert!(renderer.layer_feature_ids(LayerId(1)).is_empty());
    assert_eq!(renderer.layer_extent(LayerId(1)), None);

    let states: Vec<_> = changes.try_iter().map(|change| change.state).collect();
    assert_eq!(
        states,
        vec![
            LoadingState::Loading,
            LoadingState::Ok,
            LoadingState::Error,
            LoadingState::Ok
        ]
    );
}

#[test]
fn tile_events_of_unbound_layers_are_ignored() {
    let mut renderer = renderer(false);
    renderer
        .set_layers(vec![vector_layer(1, 1)])
        .expect("single layer");
    let changes = renderer.subscribe_loading_state();

    renderer.tile_load_start(LayerId(9));
    renderer.tile_load_error(LayerId(9));
    renderer.tile_load_end(LayerId(9));
    assert_eq!(renderer.loading_state(LayerId(9)), LoadingState::Ok);
    assert!(!renderer.loading.is_tracking(LayerId(9)));

    renderer.tile_load_start(LayerId(1));
    assert_eq!(renderer.loading_state(LayerId(1)), LoadingState::Loading);
    renderer.set_layers(Vec::new()).expect("no layers");
    assert!(!renderer.loading.is_tracking(LayerId(1)));
    renderer.tile_load_end(LayerId(1));
    assert!(!renderer.loading.is_tracking(LayerId(1)));

    let events: Vec<_> = changes.try_iter().collect();
    assert_eq!(
        events,
        vec![LoadingStateChange {
            layer: LayerId(1),
            state: LoadingState::Loading,
        }]
    );
}

#[test]
fn feature_style_override_replaces_cached_style_until_cleared() {
    let mut renderer = renderer(false);
    renderer
        .set_layers(vec![vector_layer(1, 1)])
        .expect("single layer");
    renderer
        .deliver_features(
            LayerId(1),
            Ok(FeatureCollection::from_iter([square(1), square(2)])),
        )
        .expect("vector layer");
    let highlight = Arc::new(style::Style {
        fill: Some(style::HIGHLIGHT_FILL),
        ..(*renderer.styled_features(LayerId(1)).expect("vector layer")[0].style).clone()
    });

    assert!(
        renderer
            .set_feature_style(LayerId(1), &FeatureId::Number(2), Arc::clone(&highlight))
            .expect("vector layer")
    );
    assert!(
        !renderer
            .set_feature_style(LayerId(1), &FeatureId::Number(9), Arc::clone(&highlight))
            .expect("vector layer")
    );

    let styled = renderer.styled_features(LayerId(1)).expect("vector layer");
    assert!(!styled[0].overridden);
    assert!(styled[1].overridden);
    assert_eq!(styled[1].style.fill, Some(style::HIGHLIGHT_FILL));

    renderer
        .clear_feature_style(LayerId(1), &FeatureId::Number(2))
        .expect("vector layer");
    let styled = renderer.styled_features(LayerId(1)).expect("vector layer");
    assert!(Arc::ptr_eq(&styled[0].style, &styled[1].style));
}

#[test]
fn zoom_operations_respect_limits_and_secondary_move_end_is_ignored() {
    let mut renderer = renderer(true);
    renderer
        .set_layers(vec![vector_layer(1, 1), vector_layer(2, 2)])
        .expect("distinct layers");
    renderer
        .redraw(&mercator(), &containers(2))
        .expect("redraw succeeds");

    for _ in 0..40 {
        renderer.zoom_in().expect("zoom in");
    }
    assert_eq!(renderer.camera().zoom(), 28.0);
    for _ in 0..40 {
        renderer.zoom_out().expect("zoom out");
    }
    assert_eq!(renderer.camera().zoom(), 0.0);

    assert_eq!(renderer.handle_move_end(1).expect("secondary view"), None);
    assert!(renderer.handle_move_end(0).expect("primary view").is_some());

    renderer
        .zoom_to(Extent::new(0.0, 0.0, 100_000.0, 100_000.0))
        .expect("zoom to extent");
    let viewport = renderer
        .current_viewport()
        .expect("viewport")
        .expect("primary has a container");
    assert!(viewport.extent.contains_extent(&Extent::new(0.0, 0.0, 100_000.0, 100_000.0)));
}

#[test]
fn unknown_layers_are_reported() {
    let mut renderer = renderer(false);
    assert_eq!(
        renderer.deliver_features(LayerId(4), Ok(FeatureCollection::new())),
        Err(RenderError::UnknownLayer(LayerId(4)))
    );
    assert_eq!(
        renderer.set_layers(vec![vector_layer(1, 1), vector_layer(1, 2)]),
        Err(RenderError::DuplicateLayer(LayerId(1)))
    );
}
