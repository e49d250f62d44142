use std::sync::Arc;

use crossbeam_channel::Receiver;
use interaction::{DrawInteractionController, ScratchSource, SelectionSynchronizer};
use model::{Coordinate, Feature, FeatureCollection, FeatureId, GeometryType};
use render_protocol::{ContainerTarget, LayerId, LoadingState, LoadingStateChange, SelectionChange};
use renderer::{FetchError, FetchRequest, GridViewRenderer, LayerDescriptor, TimeInterval};
use serde_json::Value;
use spatial::{Extent, SpatialReference, SpatialReferenceRegistry};
use tracing::{debug, info};
use view::{ViewportState, ViewportTracker};

use crate::{MapConfig, MapError};

/// Property every completed drawing carries, numbered from 1.
pub const DRAW_ID_PROPERTY: &str = "id";

/// Result of finishing a draw session.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCompletion {
    /// GeoJSON feature collection in the configured output CRS.
    Features(Value),
    /// Nothing was drawn; hosts show a notice instead of creating a layer.
    Empty,
}

/// Wires the renderer, viewport tracking, drawing and selection together
/// behind the operations a host application calls.
pub struct MapContainer {
    config: MapConfig,
    projection: Arc<SpatialReference>,
    output_crs: Arc<SpatialReference>,
    renderer: GridViewRenderer,
    viewport: ViewportTracker,
    draw: DrawInteractionController,
    selection: SelectionSynchronizer,
    containers: Vec<ContainerTarget>,
    time: Option<TimeInterval>,
}

impl MapContainer {
    pub fn new(config: MapConfig) -> Result<Self, MapError> {
        config.validate()?;
        let registry = SpatialReferenceRegistry::global();
        let projection = registry.from_code(&config.initial_projection)?;
        let output_crs = registry.from_code(&config.output_crs)?;
        let renderer = GridViewRenderer::new(&config.renderer_config(), Arc::clone(&projection))?;
        info!(
            projection = projection.code(),
            grid = config.grid,
            background = %renderer.background_strategy().kind(),
            "map container created"
        );
        Ok(Self {
            config,
            projection,
            output_crs,
            renderer,
            viewport: ViewportTracker::new(),
            draw: DrawInteractionController::new(),
            selection: SelectionSynchronizer::new(),
            containers: Vec::new(),
            time: None,
        })
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    pub fn renderer(&self) -> &GridViewRenderer {
        &self.renderer
    }

    pub fn projection(&self) -> &Arc<SpatialReference> {
        &self.projection
    }

    pub fn viewport(&self) -> ViewportState {
        self.viewport.viewport()
    }

    pub fn subscribe_viewport(&mut self) -> Receiver<ViewportState> {
        self.viewport.subscribe()
    }

    pub fn subscribe_loading_state(&mut self) -> Receiver<LoadingStateChange> {
        self.renderer.subscribe_loading_state()
    }

    pub fn subscribe_selection(&mut self) -> Receiver<SelectionChange> {
        self.selection.subscribe()
    }

    /// Redraws with the render containers the host created for the views.
    /// Returns `true` when a new viewport was published.
    pub fn redraw(&mut self, containers: Vec<ContainerTarget>) -> Result<bool, MapError> {
        self.containers = containers;
        let viewport = self.renderer.redraw(&self.projection, &self.containers)?;
        match viewport {
            Some(viewport) => self.publish_viewport(viewport),
            None => Ok(false),
        }
    }

    pub fn set_layers(&mut self, layers: Vec<LayerDescriptor>) -> Result<(), MapError> {
        self.renderer.set_layers(layers)?;
        Ok(())
    }

    pub fn set_projection(&mut self, code: &str) -> Result<bool, MapError> {
        let projection = SpatialReferenceRegistry::global().from_code(code)?;
        if projection.code() == self.projection.code() {
            return Ok(false);
        }
        self.projection = projection;
        let containers = std::mem::take(&mut self.containers);
        self.redraw(containers)
    }

    pub fn set_grid_mode(&mut self, grid: bool) {
        self.renderer.set_grid_mode(grid);
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.renderer.resize(width, height);
    }

    pub fn set_time(&mut self, time: Option<TimeInterval>) {
        self.time = time;
        self.renderer.set_time(time);
    }

    /// Move-end of a view. Returns `true` when a new viewport was published.
    pub fn handle_move_end(&mut self, instance_index: usize) -> Result<bool, MapError> {
        match self.renderer.handle_move_end(instance_index)? {
            Some(viewport) => self.publish_viewport(viewport),
            None => Ok(false),
        }
    }

    pub fn zoom_in(&mut self) -> Result<bool, MapError> {
        self.renderer.zoom_in()?;
        self.sync_viewport()
    }

    pub fn zoom_out(&mut self) -> Result<bool, MapError> {
        self.renderer.zoom_out()?;
        self.sync_viewport()
    }

    pub fn zoom_to(&mut self, extent: Extent) -> Result<bool, MapError> {
        self.renderer.zoom_to(extent)?;
        self.sync_viewport()
    }

    /// Zooms to the features of `layer`. Returns `false` for empty layers.
    pub fn zoom_to_layer(&mut self, layer: LayerId) -> Result<bool, MapError> {
        match self.renderer.layer_extent(layer) {
            Some(extent) => self.zoom_to(extent),
            None => Ok(false),
        }
    }

    pub fn pan_by(&mut self, delta_x: f64, delta_y: f64) -> Result<bool, MapError> {
        self.renderer.pan_by(delta_x, delta_y)?;
        self.sync_viewport()
    }

    /// Requests for every visible layer at the current viewport.
    pub fn fetch_requests(&mut self) -> Vec<FetchRequest> {
        let viewport = self.viewport.viewport();
        self.renderer.fetch_requests(&viewport, self.time)
    }

    pub fn deliver_features(
        &mut self,
        layer: LayerId,
        result: Result<FeatureCollection, FetchError>,
    ) -> Result<(), MapError> {
        self.renderer.deliver_features(layer, result)?;
        if self.selection.selected_layer() == Some(layer) {
            self.selection.refresh_highlights(&mut self.renderer)?;
        }
        Ok(())
    }

    pub fn tile_load_start(&mut self, layer: LayerId) {
        self.renderer.tile_load_start(layer);
    }

    pub fn tile_load_end(&mut self, layer: LayerId) {
        self.renderer.tile_load_end(layer);
    }

    pub fn tile_load_error(&mut self, layer: LayerId) {
        self.renderer.tile_load_error(layer);
    }

    pub fn loading_state(&self, layer: LayerId) -> LoadingState {
        self.renderer.loading_state(layer)
    }

    pub fn start_draw(&mut self, geometry_type: GeometryType) -> Result<(), MapError> {
        self.draw.start_draw(&mut self.renderer, geometry_type)?;
        Ok(())
    }

    pub fn capture_sketch(&mut self, coordinates: &[Coordinate]) -> Result<&Feature, MapError> {
        Ok(self.draw.capture(coordinates)?)
    }

    pub fn is_drawing(&self) -> bool {
        self.draw.is_capturing()
    }

    /// Finishes the draw session. `None` when no session was running.
    pub fn end_draw(&mut self) -> Result<Option<DrawCompletion>, MapError> {
        let Some(scratch) = self.draw.end_draw(&mut self.renderer)? else {
            return Ok(None);
        };
        if scratch.is_empty() {
            info!("draw finished without features");
            return Ok(Some(DrawCompletion::Empty));
        }
        let collection = self.completed_features(scratch)?;
        Ok(Some(DrawCompletion::Features(collection)))
    }

    pub fn cancel_draw(&mut self) -> Result<(), MapError> {
        self.draw.cancel_draw(&mut self.renderer)?;
        Ok(())
    }

    pub fn select_layer(&mut self, layer: Option<LayerId>) -> Result<Option<usize>, MapError> {
        Ok(self.selection.select_layer(&mut self.renderer, layer)?)
    }

    pub fn on_user_select(
        &mut self,
        selected: &[FeatureId],
        deselected: &[FeatureId],
    ) -> Result<SelectionChange, MapError> {
        Ok(self
            .selection
            .on_user_select(&mut self.renderer, selected, deselected)?)
    }

    pub fn update_selected_features(
        &mut self,
        add: &[FeatureId],
        remove: &[FeatureId],
    ) -> Result<SelectionChange, MapError> {
        Ok(self
            .selection
            .update_selected_features(&mut self.renderer, add, remove)?)
    }

    pub fn selection(&self) -> &SelectionSynchronizer {
        &self.selection
    }

    fn sync_viewport(&mut self) -> Result<bool, MapError> {
        match self.renderer.current_viewport()? {
            Some(viewport) => self.publish_viewport(viewport),
            None => Ok(false),
        }
    }

    fn publish_viewport(&mut self, viewport: ViewportState) -> Result<bool, MapError> {
        if !self.viewport.set_viewport(viewport)? {
            return Ok(false);
        }
        let stored = self.viewport.viewport();
        debug!(
            resolution = stored.resolution,
            extent = ?stored.extent.to_array(),
            "viewport published"
        );
        self.selection.on_viewport(&mut self.renderer, &stored);
        Ok(true)
    }

    fn completed_features(&self, scratch: ScratchSource) -> Result<Value, MapError> {
        let numbered: FeatureCollection = scratch
            .into_features()
            .into_iter()
            .zip(1_u64..)
            .map(|(feature, id)| {
                feature
                    .with_id(id)
                    .with_attribute(DRAW_ID_PROPERTY, id as f64)
            })
            .collect();
        Ok(numbered.to_geojson(&self.projection, &self.output_crs)?)
    }
}
