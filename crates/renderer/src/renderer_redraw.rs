//! Redraw orchestration.
//!
//! A redraw runs in a fixed order: view instances, projection and camera,
//! background, foreground layers, draw reattachment, select attachment and
//! finally snapshot publication. Background layers are rebuilt before any
//! foreground layer is assigned to an instance.

use std::sync::Arc;

use render_protocol::{
    ContainerTarget, FrameSnapshot, InteractionSlot, LayerId, LayerSlot, LayoutMode, RenderHandle,
};
use spatial::SpatialReference;
use tracing::{debug, error, info};
use view::ViewportState;

use crate::instance::ViewInstance;
use crate::{GridLayout, GridViewRenderer, RenderError, RenderResource, compute_grid, desired_count};

impl GridViewRenderer {
    /// Rebuilds every view instance for the current layer list.
    ///
    /// Returns the new viewport when the projection changed or on the first
    /// redraw, provided the primary instance has a container.
    pub fn redraw(
        &mut self,
        projection: &Arc<SpatialReference>,
        containers: &[ContainerTarget],
    ) -> Result<Option<ViewportState>, RenderError> {
        let visible = self.visible_bindings();
        let grid_mode = self.layout_state.grid_mode;
        let desired = desired_count(visible.len(), grid_mode);
        self.layout_state.grid = if grid_mode {
            compute_grid(desired, self.grid_aspect_ratio())
        } else {
            GridLayout::SINGLE
        };

        if grid_mode && !visible.is_empty() && containers.len() != visible.len() {
            error!(
                containers = containers.len(),
                layers = visible.len(),
                "race condition: render containers do not match visible layers"
            );
        }

        self.sync_instances(desired, containers);
        let first_redraw = self.layout_state.snapshot.is_none();
        let projection_changed = self.apply_projection(projection);
        self.rebuild_background(projection, projection_changed, desired);
        self.assign_layers(&visible);
        self.refresh_interactions();
        self.publish_snapshot()?;

        if projection_changed || first_redraw {
            self.current_viewport()
        } else {
            Ok(None)
        }
    }

    pub fn frame(&self) -> Option<&FrameSnapshot> {
        self.layout_state.snapshot.as_ref()
    }

    fn grid_aspect_ratio(&self) -> f64 {
        match self.layout_state.container_size {
            Some((width, height)) if height > 0 => f64::from(width) / f64::from(height),
            _ => 1.0,
        }
    }

    pub(crate) fn visible_bindings(&self) -> Vec<(LayerId, RenderHandle)> {
        self.binding_state
            .layers
            .iter()
            .filter(|layer| layer.visible)
            .filter_map(|layer| {
                self.binding_state
                    .bindings
                    .get(&layer.id)
                    .map(|binding| (binding.layer, binding.handle))
            })
            .collect()
    }

    fn sync_instances(&mut self, desired: usize, containers: &[ContainerTarget]) {
        let instances = &mut self.layout_state.instances;
        if instances.len() != desired {
            debug!(from = instances.len(), to = desired, "resizing view instances");
        }
        instances.truncate(desired);
        while instances.len() < desired {
            let index = instances.len();
            instances.push(ViewInstance::new(index, self.camera_state.cell.reader()));
        }
        for (index, instance) in instances.iter_mut().enumerate() {
            instance.target = containers.get(index).copied();
        }
    }

    /// Swaps the shared camera when the projection changed.
    fn apply_projection(&mut self, projection: &Arc<SpatialReference>) -> bool {
        let camera = self.camera_state.cell.load();
        if camera.projection().code() == projection.code() {
            return false;
        }
        info!(
            from = camera.projection().code(),
            to = projection.code(),
            "projection changed"
        );
        self.camera_state
            .cell
            .store(camera.reprojected(Arc::clone(projection)));
        for (_, resource) in self.binding_state.resources.iter_mut() {
            if let RenderResource::Raster(binding) = resource {
                binding.set_projection(projection.code());
            }
        }
        true
    }

    fn rebuild_background(
        &mut self,
        projection: &SpatialReference,
        projection_changed: bool,
        desired: usize,
    ) {
        let state = &mut self.background_state;
        if projection_changed || state.source.is_none() {
            state.source = Some(state.strategy.create_source(projection));
            state.source_generation += 1;
            state.layers.clear();
            info!(
                strategy = %state.strategy.kind(),
                projection = projection.code(),
                generation = state.source_generation,
                "background source rebuilt"
            );
        }
        let Some(source) = state.source.as_ref() else {
            return;
        };
        state.layers.truncate(desired);
        while state.layers.len() < desired {
            state
                .layers
                .push(state.strategy.create_layer(source, state.source_generation));
        }
    }

    fn assign_layers(&mut self, visible: &[(LayerId, RenderHandle)]) {
        let grid_mode = self.layout_state.grid_mode;
        for (index, instance) in self.layout_state.instances.iter_mut().enumerate() {
            instance.layers.clear();
            if let Some(background) = self.background_state.layers.get(index) {
                instance.layers.push(LayerSlot::Background {
                    generation: background.source_generation,
                });
            }
            let data = |(layer, handle): &(LayerId, RenderHandle)| LayerSlot::Data {
                layer: *layer,
                handle: *handle,
            };
            if grid_mode {
                if let Some(entry) = visible
                    .len()
                    .checked_sub(index + 1)
                    .and_then(|inverse| visible.get(inverse))
                {
                    instance.layers.push(data(entry));
                }
            } else {
                instance.layers.extend(visible.iter().map(data));
            }
        }
    }

    /// Detaches draw and select from every instance and attaches them again
    /// for the current instance set.
    pub(crate) fn refresh_interactions(&mut self) {
        let draw = self.interaction_state.draw;
        let select = self
            .interaction_state
            .select
            .and_then(|layer| self.instance_for_layer(layer).map(|index| (layer, index)));

        for instance in &mut self.layout_state.instances {
            instance
                .layers
                .retain(|slot| !matches!(slot, LayerSlot::DrawScratch));
            instance.interactions.clear();
            if let Some(geometry_type) = draw {
                instance.layers.push(LayerSlot::DrawScratch);
                instance
                    .interactions
                    .push(InteractionSlot::Draw(geometry_type));
            }
            if let Some((layer, index)) = select {
                if index == instance.index() {
                    instance.interactions.push(InteractionSlot::Select { layer });
                }
            }
        }
    }

    pub(crate) fn publish_snapshot(&mut self) -> Result<(), RenderError> {
        self.layout_state.revision += 1;
        let snapshot = FrameSnapshot {
            revision: self.layout_state.revision,
            frames: self
                .layout_state
                .instances
                .iter()
                .map(ViewInstance::to_frame)
                .collect(),
        };
        let mode = if self.layout_state.grid_mode {
            LayoutMode::Grid
        } else {
            LayoutMode::Overlay
        };
        snapshot
            .validate_layout(mode)
            .map_err(RenderError::InvalidFrame)?;
        debug!(
            revision = snapshot.revision,
            instances = snapshot.frames.len(),
            "frame snapshot published"
        );
        self.layout_state.snapshot = Some(snapshot);
        Ok(())
    }

    /// Publishes a new snapshot if a frame was drawn before.
    pub(crate) fn republish(&mut self) -> Result<(), RenderError> {
        if self.layout_state.snapshot.is_none() {
            return Ok(());
        }
        self.refresh_interactions();
        self.publish_snapshot()
    }
}
