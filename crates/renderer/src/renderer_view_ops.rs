use std::sync::Arc;

use spatial::Extent;
use tracing::debug;
use view::{Camera, CameraRef, ViewportState};

use crate::{GridViewRenderer, RenderError};

const FALLBACK_VIEW_SIZE: (u32, u32) = (256, 256);

impl GridViewRenderer {
    pub fn camera(&self) -> Arc<Camera> {
        self.camera_state.cell.load()
    }

    pub fn camera_reader(&self) -> CameraRef {
        self.camera_state.cell.reader()
    }

    /// Viewport of the primary instance, `None` while it has no container.
    pub fn current_viewport(&self) -> Result<Option<ViewportState>, RenderError> {
        let Some((width, height)) = self.primary_size() else {
            return Ok(None);
        };
        let camera = self.camera_state.cell.load();
        let extent = camera.calculate_extent(width, height)?;
        Ok(Some(
            ViewportState::new(extent, camera.resolution())
                .with_max_extent(camera.projection().extent()),
        ))
    }

    /// Move-end of a view instance. Only the primary instance reports.
    pub fn handle_move_end(&self, instance_index: usize) -> Result<Option<ViewportState>, RenderError> {
        if instance_index != 0 {
            debug!(instance_index, "ignoring move end of secondary view");
            return Ok(None);
        }
        self.current_viewport()
    }

    pub fn zoom_in(&mut self) -> Result<(), RenderError> {
        let camera = self.camera_state.cell.load();
        if camera.zoom() < camera.limits().max_zoom {
            self.camera_state.cell.store(camera.adjusted_zoom(1.0)?);
        }
        Ok(())
    }

    pub fn zoom_out(&mut self) -> Result<(), RenderError> {
        let camera = self.camera_state.cell.load();
        if camera.zoom() > camera.limits().min_zoom {
            self.camera_state.cell.store(camera.adjusted_zoom(-1.0)?);
        }
        Ok(())
    }

    /// Centers on `extent` at the nearest zoom that shows all of it.
    pub fn zoom_to(&mut self, extent: Extent) -> Result<(), RenderError> {
        let (width, height) = self.primary_size().unwrap_or(FALLBACK_VIEW_SIZE);
        let camera = self.camera_state.cell.load();
        self.camera_state
            .cell
            .store(camera.fitted_to(extent, width, height)?);
        Ok(())
    }

    /// Pans by a distance in map units.
    pub fn pan_by(&mut self, delta_x: f64, delta_y: f64) -> Result<(), RenderError> {
        let camera = self.camera_state.cell.load();
        self.camera_state.cell.store(camera.panned_by(delta_x, delta_y)?);
        Ok(())
    }

    /// Takes effect on the next redraw.
    pub fn set_grid_mode(&mut self, grid: bool) {
        self.layout_state.grid_mode = grid;
    }

    /// Records the size of the element hosting the grid. Takes effect on the
    /// next redraw.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.layout_state.container_size = Some((width, height));
    }

    fn primary_size(&self) -> Option<(u32, u32)> {
        self.layout_state
            .instances
            .first()
            .and_then(|instance| instance.target())
            .filter(|target| target.width > 0 && target.height > 0)
            .map(|target| (target.width, target.height))
    }
}
