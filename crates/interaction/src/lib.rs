//! User interactions layered on top of the renderer: geometry drawing and
//! feature selection.
//!
//! Both controllers talk to the renderer through narrow surface traits so the
//! host can drive them against any view implementation.

mod draw;
mod selection;

use std::sync::Arc;

use model::{Feature, FeatureId, GeometryType};
use render_protocol::LayerId;
use renderer::{GridViewRenderer, RenderError};
use style::{Style, VectorSymbology};

pub use draw::{DrawError, DrawInteractionController, ScratchSource};
pub use selection::{SelectionState, SelectionSynchronizer};

/// Views that can host the draw scratch layer and capture interaction.
pub trait DrawSurface {
    fn attach_draw(&mut self, geometry_type: GeometryType) -> Result<(), RenderError>;
    fn detach_draw(&mut self) -> Result<(), RenderError>;
}

/// Views that can scope a select interaction to one layer and restyle
/// individual features.
pub trait SelectionSurface {
    fn set_selection_target(&mut self, layer: Option<LayerId>)
    -> Result<Option<usize>, RenderError>;
    fn layer_symbology(&self, layer: LayerId) -> Option<Arc<VectorSymbology>>;
    fn feature(&self, layer: LayerId, id: &FeatureId) -> Option<&Feature>;
    fn set_feature_style(
        &mut self,
        layer: LayerId,
        id: &FeatureId,
        style: Arc<Style>,
    ) -> Result<bool, RenderError>;
    fn clear_feature_style(&mut self, layer: LayerId, id: &FeatureId) -> Result<(), RenderError>;
}

impl DrawSurface for GridViewRenderer {
    fn attach_draw(&mut self, geometry_type: GeometryType) -> Result<(), RenderError> {
        GridViewRenderer::attach_draw(self, geometry_type)
    }

    fn detach_draw(&mut self) -> Result<(), RenderError> {
        GridViewRenderer::detach_draw(self)
    }
}

impl SelectionSurface for GridViewRenderer {
    fn set_selection_target(
        &mut self,
        layer: Option<LayerId>,
    ) -> Result<Option<usize>, RenderError> {
        GridViewRenderer::set_selection_target(self, layer)
    }

    fn layer_symbology(&self, layer: LayerId) -> Option<Arc<VectorSymbology>> {
        GridViewRenderer::layer_symbology(self, layer)
    }

    fn feature(&self, layer: LayerId, id: &FeatureId) -> Option<&Feature> {
        GridViewRenderer::feature(self, layer, id)
    }

    fn set_feature_style(
        &mut self,
        layer: LayerId,
        id: &FeatureId,
        style: Arc<Style>,
    ) -> Result<bool, RenderError> {
        GridViewRenderer::set_feature_style(self, layer, id, style)
    }

    fn clear_feature_style(&mut self, layer: LayerId, id: &FeatureId) -> Result<(), RenderError> {
        GridViewRenderer::clear_feature_style(self, layer, id)
    }
}
