use model::GeometryType;
use render_protocol::{LayerId, LayerSlot};
use tracing::debug;

use crate::{GridViewRenderer, RenderError};

impl GridViewRenderer {
    /// Attaches the draw scratch layer and capture interaction to every
    /// instance. Redraws keep them attached until [`Self::detach_draw`].
    pub fn attach_draw(&mut self, geometry_type: GeometryType) -> Result<(), RenderError> {
        self.interaction_state.draw = Some(geometry_type);
        debug!(%geometry_type, instances = self.layout_state.instances.len(), "draw attached");
        self.republish()
    }

    pub fn detach_draw(&mut self) -> Result<(), RenderError> {
        if self.interaction_state.draw.take().is_some() {
            debug!("draw detached");
        }
        self.republish()
    }

    pub fn draw_geometry_type(&self) -> Option<GeometryType> {
        self.interaction_state.draw
    }

    /// Scopes the select interaction to `layer`. Returns the instance it was
    /// attached to, if the layer is shown.
    pub fn set_selection_target(
        &mut self,
        layer: Option<LayerId>,
    ) -> Result<Option<usize>, RenderError> {
        self.interaction_state.select = layer;
        self.republish()?;
        Ok(layer.and_then(|layer| self.instance_for_layer(layer)))
    }

    pub fn selection_target(&self) -> Option<LayerId> {
        self.interaction_state.select
    }

    /// Instance that currently renders `layer`.
    ///
    /// Before the first frame no instance holds layers yet, so the index is
    /// derived from the layer's position among visible layers: the only
    /// instance when there is one, otherwise the inverse position. Layers set
    /// after the last redraw are not considered until the next one.
    pub fn instance_for_layer(&self, layer: LayerId) -> Option<usize> {
        let rendering = self
            .layout_state
            .instances
            .iter()
            .find(|instance| {
                instance.layers.iter().any(
                    |slot| matches!(slot, LayerSlot::Data { layer: shown, .. } if *shown == layer),
                )
            })
            .map(|instance| instance.index());
        if rendering.is_some() || self.layout_state.snapshot.is_some() {
            return rendering;
        }
        let visible = self.visible_bindings();
        let position = visible.iter().position(|(candidate, _)| *candidate == layer)?;
        let instances = self.layout_state.instances.len();
        if instances == 1 {
            return Some(0);
        }
        instances.checked_sub(position + 1)
    }
}
