use std::collections::BTreeSet;
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, unbounded};
use model::FeatureId;
use render_protocol::{LayerId, SelectionChange};
use renderer::RenderError;
use style::{StyleCache, VectorSymbology};
use tracing::{debug, info, warn};
use view::ViewportState;

use crate::SelectionSurface;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    pub selected_layer: Option<LayerId>,
    pub selected_feature_ids: BTreeSet<FeatureId>,
}

/// Highlight styles derived from one version of the selected layer's
/// symbology.
#[derive(Debug)]
struct HighlightStyles {
    base: Arc<VectorSymbology>,
    cache: StyleCache,
}

/// Keeps the selected features, their highlight styling and the selection
/// change stream in step with the select interaction.
#[derive(Debug, Default)]
pub struct SelectionSynchronizer {
    state: SelectionState,
    resolution: Option<f64>,
    highlight: Option<HighlightStyles>,
    subscribers: Vec<Sender<SelectionChange>>,
}

impl SelectionSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn selected_layer(&self) -> Option<LayerId> {
        self.state.selected_layer
    }

    pub fn selected_feature_ids(&self) -> &BTreeSet<FeatureId> {
        &self.state.selected_feature_ids
    }

    pub fn subscribe(&mut self) -> Receiver<SelectionChange> {
        let (sender, receiver) = unbounded();
        self.subscribers.push(sender);
        receiver
    }

    /// Moves the select interaction to `layer` and re-highlights the current
    /// selection there. Returns the view instance the interaction lives on.
    pub fn select_layer(
        &mut self,
        surface: &mut impl SelectionSurface,
        layer: Option<LayerId>,
    ) -> Result<Option<usize>, RenderError> {
        self.reset_highlights(surface);
        self.state.selected_layer = layer;
        self.highlight = None;
        let instance = surface.set_selection_target(layer)?;
        info!(?layer, ?instance, "selection layer changed");

        self.refresh_highlights(surface)?;
        Ok(instance)
    }

    /// Highlights every selected feature of the selected layer again, after
    /// its data was replaced.
    pub fn refresh_highlights(
        &mut self,
        surface: &mut impl SelectionSurface,
    ) -> Result<(), RenderError> {
        let Some(layer) = self.state.selected_layer else {
            return Ok(());
        };
        let ids: Vec<FeatureId> = self.state.selected_feature_ids.iter().cloned().collect();
        for id in &ids {
            self.highlight_feature(surface, layer, id)?;
        }
        Ok(())
    }

    /// Clears the selection when the resolution changed since the last
    /// viewport.
    pub fn on_viewport(&mut self, surface: &mut impl SelectionSurface, viewport: &ViewportState) {
        let previous = self.resolution.replace(viewport.resolution);
        if previous.is_none_or(|resolution| resolution == viewport.resolution) {
            return;
        }
        if self.state.selected_feature_ids.is_empty() {
            return;
        }
        self.reset_highlights(surface);
        let removed: Vec<FeatureId> = std::mem::take(&mut self.state.selected_feature_ids)
            .into_iter()
            .collect();
        debug!(cleared = removed.len(), "selection cleared on resolution change");
        self.publish(SelectionChange {
            added: Vec::new(),
            removed,
        });
    }

    /// Applies a selection made through the select interaction.
    pub fn on_user_select(
        &mut self,
        surface: &mut impl SelectionSurface,
        selected: &[FeatureId],
        deselected: &[FeatureId],
    ) -> Result<SelectionChange, RenderError> {
        self.update_selected_features(surface, selected, deselected)
    }

    /// Applies a selection made outside the map, such as from a layer list.
    pub fn update_selected_features(
        &mut self,
        surface: &mut impl SelectionSurface,
        add: &[FeatureId],
        remove: &[FeatureId],
    ) -> Result<SelectionChange, RenderError> {
        let layer = self.state.selected_layer;
        let mut change = SelectionChange::default();

        for id in remove {
            if !self.state.selected_feature_ids.remove(id) {
                continue;
            }
            if let Some(layer) = layer {
                surface.clear_feature_style(layer, id)?;
            }
            change.removed.push(id.clone());
        }
        for id in add {
            if !self.state.selected_feature_ids.insert(id.clone()) {
                continue;
            }
            if let Some(layer) = layer {
                self.highlight_feature(surface, layer, id)?;
            }
            change.added.push(id.clone());
        }

        if !change.is_empty() {
            debug!(
                added = change.added.len(),
                removed = change.removed.len(),
                selected = self.state.selected_feature_ids.len(),
                "selection changed"
            );
            self.publish(change.clone());
        }
        Ok(change)
    }

    fn highlight_feature(
        &mut self,
        surface: &mut impl SelectionSurface,
        layer: LayerId,
        id: &FeatureId,
    ) -> Result<(), RenderError> {
        let Some(symbology) = surface.layer_symbology(layer) else {
            debug!(%layer, "layer has no vector symbology to highlight");
            return Ok(());
        };
        let styles = match self.highlight.take() {
            Some(styles) if Arc::ptr_eq(&styles.base, &symbology) => styles,
            _ => HighlightStyles {
                cache: StyleCache::new(Arc::new(symbology.highlight())),
                base: symbology,
            },
        };
        let styles = self.highlight.insert(styles);
        let Some(style) = surface
            .feature(layer, id)
            .map(|feature| styles.cache.get_style(feature))
        else {
            debug!(%layer, %id, "selected feature not loaded");
            return Ok(());
        };
        surface.set_feature_style(layer, id, style)?;
        Ok(())
    }

    fn reset_highlights(&mut self, surface: &mut impl SelectionSurface) {
        let Some(layer) = self.state.selected_layer else {
            return;
        };
        for id in &self.state.selected_feature_ids {
            if let Err(error) = surface.clear_feature_style(layer, id) {
                warn!(%layer, %id, %error, "could not reset highlight");
            }
        }
    }

    fn publish(&mut self, change: SelectionChange) {
        self.subscribers
            .retain(|subscriber| subscriber.send(change.clone()).is_ok());
    }
}
