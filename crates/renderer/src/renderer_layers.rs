//! Layer bindings, data delivery and feature styling.

use std::collections::HashSet;
use std::sync::Arc;

use crossbeam_channel::Receiver;
use model::{Feature, FeatureCollection, FeatureId};
use render_protocol::{LayerId, LoadingState, LoadingStateChange};
use spatial::Extent;
use style::{Style, VectorSymbology};
use tracing::{debug, info};
use view::ViewportState;

use crate::binding::VectorResource;
use crate::{
    FetchError, FetchRequest, GridViewRenderer, LayerBinding, LayerDescriptor, RenderError,
    RenderResource, TimeInterval,
};

/// Feature with the style it is drawn with.
#[derive(Debug, Clone)]
pub struct StyledFeature<'a> {
    pub feature: &'a Feature,
    pub style: Arc<Style>,
    /// `true` when the style is a per-feature override such as a highlight.
    pub overridden: bool,
}

impl GridViewRenderer {
    /// Replaces the layer list and reconciles bindings for visible layers.
    ///
    /// Bindings survive when the data source is unchanged. A changed source
    /// releases the old render handle before the replacement is created. A
    /// changed symbology swaps styling without touching the data.
    pub fn set_layers(&mut self, layers: Vec<LayerDescriptor>) -> Result<(), RenderError> {
        let mut seen = HashSet::with_capacity(layers.len());
        for layer in &layers {
            if !seen.insert(layer.id) {
                return Err(RenderError::DuplicateLayer(layer.id));
            }
        }

        let projection = self.camera_state.cell.load().projection().code().to_owned();
        let visible: HashSet<LayerId> = layers
            .iter()
            .filter(|layer| layer.visible)
            .map(|layer| layer.id)
            .collect();
        let stale: Vec<LayerId> = self
            .binding_state
            .bindings
            .keys()
            .filter(|layer| !visible.contains(layer))
            .copied()
            .collect();
        for layer in stale {
            self.release_binding(layer);
        }

        for descriptor in layers.iter().filter(|layer| layer.visible) {
            self.reconcile_binding(descriptor, &projection);
        }
        self.binding_state.layers = layers;
        Ok(())
    }

    fn reconcile_binding(&mut self, descriptor: &LayerDescriptor, projection: &str) {
        let state = &mut self.binding_state;
        match state.bindings.get_mut(&descriptor.id) {
            Some(binding) if binding.source == descriptor.source => {
                if binding.symbology == descriptor.symbology {
                    return;
                }
                let applied = state
                    .resources
                    .get_mut(binding.handle)
                    .is_some_and(|resource| resource.apply_symbology(&descriptor.symbology));
                binding.symbology = descriptor.symbology.clone();
                if applied {
                    debug!(layer = %descriptor.id, "symbology replaced");
                    return;
                }
                // kind changed, rebuild the resource
                self.release_binding(descriptor.id);
            }
            Some(_) => self.release_binding(descriptor.id),
            None => {}
        }

        let resource = RenderResource::for_symbology(&descriptor.symbology, projection);
        let handle = self.binding_state.resources.insert(resource);
        self.binding_state.bindings.insert(
            descriptor.id,
            LayerBinding {
                layer: descriptor.id,
                source: descriptor.source,
                symbology: descriptor.symbology.clone(),
                handle,
            },
        );
        info!(layer = %descriptor.id, name = %descriptor.name, "layer binding created");
    }

    fn release_binding(&mut self, layer: LayerId) {
        let Some(binding) = self.binding_state.bindings.remove(&layer) else {
            return;
        };
        self.binding_state.resources.remove(binding.handle);
        self.loading.forget(layer);
        info!(%layer, "layer binding released");
    }

    pub fn layers(&self) -> &[LayerDescriptor] {
        &self.binding_state.layers
    }

    pub fn visible_layers(&self) -> Vec<LayerId> {
        self.visible_bindings()
            .into_iter()
            .map(|(layer, _)| layer)
            .collect()
    }

    pub fn binding(&self, layer: LayerId) -> Option<&LayerBinding> {
        self.binding_state.bindings.get(&layer)
    }

    pub fn resource(&self, layer: LayerId) -> Option<&RenderResource> {
        let binding = self.binding_state.bindings.get(&layer)?;
        self.binding_state.resources.get(binding.handle)
    }

    fn vector_resource_mut(&mut self, layer: LayerId) -> Result<&mut VectorResource, RenderError> {
        let binding = self
            .binding_state
            .bindings
            .get(&layer)
            .ok_or(RenderError::UnknownLayer(layer))?;
        match self.binding_state.resources.get_mut(binding.handle) {
            Some(RenderResource::Vector(resource)) => Ok(resource),
            Some(RenderResource::Raster(_)) => Err(RenderError::NotVectorLayer(layer)),
            None => Err(RenderError::UnknownLayer(layer)),
        }
    }

    /// Applies a feature response. Failures only change the loading state.
    pub fn deliver_features(
        &mut self,
        layer: LayerId,
        result: Result<FeatureCollection, FetchError>,
    ) -> Result<(), RenderError> {
        let resource = self.vector_resource_mut(layer)?;
        match result {
            Ok(features) => {
                debug!(%layer, features = features.len(), "features delivered");
                resource.replace_features(features);
                self.loading.fetch_finished(layer, Ok(()));
            }
            Err(FetchError::EmptyResult) => {
                resource.replace_features(FeatureCollection::new());
                self.loading.fetch_finished(layer, Err(&FetchError::EmptyResult));
            }
            Err(error) => self.loading.fetch_finished(layer, Err(&error)),
        }
        Ok(())
    }

    /// One request per visible layer; vector layers switch to loading.
    pub fn fetch_requests(
        &mut self,
        viewport: &ViewportState,
        time: Option<TimeInterval>,
    ) -> Vec<FetchRequest> {
        self.set_time(time);
        let projection = self.camera_state.cell.load().projection().code().to_owned();
        let mut requests = Vec::new();
        for (layer, handle) in self.visible_bindings() {
            let Some(binding) = self.binding_state.bindings.get(&layer) else {
                continue;
            };
            requests.push(FetchRequest {
                layer,
                source: binding.source,
                time,
                extent: viewport.extent,
                projection: projection.clone(),
            });
            if matches!(
                self.binding_state.resources.get(handle),
                Some(RenderResource::Vector(_))
            ) {
                self.loading.fetch_started(layer);
            }
        }
        requests
    }

    /// Updates raster service parameters in place.
    pub fn set_time(&mut self, time: Option<TimeInterval>) {
        if self.binding_state.time == time {
            return;
        }
        self.binding_state.time = time;
        for (_, resource) in self.binding_state.resources.iter_mut() {
            if let RenderResource::Raster(binding) = resource {
                binding.time = time;
            }
        }
    }

    /// Tile events of layers without a binding are dropped, since nothing
    /// would forget their counters.
    pub fn tile_load_start(&mut self, layer: LayerId) {
        if self.is_bound(layer, "tile load start") {
            self.loading.tile_load_start(layer);
        }
    }

    pub fn tile_load_end(&mut self, layer: LayerId) {
        if self.is_bound(layer, "tile load end") {
            self.loading.tile_load_end(layer);
        }
    }

    pub fn tile_load_error(&mut self, layer: LayerId) {
        if self.is_bound(layer, "tile load error") {
            self.loading.tile_load_error(layer);
        }
    }

    fn is_bound(&self, layer: LayerId, event: &'static str) -> bool {
        let bound = self.binding_state.bindings.contains_key(&layer);
        if !bound {
            debug!(%layer, event, "ignoring event of unbound layer");
        }
        bound
    }

    pub fn loading_state(&self, layer: LayerId) -> LoadingState {
        self.loading.state(layer)
    }

    pub fn subscribe_loading_state(&mut self) -> Receiver<LoadingStateChange> {
        self.loading.subscribe()
    }

    /// Every feature of `layer` with its override or cached default style.
    pub fn styled_features(&mut self, layer: LayerId) -> Result<Vec<StyledFeature<'_>>, RenderError> {
        let VectorResource {
            features,
            style_cache,
            overrides,
        } = self.vector_resource_mut(layer)?;
        let features: &FeatureCollection = features;
        Ok(features
            .iter()
            .map(|feature| {
                let overridden = feature.id.as_ref().and_then(|id| overrides.get(id));
                match overridden {
                    Some(style) => StyledFeature {
                        feature,
                        style: Arc::clone(style),
                        overridden: true,
                    },
                    None => StyledFeature {
                        feature,
                        style: style_cache.get_style(feature),
                        overridden: false,
                    },
                }
            })
            .collect())
    }

    /// Overrides the style of one feature. Returns `false` if the layer has
    /// no feature with that id.
    pub fn set_feature_style(
        &mut self,
        layer: LayerId,
        id: &FeatureId,
        style: Arc<Style>,
    ) -> Result<bool, RenderError> {
        let resource = self.vector_resource_mut(layer)?;
        if resource.features.get(id).is_none() {
            return Ok(false);
        }
        resource.overrides.insert(id.clone(), style);
        Ok(true)
    }

    /// Drops the override so the cached default style applies again.
    pub fn clear_feature_style(&mut self, layer: LayerId, id: &FeatureId) -> Result<(), RenderError> {
        self.vector_resource_mut(layer)?.overrides.remove(id);
        Ok(())
    }

    pub fn layer_symbology(&self, layer: LayerId) -> Option<Arc<VectorSymbology>> {
        self.binding(layer)?.symbology.as_vector().cloned()
    }

    pub fn feature(&self, layer: LayerId, id: &FeatureId) -> Option<&Feature> {
        self.resource(layer)
            .and_then(RenderResource::as_vector)?
            .features()
            .get(id)
    }

    pub fn layer_feature_ids(&self, layer: LayerId) -> Vec<FeatureId> {
        self.resource(layer)
            .and_then(RenderResource::as_vector)
            .map(|resource| {
                resource
                    .features()
                    .iter()
                    .filter_map(|feature| feature.id.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Bounding extent of the layer's features in map units.
    pub fn layer_extent(&self, layer: LayerId) -> Option<Extent> {
        let extent = self
            .resource(layer)
            .and_then(RenderResource::as_vector)?
            .features()
            .extent();
        (!extent.is_empty()).then_some(extent)
    }
}
