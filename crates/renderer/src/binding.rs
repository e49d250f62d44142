use std::collections::HashMap;
use std::sync::Arc;

use model::{FeatureCollection, FeatureId};
use render_protocol::{DataSourceHandle, LayerId, RenderHandle};
use style::{RasterSymbology, Style, StyleCache, Symbology, VectorSymbology};

use crate::TimeInterval;

/// Layer as listed by the host, in bottom-to-top order.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerDescriptor {
    pub id: LayerId,
    pub name: String,
    pub visible: bool,
    pub symbology: Symbology,
    pub source: DataSourceHandle,
}

/// Connects a visible layer to the render resource it owns.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerBinding {
    pub layer: LayerId,
    pub source: DataSourceHandle,
    pub symbology: Symbology,
    pub handle: RenderHandle,
}

#[derive(Debug)]
pub struct VectorResource {
    pub(crate) features: FeatureCollection,
    pub(crate) style_cache: StyleCache,
    pub(crate) overrides: HashMap<FeatureId, Arc<Style>>,
}

impl VectorResource {
    pub(crate) fn new(symbology: Arc<VectorSymbology>) -> Self {
        Self {
            features: FeatureCollection::new(),
            style_cache: StyleCache::new(symbology),
            overrides: HashMap::new(),
        }
    }

    pub fn features(&self) -> &FeatureCollection {
        &self.features
    }

    pub(crate) fn replace_symbology(&mut self, symbology: Arc<VectorSymbology>) {
        self.style_cache = StyleCache::new(symbology);
        self.overrides.clear();
    }

    pub(crate) fn replace_features(&mut self, features: FeatureCollection) {
        self.features = features;
        self.overrides.clear();
    }
}

/// Parameters of a tiled raster service. A new `source_generation` means
/// the tile source was replaced rather than updated in place.
#[derive(Debug, Clone, PartialEq)]
pub struct TileServiceBinding {
    pub projection: String,
    pub time: Option<TimeInterval>,
    pub opacity: f64,
    pub symbology: Arc<RasterSymbology>,
    pub source_generation: u64,
}

impl TileServiceBinding {
    pub(crate) fn new(symbology: Arc<RasterSymbology>, projection: &str) -> Self {
        Self {
            projection: projection.to_owned(),
            time: None,
            opacity: symbology.opacity(),
            symbology,
            source_generation: 0,
        }
    }

    pub(crate) fn set_projection(&mut self, projection: &str) {
        if self.projection != projection {
            self.projection = projection.to_owned();
            self.source_generation += 1;
        }
    }

    pub(crate) fn replace_symbology(&mut self, symbology: Arc<RasterSymbology>) {
        self.opacity = symbology.opacity();
        self.symbology = symbology;
    }
}

#[derive(Debug)]
pub enum RenderResource {
    Vector(VectorResource),
    Raster(TileServiceBinding),
}

impl RenderResource {
    pub(crate) fn for_symbology(symbology: &Symbology, projection: &str) -> Self {
        match symbology {
            Symbology::Vector(vector) => Self::Vector(VectorResource::new(Arc::clone(vector))),
            Symbology::Raster(raster) => {
                Self::Raster(TileServiceBinding::new(Arc::clone(raster), projection))
            }
        }
    }

    /// Applies a symbology of the same kind in place. Returns `false` when the
    /// kind differs and the resource has to be rebuilt.
    pub(crate) fn apply_symbology(&mut self, symbology: &Symbology) -> bool {
        match (self, symbology) {
            (Self::Vector(resource), Symbology::Vector(vector)) => {
                resource.replace_symbology(Arc::clone(vector));
                true
            }
            (Self::Raster(binding), Symbology::Raster(raster)) => {
                binding.replace_symbology(Arc::clone(raster));
                true
            }
            _ => false,
        }
    }

    pub fn as_vector(&self) -> Option<&VectorResource> {
        match self {
            Self::Vector(resource) => Some(resource),
            Self::Raster(_) => None,
        }
    }

    pub fn as_raster(&self) -> Option<&TileServiceBinding> {
        match self {
            Self::Raster(binding) => Some(binding),
            Self::Vector(_) => None,
        }
    }
}
