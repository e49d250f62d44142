//! Renderer crate root.
//!
//! `GridViewRenderer` maps the visible data layers onto a grid of linked view
//! instances. Its state is split into compartments that the internal modules
//! mutate:
//! - `renderer_redraw`: instance lifecycle, background rebuild, layer assignment.
//! - `renderer_layers`: layer bindings, feature delivery, loading state, styling.
//! - `renderer_view_ops`: camera operations and viewport derivation.
//! - `renderer_interactions`: draw and select attachment.
//! - `grid`/`background`/`binding`/`loading`/`instance`: domain logic shared by them.

use std::collections::HashMap;
use std::sync::Arc;

use model::GeometryType;
use render_protocol::{FrameSnapshot, LayerId, RenderHandle};
use slotmap::SlotMap;
use spatial::{Coordinate, SpatialReference};
use view::{Camera, CameraCell, CameraLimits};

mod background;
mod binding;
mod error;
mod grid;
mod instance;
mod loading;
mod renderer_interactions;
mod renderer_layers;
mod renderer_redraw;
mod renderer_view_ops;

pub use background::{
    BackgroundConfig, BackgroundKind, BackgroundLayer, BackgroundLayerKind, BackgroundSource,
    BackgroundStrategy, COUNTRIES_BACKGROUND_ID, COUNTRIES_GEOJSON_PATH, OSM_TILE_URL,
    country_style,
};
pub use binding::{LayerBinding, LayerDescriptor, RenderResource, TileServiceBinding, VectorResource};
pub use error::RenderError;
pub use grid::{GridLayout, compute_grid, desired_count};
pub use instance::ViewInstance;
pub use loading::{FetchError, FetchRequest, LoadingTracker, TimeInterval};
pub use renderer_layers::StyledFeature;

pub const DEFAULT_ZOOM_LEVEL: f64 = 2.0;

#[derive(Debug, Clone, PartialEq)]
pub struct RendererConfig {
    pub grid: bool,
    pub background: BackgroundConfig,
    pub limits: CameraLimits,
    pub default_zoom: f64,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            grid: false,
            background: BackgroundConfig::default(),
            limits: CameraLimits::default(),
            default_zoom: DEFAULT_ZOOM_LEVEL,
        }
    }
}

struct LayoutState {
    grid_mode: bool,
    grid: GridLayout,
    /// Size of the element hosting the whole grid, used for its aspect ratio.
    container_size: Option<(u32, u32)>,
    instances: Vec<instance::ViewInstance>,
    revision: u64,
    snapshot: Option<FrameSnapshot>,
}

struct CameraState {
    cell: CameraCell,
}

struct BackgroundState {
    strategy: BackgroundStrategy,
    source: Option<BackgroundSource>,
    source_generation: u64,
    layers: Vec<BackgroundLayer>,
}

struct BindingState {
    layers: Vec<LayerDescriptor>,
    bindings: HashMap<LayerId, LayerBinding>,
    resources: SlotMap<RenderHandle, RenderResource>,
    time: Option<TimeInterval>,
}

struct InteractionState {
    draw: Option<GeometryType>,
    select: Option<LayerId>,
}

pub struct GridViewRenderer {
    layout_state: LayoutState,
    camera_state: CameraState,
    background_state: BackgroundState,
    binding_state: BindingState,
    interaction_state: InteractionState,
    loading: LoadingTracker,
}

impl GridViewRenderer {
    pub fn new(
        config: &RendererConfig,
        projection: Arc<SpatialReference>,
    ) -> Result<Self, RenderError> {
        let strategy = BackgroundStrategy::resolve(&config.background)?;
        let camera = Camera::new(
            projection,
            Coordinate::ORIGIN,
            config.default_zoom,
            config.limits,
        )?;
        let cell = CameraCell::new(camera);
        let primary = instance::ViewInstance::new(0, cell.reader());

        Ok(Self {
            layout_state: LayoutState {
                grid_mode: config.grid,
                grid: GridLayout::SINGLE,
                container_size: None,
                instances: vec![primary],
                revision: 0,
                snapshot: None,
            },
            camera_state: CameraState { cell },
            background_state: BackgroundState {
                strategy,
                source: None,
                source_generation: 0,
                layers: Vec::new(),
            },
            binding_state: BindingState {
                layers: Vec::new(),
                bindings: HashMap::new(),
                resources: SlotMap::with_key(),
                time: None,
            },
            interaction_state: InteractionState {
                draw: None,
                select: None,
            },
            loading: LoadingTracker::default(),
        })
    }

    pub fn grid_mode(&self) -> bool {
        self.layout_state.grid_mode
    }

    pub fn grid(&self) -> GridLayout {
        self.layout_state.grid
    }

    pub fn instances(&self) -> &[instance::ViewInstance] {
        &self.layout_state.instances
    }

    pub fn background_strategy(&self) -> &BackgroundStrategy {
        &self.background_state.strategy
    }

    pub fn background_source(&self) -> Option<&BackgroundSource> {
        self.background_state.source.as_ref()
    }

    pub fn background_layers(&self) -> &[BackgroundLayer] {
        &self.background_state.layers
    }
}

#[cfg(test)]
mod tests;
