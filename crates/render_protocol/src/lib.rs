use std::fmt;
use std::sync::Arc;

use model::{FeatureId, GeometryType};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

slotmap::new_key_type! {
    /// Render-side resource owned by exactly one layer binding.
    pub struct RenderHandle;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LayerId(pub u64);

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "layer#{}", self.0)
    }
}

/// Identity of the data behind a layer. A new handle means new data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataSourceHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct Rgba {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Rgba {
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Self = Self::new(255.0, 255.0, 255.0, 1.0);
    pub const RED: Self = Self::new(255.0, 0.0, 0.0, 1.0);
    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    pub const fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    /// Linear blend, `fraction` clamped to `[0, 1]`.
    pub fn interpolate(self, other: Self, fraction: f64) -> Self {
        let t = fraction.clamp(0.0, 1.0);
        let mix = |from: f64, to: f64| from + (to - from) * t;
        Self::new(
            mix(self.r, other.r),
            mix(self.g, other.g),
            mix(self.b, other.b),
            mix(self.a, other.a),
        )
    }

    pub fn with_alpha(self, a: f64) -> Self {
        Self { a, ..self }
    }
}

impl From<[f64; 4]> for Rgba {
    fn from(value: [f64; 4]) -> Self {
        Self::new(value[0], value[1], value[2], value[3])
    }
}

impl From<Rgba> for [f64; 4] {
    fn from(value: Rgba) -> Self {
        [value.r, value.g, value.b, value.a]
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgba({},{},{},{})", self.r, self.g, self.b, self.a)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoadingState {
    #[default]
    Ok,
    Loading,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadingStateChange {
    pub layer: LayerId,
    pub state: LoadingState,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionChange {
    pub added: Vec<FeatureId>,
    pub removed: Vec<FeatureId>,
}

impl SelectionChange {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Host-side render container a view instance is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerTarget {
    pub width: u32,
    pub height: u32,
}

impl ContainerTarget {
    pub fn aspect_ratio(&self) -> f64 {
        if self.height == 0 {
            1.0
        } else {
            f64::from(self.width) / f64::from(self.height)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutMode {
    Grid,
    Overlay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerSlot {
    Background { generation: u64 },
    Data { layer: LayerId, handle: RenderHandle },
    DrawScratch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionSlot {
    Draw(GeometryType),
    Select { layer: LayerId },
}

/// Bottom-to-top layer stack of one view instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewFrame {
    pub instance_index: usize,
    pub layers: SmallVec<[LayerSlot; 4]>,
    pub interactions: SmallVec<[InteractionSlot; 2]>,
    pub target: Option<ContainerTarget>,
}

impl ViewFrame {
    pub fn data_layers(&self) -> impl Iterator<Item = LayerId> + '_ {
        self.layers.iter().filter_map(|slot| match slot {
            LayerSlot::Data { layer, .. } => Some(*layer),
            _ => None,
        })
    }

    pub fn has_draw_scratch(&self) -> bool {
        self.layers.contains(&LayerSlot::DrawScratch)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSnapshot {
    pub revision: u64,
    pub frames: Arc<[ViewFrame]>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameInvalidReason {
    InstanceIndexMismatch { found: usize },
    MissingBackground,
    TooManyDataLayers { count: usize },
    DrawInteractionWithoutScratch,
    MultipleSelectInteractions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameValidationError {
    pub instance_index: usize,
    pub reason: FrameInvalidReason,
}

impl FrameSnapshot {
    pub fn validate_layout(&self, mode: LayoutMode) -> Result<(), FrameValidationError> {
        let mut select_seen = false;
        for (instance_index, frame) in self.frames.iter().enumerate() {
            let fail = |reason| FrameValidationError {
                instance_index,
                reason,
            };
            if frame.instance_index != instance_index {
                return Err(fail(FrameInvalidReason::InstanceIndexMismatch {
                    found: frame.instance_index,
                }));
            }
            if !matches!(frame.layers.first(), Some(LayerSlot::Background { .. })) {
                return Err(fail(FrameInvalidReason::MissingBackground));
            }
            let data_count = frame.data_layers().count();
            if mode == LayoutMode::Grid && data_count > 1 {
                return Err(fail(FrameInvalidReason::TooManyDataLayers { count: data_count }));
            }
            for interaction in &frame.interactions {
                match interaction {
                    InteractionSlot::Draw(_) => {
                        if !frame.has_draw_scratch() {
                            return Err(fail(FrameInvalidReason::DrawInteractionWithoutScratch));
                        }
                    }
                    InteractionSlot::Select { .. } => {
                        if select_seen {
                            return Err(fail(FrameInvalidReason::MultipleSelectInteractions));
                        }
                        select_seen = true;
                    }
                }
            }
        }

        Ok(())
    }
}
