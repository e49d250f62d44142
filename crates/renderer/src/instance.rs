use render_protocol::{ContainerTarget, InteractionSlot, LayerSlot, ViewFrame};
use smallvec::SmallVec;
use view::CameraRef;

/// One map view. All instances read the same camera.
#[derive(Debug, Clone)]
pub struct ViewInstance {
    index: usize,
    camera: CameraRef,
    pub(crate) target: Option<ContainerTarget>,
    pub(crate) layers: SmallVec<[LayerSlot; 4]>,
    pub(crate) interactions: SmallVec<[InteractionSlot; 2]>,
}

impl ViewInstance {
    pub(crate) fn new(index: usize, camera: CameraRef) -> Self {
        Self {
            index,
            camera,
            target: None,
            layers: SmallVec::new(),
            interactions: SmallVec::new(),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_primary(&self) -> bool {
        self.index == 0
    }

    pub fn camera(&self) -> &CameraRef {
        &self.camera
    }

    pub fn target(&self) -> Option<ContainerTarget> {
        self.target
    }

    pub fn layers(&self) -> &[LayerSlot] {
        &self.layers
    }

    pub fn interactions(&self) -> &[InteractionSlot] {
        &self.interactions
    }

    pub(crate) fn to_frame(&self) -> ViewFrame {
        ViewFrame {
            instance_index: self.index,
            layers: self.layers.clone(),
            interactions: self.interactions.clone(),
            target: self.target,
        }
    }
}
