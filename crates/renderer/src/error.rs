use render_protocol::{FrameValidationError, LayerId};
use spatial::SpatialError;
use view::{CameraError, ViewportError};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RenderError {
    #[error("unknown background layer strategy `{name}`")]
    UnknownBackgroundStrategy { name: String },
    #[error("background strategy `{kind}` needs `{field}` to be configured")]
    IncompleteBackgroundConfig { kind: &'static str, field: &'static str },
    #[error("layer {0} is not bound")]
    UnknownLayer(LayerId),
    #[error("layer {0} appears more than once")]
    DuplicateLayer(LayerId),
    #[error("layer {0} does not carry vector features")]
    NotVectorLayer(LayerId),
    #[error("frame layout invalid at view instance {}: {:?}", .0.instance_index, .0.reason)]
    InvalidFrame(FrameValidationError),
    #[error(transparent)]
    Spatial(#[from] SpatialError),
    #[error(transparent)]
    Camera(#[from] CameraError),
    #[error(transparent)]
    Viewport(#[from] ViewportError),
}
