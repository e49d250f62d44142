//! Spatial reference systems, extents and coordinate transforms.
//!
//! Every other crate in the workspace depends on this one. The registry is
//! built once per process and is immutable afterwards.

mod extent;
mod reference;
mod transform;

pub use extent::{Coordinate, Extent};
pub use reference::{
    SpatialReference, SpatialReferenceRegistry, EPSG_3035, EPSG_3857, EPSG_4326, EPSG_25832,
    EPSG_32632, LEGACY_GEOS_CODE, SR_ORG_81,
};
pub use transform::{transform_coordinate, transform_coordinates};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SpatialError {
    #[error("unknown projection `{code}`")]
    UnknownProjection { code: String },
    #[error("spatial reference `{code}` registered twice")]
    DuplicateCode { code: String },
    #[error("extent must have exactly four finite, axis-ordered values, got {values:?}")]
    InvalidExtent { values: Vec<f64> },
    #[error("no coordinate transform from `{from}` to `{to}`")]
    UnsupportedTransform { from: String, to: String },
    #[error("transform from `{from}` to `{to}` failed: {reason}")]
    Projection {
        from: String,
        to: String,
        reason: String,
    },
    #[error("coordinate ({x}, {y}) is not representable in `{code}`")]
    NonFiniteCoordinate { x: f64, y: f64, code: String },
}
