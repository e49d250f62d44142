//! Feature styling: symbology descriptors, colorizers and the per-symbology
//! style cache.
//!
//! A [`StyleCache`] is bound to one symbology version for its whole life.
//! When the symbology of a layer changes the owner drops the cache and builds
//! a new one; entries are never invalidated in place.

mod cache;
mod colorizer;
mod symbology;

pub use cache::{STYLE_KEY_SEPARATOR, StyleCache, UNDEFINED_KEY_FRAGMENT};
pub use colorizer::{BreakpointValue, ColorBreakpoint, Colorizer, ColorizerKind};
pub use symbology::{
    ColorParam, RadiusParam, RasterSymbology, Symbology, SymbologyKind, TextSymbology,
    VectorSymbology,
};

use render_protocol::Rgba;
use smallvec::SmallVec;

pub const DEFAULT_STROKE: Rgba = Rgba::BLACK;
pub const DEFAULT_FILL: Rgba = Rgba::RED;
pub const DEFAULT_POINT_RADIUS: f64 = 5.0;
pub const MIN_POINT_RADIUS: f64 = 1.0;
pub const MAX_POINT_RADIUS: f64 = 100.0;
/// Labels longer than this are cut.
pub const MAX_LABEL_LENGTH: usize = 25;
pub const HIGHLIGHT_FILL: Rgba = Rgba::new(0.0, 153.0, 255.0, 1.0);
pub const HIGHLIGHT_STROKE: Rgba = Rgba::WHITE;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StyleError {
    #[error("colorizer breakpoints mix numeric and textual values")]
    MixedBreakpoints,
    #[error("numeric breakpoint {index} is not finite or out of ascending order")]
    UnorderedBreakpoint { index: usize },
    #[error("opacity {0} is outside [0, 1]")]
    InvalidOpacity(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stroke {
    pub color: Rgba,
    pub width: f64,
    pub dash: Option<SmallVec<[f64; 4]>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub label: String,
    pub fill: Rgba,
    pub stroke: Rgba,
    pub stroke_width: f64,
}

/// Resolved drawing style of one feature.
#[derive(Debug, Clone, PartialEq)]
pub struct Style {
    pub fill: Option<Rgba>,
    pub stroke: Stroke,
    /// Circle radius, only for point symbologies.
    pub point_radius: Option<f64>,
    pub text: Option<TextStyle>,
}
