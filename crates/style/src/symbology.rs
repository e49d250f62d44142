use std::sync::Arc;

use model::Feature;
use render_protocol::Rgba;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::{
    Colorizer, DEFAULT_FILL, DEFAULT_POINT_RADIUS, DEFAULT_STROKE, HIGHLIGHT_FILL,
    HIGHLIGHT_STROKE, StyleError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymbologyKind {
    Point,
    Line,
    Polygon,
}

/// Color that is either fixed or derived from a feature attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorParam {
    pub default: Rgba,
    #[serde(default)]
    pub attribute: Option<String>,
    #[serde(default)]
    pub colorizer: Option<Colorizer>,
}

impl ColorParam {
    pub fn fixed(default: Rgba) -> Self {
        Self {
            default,
            attribute: None,
            colorizer: None,
        }
    }

    pub fn derived(default: Rgba, attribute: impl Into<String>, colorizer: Colorizer) -> Self {
        Self {
            default,
            attribute: Some(attribute.into()),
            colorizer: Some(colorizer),
        }
    }

    pub(crate) fn resolve(&self, feature: &Feature) -> Rgba {
        let Some(colorizer) = &self.colorizer else {
            return self.default;
        };
        self.attribute
            .as_deref()
            .and_then(|attribute| feature.attribute(attribute))
            .and_then(|value| colorizer.lookup(value))
            .unwrap_or(self.default)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadiusParam {
    pub default: f64,
    #[serde(default)]
    pub attribute: Option<String>,
    #[serde(default = "default_radius_factor")]
    pub factor: f64,
}

fn default_radius_factor() -> f64 {
    1.0
}

impl Default for RadiusParam {
    fn default() -> Self {
        Self {
            default: DEFAULT_POINT_RADIUS,
            attribute: None,
            factor: default_radius_factor(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSymbology {
    pub attribute: String,
    pub fill: Rgba,
    pub stroke_width: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorSymbology {
    pub kind: SymbologyKind,
    pub fill: ColorParam,
    pub stroke: ColorParam,
    pub stroke_width: f64,
    #[serde(default)]
    pub stroke_dash: SmallVec<[f64; 4]>,
    #[serde(default)]
    pub text: Option<TextSymbology>,
    #[serde(default)]
    pub radius: RadiusParam,
}

impl VectorSymbology {
    pub fn new(kind: SymbologyKind) -> Self {
        Self {
            kind,
            fill: ColorParam::fixed(DEFAULT_FILL),
            stroke: ColorParam::fixed(DEFAULT_STROKE),
            stroke_width: 1.0,
            stroke_dash: SmallVec::new(),
            text: None,
            radius: RadiusParam::default(),
        }
    }

    pub fn point() -> Self {
        Self::new(SymbologyKind::Point)
    }

    pub fn line() -> Self {
        Self::new(SymbologyKind::Line)
    }

    pub fn polygon() -> Self {
        Self::new(SymbologyKind::Polygon)
    }

    /// Lines have no interior to fill.
    pub fn describes_element_fill(&self) -> bool {
        self.kind != SymbologyKind::Line
    }

    pub fn describes_radius(&self) -> bool {
        self.kind == SymbologyKind::Point
    }

    /// Same symbology with the fixed selection colors.
    pub fn highlight(&self) -> Self {
        Self {
            fill: ColorParam::fixed(HIGHLIGHT_FILL),
            stroke: ColorParam::fixed(HIGHLIGHT_STROKE),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterSymbology {
    opacity: f64,
    colorizer: Colorizer,
}

impl RasterSymbology {
    pub fn new(opacity: f64, colorizer: Colorizer) -> Result<Self, StyleError> {
        if !(0.0..=1.0).contains(&opacity) {
            return Err(StyleError::InvalidOpacity(opacity));
        }
        Ok(Self { opacity, colorizer })
    }

    pub fn opacity(&self) -> f64 {
        self.opacity
    }

    pub fn colorizer(&self) -> &Colorizer {
        &self.colorizer
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Symbology {
    Vector(Arc<VectorSymbology>),
    Raster(Arc<RasterSymbology>),
}

impl Symbology {
    pub fn as_vector(&self) -> Option<&Arc<VectorSymbology>> {
        match self {
            Self::Vector(symbology) => Some(symbology),
            Self::Raster(_) => None,
        }
    }
}
