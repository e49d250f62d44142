//! Background layer strategies.
//!
//! The strategy is chosen once from configuration. Each strategy pairs a
//! source constructor with a layer constructor; sources are rebuilt per
//! projection and layers per view instance.

use std::fmt;
use std::str::FromStr;

use model::{Feature, FeatureId};
use render_protocol::Rgba;
use serde::{Deserialize, Serialize};
use spatial::{EPSG_3857, Extent, SpatialReference};
use style::{Stroke, Style};

use crate::RenderError;

pub const OSM_TILE_URL: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";
pub const COUNTRIES_GEOJSON_PATH: &str = "assets/countries.geo.json";
/// Feature id of the ocean polygon in the countries data set.
pub const COUNTRIES_BACKGROUND_ID: &str = "BACKGROUND";

const OCEAN_FILL: Rgba = Rgba::new(173.0, 216.0, 230.0, 1.0);
const COUNTRY_FILL: Rgba = Rgba::new(210.0, 180.0, 140.0, 1.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackgroundKind {
    /// OpenStreetMap tiles.
    Tiled,
    /// Country polygons shipped as GeoJSON.
    Static,
    /// WMS service configured by the deployment.
    Hosted,
    /// Generic `{z}/{x}/{y}` tile template.
    Xyz,
}

impl BackgroundKind {
    pub fn config_name(self) -> &'static str {
        match self {
            Self::Tiled => "OSM",
            Self::Static => "countries",
            Self::Hosted => "hosted",
            Self::Xyz => "XYZ",
        }
    }
}

impl fmt::Display for BackgroundKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.config_name())
    }
}

impl FromStr for BackgroundKind {
    type Err = RenderError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        STRATEGIES
            .iter()
            .map(|strategy| strategy.kind)
            .find(|kind| kind.config_name() == name)
            .ok_or_else(|| RenderError::UnknownBackgroundStrategy {
                name: name.to_owned(),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundConfig {
    pub kind: String,
    pub url: Option<String>,
    pub layer_name: Option<String>,
    pub version: Option<String>,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            kind: BackgroundKind::Tiled.config_name().to_owned(),
            url: None,
            layer_name: None,
            version: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BackgroundSource {
    OsmTiles {
        url_template: String,
    },
    /// Empty image for projections without an OSM tile grid.
    PlaceholderImage {
        extent: Extent,
    },
    CountryPolygons {
        url: String,
    },
    HostedWms {
        url: String,
        layer_name: String,
        version: String,
        projection: String,
    },
    XyzTiles {
        url_template: String,
        projection: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackgroundLayerKind {
    Tile,
    Image,
    Vector,
}

/// Background layer of one view instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackgroundLayer {
    pub kind: BackgroundLayerKind,
    /// Generation of the source the layer renders.
    pub source_generation: u64,
}

type SourceConstructor = fn(&ResolvedBackground, &SpatialReference) -> BackgroundSource;
type LayerConstructor = fn(&BackgroundSource) -> BackgroundLayerKind;

struct StrategyEntry {
    kind: BackgroundKind,
    source: SourceConstructor,
    layer: LayerConstructor,
}

static STRATEGIES: [StrategyEntry; 4] = [
    StrategyEntry {
        kind: BackgroundKind::Tiled,
        source: osm_source,
        layer: osm_layer,
    },
    StrategyEntry {
        kind: BackgroundKind::Static,
        source: countries_source,
        layer: |_| BackgroundLayerKind::Vector,
    },
    StrategyEntry {
        kind: BackgroundKind::Hosted,
        source: hosted_source,
        layer: |_| BackgroundLayerKind::Tile,
    },
    StrategyEntry {
        kind: BackgroundKind::Xyz,
        source: xyz_source,
        layer: |_| BackgroundLayerKind::Tile,
    },
];

#[derive(Debug, Clone, PartialEq, Eq)]
struct ResolvedBackground {
    url: String,
    layer_name: String,
    version: String,
}

/// Background strategy resolved from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackgroundStrategy {
    kind: BackgroundKind,
    resolved: ResolvedBackground,
}

impl BackgroundStrategy {
    pub fn resolve(config: &BackgroundConfig) -> Result<Self, RenderError> {
        let kind: BackgroundKind = config.kind.parse()?;
        let require = |value: &Option<String>, field: &'static str| {
            value
                .clone()
                .ok_or(RenderError::IncompleteBackgroundConfig {
                    kind: kind.config_name(),
                    field,
                })
        };
        let resolved = match kind {
            BackgroundKind::Tiled => ResolvedBackground {
                url: config.url.clone().unwrap_or_else(|| OSM_TILE_URL.to_owned()),
                layer_name: String::new(),
                version: String::new(),
            },
            BackgroundKind::Static => ResolvedBackground {
                url: config
                    .url
                    .clone()
                    .unwrap_or_else(|| COUNTRIES_GEOJSON_PATH.to_owned()),
                layer_name: String::new(),
                version: String::new(),
            },
            BackgroundKind::Hosted => ResolvedBackground {
                url: require(&config.url, "url")?,
                layer_name: require(&config.layer_name, "layer_name")?,
                version: config.version.clone().unwrap_or_else(|| "1.3.0".to_owned()),
            },
            BackgroundKind::Xyz => ResolvedBackground {
                url: require(&config.url, "url")?,
                layer_name: String::new(),
                version: String::new(),
            },
        };
        Ok(Self { kind, resolved })
    }

    pub fn kind(&self) -> BackgroundKind {
        self.kind
    }

    fn entry(&self) -> &'static StrategyEntry {
        STRATEGIES
            .iter()
            .find(|entry| entry.kind == self.kind)
            .unwrap_or(&STRATEGIES[0])
    }

    pub fn create_source(&self, projection: &SpatialReference) -> BackgroundSource {
        (self.entry().source)(&self.resolved, projection)
    }

    pub fn create_layer(&self, source: &BackgroundSource, source_generation: u64) -> BackgroundLayer {
        BackgroundLayer {
            kind: (self.entry().layer)(source),
            source_generation,
        }
    }
}

fn osm_source(resolved: &ResolvedBackground, projection: &SpatialReference) -> BackgroundSource {
    if projection.code() == EPSG_3857 {
        BackgroundSource::OsmTiles {
            url_template: resolved.url.clone(),
        }
    } else {
        BackgroundSource::PlaceholderImage {
            extent: Extent::new(0.0, 0.0, 0.0, 0.0),
        }
    }
}

fn osm_layer(source: &BackgroundSource) -> BackgroundLayerKind {
    match source {
        BackgroundSource::OsmTiles { .. } => BackgroundLayerKind::Tile,
        _ => BackgroundLayerKind::Image,
    }
}

fn countries_source(resolved: &ResolvedBackground, _: &SpatialReference) -> BackgroundSource {
    BackgroundSource::CountryPolygons {
        url: resolved.url.clone(),
    }
}

fn hosted_source(resolved: &ResolvedBackground, projection: &SpatialReference) -> BackgroundSource {
    BackgroundSource::HostedWms {
        url: resolved.url.clone(),
        layer_name: resolved.layer_name.clone(),
        version: resolved.version.clone(),
        projection: projection.code().to_owned(),
    }
}

fn xyz_source(resolved: &ResolvedBackground, projection: &SpatialReference) -> BackgroundSource {
    BackgroundSource::XyzTiles {
        url_template: resolved.url.clone(),
        projection: projection.code().to_owned(),
    }
}

/// Style of a feature of the countries background.
pub fn country_style(feature: &Feature) -> Style {
    let background = FeatureId::from(COUNTRIES_BACKGROUND_ID);
    if feature.id.as_ref() == Some(&background) {
        Style {
            fill: Some(OCEAN_FILL),
            stroke: Stroke {
                color: Rgba::TRANSPARENT,
                width: 0.0,
                dash: None,
            },
            point_radius: None,
            text: None,
        }
    } else {
        Style {
            fill: Some(COUNTRY_FILL),
            stroke: Stroke {
                color: Rgba::BLACK,
                width: 1.0,
                dash: None,
            },
            point_radius: None,
            text: None,
        }
    }
}
