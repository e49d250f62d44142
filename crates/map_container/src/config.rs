use std::path::Path;

use renderer::{BackgroundConfig, BackgroundStrategy, RenderError, RendererConfig};
use serde::{Deserialize, Serialize};
use spatial::{EPSG_3857, EPSG_4326, SpatialError, SpatialReferenceRegistry};
use view::CameraLimits;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read map config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse map config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid background: {0}")]
    Background(#[source] RenderError),
    #[error("invalid projection: {0}")]
    Projection(#[from] SpatialError),
    #[error("zoom range {min_zoom}..={max_zoom} does not contain default zoom {default_zoom}")]
    ZoomRange {
        min_zoom: f64,
        max_zoom: f64,
        default_zoom: f64,
    },
    #[error("tile size must be positive")]
    TileSize,
}

/// Map settings as read from a TOML file. Missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub grid: bool,
    pub default_zoom: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub tile_size: u32,
    /// CRS of completed drawings.
    pub output_crs: String,
    pub initial_projection: String,
    pub background: BackgroundConfig,
}

impl Default for MapConfig {
    fn default() -> Self {
        let limits = CameraLimits::default();
        Self {
            grid: false,
            default_zoom: renderer::DEFAULT_ZOOM_LEVEL,
            min_zoom: limits.min_zoom,
            max_zoom: limits.max_zoom,
            tile_size: limits.tile_size,
            output_crs: EPSG_4326.to_owned(),
            initial_projection: EPSG_3857.to_owned(),
            background: BackgroundConfig::default(),
        }
    }
}

impl MapConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Resolves the background strategy and both projection codes.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let zoom_range = self.min_zoom..=self.max_zoom;
        if !zoom_range.contains(&self.default_zoom) {
            return Err(ConfigError::ZoomRange {
                min_zoom: self.min_zoom,
                max_zoom: self.max_zoom,
                default_zoom: self.default_zoom,
            });
        }
        if self.tile_size == 0 {
            return Err(ConfigError::TileSize);
        }
        BackgroundStrategy::resolve(&self.background).map_err(ConfigError::Background)?;
        let registry = SpatialReferenceRegistry::global();
        registry.from_code(&self.output_crs)?;
        registry.from_code(&self.initial_projection)?;
        Ok(())
    }

    pub fn renderer_config(&self) -> RendererConfig {
        RendererConfig {
            grid: self.grid,
            background: self.background.clone(),
            limits: CameraLimits {
                min_zoom: self.min_zoom,
                max_zoom: self.max_zoom,
                tile_size: self.tile_size,
            },
            default_zoom: self.default_zoom,
        }
    }
}
