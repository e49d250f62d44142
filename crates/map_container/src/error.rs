use interaction::DrawError;
use renderer::RenderError;
use spatial::SpatialError;
use view::ViewportError;

use crate::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Draw(#[from] DrawError),
    #[error(transparent)]
    Viewport(#[from] ViewportError),
    #[error(transparent)]
    Spatial(#[from] SpatialError),
}
