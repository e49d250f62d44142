//! Host-facing map facade.
//!
//! [`MapContainer`] owns the renderer and the interaction controllers and
//! forwards host events to them in a fixed order. Configuration is read
//! from TOML through [`MapConfig`]; [`logging::init_logging`] installs the
//! tracing subscriber.

mod config;
mod container;
mod error;
pub mod logging;

pub use config::{ConfigError, MapConfig};
pub use container::{DRAW_ID_PROPERTY, DrawCompletion, MapContainer};
pub use error::MapError;
