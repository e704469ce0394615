pub mod config;
pub mod error;
pub mod text;
pub mod types;

pub use config::{AppConfig, FileConfig, GridConfig, OpticsConfig, TimingConfig};
pub use error::{HotspotError, Result};
pub use types::*;
