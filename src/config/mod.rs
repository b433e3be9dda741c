// Configuration module
// Public interface for configuration loading

mod loader;
mod settings;

pub use loader::{config_path, load_config, load_config_from};
pub use settings::{Config, DetectionConfig, ResourcesConfig, ServerConfig, StorageConfig};
