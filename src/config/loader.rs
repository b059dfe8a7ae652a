use std::path::Path;

use super::{ConfigError, PrismConfig};

/// Load configuration from a YAML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<PrismConfig, ConfigError> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(ConfigError::NotFound(path.display().to_string()));
    }

    let content = std::fs::read_to_string(path)?;
    let config: PrismConfig = serde_yaml::from_str(&content)?;

    tracing::info!(path = %path.display(), "Loaded configuration");

    Ok(config)
}
