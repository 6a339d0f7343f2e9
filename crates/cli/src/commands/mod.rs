pub mod chat;
pub mod serve;
pub mod tools;

use std::path::Path;

use toolloop_config::AppConfig;

/// Load the config file (explicit path or the default one) plus env overrides.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(path) => {
            let mut config = AppConfig::load_from(path)?;
            config.apply_env(|key| std::env::var(key).ok());
            config
        }
        None => AppConfig::load()?,
    };
    config.validate()?;
    Ok(config)
}
