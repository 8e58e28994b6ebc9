use std::path::PathBuf;

use serde::Deserialize;

/// Application configuration: `config/default.toml` overlaid with
/// `DETRAF__`-prefixed environment variables (e.g. `DETRAF__DATABASE__URL`).
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    pub dir: PathBuf,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .set_default("database.url", "mysql://root@localhost/detraf")?
            .set_default("export.dir", "build")?
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::Environment::with_prefix("DETRAF").separator("__"))
            .build()?
            .try_deserialize()
    }
}
