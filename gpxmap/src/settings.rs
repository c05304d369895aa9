use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use gpxmap_core::MapOptions;

const CONFIG_PREFIX: &str = "GPXMAP";
const CONFIG_FILE_PATH: &str = "./defaults.toml";
const CONFIG_FILE_ENV_PATH_KEY: &str = "GPXMAP_CONFIG_FILE";

const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_MAX_UPLOAD_SIZE: usize = 1 << 20;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    /// Largest accepted request body, bytes
    pub max_upload_size: usize,
    /// Served under `/static` when set
    pub static_dir: Option<String>,
    #[serde(default)]
    pub map: MapOptions,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("host", DEFAULT_HOST)?
            .set_default("port", DEFAULT_PORT as i64)?
            .set_default("max_upload_size", DEFAULT_MAX_UPLOAD_SIZE as i64)?
            .add_source(File::with_name(CONFIG_FILE_PATH).required(false));

        if let Ok(config_path) = std::env::var(CONFIG_FILE_ENV_PATH_KEY) {
            tracing::info!("Try read config from: {}", config_path);
            builder = builder.add_source(File::with_name(&config_path));
        };

        builder
            .add_source(Environment::with_prefix(CONFIG_PREFIX).separator("__"))
            .build()?
            .try_deserialize()
    }
}
