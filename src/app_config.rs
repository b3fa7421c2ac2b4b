use serde::Deserialize;
use config::{Config, ConfigError, Environment, File};
use std::convert::TryFrom;

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct AppConfig {
    pub storage_file: String,
    pub prompt: String,
}

impl AppConfig {
    pub fn new() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            // Start off with default values
            .set_default("storage_file", "file.json")?
            .set_default("prompt", "(hbnb) ")?
            // Optional hbnb.toml / hbnb.json / ... next to the binary's working dir
            .add_source(File::with_name("hbnb").required(false))
            // HBNB_STORAGE_FILE, HBNB_PROMPT
            .add_source(Environment::with_prefix("HBNB"))
            .build()?;

        Self::try_from(settings)
    }

    pub fn with_storage_file(mut self, storage_file: Option<String>) -> Self {
        if let Some(storage_file) = storage_file {
            self.storage_file = storage_file;
        }
        self
    }
}

impl TryFrom<Config> for AppConfig {
    type Error = ConfigError;

    fn try_from(config: Config) -> Result<Self, Self::Error> {
        Ok(Self {
            storage_file: config.get_string("storage_file")?,
            prompt: config.get_string("prompt")?,
        })
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage_file: "file.json".to_string(),
            prompt: "(hbnb) ".to_string(),
        }
    }
}
