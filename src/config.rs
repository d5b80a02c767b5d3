use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{LivroError, Result};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    pub sqlite_path: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    /// External identity that is force-promoted to admin on upsert.
    pub owner_open_id: Option<String>,
    pub openai: Option<OpenAiConfig>,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| LivroError::Config(e.to_string()))?;
        let config: Config =
            serde_json::from_str(&content).map_err(|e| LivroError::Config(e.to_string()))?;
        Ok(config)
    }
}
