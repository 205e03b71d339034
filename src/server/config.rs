use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Optional settings file, read once at startup. Values set here are
/// overridden by explicit command-line flags.
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    pub listen: Option<String>,
    pub solr_url: Option<String>,
    pub core: Option<String>,
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }
}
