use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Optional `facet.toml` in the working directory. Missing or malformed
/// config degrades to the defaults, the same rule the repository applies to
/// its data file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Path of the JSON task file. The `--file` flag overrides this.
    pub file: Option<PathBuf>,
}

impl Config {
    pub fn load(dir: &Path) -> Config {
        let path = dir.join("facet.toml");
        match fs::read_to_string(&path) {
            Ok(text) => toml::from_str(&text).unwrap_or_default(),
            Err(_) => Config::default(),
        }
    }
}
