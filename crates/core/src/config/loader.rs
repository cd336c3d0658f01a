//! Configuration file loading

use super::schema::ConfigSchema;
use crate::error::{Error, Result, ResultExt};
use std::path::{Path, PathBuf};

/// File names probed in the working directory, in order
const CANDIDATES: [&str; 3] = ["careline.toml", ".careline.toml", ".config/careline.toml"];

/// Configuration wrapper
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Parsed settings
    pub schema: ConfigSchema,
    /// File the settings came from, if any
    pub path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from an explicit path, a discovered file, or defaults.
    ///
    /// An explicit path that does not exist is an error; a missing
    /// discovered file simply yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) if !p.exists() => return Err(Error::config_not_found(p)),
            Some(p) => Some(p.to_path_buf()),
            None => find_config_file(),
        };

        let schema = match config_path {
            Some(ref p) => load_config_file(p)?,
            None => ConfigSchema::default(),
        };
        schema.validate()?;

        Ok(Self {
            schema,
            path: config_path,
        })
    }
}

/// Find configuration file in standard locations
fn find_config_file() -> Option<PathBuf> {
    let local = CANDIDATES
        .iter()
        .map(PathBuf::from)
        .find(|candidate| candidate.exists());

    local.or_else(|| {
        dirs::config_dir()
            .map(|dir| dir.join("careline").join("careline.toml"))
            .filter(|p| p.exists())
    })
}

/// Load and parse a TOML configuration file
fn load_config_file(path: &Path) -> Result<ConfigSchema> {
    let content = std::fs::read_to_string(path)
        .map_err(Error::from)
        .context(format!("Failed to read config file {}", path.display()))?;

    let schema: ConfigSchema = toml::from_str(&content)
        .map_err(Error::from)
        .context(format!("Failed to parse config file {}", path.display()))?;
    Ok(schema)
}
