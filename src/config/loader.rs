use crate::config::schema::{ToolConfig, ValidationError};
use log::{debug, info};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config file looked up at the root when no explicit path is given.
pub const DEFAULT_CONFIG_FILE: &str = "hdf_scaffold.toml";

/// Which lookup step produced the active tool config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOrigin {
    /// Passed with `--config`
    Explicit(PathBuf),
    /// `<root>/hdf_scaffold.toml`
    RootDefault(PathBuf),
    /// No file; stock HDF layout
    BuiltIn,
    /// Parsed from a string, not a file
    Inline,
}

impl ConfigOrigin {
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigOrigin::Explicit(path) | ConfigOrigin::RootDefault(path) => Some(path),
            ConfigOrigin::BuiltIn | ConfigOrigin::Inline => None,
        }
    }
}

impl fmt::Display for ConfigOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigOrigin::Explicit(path) => write!(f, "{} (--config)", path.display()),
            ConfigOrigin::RootDefault(path) => write!(f, "{} (root default)", path.display()),
            ConfigOrigin::BuiltIn => f.write_str("built-in defaults"),
            ConfigOrigin::Inline => f.write_str("inline text"),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read tool config {origin}: {source}")]
    Io {
        origin: ConfigOrigin,
        #[source]
        source: io::Error,
    },

    #[error("tool config {origin} is not valid: {}", .source.message())]
    Toml {
        origin: ConfigOrigin,
        #[source]
        source: toml::de::Error,
    },

    #[error("tool config {origin} has {} invalid key(s):\n{source}", .source.issues.len())]
    Validation {
        origin: ConfigOrigin,
        #[source]
        source: ValidationError,
    },
}

impl ConfigError {
    pub fn origin(&self) -> &ConfigOrigin {
        match self {
            ConfigError::Io { origin, .. }
            | ConfigError::Toml { origin, .. }
            | ConfigError::Validation { origin, .. } => origin,
        }
    }
}

fn parse(input: &str, origin: ConfigOrigin) -> Result<ToolConfig, ConfigError> {
    let config: ToolConfig = match toml::from_str(input) {
        Ok(config) => config,
        Err(source) => return Err(ConfigError::Toml { origin, source }),
    };
    if let Err(source) = config.validate() {
        return Err(ConfigError::Validation { origin, source });
    }
    Ok(config)
}

fn read(origin: ConfigOrigin) -> Result<ToolConfig, ConfigError> {
    let Some(path) = origin.path() else {
        return Ok(ToolConfig::default());
    };
    match fs::read_to_string(path) {
        Ok(contents) => parse(&contents, origin),
        Err(source) => Err(ConfigError::Io { origin, source }),
    }
}

pub fn load_from_str(input: &str) -> Result<ToolConfig, ConfigError> {
    parse(input, ConfigOrigin::Inline)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<ToolConfig, ConfigError> {
    read(ConfigOrigin::Explicit(path.as_ref().to_path_buf()))
}

/// `explicit` when given, else `<root>/hdf_scaffold.toml` if present, else
/// the built-in defaults. Returns the config with the step that produced it.
pub fn resolve(
    root: &Path,
    explicit: Option<&Path>,
) -> Result<(ToolConfig, ConfigOrigin), ConfigError> {
    let origin = match explicit {
        Some(path) => ConfigOrigin::Explicit(path.to_path_buf()),
        None => {
            let candidate = root.join(DEFAULT_CONFIG_FILE);
            if candidate.is_file() {
                ConfigOrigin::RootDefault(candidate)
            } else {
                debug!("no {} under {}", DEFAULT_CONFIG_FILE, root.display());
                ConfigOrigin::BuiltIn
            }
        }
    };
    let config = read(origin.clone())?;
    info!("tool config: {origin}");
    Ok((config, origin))
}
