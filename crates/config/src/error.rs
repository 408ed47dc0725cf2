use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The config file exists but could not be read.
    Io { path: PathBuf, message: String },
    /// Invalid TOML or an invalid environment override.
    Parse(String),
    /// A required setting is empty. Carries the setting's dotted name.
    Missing(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, message } => {
                write!(f, "cannot read {}: {}", path.display(), message)
            }
            ConfigError::Parse(msg) => write!(f, "invalid configuration: {}", msg),
            ConfigError::Missing(field) => write!(f, "missing setting: {}", field),
        }
    }
}

impl std::error::Error for ConfigError {}
