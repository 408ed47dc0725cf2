// Application settings
// Loaded from ~/.config/crmsync/config.toml, then overridden by environment

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

pub const ENV_CONFIG: &str = "CRMSYNC_CONFIG";
pub const ENV_OPLOG: &str = "CRMSYNC_OPLOG";
pub const ENV_FETCH_LIMIT: &str = "CRMSYNC_FETCH_LIMIT";
pub const ENV_SUPABASE_URL: &str = "SUPABASE_URL";
pub const ENV_SUPABASE_SERVICE_KEY: &str = "SUPABASE_SERVICE_KEY";
pub const ENV_SUPABASE_TABLE: &str = "SUPABASE_TABLE";
pub const ENV_HUBSPOT_API_BASE: &str = "HUBSPOT_API_BASE";
pub const ENV_HUBSPOT_ACCESS_TOKEN: &str = "HUBSPOT_ACCESS_TOKEN";

/// Source store (Supabase PostgREST) connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupabaseSettings {
    /// Project URL, e.g. https://xyz.supabase.co
    pub url: String,
    pub service_key: String,
    pub table: String,
}

impl Default for SupabaseSettings {
    fn default() -> Self {
        Self {
            url: String::new(),
            service_key: String::new(),
            table: "contacts".to_string(),
        }
    }
}

/// CRM (HubSpot) connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubSpotSettings {
    pub api_base: String,
    /// Private app access token
    pub access_token: String,
}

impl Default for HubSpotSettings {
    fn default() -> Self {
        Self {
            api_base: "https://api.hubapi.com".to_string(),
            access_token: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconSettings {
    /// Rows requested from each side per run
    pub fetch_limit: usize,
    pub default_page_size: usize,
    pub max_retries: u32,
    pub timeout_secs: u64,
}

impl Default for ReconSettings {
    fn default() -> Self {
        Self {
            fetch_limit: 1000,
            default_page_size: 25,
            max_retries: 3,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Operation log database; defaults to the platform data directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub supabase: SupabaseSettings,
    pub hubspot: HubSpotSettings,
    pub recon: ReconSettings,
    pub store: StoreSettings,
}

impl Settings {
    /// Get the config file path (`CRMSYNC_CONFIG` wins)
    pub fn config_path() -> PathBuf {
        if let Some(path) = non_empty_env(ENV_CONFIG) {
            return PathBuf::from(path);
        }
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("crmsync")
            .join("config.toml")
    }

    pub fn default_oplog_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("crmsync")
            .join("oplog.db")
    }

    /// Load the config file (if present) and apply environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        let mut settings = Self::load_from(&Self::config_path())?;
        settings.apply_env()?;
        Ok(settings)
    }

    /// Load a config file; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::debug!("no config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_toml(&contents)
            .map_err(|e| ConfigError::Parse(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_from(|key| non_empty_env(key))
    }

    /// Apply overrides from any lookup; empty values are ignored
    pub fn apply_env_from(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = get(ENV_SUPABASE_URL) {
            self.supabase.url = v;
        }
        if let Some(v) = get(ENV_SUPABASE_SERVICE_KEY) {
            self.supabase.service_key = v;
        }
        if let Some(v) = get(ENV_SUPABASE_TABLE) {
            self.supabase.table = v;
        }
        if let Some(v) = get(ENV_HUBSPOT_API_BASE) {
            self.hubspot.api_base = v;
        }
        if let Some(v) = get(ENV_HUBSPOT_ACCESS_TOKEN) {
            self.hubspot.access_token = v;
        }
        if let Some(v) = get(ENV_FETCH_LIMIT) {
            self.recon.fetch_limit = v.parse().map_err(|_| {
                ConfigError::Parse(format!("{} must be a positive integer, got '{}'", ENV_FETCH_LIMIT, v))
            })?;
        }
        if let Some(v) = get(ENV_OPLOG) {
            self.store.path = Some(PathBuf::from(v));
        }
        Ok(())
    }

    /// URL and service key, or which one is missing
    pub fn supabase_credentials(&self) -> Result<(&str, &str), ConfigError> {
        if self.supabase.url.trim().is_empty() {
            return Err(ConfigError::Missing("supabase.url"));
        }
        if self.supabase.service_key.trim().is_empty() {
            return Err(ConfigError::Missing("supabase.service_key"));
        }
        Ok((&self.supabase.url, &self.supabase.service_key))
    }

    pub fn hubspot_token(&self) -> Result<&str, ConfigError> {
        if self.hubspot.access_token.trim().is_empty() {
            return Err(ConfigError::Missing("hubspot.access_token"));
        }
        Ok(&self.hubspot.access_token)
    }

    pub fn oplog_path(&self) -> PathBuf {
        self.store
            .path
            .clone()
            .unwrap_or_else(Self::default_oplog_path)
    }

    /// Copy with secrets masked, for display
    pub fn redacted(&self) -> Self {
        let mut out = self.clone();
        out.supabase.service_key = redact(&self.supabase.service_key);
        out.hubspot.access_token = redact(&self.hubspot.access_token);
        out
    }
}

/// `""` stays empty; short secrets are fully masked; longer ones keep the
/// last four characters.
pub fn redact(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    match chars.len() {
        0 => String::new(),
        n if n <= 8 => "****".to_string(),
        n => {
            let tail: String = chars[n - 4..].iter().collect();
            format!("****{}", tail)
        }
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
