// Nimbus Drive Client Settings
// Persistent key/value storage (the client's local storage) plus the typed
// settings view: API base override, view mode, last folder path.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_API_BASE: &str = "https://api.nimbusdrive.app";

pub const KEY_USER: &str = "user";
pub const KEY_CUSTOM_DOMAIN: &str = "customDomain";
pub const KEY_CUSTOM_PORT: &str = "customPort";
pub const KEY_VIEW_MODE: &str = "viewMode";
pub const KEY_FOLDER_PATH: &str = "folderPath";
pub const KEY_PAYLOAD_SECRET: &str = "payloadSecret";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
    #[error("Unknown setting: {0}")]
    UnknownKey(String),
}

// ---------------------------------------------------------------------------
// LocalStore
// ---------------------------------------------------------------------------

/// JSON key/value file under the user config directory
#[derive(Debug, Clone)]
pub struct LocalStore {
    path: PathBuf,
    entries: BTreeMap<String, Value>,
}

impl LocalStore {
    /// `<config>/nimbus-drive/storage.json`
    pub fn default_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")));
        config_dir.join("nimbus-drive").join("storage.json")
    }

    /// Load the store; a missing or unreadable file yields an empty store
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut entries = BTreeMap::new();

        if path.exists() {
            match fs::read_to_string(&path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(map) => entries = map,
                    Err(e) => tracing::warn!("Failed to parse local store {:?}: {}", path, e),
                },
                Err(e) => tracing::warn!("Failed to read local store {:?}: {}", path, e),
            }
        }

        Self { path, entries }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.entries.get(key).and_then(Value::as_str)
    }

    pub fn set(&mut self, key: &str, value: Value) {
        self.entries.insert(key.to_string(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.remove(key)
    }

    pub fn save(&self) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.entries)?;
        fs::write(&self.path, content)?;
        tracing::debug!("Local store saved to {:?}", self.path);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ClientSettings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    List,
    Grid,
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewMode::List => write!(f, "list"),
            ViewMode::Grid => write!(f, "grid"),
        }
    }
}

impl FromStr for ViewMode {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "list" => Ok(ViewMode::List),
            "grid" => Ok(ViewMode::Grid),
            other => Err(SettingsError::InvalidValue {
                key: KEY_VIEW_MODE.to_string(),
                reason: format!("expected list or grid, got '{}'", other),
            }),
        }
    }
}

/// Typed view over the persisted client settings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientSettings {
    pub custom_domain: Option<String>,
    pub custom_port: Option<u16>,
    pub view_mode: ViewMode,
    /// Last navigated folder path, `/`-separated folder keys
    pub folder_path: Option<String>,
    pub payload_secret: Option<String>,
}

impl ClientSettings {
    pub fn load(store: &LocalStore) -> Self {
        let non_empty = |key: &str| {
            store
                .get_str(key)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        // Port was historically stored both as a number and as a string
        let custom_port = match store.get(KEY_CUSTOM_PORT) {
            Some(Value::Number(n)) => n.as_u64().and_then(|p| u16::try_from(p).ok()),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        };

        let view_mode = store
            .get_str(KEY_VIEW_MODE)
            .and_then(|v| v.parse().ok())
            .unwrap_or_default();

        Self {
            custom_domain: non_empty(KEY_CUSTOM_DOMAIN),
            custom_port,
            view_mode,
            folder_path: non_empty(KEY_FOLDER_PATH),
            payload_secret: non_empty(KEY_PAYLOAD_SECRET),
        }
    }

    pub fn store_into(&self, store: &mut LocalStore) {
        fn put(store: &mut LocalStore, key: &str, value: Option<Value>) {
            match value {
                Some(v) => store.set(key, v),
                None => {
                    store.remove(key);
                }
            }
        }

        put(store, KEY_CUSTOM_DOMAIN, self.custom_domain.clone().map(Value::from));
        put(store, KEY_CUSTOM_PORT, self.custom_port.map(Value::from));
        store.set(KEY_VIEW_MODE, Value::from(self.view_mode.to_string()));
        put(store, KEY_FOLDER_PATH, self.folder_path.clone().map(Value::from));
        put(store, KEY_PAYLOAD_SECRET, self.payload_secret.clone().map(Value::from));
    }

    /// Update one setting by its storage key. An empty value clears it.
    /// A domain or port that would not form a valid base URL leaves the
    /// settings untouched.
    pub fn set_field(&mut self, key: &str, value: &str) -> Result<(), SettingsError> {
        let value = value.trim();
        let cleared = value.is_empty();
        match key {
            KEY_CUSTOM_DOMAIN => {
                let previous = self.custom_domain.take();
                self.custom_domain = (!cleared).then(|| value.trim_end_matches('/').to_string());
                if let Err(e) = self.api_base_url() {
                    self.custom_domain = previous;
                    return Err(e);
                }
            }
            KEY_CUSTOM_PORT => {
                let port = if cleared {
                    None
                } else {
                    Some(value.parse().map_err(|_| SettingsError::InvalidValue {
                        key: key.to_string(),
                        reason: format!("'{}' is not a port number", value),
                    })?)
                };
                let previous = std::mem::replace(&mut self.custom_port, port);
                if let Err(e) = self.api_base_url() {
                    self.custom_port = previous;
                    return Err(e);
                }
            }
            KEY_VIEW_MODE => {
                self.view_mode = if cleared { ViewMode::default() } else { value.parse()? };
            }
            KEY_FOLDER_PATH => {
                self.folder_path = (!cleared).then(|| value.to_string());
            }
            KEY_PAYLOAD_SECRET => {
                self.payload_secret = (!cleared).then(|| value.to_string());
            }
            other => return Err(SettingsError::UnknownKey(other.to_string())),
        }
        Ok(())
    }

    /// Effective API base URL after the custom domain/port overrides
    pub fn api_base_url(&self) -> Result<url::Url, SettingsError> {
        let invalid = |reason: String| SettingsError::InvalidValue {
            key: KEY_CUSTOM_DOMAIN.to_string(),
            reason,
        };

        let raw = match self.custom_domain.as_deref() {
            Some(domain) if domain.starts_with("http://") || domain.starts_with("https://") => {
                domain.to_string()
            }
            Some(domain) => {
                let scheme = if self.custom_port == Some(80) { "http" } else { "https" };
                format!("{}://{}", scheme, domain)
            }
            None => DEFAULT_API_BASE.to_string(),
        };

        let mut url = url::Url::parse(&raw).map_err(|e| invalid(format!("{}: {}", raw, e)))?;
        if let Some(port) = self.custom_port {
            url.set_port(Some(port))
                .map_err(|_| invalid(format!("cannot set port on {}", raw)))?;
        }
        Ok(url)
    }

    /// Folder uploads go to by default: the last key of `folder_path`
    pub fn upload_target(&self) -> Option<String> {
        self.folder_path
            .as_deref()?
            .rsplit('/')
            .find(|segment| !segment.is_empty())
            .map(str::to_string)
    }
}
