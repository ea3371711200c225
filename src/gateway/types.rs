//! Shared types for the remote data gateway
//!
//! Wire records, typed endpoint responses and the gateway error type. The
//! backend answers with loosely shaped camelCase JSON; everything here is
//! validated at the boundary so the rest of the crate works with plain,
//! fully-typed values.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Kind of a drive entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    File,
    Folder,
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileKind::File => write!(f, "file"),
            FileKind::Folder => write!(f, "folder"),
        }
    }
}

/// Sharing metadata attached to a record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareInfo {
    /// Identifiers of the users the entry is shared with
    #[serde(default, alias = "sharedWith")]
    pub recipients: Vec<String>,
    /// Display name of whoever shared the entry
    #[serde(default, alias = "sharedBy")]
    pub sharer_name: Option<String>,
    /// Raw share timestamp
    #[serde(default, alias = "sharedAt", deserialize_with = "string_or_number")]
    pub shared_at: Option<String>,
}

/// A file or folder as known to the client
///
/// Records are created server-side and only ever replaced wholesale by a
/// refetch; the client never patches them locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    /// Opaque identifier, stable across sessions
    #[serde(alias = "id", alias = "fileKey", deserialize_with = "required_id")]
    pub key: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FileKind,
    /// Size in bytes; meaningless for folders
    #[serde(default)]
    pub size: Option<u64>,
    /// Raw modification timestamp, parsed lazily by the pipeline
    #[serde(
        default,
        alias = "updatedAt",
        alias = "modifiedAt",
        deserialize_with = "string_or_number"
    )]
    pub modified: Option<String>,
    #[serde(default, alias = "owner", alias = "userId", deserialize_with = "optional_id")]
    pub owner_id: Option<String>,
    #[serde(default, alias = "isFavorite", alias = "isFavourite")]
    pub favorite: bool,
    #[serde(default, alias = "isTrashed", alias = "isDeleted")]
    pub trashed: bool,
    #[serde(default, alias = "isSpam")]
    pub spam: bool,
    #[serde(default, alias = "shareDetails")]
    pub share: ShareInfo,
    #[serde(default, alias = "parentKey", deserialize_with = "optional_id")]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
}

impl FileRecord {
    /// Create a new file record (used by tests and optimistic previews)
    pub fn file(key: impl Into<String>, name: impl Into<String>, size: u64) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            kind: FileKind::File,
            size: Some(size),
            modified: None,
            owner_id: None,
            favorite: false,
            trashed: false,
            spam: false,
            share: ShareInfo::default(),
            parent_id: None,
            mime_type: None,
        }
    }

    /// Create a new folder record
    pub fn folder(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: FileKind::Folder,
            size: None,
            ..Self::file(key, name, 0)
        }
    }

    pub fn is_folder(&self) -> bool {
        self.kind == FileKind::Folder
    }
}

/// A user returned by people search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    #[serde(alias = "_id", alias = "userId", deserialize_with = "required_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

/// Successful mutation acknowledgement carrying the backend's message
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub message: String,
}

/// Share link creation request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareRequest {
    pub key: String,
    pub restricted: bool,
    pub recipients: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareLink {
    pub link: String,
}

/// Public lookup result for a share key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedItem {
    #[serde(deserialize_with = "required_id")]
    pub key: String,
    #[serde(rename = "type")]
    pub kind: FileKind,
    pub name: String,
}

/// Authenticated user returned by the login endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    #[serde(alias = "_id", alias = "userId", deserialize_with = "required_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

/// Raw login payload: `{ token, user }`
#[derive(Debug, Clone, Deserialize)]
pub struct LoginGrant {
    pub token: String,
    pub user: SessionUser,
}

/// Storage quota in bytes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageQuota {
    #[serde(default, alias = "totalStorage")]
    pub total: u64,
    #[serde(default, alias = "usedStorage")]
    pub used: u64,
}

impl StorageQuota {
    pub fn free(&self) -> u64 {
        self.total.saturating_sub(self.used)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(alias = "_id", deserialize_with = "required_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, alias = "storage")]
    pub quota: StorageQuota,
}

/// Fields the user may change through `update-user`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Where the bytes of an upload come from
#[derive(Debug, Clone)]
pub enum UploadSource {
    Bytes(Vec<u8>),
    Path(PathBuf),
}

#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub mime_type: String,
    pub source: UploadSource,
}

impl UploadFile {
    /// Build an upload entry from a local path, guessing its content type
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self, GatewayError> {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| GatewayError::InvalidRequest(format!("Not a file path: {}", path.display())))?;
        let mime_type = mime_guess::from_path(&path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Ok(Self {
            name,
            mime_type,
            source: UploadSource::Path(path),
        })
    }
}

/// A multipart upload: every file lands in the same parent folder
#[derive(Debug, Clone)]
pub struct UploadBatch {
    pub id: String,
    pub parent_id: Option<String>,
    pub files: Vec<UploadFile>,
}

impl UploadBatch {
    pub fn new(parent_id: Option<String>, files: Vec<UploadFile>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            parent_id,
            files,
        }
    }
}

/// Gateway error type
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("{0}")]
    Rejected(String),

    #[error("Session expired")]
    Unauthorized,

    #[error("Envelope error: {0}")]
    Envelope(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("HTTP {0}")]
    Http(u16),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GatewayError {
    /// Authentication expiry triggers the forced logout path
    pub fn is_auth_expiry(&self) -> bool {
        matches!(self, GatewayError::Unauthorized)
    }

    /// Check if this error is transient (the user may simply try again)
    pub fn is_recoverable(&self) -> bool {
        match self {
            GatewayError::Network(_) => true,
            GatewayError::Http(status) => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            GatewayError::Decode(e.to_string())
        } else {
            GatewayError::Network(e.to_string())
        }
    }
}

// ─── Serde helpers ─────────────────────────────────────────────────────────

fn id_from_value(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string().trim_matches('"').to_string()),
    }
}

/// Ids arrive as numbers or strings depending on the endpoint
fn required_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    id_from_value(value).ok_or_else(|| serde::de::Error::custom("missing identifier"))
}

fn optional_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(id_from_value))
}

/// Timestamps arrive as ISO strings or epoch numbers
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    optional_id(deserializer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_from_wire_json() {
        let json = r#"{
            "id": 42,
            "name": "Report.pdf",
            "type": "file",
            "size": 1200,
            "updatedAt": "2026-03-01T10:00:00Z",
            "ownerId": 7,
            "isFavorite": true,
            "shareDetails": { "sharedWith": ["u1", "u2"], "sharedBy": "Dana" }
        }"#;
        let record: FileRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.key, "42");
        assert_eq!(record.kind, FileKind::File);
        assert_eq!(record.owner_id.as_deref(), Some("7"));
        assert!(record.favorite);
        assert!(!record.trashed);
        assert_eq!(record.share.recipients, vec!["u1", "u2"]);
        assert_eq!(record.share.sharer_name.as_deref(), Some("Dana"));
    }

    #[test]
    fn test_numeric_timestamp_kept_as_string() {
        let json = r#"{"key":"a","name":"x","type":"folder","modified":1700000000000}"#;
        let record: FileRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.modified.as_deref(), Some("1700000000000"));
        assert!(record.is_folder());
    }

    #[test]
    fn test_quota_free_saturates() {
        let quota = StorageQuota { total: 10, used: 25 };
        assert_eq!(quota.free(), 0);
    }

    #[test]
    fn test_error_classification() {
        assert!(GatewayError::Unauthorized.is_auth_expiry());
        assert!(GatewayError::Http(503).is_recoverable());
        assert!(!GatewayError::Http(404).is_recoverable());
        assert!(!GatewayError::Rejected("nope".into()).is_recoverable());
    }
}
