//! Remote Data Gateway
//!
//! Every backend call the client makes goes through the `DriveGateway`
//! trait. `HttpGateway` is the REST implementation; tests and offline tools
//! can supply their own.
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │              DriveGateway Trait               │
//! │  list, create, trash, restore, favorite, ...  │
//! └───────────────────────────────────────────────┘
//!                        │
//!                        ▼
//!  ┌──────────────┐  ┌──────────┐  ┌────────────┐
//!  │ HttpGateway  │─▶│ Envelope │─▶│ http_retry │
//!  └──────────────┘  └──────────┘  └────────────┘
//! ```

pub mod envelope;
pub mod http;
pub mod http_retry;
#[cfg(test)]
pub(crate) mod memory;
pub mod types;

pub use envelope::Envelope;
pub use http::HttpGateway;
pub use http_retry::HttpRetryConfig;
pub use types::*;

use async_trait::async_trait;
use secrecy::SecretString;

/// Backend operations used by the client
///
/// Mutations resolve to an [`Ack`] carrying the backend's message; a
/// `success: false` reply surfaces as [`GatewayError::Rejected`].
#[async_trait]
pub trait DriveGateway: Send + Sync {
    /// List a folder (root when `folder_id` is None), or the trash
    async fn list_files(
        &self,
        folder_id: Option<&str>,
        trashed: bool,
    ) -> Result<Vec<FileRecord>, GatewayError>;

    async fn create_folder(&self, name: &str, parent_id: Option<&str>) -> Result<Ack, GatewayError>;

    /// Move an entry to the trash
    async fn delete_file(&self, key: &str, kind: FileKind) -> Result<Ack, GatewayError>;

    async fn restore_file(&self, key: &str, kind: FileKind) -> Result<Ack, GatewayError>;

    async fn set_favorite(
        &self,
        key: &str,
        kind: FileKind,
        favorite: bool,
    ) -> Result<Ack, GatewayError>;

    /// Upload a batch; success or failure covers the whole batch
    async fn upload_files(&self, batch: UploadBatch) -> Result<Ack, GatewayError>;

    /// Fetch file content, used for both "open" and "download"
    async fn view_file(&self, key: &str) -> Result<Vec<u8>, GatewayError>;

    async fn search_files(&self, query: &str) -> Result<Vec<FileRecord>, GatewayError>;

    async fn search_users(&self, query: &str) -> Result<Vec<Person>, GatewayError>;

    async fn create_share_link(&self, request: ShareRequest) -> Result<ShareLink, GatewayError>;

    async fn fetch_shared_link_info(&self, share_key: &str) -> Result<SharedItem, GatewayError>;

    async fn login_email(&self, email: &str, password: &SecretString) -> Result<LoginGrant, GatewayError>;

    /// Exchange an already-obtained Google ID token for a session
    async fn login_google(&self, id_token: &str) -> Result<LoginGrant, GatewayError>;

    async fn manage_profile(&self) -> Result<Profile, GatewayError>;

    async fn update_user(&self, update: ProfileUpdate) -> Result<Ack, GatewayError>;
}
