//! REST implementation of the gateway
//!
//! API base: configurable (`customDomain` / `customPort`)
//! Auth: `x-auth-token: {token}` from the stored session
//! Bodies: JSON, sealed through [`Envelope`] when a payload secret is set
//! Replies: `{ success, message, data }`; bare arrays are accepted for lists

use async_trait::async_trait;
use reqwest::header::{HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::envelope::Envelope;
use super::http_retry::{send_with_retry, HttpRetryConfig};
use super::{
    Ack, DriveGateway, FileKind, FileRecord, GatewayError, LoginGrant, Person, Profile,
    ProfileUpdate, SharedItem, ShareLink, ShareRequest, UploadBatch, UploadSource,
};
use crate::session::SessionStore;
use crate::settings::ClientSettings;

pub const AUTH_HEADER: &str = "x-auth-token";

/// Keys under which list-like payloads have been observed
const DATA_KEYS: &[&str] = &["data", "files", "result"];

/// A 401 from these means bad credentials, not an expired session
const LOGIN_PATHS: &[&str] = &["/login/email", "/login/google"];

/// Parsed reply of a JSON endpoint
#[derive(Debug, Clone, PartialEq)]
pub enum ApiOutcome<T> {
    Success { message: String, data: Option<T> },
    Failure { message: String },
}

impl<T> ApiOutcome<T> {
    /// Turn a business failure into `GatewayError::Rejected`
    pub fn into_result(self) -> Result<(String, Option<T>), GatewayError> {
        match self {
            ApiOutcome::Success { message, data } => Ok((message, data)),
            ApiOutcome::Failure { message } => Err(GatewayError::Rejected(message)),
        }
    }

    pub fn into_ack(self) -> Result<Ack, GatewayError> {
        self.into_result().map(|(message, _)| Ack { message })
    }

    pub fn into_data(self, what: &str) -> Result<T, GatewayError> {
        let (_, data) = self.into_result()?;
        data.ok_or_else(|| GatewayError::Decode(format!("{} reply carried no data", what)))
    }
}

/// Interpret an (already opened) reply body
pub fn parse_outcome<T: DeserializeOwned>(body: Value) -> Result<ApiOutcome<T>, GatewayError> {
    let decode = |e: serde_json::Error| GatewayError::Decode(e.to_string());

    if body.is_array() {
        return Ok(ApiOutcome::Success {
            message: String::new(),
            data: Some(serde_json::from_value(body).map_err(decode)?),
        });
    }

    let success = body.get("success").and_then(Value::as_bool).unwrap_or(true);
    let message = body
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    if !success {
        return Ok(ApiOutcome::Failure { message });
    }

    let payload = DATA_KEYS
        .iter()
        .find_map(|k| body.get(*k).filter(|v| !v.is_null()).cloned());
    let data = match payload {
        Some(value) => Some(serde_json::from_value(value).map_err(decode)?),
        // Some endpoints put the payload at the top level
        None => serde_json::from_value(body).ok(),
    };
    Ok(ApiOutcome::Success { message, data })
}

pub struct HttpGateway {
    client: reqwest::Client,
    base: url::Url,
    envelope: Envelope,
    session: Arc<SessionStore>,
    retry: HttpRetryConfig,
}

impl HttpGateway {
    pub fn new(
        mut base: url::Url,
        envelope: Envelope,
        session: Arc<SessionStore>,
    ) -> Result<Self, GatewayError> {
        // `Url::join` drops the last segment unless the base ends with '/'
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let mut default_headers = reqwest::header::HeaderMap::new();
        default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .connect_timeout(Duration::from_secs(30))
            .default_headers(default_headers)
            .build()
            .map_err(|e| GatewayError::InvalidRequest(format!("Failed to build HTTP client: {}", e)))?;
        debug!("Gateway at {} (sealed payloads: {})", base, envelope.is_sealing());
        Ok(Self {
            client,
            base,
            envelope,
            session,
            retry: HttpRetryConfig::default(),
        })
    }

    /// Build a gateway from the persisted client settings
    pub fn from_settings(
        settings: &ClientSettings,
        session: Arc<SessionStore>,
    ) -> Result<Self, GatewayError> {
        let base = settings
            .api_base_url()
            .map_err(|e| GatewayError::InvalidRequest(e.to_string()))?;
        let secret = settings.payload_secret.clone().map(SecretString::from);
        Self::new(base, Envelope::new(secret.as_ref()), session)
    }

    pub fn with_retry(mut self, retry: HttpRetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn base_url(&self) -> &url::Url {
        &self.base
    }

    // ─── Helpers ─────────────────────────────────────────────────────────

    fn url(&self, path: &str, query: &[(&str, &str)]) -> Result<url::Url, GatewayError> {
        let mut url = self
            .base
            .join(path.trim_start_matches('/'))
            .map_err(|e| GatewayError::InvalidRequest(format!("Bad path {}: {}", path, e)))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> Result<RequestBuilder, GatewayError> {
        match self.session.token() {
            Some(token) => {
                let value = HeaderValue::from_str(token.expose_secret()).map_err(|e| {
                    GatewayError::InvalidRequest(format!("Invalid characters in session token: {}", e))
                })?;
                Ok(request.header(AUTH_HEADER, value))
            }
            None => Ok(request),
        }
    }

    /// Map transport-level status codes; 401 triggers the forced logout
    /// except on the sign-in endpoints
    async fn check_status(&self, resp: Response) -> Result<Response, GatewayError> {
        let status = resp.status();
        let signing_in = LOGIN_PATHS.iter().any(|p| resp.url().path().ends_with(p));
        if status == StatusCode::UNAUTHORIZED && !signing_in {
            warn!("{} returned 401", resp.url().path());
            self.session.force_logout();
            return Err(GatewayError::Unauthorized);
        }
        if status.is_success() {
            return Ok(resp);
        }

        // Error replies usually still carry `{ success: false, message }`
        let body = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| self.envelope.open(v).ok())
            .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
            .filter(|m| !m.is_empty());
        match message {
            Some(message) => Err(GatewayError::Rejected(message)),
            None => Err(GatewayError::Http(status.as_u16())),
        }
    }

    async fn decode<T: DeserializeOwned>(&self, resp: Response) -> Result<ApiOutcome<T>, GatewayError> {
        let resp = self.check_status(resp).await?;
        let body: Value = resp.json().await?;
        parse_outcome(self.envelope.open(body)?)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<ApiOutcome<T>, GatewayError> {
        let url = self.url(path, query)?;
        debug!("GET {}", url.path());
        let request = self.authorize(self.client.get(url))?;
        let resp = send_with_retry(request, &self.retry).await?;
        self.decode(resp).await
    }

    /// Send a JSON mutation. Never retried.
    async fn send_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Value,
    ) -> Result<ApiOutcome<T>, GatewayError> {
        let url = self.url(path, &[])?;
        debug!("{} {}", method, url.path());
        let sealed = self.envelope.seal(&body)?;
        let request = self
            .authorize(self.client.request(method, url))?
            .header(CONTENT_TYPE, "application/json")
            .body(sealed.to_string());
        let resp = request.send().await?;
        self.decode(resp).await
    }

    async fn post_ack(&self, path: &str, body: Value) -> Result<Ack, GatewayError> {
        self.send_json::<Value>(Method::POST, path, body).await?.into_ack()
    }

    async fn build_part(file: &super::UploadFile) -> Result<reqwest::multipart::Part, GatewayError> {
        let part = match &file.source {
            UploadSource::Bytes(bytes) => reqwest::multipart::Part::bytes(bytes.clone()),
            UploadSource::Path(path) => {
                let handle = tokio::fs::File::open(path).await?;
                let len = handle.metadata().await?.len();
                let stream = tokio_util::io::ReaderStream::new(handle);
                reqwest::multipart::Part::stream_with_length(reqwest::Body::wrap_stream(stream), len)
            }
        };
        part.file_name(file.name.clone())
            .mime_str(&file.mime_type)
            .map_err(|e| GatewayError::InvalidRequest(format!("Bad content type {}: {}", file.mime_type, e)))
    }
}

#[async_trait]
impl DriveGateway for HttpGateway {
    async fn list_files(
        &self,
        folder_id: Option<&str>,
        trashed: bool,
    ) -> Result<Vec<FileRecord>, GatewayError> {
        let outcome = if trashed {
            self.get_json::<Vec<FileRecord>>("/folder/trash", &[]).await?
        } else {
            let query: Vec<(&str, &str)> = folder_id.map(|id| ("folderId", id)).into_iter().collect();
            self.get_json::<Vec<FileRecord>>("/folder/list", &query).await?
        };
        let records = outcome.into_result()?.1.unwrap_or_default();
        debug!("Listed {} entries (folder={:?}, trashed={})", records.len(), folder_id, trashed);
        Ok(records)
    }

    async fn create_folder(&self, name: &str, parent_id: Option<&str>) -> Result<Ack, GatewayError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(GatewayError::InvalidRequest("Folder name is empty".to_string()));
        }
        self.post_ack("/folder/create", json!({ "name": name, "parentId": parent_id }))
            .await
    }

    async fn delete_file(&self, key: &str, kind: FileKind) -> Result<Ack, GatewayError> {
        self.post_ack("/folder/trash", json!({ "key": key, "type": kind })).await
    }

    async fn restore_file(&self, key: &str, kind: FileKind) -> Result<Ack, GatewayError> {
        self.post_ack("/folder/restore", json!({ "key": key, "type": kind })).await
    }

    async fn set_favorite(
        &self,
        key: &str,
        kind: FileKind,
        favorite: bool,
    ) -> Result<Ack, GatewayError> {
        self.post_ack(
            "/folder/favorite",
            json!({ "key": key, "type": kind, "isFavorite": favorite }),
        )
        .await
    }

    async fn upload_files(&self, batch: UploadBatch) -> Result<Ack, GatewayError> {
        if batch.files.is_empty() {
            return Err(GatewayError::InvalidRequest("Nothing to upload".to_string()));
        }
        let mut form = reqwest::multipart::Form::new().text("batchId", batch.id.clone());
        if let Some(parent) = &batch.parent_id {
            form = form.text("parentId", parent.clone());
        }
        for file in &batch.files {
            form = form.part("files", Self::build_part(file).await?);
        }

        info!("Uploading {} file(s) in batch {}", batch.files.len(), batch.id);
        let url = self.url("/file/upload", &[])?;
        let resp = self.authorize(self.client.post(url))?.multipart(form).send().await?;
        self.decode::<Value>(resp).await?.into_ack()
    }

    async fn view_file(&self, key: &str) -> Result<Vec<u8>, GatewayError> {
        let url = self.url("/folder/list", &[("fileKey", key)])?;
        let request = self.authorize(self.client.get(url))?;
        let resp = self.check_status(send_with_retry(request, &self.retry).await?).await?;

        let is_json = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.starts_with("application/json"))
            .unwrap_or(false);
        let bytes = resp.bytes().await?;

        // A JSON body on a blob endpoint is a business reply, usually a refusal
        if is_json {
            if let Ok(body) = serde_json::from_slice::<Value>(&bytes) {
                let body = self.envelope.open(body)?;
                if let ApiOutcome::Failure { message } = parse_outcome::<Value>(body)? {
                    return Err(GatewayError::Rejected(message));
                }
            }
        }
        Ok(bytes.to_vec())
    }

    async fn search_files(&self, query: &str) -> Result<Vec<FileRecord>, GatewayError> {
        let outcome = self
            .get_json::<Vec<FileRecord>>("/folder/search", &[("query", query)])
            .await?;
        Ok(outcome.into_result()?.1.unwrap_or_default())
    }

    async fn search_users(&self, query: &str) -> Result<Vec<Person>, GatewayError> {
        let outcome = self
            .get_json::<Vec<Person>>("/user/search", &[("query", query)])
            .await?;
        Ok(outcome.into_result()?.1.unwrap_or_default())
    }

    async fn create_share_link(&self, request: ShareRequest) -> Result<ShareLink, GatewayError> {
        let body = serde_json::to_value(&request)
            .map_err(|e| GatewayError::InvalidRequest(e.to_string()))?;
        self.send_json::<ShareLink>(Method::POST, "/share/create", body)
            .await?
            .into_data("share link")
    }

    async fn fetch_shared_link_info(&self, share_key: &str) -> Result<SharedItem, GatewayError> {
        self.get_json::<SharedItem>("/share/info", &[("shareKey", share_key)])
            .await?
            .into_data("shared item")
    }

    async fn login_email(&self, email: &str, password: &SecretString) -> Result<LoginGrant, GatewayError> {
        self.send_json::<LoginGrant>(
            Method::POST,
            "/login/email",
            json!({ "email": email, "password": password.expose_secret() }),
        )
        .await?
        .into_data("login")
    }

    async fn login_google(&self, id_token: &str) -> Result<LoginGrant, GatewayError> {
        self.send_json::<LoginGrant>(Method::POST, "/login/google", json!({ "idToken": id_token }))
            .await?
            .into_data("login")
    }

    async fn manage_profile(&self) -> Result<Profile, GatewayError> {
        self.get_json::<Profile>("/user/manage-profile", &[])
            .await?
            .into_data("profile")
    }

    async fn update_user(&self, update: ProfileUpdate) -> Result<Ack, GatewayError> {
        let body = serde_json::to_value(&update)
            .map_err(|e| GatewayError::InvalidRequest(e.to_string()))?;
        self.send_json::<Value>(Method::PUT, "/user/update-user", body)
            .await?
            .into_ack()
    }
}
