//! In-memory gateway used by controller and search tests
//!
//! Mirrors the backend's observable behavior closely enough for the client:
//! trash is a flag, listings are per parent folder, and every call is
//! recorded so tests can assert what was sent.

use async_trait::async_trait;
use secrecy::SecretString;
use std::collections::HashMap;
use std::sync::Mutex;

use super::{
    Ack, DriveGateway, FileKind, FileRecord, GatewayError, LoginGrant, Person, Profile,
    ProfileUpdate, SessionUser, SharedItem, ShareLink, ShareRequest, StorageQuota, UploadBatch,
    UploadSource,
};

#[derive(Default)]
struct MemoryState {
    records: Vec<FileRecord>,
    people: Vec<Person>,
    blobs: HashMap<String, Vec<u8>>,
    shares: HashMap<String, String>,
    calls: Vec<String>,
    fail_next: Option<GatewayError>,
    next_id: u64,
    quota: StorageQuota,
    profile: ProfileUpdate,
}

#[derive(Default)]
pub struct MemoryGateway {
    state: Mutex<MemoryState>,
}

impl MemoryGateway {
    pub fn new(records: Vec<FileRecord>) -> Self {
        let gateway = Self::default();
        gateway.lock().records = records;
        gateway
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn with_people(self, people: Vec<Person>) -> Self {
        self.lock().people = people;
        self
    }

    pub fn with_quota(self, quota: StorageQuota) -> Self {
        self.lock().quota = quota;
        self
    }

    pub fn put_blob(&self, key: &str, bytes: &[u8]) {
        self.lock().blobs.insert(key.to_string(), bytes.to_vec());
    }

    /// The next call fails with `error`
    pub fn fail_next(&self, error: GatewayError) {
        self.lock().fail_next = Some(error);
    }

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn record(&self, key: &str) -> Option<FileRecord> {
        self.lock().records.iter().find(|r| r.key == key).cloned()
    }

    /// Log the call and consume a pending failure
    fn enter(&self, call: String) -> Result<std::sync::MutexGuard<'_, MemoryState>, GatewayError> {
        let mut state = self.lock();
        state.calls.push(call);
        match state.fail_next.take() {
            Some(error) => Err(error),
            None => Ok(state),
        }
    }

    fn update<F>(&self, call: String, key: &str, message: &str, apply: F) -> Result<Ack, GatewayError>
    where
        F: FnOnce(&mut FileRecord),
    {
        let mut state = self.enter(call)?;
        let record = state
            .records
            .iter_mut()
            .find(|r| r.key == key)
            .ok_or_else(|| GatewayError::Rejected(format!("No such item: {}", key)))?;
        apply(record);
        Ok(Ack { message: message.to_string() })
    }
}

#[async_trait]
impl DriveGateway for MemoryGateway {
    async fn list_files(
        &self,
        folder_id: Option<&str>,
        trashed: bool,
    ) -> Result<Vec<FileRecord>, GatewayError> {
        let state = self.enter(format!("list {:?} trashed={}", folder_id, trashed))?;
        Ok(state
            .records
            .iter()
            .filter(|r| {
                if trashed {
                    r.trashed
                } else {
                    r.parent_id.as_deref() == folder_id
                }
            })
            .cloned()
            .collect())
    }

    async fn create_folder(&self, name: &str, parent_id: Option<&str>) -> Result<Ack, GatewayError> {
        let mut state = self.enter(format!("create {}", name))?;
        state.next_id += 1;
        let mut folder = FileRecord::folder(format!("new-{}", state.next_id), name);
        folder.parent_id = parent_id.map(str::to_string);
        state.records.push(folder);
        Ok(Ack { message: format!("Folder {} created", name) })
    }

    async fn delete_file(&self, key: &str, kind: FileKind) -> Result<Ack, GatewayError> {
        self.update(format!("trash {} {}", kind, key), key, "", |r| r.trashed = true)
    }

    async fn restore_file(&self, key: &str, kind: FileKind) -> Result<Ack, GatewayError> {
        self.update(format!("restore {} {}", kind, key), key, "Restored", |r| r.trashed = false)
    }

    async fn set_favorite(
        &self,
        key: &str,
        kind: FileKind,
        favorite: bool,
    ) -> Result<Ack, GatewayError> {
        self.update(format!("favorite {} {} {}", kind, key, favorite), key, "", |r| {
            r.favorite = favorite
        })
    }

    async fn upload_files(&self, batch: UploadBatch) -> Result<Ack, GatewayError> {
        let mut state = self.enter(format!("upload {}", batch.files.len()))?;
        for file in &batch.files {
            let size = match &file.source {
                UploadSource::Bytes(bytes) => bytes.len() as u64,
                UploadSource::Path(path) => std::fs::metadata(path)?.len(),
            };
            state.next_id += 1;
            let mut record = FileRecord::file(format!("up-{}", state.next_id), file.name.clone(), size);
            record.parent_id = batch.parent_id.clone();
            state.records.push(record);
        }
        Ok(Ack { message: format!("{} file(s) uploaded", batch.files.len()) })
    }

    async fn view_file(&self, key: &str) -> Result<Vec<u8>, GatewayError> {
        let state = self.enter(format!("view {}", key))?;
        state
            .blobs
            .get(key)
            .cloned()
            .ok_or_else(|| GatewayError::Rejected("File not found".to_string()))
    }

    async fn search_files(&self, query: &str) -> Result<Vec<FileRecord>, GatewayError> {
        let state = self.enter(format!("search {}", query))?;
        let needle = query.to_lowercase();
        Ok(state
            .records
            .iter()
            .filter(|r| r.name.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    async fn search_users(&self, query: &str) -> Result<Vec<Person>, GatewayError> {
        let state = self.enter(format!("people {}", query))?;
        let needle = query.to_lowercase();
        Ok(state
            .people
            .iter()
            .filter(|p| p.name.to_lowercase().contains(&needle) || p.email.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    async fn create_share_link(&self, request: ShareRequest) -> Result<ShareLink, GatewayError> {
        let mut state = self.enter(format!("share {}", request.key))?;
        state.next_id += 1;
        let share_key = format!("s{}", state.next_id);
        state.shares.insert(share_key.clone(), request.key.clone());
        if let Some(record) = state.records.iter_mut().find(|r| r.key == request.key) {
            record.share.recipients.extend(request.recipients.iter().cloned());
        }
        Ok(ShareLink {
            link: format!("https://share.test/{}", share_key),
        })
    }

    async fn fetch_shared_link_info(&self, share_key: &str) -> Result<SharedItem, GatewayError> {
        let state = self.enter(format!("share-info {}", share_key))?;
        let key = state
            .shares
            .get(share_key)
            .ok_or_else(|| GatewayError::Rejected("Link expired".to_string()))?;
        let record = state
            .records
            .iter()
            .find(|r| &r.key == key)
            .ok_or_else(|| GatewayError::Rejected("Link expired".to_string()))?;
        Ok(SharedItem {
            key: record.key.clone(),
            kind: record.kind,
            name: record.name.clone(),
        })
    }

    async fn login_email(&self, email: &str, _password: &SecretString) -> Result<LoginGrant, GatewayError> {
        let _state = self.enter(format!("login {}", email))?;
        Ok(LoginGrant {
            token: "memory-token".to_string(),
            user: SessionUser {
                id: "me".to_string(),
                name: "Me".to_string(),
                email: email.to_string(),
            },
        })
    }

    async fn login_google(&self, _id_token: &str) -> Result<LoginGrant, GatewayError> {
        let _state = self.enter("login google".to_string())?;
        Ok(LoginGrant {
            token: "memory-token".to_string(),
            user: SessionUser {
                id: "me".to_string(),
                name: "Me".to_string(),
                email: "me@example.com".to_string(),
            },
        })
    }

    async fn manage_profile(&self) -> Result<Profile, GatewayError> {
        let state = self.enter("profile".to_string())?;
        Ok(Profile {
            id: "me".to_string(),
            name: state.profile.name.clone().unwrap_or_else(|| "Me".to_string()),
            email: state.profile.email.clone().unwrap_or_else(|| "me@example.com".to_string()),
            quota: state.quota,
        })
    }

    async fn update_user(&self, update: ProfileUpdate) -> Result<Ack, GatewayError> {
        let mut state = self.enter(format!("update-user {:?}", update.name))?;
        if update.name.is_some() {
            state.profile.name = update.name;
        }
        if update.email.is_some() {
            state.profile.email = update.email;
        }
        Ok(Ack { message: "Profile updated".to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_login_and_profile_calls_release_the_lock() {
        let gw = MemoryGateway::default();
        let password = SecretString::from("pw".to_string());

        gw.login_email("dana@example.com", &password).await.unwrap();
        gw.login_google("id-token").await.unwrap();
        gw.update_user(ProfileUpdate {
            name: Some("Dana".into()),
            email: None,
        })
        .await
        .unwrap();

        // Each call above must have dropped its guard before returning
        assert_eq!(gw.manage_profile().await.unwrap().name, "Dana");
        assert_eq!(
            gw.calls(),
            vec![
                "login dana@example.com",
                "login google",
                "update-user Some(\"Dana\")",
                "profile",
            ]
        );
    }
}
