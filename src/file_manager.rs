// Nimbus Drive File Manager
// Owns the working set of records for the current view and folder, feeds it
// through the pipeline for display, and drives every mutation:
// gateway call -> notice -> refetch on success.

use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::gateway::{
    DriveGateway, FileKind, FileRecord, GatewayError, Person, Profile, ProfileUpdate, ShareLink,
    ShareRequest, UploadBatch, UploadFile,
};
use crate::notice::{Fallback, Notice, NoticeSender};
use crate::pipeline::{
    self, FilterContext, GroupSort, RecencyBucket, RecencyGroups, SortColumn, SortState,
    ViewSelector,
};
use crate::view_state::{OperationCategory, ViewStateStore};

pub struct FileManager {
    gateway: Arc<dyn DriveGateway>,
    store: ViewStateStore,
    notices: NoticeSender,
    current_user: String,
    /// Last fetched listing, replaced wholesale by `refresh`
    records: Vec<FileRecord>,
    view: ViewSelector,
    query: String,
    /// Folder ids from the top of the view down to the current folder
    folders: Vec<String>,
    sort: SortState,
    group_sort: GroupSort,
}

impl FileManager {
    pub fn new(
        gateway: Arc<dyn DriveGateway>,
        store: ViewStateStore,
        notices: NoticeSender,
        current_user: impl Into<String>,
    ) -> Self {
        Self {
            gateway,
            store,
            notices,
            current_user: current_user.into(),
            records: Vec::new(),
            view: ViewSelector::default(),
            query: String::new(),
            folders: Vec::new(),
            sort: SortState::default(),
            group_sort: GroupSort::default(),
        }
    }

    pub fn view(&self) -> ViewSelector {
        self.view
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn current_folder(&self) -> Option<&str> {
        self.folders.last().map(String::as_str)
    }

    pub fn sort_state(&self) -> SortState {
        self.sort
    }

    pub fn group_sort(&self) -> GroupSort {
        self.group_sort
    }

    pub fn records(&self) -> &[FileRecord] {
        &self.records
    }

    pub fn store(&self) -> &ViewStateStore {
        &self.store
    }

    // ---------------------------------------------------------------------
    // Navigation and presentation state
    // ---------------------------------------------------------------------

    /// Switch to a top-level view. Leaves any folder and clears the query.
    pub fn navigate(&mut self, view: ViewSelector) {
        debug!("Navigating to {}", view.route());
        self.view = view;
        self.folders.clear();
        self.query.clear();
    }

    pub fn open_folder(&mut self, folder_id: impl Into<String>) {
        self.folders.push(folder_id.into());
        self.query.clear();
    }

    /// Go up one folder. Returns false when already at the top of the view.
    pub fn leave_folder(&mut self) -> bool {
        let left = self.folders.pop().is_some();
        if left {
            self.query.clear();
        }
        left
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    pub fn set_sort(&mut self, sort: SortState) {
        self.sort = sort;
    }

    pub fn toggle_sort(&mut self, column: SortColumn) {
        self.sort.toggle(column);
    }

    pub fn toggle_group_sort(&mut self, bucket: RecencyBucket) {
        self.group_sort.toggle(bucket);
    }

    fn filter_context(&self) -> FilterContext<'_> {
        FilterContext {
            view: self.view,
            query: &self.query,
            parent: self.current_folder(),
            current_user: &self.current_user,
        }
    }

    /// Records to render, filtered and sorted
    pub fn visible(&self) -> Vec<&FileRecord> {
        pipeline::run(&self.records, &self.filter_context(), self.sort)
    }

    /// Visible records bucketed by age, each bucket in its own direction
    pub fn grouped(&self, now: DateTime<Utc>) -> RecencyGroups<'_> {
        let items = pipeline::filter(&self.records, &self.filter_context());
        pipeline::group_by_recency(&items, now).sorted(self.group_sort)
    }

    /// Find a record by key, falling back to an exact name among visible ones
    pub fn resolve(&self, key_or_name: &str) -> Option<&FileRecord> {
        self.records
            .iter()
            .find(|r| r.key == key_or_name)
            .or_else(|| self.visible().into_iter().find(|r| r.name == key_or_name))
    }

    // ---------------------------------------------------------------------
    // Fetching
    // ---------------------------------------------------------------------

    /// Reload the listing for the current view and folder
    pub async fn refresh(&mut self) -> Result<usize, GatewayError> {
        let folder = self.folders.last().cloned();
        let trashed = self.view.lists_trash() && folder.is_none();

        match self.gateway.list_files(folder.as_deref(), trashed).await {
            Ok(records) => {
                debug!("Fetched {} records for {}", records.len(), self.view.route());
                self.records = records;
                Ok(self.records.len())
            }
            Err(e) => {
                warn!("Listing {} failed: {}", self.view.route(), e);
                self.emit(Notice::from_error(&e, &Fallback::LIST));
                Err(e)
            }
        }
    }

    /// Fetch the profile and publish its quota to the view state
    pub async fn load_profile(&self) -> Option<Profile> {
        match self.gateway.manage_profile().await {
            Ok(profile) => {
                self.store.set_quota(profile.quota.total, profile.quota.free());
                Some(profile)
            }
            Err(e) => {
                self.emit(Notice::from_error(&e, &Fallback::PROFILE));
                None
            }
        }
    }

    /// Change the display name or email, then refetch the profile
    pub async fn update_profile(&self, update: ProfileUpdate) -> Notice {
        match self.gateway.update_user(update).await {
            Ok(ack) => {
                let notice = Notice::from_ack(&ack, &Fallback::UPDATE_PROFILE);
                self.emit(notice.clone());
                self.load_profile().await;
                notice
            }
            Err(e) => {
                warn!("{}: {}", Fallback::UPDATE_PROFILE.failure, e);
                let notice = Notice::from_error(&e, &Fallback::UPDATE_PROFILE);
                self.emit(notice.clone());
                notice
            }
        }
    }

    pub async fn search_people(&self, query: &str) -> Vec<Person> {
        match self.gateway.search_users(query).await {
            Ok(people) => people,
            Err(e) => {
                self.emit(Notice::from_error(&e, &Fallback::SEARCH));
                Vec::new()
            }
        }
    }

    // ---------------------------------------------------------------------
    // Mutations
    // ---------------------------------------------------------------------

    /// Create a folder inside the current one
    pub async fn create_folder(&mut self, name: &str) -> Notice {
        let parent = self.folders.last().cloned();
        let result = self
            .gateway
            .create_folder(name, parent.as_deref())
            .await
            .map(|ack| Notice::from_ack(&ack, &Fallback::CREATE_FOLDER));
        self.finish(result, &Fallback::CREATE_FOLDER).await
    }

    /// Move a record to the trash. None while another delete is running.
    pub async fn delete(&mut self, key: &str) -> Option<Notice> {
        let kind = match self.lookup(key) {
            Some(record) => record.kind,
            None => return Some(self.unknown_item(key, &Fallback::DELETE)),
        };
        let _guard = self.store.begin(OperationCategory::Delete, key)?;

        info!("Moving {} to trash", key);
        let result = self
            .gateway
            .delete_file(key, kind)
            .await
            .map(|ack| Notice::from_ack(&ack, &Fallback::DELETE));
        Some(self.finish(result, &Fallback::DELETE).await)
    }

    pub async fn restore(&mut self, key: &str) -> Option<Notice> {
        let kind = match self.lookup(key) {
            Some(record) => record.kind,
            None => return Some(self.unknown_item(key, &Fallback::RESTORE)),
        };
        let _guard = self.store.begin(OperationCategory::Restore, key)?;

        info!("Restoring {}", key);
        let result = self
            .gateway
            .restore_file(key, kind)
            .await
            .map(|ack| Notice::from_ack(&ack, &Fallback::RESTORE));
        Some(self.finish(result, &Fallback::RESTORE).await)
    }

    /// Flip the starred flag of a record
    pub async fn toggle_favorite(&mut self, key: &str) -> Option<Notice> {
        let (kind, favorite) = match self.lookup(key) {
            Some(record) => (record.kind, !record.favorite),
            None => return Some(self.unknown_item(key, &Fallback::FAVORITE)),
        };
        self.set_favorite_as(key, kind, favorite).await
    }

    /// Star or unstar explicitly; a no-op request still goes to the backend
    pub async fn set_favorite(&mut self, key: &str, favorite: bool) -> Option<Notice> {
        let kind = match self.lookup(key) {
            Some(record) => record.kind,
            None => return Some(self.unknown_item(key, &Fallback::FAVORITE)),
        };
        self.set_favorite_as(key, kind, favorite).await
    }

    async fn set_favorite_as(
        &mut self,
        key: &str,
        kind: FileKind,
        favorite: bool,
    ) -> Option<Notice> {
        let _guard = self.store.begin(OperationCategory::Favorite, key)?;
        let result = self
            .gateway
            .set_favorite(key, kind, favorite)
            .await
            .map(|ack| Notice::from_ack(&ack, &Fallback::FAVORITE));
        Some(self.finish(result, &Fallback::FAVORITE).await)
    }

    /// Upload files into the current folder as one batch
    pub async fn upload(&mut self, files: Vec<UploadFile>) -> Notice {
        if files.is_empty() {
            let e = GatewayError::InvalidRequest("No files selected".to_string());
            return self.finish(Err(e), &Fallback::UPLOAD).await;
        }
        let batch = UploadBatch::new(self.folders.last().cloned(), files);
        info!("Uploading batch {} ({} file(s))", batch.id, batch.files.len());

        let result = self
            .gateway
            .upload_files(batch)
            .await
            .map(|ack| Notice::from_ack(&ack, &Fallback::UPLOAD));
        self.finish(result, &Fallback::UPLOAD).await
    }

    pub async fn share(&mut self, request: ShareRequest) -> Option<ShareLink> {
        let result = self.gateway.create_share_link(request).await;
        let link = result.as_ref().ok().cloned();
        let result =
            result.map(|link| Notice::success(format!("{}: {}", Fallback::SHARE.success, link.link)));
        self.finish(result, &Fallback::SHARE).await;
        link
    }

    // ---------------------------------------------------------------------
    // Content
    // ---------------------------------------------------------------------

    /// Fetch a file's content for display. None when skipped or failed.
    pub async fn open_file(&self, key: &str) -> Option<Vec<u8>> {
        let _guard = self.store.begin(OperationCategory::View, key)?;
        match self.gateway.view_file(key).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                self.emit(Notice::from_error(&e, &Fallback::OPEN));
                None
            }
        }
    }

    /// Fetch a file's content and write it to `dest`
    pub async fn download(&self, key: &str, dest: &Path) -> Option<Notice> {
        let _guard = self.store.begin(OperationCategory::Download, key)?;

        let result = async {
            let bytes = self.gateway.view_file(key).await?;
            tokio::fs::write(dest, &bytes).await?;
            Ok::<usize, GatewayError>(bytes.len())
        }
        .await;

        let notice = match result {
            Ok(len) => {
                info!("Downloaded {} ({} bytes) to {}", key, len, dest.display());
                Notice::success(Fallback::DOWNLOAD.success)
            }
            Err(e) => {
                warn!("Download of {} failed: {}", key, e);
                Notice::from_error(&e, &Fallback::DOWNLOAD)
            }
        };
        self.emit(notice.clone());
        Some(notice)
    }

    // ---------------------------------------------------------------------
    // Helpers
    // ---------------------------------------------------------------------

    fn lookup(&self, key: &str) -> Option<&FileRecord> {
        self.records.iter().find(|r| r.key == key)
    }

    fn unknown_item(&self, key: &str, fallback: &Fallback) -> Notice {
        let e = GatewayError::InvalidRequest(format!("No such item: {}", key));
        let notice = Notice::from_error(&e, fallback);
        self.emit(notice.clone());
        notice
    }

    fn emit(&self, notice: Notice) {
        if self.notices.send(notice).is_err() {
            debug!("Notice receiver dropped");
        }
    }

    /// Emit the outcome and refetch if the mutation went through
    async fn finish(&mut self, result: Result<Notice, GatewayError>, fallback: &Fallback) -> Notice {
        match result {
            Ok(notice) => {
                self.emit(notice.clone());
                // A failed refetch reports itself
                let _ = self.refresh().await;
                notice
            }
            Err(e) => {
                warn!("{}: {}", fallback.failure, e);
                let notice = Notice::from_error(&e, fallback);
                self.emit(notice.clone());
                notice
            }
        }
    }
}
