// Nimbus Drive View-State Store
// Cross-cutting async-operation flags and storage quota, shared by everything
// that renders. Each category has exactly one writer at a time: the guard
// returned by `begin`.

use serde::Serialize;
use std::fmt;
use tokio::sync::watch;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationCategory {
    Delete,
    Restore,
    Favorite,
    View,
    Download,
}

impl fmt::Display for OperationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationCategory::Delete => "delete",
            OperationCategory::Restore => "restore",
            OperationCategory::Favorite => "favorite",
            OperationCategory::View => "view",
            OperationCategory::Download => "download",
        };
        f.write_str(name)
    }
}

/// In-flight flag plus the key of the record it applies to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OperationFlag {
    pub in_flight: bool,
    pub target: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ViewState {
    pub delete: OperationFlag,
    pub restore: OperationFlag,
    pub favorite: OperationFlag,
    pub view: OperationFlag,
    pub download: OperationFlag,
    /// Total storage in bytes
    pub quota_total: u64,
    /// Free storage in bytes
    pub quota_free: u64,
}

impl ViewState {
    pub fn flag(&self, category: OperationCategory) -> &OperationFlag {
        match category {
            OperationCategory::Delete => &self.delete,
            OperationCategory::Restore => &self.restore,
            OperationCategory::Favorite => &self.favorite,
            OperationCategory::View => &self.view,
            OperationCategory::Download => &self.download,
        }
    }

    fn flag_mut(&mut self, category: OperationCategory) -> &mut OperationFlag {
        match category {
            OperationCategory::Delete => &mut self.delete,
            OperationCategory::Restore => &mut self.restore,
            OperationCategory::Favorite => &mut self.favorite,
            OperationCategory::View => &mut self.view,
            OperationCategory::Download => &mut self.download,
        }
    }

    /// Is `key` the subject of an in-flight `category` operation?
    pub fn is_busy_with(&self, category: OperationCategory, key: &str) -> bool {
        let flag = self.flag(category);
        flag.in_flight && flag.target.as_deref() == Some(key)
    }

    pub fn quota_used(&self) -> u64 {
        self.quota_total.saturating_sub(self.quota_free)
    }
}

/// Cheaply cloneable handle to the shared view state
#[derive(Clone)]
pub struct ViewStateStore {
    tx: watch::Sender<ViewState>,
}

impl Default for ViewStateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewStateStore {
    pub fn new() -> Self {
        Self {
            tx: watch::Sender::new(ViewState::default()),
        }
    }

    pub fn snapshot(&self) -> ViewState {
        self.tx.borrow().clone()
    }

    /// Receiver that wakes on every change
    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.tx.subscribe()
    }

    pub fn is_busy(&self, category: OperationCategory) -> bool {
        self.tx.borrow().flag(category).in_flight
    }

    /// Mark `category` as in flight for `key`. Returns None while another
    /// operation of the same category is still running.
    pub fn begin(&self, category: OperationCategory, key: &str) -> Option<OperationGuard> {
        let acquired = self.tx.send_if_modified(|state| {
            let flag = state.flag_mut(category);
            if flag.in_flight {
                return false;
            }
            flag.in_flight = true;
            flag.target = Some(key.to_string());
            true
        });

        if !acquired {
            debug!("{} already in flight, ignoring request for {}", category, key);
            return None;
        }
        Some(OperationGuard {
            tx: self.tx.clone(),
            category,
        })
    }

    pub fn set_quota(&self, total: u64, free: u64) {
        self.tx.send_if_modified(|state| {
            if state.quota_total == total && state.quota_free == free {
                return false;
            }
            state.quota_total = total;
            state.quota_free = free;
            true
        });
    }
}

/// Clears its category's flag when dropped
#[must_use = "the operation flag is cleared as soon as the guard is dropped"]
pub struct OperationGuard {
    tx: watch::Sender<ViewState>,
    category: OperationCategory,
}

impl Drop for OperationGuard {
    fn drop(&mut self) {
        let category = self.category;
        self.tx.send_modify(|state| {
            *state.flag_mut(category) = OperationFlag::default();
        });
    }
}
