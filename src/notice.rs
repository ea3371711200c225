// Nimbus Drive Notices
// Every mutation outcome becomes exactly one user-visible notice.
// Policy: the backend's message when it has one, otherwise a fixed
// per-operation fallback. Transport/decode failures always use the fallback.

use serde::Serialize;
use tokio::sync::mpsc;

use crate::gateway::{Ack, GatewayError};

pub const SESSION_EXPIRED: &str = "Your session has expired. Please sign in again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }

    /// Notice for a failed operation
    pub fn from_error(error: &GatewayError, fallback: &Fallback) -> Self {
        let message = match error {
            GatewayError::Unauthorized => SESSION_EXPIRED.to_string(),
            GatewayError::Rejected(message) if !message.trim().is_empty() => message.clone(),
            GatewayError::InvalidRequest(reason) => reason.clone(),
            _ => fallback.failure.to_string(),
        };
        Self::error(message)
    }

    /// Notice for an acknowledged mutation
    pub fn from_ack(ack: &Ack, fallback: &Fallback) -> Self {
        if ack.message.trim().is_empty() {
            Self::success(fallback.success)
        } else {
            Self::success(ack.message.clone())
        }
    }
}

/// Fixed messages used when the backend gives none
#[derive(Debug, Clone, Copy)]
pub struct Fallback {
    pub success: &'static str,
    pub failure: &'static str,
}

impl Fallback {
    pub const CREATE_FOLDER: Fallback = Fallback {
        success: "Folder created",
        failure: "Could not create the folder",
    };
    pub const DELETE: Fallback = Fallback {
        success: "Moved to trash",
        failure: "Could not move the item to trash",
    };
    pub const RESTORE: Fallback = Fallback {
        success: "Item restored",
        failure: "Could not restore the item",
    };
    pub const FAVORITE: Fallback = Fallback {
        success: "Starred items updated",
        failure: "Could not update starred items",
    };
    pub const UPLOAD: Fallback = Fallback {
        success: "Upload complete",
        failure: "Upload failed",
    };
    pub const SHARE: Fallback = Fallback {
        success: "Share link created",
        failure: "Could not create a share link",
    };
    pub const OPEN: Fallback = Fallback {
        success: "File opened",
        failure: "Could not open the file",
    };
    pub const DOWNLOAD: Fallback = Fallback {
        success: "Download complete",
        failure: "Download failed",
    };
    pub const LIST: Fallback = Fallback {
        success: "",
        failure: "Could not load your files",
    };
    pub const PROFILE: Fallback = Fallback {
        success: "",
        failure: "Could not load your profile",
    };
    pub const UPDATE_PROFILE: Fallback = Fallback {
        success: "Profile updated",
        failure: "Could not update your profile",
    };
    pub const LOGIN: Fallback = Fallback {
        success: "Signed in",
        failure: "Sign-in failed",
    };
    pub const SEARCH: Fallback = Fallback {
        success: "",
        failure: "Search failed",
    };
}

/// Where notices go; the receiving side displays them
pub type NoticeSender = mpsc::UnboundedSender<Notice>;
pub type NoticeReceiver = mpsc::UnboundedReceiver<Notice>;

pub fn channel() -> (NoticeSender, NoticeReceiver) {
    mpsc::unbounded_channel()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_message_wins() {
        let ack = Ack { message: "3 files uploaded".into() };
        assert_eq!(Notice::from_ack(&ack, &Fallback::UPLOAD).message, "3 files uploaded");

        let err = GatewayError::Rejected("Quota exceeded".into());
        let notice = Notice::from_error(&err, &Fallback::UPLOAD);
        assert!(notice.is_error());
        assert_eq!(notice.message, "Quota exceeded");
    }

    #[test]
    fn test_fallbacks() {
        let ack = Ack { message: "  ".into() };
        assert_eq!(Notice::from_ack(&ack, &Fallback::DELETE).message, "Moved to trash");

        let empty = GatewayError::Rejected(String::new());
        assert_eq!(Notice::from_error(&empty, &Fallback::DELETE).message, "Could not move the item to trash");

        let network = GatewayError::Network("connection reset".into());
        assert_eq!(Notice::from_error(&network, &Fallback::SHARE).message, "Could not create a share link");
    }

    #[test]
    fn test_session_expiry_message() {
        let notice = Notice::from_error(&GatewayError::Unauthorized, &Fallback::FAVORITE);
        assert_eq!(notice, Notice::error(SESSION_EXPIRED));
    }
}
