// Nimbus Drive - Cloud file storage client
// Typed gateway, view pipeline and controller behind the `nimbus` command line

pub mod crypto;
pub mod file_manager;
pub mod gateway;
pub mod notice;
pub mod pipeline;
pub mod search;
pub mod session;
pub mod settings;
pub mod view_state;

pub use file_manager::FileManager;
pub use gateway::{DriveGateway, GatewayError, HttpGateway};
pub use notice::{Notice, NoticeLevel};
pub use pipeline::{SortColumn, SortDirection, SortState, ViewSelector};
pub use session::SessionStore;
pub use settings::{ClientSettings, LocalStore};
pub use view_state::ViewStateStore;

/// Install the global tracing subscriber. `RUST_LOG` overrides the default
/// filter. Safe to call more than once.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nimbus_drive=info".into()),
        )
        .with_writer(std::io::stderr)
        .try_init();
}
