//! Nimbus Drive CLI: browse and manage cloud storage from the terminal
//!
//! Usage:
//!   nimbus login <email>                Sign in with email and password
//!   nimbus ls [--view starred]          List the current folder or a view
//!   nimbus cd <folder>                  Change the folder `ls` and `upload` use
//!   nimbus upload <files>...            Upload into the current folder
//!   nimbus download <item> [dest]       Save a file locally
//!   nimbus share <item> --with <email>  Create a share link
//!   nimbus profile set --name <name>    Change your display name
//!   nimbus config set <key> <value>     Change a setting (works offline)

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use secrecy::SecretString;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use nimbus_drive::gateway::{FileRecord, ProfileUpdate, ShareRequest, UploadFile};
use nimbus_drive::notice::{self, Fallback, Notice, NoticeReceiver, NoticeSender};
use nimbus_drive::pipeline::{self, RecencyBucket};
use nimbus_drive::search::{SearchDebouncer, SearchEvent};
use nimbus_drive::settings::{
    ViewMode, KEY_CUSTOM_DOMAIN, KEY_CUSTOM_PORT, KEY_FOLDER_PATH, KEY_PAYLOAD_SECRET,
    KEY_VIEW_MODE,
};
use nimbus_drive::{
    ClientSettings, DriveGateway, FileManager, GatewayError, HttpGateway, LocalStore, SessionStore,
    SortColumn, SortDirection, SortState, ViewSelector, ViewStateStore,
};

#[derive(Parser)]
#[command(
    name = "nimbus",
    about = "Nimbus Drive command-line client",
    version,
    long_about = "Browse, upload and share files stored in Nimbus Drive.\nSettings and the session live in <config>/nimbus-drive/storage.json."
)]
struct Cli {
    /// Use another local storage file
    #[arg(long, global = true)]
    storage: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with email and password
    Login {
        email: String,
        /// Password (prompted on stdin when omitted)
        #[arg(long)]
        password: Option<String>,
    },
    /// Sign in with a Google ID token obtained elsewhere
    LoginGoogle { id_token: String },
    /// Sign out and forget the stored session
    Logout,
    /// Show the signed-in user and storage usage
    Whoami,
    /// List the current folder, or the top level of a view
    Ls {
        /// home, my-drive, shared-drives, shared-with-me, starred, spam or trash
        #[arg(long)]
        view: Option<String>,
        /// Only show names containing this text
        #[arg(long)]
        query: Option<String>,
        /// none, modified or size
        #[arg(long)]
        sort: Option<String>,
        #[arg(long, conflicts_with = "desc")]
        asc: bool,
        #[arg(long)]
        desc: bool,
    },
    /// Change the current folder (`..` goes up, `/` goes to the root)
    Cd { folder: Option<String> },
    /// Create a folder in the current folder
    Mkdir { name: String },
    /// Move an item to the trash
    Rm { item: String },
    /// Restore an item from the trash
    Restore { item: String },
    /// Star an item
    Star { item: String },
    /// Remove the star from an item
    Unstar { item: String },
    /// Upload files into the current folder
    Upload {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Target folder key (default: the current folder)
        #[arg(long)]
        to: Option<String>,
    },
    /// Download a file
    Download {
        item: String,
        /// Destination path (default: the file name in the working directory)
        dest: Option<PathBuf>,
    },
    /// Search files by name, or people with --people
    Search {
        query: String,
        #[arg(long)]
        people: bool,
    },
    /// Create a share link for an item
    Share {
        item: String,
        /// Recipient email or user id (repeatable)
        #[arg(long = "with")]
        recipients: Vec<String>,
        /// Anyone with the link can open it
        #[arg(long)]
        public: bool,
        /// Expiry timestamp (RFC 3339)
        #[arg(long)]
        expires: Option<String>,
    },
    /// Show what a share key points to
    SharedInfo { share_key: String },
    /// Change your profile
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
    /// Show or change client settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Update the display name, the email or both
    Set {
        #[arg(long, required_unless_present = "email")]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print every setting
    Show,
    /// Set a setting; an empty value clears it
    Set { key: String, value: String },
}

/// Local state; usable without reaching the backend
struct App {
    store: LocalStore,
    settings: ClientSettings,
    session: Arc<SessionStore>,
    notice_tx: NoticeSender,
    notices: NoticeReceiver,
}

impl App {
    fn open(storage: Option<PathBuf>) -> Self {
        let path = storage.unwrap_or_else(LocalStore::default_path);
        let store = LocalStore::open(&path);
        let settings = ClientSettings::load(&store);
        let session = Arc::new(SessionStore::open(&path));
        let (notice_tx, notices) = notice::channel();
        Self {
            store,
            settings,
            session,
            notice_tx,
            notices,
        }
    }

    /// Build the backend connection from the current settings
    fn connect(&self) -> Result<Remote> {
        let gateway = HttpGateway::from_settings(&self.settings, self.session.clone())
            .context("Check the server with `nimbus config show`")?;
        let gateway = Arc::new(gateway);
        let current_user = self.session.user().map(|u| u.id).unwrap_or_default();
        let manager = FileManager::new(
            gateway.clone(),
            ViewStateStore::new(),
            self.notice_tx.clone(),
            current_user,
        );
        Ok(Remote { gateway, manager })
    }

    fn require_session(&self) -> Result<()> {
        if !self.session.is_signed_in() {
            bail!("Not signed in. Run `nimbus login <email>` first.");
        }
        Ok(())
    }

    fn save_settings(&mut self) -> Result<()> {
        self.settings.store_into(&mut self.store);
        self.store.save()?;
        Ok(())
    }

    /// Print pending notices; false if any was an error
    fn flush_notices(&mut self) -> bool {
        let mut ok = true;
        while let Ok(notice) = self.notices.try_recv() {
            print_notice(&notice);
            ok &= !notice.is_error();
        }
        ok
    }
}

struct Remote {
    gateway: Arc<HttpGateway>,
    manager: FileManager,
}

impl Remote {
    /// Enter the folder `cd` last selected
    fn enter_current_folder(&mut self, settings: &ClientSettings) {
        if let Some(path) = settings.folder_path.as_deref() {
            for key in path.split('/').filter(|s| !s.is_empty()) {
                self.manager.open_folder(key);
            }
        }
    }

    /// Load the working set and look an item up by key or name
    async fn find(&mut self, item: &str) -> Result<FileRecord> {
        if let Err(e) = self.manager.refresh().await {
            hint_retry(&e);
            bail!("Could not look up '{}'", item);
        }
        self.manager
            .resolve(item)
            .cloned()
            .with_context(|| format!("No item named '{}' here", item))
    }
}

fn print_notice(notice: &Notice) {
    if notice.is_error() {
        eprintln!("Error: {}", notice.message);
    } else if !notice.message.is_empty() {
        println!("{}", notice.message);
    }
}

fn hint_retry(error: &GatewayError) {
    if error.is_recoverable() {
        eprintln!("This looks temporary; try again in a moment.");
    }
}

/// Print the notice for a call made outside the file manager
fn report(error: &GatewayError, fallback: &Fallback) {
    print_notice(&Notice::from_error(error, fallback));
    hint_retry(error);
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.2} {}", size, UNITS[unit])
    }
}

fn format_modified(record: &FileRecord) -> String {
    match record.modified {
        Some(_) => pipeline::parse_timestamp(record.modified.as_deref())
            .format("%Y-%m-%d %H:%M")
            .to_string(),
        None => "-".to_string(),
    }
}

fn print_list(items: &[&FileRecord]) {
    for record in items {
        let size = match record.size {
            Some(size) if !record.is_folder() => format_bytes(size),
            _ => "-".to_string(),
        };
        let star = if record.favorite { "*" } else { " " };
        println!(
            "{} {:<6} {:>10}  {:<16}  {}",
            star,
            record.kind.to_string(),
            size,
            format_modified(record),
            record.name
        );
    }
}

fn print_grid(items: &[&FileRecord]) {
    const COLUMNS: usize = 4;
    let names: Vec<String> = items
        .iter()
        .map(|r| if r.is_folder() { format!("{}/", r.name) } else { r.name.clone() })
        .collect();
    let width = names.iter().map(|n| n.chars().count()).max().unwrap_or(0) + 2;
    for row in names.chunks(COLUMNS) {
        let line: String = row.iter().map(|n| format!("{:<width$}", n, width = width)).collect();
        println!("{}", line.trim_end());
    }
}

fn render(items: &[&FileRecord], mode: ViewMode) {
    if items.is_empty() {
        println!("(empty)");
        return;
    }
    match mode {
        ViewMode::List => print_list(items),
        ViewMode::Grid => print_grid(items),
    }
}

fn create_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

fn read_password() -> Result<SecretString> {
    eprint!("Password: ");
    std::io::stderr().flush()?;
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(SecretString::from(line.trim_end_matches(['\r', '\n']).to_string()))
}

async fn run(cli: Cli) -> Result<bool> {
    let mut app = App::open(cli.storage);
    let result = execute(&mut app, cli.command).await;
    let notices_ok = app.flush_notices();
    Ok(result? && notices_ok)
}

async fn execute(app: &mut App, command: Commands) -> Result<bool> {
    match command {
        Commands::Logout => {
            app.session.logout()?;
            println!("Signed out");
        }
        Commands::Cd { folder } => change_folder(app, folder).await?,
        Commands::Config { action } => configure(app, action)?,
        command => {
            let mut remote = app.connect()?;
            return execute_remote(app, &mut remote, command).await;
        }
    }
    Ok(true)
}

async fn change_folder(app: &mut App, folder: Option<String>) -> Result<()> {
    let mut path: Vec<String> = app
        .settings
        .folder_path
        .as_deref()
        .unwrap_or_default()
        .split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    match folder.as_deref() {
        None | Some("/") => path.clear(),
        Some("..") => {
            path.pop();
        }
        Some(name) => {
            app.require_session()?;
            let mut remote = app.connect()?;
            remote.enter_current_folder(&app.settings);
            let record = remote.find(name).await?;
            if !record.is_folder() {
                bail!("'{}' is not a folder", record.name);
            }
            path.push(record.key);
        }
    }
    app.settings.folder_path = (!path.is_empty()).then(|| format!("/{}", path.join("/")));
    app.save_settings()?;
    println!("{}", app.settings.folder_path.as_deref().unwrap_or("/"));
    Ok(())
}

fn configure(app: &mut App, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let s = &app.settings;
            println!("{} = {}", KEY_CUSTOM_DOMAIN, s.custom_domain.as_deref().unwrap_or(""));
            println!(
                "{} = {}",
                KEY_CUSTOM_PORT,
                s.custom_port.map(|p| p.to_string()).unwrap_or_default()
            );
            println!("{} = {}", KEY_VIEW_MODE, s.view_mode);
            println!("{} = {}", KEY_FOLDER_PATH, s.folder_path.as_deref().unwrap_or(""));
            let secret = if s.payload_secret.is_some() { "(set)" } else { "" };
            println!("{} = {}", KEY_PAYLOAD_SECRET, secret);
            match s.api_base_url() {
                Ok(url) => println!("# api = {}", url),
                Err(e) => eprintln!("# api = invalid ({})", e),
            }
            println!("# file = {}", app.store.path().display());
        }
        ConfigAction::Set { key, value } => {
            // Rejected values never reach the store
            app.settings.set_field(&key, &value)?;
            app.save_settings()?;
            println!("Saved {}", key);
        }
    }
    Ok(())
}

async fn execute_remote(app: &mut App, remote: &mut Remote, command: Commands) -> Result<bool> {
    match command {
        Commands::Login { email, password } => {
            let password = match password {
                Some(p) => SecretString::from(p),
                None => read_password()?,
            };
            match remote.gateway.login_email(&email, &password).await {
                Ok(grant) => {
                    let user = app.session.sign_in(grant)?;
                    println!("Signed in as {} <{}>", user.name, user.email);
                }
                Err(e) => {
                    report(&e, &Fallback::LOGIN);
                    return Ok(false);
                }
            }
        }
        Commands::LoginGoogle { id_token } => match remote.gateway.login_google(&id_token).await {
            Ok(grant) => {
                let user = app.session.sign_in(grant)?;
                println!("Signed in as {} <{}>", user.name, user.email);
            }
            Err(e) => {
                report(&e, &Fallback::LOGIN);
                return Ok(false);
            }
        },
        Commands::Whoami => {
            app.require_session()?;
            if let Some(profile) = remote.manager.load_profile().await {
                let state = remote.manager.store().snapshot();
                println!("{} <{}>", profile.name, profile.email);
                println!(
                    "Storage: {} used of {} ({} free)",
                    format_bytes(state.quota_used()),
                    format_bytes(state.quota_total),
                    format_bytes(state.quota_free)
                );
                println!("Server: {}", remote.gateway.base_url());
            }
        }
        Commands::Profile { action: ProfileAction::Set { name, email } } => {
            app.require_session()?;
            remote.manager.update_profile(ProfileUpdate { name, email }).await;
        }
        Commands::Ls { view, query, sort, asc, desc } => {
            app.require_session()?;
            match view {
                Some(view) => remote.manager.navigate(view.parse()?),
                None => remote.enter_current_folder(&app.settings),
            }
            let manager = &mut remote.manager;
            if let Some(query) = query {
                manager.set_query(query);
            }
            if let Some(sort) = sort {
                let column: SortColumn = sort.parse()?;
                let direction = if asc {
                    SortDirection::Asc
                } else if desc {
                    SortDirection::Desc
                } else {
                    column.default_direction()
                };
                manager.set_sort(SortState::new(column, direction));
            }

            match manager.refresh().await {
                Ok(_) if manager.view() == ViewSelector::SharedWithMe
                    && manager.current_folder().is_none() =>
                {
                    let groups = manager.grouped(Utc::now());
                    for bucket in RecencyBucket::ALL {
                        let items = groups.bucket(bucket);
                        if !items.is_empty() {
                            println!("{}", bucket.label());
                            render(items, app.settings.view_mode);
                        }
                    }
                    if groups.is_empty() {
                        println!("(empty)");
                    }
                }
                Ok(_) => render(&manager.visible(), app.settings.view_mode),
                Err(e) => hint_retry(&e),
            }
        }
        Commands::Mkdir { name } => {
            app.require_session()?;
            remote.enter_current_folder(&app.settings);
            remote.manager.create_folder(&name).await;
        }
        Commands::Rm { item } => {
            app.require_session()?;
            remote.enter_current_folder(&app.settings);
            let record = remote.find(&item).await?;
            remote.manager.delete(&record.key).await;
        }
        Commands::Restore { item } => {
            app.require_session()?;
            remote.manager.navigate(ViewSelector::Trash);
            let record = remote.find(&item).await?;
            remote.manager.restore(&record.key).await;
        }
        Commands::Star { item } => {
            app.require_session()?;
            remote.enter_current_folder(&app.settings);
            let record = remote.find(&item).await?;
            remote.manager.set_favorite(&record.key, true).await;
        }
        Commands::Unstar { item } => {
            app.require_session()?;
            remote.enter_current_folder(&app.settings);
            let record = remote.find(&item).await?;
            remote.manager.set_favorite(&record.key, false).await;
        }
        Commands::Upload { files, to } => {
            app.require_session()?;
            if let Some(target) = to.or_else(|| app.settings.upload_target()) {
                remote.manager.open_folder(target);
            }
            let files = files
                .into_iter()
                .map(UploadFile::from_path)
                .collect::<Result<Vec<_>, _>>()?;

            let spinner = create_spinner(&format!("Uploading {} file(s)...", files.len()));
            let notice = remote.manager.upload(files).await;
            spinner.finish_and_clear();
            if !notice.is_error() {
                tracing::info!("Upload finished");
            }
        }
        Commands::Download { item, dest } => {
            app.require_session()?;
            remote.enter_current_folder(&app.settings);
            let record = remote.find(&item).await?;
            if record.is_folder() {
                bail!("'{}' is a folder", record.name);
            }
            let dest = dest.unwrap_or_else(|| PathBuf::from(&record.name));
            let spinner = create_spinner(&format!("Downloading {}...", record.name));
            remote.manager.download(&record.key, &dest).await;
            spinner.finish_and_clear();
        }
        Commands::Search { query, people } => {
            app.require_session()?;
            if people {
                for person in remote.manager.search_people(&query).await {
                    println!("{:<24} {:<32} {}", person.name, person.email, person.id);
                }
            } else {
                let (mut search, mut events) =
                    SearchDebouncer::new(remote.gateway.clone(), Duration::ZERO);
                search.submit(&query);
                match events.recv().await {
                    Some(SearchEvent::Results { records, .. }) => {
                        let items: Vec<&FileRecord> = records.iter().collect();
                        render(&items, app.settings.view_mode);
                    }
                    Some(SearchEvent::Failed { message, .. }) => {
                        print_notice(&Notice::error(message));
                        return Ok(false);
                    }
                    Some(SearchEvent::Cleared) | None => {}
                }
            }
        }
        Commands::Share { item, recipients, public, expires } => {
            app.require_session()?;
            remote.enter_current_folder(&app.settings);
            let record = remote.find(&item).await?;

            let mut ids = Vec::with_capacity(recipients.len());
            for recipient in recipients {
                let found = remote.manager.search_people(&recipient).await;
                let id = found
                    .iter()
                    .find(|p| p.email.eq_ignore_ascii_case(&recipient) || p.id == recipient)
                    .map(|p| p.id.clone())
                    .unwrap_or(recipient);
                ids.push(id);
            }

            let request = ShareRequest {
                key: record.key,
                restricted: !public,
                recipients: ids,
                expires_at: expires,
            };
            remote.manager.share(request).await;
        }
        Commands::SharedInfo { share_key } => {
            match remote.gateway.fetch_shared_link_info(&share_key).await {
                Ok(item) => println!("{} {} ({})", item.kind, item.name, item.key),
                Err(e) => {
                    report(&e, &Fallback::OPEN);
                    return Ok(false);
                }
            }
        }
        // Served by `execute` without a connection
        Commands::Logout | Commands::Cd { .. } | Commands::Config { .. } => {}
    }

    Ok(true)
}

#[tokio::main]
async fn main() -> ExitCode {
    nimbus_drive::init_logging();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
