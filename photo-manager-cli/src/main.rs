//! Command line entry point for the photo manager.
//!
//! Mirrors a local `<root>/<year>/<album>` photo folder to Google Drive
//! and optionally publishes the same photos as a Contentful photo
//! collection.

use anyhow::{bail, Context};
use bridge_desktop::{FileSecureStore, ReqwestHttpClient};
use chrono::Datelike;
use clap::Parser;
use core_auth::{AuthManager, ClientCredentials, ProviderKind};
use core_runtime::{
    init_logging, AppConfig, ContentfulSettings, DriveSettings, LoggingConfig,
};
use core_sync::{
    ContentfulDestination, Destination, DriveDestination, LocalAlbum, ProgressObserver,
    RunReport, SyncOrchestrator,
};
use provider_contentful::ContentfulConnector;
use provider_google_drive::DriveConnector;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "photo-manager",
    about = "Sync a local photo album to Google Drive and Contentful",
    version
)]
struct Args {
    /// Album folder name under <root>/<year>/
    album: String,

    /// Album year (defaults to the current year)
    #[arg(long)]
    year: Option<String>,

    /// Root of the local photo library
    #[arg(long)]
    root: Option<PathBuf>,

    /// Answer yes to all prompts and use default values
    #[arg(long, short = 'y')]
    yes: bool,

    /// Google OAuth client id
    #[arg(long, env = "GOOGLE_CLIENT_ID", hide_env_values = true)]
    google_client_id: Option<String>,

    /// Google OAuth client secret
    #[arg(long, env = "GOOGLE_CLIENT_SECRET", hide_env_values = true)]
    google_client_secret: Option<String>,

    /// Contentful space id
    #[arg(long, env = "CONTENTFUL_SPACE_ID")]
    contentful_space: Option<String>,

    /// Contentful management token
    #[arg(long, env = "CONTENTFUL_MANAGEMENT_TOKEN", hide_env_values = true)]
    contentful_token: Option<String>,

    /// Contentful environment
    #[arg(long, env = "CONTENTFUL_ENVIRONMENT", default_value = "master")]
    contentful_environment: String,

    /// Contentful locale for localized fields
    #[arg(long, env = "CONTENTFUL_LOCALE", default_value = "en-US")]
    contentful_locale: String,
}

/// Prints one status line per progress step.
struct ConsoleProgress;

impl ProgressObserver for ConsoleProgress {
    fn on_progress(&self, file_name: &str, percent: u8) {
        println!("  {} ... {}%", file_name, percent);
    }
}

fn default_root() -> PathBuf {
    dirs::picture_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("photo-manager")
}

/// Ask a yes/no question; an empty answer means yes.
fn confirm(question: &str, assume_yes: bool) -> bool {
    if assume_yes {
        return true;
    }
    print!("{} [Y/n] ", question);
    let _ = io::stdout().flush();

    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    let answer = answer.trim().to_lowercase();
    answer.is_empty() || answer == "y" || answer == "yes"
}

fn prompt_title(default: &str, assume_yes: bool) -> String {
    if assume_yes {
        return default.to_string();
    }
    print!("Collection title [{}]: ", default);
    let _ = io::stdout().flush();

    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return default.to_string();
    }
    let answer = answer.trim();
    if answer.is_empty() {
        default.to_string()
    } else {
        answer.to_string()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_logging(LoggingConfig::default()).context("failed to initialize logging")?;

    let year = args
        .year
        .clone()
        .unwrap_or_else(|| chrono::Utc::now().year().to_string());
    let root = args.root.clone().unwrap_or_else(default_root);

    // Validate the album before touching any credentials or network
    let album_dir = root.join(&year).join(&args.album);
    if !album_dir.is_dir() {
        bail!("album directory does not exist: {}", album_dir.display());
    }

    let http_client = Arc::new(ReqwestHttpClient::new());
    let secure_store = Arc::new(FileSecureStore::in_data_dir(&data_dir()));

    let drive_requested = args.google_client_id.is_some()
        && args.google_client_secret.is_some()
        && confirm("Upload to Google Drive?", args.yes);
    let contentful_requested = args.contentful_space.is_some()
        && args.contentful_token.is_some()
        && confirm("Publish to Contentful?", args.yes);

    if !drive_requested && !contentful_requested {
        bail!("no destination enabled: provide Google or Contentful credentials");
    }

    let mut builder = AppConfig::builder()
        .photo_root(root.clone())
        .http_client(http_client.clone())
        .secure_store(secure_store.clone());

    if drive_requested {
        builder = builder.drive(DriveSettings::new(
            args.google_client_id.clone().unwrap_or_default(),
            args.google_client_secret.clone().unwrap_or_default(),
        ));
    }
    if contentful_requested {
        builder = builder.contentful(
            ContentfulSettings::new(
                args.contentful_space.clone().unwrap_or_default(),
                args.contentful_token.clone().unwrap_or_default(),
            )
            .with_environment(args.contentful_environment.clone())
            .with_locale(args.contentful_locale.clone()),
        );
    }

    let config = builder.build().context("invalid configuration")?;

    println!("Scanning {} ...", album_dir.display());
    let album = LocalAlbum::scan(&root, &year, &args.album)
        .await
        .context("failed to scan album")?;
    println!("Found {} photo(s)", album.photos.len());
    info!(album = %args.album, year = %year, photos = album.photos.len(), "Album scanned");

    let mut destinations: Vec<Box<dyn Destination>> = Vec::new();

    if let Some(drive) = &config.drive {
        println!("Authorizing with Google Drive ...");
        let auth = AuthManager::new(
            secure_store.clone(),
            http_client.clone(),
            ClientCredentials {
                client_id: drive.client_id.clone(),
                client_secret: drive.client_secret.clone(),
            },
        );

        match auth.access_token(ProviderKind::GoogleDrive).await {
            Ok(token) => {
                let connector = DriveConnector::new(http_client.clone(), token)
                    .with_chunk_size(drive.chunk_size_bytes);
                destinations.push(Box::new(DriveDestination::new(
                    connector,
                    drive.root_folder_name.clone(),
                    year.clone(),
                    args.album.clone(),
                )));
            }
            Err(e) => {
                // One destination failing auth never aborts the run
                eprintln!("Google Drive authorization failed: {}", e);
            }
        }
    }

    if let Some(contentful) = &config.contentful {
        let title = prompt_title(&format!("{} {}", args.album, year), args.yes);
        let connector = ContentfulConnector::new(
            http_client.clone(),
            contentful.management_token.clone(),
            contentful.space_id.clone(),
            contentful.environment.clone(),
            contentful.locale.clone(),
            contentful.collection_content_type.clone(),
        );
        destinations.push(Box::new(ContentfulDestination::new(connector, title)));
    }

    if destinations.is_empty() {
        bail!("all destinations failed to initialize");
    }

    println!("Syncing album '{}' ({}) ...", args.album, year);
    let report = SyncOrchestrator::new(album, destinations)
        .run(&ConsoleProgress)
        .await;

    info!(
        run_id = %report.run_id,
        successes = report.successes(),
        failures = report.failures(),
        "Sync run finished"
    );
    print_report(&report);
    Ok(())
}

fn print_report(report: &RunReport) {
    println!();
    println!("Sync run {} finished", report.run_id);
    println!(
        "  {} photo(s), {} upload(s) succeeded, {} failed",
        report.photo_count,
        report.successes(),
        report.failures()
    );

    for outcome in report.outcomes.iter().filter(|o| !o.is_success()) {
        println!(
            "  FAILED {} -> {}: {}",
            outcome.file_name,
            outcome.destination,
            outcome.error.as_deref().unwrap_or("unknown")
        );
    }

    for (destination, reason) in &report.deactivated {
        println!("  DISABLED {}: {}", destination, reason);
    }

    if let Some(collection) = &report.collection_id {
        println!("  Collection entry created: {}", collection);
    }
}
