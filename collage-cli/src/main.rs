//! collage - Build a photo collage from the command line
//!
//! Headless driver for the collage screen: the photos given on the command
//! line are fed through a picker session, the composite is rendered and then
//! saved to the photo library directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use libcollage::library::directory::DirectoryLibrary;
use libcollage::logging::{LogFormat, LoggingConfig};
use libcollage::service::picker::ChannelPicker;
use libcollage::service::prompt::{Acknowledge, Alert, ModalId, ModalPresenter};
use libcollage::service::{CollageScreen, Collaborators, ScreenEvent, ERROR_TITLE};
use libcollage::{CollageError, Config, Photo, SaveErrorKind, MAX_PHOTOS};
use tracing::{debug, info, warn};

#[derive(Parser, Debug)]
#[command(name = "collage")]
#[command(version)]
#[command(about = "Build a photo collage and save it to the photo library")]
#[command(long_about = "\
collage - Build a photo collage and save it to the photo library

DESCRIPTION:
    Lays out between two and six photos on a grid and saves the result as a
    PNG in the library directory. A collage needs an even number of photos;
    photos beyond the limit of six are ignored.

USAGE:
    collage beach.jpg dunes.jpg
    collage --output-dir ./out a.png b.png c.png d.png
    collage --format json a.png b.png

CONFIGURATION:
    Configuration file: ~/.config/collage/config.toml (or COLLAGE_CONFIG)

    [preview]
    width = 600
    height = 400

    [session]
    settle_delay_ms = 2000

    [library]
    path = \"~/Pictures/collage\"

EXIT CODES:
    0 - Collage saved
    1 - Runtime error
    2 - The library returned no identifier for the collage
    3 - Invalid input
")]
struct Cli {
    /// Photos to put in the collage, in order
    #[arg(required = true, value_name = "PHOTO")]
    photos: Vec<PathBuf>,

    /// Configuration file (defaults to ~/.config/collage/config.toml)
    #[arg(short, long, env = "COLLAGE_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Directory to save the collage in (overrides config)
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Prints prompts to the terminal and acknowledges them straight away
struct TerminalPresenter {
    format: OutputFormat,
}

impl ModalPresenter for TerminalPresenter {
    fn present(&self, id: ModalId, alert: Alert, acknowledge: Acknowledge) {
        debug!(?id, title = %alert.title, "Prompt shown");
        if self.format == OutputFormat::Text {
            if alert.title == ERROR_TITLE {
                eprintln!("Error: {}", alert.message.as_deref().unwrap_or("unknown"));
            } else {
                println!("{}", alert.title);
            }
        }
        acknowledge.acknowledge();
    }

    fn dismiss(&self, id: ModalId) {
        debug!(?id, "Prompt dismissed");
    }
}

/// What happened to one run
enum Outcome {
    Saved { id: String, path: PathBuf, photos: usize },
    Failed { kind: SaveErrorKind, error: String },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let format = std::env::var("COLLAGE_LOG_FORMAT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(LogFormat::Text);
    let level = std::env::var("COLLAGE_LOG_LEVEL").unwrap_or_else(|_| "warn".to_string());
    LoggingConfig::new(format, level, cli.verbose).init();

    let output = cli.format;
    match run(cli).await {
        Ok(Outcome::Saved { id, path, photos }) => {
            if output == OutputFormat::Json {
                let report = serde_json::json!({
                    "status": "saved",
                    "id": id,
                    "path": path,
                    "photos": photos,
                });
                println!("{}", report);
            } else {
                println!("{}", path.display());
            }
        }
        Ok(Outcome::Failed { kind, error }) => {
            if output == OutputFormat::Json {
                let report = serde_json::json!({
                    "status": "error",
                    "kind": kind,
                    "error": error,
                });
                println!("{}", report);
            }
            std::process::exit(kind.exit_code());
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            let code = e
                .downcast_ref::<CollageError>()
                .map(CollageError::exit_code)
                .unwrap_or(1);
            std::process::exit(code);
        }
    }
}

async fn run(cli: Cli) -> Result<Outcome> {
    let config = match &cli.config {
        Some(path) => Config::load_from_path(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::load()?,
    };

    let photos = load_photos(&cli.photos)?;
    let root = cli
        .output_dir
        .clone()
        .unwrap_or_else(|| config.library.resolved_path());
    let library = DirectoryLibrary::new(&root);
    info!(library = %root.display(), photos = photos.len(), "Building collage");

    let picker = Arc::new(ChannelPicker::new());
    let screen = CollageScreen::from_config(
        &config,
        Collaborators::new(
            Arc::new(library.clone()),
            Arc::new(TerminalPresenter { format: cli.format }),
            picker.clone(),
        ),
    );
    let mut events = screen.subscribe();

    let session = screen
        .add()
        .ok_or_else(|| CollageError::InvalidInput("Picker could not be opened".to_string()))?;
    let handle = picker
        .handle()
        .ok_or_else(|| CollageError::InvalidInput("Picker could not be opened".to_string()))?;

    let total = photos.len();
    for photo in photos {
        // Refused once the selection is full and the session has ended
        handle.pick(photo);
    }
    handle.finish();

    let settled = session
        .settled()
        .await
        .ok_or_else(|| CollageError::InvalidInput("Picker session was cancelled".to_string()))?;
    let ignored = total.saturating_sub(settled.appended);
    if ignored > 0 {
        warn!(ignored, limit = MAX_PHOTOS, "Ignoring photos beyond the limit");
    }

    if !screen.outputs().state().save_enabled {
        return Err(CollageError::InvalidInput(format!(
            "A collage needs an even number of photos, got {}",
            settled.appended
        ))
        .into());
    }

    screen
        .preview_ready()
        .await
        .ok_or_else(|| CollageError::InvalidInput("Collage could not be rendered".to_string()))?;
    if !screen.save() {
        return Err(CollageError::InvalidInput("Collage could not be saved".to_string()).into());
    }

    let outcome = loop {
        match events.recv().await.context("Screen closed before saving")? {
            ScreenEvent::Saved { id } => {
                let path = library.path_for(&id);
                break Outcome::Saved {
                    id,
                    path,
                    photos: settled.appended,
                };
            }
            ScreenEvent::SaveFailed { kind, error } => break Outcome::Failed { kind, error },
            event => debug!(?event, "Screen event"),
        }
    };

    screen.teardown().await;
    Ok(outcome)
}

fn load_photos(paths: &[PathBuf]) -> Result<Vec<Photo>> {
    paths.iter().map(|path| load_photo(path)).collect()
}

fn load_photo(path: &Path) -> Result<Photo> {
    if !path.is_file() {
        return Err(CollageError::InvalidInput(format!("No such photo: {}", path.display())).into());
    }
    Photo::open(path).with_context(|| format!("Failed to read photo {}", path.display()))
}
