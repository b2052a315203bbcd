use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use csvchat_core::{Config, Settings};
use tracing_subscriber::EnvFilter;

mod app;
mod handler;
mod tui;
mod ui;

use app::App;
use tui::EventHandler;

#[derive(Parser)]
#[command(name = "csvchat")]
#[command(about = "Chat with an AI backend about an uploaded CSV dataset")]
struct Cli {
    /// Base URL of the dataset backend API
    #[arg(long, env = "CSVCHAT_API_BASE_URL")]
    api_base_url: Option<String>,

    /// URL of the generated-graph viewer
    #[arg(long, env = "CSVCHAT_IFRAME_BASE_URL")]
    iframe_base_url: Option<String>,

    /// Write the resolved URLs to the user config file
    #[arg(long)]
    save_config: bool,

    /// Log file (defaults to the user cache directory)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env first so clap's env fallbacks can see it
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_logging(cli.log_file.clone())?;

    let file_config = Config::load().unwrap_or_else(|err| {
        tracing::warn!(error = %err, "ignoring unreadable config file");
        Config::new()
    });
    let settings = Settings::resolve(&file_config, cli.api_base_url, cli.iframe_base_url);
    tracing::info!(
        api_base_url = %settings.api_base_url,
        iframe_base_url = %settings.iframe_base_url,
        "settings resolved"
    );

    if cli.save_config {
        let path = settings.to_config().save()?;
        tracing::info!(path = %path.display(), "config saved");
    }

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let result = run(&mut terminal, App::new(settings)).await;
    tui::restore()?;

    if let Err(err) = &result {
        tracing::error!(error = %err, "exiting with error");
    }
    result
}

async fn run(terminal: &mut tui::Tui, mut app: App) -> Result<()> {
    let mut events = EventHandler::new();

    while !app.should_quit {
        terminal.draw(|frame| ui::render(&mut app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(&mut app, event).await?,
            None => break,
        }
    }

    Ok(())
}

fn init_logging(log_file: Option<PathBuf>) -> Result<()> {
    let path = match log_file {
        Some(path) => path,
        None => dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("csvchat")
            .join("csvchat.log"),
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Could not open log file {}", path.display()))?;

    // The terminal belongs to the UI, so logs only ever go to the file
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();

    Ok(())
}
