use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Result, anyhow};
use chatterm_core::{ChatSession, Config, FileSessionStore, MemoryStore, SessionStore};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod app;
mod handler;
mod tui;
mod ui;

use app::App;

#[derive(Parser)]
#[command(name = "chatterm")]
#[command(version, about = "Terminal chat client for a remote assistant endpoint")]
struct Cli {
    /// Base URL of the assistant API (overrides CHATTERM_API_BASE and the config file)
    #[arg(long)]
    api_base: Option<String>,

    /// Remember the resolved base URL in the config file
    #[arg(long)]
    save_api_base: bool,

    /// Keep the session identifier in memory only
    #[arg(long)]
    ephemeral: bool,

    /// Log file path (defaults to the user cache directory)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn init_logging(log_file: Option<PathBuf>) -> Result<PathBuf> {
    let path = match log_file {
        Some(path) => path,
        None => dirs::cache_dir()
            .ok_or_else(|| anyhow!("Could not determine cache directory"))?
            .join("chatterm")
            .join("chatterm.log"),
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    // The terminal belongs to the UI, so logs go to a file
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chatterm=info,chatterm_core=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false),
        )
        .init();

    Ok(path)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_path = init_logging(cli.log_file)?;
    tracing::info!(path = %log_path.display(), "chatterm starting");

    let mut config = Config::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Could not load config, using defaults");
        Config::new()
    });
    let api_base = config.resolve_api_base(cli.api_base.as_deref());

    match &api_base {
        Some(base) => {
            tracing::info!(api_base = %base, "Using assistant endpoint");
            if cli.save_api_base {
                config.api_base = Some(base.clone());
                config.save()?;
            }
        }
        None => tracing::warn!("No assistant endpoint configured"),
    }

    let store: Box<dyn SessionStore> = if cli.ephemeral {
        Box::new(MemoryStore::new())
    } else {
        Box::new(FileSessionStore::open_default()?)
    };

    let session = ChatSession::with_api_base(api_base.as_deref(), store);
    let mut app = App::new(session);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = tui::EventHandler::new();

    let result = run(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    tracing::info!("chatterm exiting");
    result
}

async fn run(terminal: &mut tui::Tui, app: &mut App, events: &mut tui::EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event).await?,
            None => break,
        }
    }
    Ok(())
}
