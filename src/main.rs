//! usradmin binary entry point.
//!
//! Parses arguments, sets up file logging, initializes the terminal in raw
//! mode, runs the TUI event loop, and restores the terminal state on exit.
//!
use anyhow::{Context as _, Result};
use clap::Parser;
use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use usradmin::api::http::DEFAULT_ENDPOINT;
use usradmin::app::{self, Settings};

#[derive(Parser)]
#[command(name = "usradmin", about = "Terminal admin panel for user accounts")]
struct Args {
    #[arg(long, env = "USRADMIN_API_URL", default_value = DEFAULT_ENDPOINT)]
    api_url: String,

    #[arg(
        long,
        env = "USRADMIN_DEBOUNCE_MS",
        default_value_t = 300,
        help = "Quiet period before the search box re-filters"
    )]
    debounce_ms: u64,

    #[arg(long, default_value = ".", help = "Where logs_and_stats.csv is written")]
    export_dir: PathBuf,

    #[arg(long, help = "Log file (default: usradmin.log in the config dir)")]
    log_file: Option<PathBuf>,

    #[arg(long, help = "Directory holding theme.conf and keybinds.conf")]
    config_dir: Option<PathBuf>,
}

/// `$XDG_CONFIG_HOME/usradmin`, or the working directory when there is none.
fn resolve_config_dir(arg: Option<PathBuf>) -> PathBuf {
    let dir = arg
        .or_else(|| dirs::config_dir().map(|d| d.join("usradmin")))
        .unwrap_or_else(|| PathBuf::from("."));
    if let Err(e) = std::fs::create_dir_all(&dir) {
        eprintln!("cannot create config dir {}: {e}", dir.display());
    }
    dir
}

/// Logs go to a file: the terminal belongs to the TUI while it runs.
fn init_logging(path: &Path) -> Result<()> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open log file {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("usradmin=info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

/// Initialize a Crossterm-backed `ratatui` terminal in raw mode.
fn init_terminal() -> Result<Terminal<CrosstermBackend<std::io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

/// Program entry point: run the TUI and report any top-level error to stderr.
fn main() -> Result<()> {
    let args = Args::parse();
    let config_dir = resolve_config_dir(args.config_dir);
    let log_file = args
        .log_file
        .unwrap_or_else(|| config_dir.join("usradmin.log"));
    init_logging(&log_file)?;

    let settings = Settings {
        api_url: args.api_url,
        debounce: Duration::from_millis(args.debounce_ms),
        export_dir: args.export_dir,
        config_dir: Some(config_dir),
    };

    let mut terminal = init_terminal().context("init terminal")?;

    let res = app::run(&mut terminal, settings);

    disable_raw_mode().ok();
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )
    .ok();
    terminal.show_cursor().ok();

    if let Err(err) = res {
        tracing::error!(error = %err, "application error");
        eprintln!("application error: {err:#}");
    }
    Ok(())
}
