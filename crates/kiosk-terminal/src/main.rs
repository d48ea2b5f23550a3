//! Kiosk terminal entry point.
//!
//! Wires the configured input backend to the hot-key table and the cash
//! recognizer, then runs until Ctrl-C or the close-program hot key.  Ctrl-C
//! exits with status 0; the close key exits with status 1.
//!
//! # Usage
//!
//! ```text
//! kiosk-terminal [OPTIONS]
//!
//! Options:
//!   --config <PATH>            Config file [default: $XDG_CONFIG_HOME/kiosk-terminal/config.toml]
//!   --debug                    Log at debug level unless RUST_LOG is set
//!   --display-server <KIND>    x11 or wayland [env: KIOSK_DISPLAY_SERVER]
//!   --keycode-offset <N>       Hook top-row correction [env: TEAMVIEWER_KEYCODE_OFFSET]
//! ```
//!
//! # Startup order
//!
//! ```text
//! main()
//!  └─ load config, init logging
//!  └─ keyboard lock (Alt+F4), session NumLock
//!  └─ Dispatcher + input backend
//!  └─ register hot keys, register denominations
//!  └─ start_listening()
//!  └─ wait for Ctrl-C or close request, then stop()
//!  └─ exit 0 on Ctrl-C, 1 on close request
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::runtime::Handle;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use kiosk_core::SessionKind;
use kiosk_terminal::application::cash::{CashRecognizer, NoteCallback};
use kiosk_terminal::application::dispatch::Dispatcher;
use kiosk_terminal::application::hotkeys::{default_bindings, register_hotkeys, ActionExecutor};
use kiosk_terminal::application::session::SessionController;
use kiosk_terminal::infrastructure::accounting::HttpDepositClient;
use kiosk_terminal::infrastructure::browser::{BrowserSink, DevToolsBrowser, LoggingBrowser};
use kiosk_terminal::infrastructure::input_capture::{new_input_handler, BackendSettings, DisplayServer};
use kiosk_terminal::infrastructure::os_command::{platform_command, OsCommand};
use kiosk_terminal::infrastructure::storage::config::{load_config, KioskConfig};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Kiosk terminal input service.
///
/// Captures the keyboard, the custom buttons and the bill acceptor, and
/// turns their key presses into browser events and cash deposits.
#[derive(Debug, Parser)]
#[command(
    name = "kiosk-terminal",
    about = "Keyboard, button and bill-acceptor input service for kiosk terminals",
    version
)]
struct Cli {
    /// Path of the TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log at debug level.  `RUST_LOG` still wins when set.
    #[arg(long)]
    debug: bool,

    /// Force the input backend: `x11` (global hook) or `wayland` (raw
    /// devices).  Detected from the session when absent.
    #[arg(long, env = "KIOSK_DISPLAY_SERVER")]
    display_server: Option<DisplayServer>,

    /// Correction for top-row key codes shifted by a remote-desktop session.
    #[arg(long, env = "TEAMVIEWER_KEYCODE_OFFSET", allow_negative_numbers = true)]
    keycode_offset: Option<i32>,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref()).context("failed to load configuration")?;
    init_logging(cli.debug, &config.kiosk.log_level);

    info!("kiosk terminal starting");

    let table = config
        .denomination_table()
        .context("invalid [[denominations]] in configuration")?;

    // ── OS state ──────────────────────────────────────────────────────────────
    let os: Arc<dyn OsCommand> = Arc::from(platform_command());
    if config.kiosk.lock_keyboard_on_start {
        if let Err(e) = os.set_keyboard_lock(true) {
            warn!("startup keyboard lock failed: {e}");
        }
    }
    let session_kind = config
        .terminal
        .session
        .as_deref()
        .map_or(SessionKind::Unknown, SessionKind::from_session_id);
    SessionController::new(Arc::clone(&os)).apply_startup(session_kind);

    // ── Input backend ─────────────────────────────────────────────────────────
    let display = resolve_display_server(&cli, &config)?;
    let settings = BackendSettings {
        keycode_offset: cli.keycode_offset.or(config.input.keycode_offset),
    };

    let runtime = Handle::current();
    let dispatcher = Arc::new(Dispatcher::new(runtime.clone()));
    let backend = new_input_handler(display, settings, dispatcher)
        .with_context(|| format!("failed to create {display} input backend"))?;

    // ── Subscribers ───────────────────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let executor = Arc::new(ActionExecutor::new(
        browser_sink(&config),
        Arc::clone(&os),
        runtime.clone(),
        Arc::clone(&shutdown),
    ));
    register_hotkeys(backend.as_ref(), &default_bindings(), Arc::clone(&executor));
    CashRecognizer::new(table, deposit_callback(&config, runtime)).register(backend.as_ref());

    backend
        .start_listening()
        .context("failed to start input capture")?;

    // ── Ctrl-C / SIGTERM handler ──────────────────────────────────────────────
    let interrupted = Arc::new(AtomicBool::new(false));
    let interrupted_clone = Arc::clone(&interrupted);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            interrupted_clone.store(true, Ordering::SeqCst);
        }
    });

    let display_server = &display;
    info!(display = %display_server, "kiosk terminal ready");

    while !interrupted.load(Ordering::SeqCst) && !shutdown.load(Ordering::SeqCst) {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    backend.stop();
    let status = executor.exit_status();
    info!(status, "kiosk terminal stopped");
    Ok(ExitCode::from(status))
}

/// `RUST_LOG` wins, then `--debug`, then the configured level.
fn init_logging(debug: bool, config_level: &str) {
    let fallback = if debug { "debug" } else { config_level };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)))
        .init();
}

/// CLI flag (or its env var), then the config file, then detection.
fn resolve_display_server(cli: &Cli, config: &KioskConfig) -> anyhow::Result<DisplayServer> {
    if let Some(display) = cli.display_server {
        return Ok(display);
    }
    match config.input.display_server.as_deref() {
        Some(raw) => raw
            .parse()
            .map_err(anyhow::Error::msg)
            .context("invalid [input] display_server"),
        None => Ok(DisplayServer::detect()),
    }
}

fn browser_sink(config: &KioskConfig) -> Arc<dyn BrowserSink> {
    match &config.browser.devtools_url {
        Some(url) => {
            info!(%url, "browser events go to DevTools page");
            Arc::new(DevToolsBrowser::new(url.clone()))
        }
        None => {
            warn!("no [browser] devtools_url configured; browser events are only logged");
            Arc::new(LoggingBrowser)
        }
    }
}

/// Posts each accepted note to the backend on the runtime, without waiting.
fn deposit_callback(config: &KioskConfig, runtime: Handle) -> NoteCallback {
    let terminal = &config.terminal;
    match HttpDepositClient::new(&terminal.base_url, &terminal.deposit_path, terminal.id.clone()) {
        Ok(client) => {
            info!(endpoint = client.endpoint(), "deposit submission enabled");
            let client = Arc::new(client);
            Arc::new(move |amount: u32| {
                let client = Arc::clone(&client);
                drop(runtime.spawn(async move {
                    if let Err(e) = client.submit(amount).await {
                        error!(amount, "deposit submission failed: {e}");
                    }
                }));
            })
        }
        Err(e) => {
            warn!("deposit submission disabled: {e}");
            Arc::new(|amount: u32| warn!(amount, "note accepted but not submitted"))
        }
    }
}
