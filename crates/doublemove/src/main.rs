//! Double Movement host entry point.
//!
//! Wires the infrastructure adapters into one [`Orchestrator`] and runs the
//! host event loop on the Tokio runtime.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ single_instance::acquire()   -- hand off to a running host, or hold the lock
//!  └─ Orchestrator::new(ports)     -- settings file, service, tray, hotkey, capture
//!  └─ event sources ──▶ host channel ──▶ event loop (owns the orchestrator)
//!       ├─ console (stdin)          UI commands, tray clicks, raw keys, failures
//!       ├─ KeyRouter                hotkey presses / capture keys
//!       ├─ ServiceErrorSink         native service failures
//!       ├─ InstanceLock::serve      second launches
//!       └─ Ctrl-C                   shutdown
//! ```
//!
//! # Usage
//!
//! ```text
//! doublemove [OPTIONS]
//!
//! Options:
//!   --config-dir <DIR>       Directory holding settings.toml [default: platform config dir]
//!   --log-level <FILTER>     Log filter when RUST_LOG is unset [default: info]
//!   --instance-port <PORT>   Loopback port for the single-instance lock [default: 47615]
//!   --memory-store           Keep settings in memory only
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use doublemove::application::observer_sync::UiEvent;
use doublemove::application::orchestrator::{
    host_channel, Flow, HostEvent, HostEventSender, HostPorts, Orchestrator,
};
use doublemove::application::settings_store::SettingsRepository;
use doublemove::infrastructure::desktop::{LogNotifier, LogTray, LogWindow};
use doublemove::infrastructure::hotkey::SharedHotkeyTable;
use doublemove::infrastructure::input_capture::{GatedKeyListener, KeyRouter};
use doublemove::infrastructure::native_service::{FailureInjector, SimulatedService};
use doublemove::infrastructure::single_instance::{self, InstanceRole, DEFAULT_INSTANCE_PORT};
use doublemove::infrastructure::storage::memory::MemorySettings;
use doublemove::infrastructure::storage::settings_file::TomlSettingsFile;
use doublemove::infrastructure::ui_bridge::console::{self, ConsoleCommand, HELP};
use doublemove::infrastructure::ui_bridge::{ChannelSubscriber, UiRequest};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Double Movement host.
///
/// Keeps the remapping service, tray, toggle hotkey and settings window in
/// sync with the persisted settings.
#[derive(Debug, Parser)]
#[command(
    name = "doublemove",
    about = "Settings and service host for Double Movement",
    version
)]
struct Cli {
    /// Directory holding `settings.toml`.
    #[arg(long, env = "DOUBLEMOVE_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    /// Log filter used when `RUST_LOG` is not set (e.g. `debug`, `doublemove=trace`).
    #[arg(long, default_value = "info", env = "DOUBLEMOVE_LOG")]
    log_level: String,

    /// Loopback TCP port used to detect an already running host.
    #[arg(long, default_value_t = DEFAULT_INSTANCE_PORT, env = "DOUBLEMOVE_INSTANCE_PORT")]
    instance_port: u16,

    /// Keep settings in memory; nothing is written to disk.
    #[arg(long)]
    memory_store: bool,
}

impl Cli {
    fn settings_repository(&self) -> anyhow::Result<Box<dyn SettingsRepository>> {
        if self.memory_store {
            info!("settings kept in memory only");
            return Ok(Box::new(MemorySettings::new()));
        }
        let file = match &self.config_dir {
            Some(dir) => TomlSettingsFile::open_in(dir),
            None => TomlSettingsFile::open_default()
                .context("cannot locate the settings directory; pass --config-dir")?,
        };
        info!(path = %file.path().display(), "settings file");
        Ok(Box::new(file))
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // `RUST_LOG` wins over `--log-level`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "Double Movement host starting");

    let lock = match single_instance::acquire(cli.instance_port)
        .await
        .context("single-instance check failed")?
    {
        InstanceRole::Primary(lock) => lock,
        InstanceRole::Secondary => {
            info!("Double Movement is already running; exiting");
            return Ok(());
        }
    };

    // ── Wiring ────────────────────────────────────────────────────────────────
    let (events, mut inbox) = host_channel();

    let hotkeys = SharedHotkeyTable::new();
    let key_listener = GatedKeyListener::new();
    let router = key_listener.router(hotkeys.clone());
    let service = SimulatedService::new();
    let injector = service.injector();

    let ports = HostPorts {
        repository: cli.settings_repository()?,
        service: Box::new(service),
        tray: Box::new(LogTray::new()),
        hotkeys: Box::new(hotkeys),
        key_listener: Box::new(key_listener),
        notifier: Box::new(LogNotifier),
        window: Box::new(LogWindow::new()),
    };
    let mut orchestrator = Orchestrator::new(ports, events.clone());

    // Settings window events print only while the window is shown.
    let (subscriber, ui_events) = ChannelSubscriber::new();
    orchestrator.attach_window_ui(Box::new(subscriber));
    tokio::spawn(print_ui_events(ui_events));

    // ── Event sources ─────────────────────────────────────────────────────────
    let _instance_server = lock.serve(events.clone());
    tokio::spawn(run_console(events.clone(), router, injector));

    let shutdown_tx = events.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            let _ = shutdown_tx.send(HostEvent::Shutdown);
        }
    });

    // ── Event loop ────────────────────────────────────────────────────────────
    orchestrator.start();
    orchestrator.show_window();
    info!("Double Movement host ready.  Type `help` for commands, Ctrl-C to exit.");

    while let Some(event) = inbox.recv().await {
        if orchestrator.handle_event(event) == Flow::Exit {
            break;
        }
    }

    orchestrator.shutdown();
    info!("Double Movement host stopped");
    Ok(())
}

// ── Console ───────────────────────────────────────────────────────────────────

async fn run_console(events: HostEventSender, router: KeyRouter, injector: FailureInjector) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                debug!("stdin closed; console disabled");
                return;
            }
            Err(e) => {
                warn!("console read failed: {e}");
                return;
            }
        };

        let command = match console::parse_line(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                eprintln!("{e}");
                continue;
            }
        };

        let event = match command {
            ConsoleCommand::Ui(command) => {
                let (request, reply) = UiRequest::new(command);
                if events.send(HostEvent::Ui(request)).is_err() {
                    return;
                }
                match reply.await {
                    Ok(result) => match serde_json::to_string(&result) {
                        Ok(text) => println!("{text}"),
                        Err(e) => warn!("cannot encode command result: {e}"),
                    },
                    Err(_) => return,
                }
                continue;
            }
            ConsoleCommand::Tray(action) => HostEvent::Tray(action),
            ConsoleCommand::Hotkey => HostEvent::HotkeyPressed,
            ConsoleCommand::Key(key) => match router.route(key) {
                Some(event) => event,
                None => continue,
            },
            ConsoleCommand::InjectFailure(message) => {
                injector.fail_running(message);
                continue;
            }
            ConsoleCommand::FailNextStart(message) => {
                injector.fail_next_start(message);
                info!("the next service start will fail");
                continue;
            }
            ConsoleCommand::Help => {
                println!("{HELP}");
                continue;
            }
            ConsoleCommand::Quit => HostEvent::Shutdown,
        };

        if events.send(event).is_err() {
            return;
        }
    }
}

async fn print_ui_events(mut ui_events: tokio::sync::mpsc::UnboundedReceiver<UiEvent>) {
    while let Some(event) = ui_events.recv().await {
        match event {
            UiEvent::SettingChanged { name, value } => println!("store_changed {name} {value}"),
            UiEvent::CaptureChanged { recording, display } => {
                let state = if recording { "recording" } else { "idle" };
                println!("capture {state} {display}");
            }
        }
    }
}
