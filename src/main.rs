//! Entry point for **sklt**.
//!
//! Connects to Sway (if a socket is known), spawns the layout monitor and
//! the ticker on background threads and runs the status line on the main
//! thread.  Any fatal error is logged to stderr and ends the process with
//! status 1; the bar is expected to restart it.

use clap::error::ErrorKind;
use clap::Parser;
use log::{error, info, warn};
use sklt::config::{self, Config};
use sklt::interval::Interval;
use sklt::layout_names::LayoutNames;
use sklt::status::{StatusEvent, StatusLine, TimeFormat};
use sklt::sway::{self, monitor::LayoutMonitor};
use sklt::ticker::Ticker;
use sklt::traits::EventSource;
use std::path::{Path, PathBuf};
use std::sync::mpsc;

/// Swaybar status: the last changed keyboard layout and the time.
#[derive(Debug, Parser)]
#[command(name = "sklt", version)]
struct Cli {
    /// Time update interval: s|second, m|minute (default), h|hour,
    /// d|day (hourly updates, date-only format).  Case-insensitive.
    #[arg(short = 't', long, value_name = "INTERVAL")]
    interval: Option<Interval>,

    /// Time format, strftime style (e.g. "%Y-%m-%d %H:%M").
    #[arg(short = 'f', long, value_name = "FORMAT")]
    format: Option<String>,

    /// Sway IPC socket; defaults to $SWAYSOCK.
    #[arg(short = 's', long, value_name = "PATH")]
    socket: Option<PathBuf>,

    /// Tab-separated layout name translation file.  May be repeated.
    #[arg(short = 'l', long = "layout-names", value_name = "FILE")]
    layout_names: Vec<PathBuf>,

    /// Config file; defaults to $XDG_CONFIG_HOME/sklt/config.json.
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<PathBuf>,
}

impl Cli {
    fn into_config(self) -> Config {
        Config {
            interval: self.interval,
            format: self.format,
            socket: self.socket,
            layout_names: self.layout_names,
        }
    }
}

/// Exit status for a failed parse: help and version are not errors.
fn exit_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
        _ => 1,
    }
}

/// Parse arguments; help exits 0, any usage error exits 1.
fn parse_cli() -> Cli {
    match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Nowhere left to report a failed print; exit either way.
            let _ = e.print();
            std::process::exit(exit_code(e.kind()));
        }
    }
}

/// Load an explicit config file (fatal on failure), or the default one
/// if it exists.
fn load_config(explicit: Option<&Path>) -> Config {
    if let Some(path) = explicit {
        return match Config::load(path) {
            Ok(cfg) => cfg,
            Err(e) => fatal(format_args!("{}", e)),
        };
    }
    let path = config::default_path();
    match Config::load(&path) {
        Ok(cfg) => {
            info!("loaded config from {}", path.display());
            cfg
        }
        Err(e) => {
            info!("no config file ({}), using defaults", e);
            Config::default()
        }
    }
}

fn fatal(msg: std::fmt::Arguments<'_>) -> ! {
    error!("{}", msg);
    std::process::exit(1);
}

//  Main

fn main() {
    env_logger::init();

    let cli = parse_cli();
    let explicit = cli.config.clone();
    let config = load_config(explicit.as_deref()).merge(cli.into_config());

    let interval = config.interval.unwrap_or_default();
    let format = config
        .format
        .clone()
        .unwrap_or_else(|| interval.default_format().to_string());
    let format = TimeFormat::new(format).unwrap_or_else(|e| fatal(format_args!("{}", e)));
    let names = LayoutNames::load(config.layout_names.as_slice())
        .unwrap_or_else(|e| fatal(format_args!("{}", e)));
    if !names.is_empty() {
        info!("{} layout name mapping(s)", names.len());
    }

    let (tx, rx) = mpsc::sync_channel::<StatusEvent>(0);

    let with_layout = match sway::connect(config.socket.as_deref()) {
        Ok(conn) => {
            info!("connected to Sway");
            spawn_source("Sway IPC failure", LayoutMonitor::new(conn, names), tx.clone());
            true
        }
        Err(e) if e.is_not_configured() => {
            warn!("{}, showing time only", e);
            false
        }
        Err(e) => fatal(format_args!("failed to connect to Sway: {}", e)),
    };

    info!("updating every {} with format {:?}", interval, format.as_str());
    spawn_source("ticker failure", Ticker::new(interval.tick()), tx);

    let mut status = StatusLine::new(std::io::stdout(), format, with_layout);
    if let Err(e) = status.run(rx) {
        fatal(format_args!("failed to output status line: {}", e));
    }
}

//  Helpers

/// Run `source` on its own thread; any error it returns ends the process.
fn spawn_source<S>(what: &'static str, mut source: S, sink: mpsc::SyncSender<StatusEvent>)
where
    S: EventSource + 'static,
{
    std::thread::spawn(move || {
        if let Err(e) = source.run(sink) {
            fatal(format_args!("{}: {}", what, e));
        }
    });
}

//  Tests
