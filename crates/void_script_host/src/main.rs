//! Void Script Host
//!
//! Spawns one host object per `[[scripts]]` entry in `void_script.toml`,
//! attaches the named script to it and ticks everything at a fixed rate.
//! Editing a script source rebuilds and swaps it in place.
//!
//! Run with: cargo run -p void_script_host
//!       or: cargo run --bin void-script-host -- --frames 600 --config game/void_script.toml

mod runner;

use runner::ScriptRunner;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use void_hotscript::ScriptConfig;

/// Command line options
#[derive(Debug, Default, PartialEq)]
struct Args {
    /// Stop after this many ticks
    frames: Option<u64>,
    /// Explicit config file, skipping the search paths
    config: Option<PathBuf>,
}

impl Args {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self, String> {
        let mut parsed = Self::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--frames" => {
                    let value = args.next().ok_or("--frames needs a value")?;
                    let frames = value
                        .parse()
                        .map_err(|_| format!("invalid frame count '{}'", value))?;
                    parsed.frames = Some(frames);
                }
                "--config" => {
                    let value = args.next().ok_or("--config needs a path")?;
                    parsed.config = Some(PathBuf::from(value));
                }
                other => return Err(format!("unknown argument '{}'", other)),
            }
        }
        Ok(parsed)
    }
}

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")
    ).init();

    let args = match Args::parse(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{}", e);
            eprintln!("usage: void-script-host [--frames N] [--config PATH]");
            std::process::exit(2);
        }
    };

    let config = match &args.config {
        Some(path) => match ScriptConfig::load_from_file(path) {
            Ok(mut config) => {
                config.apply_env();
                config
            }
            Err(e) => {
                log::error!("{}", e);
                std::process::exit(1);
            }
        },
        None => ScriptConfig::load(),
    };
    config.print_summary();

    if config.scripts.is_empty() {
        log::warn!("No scripts configured; add [[scripts]] entries to void_script.toml");
        return;
    }

    // Install signal handler for graceful shutdown
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        log::info!("Received Ctrl+C, shutting down...");
        r.store(false, Ordering::SeqCst);
    }) {
        log::warn!("Failed to set Ctrl+C handler: {}", e);
    }

    let mut runner = ScriptRunner::new(&config);
    runner.run(&running, args.frames);

    // Runs on_destroy for every live script and closes its module
    drop(runner);
    log::info!("Script host stopped");
}
