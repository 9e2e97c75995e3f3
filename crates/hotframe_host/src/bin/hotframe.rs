//! # Hotframe
//!
//! Headless host. Loads the client module, runs frames at the configured
//! rate and hot-reloads new builds dropped into the source directory.
//!
//! ```bash
//! # Run with defaults (./libclient.so, builds picked up from ./client_build)
//! hotframe
//!
//! # 600 frames, no hot-reload, verbose
//! hotframe --frames 600 --no-hot-reload --log-level debug
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use std::time::Instant;

use clap::Parser;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use hotframe_host::{CommandLog, Host, HostConfig, HostError, NativeBinder};

/// Command line arguments.
#[derive(Debug, Parser)]
#[command(name = "hotframe", version, about = "Hot-reloading host for client modules")]
struct Args {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Stop after this many frames.
    #[arg(short, long)]
    frames: Option<u64>,

    /// Load the base build only and never poll for new ones.
    #[arg(long)]
    no_hot_reload: bool,

    /// Log filter, e.g. `info` or `hotframe_host=debug`. `RUST_LOG` wins when set.
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn load_config(args: &Args) -> Result<HostConfig, HostError> {
    let mut config = match &args.config {
        Some(path) => HostConfig::load(path)?,
        None => HostConfig::default(),
    };
    if args.no_hot_reload {
        config.module.hot_reload = false;
    }
    if let Some(frames) = args.frames {
        config.frame.max_frames = Some(frames);
    }
    Ok(config)
}

fn run(args: &Args) -> Result<(), HostError> {
    let config = load_config(args)?;
    let frame_time = config.frame.frame_time();
    let max_frames = config.frame.max_frames;

    let mut host = Host::start(config, NativeBinder, CommandLog::new())?;

    loop {
        let started = Instant::now();
        let stats = host.run_frame();
        let drawn = host.renderer_mut().drain().len();

        if let Some(iteration) = stats.reloaded {
            info!(iteration, frame = stats.frame, "running new module build");
        }
        debug!(
            frame = stats.frame,
            records = stats.records_drawn,
            dropped = stats.dropped_records,
            decode_errors = stats.decode_errors,
            render_ops = drawn,
            "frame done"
        );

        if max_frames.is_some_and(|max| stats.frame >= max) {
            break;
        }

        if let Some(rest) = frame_time.checked_sub(started.elapsed()) {
            thread::sleep(rest);
        }
    }

    host.shutdown();
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args.log_level);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
