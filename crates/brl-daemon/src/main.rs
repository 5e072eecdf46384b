//! `brld` – braille display daemon entry point.
//!
//! Loads the configuration, builds one driver registry per class, and runs
//! the control loop on a blocking task until Ctrl-C.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ Cli::parse()               -- --config, --braille-driver, --braille-device, --verify
//!  └─ load_config()              -- TOML or defaults, then CLI overrides
//!  └─ --verify? open the display once, report, exit
//!  └─ braille/speech/screen registries
//!  └─ ControlLoop::run()         -- spawn_blocking, polls every poll_interval
//!       ├─ DriverSupervisor<BrailleKind>  (retry alarms, restart on loss)
//!       ├─ DriverSupervisor<SpeechKind>
//!       └─ DriverSupervisor<ScreenKind>
//! ```

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use brl_daemon::application::activation::{verify, ActivationPlan};
use brl_daemon::application::control::ControlLoop;
use brl_daemon::application::supervisor::DriverSupervisor;
use brl_daemon::infrastructure::drivers::{braille_registry, screen_registry, speech_registry};
use brl_daemon::infrastructure::storage::config::{self, AppConfig, ConfigError};

/// Braille display daemon for Alva displays.
///
/// Options given here override the configuration file for this run only.
#[derive(Debug, Parser)]
#[command(name = "brld", about = "Braille display daemon for Alva displays", version)]
struct Cli {
    /// Configuration file.  Defaults to the platform config directory.
    #[arg(long, short = 'f', env = "BRLD_CONFIG")]
    config: Option<PathBuf>,

    /// Braille driver codes to try, comma-separated (`al`, or `auto`).
    #[arg(long, short = 'b', value_delimiter = ',')]
    braille_driver: Vec<String>,

    /// Braille devices to try, comma-separated (`usb:`, `serial:/dev/ttyS0`).
    #[arg(long, short = 'd', value_delimiter = ',')]
    braille_device: Vec<String>,

    /// Open the braille display once, report what was found, and exit.
    ///
    /// Needs exactly one explicit driver and one device.
    #[arg(long, short = 'v')]
    verify: bool,
}

impl Cli {
    /// Replaces the configured braille drivers/devices with those given on
    /// the command line.
    fn apply_overrides(&self, cfg: &mut AppConfig) {
        if !self.braille_driver.is_empty() {
            cfg.braille.drivers = self.braille_driver.clone();
        }
        if !self.braille_device.is_empty() {
            cfg.braille.devices = self.braille_device.clone();
        }
    }

    fn load_config(&self) -> Result<AppConfig, ConfigError> {
        match &self.config {
            Some(path) => config::load_config_from(path),
            None => config::load_config(),
        }
    }
}

fn braille_plan(cfg: &AppConfig) -> ActivationPlan {
    ActivationPlan::with_devices(cfg.braille.drivers.clone(), cfg.braille.devices.clone())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let (mut cfg, cfg_error) = match cli.load_config() {
        Ok(cfg) => (cfg, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };
    cli.apply_overrides(&mut cfg);

    // Level from the config file unless overridden by `RUST_LOG`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.daemon.log_level)),
        )
        .init();

    if let Some(e) = cfg_error {
        warn!("using default configuration: {e}");
    }

    if cli.verify {
        let registry = braille_registry(cfg.braille.transport_options());
        let verified = verify(&registry, &braille_plan(&cfg)).context("braille display verification failed")?;
        info!(
            "braille driver {} verified on {}",
            verified.code,
            verified.device.as_deref().unwrap_or("the default device")
        );
        return Ok(());
    }

    info!("brld starting");
    if cli.config.is_none() {
        write_default_config(&cfg);
    }

    let braille = DriverSupervisor::new(
        braille_registry(cfg.braille.transport_options()),
        braille_plan(&cfg),
        cfg.braille.retry_interval(),
    );
    let speech = DriverSupervisor::new(
        speech_registry(),
        ActivationPlan::without_device(cfg.speech.drivers.clone()),
        cfg.speech.retry_interval(),
    );
    let screen = DriverSupervisor::new(
        screen_registry(),
        ActivationPlan::without_device(cfg.screen.drivers.clone()),
        cfg.screen.retry_interval(),
    );
    let mut control = ControlLoop::new(braille, speech, screen, cfg.braille.firmness(), cfg.daemon.poll_interval());

    // Shutdown flag shared with the control loop.
    let running = Arc::new(AtomicBool::new(true));

    // ── Ctrl-C handler ────────────────────────────────────────────────────────
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            running_clone.store(false, Ordering::Relaxed);
        }
    });

    info!("brld ready.  Press Ctrl-C to exit.");

    let loop_running = Arc::clone(&running);
    tokio::task::spawn_blocking(move || control.run(&loop_running))
        .await
        .context("control loop panicked")?;

    info!("brld stopped");
    Ok(())
}

/// Writes the defaults on first run so users have a file to edit.
fn write_default_config(cfg: &AppConfig) {
    let Ok(path) = config::config_file_path() else {
        return;
    };
    if path.exists() {
        return;
    }
    match config::save_config_to(cfg, &path) {
        Ok(()) => info!("default configuration written to {}", path.display()),
        Err(e) => warn!("could not write default configuration: {e}"),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
