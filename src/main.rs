use color_eyre::{eyre::eyre, Result};
use padsource::config::AppConfig;
use padsource::engine::{Engine, EngineSettings};
use padsource::events::{Notification, UiEvent};
use padsource::input::gilrs_backend::GilrsBackend;
use padsource::profile::{default_gamepad, Profile};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

const NOTIFICATION_CAPACITY: usize = 256;
const PROFILE_FILE: &str = "profile.toml";

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let config = AppConfig::load_or_default(&AppConfig::default_path());
    let profile = load_profile().await?;

    let backend = GilrsBackend::new().map_err(|e| eyre!("Failed to open input backend: {}", e))?;
    let (notification_tx, notification_rx) = mpsc::channel(NOTIFICATION_CAPACITY);
    let mut engine = Engine::create(
        Box::new(backend),
        &profile,
        config.clone(),
        EngineSettings::default(),
        notification_tx,
    )
    .map_err(|e| eyre!("Failed to create engine: {}", e))?
    .start();

    let shutdown = CancellationToken::new();
    let notifier = tokio::spawn(drain_notifications(notification_rx, shutdown.clone()));

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Ctrl-C received, shutting down"),
            Err(e) => warn!("Unable to listen for Ctrl-C: {}", e),
        }
        signal_token.cancel();
    });

    let mut poll = tokio::time::interval(Duration::from_millis(config.input_polling_interval_ms()));
    poll.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut refresh =
        tokio::time::interval(Duration::from_millis(config.device_refresh_interval_ms()));
    refresh.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(
        "Polling every {}ms, refreshing devices every {}ms",
        config.input_polling_interval_ms(),
        config.device_refresh_interval_ms()
    );
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = poll.tick() => {
                engine.tick(Instant::now());
            }
            _ = refresh.tick() => {
                if engine.refresh_devices() {
                    info!("Device set changed");
                }
            }
        }
    }

    drop(engine);
    notifier
        .await
        .map_err(|e| eyre!("Notification task failed: {}", e))?;
    info!("Stopped");
    Ok(())
}

/// Profile from the first argument, else the one next to the config file.
/// A missing default profile is created from the built-in gamepad layout.
async fn load_profile() -> Result<Profile> {
    if let Some(path) = std::env::args().nth(1).map(PathBuf::from) {
        return Profile::load(&path)
            .await
            .map_err(|e| eyre!("Failed to load profile {}: {}", path.display(), e));
    }

    let path = AppConfig::default_path().with_file_name(PROFILE_FILE);
    if tokio::fs::try_exists(&path).await.unwrap_or(false) {
        return Profile::load(&path)
            .await
            .map_err(|e| eyre!("Failed to load profile {}: {}", path.display(), e));
    }

    let profile = default_gamepad();
    if let Err(e) = profile.save(&path).await {
        warn!("Unable to write default profile to {}: {}", path.display(), e);
    } else {
        info!("Wrote default profile to {}", path.display());
    }
    Ok(profile)
}

async fn drain_notifications(mut rx: mpsc::Receiver<Notification>, shutdown: CancellationToken) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            notification = rx.recv() => match notification {
                Some(notification) => log_notification(&notification),
                None => break,
            },
        }
    }
    debug!("Notification task finished");
}

fn log_notification(notification: &Notification) {
    let at = notification.timestamp.format("%H:%M:%S%.3f");
    match &notification.event {
        UiEvent::StateChanged { source_id, state } => {
            info!("[{}] Source {} now in state {}", at, source_id, state)
        }
        UiEvent::Command { command, event } => {
            info!("[{}] {} ({:?} {:?})", at, command, event.key, event.reason)
        }
        UiEvent::DevicesChanged { device_ids } => {
            info!("[{}] Connected devices: {:?}", at, device_ids)
        }
        UiEvent::Input(event) => debug!("[{}] Input {:?} {:?}", at, event.key, event.reason),
    }
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    let level = std::env::var("RUST_LOG")
        .ok()
        .and_then(|value| value.parse::<Level>().ok())
        .unwrap_or(Level::INFO);
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
