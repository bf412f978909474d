//! Polling engine with a statum lifecycle
//!
//! # State Machine
//!
//! ```text
//! Idle ──start()──► Running
//! ```
//!
//! `Idle` holds the sources built from a profile. `start()` enumerates the
//! devices they need, binds them, applies the configuration and enters
//! each source's initial state. `Running` is driven by the caller's
//! interval loop through [`Engine::tick`].
//!
//! Notifications leave the engine through a bounded channel. The engine
//! never blocks on it: a full channel drops the notification.

use crate::config::AppConfig;
use crate::error::EngineError;
use crate::events::{Notification, SourceEvent, UiEvent};
use crate::input::{DeviceBackend, InputManager};
use crate::profile::Profile;
use crate::source::{ActionListRef, BaseSource, StateManager, StateVector};
use chrono::{DateTime, Local};
use statum::{machine, state};
use std::collections::BTreeSet;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};

const STATS_INTERVAL: Duration = Duration::from_secs(10);

#[state]
#[derive(Debug, Clone)]
pub enum EngineState {
    Idle,    // Sources built, nothing bound
    Running, // Devices bound, ticking
}

#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Open every available device, not just the ones the profile needs
    pub add_all_devices: bool,
    pub stats_interval: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            add_all_devices: false,
            stats_interval: STATS_INTERVAL,
        }
    }
}

#[derive(Debug)]
struct TickStats {
    since: DateTime<Local>,
    last_report: Instant,
    ticks: u64,
    disconnected_ticks: u64,
    dropped: u64,
}

impl TickStats {
    fn new(now: Instant) -> Self {
        Self {
            since: Local::now(),
            last_report: now,
            ticks: 0,
            disconnected_ticks: 0,
            dropped: 0,
        }
    }
}

/// What sources and actions see of the engine
#[derive(Debug)]
pub struct EngineContext {
    now: Instant,
    notifications: mpsc::Sender<Notification>,
    ongoing: Vec<ActionListRef>,
    stats: TickStats,
}

impl EngineContext {
    fn new(notifications: mpsc::Sender<Notification>) -> Self {
        let now = Instant::now();
        Self {
            now,
            notifications,
            ongoing: Vec::new(),
            stats: TickStats::new(now),
        }
    }

    pub fn ongoing(&self) -> &[ActionListRef] {
        &self.ongoing
    }

    pub fn dropped_notifications(&self) -> u64 {
        self.stats.dropped
    }

    fn report_stats(&mut self, interval: Duration) {
        if self.now.duration_since(self.stats.last_report) < interval {
            return;
        }
        info!(
            "Since {}: {} ticks, {} with missing devices, {} dropped notifications, {} ongoing action lists",
            self.stats.since.format("%H:%M:%S"),
            self.stats.ticks,
            self.stats.disconnected_ticks,
            self.stats.dropped,
            self.ongoing.len()
        );
        self.stats = TickStats::new(self.now);
    }
}

impl StateManager for EngineContext {
    fn now(&self) -> Instant {
        self.now
    }

    fn submit_ui_event(&mut self, event: UiEvent) {
        match self.notifications.try_send(Notification::now(event)) {
            Ok(()) => {}
            Err(TrySendError::Full(notification)) => {
                self.stats.dropped += 1;
                warn!("Notification channel full, dropping {:?}", notification.event);
            }
            Err(TrySendError::Closed(_)) => {
                self.stats.dropped += 1;
                debug!("Notification channel closed");
            }
        }
    }

    fn add_ongoing_actions(&mut self, list: ActionListRef) {
        if !self.ongoing.contains(&list) {
            self.ongoing.push(list);
        }
    }

    fn perform(&mut self, command: &str, event: &SourceEvent) {
        debug!("Performing '{}' for {:?} {:?}", command, event.key, event.reason);
        self.submit_ui_event(UiEvent::Command {
            command: command.to_string(),
            event: *event,
        });
    }
}

#[machine]
#[derive(Debug)]
pub struct Engine<S: EngineState> {
    manager: InputManager,
    sources: Vec<BaseSource>,
    config: AppConfig,
    context: EngineContext,
    settings: EngineSettings,
}

impl<S: EngineState> Engine<S> {
    pub fn sources(&self) -> &[BaseSource] {
        &self.sources
    }

    pub fn source(&self, source_id: u8) -> Option<&BaseSource> {
        self.sources.iter().find(|source| source.id() == source_id)
    }

    pub fn context(&self) -> &EngineContext {
        &self.context
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    fn required_device_ids(&self) -> BTreeSet<u8> {
        self.sources
            .iter()
            .flat_map(|source| source.required_device_ids())
            .collect()
    }
}

impl Engine<Idle> {
    pub fn create(
        backend: Box<dyn DeviceBackend>,
        profile: &Profile,
        config: AppConfig,
        settings: EngineSettings,
        notifications: mpsc::Sender<Notification>,
    ) -> Result<Self, EngineError> {
        profile.validate()?;
        let sources = profile.build_sources();
        if sources.is_empty() {
            return Err(EngineError::InitializationError(format!(
                "profile '{}' declares no sources",
                profile.name
            )));
        }
        info!("Creating engine for profile '{}' with {} sources", profile.name, sources.len());

        Ok(Self::new(
            InputManager::new(backend),
            sources,
            config,
            EngineContext::new(notifications),
            settings,
        ))
    }

    /// Binds devices, applies config and enters the initial states
    pub fn start(mut self) -> Engine<Running> {
        let required = self.required_device_ids();
        debug!("Required devices: {:?}", required);
        self.manager
            .refresh_connected_device_list(&required, self.settings.add_all_devices);

        self.context.now = Instant::now();
        for source in self.sources.iter_mut() {
            if !self.manager.bind_profile(source) {
                warn!("Source {} is not fully bound", source.name());
            }
            source.apply_config(&self.config);
            let initial = source.initial_state();
            source.set_current_state(&initial, &mut self.context);
        }

        info!("Engine running");
        self.transition()
    }
}

impl Engine<Running> {
    /// Polls devices, raises and routes events, then advances ongoing
    /// action lists. False if any required device is missing.
    pub fn tick(&mut self, now: Instant) -> bool {
        self.context.now = now;
        let mut success = self.manager.update_state();
        for source in self.sources.iter_mut() {
            success &= source.update_state(&self.manager);
            source.raise_events(&mut self.context);
        }

        self.continue_ongoing();

        self.context.stats.ticks += 1;
        if !success {
            self.context.stats.disconnected_ticks += 1;
        }
        self.context.report_stats(self.settings.stats_interval);
        success
    }

    fn continue_ongoing(&mut self) {
        let ongoing = std::mem::take(&mut self.context.ongoing);
        let mut still_ongoing = Vec::with_capacity(ongoing.len());
        for list in ongoing {
            let Some(source) = self.sources.iter_mut().find(|s| s.id() == list.source_id) else {
                continue;
            };
            if source.continue_actions(&list, &mut self.context) {
                still_ongoing.push(list);
            }
        }

        // Lists started while continuing were registered meanwhile
        for list in std::mem::take(&mut self.context.ongoing) {
            if !still_ongoing.contains(&list) {
                still_ongoing.push(list);
            }
        }
        self.context.ongoing = still_ongoing;
    }

    /// Re-enumerates devices and rebinds every source if the set changed
    pub fn refresh_devices(&mut self) -> bool {
        let required = self.required_device_ids();
        if !self
            .manager
            .refresh_connected_device_list(&required, self.settings.add_all_devices)
        {
            return false;
        }

        for source in self.sources.iter_mut() {
            self.manager.bind_profile(source);
        }
        let device_ids = self.manager.device_ids().collect();
        self.context
            .submit_ui_event(UiEvent::DevicesChanged { device_ids });
        true
    }

    pub fn set_current_window(&mut self, process_name: &str, window_title: &str) {
        for source in self.sources.iter_mut() {
            source.set_current_window(process_name, window_title, &mut self.context);
        }
    }

    pub fn set_current_state(&mut self, source_id: u8, state: &StateVector) -> bool {
        match self.sources.iter_mut().find(|s| s.id() == source_id) {
            Some(source) => {
                source.set_current_state(state, &mut self.context);
                true
            }
            None => false,
        }
    }
}
