//! Operational helpers: logging, event capture, slow-start hinting.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use scry_types::{config::OpsConfig, events::SystemEvent, Result, ScryError};
use tokio::sync::Mutex;
use tracing_subscriber::{fmt, EnvFilter};

pub fn init_tracing(config: &OpsConfig) -> Result<()> {
    let filter = EnvFilter::try_new(config.log_level.clone())
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|err| ScryError::Ops(format!("failed to create log filter: {err}")))?;

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|err| ScryError::Ops(format!("tracing init error: {err}")))?;
    Ok(())
}

/// In-memory, append-only log of every event the pipeline publishes.
#[derive(Clone, Default)]
pub struct EventStore {
    events: Arc<Mutex<Vec<SystemEvent>>>,
}

impl EventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record_event(&self, event: SystemEvent) {
        self.events.lock().await.push(event);
    }

    pub async fn snapshot_events(&self) -> Vec<SystemEvent> {
        self.events.lock().await.clone()
    }
}

/// Timed gate for the backend cold-start affordance.
///
/// Armed when loading starts; fires only if loading is still in progress
/// once the delay has elapsed, so fast responses never flash the hint.
#[derive(Debug)]
pub struct SlowHint {
    delay: Duration,
    armed_at: Option<Instant>,
}

impl SlowHint {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            armed_at: None,
        }
    }

    /// Start the deadline unless one is already running.
    pub fn arm(&mut self, now: Instant) {
        if self.armed_at.is_none() {
            self.armed_at = Some(now);
        }
    }

    /// Loading finished; the hint must not fire.
    pub fn disarm(&mut self) {
        self.armed_at = None;
    }

    pub fn triggered(&self, now: Instant) -> bool {
        self.armed_at
            .map(|armed| now.duration_since(armed) >= self.delay)
            .unwrap_or(false)
    }
}
