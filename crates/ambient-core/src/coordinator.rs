// ── Poll coordinator ──
//
// Owns one `AmbientClient` and turns its request/response calls into a
// stream of published snapshots. A refresh either publishes a complete new
// snapshot or leaves the previous one in place and reports why; readers
// never observe a partially-built cycle.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use ambient_api::{AmbientClient, Device};
use indexmap::IndexMap;
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::CoordinatorConfig;
use crate::error::CoreError;
use crate::snapshot::{DeviceState, Snapshot};
use crate::stream::SnapshotStream;

const EVENT_CHANNEL_SIZE: usize = 64;

// ── Observable state ─────────────────────────────────────────────

/// Whether a refresh cycle is currently running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    Idle,
    Refreshing,
}

/// Why a cycle failed, as far as the host needs to know.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// Credentials rejected; needs reconfiguration.
    Authentication,
    /// Backend unreachable or misbehaving; the next cycle retries.
    Transient,
}

/// Outcome notification broadcast after every cycle that actually ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateEvent {
    Updated { version: u64, devices: usize },
    Failed { reason: FailureReason, message: String },
}

/// Result of a [`Coordinator::refresh`] call that did not fail.
#[derive(Debug, Clone)]
pub enum RefreshOutcome {
    /// This call ran the cycle and published a new snapshot.
    Published(Arc<Snapshot>),
    /// Another cycle was already in flight; this trigger was folded into it.
    Coalesced,
}

// ── Coordinator ──────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<CoordinatorInner>`. At most one refresh runs
/// at a time; overlapping triggers (timer tick, manual request) are
/// coalesced into the one in flight.
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    config: CoordinatorConfig,
    client: AmbientClient,
    snapshot: watch::Sender<Arc<Snapshot>>,
    state: watch::Sender<CoordinatorState>,
    event_tx: broadcast::Sender<UpdateEvent>,
    in_flight: Mutex<()>,
    last_update_success: AtomicBool,
    background: Mutex<Option<BackgroundTask>>,
}

/// The periodic refresh task of one `start()`, with its own cancel token.
struct BackgroundTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl Coordinator {
    /// Wrap an existing client. Does not contact the backend; call
    /// [`start()`](Self::start) or [`setup()`](Self::setup).
    pub fn new(client: AmbientClient, config: CoordinatorConfig) -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Snapshot::default()));
        let (state, _) = watch::channel(CoordinatorState::Idle);
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_SIZE);

        Self {
            inner: Arc::new(CoordinatorInner {
                config,
                client,
                snapshot,
                state,
                event_tx,
                in_flight: Mutex::new(()),
                last_update_success: AtomicBool::new(false),
                background: Mutex::new(None),
            }),
        }
    }

    /// Build the HTTP client from `config` and wrap it.
    pub fn from_config(config: CoordinatorConfig) -> Result<Self, CoreError> {
        let client = AmbientClient::new(
            config.base_url.clone(),
            config.credentials.clone(),
            &config.transport(),
        )?;
        Ok(Self::new(client, config))
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.inner.config
    }

    /// The underlying API client, for one-off queries outside the poll
    /// cycle (events, realtime IAQ).
    pub fn client(&self) -> &AmbientClient {
        &self.inner.client
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Log in and run the first refresh.
    ///
    /// Rejected credentials are fatal ([`CoreError::AuthenticationFailed`]);
    /// anything else is reported as [`CoreError::SetupNotReady`] so the
    /// host can retry setup later.
    pub async fn setup(&self) -> Result<Arc<Snapshot>, CoreError> {
        if let Err(e) = self.inner.client.authenticate().await {
            return Err(setup_error(CoreError::from(e)));
        }
        debug!(email = self.inner.client.tokens().email(), "initial login succeeded");

        match self.refresh().await {
            Ok(RefreshOutcome::Published(snapshot)) => Ok(snapshot),
            Ok(RefreshOutcome::Coalesced) => Ok(self.snapshot()),
            Err(e) => Err(setup_error(e)),
        }
    }

    /// [`setup()`](Self::setup), then spawn the periodic refresh task.
    ///
    /// A zero `poll_interval` skips the background task. Starting again
    /// (also after [`shutdown()`](Self::shutdown)) replaces any running task.
    pub async fn start(&self) -> Result<Arc<Snapshot>, CoreError> {
        let snapshot = self.setup().await?;

        let interval = self.inner.config.poll_interval;
        if !interval.is_zero() {
            let cancel = CancellationToken::new();
            let handle = tokio::spawn(refresh_task(self.clone(), interval, cancel.clone()));
            let task = BackgroundTask { cancel, handle };
            if let Some(previous) = self.inner.background.lock().await.replace(task) {
                previous.cancel.cancel();
                previous.handle.abort();
            }
        }

        info!(
            devices = snapshot.len(),
            interval_secs = interval.as_secs(),
            "coordinator started"
        );
        Ok(snapshot)
    }

    /// Cancel the periodic task and wait for it to exit.
    pub async fn shutdown(&self) {
        let Some(task) = self.inner.background.lock().await.take() else {
            return;
        };
        task.cancel.cancel();
        match task.handle.await {
            Ok(()) => debug!("coordinator stopped"),
            Err(e) if e.is_panic() => error!(error = %e, "refresh task panicked"),
            Err(e) => debug!(error = %e, "refresh task aborted"),
        }
    }

    /// Whether a periodic refresh task is currently running.
    pub async fn is_running(&self) -> bool {
        self.inner
            .background
            .lock()
            .await
            .as_ref()
            .is_some_and(|task| !task.handle.is_finished())
    }

    // ── Refresh ──────────────────────────────────────────────────

    /// Run one refresh cycle, unless one is already in flight.
    ///
    /// On success the new snapshot is published and returned. On failure
    /// the previous snapshot stays visible, an [`UpdateEvent::Failed`] is
    /// broadcast, and the error is returned. Authentication failures also
    /// drop the stored session.
    pub async fn refresh(&self) -> Result<RefreshOutcome, CoreError> {
        let Ok(_guard) = self.inner.in_flight.try_lock() else {
            debug!("refresh already in flight, coalescing");
            return Ok(RefreshOutcome::Coalesced);
        };

        self.inner.state.send_replace(CoordinatorState::Refreshing);
        let timeout = self.inner.config.refresh_timeout;
        let result = match tokio::time::timeout(timeout, self.fetch_states()).await {
            Ok(Ok(states)) => Ok(self.publish(states)),
            Ok(Err(e)) => Err(self.record_failure(e).await),
            Err(_) => Err(self.record_failure(CoreError::Timeout {
                timeout_secs: timeout.as_secs(),
            })
            .await),
        };
        self.inner.state.send_replace(CoordinatorState::Idle);

        result.map(RefreshOutcome::Published)
    }

    /// List devices, then fetch each device's latest reading in turn.
    ///
    /// A failed reading fetch degrades that device to `reading: None`;
    /// an authentication failure aborts the whole cycle.
    async fn fetch_states(&self) -> Result<IndexMap<String, DeviceState>, CoreError> {
        let client = &self.inner.client;
        let devices: Vec<Device> = client.list_devices().await?;

        let mut states = IndexMap::with_capacity(devices.len());
        for device in devices {
            let reading = match client.get_latest_reading(&device.device_id).await {
                Ok(reading) => reading,
                Err(e) if e.is_auth_failure() => return Err(e.into()),
                Err(e) => {
                    warn!(device_id = %device.device_id, error = %e, "reading fetch failed");
                    None
                }
            };
            states.insert(device.device_id.clone(), DeviceState { device, reading });
        }
        Ok(states)
    }

    fn publish(&self, states: IndexMap<String, DeviceState>) -> Arc<Snapshot> {
        let version = self.inner.snapshot.borrow().version() + 1;
        let snapshot = Arc::new(Snapshot::new(version, states));
        self.inner.snapshot.send_replace(snapshot.clone());
        self.inner.last_update_success.store(true, Ordering::Release);

        let _ = self.inner.event_tx.send(UpdateEvent::Updated {
            version,
            devices: snapshot.len(),
        });
        debug!(version, devices = snapshot.len(), "snapshot published");
        snapshot
    }

    async fn record_failure(&self, err: CoreError) -> CoreError {
        let reason = if err.requires_reauth() {
            self.inner.client.tokens().invalidate().await;
            warn!(error = %err, "refresh rejected by backend, credentials need attention");
            FailureReason::Authentication
        } else {
            warn!(error = %err, "refresh failed, keeping previous snapshot");
            FailureReason::Transient
        };
        self.inner.last_update_success.store(false, Ordering::Release);

        let _ = self.inner.event_tx.send(UpdateEvent::Failed {
            reason,
            message: err.to_string(),
        });
        err
    }

    // ── Observation ──────────────────────────────────────────────

    /// The last successfully published snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.inner.snapshot.borrow().clone()
    }

    /// Subscribe to snapshot publications.
    pub fn subscribe(&self) -> SnapshotStream {
        SnapshotStream::new(self.inner.snapshot.subscribe())
    }

    /// Subscribe to per-cycle outcome notifications.
    pub fn updates(&self) -> broadcast::Receiver<UpdateEvent> {
        self.inner.event_tx.subscribe()
    }

    /// Subscribe to idle/refreshing transitions.
    pub fn state(&self) -> watch::Receiver<CoordinatorState> {
        self.inner.state.subscribe()
    }

    /// Whether the most recent cycle that ran succeeded.
    pub fn last_update_success(&self) -> bool {
        self.inner.last_update_success.load(Ordering::Acquire)
    }
}

fn setup_error(err: CoreError) -> CoreError {
    match err {
        CoreError::AuthenticationFailed { .. }
        | CoreError::Config { .. }
        | CoreError::SetupNotReady { .. } => err,
        other => CoreError::SetupNotReady {
            message: other.to_string(),
        },
    }
}

// ── Background task ──────────────────────────────────────────────

/// Periodically refresh. The first tick is consumed because `setup()`
/// already ran the initial cycle.
async fn refresh_task(coordinator: Coordinator, interval: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {
                // Failures are already logged and broadcast by `refresh`.
                let _ = coordinator.refresh().await;
            }
        }
    }
}
