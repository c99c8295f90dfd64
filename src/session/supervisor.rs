//! Session supervision.
//!
//! A [`Session`] owns one logical long-lived connection: it opens transports
//! through its [`Connector`], wires a fresh heartbeat monitor to each one,
//! and drives reconnection with backoff when the link dies.
//!
//! # Task Model
//!
//! `start()` spawns a single session task running the
//! connect → monitor → backoff loop. Exactly one monitor is live per session
//! at any time, so connection state never needs a lock. `stop()` reaches the
//! task through a command channel and fences stragglers with an epoch bump:
//! any wakeup captured before the stop observes a stale epoch and becomes a
//! no-op.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, info};

use crate::config::{BackoffPolicy, HeartbeatConfig};
use crate::error::Result;
use crate::heartbeat::{Connection, HeartbeatMonitor, MonitorExit};
use crate::hooks::{Hooks, LivenessEvent, LivenessHook};
use crate::reconnect::RetryTimer;
use crate::transport::{Connector, Transport};

use super::status::SessionStatus;

// ============================================================================
// SessionCommand
// ============================================================================

/// Commands delivered to the session task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SessionCommand {
    /// Graceful shutdown: close the current connection, cancel any pending
    /// backoff wait, end the task.
    Stop,
}

// ============================================================================
// EpochGuard
// ============================================================================

/// Tags a session task with the epoch it was spawned under.
///
/// `stop()` and `start()` bump the shared counter, so any wakeup captured
/// before the bump (a timer, a completed connect) observes a stale epoch
/// and is discarded instead of touching state it no longer owns.
#[derive(Clone)]
pub(crate) struct EpochGuard {
    counter: Arc<AtomicU64>,
    epoch: u64,
}

impl EpochGuard {
    pub(crate) fn new(counter: Arc<AtomicU64>, epoch: u64) -> Self {
        Self { counter, epoch }
    }

    /// Returns `true` while this guard's epoch is still the live one.
    #[inline]
    pub(crate) fn is_current(&self) -> bool {
        self.counter.load(Ordering::Acquire) == self.epoch
    }

    fn epoch(&self) -> u64 {
        self.epoch
    }
}

// ============================================================================
// Shared
// ============================================================================

/// State shared between the [`Session`] handle and its task.
struct Shared<C: Connector> {
    /// Opens fresh transports.
    connector: C,

    /// Heartbeat timing.
    heartbeat: HeartbeatConfig,

    /// Reconnect delay policy.
    backoff: BackoffPolicy,

    /// Observability hook dispatcher.
    hooks: Hooks,

    /// Publishes the current status to watchers.
    status_tx: watch::Sender<SessionStatus>,

    /// Live epoch. Bumped by every `start()` and `stop()`.
    epoch: Arc<AtomicU64>,

    /// Handle to the running task, if any.
    runtime: Mutex<RuntimeState>,
}

/// Per-run task handles.
#[derive(Default)]
struct RuntimeState {
    command_tx: Option<mpsc::UnboundedSender<SessionCommand>>,
    task: Option<JoinHandle<()>>,
}

impl<C: Connector> Shared<C> {
    /// Publishes a status unconditionally.
    fn set_status(&self, status: SessionStatus) {
        let _ = self.status_tx.send(status);
    }

    /// Publishes a status only while `epoch` is still live.
    ///
    /// Returns `false` when the epoch moved on, in which case the caller
    /// must back out without further side effects.
    fn set_status_for(&self, epoch: u64, status: SessionStatus) -> bool {
        if self.epoch.load(Ordering::Acquire) != epoch {
            return false;
        }
        let _ = self.status_tx.send(status);
        true
    }
}

// ============================================================================
// SessionBuilder
// ============================================================================

/// Builder for a [`Session`].
///
/// Use [`Session::builder`] to create one.
///
/// # Example
///
/// ```no_run
/// use linkpulse::{BackoffPolicy, HeartbeatConfig, Session, WsConnector};
///
/// # fn example() -> linkpulse::Result<()> {
/// let session = Session::builder(WsConnector::new("ws://127.0.0.1:9000/live")?)
///     .heartbeat(HeartbeatConfig::default())
///     .backoff(BackoffPolicy::default())
///     .hook(|event| tracing::debug!(?event, "liveness"))
///     .build()?;
/// session.start();
/// # Ok(())
/// # }
/// ```
pub struct SessionBuilder<C> {
    connector: C,
    heartbeat: HeartbeatConfig,
    backoff: BackoffPolicy,
    hook: Option<LivenessHook>,
}

impl<C: Connector> SessionBuilder<C> {
    fn new(connector: C) -> Self {
        Self {
            connector,
            heartbeat: HeartbeatConfig::default(),
            backoff: BackoffPolicy::default(),
            hook: None,
        }
    }

    /// Sets the heartbeat timing configuration.
    #[inline]
    #[must_use]
    pub fn heartbeat(mut self, config: HeartbeatConfig) -> Self {
        self.heartbeat = config;
        self
    }

    /// Sets the reconnect backoff policy.
    #[inline]
    #[must_use]
    pub fn backoff(mut self, policy: BackoffPolicy) -> Self {
        self.backoff = policy;
        self
    }

    /// Installs the observability hook.
    ///
    /// The hook runs inline on the session task and must not block.
    #[must_use]
    pub fn hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(LivenessEvent) + Send + Sync + 'static,
    {
        self.hook = Some(Box::new(hook));
        self
    }

    /// Builds the session with validation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if the heartbeat or
    /// backoff configuration is out of range. Invalid values are rejected,
    /// never clamped.
    pub fn build(self) -> Result<Session<C>> {
        self.heartbeat.validate()?;
        self.backoff.validate()?;

        let (status_tx, status_rx) = watch::channel(SessionStatus::Stopped);

        let shared = Arc::new(Shared {
            connector: self.connector,
            heartbeat: self.heartbeat,
            backoff: self.backoff,
            hooks: Hooks::new(self.hook),
            status_tx,
            epoch: Arc::new(AtomicU64::new(0)),
            runtime: Mutex::new(RuntimeState::default()),
        });

        Ok(Session { shared, status_rx })
    }
}

// ============================================================================
// Session
// ============================================================================

/// Supervises one logical long-lived connection.
///
/// Independent sessions share nothing; run one per remote peer.
pub struct Session<C: Connector> {
    shared: Arc<Shared<C>>,
    status_rx: watch::Receiver<SessionStatus>,
}

impl<C: Connector> std::fmt::Debug for Session<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").finish_non_exhaustive()
    }
}

impl<C: Connector> Session<C> {
    /// Creates a builder around the given connector.
    pub fn builder(connector: C) -> SessionBuilder<C> {
        SessionBuilder::new(connector)
    }

    /// Starts the session. Idempotent: a running session is left alone.
    ///
    /// Returns immediately; the first connect attempt proceeds on the
    /// session task with status [`SessionStatus::Connecting`]. Await
    /// [`status_watch`](Self::status_watch) to observe the outcome.
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) {
        let mut runtime = self.shared.runtime.lock();
        if runtime.command_tx.is_some() {
            debug!("session already started");
            return;
        }

        let epoch = self.shared.epoch.fetch_add(1, Ordering::AcqRel) + 1;
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        runtime.command_tx = Some(command_tx);
        self.shared.set_status(SessionStatus::Connecting);

        let shared = Arc::clone(&self.shared);
        runtime.task = Some(tokio::spawn(session_loop(shared, command_rx, epoch)));

        debug!(epoch, "session started");
    }

    /// Stops the session. Idempotent: a stopped session stays stopped.
    ///
    /// Bumps the epoch (so wakeups captured before this call are no-ops),
    /// cancels any in-flight connect or backoff wait, gracefully closes the
    /// current connection, and waits for the session task to finish. No
    /// reconnection occurs afterwards until [`start`](Self::start) is called
    /// again.
    pub async fn stop(&self) {
        let (command_tx, task) = {
            let mut runtime = self.shared.runtime.lock();
            (runtime.command_tx.take(), runtime.task.take())
        };

        let Some(command_tx) = command_tx else {
            debug!("session already stopped");
            return;
        };

        // Fence first: anything the task wakes up on from here on is stale.
        self.shared.epoch.fetch_add(1, Ordering::AcqRel);
        let _ = command_tx.send(SessionCommand::Stop);

        if let Some(task) = task {
            let _ = task.await;
        }

        // A concurrent start() may already own the status again.
        if self.shared.runtime.lock().command_tx.is_some() {
            return;
        }

        self.shared.set_status(SessionStatus::Stopped);
        self.shared.hooks.emit(LivenessEvent::Stopped);
        debug!("session stopped");
    }

    /// Returns the current status.
    #[inline]
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        *self.status_rx.borrow()
    }

    /// Returns a watcher that yields every status change.
    #[inline]
    #[must_use]
    pub fn status_watch(&self) -> watch::Receiver<SessionStatus> {
        self.status_rx.clone()
    }

    /// Returns `true` while a connection is live.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.status().is_connected()
    }
}

// ============================================================================
// Session task
// ============================================================================

/// The connect → monitor → backoff loop.
async fn session_loop<C: Connector>(
    shared: Arc<Shared<C>>,
    mut commands: mpsc::UnboundedReceiver<SessionCommand>,
    epoch: u64,
) {
    let guard = EpochGuard::new(Arc::clone(&shared.epoch), epoch);
    let mut retry = RetryTimer::new(shared.backoff);

    loop {
        // Open a transport, cancellable the instant stop() arrives.
        let outcome = tokio::select! {
            biased;
            _ = commands.recv() => return,
            outcome = shared.connector.connect() => outcome,
        };

        match outcome {
            Ok(mut transport) => {
                if !guard.is_current() {
                    transport.close().await;
                    return;
                }
                if !shared.set_status_for(guard.epoch(), SessionStatus::Connected) {
                    transport.close().await;
                    return;
                }

                retry.reset();
                let connection = Connection::new();
                let id = connection.id();

                info!(connection = %id, "transport connected");
                shared.hooks.emit(LivenessEvent::Connected { connection: id });

                let monitor =
                    HeartbeatMonitor::new(transport, connection, shared.heartbeat, guard.clone());
                match monitor.run(&mut commands, &shared.hooks).await {
                    MonitorExit::Stopped => return,
                    MonitorExit::Dead(reason) => {
                        debug!(connection = %id, %reason, "connection lost")
                    }
                }
            }
            Err(error) => {
                // Immediate open failure backs off exactly like a death.
                debug!(%error, "connect attempt failed");
            }
        }

        if !guard.is_current() {
            return;
        }

        // Wait out the backoff delay, cancellable the instant stop() arrives.
        let attempt = retry.attempts();
        let delay = retry.next_delay();
        let next_retry_at = Instant::now() + delay;

        if !shared.set_status_for(
            guard.epoch(),
            SessionStatus::Reconnecting {
                attempt,
                next_retry_at,
            },
        ) {
            return;
        }
        shared
            .hooks
            .emit(LivenessEvent::ReconnectScheduled { attempt, delay });
        debug!(attempt, ?delay, "reconnect scheduled");

        tokio::select! {
            biased;
            _ = commands.recv() => return,
            _ = time::sleep_until(next_retry_at) => {}
        }

        if !shared.set_status_for(guard.epoch(), SessionStatus::Connecting) {
            return;
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
