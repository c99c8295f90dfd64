//! Shared test doubles.
//!
//! A scriptable in-memory transport and connector, plus hook recorders.
//! Compiled for tests only.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::error::{Error, Result};
use crate::hooks::{LivenessEvent, LivenessHook};
use crate::protocol::ControlFrame;
use crate::transport::{Connector, Transport, TransportEvent};

// ============================================================================
// ScriptedTransport
// ============================================================================

/// In-memory transport driven by a [`TransportProbe`] from the test body.
pub(crate) struct ScriptedTransport {
    incoming: mpsc::UnboundedReceiver<TransportEvent>,
    sent: mpsc::UnboundedSender<ControlFrame>,
    closed: Arc<AtomicUsize>,
    fail_sends: Arc<AtomicBool>,
}

/// Test-side handle to a [`ScriptedTransport`].
pub(crate) struct TransportProbe {
    incoming: mpsc::UnboundedSender<TransportEvent>,
    sent: mpsc::UnboundedReceiver<ControlFrame>,
    closed: Arc<AtomicUsize>,
    fail_sends: Arc<AtomicBool>,
}

impl ScriptedTransport {
    /// Creates a transport and the probe controlling it.
    pub(crate) fn channel() -> (Self, TransportProbe) {
        let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();
        let (sent_tx, sent_rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicUsize::new(0));
        let fail_sends = Arc::new(AtomicBool::new(false));

        let transport = Self {
            incoming: incoming_rx,
            sent: sent_tx,
            closed: Arc::clone(&closed),
            fail_sends: Arc::clone(&fail_sends),
        };
        let probe = TransportProbe {
            incoming: incoming_tx,
            sent: sent_rx,
            closed,
            fail_sends,
        };
        (transport, probe)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&mut self, frame: ControlFrame) -> Result<()> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(Error::connection("scripted send failure"));
        }
        self.sent.send(frame).map_err(|_| Error::ConnectionClosed)
    }

    async fn recv(&mut self) -> TransportEvent {
        self.incoming.recv().await.unwrap_or(TransportEvent::Closed)
    }

    async fn close(&mut self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

impl TransportProbe {
    /// Delivers a control frame to the transport under test.
    pub(crate) fn push_frame(&self, frame: ControlFrame) {
        let _ = self.incoming.send(TransportEvent::Frame(frame));
    }

    /// Delivers a raw transport event.
    pub(crate) fn push_event(&self, event: TransportEvent) {
        let _ = self.incoming.send(event);
    }

    /// Awaits the next frame the transport was asked to send.
    pub(crate) async fn next_sent(&mut self) -> ControlFrame {
        self.sent.recv().await.expect("transport dropped")
    }

    /// How many times `close()` was called.
    pub(crate) fn close_count(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    /// Makes every subsequent `send()` fail.
    pub(crate) fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }
}

// ============================================================================
// ScriptedConnector
// ============================================================================

/// One scripted outcome for a connect attempt.
pub(crate) enum ConnectScript {
    /// Hand out this transport.
    Ok(ScriptedTransport),
    /// Fail immediately.
    Fail,
}

/// Connector that replays a fixed script of outcomes.
///
/// Once the script is exhausted, further attempts pend forever (still
/// cancellable by `stop()`).
pub(crate) struct ScriptedConnector {
    script: Mutex<VecDeque<ConnectScript>>,
    attempts: Arc<AtomicUsize>,
}

impl ScriptedConnector {
    pub(crate) fn new(script: Vec<ConnectScript>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            attempts: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared counter of connect attempts made so far.
    pub(crate) fn attempt_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.attempts)
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    type Transport = ScriptedTransport;

    async fn connect(&self) -> Result<ScriptedTransport> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().pop_front();
        match next {
            Some(ConnectScript::Ok(transport)) => Ok(transport),
            Some(ConnectScript::Fail) => Err(Error::connection("scripted connect failure")),
            None => std::future::pending().await,
        }
    }
}

// ============================================================================
// Tracing
// ============================================================================

/// Installs a test subscriber honoring `RUST_LOG`. Safe to call repeatedly.
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// Hook recorders
// ============================================================================

/// Hook that forwards every event into an unbounded channel.
pub(crate) fn recorder() -> (LivenessHook, mpsc::UnboundedReceiver<LivenessEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let hook: LivenessHook = Box::new(move |event| {
        let _ = tx.send(event);
    });
    (hook, rx)
}

/// Like [`recorder`], but stamps each event with the (virtual) arrival time.
pub(crate) fn stamped_recorder() -> (
    LivenessHook,
    mpsc::UnboundedReceiver<(Instant, LivenessEvent)>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    let hook: LivenessHook = Box::new(move |event| {
        let _ = tx.send((Instant::now(), event));
    });
    (hook, rx)
}
