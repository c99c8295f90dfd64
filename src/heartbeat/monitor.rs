//! The heartbeat monitor task.
//!
//! One monitor runs per connection, as part of the session task. It owns the
//! transport and drives a single `select!` loop over four inputs:
//!
//! - The session command channel (stop requests; highest priority)
//! - The pong deadline, armed while a probe is outstanding
//! - The ping interval timer, armed while the link is idle
//! - Inbound transport events
//!
//! All state mutation happens between selects, so nothing here is reentrant
//! and nothing needs a lock. Timer handles are plain deadlines local to the
//! loop; they die with the monitor and can never outlive their connection.

// ============================================================================
// Imports
// ============================================================================

use rustc_hash::FxHashMap;
use tokio::sync::mpsc;
use tokio::time::{self, Instant};
use tracing::{debug, trace};

use crate::config::HeartbeatConfig;
use crate::hooks::{DeadReason, Hooks, LivenessEvent};
use crate::identifiers::Nonce;
use crate::protocol::ControlFrame;
use crate::session::{EpochGuard, SessionCommand};
use crate::transport::{Transport, TransportEvent};

use super::connection::{Connection, LinkState};

// ============================================================================
// MonitorExit
// ============================================================================

/// Why the monitor returned control to the session task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum MonitorExit {
    /// Graceful shutdown. No reconnection follows.
    Stopped,

    /// The connection died. The reconnect loop takes over.
    Dead(DeadReason),
}

// ============================================================================
// LoopEvent
// ============================================================================

/// The select arms, drained to a plain value so the handlers below can take
/// full `&mut self` without fighting the borrows held by pending futures.
enum LoopEvent {
    /// A session command arrived, or the channel closed.
    Command(Option<SessionCommand>),
    /// The ping interval elapsed while idle.
    PingDue,
    /// The pong deadline elapsed with the probe unanswered.
    PongDeadline,
    /// An inbound transport event.
    Transport(TransportEvent),
}

// ============================================================================
// HeartbeatMonitor
// ============================================================================

/// Drives the heartbeat cycle for exactly one connection.
pub(crate) struct HeartbeatMonitor<T: Transport> {
    /// The link under supervision. Owned exclusively.
    transport: T,

    /// Timing configuration.
    config: HeartbeatConfig,

    /// The connection record mutated by this monitor alone.
    connection: Connection,

    /// Probes awaiting a reply, by nonce. More than one entry exists only
    /// while re-probing with `max_missed_beats > 1`.
    outstanding: FxHashMap<Nonce, Instant>,

    /// Invalidates this monitor the instant the session epoch moves on.
    epoch: EpochGuard,
}

impl<T: Transport> HeartbeatMonitor<T> {
    /// Creates a monitor for a freshly connected transport.
    pub(crate) fn new(
        transport: T,
        connection: Connection,
        config: HeartbeatConfig,
        epoch: EpochGuard,
    ) -> Self {
        Self {
            transport,
            config,
            connection,
            outstanding: FxHashMap::default(),
            epoch,
        }
    }

    /// Runs the heartbeat cycle to completion.
    ///
    /// Returns when the session asks to stop, when the epoch goes stale, or
    /// when the connection is declared dead.
    pub(crate) async fn run(
        mut self,
        commands: &mut mpsc::UnboundedReceiver<SessionCommand>,
        hooks: &Hooks,
    ) -> MonitorExit {
        let mut ping_deadline = Instant::now() + self.config.ping_interval;
        let mut pong_deadline: Option<Instant> = None;

        loop {
            let awaiting = pong_deadline.is_some();

            let event = tokio::select! {
                biased;

                cmd = commands.recv() => LoopEvent::Command(cmd),

                _ = time::sleep_until(pong_deadline.unwrap_or(ping_deadline)), if awaiting => {
                    LoopEvent::PongDeadline
                }

                _ = time::sleep_until(ping_deadline), if !awaiting => LoopEvent::PingDue,

                ev = self.transport.recv() => LoopEvent::Transport(ev),
            };

            // A wakeup that raced a stop() is a no-op: the epoch moved on.
            if !self.epoch.is_current() {
                trace!(connection = %self.connection.id(), "stale epoch, discarding wakeup");
                self.transport.close().await;
                return MonitorExit::Stopped;
            }

            match event {
                LoopEvent::Command(Some(SessionCommand::Stop)) | LoopEvent::Command(None) => {
                    debug!(connection = %self.connection.id(), "graceful stop");
                    self.transport.close().await;
                    return MonitorExit::Stopped;
                }

                LoopEvent::PingDue => {
                    if let Err(error) = self.send_probe(hooks).await {
                        return self.die(DeadReason::SendFailed { message: error }, hooks).await;
                    }
                    self.transition(LinkState::AwaitingPong, hooks);
                    pong_deadline = Some(Instant::now() + self.config.pong_timeout);
                }

                LoopEvent::PongDeadline => {
                    let missed = self.connection.record_missed_beat();

                    if missed < self.config.max_missed_beats {
                        debug!(
                            connection = %self.connection.id(),
                            missed,
                            tolerated = self.config.max_missed_beats,
                            "missed beat, re-probing"
                        );
                        if let Err(error) = self.send_probe(hooks).await {
                            return self
                                .die(DeadReason::SendFailed { message: error }, hooks)
                                .await;
                        }
                        pong_deadline = Some(Instant::now() + self.config.pong_timeout);
                    } else {
                        return self
                            .die(DeadReason::PongTimeout { missed_beats: missed }, hooks)
                            .await;
                    }
                }

                LoopEvent::Transport(TransportEvent::Frame(ControlFrame::Ping { nonce })) => {
                    hooks.emit(LivenessEvent::RemotePing {
                        connection: self.connection.id(),
                    });
                    // Answer immediately; the remote probe cycle is
                    // independent of ours and changes no local state.
                    if let Err(error) = self.transport.send(ControlFrame::pong(nonce)).await {
                        return self
                            .die(
                                DeadReason::SendFailed {
                                    message: error.to_string(),
                                },
                                hooks,
                            )
                            .await;
                    }
                }

                LoopEvent::Transport(TransportEvent::Frame(ControlFrame::Pong { nonce })) => {
                    if self.accepts_pong(nonce) {
                        let now = Instant::now();
                        let rtt = self.attribute_rtt(nonce, now);

                        self.outstanding.clear();
                        self.connection.record_pong_received(now);
                        hooks.emit(LivenessEvent::PongReceived {
                            connection: self.connection.id(),
                            nonce,
                            rtt,
                        });

                        if self.connection.state() == LinkState::AwaitingPong {
                            self.transition(LinkState::Connected, hooks);
                        }
                        pong_deadline = None;
                        ping_deadline = now + self.config.ping_interval;
                    } else {
                        trace!(
                            connection = %self.connection.id(),
                            ?nonce,
                            "unsolicited pong, ignoring"
                        );
                    }
                }

                LoopEvent::Transport(TransportEvent::Malformed) => {
                    hooks.emit(LivenessEvent::MalformedFrame {
                        connection: self.connection.id(),
                    });
                }

                LoopEvent::Transport(TransportEvent::Closed) => {
                    // Remote closure: no further sends, not even a close
                    // handshake.
                    self.transition(LinkState::Dead, hooks);
                    hooks.emit(LivenessEvent::Dead {
                        connection: self.connection.id(),
                        reason: DeadReason::TransportClosed,
                    });
                    return MonitorExit::Dead(DeadReason::TransportClosed);
                }
            }
        }
    }

    /// Sends a PING with a fresh nonce and records it as outstanding.
    ///
    /// Returns the error message on send failure.
    async fn send_probe(&mut self, hooks: &Hooks) -> Result<(), String> {
        let nonce = Nonce::generate();

        self.transport
            .send(ControlFrame::ping(nonce))
            .await
            .map_err(|e| e.to_string())?;

        let now = Instant::now();
        self.connection.record_ping_sent(now);
        self.outstanding.insert(nonce, now);

        hooks.emit(LivenessEvent::PingSent {
            connection: self.connection.id(),
            nonce,
        });
        Ok(())
    }

    /// Whether a PONG with this nonce acknowledges an outstanding probe.
    ///
    /// A nonce-less PONG matches any outstanding probe; a carried nonce must
    /// match exactly.
    fn accepts_pong(&self, nonce: Option<Nonce>) -> bool {
        match nonce {
            Some(nonce) => self.outstanding.contains_key(&nonce),
            None => !self.outstanding.is_empty(),
        }
    }

    /// Round-trip time for an accepted PONG, when attributable.
    ///
    /// A nonce-less reply with several probes outstanding cannot be
    /// attributed to one of them, except when only a single probe is out.
    fn attribute_rtt(&self, nonce: Option<Nonce>, now: Instant) -> Option<std::time::Duration> {
        let sent_at = match nonce {
            Some(nonce) => self.outstanding.get(&nonce).copied(),
            None if self.outstanding.len() == 1 => self.outstanding.values().next().copied(),
            None => None,
        };
        sent_at.map(|sent| now.duration_since(sent))
    }

    /// Applies a state transition and surfaces it through the hook.
    fn transition(&mut self, new: LinkState, hooks: &Hooks) {
        let old = self.connection.transition(new);
        if old != new {
            debug!(connection = %self.connection.id(), %old, %new, "link state changed");
            hooks.emit(LivenessEvent::StateChanged {
                connection: self.connection.id(),
                old,
                new,
            });
        }
    }

    /// Declares the connection dead and closes the transport.
    async fn die(mut self, reason: DeadReason, hooks: &Hooks) -> MonitorExit {
        debug!(connection = %self.connection.id(), %reason, "connection dead");

        self.transition(LinkState::Dead, hooks);
        hooks.emit(LivenessEvent::Dead {
            connection: self.connection.id(),
            reason: reason.clone(),
        });
        self.transport.close().await;

        MonitorExit::Dead(reason)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    use crate::testing::{ScriptedTransport, TransportProbe, recorder};

    fn config(interval_ms: u64, timeout_ms: u64, beats: u32) -> HeartbeatConfig {
        HeartbeatConfig {
            ping_interval: Duration::from_millis(interval_ms),
            pong_timeout: Duration::from_millis(timeout_ms),
            max_missed_beats: beats,
        }
    }

    fn current_epoch() -> (Arc<AtomicU64>, EpochGuard) {
        let counter = Arc::new(AtomicU64::new(1));
        let guard = EpochGuard::new(Arc::clone(&counter), 1);
        (counter, guard)
    }

    fn spawn_monitor(
        config: HeartbeatConfig,
        guard: EpochGuard,
    ) -> (
        TransportProbe,
        mpsc::UnboundedSender<SessionCommand>,
        tokio::task::JoinHandle<(MonitorExit, Vec<LivenessEvent>)>,
    ) {
        let (transport, probe) = ScriptedTransport::channel();
        let (command_tx, mut command_rx) = mpsc::unbounded_channel();
        let (hook, mut events) = recorder();

        let monitor = HeartbeatMonitor::new(transport, Connection::new(), config, guard);
        let task = tokio::spawn(async move {
            let hooks = Hooks::new(Some(hook));
            let exit = monitor.run(&mut command_rx, &hooks).await;

            let mut seen = Vec::new();
            while let Ok(event) = events.try_recv() {
                seen.push(event);
            }
            (exit, seen)
        });

        (probe, command_tx, task)
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_answered_keeps_link_alive() {
        let (_counter, guard) = current_epoch();
        let (mut probe, command_tx, task) = spawn_monitor(config(100, 20, 1), guard);

        for _ in 0..10 {
            let ping = probe.next_sent().await;
            assert!(ping.is_ping());
            probe.push_frame(ControlFrame::pong(ping.nonce()));
        }

        command_tx.send(SessionCommand::Stop).unwrap();
        let (exit, events) = task.await.unwrap();

        assert_eq!(exit, MonitorExit::Stopped);
        let deaths = events
            .iter()
            .filter(|e| matches!(e, LivenessEvent::Dead { .. }))
            .count();
        assert_eq!(deaths, 0);
        let pongs = events
            .iter()
            .filter(|e| matches!(e, LivenessEvent::PongReceived { .. }))
            .count();
        assert_eq!(pongs, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unanswered_probe_declares_death() {
        let start = Instant::now();
        let (_counter, guard) = current_epoch();
        let (mut probe, _command_tx, task) = spawn_monitor(config(100, 20, 1), guard);

        let ping = probe.next_sent().await;
        assert!(ping.is_ping());

        let (exit, events) = task.await.unwrap();
        assert_eq!(
            exit,
            MonitorExit::Dead(DeadReason::PongTimeout { missed_beats: 1 })
        );
        assert_eq!(probe.close_count(), 1);

        // Death lands at ping_interval + pong_timeout on the virtual clock.
        let elapsed = Instant::now().duration_since(start);
        assert!(elapsed >= Duration::from_millis(120));
        assert!(elapsed < Duration::from_millis(130));

        assert!(events.iter().any(|e| matches!(
            e,
            LivenessEvent::StateChanged {
                new: LinkState::Dead,
                ..
            }
        )));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tolerated_miss_reprobes_before_death() {
        let (_counter, guard) = current_epoch();
        let (mut probe, _command_tx, task) = spawn_monitor(config(100, 20, 2), guard);

        let first = probe.next_sent().await;
        let second = probe.next_sent().await;
        assert!(first.is_ping() && second.is_ping());
        assert_ne!(first.nonce(), second.nonce());

        let (exit, _events) = task.await.unwrap();
        assert_eq!(
            exit,
            MonitorExit::Dead(DeadReason::PongTimeout { missed_beats: 2 })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_pong_still_accepted_while_reprobing() {
        let (_counter, guard) = current_epoch();
        let (mut probe, command_tx, task) = spawn_monitor(config(100, 20, 3), guard);

        // Let the first probe miss, answer it only after the re-probe.
        let first = probe.next_sent().await;
        let _second = probe.next_sent().await;
        probe.push_frame(ControlFrame::pong(first.nonce()));

        // The cycle restarts: a third probe proves the link survived.
        let third = probe.next_sent().await;
        assert!(third.is_ping());

        command_tx.send(SessionCommand::Stop).unwrap();
        let (exit, events) = task.await.unwrap();
        assert_eq!(exit, MonitorExit::Stopped);
        assert!(
            !events
                .iter()
                .any(|e| matches!(e, LivenessEvent::Dead { .. }))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_remote_ping_answered_without_state_change() {
        let (_counter, guard) = current_epoch();
        let (mut probe, command_tx, task) = spawn_monitor(config(1_000, 100, 1), guard);

        let nonce = Nonce::generate();
        probe.push_frame(ControlFrame::ping(nonce));

        let reply = probe.next_sent().await;
        assert!(reply.is_pong());
        assert_eq!(reply.nonce(), Some(nonce));

        command_tx.send(SessionCommand::Stop).unwrap();
        let (_exit, events) = task.await.unwrap();

        assert!(
            events
                .iter()
                .any(|e| matches!(e, LivenessEvent::RemotePing { .. }))
        );
        assert!(
            !events
                .iter()
                .any(|e| matches!(e, LivenessEvent::StateChanged { .. }))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_nonce_less_pong_accepted() {
        let (_counter, guard) = current_epoch();
        let (mut probe, command_tx, task) = spawn_monitor(config(100, 20, 1), guard);

        let ping = probe.next_sent().await;
        assert!(ping.is_ping());
        probe.push_frame(ControlFrame::pong(None));

        // Surviving to the next probe proves the pong was accepted.
        let next = probe.next_sent().await;
        assert!(next.is_ping());

        command_tx.send(SessionCommand::Stop).unwrap();
        let (exit, events) = task.await.unwrap();
        assert_eq!(exit, MonitorExit::Stopped);
        assert!(events.iter().any(|e| matches!(
            e,
            LivenessEvent::PongReceived {
                nonce: None,
                rtt: Some(_),
                ..
            }
        )));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_nonce_pong_ignored() {
        let (_counter, guard) = current_epoch();
        let (mut probe, _command_tx, task) = spawn_monitor(config(100, 20, 1), guard);

        let _ping = probe.next_sent().await;
        probe.push_frame(ControlFrame::pong(Some(Nonce::generate())));

        // The forged pong must not rescue the link.
        let (exit, _events) = task.await.unwrap();
        assert_eq!(
            exit,
            MonitorExit::Dead(DeadReason::PongTimeout { missed_beats: 1 })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_frames_are_ignored() {
        let (_counter, guard) = current_epoch();
        let (mut probe, command_tx, task) = spawn_monitor(config(100, 20, 1), guard);

        probe.push_event(TransportEvent::Malformed);
        probe.push_event(TransportEvent::Malformed);

        let ping = probe.next_sent().await;
        probe.push_frame(ControlFrame::pong(ping.nonce()));

        command_tx.send(SessionCommand::Stop).unwrap();
        let (exit, events) = task.await.unwrap();
        assert_eq!(exit, MonitorExit::Stopped);

        let malformed = events
            .iter()
            .filter(|e| matches!(e, LivenessEvent::MalformedFrame { .. }))
            .count();
        assert_eq!(malformed, 2);
        assert!(
            !events
                .iter()
                .any(|e| matches!(e, LivenessEvent::Dead { .. }))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_remote_close_declares_death_without_close_handshake() {
        let (_counter, guard) = current_epoch();
        let (probe, _command_tx, task) = spawn_monitor(config(100, 20, 1), guard);

        probe.push_event(TransportEvent::Closed);

        let (exit, events) = task.await.unwrap();
        assert_eq!(exit, MonitorExit::Dead(DeadReason::TransportClosed));
        assert_eq!(probe.close_count(), 0);
        assert!(events.iter().any(|e| matches!(
            e,
            LivenessEvent::Dead {
                reason: DeadReason::TransportClosed,
                ..
            }
        )));
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_failure_declares_death() {
        let (_counter, guard) = current_epoch();
        let (probe, _command_tx, task) = spawn_monitor(config(100, 20, 1), guard);

        probe.fail_sends(true);

        let (exit, _events) = task.await.unwrap();
        assert!(matches!(
            exit,
            MonitorExit::Dead(DeadReason::SendFailed { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_epoch_discards_timer_wakeup() {
        let (counter, guard) = current_epoch();
        let (probe, _command_tx, task) = spawn_monitor(config(100, 20, 1), guard);

        // Invalidate the epoch; the next wakeup (the ping timer) must be a
        // no-op rather than a probe.
        counter.fetch_add(1, Ordering::AcqRel);

        let (exit, events) = task.await.unwrap();
        assert_eq!(exit, MonitorExit::Stopped);
        assert!(
            !events
                .iter()
                .any(|e| matches!(e, LivenessEvent::PingSent { .. }))
        );
        assert_eq!(probe.close_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_closes_without_dead_notification() {
        let (_counter, guard) = current_epoch();
        let (probe, command_tx, task) = spawn_monitor(config(100, 20, 1), guard);

        command_tx.send(SessionCommand::Stop).unwrap();

        let (exit, events) = task.await.unwrap();
        assert_eq!(exit, MonitorExit::Stopped);
        assert_eq!(probe.close_count(), 1);
        assert!(
            !events
                .iter()
                .any(|e| matches!(e, LivenessEvent::Dead { .. }))
        );
    }
}
