//! Bridge - composition root connecting the UI core to the player
//!
//! Owns the dispatcher, the shared context and the notification inbox. The
//! synchronous `handle_*` methods are the whole behaviour; [`Bridge::run`]
//! only multiplexes the event sources onto them from a single task.

use crate::config::{AssetMode, BridgeConfig};
use crate::context::{BridgeContext, TimeReply};
use crate::dispatcher::Dispatcher;
use crate::error::{BridgeError, Result};
use crate::handle::LifecycleState;
use crate::loader::{AssetGate, GateState, ScriptEnvironment};
use crate::player::{NotificationKind, PlayerFactory, PlayerNotification};
use crate::protocol::{Command, Event};
use crate::relay::EventRelay;
use futures_util::{FutureExt, StreamExt};
use tokio::sync::mpsc;
use tokio::sync::oneshot::error::{RecvError, TryRecvError};
use tracing::{debug, error, info, warn};

pub struct Bridge {
    dispatcher: Dispatcher,
    ctx: BridgeContext,
    notifications: mpsc::UnboundedReceiver<PlayerNotification>,
}

impl Bridge {
    /// `environment` is required for [`AssetMode::Deferred`] and ignored otherwise.
    pub fn new(
        config: BridgeConfig,
        factory: Box<dyn PlayerFactory>,
        environment: Option<Box<dyn ScriptEnvironment>>,
        outbound: mpsc::UnboundedSender<Event>,
    ) -> Result<Self> {
        let (notify_tx, notifications) = mpsc::unbounded_channel();
        let relay = EventRelay::new(outbound, notify_tx);

        let (gate, environment) = match config.asset {
            AssetMode::Immediate => {
                if environment.is_some() {
                    warn!("Script environment supplied in immediate mode, ignoring it");
                }
                (None, None)
            }
            AssetMode::Deferred { script_url } => {
                if environment.is_none() {
                    return Err(BridgeError::MissingEnvironment);
                }
                (Some(AssetGate::new(script_url)), environment)
            }
        };

        Ok(Self {
            dispatcher: Dispatcher::new(
                factory,
                environment,
                config.player_vars,
                config.allow_seek_ahead,
            ),
            ctx: BridgeContext::new(relay, gate),
            notifications,
        })
    }

    /// Lifecycle as seen by the UI core; a load parked behind the gate
    /// counts as `Constructing`.
    pub fn state(&self) -> LifecycleState {
        match self.ctx.lifecycle.state() {
            LifecycleState::Absent
                if self.ctx.gate.as_ref().is_some_and(|g| g.pending().is_some()) =>
            {
                LifecycleState::Constructing
            }
            state => state,
        }
    }

    /// `None` in immediate mode
    pub fn gate_state(&self) -> Option<GateState> {
        self.ctx.gate.as_ref().map(AssetGate::state)
    }

    /// Generation of the installed handle
    pub fn generation(&self) -> Option<u64> {
        self.ctx.lifecycle.generation()
    }

    pub fn dispatch(&mut self, command: Command) {
        self.dispatcher.dispatch(&mut self.ctx, command);
    }

    pub fn handle_notification(&mut self, notification: PlayerNotification) {
        if self.ctx.lifecycle.generation() != Some(notification.generation) {
            debug!(
                "Dropping {:?} from stale player {}",
                notification.kind, notification.generation
            );
            return;
        }

        match notification.kind {
            NotificationKind::Ready => {
                if self.ctx.lifecycle.promote(notification.generation) {
                    info!("✅ Player {} ready", notification.generation);
                }
            }
            NotificationKind::StateChange(code) => self.ctx.relay.publish_status(code),
            NotificationKind::Error(code) => {
                warn!("Player {} reported error {}", notification.generation, code)
            }
        }
    }

    /// The player script finished loading
    pub fn handle_api_ready(&mut self) {
        let Some(gate) = self.ctx.gate.as_mut() else {
            return;
        };
        info!("📜 Player script ready");
        if let Some(request) = gate.open() {
            if let Err(e) = self.dispatcher.construct(&mut self.ctx, request) {
                error!("Deferred player construction failed: {}", e);
            }
        }
    }

    /// The player script will never report readiness
    pub fn handle_api_failed(&mut self) {
        let Some(gate) = self.ctx.gate.as_mut() else {
            return;
        };
        match gate.fail() {
            Some(request) => error!(
                "Player script failed to load, dropping load of {}",
                request.video_id
            ),
            None => error!("Player script failed to load"),
        }
    }

    pub fn handle_time_reply(&mut self, reply: TimeReply) {
        if self.ctx.lifecycle.generation() != Some(reply.generation) {
            debug!("Discarding time reply from stale player {}", reply.generation);
            return;
        }
        match reply.seconds {
            Some(seconds) => self.ctx.relay.publish_time(seconds),
            None => warn!("Player {} abandoned a time query", reply.generation),
        }
    }

    /// Handle everything that is already available without waiting: queued
    /// notifications, a fired (or dropped) readiness callback and resolved
    /// time queries. Returns how many items were handled.
    pub fn process_pending(&mut self) -> usize {
        let mut handled = 0;

        while let Ok(notification) = self.notifications.try_recv() {
            self.handle_notification(notification);
            handled += 1;
        }

        let signal = self
            .ctx
            .gate
            .as_mut()
            .and_then(|g| g.ready_rx.as_mut())
            .map(|rx| rx.try_recv());
        match signal {
            Some(Ok(())) => {
                self.handle_api_ready();
                handled += 1;
            }
            Some(Err(TryRecvError::Closed)) => {
                self.handle_api_failed();
                handled += 1;
            }
            Some(Err(TryRecvError::Empty)) | None => {}
        }

        while let Some(Some(reply)) = self.ctx.pending_times.next().now_or_never() {
            self.handle_time_reply(reply);
            handled += 1;
        }

        handled
    }

    /// Send the startup `JSPlayerStatus` with no code, before any player
    /// exists. [`Bridge::run`] does this once on entry.
    pub fn announce(&self) {
        self.ctx.relay.publish_startup();
    }

    /// Serve commands until the inbound channel closes, then finish a parked
    /// load and outstanding time queries. The player is torn down when the
    /// bridge is dropped at the end.
    pub async fn run(mut self, mut inbound: mpsc::UnboundedReceiver<Command>) {
        info!("Bridge started");
        self.announce();

        let mut inbound_open = true;
        loop {
            let gate_waiting = self.ctx.gate.as_ref().is_some_and(AssetGate::is_waiting);
            let has_time_queries = !self.ctx.pending_times.is_empty();

            if !inbound_open && !gate_waiting && !has_time_queries {
                info!("Bridge shutting down");
                break;
            }

            tokio::select! {
                biased;

                Some(notification) = self.notifications.recv() => {
                    self.handle_notification(notification);
                }

                signal = wait_ready(&mut self.ctx.gate), if gate_waiting => {
                    match signal {
                        Ok(()) => self.handle_api_ready(),
                        Err(_) => self.handle_api_failed(),
                    }
                }

                Some(reply) = self.ctx.pending_times.next(), if has_time_queries => {
                    self.handle_time_reply(reply);
                }

                command = inbound.recv(), if inbound_open => match command {
                    Some(command) => self.dispatch(command),
                    None => {
                        info!(
                            "Inbound channel closed (script pending: {}, time queries: {})",
                            gate_waiting,
                            self.ctx.pending_times.len()
                        );
                        inbound_open = false;
                    }
                },
            }
        }
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        self.ctx.teardown_current();
    }
}

async fn wait_ready(gate: &mut Option<AssetGate>) -> std::result::Result<(), RecvError> {
    match gate.as_mut().and_then(|g| g.ready_rx.as_mut()) {
        Some(rx) => rx.await,
        None => std::future::pending().await,
    }
}
