//! In-process stand-ins for the player library and the hosting document
//!
//! Used by the `ytbridge` binary and by tests. Every call is journaled, and
//! the driver decides when notifications, readiness and time replies happen.

use crate::error::{BridgeError, Result};
use crate::loader::{ApiReady, ScriptEnvironment};
use crate::player::{
    ExternalPlayer, NotificationSink, PlayerFactory, PlayerOptions, SubscriptionId, TimeQuery,
};
use crate::protocol::PlayerStateCode;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// One call made on a simulated player
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerCall {
    Construct,
    Play,
    Pause,
    Stop,
    Seek { seconds: f64, allow_seek_ahead: bool },
    CurrentTime,
    Subscribe(SubscriptionId),
    Unsubscribe(SubscriptionId),
    Destroy,
}

#[derive(Debug)]
struct SimPlayer {
    options: PlayerOptions,
    sink: Option<(SubscriptionId, NotificationSink)>,
    time_replies: Vec<oneshot::Sender<f64>>,
    position: f64,
}

#[derive(Debug, Default)]
struct SimInner {
    players: Vec<SimPlayer>,
    journal: Vec<(usize, PlayerCall)>,
    next_subscription: u64,
    deferred_time: bool,
    signals_ready: bool,
    auto_status: bool,
    fail_next: Option<String>,
}

impl SimInner {
    fn emit(&self, index: usize, code: PlayerStateCode) -> bool {
        match self.players.get(index).and_then(|p| p.sink.as_ref()) {
            Some((_, sink)) => {
                sink.state_changed(code.0);
                true
            }
            None => false,
        }
    }
}

/// Factory handing out journaled players that share one state
#[derive(Debug, Clone, Default)]
pub struct SimulatedFactory {
    inner: Arc<Mutex<SimInner>>,
}

impl SimulatedFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// `current_time` answers through a channel resolved by [`Self::resolve_time`]
    pub fn with_deferred_time(self) -> Self {
        self.lock().deferred_time = true;
        self
    }

    /// Players stay `Constructing` until [`Self::emit_ready`]
    pub fn with_ready_signal(self) -> Self {
        self.lock().signals_ready = true;
        self
    }

    /// Players report status changes on their own, like the real library
    pub fn with_auto_status(self) -> Self {
        self.lock().auto_status = true;
        self
    }

    pub fn fail_next_construction(&self, reason: impl Into<String>) {
        self.lock().fail_next = Some(reason.into());
    }

    pub fn constructions(&self) -> Vec<PlayerOptions> {
        self.lock().players.iter().map(|p| p.options.clone()).collect()
    }

    /// Calls made on the player built at `index`
    pub fn calls(&self, index: usize) -> Vec<PlayerCall> {
        self.lock()
            .journal
            .iter()
            .filter(|(i, _)| *i == index)
            .map(|(_, call)| call.clone())
            .collect()
    }

    /// Every call on every player, in order
    pub fn journal(&self) -> Vec<(usize, PlayerCall)> {
        self.lock().journal.clone()
    }

    pub fn is_subscribed(&self, index: usize) -> bool {
        self.lock()
            .players
            .get(index)
            .is_some_and(|p| p.sink.is_some())
    }

    /// The live listener of the player at `index`
    pub fn sink(&self, index: usize) -> Option<NotificationSink> {
        self.lock()
            .players
            .get(index)
            .and_then(|p| p.sink.as_ref().map(|(_, sink)| sink.clone()))
    }

    /// Report a state change; false when nobody listens
    pub fn emit_state(&self, index: usize, code: i32) -> bool {
        self.lock().emit(index, PlayerStateCode(code))
    }

    pub fn emit_ready(&self, index: usize) -> bool {
        match self.sink(index) {
            Some(sink) => {
                sink.ready();
                true
            }
            None => false,
        }
    }

    pub fn emit_error(&self, index: usize, code: i32) -> bool {
        match self.sink(index) {
            Some(sink) => {
                sink.error(code);
                true
            }
            None => false,
        }
    }

    pub fn set_position(&self, index: usize, seconds: f64) {
        if let Some(player) = self.lock().players.get_mut(index) {
            player.position = seconds;
        }
    }

    /// Answer every outstanding deferred query of the player at `index`
    /// with its position. Returns how many were answered.
    pub fn resolve_time(&self, index: usize) -> usize {
        let mut inner = self.lock();
        let Some(player) = inner.players.get_mut(index) else {
            return 0;
        };
        let position = player.position;
        let replies = std::mem::take(&mut player.time_replies);
        let count = replies.len();
        for reply in replies {
            let _ = reply.send(position);
        }
        count
    }

    /// Drop every outstanding deferred query of the player at `index`
    /// without answering. Returns how many were dropped.
    pub fn abandon_time(&self, index: usize) -> usize {
        self.lock()
            .players
            .get_mut(index)
            .map(|p| std::mem::take(&mut p.time_replies).len())
            .unwrap_or(0)
    }

    fn lock(&self) -> MutexGuard<'_, SimInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PlayerFactory for SimulatedFactory {
    fn construct(&mut self, options: &PlayerOptions) -> Result<Box<dyn ExternalPlayer>> {
        let mut inner = self.lock();
        if let Some(reason) = inner.fail_next.take() {
            return Err(BridgeError::Construction(reason));
        }
        let index = inner.players.len();
        inner.players.push(SimPlayer {
            options: options.clone(),
            sink: None,
            time_replies: Vec::new(),
            position: 0.0,
        });
        inner.journal.push((index, PlayerCall::Construct));
        debug!("Simulated player {} built for {}", index, options.video_id);

        Ok(Box::new(SimulatedPlayer {
            index,
            inner: self.inner.clone(),
        }))
    }
}

/// One journaled player instance
#[derive(Debug)]
pub struct SimulatedPlayer {
    index: usize,
    inner: Arc<Mutex<SimInner>>,
}

impl SimulatedPlayer {
    fn lock(&self) -> MutexGuard<'_, SimInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, call: PlayerCall, status: Option<PlayerStateCode>) {
        let mut inner = self.lock();
        inner.journal.push((self.index, call));
        if let Some(code) = status.filter(|_| inner.auto_status) {
            inner.emit(self.index, code);
        }
    }
}

impl ExternalPlayer for SimulatedPlayer {
    fn play_video(&mut self) {
        self.record(PlayerCall::Play, Some(PlayerStateCode::PLAYING));
    }

    fn pause_video(&mut self) {
        self.record(PlayerCall::Pause, Some(PlayerStateCode::PAUSED));
    }

    fn stop_video(&mut self) {
        self.record(PlayerCall::Stop, Some(PlayerStateCode::UNSTARTED));
    }

    fn seek_to(&mut self, seconds: f64, allow_seek_ahead: bool) {
        self.record(
            PlayerCall::Seek {
                seconds,
                allow_seek_ahead,
            },
            Some(PlayerStateCode::BUFFERING),
        );
        if let Some(player) = self.lock().players.get_mut(self.index) {
            player.position = seconds;
        }
    }

    fn current_time(&mut self) -> TimeQuery {
        let index = self.index;
        let mut inner = self.lock();
        inner.journal.push((index, PlayerCall::CurrentTime));
        let deferred = inner.deferred_time;
        let Some(player) = inner.players.get_mut(index) else {
            return TimeQuery::Ready(0.0);
        };
        if deferred {
            let (tx, rx) = oneshot::channel();
            player.time_replies.push(tx);
            TimeQuery::Deferred(rx)
        } else {
            TimeQuery::Ready(player.position)
        }
    }

    fn subscribe(&mut self, sink: NotificationSink) -> SubscriptionId {
        let index = self.index;
        let mut inner = self.lock();
        let id = SubscriptionId(inner.next_subscription);
        inner.next_subscription += 1;
        inner.journal.push((index, PlayerCall::Subscribe(id)));
        if inner.signals_ready && inner.auto_status {
            sink.ready();
        }
        if let Some(player) = inner.players.get_mut(index) {
            player.sink = Some((id, sink));
        }
        id
    }

    fn unsubscribe(&mut self, id: SubscriptionId) {
        let index = self.index;
        let mut inner = self.lock();
        inner.journal.push((index, PlayerCall::Unsubscribe(id)));
        if let Some(player) = inner.players.get_mut(index) {
            if player.sink.as_ref().is_some_and(|(current, _)| *current == id) {
                player.sink = None;
            } else {
                warn!("Simulated player {} has no listener {:?}", index, id);
            }
        }
    }

    fn destroy(&mut self) {
        self.record(PlayerCall::Destroy, None);
    }

    fn signals_ready(&self) -> bool {
        self.lock().signals_ready
    }
}

#[derive(Debug, Default)]
struct EnvInner {
    injected: Vec<String>,
    pending: Option<ApiReady>,
    auto_fire: Option<Duration>,
}

/// Document stand-in recording script injections
#[derive(Debug, Clone, Default)]
pub struct SimulatedEnvironment {
    inner: Arc<Mutex<EnvInner>>,
}

impl SimulatedEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire readiness on its own, `delay` after injection
    pub fn with_auto_fire(self, delay: Duration) -> Self {
        self.lock().auto_fire = Some(delay);
        self
    }

    pub fn injections(&self) -> Vec<String> {
        self.lock().injected.clone()
    }

    /// Report the script as loaded; false when nothing was injected
    pub fn fire_ready(&self) -> bool {
        match self.lock().pending.take() {
            Some(ready) => {
                ready.fire();
                true
            }
            None => false,
        }
    }

    /// Report the script as failed by dropping the readiness callback
    pub fn fail(&self) -> bool {
        self.lock().pending.take().is_some()
    }

    fn lock(&self) -> MutexGuard<'_, EnvInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ScriptEnvironment for SimulatedEnvironment {
    fn inject_script(&mut self, url: &str, on_ready: ApiReady) {
        let mut inner = self.lock();
        inner.injected.push(url.to_string());

        match (inner.auto_fire, tokio::runtime::Handle::try_current()) {
            (Some(delay), Ok(runtime)) => {
                debug!("Simulated script {} fires in {:?}", url, delay);
                runtime.spawn(async move {
                    tokio::time::sleep(delay).await;
                    on_ready.fire();
                });
            }
            _ => inner.pending = Some(on_ready),
        }
    }
}
