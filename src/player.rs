//! Seams towards the embedded player library
//!
//! The bridge never talks to a concrete player. It builds players through a
//! [`PlayerFactory`] and drives them through the [`ExternalPlayer`]
//! capability trait; players report back through a [`NotificationSink`].

use crate::error::Result;
use crate::protocol::PlayerStateCode;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};

/// Embed parameters handed to the player at construction time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerVars {
    pub autoplay: u8,
    pub controls: u8,
    pub fs: u8,
    pub iv_load_policy: u8,
    pub modestbranding: u8,
    pub playsinline: u8,
    pub rel: u8,
    pub showinfo: u8,
}

impl Default for PlayerVars {
    fn default() -> Self {
        Self {
            autoplay: 1,
            controls: 0,
            fs: 0,
            iv_load_policy: 3,
            modestbranding: 1,
            playsinline: 1,
            rel: 0,
            showinfo: 0,
        }
    }
}

/// Everything a factory needs to build one player instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerOptions {
    pub element_id: String,
    pub video_id: String,
    pub player_vars: PlayerVars,
}

/// Result of a current-time query
#[derive(Debug)]
pub enum TimeQuery {
    /// The player answered synchronously
    Ready(f64),
    /// The answer arrives later on this channel
    Deferred(oneshot::Receiver<f64>),
}

/// Identifies one listener registration on a player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    /// The player finished its own asynchronous setup
    Ready,
    /// `onStateChange`
    StateChange(PlayerStateCode),
    /// `onError`; logged, never forwarded
    Error(i32),
}

/// A notification stamped with the generation of the handle that produced it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerNotification {
    pub generation: u64,
    pub kind: NotificationKind,
}

/// Sender given to a player on subscribe.
///
/// Cloneable and `Send` so a player can call it from whatever callback its
/// library offers. Posting after the bridge is gone is a no-op.
#[derive(Debug, Clone)]
pub struct NotificationSink {
    generation: u64,
    tx: mpsc::UnboundedSender<PlayerNotification>,
}

impl NotificationSink {
    pub(crate) fn new(generation: u64, tx: mpsc::UnboundedSender<PlayerNotification>) -> Self {
        Self { generation, tx }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn ready(&self) {
        self.post(NotificationKind::Ready);
    }

    pub fn state_changed(&self, code: i32) {
        self.post(NotificationKind::StateChange(PlayerStateCode(code)));
    }

    pub fn error(&self, code: i32) {
        self.post(NotificationKind::Error(code));
    }

    fn post(&self, kind: NotificationKind) {
        let _ = self.tx.send(PlayerNotification {
            generation: self.generation,
            kind,
        });
    }
}

/// Capabilities of one live player instance
pub trait ExternalPlayer: Send {
    fn play_video(&mut self);
    fn pause_video(&mut self);
    fn stop_video(&mut self);
    fn seek_to(&mut self, seconds: f64, allow_seek_ahead: bool);
    fn current_time(&mut self) -> TimeQuery;

    /// Register the state-change listener; at most one is live per instance
    fn subscribe(&mut self, sink: NotificationSink) -> SubscriptionId;
    fn unsubscribe(&mut self, id: SubscriptionId);

    /// Release the underlying instance. Called once, after `unsubscribe`.
    fn destroy(&mut self);

    /// Whether the player posts [`NotificationKind::Ready`] once usable.
    /// Players that return `false` are usable as soon as they are built.
    fn signals_ready(&self) -> bool {
        false
    }
}

/// Builds player instances bound to a target element
pub trait PlayerFactory: Send {
    fn construct(&mut self, options: &PlayerOptions) -> Result<Box<dyn ExternalPlayer>>;
}
