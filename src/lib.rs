//! ytbridge - bridge between a message-driven UI core and an embedded video player
//!
//! The UI core sends tagged [`Command`]s and receives tagged [`Event`]s. The
//! bridge owns the single player instance, keeps its lifecycle, and, when the
//! player library is loaded lazily, parks load requests behind a one-shot
//! asset gate until the library reports readiness.

#![forbid(unsafe_code)]

pub mod bridge;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod loader;
pub mod player;
pub mod protocol;
pub mod relay;
pub mod sim;

pub use bridge::Bridge;
pub use config::{AssetMode, BridgeConfig};
pub use error::{BridgeError, Result};
pub use handle::LifecycleState;
pub use loader::{ApiReady, GateState, ScriptEnvironment};
pub use player::{
    ExternalPlayer, NotificationSink, PlayerFactory, PlayerOptions, PlayerVars, TimeQuery,
};
pub use protocol::{Command, Event, LoadRequest, PlayerStateCode};
