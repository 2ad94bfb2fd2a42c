//! Error type for bridge operations
//!
//! Failures stay local to the bridge: they are logged and never sent to the
//! UI core, which only ever sees well-formed events.

/// Error type for bridge operations
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// A playback command arrived while no player is `Ready`
    #[error("no active player for {0}")]
    NoActivePlayer(&'static str),

    #[error("command has no tag")]
    MissingTag,

    #[error("unknown command tag: {0}")]
    UnknownTag(String),

    #[error("malformed payload for {tag}: {source}")]
    MalformedPayload {
        tag: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The external player could not be built for the requested element
    #[error("player construction failed: {0}")]
    Construction(String),

    /// The player script never signalled readiness
    #[error("player script is unavailable")]
    AssetUnavailable,

    #[error("deferred asset mode needs a script environment")]
    MissingEnvironment,
}

pub type Result<T> = std::result::Result<T, BridgeError>;
