//! One-shot gate in front of the player script
//!
//! The first load request injects the script and parks itself in a pending
//! slot. Later requests only overwrite the slot. When the environment fires
//! [`ApiReady`] the slot is drained once and every later load goes straight
//! through.

use crate::protocol::LoadRequest;
use tokio::sync::oneshot;
use tracing::{debug, info};

/// Readiness callback handed to the environment together with the script.
///
/// Firing consumes it, so readiness can be reported at most once. Dropping
/// it without firing means the script failed to load.
#[derive(Debug)]
pub struct ApiReady {
    tx: oneshot::Sender<()>,
}

impl ApiReady {
    pub fn fire(self) {
        let _ = self.tx.send(());
    }
}

/// Ability to inject a script into the hosting document
pub trait ScriptEnvironment: Send {
    fn inject_script(&mut self, url: &str, on_ready: ApiReady);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// Nothing injected yet
    Idle,
    /// Script injected, readiness outstanding
    Loading,
    Ready,
    /// Readiness callback dropped without firing
    Failed,
}

/// What a load request should do next
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Admission {
    /// Build the player now
    Proceed(LoadRequest),
    /// Parked until the script is ready
    Parked,
    /// The script will never become ready
    Unavailable,
}

#[derive(Debug)]
pub struct AssetGate {
    script_url: String,
    state: GateState,
    pending: Option<LoadRequest>,
    pub(crate) ready_rx: Option<oneshot::Receiver<()>>,
}

impl AssetGate {
    pub fn new(script_url: impl Into<String>) -> Self {
        Self {
            script_url: script_url.into(),
            state: GateState::Idle,
            pending: None,
            ready_rx: None,
        }
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn pending(&self) -> Option<&LoadRequest> {
        self.pending.as_ref()
    }

    /// True while a readiness signal is outstanding
    pub(crate) fn is_waiting(&self) -> bool {
        self.ready_rx.is_some()
    }

    pub(crate) fn admit(
        &mut self,
        request: LoadRequest,
        env: &mut dyn ScriptEnvironment,
    ) -> Admission {
        match self.state {
            GateState::Ready => Admission::Proceed(request),
            GateState::Failed => Admission::Unavailable,
            GateState::Loading => {
                if let Some(previous) = self.pending.replace(request) {
                    debug!("Superseding pending load of {}", previous.video_id);
                }
                Admission::Parked
            }
            GateState::Idle => {
                let (tx, rx) = oneshot::channel();
                info!("📜 Injecting player script {}", self.script_url);
                env.inject_script(&self.script_url, ApiReady { tx });
                self.ready_rx = Some(rx);
                self.state = GateState::Loading;
                self.pending = Some(request);
                Admission::Parked
            }
        }
    }

    /// Readiness transition. Returns the request to replay, if any.
    pub(crate) fn open(&mut self) -> Option<LoadRequest> {
        self.ready_rx = None;
        if self.state == GateState::Ready {
            return None;
        }
        self.state = GateState::Ready;
        let pending = self.pending.take();
        if pending.is_none() {
            info!("Player script ready with no pending load, idling");
        }
        pending
    }

    /// The readiness callback was dropped; pending work is abandoned
    pub(crate) fn fail(&mut self) -> Option<LoadRequest> {
        self.ready_rx = None;
        self.state = GateState::Failed;
        self.pending.take()
    }
}
