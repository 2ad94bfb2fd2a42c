//! Player handle and its lifecycle
//!
//! ```text
//! Absent --LoadVideo--> Constructing --ready--> Ready
//!                            ^                    |
//!                            +-----LoadVideo------+
//! ```

use crate::player::{ExternalPlayer, SubscriptionId};
use std::fmt;

/// Owns one external player instance and its listener registration
pub struct PlayerHandle {
    generation: u64,
    pub(crate) player: Box<dyn ExternalPlayer>,
    pub(crate) subscription: Option<SubscriptionId>,
}

impl PlayerHandle {
    pub(crate) fn new(generation: u64, player: Box<dyn ExternalPlayer>) -> Self {
        Self {
            generation,
            player,
            subscription: None,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }
}

impl fmt::Debug for PlayerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlayerHandle")
            .field("generation", &self.generation)
            .field("subscription", &self.subscription)
            .finish_non_exhaustive()
    }
}

/// Public view of the lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Absent,
    Constructing,
    Ready,
}

#[derive(Debug, Default)]
pub(crate) enum Lifecycle {
    #[default]
    Absent,
    /// Built, waiting for the player's own readiness notification
    Constructing(PlayerHandle),
    Ready(PlayerHandle),
}

impl Lifecycle {
    pub(crate) fn state(&self) -> LifecycleState {
        match self {
            Lifecycle::Absent => LifecycleState::Absent,
            Lifecycle::Constructing(_) => LifecycleState::Constructing,
            Lifecycle::Ready(_) => LifecycleState::Ready,
        }
    }

    pub(crate) fn generation(&self) -> Option<u64> {
        self.handle().map(PlayerHandle::generation)
    }

    pub(crate) fn handle(&self) -> Option<&PlayerHandle> {
        match self {
            Lifecycle::Absent => None,
            Lifecycle::Constructing(handle) | Lifecycle::Ready(handle) => Some(handle),
        }
    }

    /// The handle, only once it accepts playback commands
    pub(crate) fn ready_mut(&mut self) -> Option<&mut PlayerHandle> {
        match self {
            Lifecycle::Ready(handle) => Some(handle),
            _ => None,
        }
    }

    /// Detach whatever handle is installed, leaving `Absent`
    pub(crate) fn take(&mut self) -> Option<PlayerHandle> {
        match std::mem::take(self) {
            Lifecycle::Absent => None,
            Lifecycle::Constructing(handle) | Lifecycle::Ready(handle) => Some(handle),
        }
    }

    /// `Constructing -> Ready` for the given generation. Returns false when the
    /// notification does not belong to the handle waiting for it.
    pub(crate) fn promote(&mut self, generation: u64) -> bool {
        match std::mem::take(self) {
            Lifecycle::Constructing(handle) if handle.generation() == generation => {
                *self = Lifecycle::Ready(handle);
                true
            }
            other => {
                *self = other;
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::{NotificationSink, TimeQuery};

    struct Inert;

    impl ExternalPlayer for Inert {
        fn play_video(&mut self) {}
        fn pause_video(&mut self) {}
        fn stop_video(&mut self) {}
        fn seek_to(&mut self, _seconds: f64, _allow_seek_ahead: bool) {}
        fn current_time(&mut self) -> TimeQuery {
            TimeQuery::Ready(0.0)
        }
        fn subscribe(&mut self, _sink: NotificationSink) -> SubscriptionId {
            SubscriptionId(0)
        }
        fn unsubscribe(&mut self, _id: SubscriptionId) {}
        fn destroy(&mut self) {}
    }

    #[test]
    fn test_promote_only_matching_generation() {
        let mut lifecycle = Lifecycle::Constructing(PlayerHandle::new(3, Box::new(Inert)));
        assert!(lifecycle.ready_mut().is_none());

        assert!(!lifecycle.promote(2));
        assert_eq!(lifecycle.state(), LifecycleState::Constructing);

        assert!(lifecycle.promote(3));
        assert_eq!(lifecycle.state(), LifecycleState::Ready);
        assert!(lifecycle.ready_mut().is_some());

        // Already ready: nothing to promote
        assert!(!lifecycle.promote(3));
        assert_eq!(lifecycle.state(), LifecycleState::Ready);
    }

    #[test]
    fn test_take_leaves_absent() {
        let mut lifecycle = Lifecycle::Ready(PlayerHandle::new(1, Box::new(Inert)));
        assert_eq!(lifecycle.generation(), Some(1));

        let handle = lifecycle.take().unwrap();
        assert_eq!(handle.generation(), 1);
        assert_eq!(lifecycle.state(), LifecycleState::Absent);
        assert!(lifecycle.take().is_none());
    }
}
