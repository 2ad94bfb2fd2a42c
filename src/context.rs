//! State shared by the dispatcher and the relay.
//!
//! Owned by the [`Bridge`](crate::bridge::Bridge) and lent to each operation;
//! nothing here is global.

use crate::handle::Lifecycle;
use crate::loader::AssetGate;
use crate::relay::EventRelay;
use futures_util::future::BoxFuture;
use futures_util::stream::FuturesUnordered;
use tracing::info;

/// A resolved deferred time query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeReply {
    /// Generation of the handle the query was issued against
    pub generation: u64,
    /// `None` when the player dropped the query without answering
    pub seconds: Option<f64>,
}

pub struct BridgeContext {
    pub(crate) lifecycle: Lifecycle,
    pub(crate) gate: Option<AssetGate>,
    pub(crate) relay: EventRelay,
    pub(crate) pending_times: FuturesUnordered<BoxFuture<'static, TimeReply>>,
    next_generation: u64,
}

impl BridgeContext {
    pub(crate) fn new(relay: EventRelay, gate: Option<AssetGate>) -> Self {
        Self {
            lifecycle: Lifecycle::Absent,
            gate,
            relay,
            pending_times: FuturesUnordered::new(),
            next_generation: 1,
        }
    }

    pub(crate) fn allocate_generation(&mut self) -> u64 {
        let generation = self.next_generation;
        self.next_generation += 1;
        generation
    }

    /// Unsubscribe, then destroy, the installed player. Leaves `Absent`.
    pub(crate) fn teardown_current(&mut self) {
        if let Some(mut handle) = self.lifecycle.take() {
            info!("🧹 Tearing down player {}", handle.generation());
            self.relay.detach(&mut handle);
            handle.player.destroy();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::{LifecycleState, PlayerHandle};
    use crate::player::{PlayerFactory, PlayerOptions, PlayerVars};
    use crate::sim::{PlayerCall, SimulatedFactory};
    use tokio::sync::mpsc;

    fn context() -> BridgeContext {
        let (out_tx, _out_rx) = mpsc::unbounded_channel();
        let (notify_tx, _notify_rx) = mpsc::unbounded_channel();
        BridgeContext::new(EventRelay::new(out_tx, notify_tx), None)
    }

    fn install(ctx: &mut BridgeContext, factory: &mut SimulatedFactory) -> u64 {
        let options = PlayerOptions {
            element_id: "p1".into(),
            video_id: "v1".into(),
            player_vars: PlayerVars::default(),
        };
        let generation = ctx.allocate_generation();
        let mut handle = PlayerHandle::new(generation, factory.construct(&options).unwrap());
        ctx.relay.attach(&mut handle);
        ctx.lifecycle = Lifecycle::Ready(handle);
        generation
    }

    #[test]
    fn test_generations_increase() {
        let mut ctx = context();
        assert_eq!(ctx.allocate_generation(), 1);
        assert_eq!(ctx.allocate_generation(), 2);
        assert_eq!(ctx.allocate_generation(), 3);
    }

    #[test]
    fn test_teardown_unsubscribes_before_destroy() {
        let mut factory = SimulatedFactory::new();
        let mut ctx = context();
        install(&mut ctx, &mut factory);

        ctx.teardown_current();

        let calls = factory.calls(0);
        let unsubscribe = calls
            .iter()
            .position(|c| matches!(c, PlayerCall::Unsubscribe(_)))
            .unwrap();
        let destroy = calls.iter().position(|c| *c == PlayerCall::Destroy).unwrap();
        assert!(unsubscribe < destroy);
        assert_eq!(ctx.lifecycle.state(), LifecycleState::Absent);
        assert!(!factory.is_subscribed(0));
    }

    #[test]
    fn test_teardown_when_absent_is_noop() {
        let mut factory = SimulatedFactory::new();
        let mut ctx = context();
        ctx.teardown_current();
        assert!(factory.journal().is_empty());

        let generation = install(&mut ctx, &mut factory);
        ctx.teardown_current();
        ctx.teardown_current();
        assert_eq!(generation, 1);
        let destroys = factory
            .calls(0)
            .into_iter()
            .filter(|c| *c == PlayerCall::Destroy)
            .count();
        assert_eq!(destroys, 1);
    }
}
