//! Event relay: player notifications in, UI core events out

use crate::handle::PlayerHandle;
use crate::player::{NotificationSink, PlayerNotification};
use crate::protocol::{Event, PlayerStateCode};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

pub struct EventRelay {
    outbound: mpsc::UnboundedSender<Event>,
    notify_tx: mpsc::UnboundedSender<PlayerNotification>,
}

impl EventRelay {
    pub(crate) fn new(
        outbound: mpsc::UnboundedSender<Event>,
        notify_tx: mpsc::UnboundedSender<PlayerNotification>,
    ) -> Self {
        Self { outbound, notify_tx }
    }

    /// Subscribe to the handle's player. One listener per handle.
    pub(crate) fn attach(&self, handle: &mut PlayerHandle) {
        if handle.subscription.is_some() {
            debug!("Handle {} already subscribed", handle.generation());
            return;
        }
        let sink = NotificationSink::new(handle.generation(), self.notify_tx.clone());
        let id = handle.player.subscribe(sink);
        debug!("Subscribed to player {} ({:?})", handle.generation(), id);
        handle.subscription = Some(id);
    }

    /// Remove the listener; must run before the player is destroyed
    pub(crate) fn detach(&self, handle: &mut PlayerHandle) {
        if let Some(id) = handle.subscription.take() {
            handle.player.unsubscribe(id);
            debug!("Unsubscribed from player {} ({:?})", handle.generation(), id);
        }
    }

    pub(crate) fn publish_status(&self, code: PlayerStateCode) {
        info!("▶️ Player status {}", code);
        self.publish(Event::PlayerStatus(Some(code)));
    }

    /// Tell the UI core the bridge is live before any player exists
    pub(crate) fn publish_startup(&self) {
        debug!("Announcing bridge startup");
        self.publish(Event::PlayerStatus(None));
    }

    pub(crate) fn publish_time(&self, seconds: f64) {
        debug!("Player time {:.3}s", seconds);
        self.publish(Event::PlayerCurrentTime(seconds));
    }

    fn publish(&self, event: Event) {
        if self.outbound.send(event).is_err() {
            error!("Failed to send event - outbound channel closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::{PlayerFactory, PlayerOptions, PlayerVars};
    use crate::sim::{PlayerCall, SimulatedFactory};

    fn relay() -> (
        EventRelay,
        mpsc::UnboundedReceiver<Event>,
        mpsc::UnboundedReceiver<PlayerNotification>,
    ) {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (notify_tx, notify_rx) = mpsc::unbounded_channel();
        (EventRelay::new(out_tx, notify_tx), out_rx, notify_rx)
    }

    fn handle(factory: &mut SimulatedFactory, generation: u64) -> PlayerHandle {
        let options = PlayerOptions {
            element_id: "p1".into(),
            video_id: "v1".into(),
            player_vars: PlayerVars::default(),
        };
        PlayerHandle::new(generation, factory.construct(&options).unwrap())
    }

    #[test]
    fn test_attach_is_idempotent() {
        let mut factory = SimulatedFactory::new();
        let (relay, _out, _notify) = relay();
        let mut handle = handle(&mut factory, 1);

        relay.attach(&mut handle);
        relay.attach(&mut handle);

        let subscribes = factory
            .calls(0)
            .into_iter()
            .filter(|c| matches!(c, PlayerCall::Subscribe(_)))
            .count();
        assert_eq!(subscribes, 1);
        assert!(factory.is_subscribed(0));
    }

    #[test]
    fn test_detach_removes_listener_once() {
        let mut factory = SimulatedFactory::new();
        let (relay, _out, _notify) = relay();
        let mut handle = handle(&mut factory, 1);

        relay.attach(&mut handle);
        relay.detach(&mut handle);
        relay.detach(&mut handle);

        assert!(!factory.is_subscribed(0));
        assert!(handle.subscription.is_none());
        let unsubscribes = factory
            .calls(0)
            .into_iter()
            .filter(|c| matches!(c, PlayerCall::Unsubscribe(_)))
            .count();
        assert_eq!(unsubscribes, 1);
    }

    #[test]
    fn test_notifications_carry_handle_generation() {
        let mut factory = SimulatedFactory::new();
        let (relay, _out, mut notify_rx) = relay();
        let mut handle = handle(&mut factory, 7);

        relay.attach(&mut handle);
        assert!(factory.emit_state(0, 1));

        let notification = notify_rx.try_recv().unwrap();
        assert_eq!(notification.generation, 7);
    }

    #[test]
    fn test_publish_order_and_startup() {
        let (relay, mut out_rx, _notify) = relay();

        relay.publish_startup();
        relay.publish_status(PlayerStateCode::PLAYING);
        relay.publish_time(3.5);

        assert_eq!(out_rx.try_recv().unwrap(), Event::PlayerStatus(None));
        assert_eq!(
            out_rx.try_recv().unwrap(),
            Event::PlayerStatus(Some(PlayerStateCode::PLAYING))
        );
        assert_eq!(out_rx.try_recv().unwrap(), Event::PlayerCurrentTime(3.5));
    }

    #[test]
    fn test_publish_on_closed_channel_is_logged() {
        let (relay, out_rx, _notify) = relay();
        drop(out_rx);

        relay.publish_status(PlayerStateCode::ENDED);
        relay.publish_time(1.0);
    }
}
