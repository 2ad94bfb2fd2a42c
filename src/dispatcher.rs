//! Command dispatcher
//!
//! Translates UI core commands into player calls. Nothing is returned to the
//! caller: replies travel through the relay, and rejected commands end up in
//! the log.

use crate::context::{BridgeContext, TimeReply};
use crate::error::{BridgeError, Result};
use crate::handle::{Lifecycle, PlayerHandle};
use crate::loader::{Admission, ScriptEnvironment};
use crate::player::{PlayerFactory, PlayerOptions, PlayerVars, TimeQuery};
use crate::protocol::{Command, LoadRequest};
use futures_util::FutureExt;
use tracing::{debug, info, warn};

pub struct Dispatcher {
    factory: Box<dyn PlayerFactory>,
    environment: Option<Box<dyn ScriptEnvironment>>,
    player_vars: PlayerVars,
    allow_seek_ahead: bool,
}

impl Dispatcher {
    pub(crate) fn new(
        factory: Box<dyn PlayerFactory>,
        environment: Option<Box<dyn ScriptEnvironment>>,
        player_vars: PlayerVars,
        allow_seek_ahead: bool,
    ) -> Self {
        Self {
            factory,
            environment,
            player_vars,
            allow_seek_ahead,
        }
    }

    pub fn dispatch(&mut self, ctx: &mut BridgeContext, command: Command) {
        let tag = command.tag();
        if let Err(e) = self.try_dispatch(ctx, command) {
            warn!("⚠️ {} rejected: {}", tag, e);
        }
    }

    pub fn try_dispatch(&mut self, ctx: &mut BridgeContext, command: Command) -> Result<()> {
        debug!("Dispatching {:?}", command);
        match command {
            Command::LoadVideo(request) => self.load_video(ctx, request),
            Command::Play => {
                ready_handle(&mut ctx.lifecycle, "PlayVideo")?.player.play_video();
                Ok(())
            }
            Command::Pause => {
                ready_handle(&mut ctx.lifecycle, "PauseVideo")?.player.pause_video();
                Ok(())
            }
            Command::Stop => {
                ready_handle(&mut ctx.lifecycle, "StopVideo")?.player.stop_video();
                Ok(())
            }
            Command::Seek { seconds } => {
                match ctx.lifecycle.ready_mut() {
                    Some(handle) => handle.player.seek_to(seconds, self.allow_seek_ahead),
                    None => debug!("Ignoring SeekTo {}s, no ready player", seconds),
                }
                Ok(())
            }
            Command::QueryCurrentTime => {
                let handle = ready_handle(&mut ctx.lifecycle, "GetPlayerCurrTime")?;
                let generation = handle.generation();
                match handle.player.current_time() {
                    TimeQuery::Ready(seconds) => ctx.relay.publish_time(seconds),
                    TimeQuery::Deferred(rx) => {
                        debug!("Time query deferred for player {}", generation);
                        ctx.pending_times.push(
                            async move {
                                TimeReply {
                                    generation,
                                    seconds: rx.await.ok(),
                                }
                            }
                            .boxed(),
                        );
                    }
                }
                Ok(())
            }
        }
    }

    fn load_video(&mut self, ctx: &mut BridgeContext, request: LoadRequest) -> Result<()> {
        let request = match (ctx.gate.as_mut(), self.environment.as_deref_mut()) {
            (None, _) => request,
            (Some(gate), Some(env)) => match gate.admit(request, env) {
                Admission::Proceed(request) => request,
                Admission::Parked => {
                    info!("⏳ Load parked until the player script is ready");
                    return Ok(());
                }
                Admission::Unavailable => return Err(BridgeError::AssetUnavailable),
            },
            (Some(_), None) => return Err(BridgeError::MissingEnvironment),
        };
        self.construct(ctx, request)
    }

    /// Replace whatever player is installed with a new one for `request`.
    ///
    /// The old handle is fully torn down before the factory runs, and the new
    /// handle is only installed once subscribed.
    pub(crate) fn construct(
        &mut self,
        ctx: &mut BridgeContext,
        request: LoadRequest,
    ) -> Result<()> {
        ctx.teardown_current();

        let options = PlayerOptions {
            element_id: request.element_id,
            video_id: request.video_id,
            player_vars: self.player_vars.clone(),
        };
        let generation = ctx.allocate_generation();
        info!(
            "🎬 Constructing player {} in #{} for video {}",
            generation, options.element_id, options.video_id
        );

        let player = self.factory.construct(&options)?;
        let mut handle = PlayerHandle::new(generation, player);
        ctx.relay.attach(&mut handle);

        ctx.lifecycle = if handle.player.signals_ready() {
            debug!("Player {} waiting for its ready notification", generation);
            Lifecycle::Constructing(handle)
        } else {
            info!("✅ Player {} ready", generation);
            Lifecycle::Ready(handle)
        };
        Ok(())
    }
}

fn ready_handle<'a>(
    lifecycle: &'a mut Lifecycle,
    tag: &'static str,
) -> Result<&'a mut PlayerHandle> {
    lifecycle.ready_mut().ok_or(BridgeError::NoActivePlayer(tag))
}
