//! The narrow slice of a voice transport the countdown needs: open a
//! connection, bind a player to it, submit clips and hear back when they end.

use std::sync::Arc;

use poise::serenity_prelude::{ChannelId, GuildId, async_trait};
use tokio::sync::mpsc;

use super::timing_planner::ClipStep;
use super::voice_service::VoiceResult;

/// What a bound player reports back about the clip it is playing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerSignal {
    /// The submitted clip played to its end
    Finished,
    /// The player or the connection under it failed
    Errored(String),
}

pub type SignalSender = mpsc::UnboundedSender<PlayerSignal>;
pub type SignalReceiver = mpsc::UnboundedReceiver<PlayerSignal>;

/// Opens voice connections
#[async_trait]
pub trait VoiceTransport: Send + Sync {
    async fn open(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> VoiceResult<Arc<dyn VoiceConnection>>;
}

/// An open link to one voice channel
#[async_trait]
pub trait VoiceConnection: Send + Sync {
    fn channel_id(&self) -> ChannelId;

    /// Whether the connection can still carry audio. A kicked or
    /// disconnected bot reports false.
    async fn is_alive(&self) -> bool;

    /// Bind a fresh player to this connection. Completion and error signals
    /// for everything the player submits are sent on `signals`.
    async fn bind_player(&self, signals: SignalSender) -> VoiceResult<Box<dyn VoicePlayer>>;

    /// Tear the connection down
    async fn destroy(&self) -> VoiceResult<()>;
}

/// Plays one clip at a time on a connection
#[async_trait]
pub trait VoicePlayer: Send {
    /// Start playing a step, replacing whatever was playing before
    async fn submit(&mut self, step: &ClipStep) -> VoiceResult<()>;

    /// Stop playback and detach from the connection. No further signals are
    /// sent for clips submitted before the stop.
    async fn stop(&mut self);
}
