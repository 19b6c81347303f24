use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use poise::serenity_prelude as serenity;
use serenity::async_trait;
use songbird::tracks::PlayMode;
use tracing::{debug, error, info, warn};

use super::voice_transport::{PlayerSignal, SignalSender};

/// Forwards songbird events for one bound player into its signal channel.
/// Once the player is detached nothing more is forwarded.
#[derive(Clone)]
pub struct SignalForwarder {
    pub guild_id: serenity::GuildId,
    pub signals: SignalSender,
    pub detached: Arc<AtomicBool>,
}

impl SignalForwarder {
    fn forward(&self, signal: PlayerSignal) {
        if self.detached.load(Ordering::SeqCst) {
            debug!(
                "Dropping {:?} for guild {}: player detached",
                signal, self.guild_id
            );
            return;
        }

        if self.signals.send(signal).is_err() {
            debug!("Countdown for guild {} is no longer listening", self.guild_id);
        }
    }
}

/// Event handler for when a clip ends
pub struct ClipEndNotifier(pub SignalForwarder);

#[async_trait]
impl songbird::EventHandler for ClipEndNotifier {
    async fn act(&self, ctx: &songbird::EventContext<'_>) -> Option<songbird::Event> {
        if let songbird::EventContext::Track(_) = ctx {
            debug!("Clip ended for guild {}", self.0.guild_id);
            self.0.forward(PlayerSignal::Finished);
        }
        None
    }
}

/// Event handler for when a clip fails to play
pub struct ClipErrorNotifier(pub SignalForwarder);

#[async_trait]
impl songbird::EventHandler for ClipErrorNotifier {
    async fn act(&self, ctx: &songbird::EventContext<'_>) -> Option<songbird::Event> {
        if let songbird::EventContext::Track(tracks) = ctx {
            let reason = tracks
                .iter()
                .find_map(|(state, _)| match &state.playing {
                    PlayMode::Errored(err) => Some(err.to_string()),
                    _ => None,
                })
                .unwrap_or_else(|| "audio player error".to_string());

            error!("Audio player error in guild {}: {}", self.0.guild_id, reason);
            self.0.forward(PlayerSignal::Errored(reason));
        }
        None
    }
}

/// Event handler for when the voice driver drops its connection
pub struct ConnectionLostNotifier(pub SignalForwarder);

#[async_trait]
impl songbird::EventHandler for ConnectionLostNotifier {
    async fn act(&self, ctx: &songbird::EventContext<'_>) -> Option<songbird::Event> {
        if let songbird::EventContext::DriverDisconnect(data) = ctx {
            info!(
                "Voice driver disconnected in guild {}: {:?}",
                self.0.guild_id, data.reason
            );
            self.0
                .forward(PlayerSignal::Errored("voice connection lost".to_string()));
        }
        None
    }
}

/// Tracks whether a call's voice driver still has a connection. Outlives
/// every countdown played on the call.
#[derive(Clone)]
pub struct ConnectionWatcher {
    pub guild_id: serenity::GuildId,
    lost: Arc<AtomicBool>,
}

impl ConnectionWatcher {
    pub fn new(guild_id: serenity::GuildId) -> Self {
        Self {
            guild_id,
            lost: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_lost(&self) -> bool {
        self.lost.load(Ordering::SeqCst)
    }

    fn set_lost(&self, lost: bool) {
        self.lost.store(lost, Ordering::SeqCst);
    }
}

#[async_trait]
impl songbird::EventHandler for ConnectionWatcher {
    async fn act(&self, ctx: &songbird::EventContext<'_>) -> Option<songbird::Event> {
        match ctx {
            songbird::EventContext::DriverDisconnect(data) => {
                warn!(
                    "Voice connection lost in guild {}: {:?}",
                    self.guild_id, data.reason
                );
                self.set_lost(true);
            }
            songbird::EventContext::DriverConnect(_) | songbird::EventContext::DriverReconnect(_) => {
                debug!("Voice driver connected in guild {}", self.guild_id);
                self.set_lost(false);
            }
            _ => {}
        }
        None
    }
}
