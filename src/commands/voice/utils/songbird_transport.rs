use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use poise::serenity_prelude::{ChannelId, GuildId, async_trait};
use songbird::input::{File, Input};
use songbird::tracks::{Track, TrackHandle};
use songbird::{Call, CoreEvent, Event, Songbird, TrackEvent};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::event_handlers::{
    ClipEndNotifier, ClipErrorNotifier, ConnectionLostNotifier, ConnectionWatcher,
    SignalForwarder,
};
use super::timing_planner::ClipStep;
use super::voice_service::{VoiceError, VoiceResult};
use super::voice_transport::{SignalSender, VoiceConnection, VoicePlayer, VoiceTransport};

/// Voice transport backed by the songbird voice client
pub struct SongbirdTransport {
    songbird: Arc<Songbird>,
}

impl SongbirdTransport {
    pub fn new(songbird: Arc<Songbird>) -> Self {
        Self { songbird }
    }
}

#[async_trait]
impl VoiceTransport for SongbirdTransport {
    async fn open(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> VoiceResult<Arc<dyn VoiceConnection>> {
        let call = self
            .songbird
            .join(guild_id, channel_id)
            .await
            .map_err(|e| VoiceError::JoinError(e.to_string()))?;

        info!("Joined voice channel {} in guild {}", channel_id, guild_id);

        let watcher = ConnectionWatcher::new(guild_id);
        watch_connection(&mut *call.lock().await, &watcher);

        Ok(Arc::new(SongbirdConnection {
            guild_id,
            channel_id,
            songbird: Arc::clone(&self.songbird),
            call,
            watcher,
        }))
    }
}

/// Register the handlers that keep `watcher` up to date. Needed again after
/// every `remove_all_global_events`.
fn watch_connection(call: &mut Call, watcher: &ConnectionWatcher) {
    for event in [
        CoreEvent::DriverConnect,
        CoreEvent::DriverReconnect,
        CoreEvent::DriverDisconnect,
    ] {
        call.add_global_event(Event::Core(event), watcher.clone());
    }
}

/// A songbird call in one guild
pub struct SongbirdConnection {
    guild_id: GuildId,
    channel_id: ChannelId,
    songbird: Arc<Songbird>,
    call: Arc<Mutex<Call>>,
    watcher: ConnectionWatcher,
}

#[async_trait]
impl VoiceConnection for SongbirdConnection {
    fn channel_id(&self) -> ChannelId {
        self.channel_id
    }

    async fn is_alive(&self) -> bool {
        // A kick shows up as the call losing its channel
        !self.watcher.is_lost() && self.call.lock().await.current_channel().is_some()
    }

    async fn bind_player(&self, signals: SignalSender) -> VoiceResult<Box<dyn VoicePlayer>> {
        let forwarder = SignalForwarder {
            guild_id: self.guild_id,
            signals,
            detached: Arc::new(AtomicBool::new(false)),
        };

        {
            let mut call = self.call.lock().await;
            // A previous countdown's handlers must not outlive it
            call.remove_all_global_events();
            watch_connection(&mut call, &self.watcher);
            call.add_global_event(
                Event::Core(CoreEvent::DriverDisconnect),
                ConnectionLostNotifier(forwarder.clone()),
            );
        }

        Ok(Box::new(SongbirdPlayer {
            call: Arc::clone(&self.call),
            forwarder,
            watcher: self.watcher.clone(),
            current: None,
        }))
    }

    async fn destroy(&self) -> VoiceResult<()> {
        self.songbird
            .remove(self.guild_id)
            .await
            .map_err(|e| VoiceError::JoinError(e.to_string()))?;

        info!(
            "Left voice channel {} in guild {}",
            self.channel_id, self.guild_id
        );
        Ok(())
    }
}

/// Plays countdown clips on a songbird call
pub struct SongbirdPlayer {
    call: Arc<Mutex<Call>>,
    forwarder: SignalForwarder,
    watcher: ConnectionWatcher,
    current: Option<TrackHandle>,
}

#[async_trait]
impl VoicePlayer for SongbirdPlayer {
    async fn submit(&mut self, step: &ClipStep) -> VoiceResult<()> {
        let input: Input = File::new(step.source.path.clone()).into();
        let seeking = !step.start_offset.is_zero();

        // Hold seeking tracks until they sit at their offset
        let track = if seeking {
            Track::from(input).pause()
        } else {
            Track::from(input)
        };

        let handle = {
            let mut call = self.call.lock().await;
            call.play_only(track)
        };

        handle
            .add_event(
                Event::Track(TrackEvent::End),
                ClipEndNotifier(self.forwarder.clone()),
            )
            .map_err(|e| VoiceError::PlaybackFailure(e.to_string()))?;
        handle
            .add_event(
                Event::Track(TrackEvent::Error),
                ClipErrorNotifier(self.forwarder.clone()),
            )
            .map_err(|e| VoiceError::PlaybackFailure(e.to_string()))?;

        if seeking {
            handle
                .seek_async(step.start_offset)
                .await
                .map_err(|e| VoiceError::PlaybackFailure(e.to_string()))?;
            handle
                .play()
                .map_err(|e| VoiceError::PlaybackFailure(e.to_string()))?;
        }

        debug!(
            "Playing {} for guild {} from {:?}",
            step.source.id, self.forwarder.guild_id, step.start_offset
        );

        self.current = Some(handle);
        Ok(())
    }

    async fn stop(&mut self) {
        self.forwarder.detached.store(true, Ordering::SeqCst);

        if let Some(handle) = self.current.take() {
            if let Err(e) = handle.stop() {
                debug!(
                    "Clip for guild {} already stopped: {}",
                    self.forwarder.guild_id, e
                );
            }
        }

        let mut call = self.call.lock().await;
        call.remove_all_global_events();
        watch_connection(&mut call, &self.watcher);
    }
}
