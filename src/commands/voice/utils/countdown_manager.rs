use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use poise::serenity_prelude::GuildId;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use super::playback_scheduler::{CountdownRunner, PlaybackScheduler, PlaybackState, PlaybackStatus};
use super::timing_planner::CountdownPlan;
use super::voice_service::{VoiceError, VoiceResult};
use super::voice_transport::VoiceConnection;

/// The countdown occupying a guild
struct CountdownHandle {
    state: watch::Receiver<PlaybackState>,
    cancel: Option<oneshot::Sender<()>>,
}

impl CountdownHandle {
    fn is_active(&self) -> bool {
        self.state.borrow().status.is_active()
    }
}

/// Tracks the one in-flight countdown each guild may have
pub struct CountdownManager {
    // Map of guild ID to its most recent countdown
    active: DashMap<GuildId, CountdownHandle>,
    start_delay: Duration,
}

impl CountdownManager {
    pub fn new(start_delay: Duration) -> Self {
        Self {
            active: DashMap::new(),
            start_delay,
        }
    }

    /// Whether a countdown is running (or about to) in this guild
    pub fn is_active(&self, guild_id: GuildId) -> bool {
        self.active
            .get(&guild_id)
            .is_some_and(|handle| handle.is_active())
    }

    /// The state of the guild's most recent countdown
    pub fn state(&self, guild_id: GuildId) -> Option<PlaybackState> {
        self.active
            .get(&guild_id)
            .map(|handle| handle.state.borrow().clone())
    }

    /// Start playing `plan` on `connection`. Returns a watch on the
    /// countdown's progress. A guild with a countdown still running gets
    /// `AlreadyInProgress` and the running countdown is left alone.
    pub async fn start(
        &self,
        guild_id: GuildId,
        connection: Arc<dyn VoiceConnection>,
        plan: CountdownPlan,
    ) -> VoiceResult<watch::Receiver<PlaybackState>> {
        let (state_tx, state_rx) = watch::channel(PlaybackState::default());
        let (cancel_tx, cancel_rx) = oneshot::channel();

        // Reserve the guild before anything awaits
        let handle = CountdownHandle {
            state: state_rx.clone(),
            cancel: Some(cancel_tx),
        };
        match self.active.entry(guild_id) {
            Entry::Occupied(entry) if entry.get().is_active() => {
                warn!("Countdown already in progress for guild {}", guild_id);
                return Err(VoiceError::AlreadyInProgress);
            }
            Entry::Occupied(mut entry) => {
                entry.insert(handle);
            }
            Entry::Vacant(entry) => {
                entry.insert(handle);
            }
        }

        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let player = match connection.bind_player(signal_tx).await {
            Ok(player) => player,
            Err(e) => {
                state_tx.send_replace(PlaybackState {
                    status: PlaybackStatus::Failed,
                    failure: Some(e.to_string()),
                    ..PlaybackState::default()
                });
                return Err(e);
            }
        };

        info!(
            "Starting countdown of {} clip(s) for guild {}",
            plan.len(),
            guild_id
        );

        let runner = CountdownRunner {
            guild_id,
            scheduler: PlaybackScheduler::new(plan),
            player,
            signals: signal_rx,
            cancel: cancel_rx,
            state: state_tx,
            start_delay: self.start_delay,
        };
        tokio::spawn(runner.run());

        Ok(state_rx)
    }

    /// Ask the guild's countdown to stop. Returns a watch that reaches an end
    /// state once the countdown has halted.
    pub fn cancel(&self, guild_id: GuildId) -> VoiceResult<watch::Receiver<PlaybackState>> {
        let mut handle = self
            .active
            .get_mut(&guild_id)
            .ok_or(VoiceError::NothingPlaying)?;

        if !handle.is_active() {
            return Err(VoiceError::NothingPlaying);
        }

        if let Some(cancel) = handle.cancel.take() {
            debug!("Cancelling countdown for guild {}", guild_id);
            // The runner may have just finished on its own
            let _ = cancel.send(());
        }

        Ok(handle.state.clone())
    }

    /// Cancel every running countdown, used on shutdown
    pub fn cancel_all(&self) {
        for mut handle in self.active.iter_mut() {
            if let Some(cancel) = handle.cancel.take() {
                let _ = cancel.send(());
            }
        }
    }
}
