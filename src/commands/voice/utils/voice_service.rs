use std::sync::Arc;
use std::time::Duration;

use poise::serenity_prelude::{ChannelId, GuildId};
use songbird::Songbird;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::asset_resolver::{
    AssetResolver, AssetStore, CompositeAddressing, CountdownRequest, DirectoryAssetStore,
};
use super::connection_registry::ConnectionRegistry;
use super::countdown_manager::CountdownManager;
use super::media_probe::SymphoniaProbe;
use super::playback_scheduler::PlaybackState;
use super::songbird_transport::SongbirdTransport;
use super::timing_planner::{CountdownPlan, DurationProbe, TimingMode, TimingPlanner};
use super::voice_transport::VoiceTransport;
use crate::config::{CountdownConfig, NumberTiming};

/// How long leave/stop wait for a cancelled countdown to halt
const CANCEL_GRACE: Duration = Duration::from_secs(2);

/// Errors that can occur during voice operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VoiceError {
    #[error("Not in a guild")]
    NotInGuild,

    #[error("You need to be in a voice channel to use this command!")]
    UserNotInVoiceChannel,

    #[error("I need permission to connect and speak in your voice channel!")]
    MissingPermissions,

    #[error("Audio file not found: {0}")]
    AssetNotFound(String),

    #[error("A {0} second countdown is not supported")]
    DurationNotSupported(u32),

    #[error("A countdown is already running in this server")]
    AlreadyInProgress,

    #[error("I'm not currently in a voice channel!")]
    NotConnected,

    #[error("No countdown is running")]
    NothingPlaying,

    #[error("Failed to join voice channel: {0}")]
    JoinError(String),

    #[error("Playback failed: {0}")]
    PlaybackFailure(String),
}

/// Result type for voice operations
pub type VoiceResult<T> = Result<T, VoiceError>;

/// Outcome of a join request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinOutcome {
    pub channel_id: ChannelId,
    pub already_connected: bool,
}

/// A countdown that has been handed to the scheduler
#[derive(Debug)]
pub struct CountdownStarted {
    pub clips: usize,
    pub target: Duration,
    pub state: watch::Receiver<PlaybackState>,
}

/// Everything the voice commands need, shared through the framework data
pub struct VoiceService {
    connections: ConnectionRegistry,
    countdowns: CountdownManager,
    resolver: AssetResolver,
    planner: TimingPlanner,
    number_timing: NumberTiming,
    assumed_clip: Duration,
    master_length: Duration,
}

impl VoiceService {
    pub fn new(
        config: &CountdownConfig,
        transport: Arc<dyn VoiceTransport>,
        store: Arc<dyn AssetStore>,
        probe: Arc<dyn DurationProbe>,
    ) -> Self {
        Self {
            connections: ConnectionRegistry::new(transport),
            countdowns: CountdownManager::new(config.start_delay),
            resolver: AssetResolver::new(store, config.composite),
            planner: TimingPlanner::new(probe),
            number_timing: config.number_timing,
            assumed_clip: config.assumed_clip,
            master_length: config.master_length,
        }
    }

    /// The production wiring: songbird for voice, clips from a directory,
    /// symphonia for measuring them
    pub fn with_songbird(config: &CountdownConfig, songbird: Arc<Songbird>) -> Self {
        let store = DirectoryAssetStore::new(&config.audio_dir, &config.clip_extension);
        info!("Serving countdown clips from {}", store.root().display());

        Self::new(
            config,
            Arc::new(SongbirdTransport::new(songbird)),
            Arc::new(store),
            Arc::new(SymphoniaProbe),
        )
    }

    pub fn connections(&self) -> &ConnectionRegistry {
        &self.connections
    }

    pub fn countdown_state(&self, guild_id: GuildId) -> Option<PlaybackState> {
        self.countdowns.state(guild_id)
    }

    /// Join a voice channel, or stay in the current one
    pub async fn join(&self, guild_id: GuildId, channel_id: ChannelId) -> VoiceResult<JoinOutcome> {
        if let Some(connection) = self.connections.get(guild_id).await {
            return Ok(JoinOutcome {
                channel_id: connection.channel_id(),
                already_connected: true,
            });
        }

        let connection = self.connections.acquire(guild_id, channel_id).await?;
        Ok(JoinOutcome {
            channel_id: connection.channel_id(),
            already_connected: false,
        })
    }

    /// Stop any countdown and leave the voice channel
    pub async fn leave(&self, guild_id: GuildId) -> VoiceResult<()> {
        match self.stop(guild_id).await {
            Ok(()) | Err(VoiceError::NothingPlaying) => {}
            Err(e) => warn!("Failed to stop countdown before leaving: {}", e),
        }

        self.connections.release(guild_id).await
    }

    /// Stop the running countdown but stay connected
    pub async fn stop(&self, guild_id: GuildId) -> VoiceResult<()> {
        let mut state = self.countdowns.cancel(guild_id)?;

        let halted = tokio::time::timeout(
            CANCEL_GRACE,
            state.wait_for(|state| !state.status.is_active()),
        )
        .await
        .is_ok();

        if !halted {
            warn!(
                "Countdown for guild {} did not halt within {:?}",
                guild_id, CANCEL_GRACE
            );
        }
        Ok(())
    }

    /// Resolve and time a countdown without touching any connection. Clip
    /// lookups and probes hit the filesystem, so they run on the blocking pool.
    pub async fn plan(&self, request: CountdownRequest) -> VoiceResult<CountdownPlan> {
        let resolver = self.resolver.clone();
        let planner = self.planner.clone();
        let mode = self.timing_mode(request);
        let target = Duration::from_secs(u64::from(request.seconds()));

        tokio::task::spawn_blocking(move || {
            let assets = resolver.resolve(request)?;
            planner.plan(assets, target, mode)
        })
        .await
        .map_err(|e| VoiceError::PlaybackFailure(format!("countdown planning stopped: {}", e)))?
    }

    /// Check that a countdown may start in the guild and build its plan.
    /// Nothing is joined yet, so every error here is cheap to report.
    pub async fn prepare_countdown(
        &self,
        guild_id: GuildId,
        request: CountdownRequest,
    ) -> VoiceResult<CountdownPlan> {
        if self.countdowns.is_active(guild_id) {
            return Err(VoiceError::AlreadyInProgress);
        }

        let plan = self.plan(request).await?;
        debug!(
            "Countdown for guild {}: {} clip(s) over {:?}",
            guild_id,
            plan.len(),
            plan.target()
        );
        Ok(plan)
    }

    /// Play a prepared countdown, joining `channel_id` if not connected
    pub async fn start_countdown(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
        plan: CountdownPlan,
    ) -> VoiceResult<CountdownStarted> {
        // Another countdown may have started while this one was planned
        if self.countdowns.is_active(guild_id) {
            return Err(VoiceError::AlreadyInProgress);
        }

        let clips = plan.len();
        let target = plan.target();

        let connection = self.connections.acquire(guild_id, channel_id).await?;
        let state = self.countdowns.start(guild_id, connection, plan).await?;

        Ok(CountdownStarted {
            clips,
            target,
            state,
        })
    }

    /// Prepare and start a countdown in one go
    pub async fn countdown(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
        request: CountdownRequest,
    ) -> VoiceResult<CountdownStarted> {
        let plan = self.prepare_countdown(guild_id, request).await?;
        self.start_countdown(guild_id, channel_id, plan).await
    }

    /// Cancel every countdown and leave every channel
    pub async fn shutdown(&self) {
        self.countdowns.cancel_all();
        self.connections.release_all().await;
    }

    fn timing_mode(&self, request: CountdownRequest) -> TimingMode {
        match request {
            CountdownRequest::Numbers { .. } => match self.number_timing {
                NumberTiming::EqualSpacing => TimingMode::EqualSpacing {
                    assumed_clip: self.assumed_clip,
                },
                NumberTiming::Measured => TimingMode::Measured {
                    assumed_clip: self.assumed_clip,
                },
            },
            CountdownRequest::Composite { .. } => match self.resolver.composite_addressing() {
                CompositeAddressing::Lookup => TimingMode::CompositeLookup,
                CompositeAddressing::Seek => TimingMode::Seek {
                    master_length: self.master_length,
                },
            },
        }
    }
}
