//! The countdown state machine.
//!
//! [`PlaybackScheduler`] is a pure transition table: it takes an event and
//! returns the single action the runner must perform next. [`CountdownRunner`]
//! performs those actions against a bound [`VoicePlayer`], turning player
//! signals and gap timers back into events.

use std::time::Duration;

use poise::serenity_prelude::GuildId;
use tokio::sync::{oneshot, watch};
use tracing::{debug, error, info, warn};

use super::timing_planner::CountdownPlan;
use super::voice_transport::{PlayerSignal, SignalReceiver, VoicePlayer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackStatus {
    Idle,
    Playing,
    AwaitingGap,
    Finished,
    Failed,
    Cancelled,
}

impl PlaybackStatus {
    /// Whether the countdown has not reached an end state yet
    pub fn is_active(self) -> bool {
        matches!(
            self,
            PlaybackStatus::Idle | PlaybackStatus::Playing | PlaybackStatus::AwaitingGap
        )
    }
}

/// Progress of one countdown
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackState {
    pub step: usize,
    pub status: PlaybackStatus,
    pub failure: Option<String>,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            step: 0,
            status: PlaybackStatus::Idle,
            failure: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerEvent {
    Start,
    ClipFinished,
    GapElapsed,
    PlayerError(String),
    Cancel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerAction {
    /// Submit the step at this index to the player
    Submit(usize),
    /// Wait this long, then deliver `GapElapsed`
    WaitGap(Duration),
    /// Every step played
    Complete,
    /// Playback failed; stop advancing
    Abort(String),
    /// Playback was cancelled; stop advancing
    Halt,
}

/// State machine over one countdown plan
pub struct PlaybackScheduler {
    plan: CountdownPlan,
    state: PlaybackState,
}

impl PlaybackScheduler {
    pub fn new(plan: CountdownPlan) -> Self {
        Self {
            plan,
            state: PlaybackState::default(),
        }
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn plan(&self) -> &CountdownPlan {
        &self.plan
    }

    /// Apply an event. Events that make no sense in the current state (late
    /// signals, timers after an end state) are ignored and yield no action.
    pub fn handle(&mut self, event: SchedulerEvent) -> Option<SchedulerAction> {
        use PlaybackStatus::*;

        match (self.state.status, event) {
            (Idle, SchedulerEvent::Start) => {
                if self.plan.is_empty() {
                    self.state.status = Finished;
                    return Some(SchedulerAction::Complete);
                }
                self.state.status = Playing;
                Some(SchedulerAction::Submit(self.state.step))
            }
            (Playing, SchedulerEvent::ClipFinished) => {
                let step = self.state.step;
                if step + 1 < self.plan.len() {
                    self.state.status = AwaitingGap;
                    let gap = self.plan.step(step).map(|s| s.gap_after).unwrap_or_default();
                    Some(SchedulerAction::WaitGap(gap))
                } else {
                    self.state.status = Finished;
                    Some(SchedulerAction::Complete)
                }
            }
            (AwaitingGap, SchedulerEvent::GapElapsed) => {
                self.state.step += 1;
                self.state.status = Playing;
                Some(SchedulerAction::Submit(self.state.step))
            }
            (Playing | AwaitingGap, SchedulerEvent::PlayerError(reason)) => {
                self.state.status = Failed;
                self.state.failure = Some(reason.clone());
                Some(SchedulerAction::Abort(reason))
            }
            (Idle | Playing | AwaitingGap, SchedulerEvent::Cancel) => {
                self.state.status = Cancelled;
                Some(SchedulerAction::Halt)
            }
            (status, event) => {
                debug!("Ignoring {:?} while {:?}", event, status);
                None
            }
        }
    }
}

/// Drives a [`PlaybackScheduler`] against a bound player until the countdown
/// ends, fails or is cancelled
pub struct CountdownRunner {
    pub guild_id: GuildId,
    pub scheduler: PlaybackScheduler,
    pub player: Box<dyn VoicePlayer>,
    pub signals: SignalReceiver,
    pub cancel: oneshot::Receiver<()>,
    pub state: watch::Sender<PlaybackState>,
    pub start_delay: Duration,
}

impl CountdownRunner {
    pub async fn run(mut self) {
        // Let a freshly opened connection settle before the first clip
        let mut next = Some(SchedulerEvent::Start);
        if !self.start_delay.is_zero() {
            let cancelled = tokio::select! {
                biased;
                _ = &mut self.cancel => true,
                _ = tokio::time::sleep(self.start_delay) => false,
            };
            if cancelled {
                next = Some(SchedulerEvent::Cancel);
            }
        }

        while let Some(event) = next.take() {
            let Some(action) = self.apply(event).await else {
                break;
            };

            next = match action {
                SchedulerAction::Submit(index) => self.submit(index).await,
                SchedulerAction::WaitGap(gap) => self.wait_gap(gap).await,
                SchedulerAction::Complete => {
                    info!("Countdown finished for guild {}", self.guild_id);
                    None
                }
                SchedulerAction::Abort(reason) => {
                    error!("Countdown failed for guild {}: {}", self.guild_id, reason);
                    None
                }
                SchedulerAction::Halt => {
                    info!("Countdown cancelled for guild {}", self.guild_id);
                    None
                }
            };
        }
    }

    /// Feed an event to the scheduler and publish the resulting state.
    /// The player is stopped before an end state becomes visible.
    async fn apply(&mut self, event: SchedulerEvent) -> Option<SchedulerAction> {
        let action = self.scheduler.handle(event);

        if action.is_some() {
            if !self.scheduler.state().status.is_active() {
                self.player.stop().await;
            }
            self.state.send_replace(self.scheduler.state().clone());
        }

        action
    }

    async fn submit(&mut self, index: usize) -> Option<SchedulerEvent> {
        let Some(step) = self.scheduler.plan().step(index).cloned() else {
            return Some(SchedulerEvent::PlayerError(format!(
                "step {} is not in the plan",
                index
            )));
        };

        debug!(
            "Submitting step {} ({}) for guild {}",
            index, step.source.id, self.guild_id
        );

        if let Err(e) = self.player.submit(&step).await {
            return Some(SchedulerEvent::PlayerError(e.to_string()));
        }

        self.wait_for_signal().await
    }

    async fn wait_for_signal(&mut self) -> Option<SchedulerEvent> {
        tokio::select! {
            biased;
            _ = &mut self.cancel => Some(SchedulerEvent::Cancel),
            signal = self.signals.recv() => Some(signal_event(signal)),
        }
    }

    async fn wait_gap(&mut self, gap: Duration) -> Option<SchedulerEvent> {
        let timer = tokio::time::sleep(gap);
        tokio::pin!(timer);

        loop {
            tokio::select! {
                biased;
                _ = &mut self.cancel => return Some(SchedulerEvent::Cancel),
                signal = self.signals.recv() => match signal {
                    Some(PlayerSignal::Finished) => {
                        warn!("Ignoring stray clip end during gap for guild {}", self.guild_id);
                    }
                    other => return Some(signal_event(other)),
                },
                _ = &mut timer => return Some(SchedulerEvent::GapElapsed),
            }
        }
    }
}

fn signal_event(signal: Option<PlayerSignal>) -> SchedulerEvent {
    match signal {
        Some(PlayerSignal::Finished) => SchedulerEvent::ClipFinished,
        Some(PlayerSignal::Errored(reason)) => SchedulerEvent::PlayerError(reason),
        None => SchedulerEvent::PlayerError("player stopped reporting".to_string()),
    }
}
