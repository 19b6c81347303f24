use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use super::asset_resolver::{COMPOSITE_DURATIONS, ClipAsset};
use super::voice_service::{VoiceError, VoiceResult};

/// How the gaps and offsets of a countdown are worked out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimingMode {
    /// Every clip is assumed to last `assumed_clip`; the remaining time is
    /// spread evenly between clips.
    EqualSpacing { assumed_clip: Duration },
    /// Like `EqualSpacing`, but each clip's length is probed first.
    /// Clips that cannot be probed fall back to `assumed_clip`.
    Measured { assumed_clip: Duration },
    /// One master clip, played from `master_length - target`.
    Seek { master_length: Duration },
    /// One pre-cut clip whose length is the target.
    CompositeLookup,
}

/// Reads the real playing time of a clip
pub trait DurationProbe: Send + Sync {
    fn probe(&self, path: &Path) -> Option<Duration>;
}

/// One clip to play, and how long to wait after it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClipStep {
    pub source: ClipAsset,
    #[serde(with = "humantime_serde")]
    pub start_offset: Duration,
    #[serde(with = "humantime_serde")]
    pub estimated_duration: Duration,
    #[serde(with = "humantime_serde")]
    pub gap_after: Duration,
}

/// The ordered, timed steps of one countdown
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountdownPlan {
    steps: Vec<ClipStep>,
    #[serde(with = "humantime_serde")]
    target: Duration,
}

impl CountdownPlan {
    pub fn steps(&self) -> &[ClipStep] {
        &self.steps
    }

    pub fn step(&self, index: usize) -> Option<&ClipStep> {
        self.steps.get(index)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn target(&self) -> Duration {
        self.target
    }

    /// The gaps between consecutive steps (one fewer than the steps)
    pub fn gaps(&self) -> impl Iterator<Item = Duration> + '_ {
        let between = self.steps.len().saturating_sub(1);
        self.steps[..between].iter().map(|step| step.gap_after)
    }

    /// Estimated playing time of the whole plan, gaps included
    pub fn estimated_total(&self) -> Duration {
        self.steps
            .iter()
            .map(|step| step.estimated_duration + step.gap_after)
            .sum()
    }
}

/// Turns resolved clips into a timed plan
#[derive(Clone)]
pub struct TimingPlanner {
    probe: Arc<dyn DurationProbe>,
}

impl TimingPlanner {
    pub fn new(probe: Arc<dyn DurationProbe>) -> Self {
        Self { probe }
    }

    pub fn plan(
        &self,
        assets: Vec<ClipAsset>,
        target: Duration,
        mode: TimingMode,
    ) -> VoiceResult<CountdownPlan> {
        if assets.is_empty() {
            return Err(VoiceError::AssetNotFound(
                "no clips to build a countdown from".to_string(),
            ));
        }

        let plan = match mode {
            TimingMode::EqualSpacing { assumed_clip } => {
                spaced_plan(assets, target, |_| assumed_clip)
            }
            TimingMode::Measured { assumed_clip } => {
                spaced_plan(assets, target, |asset| self.measure(asset, assumed_clip))
            }
            TimingMode::Seek { master_length } => {
                let start_offset = seek_offset(master_length, target)?;
                let estimated_duration = if master_length.is_zero() {
                    target
                } else {
                    master_length - start_offset
                };
                single_step_plan(assets, target, start_offset, estimated_duration)
            }
            TimingMode::CompositeLookup => {
                let seconds = whole_seconds(target);
                if target.subsec_nanos() != 0 || !COMPOSITE_DURATIONS.contains(&seconds) {
                    return Err(VoiceError::DurationNotSupported(seconds));
                }
                single_step_plan(assets, target, Duration::ZERO, target)
            }
        };

        debug!(
            "Planned countdown: {}",
            serde_json::to_string(&plan).unwrap_or_else(|e| e.to_string())
        );

        Ok(plan)
    }

    fn measure(&self, asset: &ClipAsset, assumed_clip: Duration) -> Duration {
        match self.probe.probe(&asset.path) {
            Some(measured) => measured,
            None => {
                debug!(
                    "Could not probe {}, assuming {:?}",
                    asset.path.display(),
                    assumed_clip
                );
                assumed_clip
            }
        }
    }
}

/// Gap that spreads `target - clips_total` evenly over the `count - 1`
/// spaces between clips. Never negative; a single clip has no gap.
pub fn equal_gap(target: Duration, clips_total: Duration, count: usize) -> Duration {
    if count < 2 {
        return Duration::ZERO;
    }

    let spaces = u32::try_from(count - 1).unwrap_or(u32::MAX);
    target.saturating_sub(clips_total) / spaces
}

/// Offset into a master clip so that the remaining audio lasts `target`,
/// clamped into `[0, master_length)`.
pub fn seek_offset(master_length: Duration, target: Duration) -> VoiceResult<Duration> {
    if target.is_zero() {
        return Err(VoiceError::DurationNotSupported(0));
    }

    Ok(master_length.saturating_sub(target))
}

fn spaced_plan(
    assets: Vec<ClipAsset>,
    target: Duration,
    estimate: impl Fn(&ClipAsset) -> Duration,
) -> CountdownPlan {
    let estimates: Vec<Duration> = assets.iter().map(estimate).collect();
    let gap = equal_gap(target, estimates.iter().sum(), assets.len());
    let last = assets.len() - 1;

    let steps = assets
        .into_iter()
        .zip(estimates)
        .enumerate()
        .map(|(index, (source, estimated_duration))| ClipStep {
            source,
            start_offset: Duration::ZERO,
            estimated_duration,
            gap_after: if index == last { Duration::ZERO } else { gap },
        })
        .collect();

    CountdownPlan { steps, target }
}

fn single_step_plan(
    assets: Vec<ClipAsset>,
    target: Duration,
    start_offset: Duration,
    estimated_duration: Duration,
) -> CountdownPlan {
    let steps = assets
        .into_iter()
        .take(1)
        .map(|source| ClipStep {
            source,
            start_offset,
            estimated_duration,
            gap_after: Duration::ZERO,
        })
        .collect();

    CountdownPlan { steps, target }
}

fn whole_seconds(duration: Duration) -> u32 {
    u32::try_from(duration.as_secs()).unwrap_or(u32::MAX)
}
