use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use super::voice_service::{VoiceError, VoiceResult};

/// Countdown lengths that have a pre-cut composite clip
pub const COMPOSITE_DURATIONS: [u32; 6] = [10, 20, 30, 40, 50, 60];

/// Smallest and largest number accepted for a per-number countdown
pub const MIN_COUNTDOWN_NUMBER: u32 = 5;
pub const MAX_COUNTDOWN_NUMBER: u32 = 60;

/// Identifier of the master clip that holds the full-length countdown
pub const MASTER_CLIP_ID: &str = "countdown";

/// What a user asked to count down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownRequest {
    /// One clip per number, from `from` down to 1
    Numbers { from: u32 },
    /// A single clip covering `seconds` of countdown
    Composite { seconds: u32 },
}

impl CountdownRequest {
    /// Target length of the countdown in whole seconds
    pub fn seconds(&self) -> u32 {
        match self {
            CountdownRequest::Numbers { from } => *from,
            CountdownRequest::Composite { seconds } => *seconds,
        }
    }
}

/// How composite countdowns are addressed on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositeAddressing {
    /// One pre-cut clip per allowed duration (`countdown10`, `countdown20`, ...)
    Lookup,
    /// A single master clip, played from an offset
    Seek,
}

/// A clip on durable storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClipAsset {
    pub id: String,
    pub path: PathBuf,
}

/// Durable storage for countdown clips
#[cfg_attr(test, mockall::automock)]
pub trait AssetStore: Send + Sync {
    /// Where the clip with this identifier lives
    fn locate(&self, id: &str) -> PathBuf;

    /// Whether the clip with this identifier can be opened
    fn exists(&self, id: &str) -> bool;
}

/// Asset store backed by a directory of `<id>.<extension>` files
pub struct DirectoryAssetStore {
    root: PathBuf,
    extension: String,
}

impl DirectoryAssetStore {
    pub fn new(root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            extension: extension.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AssetStore for DirectoryAssetStore {
    fn locate(&self, id: &str) -> PathBuf {
        self.root.join(format!("{}.{}", id, self.extension))
    }

    fn exists(&self, id: &str) -> bool {
        self.locate(id).is_file()
    }
}

/// Maps countdown requests to the clips that play them
#[derive(Clone)]
pub struct AssetResolver {
    store: Arc<dyn AssetStore>,
    composite: CompositeAddressing,
}

impl AssetResolver {
    pub fn new(store: Arc<dyn AssetStore>, composite: CompositeAddressing) -> Self {
        Self { store, composite }
    }

    pub fn composite_addressing(&self) -> CompositeAddressing {
        self.composite
    }

    /// Resolve a request into the ordered clips that play it.
    ///
    /// Per-number requests skip missing numbers and only fail when nothing at
    /// all is available. Composite requests depend on a single clip and fail
    /// when it is missing.
    pub fn resolve(&self, request: CountdownRequest) -> VoiceResult<Vec<ClipAsset>> {
        match request {
            CountdownRequest::Numbers { from } => self.resolve_numbers(from),
            CountdownRequest::Composite { seconds } => match self.composite {
                CompositeAddressing::Lookup => {
                    ensure_composite_duration(seconds)?;
                    let id = composite_clip_id(seconds);
                    self.require(&id).map(|asset| vec![asset])
                }
                CompositeAddressing::Seek => {
                    if seconds == 0 {
                        return Err(VoiceError::DurationNotSupported(seconds));
                    }
                    self.require(MASTER_CLIP_ID).map(|asset| vec![asset])
                }
            },
        }
    }

    fn resolve_numbers(&self, from: u32) -> VoiceResult<Vec<ClipAsset>> {
        if !(MIN_COUNTDOWN_NUMBER..=MAX_COUNTDOWN_NUMBER).contains(&from) {
            return Err(VoiceError::DurationNotSupported(from));
        }

        let assets: Vec<ClipAsset> = (1..=from)
            .rev()
            .filter_map(|number| {
                let id = number.to_string();
                if self.store.exists(&id) {
                    Some(self.asset(id))
                } else {
                    warn!(
                        "Audio clip not found, skipping: {}",
                        self.store.locate(&id).display()
                    );
                    None
                }
            })
            .collect();

        if assets.is_empty() {
            return Err(VoiceError::AssetNotFound(format!(
                "no clips available for a countdown from {}",
                from
            )));
        }

        debug!("Resolved {} of {} countdown clips", assets.len(), from);
        Ok(assets)
    }

    fn require(&self, id: &str) -> VoiceResult<ClipAsset> {
        if self.store.exists(id) {
            Ok(self.asset(id.to_string()))
        } else {
            let path = self.store.locate(id);
            let file_name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| id.to_string());
            Err(VoiceError::AssetNotFound(file_name))
        }
    }

    fn asset(&self, id: String) -> ClipAsset {
        let path = self.store.locate(&id);
        ClipAsset { id, path }
    }
}

/// Identifier of the pre-cut clip for a composite countdown.
/// The full-length clip doubles as the master.
pub fn composite_clip_id(seconds: u32) -> String {
    if Some(&seconds) == COMPOSITE_DURATIONS.last() {
        MASTER_CLIP_ID.to_string()
    } else {
        format!("{}{}", MASTER_CLIP_ID, seconds)
    }
}

pub fn ensure_composite_duration(seconds: u32) -> VoiceResult<()> {
    if COMPOSITE_DURATIONS.contains(&seconds) {
        Ok(())
    } else {
        Err(VoiceError::DurationNotSupported(seconds))
    }
}
