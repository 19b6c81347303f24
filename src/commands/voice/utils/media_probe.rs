use std::fs::File;
use std::path::Path;
use std::time::Duration;

use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

use super::timing_planner::DurationProbe;

/// Reads clip lengths from container headers with symphonia
pub struct SymphoniaProbe;

impl DurationProbe for SymphoniaProbe {
    fn probe(&self, path: &Path) -> Option<Duration> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) => {
                debug!("Failed to open {} for probing: {}", path.display(), e);
                return None;
            }
        };

        let stream = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
            hint.with_extension(extension);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                stream,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| debug!("Failed to probe {}: {}", path.display(), e))
            .ok()?;

        let track = probed.format.default_track()?;
        let frames = track.codec_params.n_frames?;
        let time = track.codec_params.time_base?.calc_time(frames);

        Some(Duration::from_secs(time.seconds) + Duration::from_secs_f64(time.frac))
    }
}
