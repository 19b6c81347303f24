//! Common test utilities, fixtures, and fakes
//! This module contains shared functionality used across the integration tests

pub mod fixtures;

use std::sync::Arc;
use std::time::Duration;

use muffin::commands::voice::utils::voice_service::VoiceService;
use muffin::config::CountdownConfig;

use mocks::{FakeAssetStore, FakeTransport, NoProbe};

/// Configuration with half-second clips, so per-number countdowns have
/// non-zero gaps: from 5 gives 2.5s of clips and four 625ms gaps
pub fn test_config() -> CountdownConfig {
    CountdownConfig {
        assumed_clip: Duration::from_millis(500),
        ..CountdownConfig::default()
    }
}

/// Wire a voice service to fakes
pub fn voice_service(
    config: &CountdownConfig,
    transport: &Arc<FakeTransport>,
    store: FakeAssetStore,
) -> VoiceService {
    VoiceService::new(
        config,
        transport.clone(),
        Arc::new(store),
        Arc::new(NoProbe),
    )
}
