use std::time::Duration;

// Export voice utilities
pub mod asset_resolver;
pub mod connection_registry;
pub mod countdown_manager;
pub mod embedded_messages;
pub mod event_handlers;
pub mod media_probe;
pub mod playback_scheduler;
pub mod preconditions;
pub mod songbird_transport;
pub mod timing_planner;
pub mod voice_service;
pub mod voice_transport;

/// Format a duration into a human-readable string (e.g., "45s" or "1m 30s")
pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;

    if minutes > 0 && seconds > 0 {
        format!("{}m {}s", minutes, seconds)
    } else if minutes > 0 {
        format!("{}m", minutes)
    } else {
        format!("{}s", seconds)
    }
}
