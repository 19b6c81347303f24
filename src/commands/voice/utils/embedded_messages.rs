use poise::{serenity_prelude as serenity, CreateReply};
use serenity::all::{ChannelId, CreateEmbed};

use super::asset_resolver::CountdownRequest;
use super::format_duration;
use super::voice_service::{CountdownStarted, JoinOutcome, VoiceError};

/// Create an embed for when a countdown has been scheduled
pub fn countdown_started(request: CountdownRequest, started: &CountdownStarted) -> CreateReply {
    let description = match request {
        CountdownRequest::Numbers { from } => format!("Starting countdown from {}! 🎯", from),
        CountdownRequest::Composite { seconds } => {
            format!("Starting {} second countdown! 🎯", seconds)
        }
    };

    CreateReply::default().embed(
        CreateEmbed::new()
            .title("⏱️ Countdown")
            .description(description)
            .field("Length", format!("`{}`", format_duration(started.target)), true)
            .field("Clips", format!("`{}`", started.clips), true)
            .color(0x00ff00),
    )
}

/// Create an embed for when a countdown dies part way through
pub fn countdown_failed(reason: &str) -> CreateEmbed {
    CreateEmbed::new()
        .title("❌ Countdown Failed")
        .description(format!("The countdown stopped early: {}", reason))
        .color(0xff0000)
}

/// Create an embed for a join request
pub fn joined(outcome: &JoinOutcome) -> CreateReply {
    let embed = if outcome.already_connected {
        CreateEmbed::new()
            .title("🔊 Already Here")
            .description(format!("I'm already in <#{}>", outcome.channel_id))
    } else {
        CreateEmbed::new()
            .title("🔊 Joined Voice Channel")
            .description(format!("Joined <#{}>!", outcome.channel_id))
    };

    CreateReply::default().embed(embed.color(0x00ff00))
}

/// Create an embed for when the bot leaves a voice channel
pub fn left_voice_channel() -> CreateReply {
    CreateReply::default().embed(
        CreateEmbed::new()
            .title("👋 Left Voice Channel")
            .description("Disconnected and stopped any countdown")
            .color(0x00ff00),
    )
}

/// Create an embed for when a countdown is stopped
pub fn countdown_stopped(channel_id: Option<ChannelId>) -> CreateReply {
    let description = match channel_id {
        Some(channel_id) => format!("Countdown stopped, still hanging out in <#{}>", channel_id),
        None => "Countdown stopped".to_string(),
    };

    CreateReply::default().embed(
        CreateEmbed::new()
            .title("⏹️ Stopped")
            .description(description)
            .color(0x00ff00),
    )
}

/// Create an error embed for any voice error, shown only to the user who ran
/// the command
pub fn voice_error(err: &VoiceError) -> CreateReply {
    CreateReply::default()
        .embed(
            CreateEmbed::new()
                .title("❌ Error")
                .description(err.to_string())
                .color(0xff0000),
        )
        .ephemeral(true)
}
