pub mod countdown;
pub mod join;
pub mod leave;
pub mod muffin;
pub mod stop;

pub mod utils;

use std::sync::Arc;

use poise::serenity_prelude::{self as serenity, ChannelId, CreateMessage, GuildId};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::{CommandResult, Context};
use utils::{
    asset_resolver::CountdownRequest,
    embedded_messages,
    playback_scheduler::PlaybackState,
    preconditions,
    voice_service::{VoiceError, VoiceResult},
};

/// The guild the command was run in
fn guild_id(ctx: Context<'_>) -> VoiceResult<GuildId> {
    ctx.guild_id().ok_or(VoiceError::NotInGuild)
}

/// The voice channel the invoking user is in, if the bot may speak there
fn caller_channel(ctx: Context<'_>, guild_id: GuildId) -> VoiceResult<ChannelId> {
    preconditions::voice_target(ctx.serenity_context(), guild_id, ctx.author().id)
}

/// Shared body of `/countdown` and `/muffin cd`
async fn run_countdown(ctx: Context<'_>, request: CountdownRequest) -> CommandResult {
    info!("Received countdown request: {:?}", request);

    let target = guild_id(ctx).and_then(|guild_id| Ok((guild_id, caller_channel(ctx, guild_id)?)));
    let (guild_id, channel_id) = match target {
        Ok(target) => target,
        Err(err) => {
            ctx.send(embedded_messages::voice_error(&err)).await?;
            return Ok(());
        }
    };

    let voice = &ctx.data().voice;

    // Refusals happen before the defer so they stay private
    let plan = match voice.prepare_countdown(guild_id, request).await {
        Ok(plan) => plan,
        Err(err) => {
            ctx.send(embedded_messages::voice_error(&err)).await?;
            return Ok(());
        }
    };

    // Defer the response since joining the channel might take time
    ctx.defer().await?;

    match voice.start_countdown(guild_id, channel_id, plan).await {
        Ok(started) => {
            report_failure(
                ctx.serenity_context().http.clone(),
                ctx.channel_id(),
                guild_id,
                started.state.clone(),
            );
            ctx.send(embedded_messages::countdown_started(request, &started))
                .await?;
        }
        Err(err) => {
            ctx.send(embedded_messages::voice_error(&err)).await?;
        }
    }

    Ok(())
}

/// Post to the text channel if the countdown fails after the reply went out
fn report_failure(
    http: Arc<serenity::Http>,
    channel_id: ChannelId,
    guild_id: GuildId,
    mut state: watch::Receiver<PlaybackState>,
) {
    tokio::spawn(async move {
        let failure = match state.wait_for(|state| !state.status.is_active()).await {
            Ok(state) => state.failure.clone(),
            // The countdown was dropped without reporting anything
            Err(_) => return,
        };

        if let Some(reason) = failure {
            warn!("Countdown failed in guild {}: {}", guild_id, reason);
            let message = CreateMessage::new().embed(embedded_messages::countdown_failed(&reason));
            if let Err(e) = channel_id.send_message(http, message).await {
                warn!("Failed to report countdown failure: {}", e);
            }
        }
    });
}
