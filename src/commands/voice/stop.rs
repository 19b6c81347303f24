use super::*;

/// Stop the running countdown but stay in the voice channel
#[poise::command(slash_command, guild_only, category = "Voice")]
pub async fn stop(ctx: Context<'_>) -> CommandResult {
    let guild_id = ctx.guild_id().ok_or_else(|| {
        Box::new(VoiceError::NotInGuild) as Box<dyn std::error::Error + Send + Sync>
    })?;

    let voice = &ctx.data().voice;
    match voice.stop(guild_id).await {
        Ok(()) => {
            let channel_id = voice
                .connections()
                .get(guild_id)
                .await
                .map(|connection| connection.channel_id());
            ctx.send(embedded_messages::countdown_stopped(channel_id))
                .await?;
        }
        Err(err) => {
            ctx.send(embedded_messages::voice_error(&err)).await?;
        }
    }

    Ok(())
}
