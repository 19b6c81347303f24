use super::*;

/// Stop any countdown and leave the voice channel
#[poise::command(slash_command, guild_only, category = "Voice")]
pub async fn leave(ctx: Context<'_>) -> CommandResult {
    let guild_id = ctx.guild_id().ok_or_else(|| {
        Box::new(VoiceError::NotInGuild) as Box<dyn std::error::Error + Send + Sync>
    })?;

    // Try to leave the voice channel
    match ctx.data().voice.leave(guild_id).await {
        Ok(()) => {
            ctx.send(embedded_messages::left_voice_channel()).await?;
        }
        Err(err) => {
            ctx.send(embedded_messages::voice_error(&err)).await?;
        }
    }

    Ok(())
}
