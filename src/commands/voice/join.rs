use super::*;

/// Join your voice channel
#[poise::command(slash_command, guild_only, category = "Voice")]
pub async fn join(ctx: Context<'_>) -> CommandResult {
    let target = guild_id(ctx).and_then(|guild_id| Ok((guild_id, caller_channel(ctx, guild_id)?)));
    let (guild_id, channel_id) = match target {
        Ok(target) => target,
        Err(err) => {
            ctx.send(embedded_messages::voice_error(&err)).await?;
            return Ok(());
        }
    };

    match ctx.data().voice.join(guild_id, channel_id).await {
        Ok(outcome) => {
            ctx.send(embedded_messages::joined(&outcome)).await?;
        }
        Err(err) => {
            ctx.send(embedded_messages::voice_error(&err)).await?;
        }
    }

    Ok(())
}
