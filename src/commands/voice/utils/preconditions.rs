use poise::serenity_prelude::{self as serenity, ChannelId, GuildId, Permissions, UserId};

use super::voice_service::{VoiceError, VoiceResult};

/// Work out which voice channel a countdown or join should target: the one
/// the invoking user is in, provided the bot may connect and speak there.
pub fn voice_target(
    ctx: &serenity::Context,
    guild_id: GuildId,
    user_id: UserId,
) -> VoiceResult<ChannelId> {
    let bot_id = ctx.cache.current_user().id;

    // Get the guild
    let guild = ctx.cache.guild(guild_id).ok_or(VoiceError::NotInGuild)?;

    // Get the channel the user is sitting in
    let channel_id = guild
        .voice_states
        .get(&user_id)
        .and_then(|voice_state| voice_state.channel_id)
        .ok_or(VoiceError::UserNotInVoiceChannel)?;
    let channel = guild
        .channels
        .get(&channel_id)
        .ok_or(VoiceError::UserNotInVoiceChannel)?;

    let member = guild
        .members
        .get(&bot_id)
        .ok_or(VoiceError::MissingPermissions)?;
    ensure_can_speak(guild.user_permissions_in(channel, member))?;

    Ok(channel_id)
}

/// Both CONNECT and SPEAK are needed to play anything
pub fn ensure_can_speak(permissions: Permissions) -> VoiceResult<()> {
    if permissions.contains(Permissions::CONNECT | Permissions::SPEAK) {
        Ok(())
    } else {
        Err(VoiceError::MissingPermissions)
    }
}
