use super::*;

/// Count down out loud from a number, one clip per number
#[poise::command(slash_command, guild_only, category = "Voice")]
pub async fn countdown(
    ctx: Context<'_>,
    #[description = "Number to count down from (5-60)"]
    #[min = 5]
    #[max = 60]
    number: u32,
) -> CommandResult {
    run_countdown(ctx, CountdownRequest::Numbers { from: number }).await
}
