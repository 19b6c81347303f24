use super::*;
use super::{join::join, leave::leave, stop::stop};

/// Lengths a pre-recorded countdown comes in
#[derive(Debug, Clone, Copy, PartialEq, Eq, poise::ChoiceParameter)]
pub enum CountdownLength {
    #[name = "10 seconds"]
    Ten,
    #[name = "20 seconds"]
    Twenty,
    #[name = "30 seconds"]
    Thirty,
    #[name = "40 seconds"]
    Forty,
    #[name = "50 seconds"]
    Fifty,
    #[name = "60 seconds"]
    Sixty,
}

impl CountdownLength {
    pub fn seconds(self) -> u32 {
        match self {
            CountdownLength::Ten => 10,
            CountdownLength::Twenty => 20,
            CountdownLength::Thirty => 30,
            CountdownLength::Forty => 40,
            CountdownLength::Fifty => 50,
            CountdownLength::Sixty => 60,
        }
    }
}

/// Muffin's voice commands
#[poise::command(
    slash_command,
    guild_only,
    category = "Voice",
    subcommands("cd", "join", "leave", "stop"),
    subcommand_required
)]
pub async fn muffin(_ctx: Context<'_>) -> CommandResult {
    Ok(())
}

/// Play a pre-recorded countdown
#[poise::command(slash_command, guild_only, category = "Voice")]
pub async fn cd(
    ctx: Context<'_>,
    #[description = "How long to count down for"] duration: CountdownLength,
) -> CommandResult {
    run_countdown(
        ctx,
        CountdownRequest::Composite {
            seconds: duration.seconds(),
        },
    )
    .await
}
