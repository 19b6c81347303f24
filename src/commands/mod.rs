//! This module aggregates all the command modules for the bot.

/// Voice commands: countdowns and joining/leaving voice channels.
pub mod voice;
