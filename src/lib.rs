//! Muffin: a Discord bot that counts down out loud in voice channels.

use std::sync::Arc;

pub mod commands;
pub mod config;

use commands::voice::utils::voice_service::VoiceService;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;
pub type CommandResult = Result<(), Error>;

// User data, which is stored and accessible in all command invocations
pub struct Data {
    pub voice: Arc<VoiceService>,
}
