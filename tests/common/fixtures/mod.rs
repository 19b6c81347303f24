//! Test fixtures for the Muffin countdown bot
//! This module contains sample ids and clip libraries used in tests

use poise::serenity_prelude::{ChannelId, GuildId};

use super::mocks::FakeAssetStore;

/// Sample guild for testing
pub const GUILD: GuildId = GuildId::new(4242);

/// A second guild, for isolation tests
pub const OTHER_GUILD: GuildId = GuildId::new(4343);

/// Sample voice channel for testing
pub const VOICE_CHANNEL: ChannelId = ChannelId::new(987654321);

/// Another voice channel in the same guild
pub const OTHER_VOICE_CHANNEL: ChannelId = ChannelId::new(987654322);

/// Per-number clips `1` through `count`
pub fn number_clips(count: u32) -> FakeAssetStore {
    FakeAssetStore::with((1..=count).map(|n| n.to_string()))
}

/// Every pre-cut composite clip plus the master
pub fn composite_clips() -> FakeAssetStore {
    FakeAssetStore::with(
        ["countdown10", "countdown20", "countdown30", "countdown40", "countdown50", "countdown"]
            .into_iter()
            .map(str::to_string),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use muffin::commands::voice::utils::asset_resolver::AssetStore;

    #[test]
    fn test_sample_data() {
        assert_ne!(GUILD, OTHER_GUILD);
        assert_ne!(VOICE_CHANNEL, OTHER_VOICE_CHANNEL);
        assert!(number_clips(5).exists("5"));
        assert!(!number_clips(5).exists("6"));
        assert!(composite_clips().exists("countdown"));
    }
}
