use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use poise::serenity_prelude::{ChannelId, GuildId};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::voice_service::{VoiceError, VoiceResult};
use super::voice_transport::{VoiceConnection, VoiceTransport};

/// Owns the voice connection of every guild the bot is in.
///
/// This is the only writer of the guild -> connection association. Everything
/// else borrows connections through [`ConnectionRegistry::get`] or
/// [`ConnectionRegistry::acquire`].
pub struct ConnectionRegistry {
    transport: Arc<dyn VoiceTransport>,
    // Map of guild ID to its open connection
    connections: Mutex<HashMap<GuildId, Arc<dyn VoiceConnection>>>,
}

impl ConnectionRegistry {
    pub fn new(transport: Arc<dyn VoiceTransport>) -> Self {
        Self {
            transport,
            connections: Mutex::new(HashMap::new()),
        }
    }

    /// Get the connection for a guild, opening one if there is none.
    /// Joining again while connected returns the current connection.
    pub async fn acquire(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> VoiceResult<Arc<dyn VoiceConnection>> {
        // The lock is held across the open so concurrent joins open once
        let mut connections = self.connections.lock().await;

        if let Some(connection) = Self::live_entry(&mut connections, guild_id).await {
            debug!(
                "Reusing voice connection to channel {} in guild {}",
                connection.channel_id(),
                guild_id
            );
            return Ok(connection);
        }

        let connection = self.transport.open(guild_id, channel_id).await?;
        connections.insert(guild_id, Arc::clone(&connection));
        info!(
            "Opened voice connection to channel {} in guild {}",
            channel_id, guild_id
        );

        Ok(connection)
    }

    /// Get the current connection for a guild, if any
    pub async fn get(&self, guild_id: GuildId) -> Option<Arc<dyn VoiceConnection>> {
        let mut connections = self.connections.lock().await;
        Self::live_entry(&mut connections, guild_id).await
    }

    /// The guild's connection if it still works. A dead one is forgotten and
    /// torn down.
    async fn live_entry(
        connections: &mut HashMap<GuildId, Arc<dyn VoiceConnection>>,
        guild_id: GuildId,
    ) -> Option<Arc<dyn VoiceConnection>> {
        let connection = connections.get(&guild_id).cloned()?;
        if connection.is_alive().await {
            return Some(connection);
        }

        connections.remove(&guild_id);
        warn!(
            "Voice connection to channel {} in guild {} was lost",
            connection.channel_id(),
            guild_id
        );
        if let Err(e) = connection.destroy().await {
            debug!("Cleanup of lost connection in guild {} failed: {}", guild_id, e);
        }
        None
    }

    /// Tear down the connection for a guild and forget it
    pub async fn release(&self, guild_id: GuildId) -> VoiceResult<()> {
        // Remove in a separate scope so the lock is released before destroying
        let connection = {
            let mut connections = self.connections.lock().await;
            connections.remove(&guild_id)
        }
        .ok_or(VoiceError::NotConnected)?;

        connection.destroy().await.inspect_err(|e| {
            warn!("Failed to destroy voice connection for guild {}: {}", guild_id, e);
        })
    }

    /// Tear down every connection, used on shutdown
    pub async fn release_all(&self) {
        let connections: Vec<(GuildId, Arc<dyn VoiceConnection>)> = {
            let mut connections = self.connections.lock().await;
            connections.drain().collect()
        };

        info!("Releasing {} voice connection(s)", connections.len());

        let results = join_all(
            connections
                .iter()
                .map(|(_, connection)| connection.destroy()),
        )
        .await;

        for ((guild_id, _), result) in connections.iter().zip(results) {
            if let Err(e) = result {
                warn!("Failed to leave voice channel in guild {}: {}", guild_id, e);
            }
        }
    }
}
