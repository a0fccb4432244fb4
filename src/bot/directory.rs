use async_trait::async_trait;
use serenity::all::{Cache, Channel, ChannelId, GuildId, Http, UserId};
use std::sync::{Arc, OnceLock};
use tokio::sync::Mutex;
use tracing::debug;

use crate::{audio::registry::VoiceDirectory, storage::JsonStorage};

/// [`VoiceDirectory`] answered from the serenity cache, the HTTP API and
/// the stored ban lists.
///
/// Built before the client exists, so the cache and HTTP handles are
/// attached once the client is constructed.
pub struct SerenityDirectory {
    discord: OnceLock<(Arc<Cache>, Arc<Http>)>,
    storage: Arc<Mutex<JsonStorage>>,
}

impl SerenityDirectory {
    pub fn new(storage: Arc<Mutex<JsonStorage>>) -> Self {
        Self {
            discord: OnceLock::new(),
            storage,
        }
    }

    pub fn attach(&self, cache: Arc<Cache>, http: Arc<Http>) {
        if self.discord.set((cache, http)).is_err() {
            debug!("El directorio de voz ya estaba conectado");
        }
    }
}

#[async_trait]
impl VoiceDirectory for SerenityDirectory {
    async fn guild_of_channel(&self, channel: ChannelId) -> Option<GuildId> {
        let (cache, http) = self.discord.get()?;

        let cached = cache.guilds().into_iter().find(|guild_id| {
            cache
                .guild(*guild_id)
                .is_some_and(|guild| guild.channels.contains_key(&channel))
        });
        if cached.is_some() {
            return cached;
        }

        match channel.to_channel(http.as_ref()).await {
            Ok(Channel::Guild(channel)) => Some(channel.guild_id),
            Ok(_) => None,
            Err(e) => {
                debug!("Falló la búsqueda del canal {}: {}", channel, e);
                None
            }
        }
    }

    async fn voice_channel_of(&self, guild_id: GuildId, user_id: UserId) -> Option<ChannelId> {
        let (cache, _) = self.discord.get()?;
        cache
            .guild(guild_id)
            .and_then(|guild| guild.voice_states.get(&user_id).and_then(|state| state.channel_id))
    }

    async fn is_banned(&self, guild_id: GuildId, user_id: UserId) -> bool {
        self.storage.lock().await.is_banned(guild_id.get(), user_id.get())
    }
}
