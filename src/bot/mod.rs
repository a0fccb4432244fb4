//! # Bot Module
//!
//! Discord side of the bot: prefix commands, the TTS channel and voice
//! presence.
//!
//! ## Architecture
//!
//! The bot is built around the [`ClipBot`] struct which implements
//! Serenity's [`EventHandler`] trait. It owns:
//!
//! - The [`SessionRegistry`] holding one audio session per guild
//! - The [`SourceManager`] resolving clip ids into playable files
//! - Persistent settings in [`JsonStorage`]
//!
//! ## Example
//!
//! ```rust,ignore
//! let bot = ClipBot::new(config, storage, sources, registry);
//! let client = Client::builder(&token, intents).event_handler(bot).await?;
//! ```

use anyhow::Result;
use serenity::{
    all::{ChannelId, Context, EventHandler, GuildId, Message, Ready, VoiceState},
    async_trait,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub mod announce;
pub mod commands;
pub mod directory;
pub mod handlers;

use crate::{
    audio::{
        registry::{Scope, SessionRegistry},
        session::AudioSession,
    },
    bot::commands::Parsed,
    config::Config,
    error::UserError,
    sources::{ClipResolver, SourceManager},
    storage::JsonStorage,
};

/// Main Discord event handler.
///
/// ## Thread Safety
///
/// Serenity runs every event on its own task. Shared state is behind
/// [`Arc`]; settings are guarded by a [`tokio::sync::Mutex`] and the
/// registry synchronizes itself.
pub struct ClipBot {
    /// Bot configuration loaded from environment variables
    config: Arc<Config>,
    /// Guild and user settings
    pub storage: Arc<tokio::sync::Mutex<JsonStorage>>,
    /// Clip lookup, synthesis and downloads
    pub sources: Arc<SourceManager>,
    /// Audio sessions per Discord guild
    pub registry: Arc<SessionRegistry>,
}

impl ClipBot {
    pub fn new(
        config: Config,
        storage: Arc<tokio::sync::Mutex<JsonStorage>>,
        sources: Arc<SourceManager>,
        registry: Arc<SessionRegistry>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            storage,
            sources,
            registry,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Resolves `identifier` and queues it on `session`.
    pub async fn play(&self, session: &AudioSession, identifier: &str) -> Result<()> {
        let clip = self.sources.resolve(identifier).await?;
        session.enqueue(clip).await?;
        Ok(())
    }

    /// Like [`play`](Self::play), on the session of `guild_id`.
    pub async fn play_in_guild(&self, guild_id: GuildId, identifier: &str) -> Result<()> {
        let session = self.registry.resolve(Scope::Guild(guild_id)).await?;
        self.play(&session, identifier).await
    }

    /// Joins every voice channel the bot was in before it went down.
    async fn rejoin_saved_channels(&self) {
        let saved: Vec<(u64, u64)> = self
            .storage
            .lock()
            .await
            .guilds()
            .filter_map(|g| g.voice_channel_id.map(|channel| (g.guild_id, channel)))
            .collect();

        for (guild_id, channel_id) in saved {
            match self.registry.connect(ChannelId::new(channel_id)).await {
                Ok(_) => info!("🔁 Reconectado al canal de voz {} en guild {}", channel_id, guild_id),
                Err(e) => warn!("No se pudo reconectar al canal de voz {} en guild {}: {}", channel_id, guild_id, e),
            }
        }
    }

    /// Keeps sessions and saved channels in line with where Discord says
    /// the bot is.
    async fn on_own_voice_state(&self, guild_id: GuildId, new: &VoiceState) -> Result<()> {
        let session = self.registry.find(Scope::Guild(guild_id)).await?;

        match (new.channel_id, session) {
            (None, session) => {
                if session.is_some() {
                    info!("🔌 Desconectado de voz en guild {}", guild_id);
                    self.registry.disconnect(guild_id).await?;
                }
                self.storage
                    .lock()
                    .await
                    .edit_guild(guild_id.get(), |g| g.voice_channel_id = None)
                    .await?;
            }
            (Some(channel), session) => {
                if let Some(session) = session {
                    if session.channel() != Some(channel) {
                        debug!("Movido a {} en guild {} desde afuera", channel, guild_id);
                        self.registry.connect(channel).await?;
                    }
                }
                self.storage
                    .lock()
                    .await
                    .edit_guild(guild_id.get(), |g| g.voice_channel_id = Some(channel.get()))
                    .await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl EventHandler for ClipBot {
    /// Called when the bot is connected to Discord; rejoins saved voice
    /// channels.
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!("🤖 {} está en línea!", ready.user.name);
        info!("📊 Conectado a {} guilds", ready.guilds.len());

        self.rejoin_saved_channels().await;
        if !self.registry.is_empty() {
            info!("🔊 {} sesiones de voz activas", self.registry.len());
        }
    }

    /// Prefix commands, and plain messages in a guild's TTS channel.
    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }

        match commands::parse(&self.config.command_prefix, &msg.content) {
            Parsed::Command(invocation) => {
                if let Err(e) = handlers::handle_command(&ctx, &msg, invocation, self).await {
                    handlers::report_error(&ctx, &msg, e, self).await;
                }
            }
            Parsed::Unknown(name) => {
                debug!("Comando desconocido {:?} de {}", name, msg.author.name);
            }
            Parsed::NotCommand => {
                if let Err(e) = handlers::handle_tts_channel(&ctx, &msg, self).await {
                    handlers::report_error(&ctx, &msg, e, self).await;
                }
            }
        }
    }

    /// Intros, outros and the bot's own connection changes.
    async fn voice_state_update(&self, ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        if let Some(guild_id) = new.guild_id {
            if new.user_id == ctx.cache.current_user().id {
                if let Err(e) = self.on_own_voice_state(guild_id, &new).await {
                    error!("Error siguiendo el estado de voz propio en guild {}: {:?}", guild_id, e);
                }
            }
        }

        if let Err(e) = announce::on_voice_state(&ctx, self, old.as_ref(), &new).await {
            match UserError::find(&e) {
                Some(user_error) => warn!("⚠️ Anuncio omitido en guild {:?}: {}", new.guild_id, user_error),
                None => {
                    error!("❌ Error al anunciar cambio de voz: {:?}", e);
                    handlers::report_to_operator(&ctx, self, &format!("Announcement failed: {e:?}")).await;
                }
            }
        }
    }
}
