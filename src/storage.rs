use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};

/// Per-guild settings stored in JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuildSettings {
    pub guild_id: u64,
    pub banned_users: Vec<u64>,
    pub tts_channel_id: Option<u64>,
    pub intros: bool,
    pub outros: bool,
    /// Channel the bot was last summoned to; rejoined on startup.
    pub voice_channel_id: Option<u64>,
}

impl Default for GuildSettings {
    fn default() -> Self {
        Self {
            guild_id: 0,
            banned_users: Vec::new(),
            tts_channel_id: None,
            intros: true,
            outros: true,
            voice_channel_id: None,
        }
    }
}

/// Per-user announcement settings stored in JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSettings {
    pub user_id: u64,
    pub intro: String,
    pub outro: String,
    pub intro_tts: String,
    pub outro_tts: String,
}

impl UserSettings {
    pub const DEFAULT_INTRO: &'static str = "local:helloits";
    pub const DEFAULT_OUTRO: &'static str = "local:farewell";
    pub const DEFAULT_INTRO_TTS: &'static str = "it's";
    pub const DEFAULT_OUTRO_TTS: &'static str = "has left!";
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            user_id: 0,
            intro: Self::DEFAULT_INTRO.to_string(),
            outro: Self::DEFAULT_OUTRO.to_string(),
            intro_tts: Self::DEFAULT_INTRO_TTS.to_string(),
            outro_tts: Self::DEFAULT_OUTRO_TTS.to_string(),
        }
    }
}

/// File-per-record JSON storage
pub struct JsonStorage {
    data_dir: PathBuf,
    guilds: HashMap<u64, GuildSettings>,
    users: HashMap<u64, UserSettings>,
}

impl JsonStorage {
    pub async fn new(data_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(data_dir.join("guilds")).await?;
        fs::create_dir_all(data_dir.join("users")).await?;

        info!("📁 Almacenamiento inicializado en: {}", data_dir.display());

        let mut storage = Self {
            data_dir,
            guilds: HashMap::new(),
            users: HashMap::new(),
        };

        // La configuración de guilds se necesita al inicio para reconectar y banear
        storage.load_all_guilds().await?;

        Ok(storage)
    }

    /// Settings of a guild, defaults if it has none yet.
    pub fn guild(&self, guild_id: u64) -> GuildSettings {
        self.guilds.get(&guild_id).cloned().unwrap_or_else(|| GuildSettings {
            guild_id,
            ..GuildSettings::default()
        })
    }

    pub fn guilds(&self) -> impl Iterator<Item = &GuildSettings> {
        self.guilds.values()
    }

    pub fn is_banned(&self, guild_id: u64, user_id: u64) -> bool {
        self.guilds
            .get(&guild_id)
            .is_some_and(|settings| settings.banned_users.contains(&user_id))
    }

    /// Applies `edit` to the guild's settings and saves them.
    pub async fn edit_guild(
        &mut self,
        guild_id: u64,
        edit: impl FnOnce(&mut GuildSettings),
    ) -> Result<GuildSettings> {
        let mut settings = self.guild(guild_id);
        edit(&mut settings);

        let path = self.guild_file_path(guild_id);
        save(&path, &settings).await?;
        self.guilds.insert(guild_id, settings.clone());

        info!("💾 Configuración actualizada para guild {}", guild_id);
        Ok(settings)
    }

    /// Settings of a user, loaded on first access.
    pub async fn user(&mut self, user_id: u64) -> Result<UserSettings> {
        if let Some(settings) = self.users.get(&user_id) {
            return Ok(settings.clone());
        }

        let path = self.user_file_path(user_id);
        let settings = if fs::try_exists(&path).await? {
            load(&path).await?
        } else {
            UserSettings {
                user_id,
                ..UserSettings::default()
            }
        };

        self.users.insert(user_id, settings.clone());
        Ok(settings)
    }

    /// Applies `edit` to the user's settings and saves them.
    pub async fn edit_user(
        &mut self,
        user_id: u64,
        edit: impl FnOnce(&mut UserSettings),
    ) -> Result<UserSettings> {
        let mut settings = self.user(user_id).await?;
        edit(&mut settings);

        let path = self.user_file_path(user_id);
        save(&path, &settings).await?;
        self.users.insert(user_id, settings.clone());

        info!("💾 Configuración actualizada para usuario {}", user_id);
        Ok(settings)
    }

    async fn load_all_guilds(&mut self) -> Result<()> {
        let mut files = fs::read_dir(self.data_dir.join("guilds")).await?;
        let mut loaded_count = 0;

        while let Some(entry) = files.next_entry().await? {
            let path = entry.path();
            let Some(guild_id) = path
                .file_stem()
                .and_then(|n| n.to_str())
                .and_then(|n| n.strip_prefix("guild_"))
                .and_then(|id| id.parse::<u64>().ok())
            else {
                continue;
            };

            match load::<GuildSettings>(&path).await {
                Ok(settings) => {
                    self.guilds.insert(guild_id, settings);
                    loaded_count += 1;
                }
                Err(e) => {
                    warn!("Error cargando configuración del guild {}: {}", guild_id, e);
                }
            }
        }

        if loaded_count > 0 {
            info!("📂 Configuración cargada para {} guilds", loaded_count);
        }

        Ok(())
    }

    fn guild_file_path(&self, guild_id: u64) -> PathBuf {
        self.data_dir.join("guilds").join(format!("guild_{}.json", guild_id))
    }

    fn user_file_path(&self, user_id: u64) -> PathBuf {
        self.data_dir.join("users").join(format!("user_{}.json", user_id))
    }
}

async fn load<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&content)?)
}

async fn save<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value)?;
    fs::write(path, content).await?;
    Ok(())
}
