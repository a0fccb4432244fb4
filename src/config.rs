use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    // Discord
    pub discord_token: String,
    pub command_prefix: String,
    pub error_channel_id: Option<u64>, // Canal del operador para errores inesperados

    // Audio
    pub default_volume: f32,
    pub tts_lang: String,
    pub dota_vpk_url: String,

    // Rutas
    pub resource_dir: PathBuf,
    pub data_dir: PathBuf,
    pub cache_dir: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            // Discord
            discord_token: std::env::var("DISCORD_TOKEN")?,
            command_prefix: std::env::var("COMMAND_PREFIX").unwrap_or_else(|_| "?".to_string()),
            error_channel_id: std::env::var("ERROR_CHANNEL_ID")
                .ok()
                .and_then(|s| s.parse().ok()),

            // Audio
            default_volume: std::env::var("DEFAULT_VOLUME")
                .unwrap_or_else(|_| "1.0".to_string())
                .parse()?,
            tts_lang: std::env::var("TTS_LANG").unwrap_or_else(|_| "en".to_string()),
            dota_vpk_url: std::env::var("DOTA_VPK_URL")
                .unwrap_or_else(|_| "https://dotabase.dillerm.io/dota-vpk".to_string()),

            // Rutas
            resource_dir: std::env::var("RESOURCE_DIR")
                .unwrap_or_else(|_| "./resource".to_string())
                .into(),
            data_dir: std::env::var("DATA_DIR")
                .unwrap_or_else(|_| "./data".to_string())
                .into(),
            cache_dir: std::env::var("CACHE_DIR")
                .unwrap_or_else(|_| "./cache".to_string())
                .into(),
        };

        // Crear directorios si no existen
        std::fs::create_dir_all(&config.data_dir)?;
        std::fs::create_dir_all(&config.cache_dir)?;
        std::fs::create_dir_all(config.clips_dir())?;
        std::fs::create_dir_all(config.temp_dir())?;

        config.validate()?;

        Ok(config)
    }

    /// Checked-in clips and their `clipinfo.json`.
    pub fn clips_dir(&self) -> PathBuf {
        self.resource_dir.join("clips")
    }

    /// Synthesized speech and downloaded audio. Files here are transient.
    pub fn temp_dir(&self) -> PathBuf {
        self.resource_dir.join("temp")
    }

    pub fn json_resource(&self, name: &str) -> PathBuf {
        self.resource_dir.join("json").join(name)
    }

    /// Validates configuration values for correctness.
    ///
    /// # Validation Rules
    ///
    /// - Volume must be between 0.0 and 2.0
    /// - The command prefix must not be empty or contain whitespace
    /// - The TTS language must be a short language code
    pub fn validate(&self) -> Result<()> {
        if self.default_volume < 0.0 || self.default_volume > 2.0 {
            anyhow::bail!("Default volume must be between 0.0 and 2.0, got: {}", self.default_volume);
        }

        if self.command_prefix.is_empty() || self.command_prefix.chars().any(char::is_whitespace) {
            anyhow::bail!("Command prefix must be non-empty without spaces, got: {:?}", self.command_prefix);
        }

        if self.tts_lang.is_empty() || self.tts_lang.len() > 8 {
            anyhow::bail!("Invalid TTS language: {:?}", self.tts_lang);
        }

        url::Url::parse(&self.dota_vpk_url)
            .map_err(|e| anyhow::anyhow!("DOTA_VPK_URL inválida {}: {}", self.dota_vpk_url, e))?;

        Ok(())
    }

    /// Returns a summary of the current configuration for logging,
    /// without the token.
    pub fn summary(&self) -> String {
        format!(
            "Config Summary:\n  \
            Discord: prefix {:?}, error channel {}\n  \
            Audio: {}% vol, tts lang {}\n  \
            Paths: resources {}, data {}, cache {}",
            self.command_prefix,
            self.error_channel_id.map_or("none".to_string(), |id| id.to_string()),
            (self.default_volume * 100.0) as u32,
            self.tts_lang,
            self.resource_dir.display(),
            self.data_dir.display(),
            self.cache_dir.display(),
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            discord_token: String::new(),
            command_prefix: "?".to_string(),
            error_channel_id: None,

            default_volume: 1.0,
            tts_lang: "en".to_string(),
            dota_vpk_url: "https://dotabase.dillerm.io/dota-vpk".to_string(),

            resource_dir: "./resource".into(),
            data_dir: "./data".into(),
            cache_dir: "./cache".into(),
        }
    }
}
