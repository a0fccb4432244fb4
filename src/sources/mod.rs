pub mod direct_url;
pub mod dota;
pub mod local;
pub mod questions;
pub mod tts;

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use std::{
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::{debug, info, warn};

pub use direct_url::DirectUrlClient;
pub use dota::DotaResponses;
pub use local::LocalCatalog;
pub use questions::Questions;
pub use tts::TtsClient;

use crate::{
    audio::{
        clip::{Clip, ClipKind},
        length,
    },
    config::Config,
};

/// File extensions recognized as playable audio, as a regex alternation.
pub const AUDIO_EXTENSIONS: &str = "mp3|wav|ogg|flac|m4a";

/// Turns a clip identifier into a playable [`Clip`].
#[async_trait]
pub trait ClipResolver: Send + Sync {
    /// Accepts `kind:key` identifiers; a bare name is a local clip.
    async fn resolve(&self, identifier: &str) -> Result<Clip>;
}

/// Resolves every clip kind the bot knows about.
pub struct SourceManager {
    local: LocalCatalog,
    dota: DotaResponses,
    questions: Questions,
    tts: TtsClient,
    urls: DirectUrlClient,
    temp_dir: PathBuf,
    volume: f32,
}

impl SourceManager {
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("clipbot/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let local = LocalCatalog::load(config.clips_dir())?;
        let dota = DotaResponses::load(
            &config.json_resource("dota_responses.json"),
            &config.dota_vpk_url,
            config.cache_dir.join("dota"),
            http.clone(),
        )?;
        let questions = Questions::load(&config.json_resource("questions.json"))?;
        let tts = TtsClient::new(
            http.clone(),
            &config.tts_lang,
            &config.json_resource("tts_fixes.json"),
        )?;

        info!(
            "🎵 Fuentes de clips listas: {} clips locales, {} respuestas de dota, {} preguntas",
            local.len(),
            dota.len(),
            questions.len()
        );
        if local.is_empty() {
            warn!("No hay clips en {}", config.clips_dir().display());
        }
        if dota.is_empty() {
            debug!("Sin respuestas de dota, los clips de dota quedan desactivados");
        }

        Ok(Self {
            local,
            dota,
            questions,
            tts,
            urls: DirectUrlClient::new(http)?,
            temp_dir: config.temp_dir(),
            volume: config.default_volume,
        })
    }

    pub fn catalog(&self) -> &LocalCatalog {
        &self.local
    }

    pub fn dota(&self) -> &DotaResponses {
        &self.dota
    }

    pub fn questions(&self) -> &Questions {
        &self.questions
    }

    pub fn tts(&self) -> &TtsClient {
        &self.tts
    }

    /// Best way to say `message` out loud, as a clip identifier: a local clip
    /// by that name, an audio link, a dota response or local clip with
    /// exactly that text, and plain tts otherwise. `None` when there is
    /// nothing to say.
    pub fn smart_identifier(&self, message: &str) -> Option<String> {
        let message = message.trim();
        if message.is_empty() {
            return None;
        }

        let simple = simplify(message);
        let has_words = !simple.trim().is_empty();
        if has_words && self.local.contains(&simple) {
            return Some(format!("local:{simple}"));
        }
        if self.urls.is_valid_url(message) && self.urls.is_audio_url(message) {
            return Some(format!("url:{message}"));
        }
        if has_words {
            if let Some(response) = self.dota.find_by_text(&simple) {
                return Some(format!("dota:{response}"));
            }
            if let Some(name) = self.local.find_by_text(&simple) {
                return Some(format!("local:{name}"));
            }
        }
        Some(format!("tts:{}", self.tts.fix_text(message)))
    }
}

#[async_trait]
impl ClipResolver for SourceManager {
    async fn resolve(&self, identifier: &str) -> Result<Clip> {
        let (kind, key) = ClipKind::parse_id(identifier);
        debug!("Resolviendo clip {} {:?}", kind, key);

        let clip = match kind {
            ClipKind::Local => self.local.resolve(key)?,
            ClipKind::Dota => self.dota.resolve(key).await?,
            ClipKind::Tts => self.tts.synthesize(key, &self.temp_dir).await?,
            ClipKind::Url => self.urls.download(key, &self.temp_dir).await?,
        };

        let volume = clip.volume() * self.volume;
        Ok(with_measured_duration(clip).await.with_volume(volume))
    }
}

async fn with_measured_duration(clip: Clip) -> Clip {
    match length::duration_of(clip.audio_path()).await {
        Ok(duration) => clip.with_duration(duration),
        Err(e) => {
            debug!("Sin duración para {}: {}", clip.clip_id(), e);
            clip
        }
    }
}

/// Writes `bytes` to a fresh file under `dir`. The file is complete and
/// closed once this returns; a failed write leaves nothing behind.
pub(crate) async fn write_temp(dir: &Path, prefix: &str, suffix: &str, bytes: Bytes) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let temp = tempfile::Builder::new()
        .prefix(prefix)
        .suffix(suffix)
        .tempfile_in(dir)?
        .into_temp_path();

    tokio::fs::write(&temp, &bytes).await?;
    Ok(temp.keep()?)
}

/// Lowercases text and drops everything but ascii letters, digits,
/// underscores and whitespace, for matching names and transcripts.
pub fn simplify(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace() || *c == '_')
        .collect()
}
