use anyhow::Result;
use regex::Regex;
use std::path::Path;
use tracing::{info, warn};
use url::Url;

use crate::{
    audio::clip::{Clip, ClipKind},
    error::UserError,
    sources::AUDIO_EXTENSIONS,
};

/// Downloads audio from plain http(s) links.
pub struct DirectUrlClient {
    http: reqwest::Client,
    audio_path: Regex,
}

impl DirectUrlClient {
    pub fn new(http: reqwest::Client) -> Result<Self> {
        Ok(Self {
            http,
            audio_path: Regex::new(&format!(r"(?i)\.({AUDIO_EXTENSIONS})$"))?,
        })
    }

    pub fn is_valid_url(&self, url: &str) -> bool {
        Url::parse(url).is_ok_and(|u| matches!(u.scheme(), "http" | "https"))
    }

    /// Whether the link points straight at an audio file.
    pub fn is_audio_url(&self, url: &str) -> bool {
        self.extension_of(url).is_some()
    }

    fn extension_of(&self, url: &str) -> Option<String> {
        let parsed = Url::parse(url).ok()?;
        let found = self.audio_path.captures(parsed.path())?;
        Some(found[1].to_lowercase())
    }

    /// Downloads `url` into a new temporary file under `temp_dir`, keeping
    /// the extension of the link.
    pub async fn download(&self, url: &str, temp_dir: &Path) -> Result<Clip> {
        if !self.is_valid_url(url) {
            return Err(UserError::ClipNotFound(url.to_string()).into());
        }

        let response = match self.http.get(url).send().await.and_then(|r| r.error_for_status()) {
            Ok(response) => response,
            Err(e) => {
                warn!("Falló la descarga de {}: {}", url, e);
                return Err(UserError::ClipNotFound(url.to_string()).into());
            }
        };
        let bytes = response.bytes().await?;

        let suffix = format!(".{}", self.extension_of(url).unwrap_or_else(|| "mp3".to_string()));
        let path = super::write_temp(temp_dir, "url", &suffix, bytes).await?;
        info!("⬇️ Descargado {} en {}", url, path.display());

        Ok(Clip::new(ClipKind::Url, url, path).temporary())
    }
}
