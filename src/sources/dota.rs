use anyhow::Result;
use serde::Deserialize;
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};
use tracing::{info, warn};

use crate::{
    audio::clip::{Clip, ClipKind},
    error::UserError,
    sources::simplify,
};

/// One hero voice line from the response index.
#[derive(Debug, Clone, Deserialize)]
pub struct DotaResponse {
    /// Path of the audio file on the vpk mirror.
    pub path: String,
    #[serde(default)]
    pub text: String,
}

/// Dota 2 voice lines, downloaded on first use and kept in the cache.
pub struct DotaResponses {
    responses: HashMap<String, DotaResponse>,
    base_url: String,
    cache_dir: PathBuf,
    http: reqwest::Client,
}

impl DotaResponses {
    pub fn load(index_file: &Path, base_url: &str, cache_dir: PathBuf, http: reqwest::Client) -> Result<Self> {
        let responses = match std::fs::read_to_string(index_file) {
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(e) => {
                warn!("No se cargaron respuestas de dota de {}: {}", index_file.display(), e);
                HashMap::new()
            }
        };

        Ok(Self {
            responses,
            base_url: base_url.trim_end_matches('/').to_string(),
            cache_dir,
            http,
        })
    }

    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&DotaResponse> {
        self.responses.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.responses.contains_key(name)
    }

    /// Response whose line reads exactly like `simple_text`.
    pub fn find_by_text(&self, simple_text: &str) -> Option<&str> {
        self.responses
            .iter()
            .filter(|(_, response)| simplify(&response.text) == simple_text)
            .map(|(name, _)| name.as_str())
            .min()
    }

    fn cached_path(&self, response: &DotaResponse) -> PathBuf {
        self.cache_dir.join(response.path.trim_start_matches('/'))
    }

    pub async fn resolve(&self, name: &str) -> Result<Clip> {
        let response = self
            .get(name)
            .ok_or_else(|| UserError::ClipNotFound(format!("dota:{name}")))?;

        let path = self.cached_path(response);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            self.download(response, &path).await?;
        }

        Ok(Clip::new(ClipKind::Dota, name, path).with_text(response.text.clone()))
    }

    async fn download(&self, response: &DotaResponse, path: &Path) -> Result<()> {
        let url = format!("{}/{}", self.base_url, response.path.trim_start_matches('/'));
        info!("⬇️ Guardando en caché la respuesta de dota {}", url);

        let fetched = async { self.http.get(&url).send().await?.error_for_status()?.bytes().await };
        let bytes = fetched.await.map_err(|e| {
            warn!("⚠️ Falló la descarga de {}: {}", url, e);
            UserError::Unavailable("Couldn't fetch that dota response, try again later".to_string())
        })?;

        // se escribe aparte y se renombra para que nadie lea un archivo a medias
        let dir = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Ruta de caché inválida {}", path.display()))?;
        let partial = super::write_temp(dir, ".partial", ".download", bytes).await?;
        tokio::fs::rename(&partial, path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn responses(dir: &Path) -> DotaResponses {
        let index = dir.join("dota_responses.json");
        std::fs::write(
            &index,
            r#"{
                "axe_deny": {"path": "/sounds/vo/axe/axe_deny_01.mp3", "text": "Hah!"},
                "axe_kill": {"path": "/sounds/vo/axe/axe_kill_03.mp3", "text": "Come to Axe!"}
            }"#,
        )
        .unwrap();
        DotaResponses::load(&index, "https://example.invalid/vpk/", dir.join("cache"), reqwest::Client::new()).unwrap()
    }

    #[test]
    fn test_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let dota = responses(dir.path());

        assert_eq!(dota.len(), 2);
        assert!(dota.contains("axe_kill"));
        assert_eq!(dota.find_by_text("come to axe"), Some("axe_kill"));
        assert_eq!(dota.find_by_text("come to"), None);
    }

    #[tokio::test]
    async fn test_cached_file_is_reused() {
        let dir = tempfile::tempdir().unwrap();
        let dota = responses(dir.path());

        let cached = dir.path().join("cache/sounds/vo/axe/axe_deny_01.mp3");
        std::fs::create_dir_all(cached.parent().unwrap()).unwrap();
        std::fs::write(&cached, b"ID3").unwrap();

        let clip = dota.resolve("axe_deny").await.unwrap();
        assert_eq!(clip.clip_id(), "dota:axe_deny");
        assert_eq!(clip.audio_path(), cached);
        assert_eq!(clip.text(), Some("Hah!"));
        assert!(!clip.is_temporary());
    }

    #[tokio::test]
    async fn test_unknown_response() {
        let dir = tempfile::tempdir().unwrap();
        let dota = responses(dir.path());

        let err = dota.resolve("pudge_hook").await.err().unwrap();
        assert!(matches!(err.downcast_ref::<UserError>(), Some(UserError::ClipNotFound(_))));
    }

    #[test]
    fn test_missing_index_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let dota = DotaResponses::load(
            &dir.path().join("missing.json"),
            "https://example.invalid",
            dir.path().to_path_buf(),
            reqwest::Client::new(),
        )
        .unwrap();
        assert!(dota.is_empty());
    }
}
