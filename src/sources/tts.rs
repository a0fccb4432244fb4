use anyhow::Result;
use bytes::{Bytes, BytesMut};
use regex::Regex;
use std::{collections::BTreeMap, path::Path};
use tracing::{debug, warn};

use crate::{
    audio::clip::{Clip, ClipKind},
    error::UserError,
};

const TTS_URL: &str = "https://translate.google.com/translate_tts";
const TTS_UNAVAILABLE: &str = "Google won't talk to me right now 😕, try again in a bit";

/// Longest piece of text the endpoint accepts per request.
pub const MAX_CHUNK_LEN: usize = 100;

/// Text to speech through the Google translate speech endpoint.
pub struct TtsClient {
    http: reqwest::Client,
    lang: String,
    fixes: Vec<(Regex, String)>,
}

impl TtsClient {
    /// `fixes_file` maps words to the spelling that sounds right. A missing
    /// file means no fixes.
    pub fn new(http: reqwest::Client, lang: &str, fixes_file: &Path) -> Result<Self> {
        let fixes: BTreeMap<String, String> = match std::fs::read_to_string(fixes_file) {
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(e) => {
                warn!("No se cargaron correcciones de tts de {}: {}", fixes_file.display(), e);
                BTreeMap::new()
            }
        };

        Ok(Self {
            http,
            lang: lang.to_string(),
            fixes: compile_fixes(&fixes)?,
        })
    }

    /// Applies the word replacements and flattens newlines.
    pub fn fix_text(&self, text: &str) -> String {
        let mut text = text.replace(['\n', '\r'], " ");
        for (pattern, replacement) in &self.fixes {
            text = pattern.replace_all(&text, replacement.as_str()).into_owned();
        }
        text
    }

    /// Synthesizes `text` into a new temporary mp3 under `temp_dir`.
    pub async fn synthesize(&self, text: &str, temp_dir: &Path) -> Result<Clip> {
        let chunks = split_chunks(text, MAX_CHUNK_LEN);
        if chunks.is_empty() {
            return Err(UserError::invalid("There's nothing to say 🤷").into());
        }

        let mut audio = BytesMut::new();
        let total = chunks.len();
        for (index, chunk) in chunks.iter().enumerate() {
            debug!("🗣️ Sintetizando fragmento {}/{}: {:?}", index + 1, total, chunk);
            let bytes = self.fetch_chunk(chunk, index, total).await.map_err(|e| {
                warn!("⚠️ Falló la petición de tts: {}", e);
                UserError::Unavailable(TTS_UNAVAILABLE.to_string())
            })?;
            audio.extend_from_slice(&bytes);
        }

        let path = super::write_temp(temp_dir, "tts", ".mp3", audio.freeze()).await?;
        Ok(Clip::new(ClipKind::Tts, text, path).temporary().with_text(text))
    }

    async fn fetch_chunk(&self, chunk: &str, index: usize, total: usize) -> reqwest::Result<Bytes> {
        let (index, total, length) = (index.to_string(), total.to_string(), chunk.chars().count().to_string());
        self.http
            .get(TTS_URL)
            .query(&[
                ("ie", "UTF-8"),
                ("client", "tw-ob"),
                ("tl", self.lang.as_str()),
                ("q", chunk),
                ("total", total.as_str()),
                ("idx", index.as_str()),
                ("textlen", length.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await
    }
}

fn compile_fixes(fixes: &BTreeMap<String, String>) -> Result<Vec<(Regex, String)>> {
    fixes
        .iter()
        .map(|(word, replacement)| {
            let pattern = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(word)))?;
            Ok((pattern, replacement.clone()))
        })
        .collect()
}

/// Splits text into pieces of at most `max_len` characters, breaking on
/// whitespace where possible.
pub fn split_chunks(text: &str, max_len: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word = word;
        // palabras más largas que un fragmento se cortan
        while word.chars().count() > max_len {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            let cut = word.char_indices().nth(max_len).map_or(word.len(), |(i, _)| i);
            chunks.push(word[..cut].to_string());
            word = &word[cut..];
        }
        if word.is_empty() {
            continue;
        }

        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > max_len {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
