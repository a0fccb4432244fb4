use anyhow::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    time::SystemTime,
};
use tracing::{info, warn};

use crate::{
    audio::clip::{Clip, ClipKind},
    error::UserError,
    sources::{simplify, AUDIO_EXTENSIONS},
};

const INFO_FILE: &str = "clipinfo.json";

/// Catalog entry for one checked-in clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipInfo {
    /// Relative to the clips directory, `/`-separated.
    pub path: String,
    /// `|`-separated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl ClipInfo {
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.tags
            .as_deref()
            .unwrap_or_default()
            .split('|')
            .filter(|t| !t.is_empty())
    }
}

/// Index of the clips shipped in the resource directory.
#[derive(Debug)]
pub struct LocalCatalog {
    clips_dir: PathBuf,
    clips: BTreeMap<String, ClipInfo>,
}

impl LocalCatalog {
    /// Loads `clipinfo.json`, indexes audio files it does not know about yet
    /// and writes the catalog back.
    pub fn load(clips_dir: impl Into<PathBuf>) -> Result<Self> {
        let clips_dir = clips_dir.into();
        let info_file = clips_dir.join(INFO_FILE);

        let mut clips: BTreeMap<String, ClipInfo> = if info_file.is_file() {
            serde_json::from_str(&std::fs::read_to_string(&info_file)?)?
        } else {
            BTreeMap::new()
        };

        let mut found = Vec::new();
        collect_audio_files(&clips_dir, &clips_dir, &mut found)?;

        let mut added = 0;
        for relative in found {
            let Some(name) = Path::new(&relative).file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if clips.contains_key(name) || clips.values().any(|info| info.path == relative) {
                continue;
            }
            let tags = relative.rsplit_once('/').map(|(dir, _)| dir.to_string());
            clips.insert(
                name.to_string(),
                ClipInfo {
                    path: relative.clone(),
                    tags,
                    text: None,
                },
            );
            added += 1;
        }

        std::fs::write(&info_file, serde_json::to_string_pretty(&clips)?)?;
        info!("📂 Cargados {} clips locales ({} nuevos)", clips.len(), added);

        Ok(Self { clips_dir, clips })
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ClipInfo> {
        self.clips.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.clips.contains_key(name)
    }

    pub fn path_of(&self, info: &ClipInfo) -> PathBuf {
        self.clips_dir.join(&info.path)
    }

    pub fn resolve(&self, name: &str) -> Result<Clip, UserError> {
        let info = self
            .clips
            .get(name)
            .ok_or_else(|| UserError::ClipNotFound(name.to_string()))?;

        let clip = Clip::new(ClipKind::Local, name, self.path_of(info));
        Ok(match &info.text {
            Some(text) => clip.with_text(text.clone()),
            None => clip,
        })
    }

    /// All clip names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.clips.keys().map(String::as_str).collect()
    }

    /// Every distinct tag, sorted.
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.clips.values().flat_map(ClipInfo::tags).collect();
        tags.sort_unstable();
        tags.dedup();
        tags
    }

    pub fn with_tag(&self, tag: &str) -> Vec<&str> {
        self.clips
            .iter()
            .filter(|(_, info)| info.tags().any(|t| t == tag))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// The `count` most recently added clip files, newest first.
    pub fn newest(&self, count: usize) -> Vec<&str> {
        let mut dated: Vec<(SystemTime, &str)> = self
            .clips
            .iter()
            .map(|(name, info)| {
                let added = std::fs::metadata(self.path_of(info))
                    .and_then(|m| m.created().or_else(|_| m.modified()))
                    .unwrap_or(SystemTime::UNIX_EPOCH);
                (added, name.as_str())
            })
            .collect();
        dated.sort_by(|a, b| b.0.cmp(&a.0));
        dated.into_iter().take(count).map(|(_, name)| name).collect()
    }

    /// Clip whose transcript reads like `simple_text` (see [`simplify`]).
    pub fn find_by_text(&self, simple_text: &str) -> Option<&str> {
        self.clips
            .iter()
            .find(|(_, info)| {
                let text = simplify(info.text.as_deref().unwrap_or_default());
                !text.is_empty() && text == simple_text
            })
            .map(|(name, _)| name.as_str())
    }
}

fn collect_audio_files(root: &Path, dir: &Path, found: &mut Vec<String>) -> Result<()> {
    let audio = Regex::new(&format!(r"(?i)^(?:{AUDIO_EXTENSIONS})$"))?;

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("No se pudo leer el directorio de clips {}: {}", dir.display(), e);
            return Ok(());
        }
    };

    for entry in entries {
        let path = entry?.path();
        if path.is_dir() {
            collect_audio_files(root, &path, found)?;
            continue;
        }
        let is_audio = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| audio.is_match(e));
        if !is_audio {
            continue;
        }
        if let Ok(relative) = path.strip_prefix(root) {
            let relative: Vec<_> = relative.components().map(|c| c.as_os_str().to_string_lossy()).collect();
            found.push(relative.join("/"));
        }
    }
    found.sort();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn touch(dir: &Path, relative: &str) {
        let path = dir.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"ID3").unwrap();
    }

    #[test]
    fn test_indexes_new_files_with_tags() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "hello.mp3");
        touch(dir.path(), "memes/later/later3.wav");
        touch(dir.path(), "notes.txt");

        let catalog = LocalCatalog::load(dir.path()).unwrap();

        assert_eq!(catalog.names(), vec!["hello", "later3"]);
        assert_eq!(
            catalog.get("hello"),
            Some(&ClipInfo { path: "hello.mp3".to_string(), tags: None, text: None })
        );
        assert_eq!(catalog.get("later3").unwrap().tags.as_deref(), Some("memes/later"));

        // el catálogo se reescribe en disco
        let written: BTreeMap<String, ClipInfo> =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join(INFO_FILE)).unwrap()).unwrap();
        assert_eq!(written.len(), 2);
    }

    #[test]
    fn test_keeps_existing_entries() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "renamed.mp3");
        std::fs::write(
            dir.path().join(INFO_FILE),
            r#"{"yodel": {"path": "renamed.mp3", "tags": "music|loud", "text": "Yodel-ay-ee-oo!"}}"#,
        )
        .unwrap();

        let catalog = LocalCatalog::load(dir.path()).unwrap();

        // archivo ya indexado con otro nombre, no se agrega nada
        assert_eq!(catalog.names(), vec!["yodel"]);
        assert_eq!(catalog.tags(), vec!["loud", "music"]);
        assert_eq!(catalog.with_tag("loud"), vec!["yodel"]);
        assert_eq!(catalog.find_by_text("yodelayeeoo"), Some("yodel"));
    }

    #[test]
    fn test_resolve() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "hello.mp3");
        let catalog = LocalCatalog::load(dir.path()).unwrap();

        let clip = catalog.resolve("hello").unwrap();
        assert_eq!(clip.clip_id(), "local:hello");
        assert!(!clip.is_temporary());
        assert_eq!(clip.audio_path(), dir.path().join("hello.mp3"));

        assert!(matches!(catalog.resolve("nope"), Err(UserError::ClipNotFound(name)) if name == "nope"));
    }
}
