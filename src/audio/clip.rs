use std::{
    fmt,
    path::{Path, PathBuf},
    time::Duration,
};

/// Where a clip comes from. The set is closed; each kind has its own
/// resolution path in [`crate::sources::SourceManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClipKind {
    Local,
    Dota,
    Tts,
    Url,
}

impl ClipKind {
    pub fn prefix(self) -> &'static str {
        match self {
            ClipKind::Local => "local",
            ClipKind::Dota => "dota",
            ClipKind::Tts => "tts",
            ClipKind::Url => "url",
        }
    }

    fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "local" => Some(ClipKind::Local),
            "dota" => Some(ClipKind::Dota),
            "tts" => Some(ClipKind::Tts),
            "url" => Some(ClipKind::Url),
            _ => None,
        }
    }

    /// Splits a clip id into its kind and key.
    ///
    /// Identifiers without a known `kind:` prefix are local clip names, so
    /// `hello` and `local:hello` resolve to the same clip.
    pub fn parse_id(identifier: &str) -> (ClipKind, &str) {
        if let Some((prefix, key)) = identifier.split_once(':') {
            if let Some(kind) = Self::from_prefix(prefix) {
                return (kind, key);
            }
        }
        (ClipKind::Local, identifier)
    }
}

impl fmt::Display for ClipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// One playable unit of audio, fully resolved to a file on disk.
#[derive(Debug, Clone)]
pub struct Clip {
    kind: ClipKind,
    key: String,
    audio_path: PathBuf,
    temporary: bool,
    volume: f32,
    duration: Option<Duration>,
    text: Option<String>,
}

impl Clip {
    pub fn new(kind: ClipKind, key: impl Into<String>, audio_path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            key: key.into(),
            audio_path: audio_path.into(),
            temporary: false,
            volume: 1.0,
            duration: None,
            text: None,
        }
    }

    // Lectura
    pub fn kind(&self) -> ClipKind {
        self.kind
    }
    pub fn key(&self) -> &str {
        &self.key
    }
    pub fn clip_id(&self) -> String {
        format!("{}:{}", self.kind, self.key)
    }
    pub fn audio_path(&self) -> &Path {
        &self.audio_path
    }
    pub fn is_temporary(&self) -> bool {
        self.temporary
    }
    pub fn volume(&self) -> f32 {
        self.volume
    }
    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    // Constructores
    pub fn temporary(mut self) -> Self {
        self.temporary = true;
        self
    }

    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume;
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        if !text.is_empty() {
            self.text = Some(text);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_clip_id_parsing() {
        assert_eq!(ClipKind::parse_id("hello"), (ClipKind::Local, "hello"));
        assert_eq!(ClipKind::parse_id("local:hello"), (ClipKind::Local, "hello"));
        assert_eq!(ClipKind::parse_id("dota:timb_ally_01"), (ClipKind::Dota, "timb_ally_01"));
        assert_eq!(ClipKind::parse_id("tts:hello: there"), (ClipKind::Tts, "hello: there"));
        assert_eq!(
            ClipKind::parse_id("url:http://example.com/a.mp3"),
            (ClipKind::Url, "http://example.com/a.mp3")
        );
        // prefijos desconocidos son parte del nombre de un clip local
        assert_eq!(ClipKind::parse_id("foo:bar"), (ClipKind::Local, "foo:bar"));
    }

    #[test]
    fn test_clip_id_is_canonical() {
        let clip = Clip::new(ClipKind::Tts, "hi there", "/tmp/x.mp3").temporary();
        assert_eq!(clip.clip_id(), "tts:hi there");
        assert!(clip.is_temporary());
        assert_eq!(clip.volume(), 1.0);
        assert_eq!(clip.duration(), None);
    }

    #[test]
    fn test_empty_text_is_none() {
        let clip = Clip::new(ClipKind::Local, "yodel", "yodel.mp3").with_text("");
        assert_eq!(clip.text(), None);
    }
}
