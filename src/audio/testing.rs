//! In-memory [`VoiceSink`] for exercising sessions without a voice gateway.

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use serenity::model::id::{ChannelId, GuildId};
use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use crate::audio::sink::{PlaybackDone, SinkFactory, VoiceSink};

#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    Connect(u64),
    Move(u64),
    /// Path handed to the sink and whether the file existed at that moment.
    Play(PathBuf, bool),
    Stop,
    Disconnect,
}

#[derive(Default)]
pub struct FakeSink {
    events: Mutex<Vec<SinkEvent>>,
    current: Mutex<Option<PlaybackDone>>,
    rejected: Mutex<Vec<PathBuf>>,
    overlapped: AtomicBool,
}

impl FakeSink {
    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().clone()
    }

    pub fn played(&self) -> Vec<PathBuf> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                SinkEvent::Play(path, _) => Some(path.clone()),
                _ => None,
            })
            .collect()
    }

    /// Makes `play` fail for this path.
    pub fn fail_on(&self, path: impl Into<PathBuf>) {
        self.rejected.lock().push(path.into());
    }

    /// True if a clip was ever started while another was still playing.
    pub fn overlapped(&self) -> bool {
        self.overlapped.load(Ordering::SeqCst)
    }

    /// Ends the current clip the way a driver thread would. Returns false
    /// when nothing was playing.
    pub async fn finish_current(&self, error: Option<&str>) -> bool {
        let done = self.current.lock().take();
        match done {
            Some(done) => {
                done.finish(error.map(str::to_string)).await;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl VoiceSink for FakeSink {
    async fn connect(&self, channel: ChannelId) -> Result<()> {
        self.events.lock().push(SinkEvent::Connect(channel.get()));
        Ok(())
    }

    async fn move_to(&self, channel: ChannelId) -> Result<()> {
        self.events.lock().push(SinkEvent::Move(channel.get()));
        Ok(())
    }

    async fn play(&self, path: &Path, _volume: f32, done: PlaybackDone) -> Result<()> {
        if self.rejected.lock().iter().any(|p| p == path) {
            anyhow::bail!("cannot open {}", path.display());
        }
        self.events
            .lock()
            .push(SinkEvent::Play(path.to_path_buf(), path.exists()));

        let mut current = self.current.lock();
        if current.is_some() {
            self.overlapped.store(true, Ordering::SeqCst);
        }
        *current = Some(done);
        Ok(())
    }

    async fn stop(&self) {
        self.events.lock().push(SinkEvent::Stop);
        let done = self.current.lock().take();
        if let Some(done) = done {
            done.finish(None).await;
        }
    }

    async fn is_playing(&self) -> bool {
        self.current.lock().is_some()
    }

    async fn disconnect(&self) -> Result<()> {
        self.events.lock().push(SinkEvent::Disconnect);
        self.current.lock().take();
        Ok(())
    }
}

/// Hands out one shared [`FakeSink`] per guild.
#[derive(Default)]
pub struct FakeSinkFactory {
    sinks: Mutex<Vec<(GuildId, Arc<FakeSink>)>>,
}

impl FakeSinkFactory {
    pub fn sink(&self, guild_id: GuildId) -> Option<Arc<FakeSink>> {
        self.sinks
            .lock()
            .iter()
            .find(|(g, _)| *g == guild_id)
            .map(|(_, s)| s.clone())
    }

    pub fn created(&self) -> usize {
        self.sinks.lock().len()
    }
}

impl SinkFactory for FakeSinkFactory {
    fn create(&self, guild_id: GuildId) -> Arc<dyn VoiceSink> {
        let sink = Arc::new(FakeSink::default());
        self.sinks.lock().push((guild_id, sink.clone()));
        sink
    }
}
