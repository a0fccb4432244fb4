use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex as SyncMutex;
use serenity::model::id::{ChannelId, GuildId};
use songbird::{
    input::{File, Input},
    tracks::{PlayMode, Track, TrackHandle},
    Call, Event, EventContext, EventHandler as VoiceEventHandler, Songbird, TrackEvent,
};
use std::{path::Path, sync::Arc};
use tokio::sync::Mutex;
use tracing::{debug, error};

use crate::audio::sink::{PlaybackDone, SinkFactory, VoiceSink};

/// [`VoiceSink`] backed by a songbird call.
pub struct SongbirdSink {
    manager: Arc<Songbird>,
    guild_id: GuildId,
    current: SyncMutex<Option<TrackHandle>>,
}

impl SongbirdSink {
    pub fn new(manager: Arc<Songbird>, guild_id: GuildId) -> Self {
        Self {
            manager,
            guild_id,
            current: SyncMutex::new(None),
        }
    }

    fn call(&self) -> Result<Arc<Mutex<Call>>> {
        self.manager
            .get(self.guild_id)
            .ok_or_else(|| anyhow::anyhow!("Sin llamada de voz para guild {}", self.guild_id))
    }

    async fn join(&self, channel: ChannelId) -> Result<()> {
        // Songbird reutiliza la llamada del guild, unirse de nuevo la mueve.
        self.manager
            .join(self.guild_id, channel)
            .await
            .map_err(|e| anyhow::anyhow!("No se pudo unir al canal de voz {}: {}", channel, e))?;
        Ok(())
    }
}

#[async_trait]
impl VoiceSink for SongbirdSink {
    async fn connect(&self, channel: ChannelId) -> Result<()> {
        self.join(channel).await
    }

    async fn move_to(&self, channel: ChannelId) -> Result<()> {
        self.join(channel).await
    }

    async fn play(&self, path: &Path, volume: f32, done: PlaybackDone) -> Result<()> {
        let call = self.call()?;

        let input: Input = File::new(path.to_path_buf()).into();
        let track = Track::new(input).volume(volume);
        let handle = call.lock().await.play(track);

        let slot = Arc::new(SyncMutex::new(Some(done)));
        for event in [TrackEvent::End, TrackEvent::Error] {
            let handler = TrackDoneHandler {
                guild_id: self.guild_id,
                slot: slot.clone(),
            };
            if let Err(e) = handle.add_event(Event::Track(event), handler) {
                // sin eventos nadie avisaría del final
                let _ = handle.stop();
                return Err(e.into());
            }
        }

        debug!("🎧 Reproduciendo {} con volumen {:.2}", path.display(), volume);
        *self.current.lock() = Some(handle);
        Ok(())
    }

    async fn stop(&self) {
        let handle = self.current.lock().clone();
        if let Some(handle) = handle {
            if let Err(e) = handle.stop() {
                debug!("Stop sobre pista terminada en guild {}: {:?}", self.guild_id, e);
            }
        }
    }

    async fn is_playing(&self) -> bool {
        let handle = self.current.lock().clone();
        match handle {
            Some(handle) => match handle.get_info().await {
                Ok(info) => matches!(info.playing, PlayMode::Play | PlayMode::Pause),
                Err(_) => false,
            },
            None => false,
        }
    }

    async fn disconnect(&self) -> Result<()> {
        self.current.lock().take();
        self.manager.remove(self.guild_id).await?;
        Ok(())
    }
}

/// Reports the end of a track back to its session.
///
/// Registered for both `End` and `Error`; whichever fires first takes the
/// completion handle, so the session hears about each track exactly once.
struct TrackDoneHandler {
    guild_id: GuildId,
    slot: Arc<SyncMutex<Option<PlaybackDone>>>,
}

impl TrackDoneHandler {
    async fn report(&self, failure: Option<String>) {
        let done = self.slot.lock().take();
        if let Some(done) = done {
            done.finish(failure).await;
        }
    }
}

#[async_trait]
impl VoiceEventHandler for TrackDoneHandler {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        let mut failure = None;
        if let EventContext::Track(tracks) = ctx {
            for (state, _handle) in *tracks {
                if let PlayMode::Errored(e) = &state.playing {
                    error!("❌ Error de pista en guild {}: {:?}", self.guild_id, e);
                    failure = Some(format!("{e:?}"));
                }
            }
        }

        self.report(failure).await;
        None
    }
}

/// Builds a [`SongbirdSink`] for every guild that gets a session.
pub struct SongbirdSinkFactory {
    manager: Arc<Songbird>,
}

impl SongbirdSinkFactory {
    pub fn new(manager: Arc<Songbird>) -> Self {
        Self { manager }
    }
}

impl SinkFactory for SongbirdSinkFactory {
    fn create(&self, guild_id: GuildId) -> Arc<dyn VoiceSink> {
        Arc::new(SongbirdSink::new(self.manager.clone(), guild_id))
    }
}
