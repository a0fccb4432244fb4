use anyhow::Result;
use parking_lot::Mutex as SyncMutex;
use serenity::model::id::{ChannelId, GuildId};
use std::{
    path::Path,
    sync::{Arc, Weak},
};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use crate::{
    audio::{
        clip::Clip,
        queue::ClipQueue,
        sink::{Completion, PlaybackDone, VoiceSink},
    },
    error::{PlaybackError, UserError},
};

/// Audio output for one guild.
///
/// Clips are played strictly one after another in the order they were
/// enqueued. All decisions about what plays next are taken while holding the
/// session's playback lock, both from [`enqueue`](Self::enqueue) and from the
/// sink's completion handoff, so a clip can never be started twice and a
/// completion can never be lost.
pub struct AudioSession {
    guild_id: GuildId,
    sink: Arc<dyn VoiceSink>,
    queue: ClipQueue,
    /// Written only while `playback` is held.
    channel: SyncMutex<Option<ChannelId>>,
    playback: Mutex<PlaybackState>,
    handoff: mpsc::UnboundedSender<Completion>,
}

#[derive(Debug, Default)]
struct PlaybackState {
    last_clip: Option<Clip>,
    /// Attempt handed to the sink whose completion has not been processed.
    in_flight: Option<u64>,
    next_attempt: u64,
}

impl AudioSession {
    /// Creates the session and spawns the task that receives completions
    /// from the sink. Must be called inside a tokio runtime.
    pub fn new(guild_id: GuildId, sink: Arc<dyn VoiceSink>) -> Arc<Self> {
        let (handoff, completions) = mpsc::unbounded_channel();
        let session = Arc::new(Self {
            guild_id,
            sink,
            queue: ClipQueue::new(),
            channel: SyncMutex::new(None),
            playback: Mutex::new(PlaybackState::default()),
            handoff,
        });

        tokio::spawn(run_handoff(Arc::downgrade(&session), completions));
        session
    }

    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    /// Voice channel the session is connected to.
    pub fn channel(&self) -> Option<ChannelId> {
        *self.channel.lock()
    }

    pub fn is_connected(&self) -> bool {
        self.channel().is_some()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn queued_clip_ids(&self) -> Vec<String> {
        self.queue.clip_ids()
    }

    pub async fn last_clip(&self) -> Option<Clip> {
        self.playback.lock().await.last_clip.clone()
    }

    /// Whether a clip has been handed to the sink and not yet reported done.
    pub async fn is_playing(&self) -> bool {
        self.playback.lock().await.in_flight.is_some()
    }

    /// Connects to `channel`, or moves the existing connection there.
    pub async fn connect(&self, channel: ChannelId) -> Result<()> {
        let _playback = self.playback.lock().await;

        match self.channel() {
            Some(current) if current == channel => {
                debug!("Ya en el canal {} de guild {}", channel, self.guild_id);
                return Ok(());
            }
            Some(current) => {
                info!("🔀 Moviendo de {} a {} en guild {}", current, channel, self.guild_id);
                self.sink.move_to(channel).await?;
            }
            None => {
                info!("🔊 Conectando a {} en guild {}", channel, self.guild_id);
                self.sink.connect(channel).await?;
            }
        }

        *self.channel.lock() = Some(channel);
        Ok(())
    }

    /// Queues a clip, starting it right away when nothing is playing.
    pub async fn enqueue(&self, clip: Clip) -> Result<(), UserError> {
        let mut playback = self.playback.lock().await;

        if !self.is_connected() {
            warn!("Se intentó encolar {} sin estar en un canal de voz", clip.clip_id());
            return Err(UserError::NotConnected);
        }

        self.queue.push(clip);

        if playback.in_flight.is_none() {
            self.advance(&mut playback).await;
        }

        Ok(())
    }

    /// Drops every queued clip and stops the one playing.
    pub async fn stop(&self) {
        let in_flight = {
            let playback = self.playback.lock().await;
            self.queue.clear();
            playback.in_flight.is_some()
        };

        // El sink reporta el clip detenido por su handle de completado,
        // que necesita el lock de reproducción, hay que soltarlo aquí.
        if in_flight || self.sink.is_playing().await {
            info!("⏹️ Deteniendo reproducción en guild {}", self.guild_id);
            self.sink.stop().await;
        }
    }

    /// Leaves the voice channel. The session refuses clips afterwards.
    pub async fn disconnect(&self) -> Result<()> {
        let mut playback = self.playback.lock().await;

        let channel = self.channel.lock().take();
        playback.in_flight = None;
        self.queue.clear();

        if channel.is_some() {
            self.sink.disconnect().await?;
            info!("👋 Desconectado de voz en guild {}", self.guild_id);
        }
        Ok(())
    }

    /// Handles the end of playback attempt `attempt`.
    pub async fn on_playback_done(&self, attempt: u64, error: Option<&str>) {
        let mut playback = self.playback.lock().await;

        if playback.in_flight != Some(attempt) {
            debug!("Ignorando completado viejo {} en guild {}", attempt, self.guild_id);
            return;
        }
        if let Some(error) = error {
            warn!("Error en reproducción de voz en guild {}: {}", self.guild_id, error);
        }

        playback.in_flight = None;
        if self.is_connected() && !self.queue.is_empty() {
            self.advance(&mut playback).await;
        }
    }

    /// Plays queued clips until one is accepted by the sink or the queue
    /// runs dry.
    async fn advance(&self, playback: &mut PlaybackState) {
        loop {
            match self.play_next(playback).await {
                Ok(()) => return,
                Err(PlaybackError::EmptyQueue) => {
                    debug!("📭 Cola vacía en guild {}", self.guild_id);
                    return;
                }
                Err(e) => warn!("Saltando clip en guild {}: {}", self.guild_id, e),
            }
        }
    }

    async fn play_next(&self, playback: &mut PlaybackState) -> Result<(), PlaybackError> {
        let clip = self.queue.pop().ok_or(PlaybackError::EmptyQueue)?;

        if let Some(previous) = playback.last_clip.take() {
            self.retire(&previous, &clip).await;
        }
        playback.last_clip = Some(clip.clone());

        let attempt = playback.next_attempt;
        playback.next_attempt += 1;
        playback.in_flight = Some(attempt);

        info!("▶️ Reproduciendo {} en guild {}", clip.clip_id(), self.guild_id);
        let done = PlaybackDone::new(attempt, self.handoff.clone());
        if let Err(e) = self.sink.play(clip.audio_path(), clip.volume(), done).await {
            playback.in_flight = None;
            return Err(PlaybackError::Sink(format!("{}: {e}", clip.clip_id())));
        }
        Ok(())
    }

    /// Deletes the previous clip's temp file once another clip takes over.
    async fn retire(&self, previous: &Clip, next: &Clip) {
        if !previous.is_temporary() || previous.audio_path() == next.audio_path() {
            return;
        }
        if self.queue.references(previous.audio_path()) {
            debug!("Se conserva {}, sigue en cola", previous.audio_path().display());
            return;
        }
        remove_temp_file(previous.audio_path()).await;
    }
}

async fn remove_temp_file(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!("🧹 Archivo temporal borrado {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("No se pudo borrar el archivo temporal {}: {}", path.display(), e),
    }
}

/// Receives completions from the sink and runs them on the session.
///
/// The sink stays blocked in [`PlaybackDone::finish`] until the completion
/// has been acknowledged, which happens only after the session is done with
/// it (including starting the next clip).
async fn run_handoff(session: Weak<AudioSession>, mut completions: mpsc::UnboundedReceiver<Completion>) {
    while let Some(completion) = completions.recv().await {
        let Some(session) = session.upgrade() else {
            completion.acknowledge();
            break;
        };
        session
            .on_playback_done(completion.attempt, completion.error.as_deref())
            .await;
        completion.acknowledge();
    }
}
