//! The seam between a guild's [`AudioSession`] and whatever actually streams
//! audio into the voice channel.
//!
//! Sinks report the end of every playback attempt through a [`PlaybackDone`]
//! handle. Finishing the handle hands the completion to the session's own
//! task and then waits until the session has processed it, so a sink can never
//! start the next clip before the session has seen the previous one end.
//!
//! [`AudioSession`]: crate::audio::session::AudioSession

use anyhow::Result;
use async_trait::async_trait;
use serenity::model::id::{ChannelId, GuildId};
use std::{path::Path, sync::Arc};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

/// Output side of a guild's audio.
#[async_trait]
pub trait VoiceSink: Send + Sync {
    /// Opens a voice connection to `channel`.
    async fn connect(&self, channel: ChannelId) -> Result<()>;

    /// Moves the live connection to another channel of the same guild.
    async fn move_to(&self, channel: ChannelId) -> Result<()>;

    /// Starts streaming `path`. `done` must be finished exactly once when the
    /// stream ends, fails, or is stopped.
    async fn play(&self, path: &Path, volume: f32, done: PlaybackDone) -> Result<()>;

    /// Stops the current stream, if any. Completion is still reported
    /// through the stream's [`PlaybackDone`].
    async fn stop(&self);

    async fn is_playing(&self) -> bool;

    async fn disconnect(&self) -> Result<()>;
}

/// Creates one sink per guild.
pub trait SinkFactory: Send + Sync {
    fn create(&self, guild_id: GuildId) -> Arc<dyn VoiceSink>;
}

/// A finished playback attempt travelling from the sink to the session.
#[derive(Debug)]
pub struct Completion {
    pub attempt: u64,
    pub error: Option<String>,
    ack: Option<oneshot::Sender<()>>,
}

impl Completion {
    /// Releases the sink waiting on this completion.
    pub fn acknowledge(mut self) {
        if let Some(ack) = self.ack.take() {
            let _ = ack.send(());
        }
    }
}

/// One-shot completion handle given to the sink with every clip.
#[derive(Debug)]
pub struct PlaybackDone {
    attempt: u64,
    tx: Option<mpsc::UnboundedSender<Completion>>,
}

impl PlaybackDone {
    pub(crate) fn new(attempt: u64, tx: mpsc::UnboundedSender<Completion>) -> Self {
        Self {
            attempt,
            tx: Some(tx),
        }
    }

    pub fn attempt(&self) -> u64 {
        self.attempt
    }

    /// Reports the end of playback and waits until the session handled it.
    pub async fn finish(mut self, error: Option<String>) {
        if let Some(ack) = self.send(error) {
            let _ = ack.await;
        }
    }

    fn send(&mut self, error: Option<String>) -> Option<oneshot::Receiver<()>> {
        let tx = self.tx.take()?;
        let (ack_tx, ack_rx) = oneshot::channel();
        tx.send(Completion {
            attempt: self.attempt,
            error,
            ack: Some(ack_tx),
        })
        .ok()?;
        Some(ack_rx)
    }
}

impl Drop for PlaybackDone {
    // Un sink que pierde el handle igual termina el intento, si no la
    // sesión esperaría este clip para siempre.
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            debug!("Handle de reproducción {} descartado sin completar", self.attempt);
            let _ = tx.send(Completion {
                attempt: self.attempt,
                error: Some("playback handle dropped before completion".to_string()),
                ack: None,
            });
        }
    }
}
