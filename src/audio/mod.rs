//! # Audio Module
//!
//! Per-guild clip playback for the bot.
//!
//! ## Architecture
//!
//! ### [`session`] - Audio Session
//! - One [`session::AudioSession`] per guild, owning the voice connection
//!   state, the clip queue and the last played clip
//! - Plays clips strictly one at a time in enqueue order
//! - Deletes transient (synthesized/downloaded) files once the next clip
//!   takes over
//!
//! ### [`registry`] - Session Registry
//! - Finds the right session for a guild, a channel or a user
//! - Creates sessions on connect, drops them on disconnect
//! - Applies per-guild bans to user lookups
//!
//! ### [`sink`] / [`voice`] - Voice Output
//! - [`sink::VoiceSink`] is the output seam; [`voice::SongbirdSink`] streams
//!   through songbird
//! - Completions travel back through a [`sink::PlaybackDone`] handle that
//!   blocks the driver until the session has handled them
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! let session = registry.connect(channel_id).await?;
//! let clip = sources.resolve("tts:hello there").await?;
//! session.enqueue(clip).await?;
//! ```

pub mod clip;
pub mod length;
pub mod queue;
pub mod registry;
pub mod session;
pub mod sink;
pub mod voice;

#[cfg(test)]
pub(crate) mod testing;
