use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use serenity::model::id::{ChannelId, GuildId, UserId};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::{
    audio::{session::AudioSession, sink::SinkFactory},
    error::UserError,
};

const NOT_ON_THIS_SERVER: &str =
    "I'm not in a voice channel on this server/guild. Have an admin summon me into one.";
const NOT_WITH_YOU: &str = "You're not in any voice channels that I'm in";
const BANNED: &str = "Nice try, but you're banned in the voice channel that I'm in";

/// What the registry needs to know about the chat platform.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VoiceDirectory: Send + Sync {
    /// Guild owning a voice channel, `None` if the channel does not exist.
    async fn guild_of_channel(&self, channel: ChannelId) -> Option<GuildId>;

    /// Voice channel a member of `guild_id` is currently in.
    async fn voice_channel_of(&self, guild_id: GuildId, user_id: UserId) -> Option<ChannelId>;

    async fn is_banned(&self, guild_id: GuildId, user_id: UserId) -> bool;
}

/// Who is asking for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Guild(GuildId),
    Channel(ChannelId),
    /// A user, wherever they are (private messages, presence events).
    User(UserId),
}

struct Registered {
    order: u64,
    session: Arc<AudioSession>,
}

/// All live audio sessions, one per guild.
pub struct SessionRegistry {
    sessions: DashMap<GuildId, Registered>,
    /// Serializes connect and disconnect.
    membership: Mutex<()>,
    next_order: AtomicU64,
    directory: Arc<dyn VoiceDirectory>,
    sinks: Arc<dyn SinkFactory>,
}

impl SessionRegistry {
    pub fn new(directory: Arc<dyn VoiceDirectory>, sinks: Arc<dyn SinkFactory>) -> Self {
        Self {
            sessions: DashMap::new(),
            membership: Mutex::new(()),
            next_order: AtomicU64::new(0),
            directory,
            sinks,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Sessions in registration order.
    pub fn sessions(&self) -> Vec<Arc<AudioSession>> {
        let mut sessions: Vec<_> = self
            .sessions
            .iter()
            .map(|entry| (entry.order, entry.session.clone()))
            .collect();
        sessions.sort_by_key(|(order, _)| *order);
        sessions.into_iter().map(|(_, session)| session).collect()
    }

    fn get(&self, guild_id: GuildId) -> Option<Arc<AudioSession>> {
        self.sessions.get(&guild_id).map(|entry| entry.session.clone())
    }

    /// Puts the guild's session into `channel`, creating the session first
    /// if the guild has none.
    pub async fn connect(&self, channel: ChannelId) -> Result<Arc<AudioSession>> {
        let guild_id = self
            .directory
            .guild_of_channel(channel)
            .await
            .ok_or(UserError::ChannelNotFound)?;

        let _membership = self.membership.lock().await;

        if let Some(session) = self.get(guild_id) {
            session.connect(channel).await?;
            return Ok(session);
        }

        let session = AudioSession::new(guild_id, self.sinks.create(guild_id));
        session.connect(channel).await?;
        self.sessions.insert(
            guild_id,
            Registered {
                order: self.next_order.fetch_add(1, Ordering::SeqCst),
                session: session.clone(),
            },
        );
        info!("🎛️ Sesión de audio registrada para guild {}", guild_id);
        Ok(session)
    }

    /// Leaves voice in `guild_id` and forgets its session.
    pub async fn disconnect(&self, guild_id: GuildId) -> Result<()> {
        let _membership = self.membership.lock().await;

        let (_, registered) = self
            .sessions
            .remove(&guild_id)
            .ok_or_else(|| UserError::AudioSessionNotFound(NOT_ON_THIS_SERVER.to_string()))?;
        registered.session.disconnect().await?;
        info!("🗑️ Sesión de audio eliminada para guild {}", guild_id);
        Ok(())
    }

    /// Session for `scope`, or a user-facing error explaining why there is none.
    pub async fn resolve(&self, scope: Scope) -> Result<Arc<AudioSession>, UserError> {
        self.find(scope).await?.ok_or_else(|| {
            let message = match scope {
                Scope::User(_) => NOT_WITH_YOU,
                Scope::Guild(_) | Scope::Channel(_) => NOT_ON_THIS_SERVER,
            };
            UserError::AudioSessionNotFound(message.to_string())
        })
    }

    /// Like [`resolve`](Self::resolve) but a missing session is `Ok(None)`.
    /// Banned users still get an error.
    pub async fn find(&self, scope: Scope) -> Result<Option<Arc<AudioSession>>, UserError> {
        match scope {
            Scope::Guild(guild_id) => Ok(self.get(guild_id)),
            Scope::Channel(channel) => {
                let guild_id = self
                    .directory
                    .guild_of_channel(channel)
                    .await
                    .ok_or(UserError::ChannelNotFound)?;
                Ok(self.get(guild_id))
            }
            Scope::User(user_id) => self.find_for_user(user_id).await,
        }
    }

    async fn find_for_user(&self, user_id: UserId) -> Result<Option<Arc<AudioSession>>, UserError> {
        for session in self.sessions() {
            let Some(channel) = session.channel() else {
                continue;
            };
            let guild_id = session.guild_id();
            if self.directory.voice_channel_of(guild_id, user_id).await != Some(channel) {
                continue;
            }
            if self.directory.is_banned(guild_id, user_id).await {
                debug!("Usuario baneado {} intentó usar audio en guild {}", user_id, guild_id);
                return Err(UserError::AudioSessionNotFound(BANNED.to_string()));
            }
            return Ok(Some(session));
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{
        clip::{Clip, ClipKind},
        testing::{FakeSinkFactory, SinkEvent},
    };
    use pretty_assertions::assert_eq;

    const BANNED_USER: u64 = 666;

    // guild 1 tiene los canales 10 y 11, guild 2 tiene el canal 20.
    // usuario 5 está en el canal 10, usuario 6 en el canal 99 de guild 2,
    // usuario 666 está en el canal 10 pero está baneado ahí.
    fn directory() -> MockVoiceDirectory {
        let mut directory = MockVoiceDirectory::new();
        directory
            .expect_guild_of_channel()
            .returning(|channel| match channel.get() {
                10 | 11 => Some(GuildId::new(1)),
                20 | 99 => Some(GuildId::new(2)),
                _ => None,
            });
        directory
            .expect_voice_channel_of()
            .returning(|guild, user| match (guild.get(), user.get()) {
                (1, 5) | (1, BANNED_USER) => Some(ChannelId::new(10)),
                (2, 6) => Some(ChannelId::new(99)),
                _ => None,
            });
        directory
            .expect_is_banned()
            .returning(|_, user| user.get() == BANNED_USER);
        directory
    }

    fn registry() -> (SessionRegistry, Arc<FakeSinkFactory>) {
        let sinks = Arc::new(FakeSinkFactory::default());
        (SessionRegistry::new(Arc::new(directory()), sinks.clone()), sinks)
    }

    fn session_error(result: Result<Arc<AudioSession>, UserError>) -> String {
        match result {
            Err(UserError::AudioSessionNotFound(message)) => message,
            Err(other) => panic!("unexpected error {other:?}"),
            Ok(_) => panic!("expected no session"),
        }
    }

    #[tokio::test]
    async fn test_connect_reuses_guild_session() {
        let (registry, sinks) = registry();

        let first = registry.connect(ChannelId::new(10)).await.unwrap();
        let second = registry.connect(ChannelId::new(11)).await.unwrap();
        registry.connect(ChannelId::new(20)).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 2);
        assert_eq!(sinks.created(), 2);
        assert_eq!(
            sinks.sink(GuildId::new(1)).unwrap().events(),
            vec![SinkEvent::Connect(10), SinkEvent::Move(11)]
        );
        let guilds: Vec<_> = registry.sessions().iter().map(|s| s.guild_id().get()).collect();
        assert_eq!(guilds, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_connect_to_unknown_channel() {
        let (registry, sinks) = registry();

        let err = registry.connect(ChannelId::new(404)).await.err().unwrap();

        assert!(matches!(err.downcast_ref::<UserError>(), Some(UserError::ChannelNotFound)));
        assert!(registry.is_empty());
        assert_eq!(sinks.created(), 0);
    }

    #[tokio::test]
    async fn test_guild_and_channel_lookup() {
        let (registry, _) = registry();
        let session = registry.connect(ChannelId::new(10)).await.unwrap();

        let by_guild = registry.resolve(Scope::Guild(GuildId::new(1))).await.unwrap();
        let by_channel = registry.resolve(Scope::Channel(ChannelId::new(11))).await.unwrap();
        assert!(Arc::ptr_eq(&session, &by_guild));
        assert!(Arc::ptr_eq(&session, &by_channel));

        let missing = registry.resolve(Scope::Guild(GuildId::new(2))).await;
        assert_eq!(session_error(missing), NOT_ON_THIS_SERVER);
        assert!(registry.find(Scope::Guild(GuildId::new(2))).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_user_lookup() {
        let (registry, _) = registry();
        let guild_one = registry.connect(ChannelId::new(10)).await.unwrap();
        registry.connect(ChannelId::new(20)).await.unwrap();

        let found = registry.resolve(Scope::User(UserId::new(5))).await.unwrap();
        assert!(Arc::ptr_eq(&found, &guild_one));

        // usuario 6 está en guild 2, pero no en el canal del bot
        let elsewhere = registry.resolve(Scope::User(UserId::new(6))).await;
        assert_eq!(session_error(elsewhere), NOT_WITH_YOU);
        assert!(registry.find(Scope::User(UserId::new(7))).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_banned_user_gets_distinct_error() {
        let (registry, _) = registry();
        registry.connect(ChannelId::new(10)).await.unwrap();

        let banned = registry.resolve(Scope::User(UserId::new(BANNED_USER))).await;
        assert_eq!(session_error(banned), BANNED);
        assert!(registry.find(Scope::User(UserId::new(BANNED_USER))).await.is_err());
    }

    #[tokio::test]
    async fn test_disconnect_drops_session() {
        let (registry, sinks) = registry();
        let stale = registry.connect(ChannelId::new(10)).await.unwrap();

        registry.disconnect(GuildId::new(1)).await.unwrap();

        assert!(registry.is_empty());
        assert!(sinks.sink(GuildId::new(1)).unwrap().events().contains(&SinkEvent::Disconnect));
        let clip = Clip::new(ClipKind::Local, "hello", "clips/hello.mp3");
        assert!(matches!(stale.enqueue(clip).await, Err(UserError::NotConnected)));
        assert!(registry.disconnect(GuildId::new(1)).await.is_err());

        // reconectar crea una sesión nueva
        let fresh = registry.connect(ChannelId::new(10)).await.unwrap();
        assert!(!Arc::ptr_eq(&stale, &fresh));
    }

    #[tokio::test]
    async fn test_guilds_play_independently() {
        let (registry, sinks) = registry();
        let one = registry.connect(ChannelId::new(10)).await.unwrap();
        let two = registry.connect(ChannelId::new(20)).await.unwrap();

        one.enqueue(Clip::new(ClipKind::Local, "a", "a.mp3")).await.unwrap();
        one.enqueue(Clip::new(ClipKind::Local, "b", "b.mp3")).await.unwrap();
        two.enqueue(Clip::new(ClipKind::Local, "c", "c.mp3")).await.unwrap();

        assert_eq!(sinks.sink(GuildId::new(1)).unwrap().played().len(), 1);
        assert_eq!(sinks.sink(GuildId::new(2)).unwrap().played().len(), 1);

        sinks.sink(GuildId::new(2)).unwrap().finish_current(None).await;
        assert_eq!(one.queue_len(), 1);
        assert!(!two.is_playing().await);
    }
}
