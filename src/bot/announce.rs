//! Spoken intros and outros when members join or leave the bot's channel.

use anyhow::Result;
use serenity::all::{ChannelId, Context, GuildId, UserId, VoiceState};
use std::time::Duration;
use tracing::{debug, info};

use crate::{
    audio::registry::Scope,
    bot::ClipBot,
    storage::{GuildSettings, UserSettings},
};

const OUTRO_DELAY: Duration = Duration::from_millis(500);
const INTRO_DELAY: Duration = Duration::from_secs(3);

/// Makes a display name pronounceable: shouting names are lowercased and
/// digits standing in for letters (`l33t` style) become those letters.
pub fn fix_name(name: &str) -> String {
    let mut name = if name.chars().any(|c| c.is_ascii_lowercase()) {
        name.to_string()
    } else {
        name.to_lowercase()
    };

    for (digit, letter) in [('0', 'o'), ('1', 'i'), ('3', 'e'), ('4', 'a'), ('7', 't')] {
        let chars: Vec<char> = name.chars().collect();
        name = chars
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                let before_letter = chars.get(i + 1).is_some_and(|n| n.is_ascii_alphabetic());
                if c == digit && before_letter {
                    letter
                } else {
                    c
                }
            })
            .collect();
    }
    name
}

/// Text spoken after a member's intro clip.
pub fn intro_text(settings: &UserSettings, name: &str) -> String {
    let is_default = settings.intro == UserSettings::DEFAULT_INTRO
        && settings.intro_tts == UserSettings::DEFAULT_INTRO_TTS;
    if is_default {
        format!(" {}", fix_name(name))
    } else {
        format!("{} {}", settings.intro_tts, fix_name(name))
    }
}

/// Text spoken after a member's outro clip.
pub fn outro_text(settings: &UserSettings, name: &str) -> String {
    format!("{} {}", fix_name(name), settings.outro_tts)
}

/// What a voice state change owes the channel the bot sits in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Greetings {
    pub outro: bool,
    pub intro: bool,
}

/// Decides the announcements for a member moving from `before` to `after`.
/// Only moves out of or into `bot_channel` count, and other bots are never
/// announced.
pub fn greetings(
    other_bot: bool,
    before: Option<ChannelId>,
    after: Option<ChannelId>,
    bot_channel: Option<ChannelId>,
    guild: &GuildSettings,
) -> Greetings {
    if other_bot || before == after || bot_channel.is_none() {
        return Greetings::default();
    }
    Greetings {
        outro: guild.outros && before == bot_channel,
        intro: guild.intros && after == bot_channel,
    }
}

pub async fn on_voice_state(ctx: &Context, bot: &ClipBot, old: Option<&VoiceState>, new: &VoiceState) -> Result<()> {
    let Some(guild_id) = new.guild_id else {
        return Ok(());
    };

    let user = match &new.member {
        Some(member) => member.user.clone(),
        None => new.user_id.to_user(ctx).await?,
    };
    let other_bot = user.bot && user.id != ctx.cache.current_user().id;

    let bot_channel = match bot.registry.find(Scope::Guild(guild_id)).await? {
        Some(session) => session.channel(),
        None => None,
    };
    let guild = bot.storage.lock().await.guild(guild_id.get());
    let before = old.and_then(|o| o.channel_id);

    let owed = greetings(other_bot, before, new.channel_id, bot_channel, &guild);
    if owed == Greetings::default() {
        debug!("Sin anuncios para {} en guild {}", user.name, guild_id);
        return Ok(());
    }

    if owed.outro {
        outro(bot, guild_id, user.id, &user.name).await?;
    }
    if owed.intro {
        intro(bot, guild_id, user.id, &user.name).await?;
    }
    Ok(())
}

async fn outro(bot: &ClipBot, guild_id: GuildId, user_id: UserId, name: &str) -> Result<()> {
    let settings = bot.storage.lock().await.user(user_id.get()).await?;
    let text = outro_text(&settings, name);
    info!("👋 Despedida para {} en guild {}", name, guild_id);

    tokio::time::sleep(OUTRO_DELAY).await;
    bot.play_in_guild(guild_id, &settings.outro).await?;
    bot.play_in_guild(guild_id, &format!("tts:{text}")).await
}

async fn intro(bot: &ClipBot, guild_id: GuildId, user_id: UserId, name: &str) -> Result<()> {
    let settings = bot.storage.lock().await.user(user_id.get()).await?;
    let text = intro_text(&settings, name);
    info!("🙋 Presentación para {} en guild {}", name, guild_id);

    tokio::time::sleep(INTRO_DELAY).await;
    bot.play_in_guild(guild_id, &settings.intro).await?;
    bot.play_in_guild(guild_id, &format!("tts:{text}")).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_fix_name_lowercases_shouting() {
        assert_eq!(fix_name("DILLERM"), "dillerm");
        assert_eq!(fix_name("XX_420_XX"), "xx_420_xx");
        assert_eq!(fix_name("MacGyver"), "MacGyver");
    }

    #[test]
    fn test_fix_name_reads_digits_as_letters() {
        assert_eq!(fix_name("3lite"), "elite");
        assert_eq!(fix_name("h4ck3r"), "hacker");
        assert_eq!(fix_name("SK1LLZ"), "skillz");
        // una pasada por dígito, solo cambia el dígito junto a una letra
        assert_eq!(fix_name("n00b"), "n0ob");
        assert_eq!(fix_name("7oby"), "toby");
        // dígitos al final o sueltos se quedan
        assert_eq!(fix_name("player 1"), "player 1");
        assert_eq!(fix_name("agent47"), "agent47");
    }

    #[test]
    fn test_default_intro_speaks_name_only() {
        let settings = UserSettings::default();
        assert_eq!(intro_text(&settings, "Bob"), " Bob");

        let custom = UserSettings {
            intro_tts: "behold".to_string(),
            ..UserSettings::default()
        };
        assert_eq!(intro_text(&custom, "Bob"), "behold Bob");

        let other_clip = UserSettings {
            intro: "dota:axe_kill".to_string(),
            ..UserSettings::default()
        };
        assert_eq!(intro_text(&other_clip, "Bob"), "it's Bob");
    }

    #[test]
    fn test_outro_text() {
        assert_eq!(outro_text(&UserSettings::default(), "B0B"), "bob has left!");
    }

    fn channel(id: u64) -> Option<ChannelId> {
        Some(ChannelId::new(id))
    }

    #[test]
    fn test_greetings_only_for_the_bot_channel() {
        let guild = GuildSettings::default();
        let bot = channel(1);

        assert_eq!(greetings(false, None, bot, bot, &guild), Greetings { outro: false, intro: true });
        assert_eq!(greetings(false, bot, None, bot, &guild), Greetings { outro: true, intro: false });
        assert_eq!(greetings(false, bot, channel(2), bot, &guild), Greetings { outro: true, intro: false });
        assert_eq!(greetings(false, channel(2), bot, bot, &guild), Greetings { outro: false, intro: true });

        // en otro lado
        assert_eq!(greetings(false, None, channel(2), bot, &guild), Greetings::default());
        assert_eq!(greetings(false, channel(2), channel(3), bot, &guild), Greetings::default());
    }

    #[test]
    fn test_no_greetings_without_a_change() {
        let guild = GuildSettings::default();
        // mute o deafen no cambian el canal
        assert_eq!(greetings(false, channel(1), channel(1), channel(1), &guild), Greetings::default());
        // sin sesión en el guild
        assert_eq!(greetings(false, None, channel(1), None, &guild), Greetings::default());
    }

    #[test]
    fn test_other_bots_are_ignored() {
        let guild = GuildSettings::default();
        assert_eq!(greetings(true, None, channel(1), channel(1), &guild), Greetings::default());
        assert_eq!(greetings(true, channel(1), None, channel(1), &guild), Greetings::default());
    }

    #[test]
    fn test_disabled_greetings() {
        let no_intros = GuildSettings {
            intros: false,
            ..GuildSettings::default()
        };
        assert_eq!(greetings(false, None, channel(1), channel(1), &no_intros), Greetings::default());
        assert_eq!(
            greetings(false, channel(1), None, channel(1), &no_intros),
            Greetings { outro: true, intro: false }
        );

        let no_outros = GuildSettings {
            outros: false,
            ..GuildSettings::default()
        };
        assert_eq!(greetings(false, channel(1), None, channel(1), &no_outros), Greetings::default());
        assert_eq!(
            greetings(false, channel(2), channel(1), channel(1), &no_outros),
            Greetings { outro: false, intro: true }
        );
    }
}
