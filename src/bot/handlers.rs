use anyhow::Result;
use rand::{seq::SliceRandom, Rng};
use serenity::{
    builder::{CreateAttachment, CreateMessage},
    cache::Cache,
    model::{
        channel::Message,
        id::{ChannelId, GuildId, UserId},
        user::User,
        Permissions,
    },
    prelude::Context,
    utils::{content_safe, parse_user_mention, ContentSafeOptions},
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::{
    audio::{clip::Clip, registry::Scope, session::AudioSession},
    bot::{commands, commands::Invocation, ClipBot},
    error::UserError,
    sources::ClipResolver,
    storage::UserSettings,
    ui::{embeds, lists},
};

/// Longest intro or outro clip, in seconds, with a little slack.
const MAX_ANNOUNCE_CLIP_SECS: f64 = 4.5 + 0.1;
const MAX_ANNOUNCE_TTS_LEN: usize = 32;
const MAX_PINGS: i64 = 20;
const LATER_CLIPS: u32 = 19;
const GENERIC_APOLOGY: &str = "Uh-oh, sumthin dun gone wrong 😱";
const BANNED: &str = "Nice try, but you're banned from using my audio on this server";

/// Runs a prefix command
pub async fn handle_command(ctx: &Context, msg: &Message, invocation: Invocation<'_>, bot: &ClipBot) -> Result<()> {
    info!(
        "📝 Comando {}{} usado por {} en {}",
        bot.config().command_prefix,
        invocation.command.name,
        msg.author.name,
        msg.guild_id.map_or("un mensaje privado".to_string(), |g| format!("guild {}", g))
    );

    let args = invocation.args;
    match invocation.command.name {
        // Audio
        "play" => handle_play(msg, args, bot).await,
        "playurl" => handle_playurl(msg, args, bot).await,
        "clips" => handle_clips(ctx, msg, args, bot).await,
        "stop" => handle_stop(msg, bot).await,
        "replay" => handle_replay(ctx, msg, bot).await,
        "clipinfo" => handle_clipinfo(ctx, msg, args, bot).await,
        "tts" => handle_tts(ctx, msg, args, bot).await,
        "ttsclip" => handle_ttsclip(msg, args, bot).await,
        "smarttts" => handle_smarttts(ctx, msg, args, bot).await,
        "later" => handle_later(msg, bot).await,
        "setintro" => handle_set_announce_clip(ctx, msg, args, bot, Announcement::Intro).await,
        "setoutro" => handle_set_announce_clip(ctx, msg, args, bot, Announcement::Outro).await,
        "setintrotts" => handle_set_announce_tts(ctx, msg, args, bot, Announcement::Intro).await,
        "setoutrotts" => handle_set_announce_tts(ctx, msg, args, bot, Announcement::Outro).await,
        // Voz
        "summon" => handle_summon(ctx, msg, bot).await,
        "unsummon" => handle_unsummon(ctx, msg, bot).await,
        // Admin
        "ttschannel" => handle_ttschannel(ctx, msg, args, bot).await,
        "intros" => handle_toggle(ctx, msg, args, bot, Announcement::Intro).await,
        "outros" => handle_toggle(ctx, msg, args, bot, Announcement::Outro).await,
        "ban" => handle_ban(ctx, msg, bot, true).await,
        "unban" => handle_ban(ctx, msg, bot, false).await,
        // Generales
        "ping" => handle_ping(ctx, msg, args).await,
        "echo" => handle_echo(ctx, msg, args).await,
        "ask" => handle_ask(ctx, msg, args, bot).await,
        "scramble" => handle_scramble(ctx, msg, args).await,
        "info" => handle_info(ctx, msg, bot).await,
        "invite" => handle_invite(ctx, msg).await,
        "help" => handle_help(ctx, msg, args, bot).await,
        other => {
            error!("El comando {} no tiene handler", other);
            Ok(())
        }
    }
}

/// Plain messages in a guild's TTS channel are read out loud.
pub async fn handle_tts_channel(ctx: &Context, msg: &Message, bot: &ClipBot) -> Result<()> {
    let Some(guild_id) = msg.guild_id else {
        return Ok(());
    };

    let tts_channel = {
        let storage = bot.storage.lock().await;
        if storage.is_banned(guild_id.get(), msg.author.id.get()) {
            return Ok(());
        }
        storage.guild(guild_id.get()).tts_channel_id
    };
    if tts_channel != Some(msg.channel_id.get()) {
        return Ok(());
    }

    let text = msg.content_safe(&ctx.cache);
    if text.starts_with("//") || text.starts_with('#') {
        return Ok(());
    }

    let session = bot.registry.resolve(Scope::Guild(guild_id)).await?;
    smart_tts(bot, &session, &text).await
}

/// Replies with a [`UserError`] as is; anything else is logged, sent to the
/// operator channel and answered with an apology.
pub async fn report_error(ctx: &Context, msg: &Message, error: anyhow::Error, bot: &ClipBot) {
    let reply = match UserError::find(&error) {
        Some(user_error) => user_error.to_string(),
        None => {
            error!("❌ Error procesando mensaje de {}: {:?}", msg.author.name, error);
            let report = format!(
                "Error handling `{}` from {} ({}):\n```\n{:?}\n```",
                msg.content, msg.author.name, msg.author.id, error
            );
            report_to_operator(ctx, bot, &report).await;
            GENERIC_APOLOGY.to_string()
        }
    };

    if let Err(e) = msg.channel_id.say(&ctx.http, reply).await {
        error!("No se pudo enviar la respuesta de error: {:?}", e);
    }
}

/// Posts to the configured error channel, if any.
pub async fn report_to_operator(ctx: &Context, bot: &ClipBot, report: &str) {
    let Some(channel_id) = bot.config().error_channel_id else {
        return;
    };

    let report: String = report.chars().take(lists::MESSAGE_LIMIT).collect();
    if let Err(e) = ChannelId::new(channel_id).say(&ctx.http, report).await {
        error!("No se pudo reportar el error al canal {}: {:?}", channel_id, e);
    }
}

async fn say(ctx: &Context, msg: &Message, content: impl Into<String>) -> Result<()> {
    msg.channel_id.say(&ctx.http, content).await?;
    Ok(())
}

fn require_guild(msg: &Message) -> Result<GuildId, UserError> {
    msg.guild_id
        .ok_or_else(|| UserError::invalid("You have to be on a server to do that"))
}

fn require_args<'a>(args: &'a str, what: &str) -> Result<&'a str, UserError> {
    if args.is_empty() {
        Err(UserError::invalid(format!("You gotta give me {what}")))
    } else {
        Ok(args)
    }
}

/// `text` with mentions written out as names, the way chat shows them.
fn clean_text(cache: &Arc<Cache>, text: &str, guild_id: Option<GuildId>, mentions: &[User]) -> String {
    let mut options = ContentSafeOptions::default();
    if let Some(guild_id) = guild_id {
        options = options.display_as_member_from(guild_id);
    }
    content_safe(cache, text, &options, mentions)
}

/// Session the author's audio commands go to: the guild's when used on a
/// server, otherwise the one the author is listening to.
async fn session_for(msg: &Message, bot: &ClipBot) -> Result<Arc<AudioSession>> {
    match msg.guild_id {
        Some(guild_id) => {
            if bot.storage.lock().await.is_banned(guild_id.get(), msg.author.id.get()) {
                return Err(UserError::AudioSessionNotFound(BANNED.to_string()).into());
            }
            Ok(bot.registry.resolve(Scope::Guild(guild_id)).await?)
        }
        None => Ok(bot.registry.resolve(Scope::User(msg.author.id)).await?),
    }
}

/// Guild owners and members who can manage the guild.
async fn require_admin(ctx: &Context, msg: &Message) -> Result<GuildId> {
    let guild_id = require_guild(msg)?;
    let member = guild_id.member(ctx, msg.author.id).await?;

    let allowed = ctx
        .cache
        .guild(guild_id)
        .is_some_and(|guild| guild.owner_id == msg.author.id || guild.member_permissions(&member).manage_guild());
    if !allowed {
        return Err(UserError::invalid("You ain't the boss of me 😠").into());
    }
    Ok(guild_id)
}

/// Whether `user` owns the bot application.
async fn is_bot_owner(ctx: &Context, user: UserId) -> Result<bool> {
    let app = ctx.http.get_current_application_info().await?;
    Ok(app.owner.is_some_and(|owner| owner.id == user))
}

/// Resolves a bare clip name as a local clip, then as a dota response.
/// Full clip ids are resolved as given.
async fn resolve_named_clip(bot: &ClipBot, name: &str) -> Result<Clip> {
    if name.contains(':') {
        return bot.sources.resolve(name).await;
    }

    for identifier in [format!("local:{name}"), format!("dota:{name}")] {
        match bot.sources.resolve(&identifier).await {
            Ok(clip) => return Ok(clip),
            Err(e) if matches!(e.downcast_ref::<UserError>(), Some(UserError::ClipNotFound(_))) => continue,
            Err(e) => return Err(e),
        }
    }
    Err(UserError::ClipNotFound(name.to_string()).into())
}

async fn handle_play(msg: &Message, args: &str, bot: &ClipBot) -> Result<()> {
    let name = require_args(args, "a clip to play")?;
    let session = session_for(msg, bot).await?;
    let clip = resolve_named_clip(bot, name).await?;
    session.enqueue(clip).await?;
    debug!("{} clips esperando en guild {}", session.queue_len(), session.guild_id());
    Ok(())
}

async fn handle_playurl(msg: &Message, args: &str, bot: &ClipBot) -> Result<()> {
    let url = require_args(args, "a link to an audio file")?;
    let session = session_for(msg, bot).await?;
    bot.play(&session, &format!("url:{url}")).await
}

async fn handle_clips(ctx: &Context, msg: &Message, args: &str, bot: &ClipBot) -> Result<()> {
    let catalog = bot.sources.catalog();

    let messages = match args {
        "" => lists::format_names(Some("Clips:"), &catalog.names()),
        "recent" | "latest" | "new" => lists::format_names(None, &catalog.newest(10)),
        "tags" | "sections" => lists::format_names(Some("Tags:"), &catalog.tags()),
        tag => {
            let clips = catalog.with_tag(tag);
            if clips.is_empty() {
                return Err(UserError::invalid("No clips found for that tag").into());
            }
            lists::format_names(None, &clips)
        }
    };

    for message in messages {
        say(ctx, msg, message).await?;
    }
    Ok(())
}

async fn handle_stop(msg: &Message, bot: &ClipBot) -> Result<()> {
    let session = session_for(msg, bot).await?;
    let dropped = session.queued_clip_ids();
    session.stop().await;
    if !dropped.is_empty() {
        debug!("Detenido en guild {}, descartados {:?}", session.guild_id(), dropped);
    }
    Ok(())
}

async fn handle_replay(ctx: &Context, msg: &Message, bot: &ClipBot) -> Result<()> {
    let session = session_for(msg, bot).await?;
    let Some(clip) = session.last_clip().await else {
        return Err(UserError::invalid("Nobody said anythin' yet").into());
    };

    say(ctx, msg, format!("Replaying {}", clip.clip_id())).await?;
    session.enqueue(clip).await?;
    Ok(())
}

async fn handle_clipinfo(ctx: &Context, msg: &Message, args: &str, bot: &ClipBot) -> Result<()> {
    let resolved_here = !args.is_empty();
    let clip = if resolved_here {
        resolve_named_clip(bot, args).await?
    } else {
        let session = session_for(msg, bot).await?;
        session
            .last_clip()
            .await
            .ok_or_else(|| UserError::invalid("Nobody said anythin' yet"))?
    };

    let local = match clip.kind() {
        crate::audio::clip::ClipKind::Local => bot.sources.catalog().get(clip.key()),
        _ => None,
    };
    let embed = embeds::create_clip_info_embed(&clip, local);

    let audio = tokio::fs::read(clip.audio_path()).await;
    // el último clip de la sesión sigue siendo de la sesión
    if resolved_here {
        discard_unplayed(&clip).await;
    }
    let audio = audio?;
    let attachment = CreateAttachment::bytes(audio, attachment_name(&clip));
    msg.channel_id
        .send_message(&ctx.http, CreateMessage::new().embed(embed).add_file(attachment))
        .await?;
    Ok(())
}

/// Deletes the file of a temporary clip that never reached a session.
async fn discard_unplayed(clip: &Clip) {
    if !clip.is_temporary() {
        return;
    }
    if let Err(e) = tokio::fs::remove_file(clip.audio_path()).await {
        warn!("⚠️ No se pudo borrar {}: {}", clip.audio_path().display(), e);
    }
}

/// Short ascii file name for a clip's audio, keeping its extension.
fn attachment_name(clip: &Clip) -> String {
    let key = match clip.kind() {
        crate::audio::clip::ClipKind::Url => clip.key().rsplit('/').next().unwrap_or_default(),
        _ => clip.key(),
    };
    let mut name: String = key.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    if name.is_empty() || name.len() > 32 {
        name = clip.kind().prefix().to_string();
    }

    match clip.audio_path().extension().and_then(|e| e.to_str()) {
        Some(extension) => format!("{name}.{extension}"),
        None => name,
    }
}

async fn handle_tts(ctx: &Context, msg: &Message, args: &str, bot: &ClipBot) -> Result<()> {
    let text = clean_text(&ctx.cache, require_args(args, "something to say")?, msg.guild_id, &msg.mentions);
    let session = session_for(msg, bot).await?;
    say_tts(bot, &session, &text).await
}

/// Speaks `text` after applying the pronunciation fixes.
async fn say_tts(bot: &ClipBot, session: &AudioSession, text: &str) -> Result<()> {
    let text = bot.sources.tts().fix_text(text);
    bot.play(session, &format!("tts:{text}")).await
}

async fn handle_ttsclip(msg: &Message, args: &str, bot: &ClipBot) -> Result<()> {
    let name = require_args(args, "a clip")?;
    let session = session_for(msg, bot).await?;

    let identifier = if name.contains(':') {
        name.to_string()
    } else {
        format!("local:{name}")
    };
    let clip = bot.sources.resolve(&identifier).await?;

    let text = clip.text().map(str::to_lowercase).unwrap_or_default();
    if text.is_empty() {
        return Err(UserError::invalid("I can't read this clip for tts 😕. Try a different one.").into());
    }
    bot.play(&session, &format!("tts:{text}")).await
}

async fn handle_smarttts(ctx: &Context, msg: &Message, args: &str, bot: &ClipBot) -> Result<()> {
    let text = clean_text(&ctx.cache, args, msg.guild_id, &msg.mentions);
    let session = session_for(msg, bot).await?;
    smart_tts(bot, &session, &text).await
}

/// Says `message` with whatever clip fits it best, see
/// [`SourceManager::smart_identifier`](crate::sources::SourceManager::smart_identifier).
async fn smart_tts(bot: &ClipBot, session: &AudioSession, message: &str) -> Result<()> {
    match bot.sources.smart_identifier(message) {
        Some(identifier) => bot.play(session, &identifier).await,
        None => Ok(()),
    }
}

async fn handle_later(msg: &Message, bot: &ClipBot) -> Result<()> {
    let session = session_for(msg, bot).await?;
    let which = rand::thread_rng().gen_range(1..=LATER_CLIPS);
    bot.play(&session, &format!("local:later{which}")).await
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Announcement {
    Intro,
    Outro,
}

impl Announcement {
    fn name(self) -> &'static str {
        match self {
            Announcement::Intro => "intro",
            Announcement::Outro => "outro",
        }
    }

    fn clip(self, settings: &UserSettings) -> &str {
        match self {
            Announcement::Intro => &settings.intro,
            Announcement::Outro => &settings.outro,
        }
    }

    fn tts(self, settings: &UserSettings) -> &str {
        match self {
            Announcement::Intro => &settings.intro_tts,
            Announcement::Outro => &settings.outro_tts,
        }
    }
}

async fn handle_set_announce_clip(
    ctx: &Context,
    msg: &Message,
    args: &str,
    bot: &ClipBot,
    which: Announcement,
) -> Result<()> {
    let (args, target) = announce_target(args);
    let user_id = match target {
        Some(user) if user != msg.author.id => {
            if !is_bot_owner(ctx, msg.author.id).await? {
                return Err(UserError::invalid("You ain't the boss of me 😠").into());
            }
            user.get()
        }
        _ => msg.author.id.get(),
    };
    let whose = if user_id == msg.author.id.get() {
        "Your".to_string()
    } else {
        format!("<@{user_id}>'s")
    };

    if args.is_empty() {
        let settings = bot.storage.lock().await.user(user_id).await?;
        let current = which.clip(&settings).to_string();
        say(ctx, msg, format!("{} {} is: {}", whose, which.name(), current)).await?;

        let session = session_for(msg, bot).await?;
        bot.play(&session, &format!("tts:your {} is", which.name())).await?;
        return bot.play(&session, &current).await;
    }

    let clip = resolve_named_clip(bot, args).await?;
    if let Some(duration) = clip.duration() {
        if duration.as_secs_f64() > MAX_ANNOUNCE_CLIP_SECS {
            return Err(UserError::invalid(format!(
                "Dat clip is {:.1} seconds long, and {}s gotta be less than 4.5.",
                duration.as_secs_f64(),
                which.name()
            ))
            .into());
        }
    }

    let clip_id = clip.clip_id();
    bot.storage
        .lock()
        .await
        .edit_user(user_id, |settings| match which {
            Announcement::Intro => settings.intro = clip_id.clone(),
            Announcement::Outro => settings.outro = clip_id.clone(),
        })
        .await?;
    say(ctx, msg, format!("{} {} is now `{}`", whose, which.name(), clip_id)).await
}

/// Splits `setintro`/`setoutro` arguments into the clip and, when the last
/// word mentions someone, whose announcement it is.
fn announce_target(args: &str) -> (&str, Option<UserId>) {
    let args = args.trim();
    let (clip, last) = args
        .rsplit_once(char::is_whitespace)
        .map_or(("", args), |(clip, last)| (clip.trim_end(), last));

    match parse_user_mention(last) {
        Some(user) => (clip, Some(user)),
        None => (args, None),
    }
}

async fn handle_set_announce_tts(
    ctx: &Context,
    msg: &Message,
    args: &str,
    bot: &ClipBot,
    which: Announcement,
) -> Result<()> {
    let user_id = msg.author.id.get();

    if args.is_empty() {
        let settings = bot.storage.lock().await.user(user_id).await?;
        let spoken = match which {
            Announcement::Intro => format!("{} {}", which.tts(&settings), msg.author.name),
            Announcement::Outro => format!("{} {}", msg.author.name, which.tts(&settings)),
        };
        say(ctx, msg, format!("Your {} tts sounds like: {}", which.name(), spoken)).await?;

        let session = session_for(msg, bot).await?;
        return bot.play(&session, &format!("tts:{spoken}")).await;
    }

    let text = announce_tts_text(args)?;
    bot.storage
        .lock()
        .await
        .edit_user(user_id, |settings| match which {
            Announcement::Intro => settings.intro_tts = text.clone(),
            Announcement::Outro => settings.outro_tts = text.clone(),
        })
        .await?;
    say(ctx, msg, format!("Yer {} tts is now `{}`", which.name(), text)).await
}

/// Validates intro/outro tts text. `nothing` and `none` mean silence.
fn announce_tts_text(text: &str) -> Result<String, UserError> {
    let length = text.chars().count();
    if length > MAX_ANNOUNCE_TTS_LEN {
        return Err(UserError::invalid(format!(
            "Dat text is {length} characters long, and it must be {MAX_ANNOUNCE_TTS_LEN} characters or less"
        )));
    }

    if matches!(text.to_lowercase().as_str(), "nothing" | "none" | "") {
        Ok(" ".to_string())
    } else {
        Ok(text.to_string())
    }
}

async fn handle_summon(ctx: &Context, msg: &Message, bot: &ClipBot) -> Result<()> {
    let guild_id = require_guild(msg)?;

    let channel = ctx
        .cache
        .guild(guild_id)
        .and_then(|guild| guild.voice_states.get(&msg.author.id).and_then(|state| state.channel_id))
        .ok_or_else(|| UserError::invalid("You gotta be in a voice channel to summon me"))?;

    bot.registry.connect(channel).await?;
    bot.storage
        .lock()
        .await
        .edit_guild(guild_id.get(), |g| g.voice_channel_id = Some(channel.get()))
        .await?;
    info!("📣 Invocado a {} en guild {}", channel, guild_id);
    Ok(())
}

async fn handle_unsummon(ctx: &Context, msg: &Message, bot: &ClipBot) -> Result<()> {
    let guild_id = require_guild(msg)?;

    bot.registry.disconnect(guild_id).await?;
    bot.storage
        .lock()
        .await
        .edit_guild(guild_id.get(), |g| g.voice_channel_id = None)
        .await?;
    say(ctx, msg, "👋").await
}

async fn handle_ttschannel(ctx: &Context, msg: &Message, args: &str, bot: &ClipBot) -> Result<()> {
    let guild_id = require_admin(ctx, msg).await?;

    let channel = match args {
        "" => {
            let current = bot.storage.lock().await.guild(guild_id.get()).tts_channel_id;
            let reply = match current {
                Some(channel) => format!("The tts channel is <#{}>", channel),
                None => "There is no tts channel. Use `ttschannel here` to make this one.".to_string(),
            };
            return say(ctx, msg, reply).await;
        }
        "here" => Some(msg.channel_id.get()),
        "none" | "off" => None,
        _ => return Err(UserError::invalid("Try `here` or `none`").into()),
    };

    bot.storage
        .lock()
        .await
        .edit_guild(guild_id.get(), |g| g.tts_channel_id = channel)
        .await?;
    let reply = match channel {
        Some(_) => "✅ Messages in this channel will be read out loud",
        None => "✅ TTS channel removed",
    };
    say(ctx, msg, reply).await
}

async fn handle_toggle(ctx: &Context, msg: &Message, args: &str, bot: &ClipBot, which: Announcement) -> Result<()> {
    let guild_id = require_admin(ctx, msg).await?;

    let enabled = match args.to_lowercase().as_str() {
        "on" | "enable" | "true" => true,
        "off" | "disable" | "false" => false,
        _ => return Err(UserError::invalid("Try `on` or `off`").into()),
    };

    bot.storage
        .lock()
        .await
        .edit_guild(guild_id.get(), |g| match which {
            Announcement::Intro => g.intros = enabled,
            Announcement::Outro => g.outros = enabled,
        })
        .await?;
    let state = if enabled { "on" } else { "off" };
    let embed = embeds::create_success_embed(
        &format!("{}s {}", which.name(), state),
        &format!("People joining and leaving voice {} get an {}", if enabled { "now" } else { "no longer" }, which.name()),
    );
    msg.channel_id.send_message(&ctx.http, CreateMessage::new().embed(embed)).await?;
    Ok(())
}

async fn handle_ban(ctx: &Context, msg: &Message, bot: &ClipBot, ban: bool) -> Result<()> {
    let guild_id = require_admin(ctx, msg).await?;
    let user = msg
        .mentions
        .first()
        .ok_or_else(|| UserError::invalid("Mention who you're talking about"))?;

    let user_id: UserId = user.id;
    bot.storage
        .lock()
        .await
        .edit_guild(guild_id.get(), |g| {
            g.banned_users.retain(|id| *id != user_id.get());
            if ban {
                g.banned_users.push(user_id.get());
            }
        })
        .await?;

    let reply = if ban {
        format!("Banned <@{}> 🔨", user_id)
    } else {
        format!("Unbanned <@{}>", user_id)
    };
    say(ctx, msg, reply).await
}

async fn handle_ping(ctx: &Context, msg: &Message, args: &str) -> Result<()> {
    let pongs = pongs(args)?;
    say(ctx, msg, pongs).await
}

/// `count` pongs in one message, within reason.
fn pongs(args: &str) -> Result<String, UserError> {
    let count = match args {
        "" => 1,
        n => n
            .parse::<i64>()
            .map_err(|_| UserError::invalid("That's not a number"))?,
    };
    if count < 1 {
        return Err(UserError::invalid("thats not enough pings. stahp trying to break me.😠"));
    }
    if count > MAX_PINGS {
        return Err(UserError::invalid("thats too many pings. stahp trying to break me.😠"));
    }
    Ok(vec!["pong"; count as usize].join(" "))
}

async fn handle_echo(ctx: &Context, msg: &Message, args: &str) -> Result<()> {
    let text = require_args(args, "something to echo")?;
    say(ctx, msg, text).await
}

/// Answers with a dota response picked by the question, and plays it when
/// there is a session to play it in.
async fn handle_ask(ctx: &Context, msg: &Message, args: &str, bot: &ClipBot) -> Result<()> {
    let question = require_args(args, "a question")?;
    let Some(response) = bot.sources.questions().answer(question) else {
        debug!("Sin respuesta para la pregunta {:?}", question);
        return Ok(());
    };
    if !bot.sources.dota().contains(response) {
        warn!("⚠️ La respuesta {} no existe en las respuestas de dota", response);
        return Ok(());
    }

    let clip = bot.sources.resolve(&format!("dota:{response}")).await?;
    say(ctx, msg, clip.text().unwrap_or(response)).await?;

    match session_for(msg, bot).await {
        Ok(session) => session.enqueue(clip).await?,
        Err(e) if matches!(UserError::find(&e), Some(UserError::AudioSessionNotFound(_))) => {
            debug!("Respuesta sin sesión de audio: {}", e);
        }
        Err(e) => return Err(e),
    }
    Ok(())
}

async fn handle_scramble(ctx: &Context, msg: &Message, args: &str) -> Result<()> {
    let text = require_args(args, "something to scramble")?;
    let scrambled = scramble(text, &mut rand::thread_rng());
    say(ctx, msg, scrambled).await
}

/// Shuffles the inside of every word, keeping first and last letters of
/// words with four letters or more.
fn scramble<R: Rng + ?Sized>(text: &str, rng: &mut R) -> String {
    text.split(' ')
        .map(|word| {
            let mut letters: Vec<char> = word.chars().collect();
            let inside = if letters.len() < 4 {
                &mut letters[..]
            } else {
                let last = letters.len() - 1;
                &mut letters[1..last]
            };
            inside.shuffle(rng);
            letters.into_iter().collect::<String>()
        })
        .collect::<Vec<_>>()
        .join(" ")
}

async fn handle_info(ctx: &Context, msg: &Message, bot: &ClipBot) -> Result<()> {
    let (name, id) = {
        let me = ctx.cache.current_user();
        (me.name.clone(), me.id)
    };
    let embed = embeds::create_info_embed(&name, &bot.config().command_prefix, &invite_link(id));
    msg.channel_id
        .send_message(&ctx.http, CreateMessage::new().embed(embed))
        .await?;
    Ok(())
}

async fn handle_invite(ctx: &Context, msg: &Message) -> Result<()> {
    let link = invite_link(ctx.cache.current_user().id);
    say(ctx, msg, link).await
}

/// OAuth link adding the bot with the permissions it uses.
fn invite_link(bot_id: UserId) -> String {
    let permissions = Permissions::VIEW_CHANNEL
        | Permissions::SEND_MESSAGES
        | Permissions::EMBED_LINKS
        | Permissions::ATTACH_FILES
        | Permissions::CONNECT
        | Permissions::SPEAK;
    format!(
        "https://discord.com/oauth2/authorize?client_id={}&scope=bot&permissions={}",
        bot_id,
        permissions.bits()
    )
}

async fn handle_help(ctx: &Context, msg: &Message, args: &str, bot: &ClipBot) -> Result<()> {
    let prefix = &bot.config().command_prefix;
    let embed = match args {
        "" => embeds::create_help_embed(prefix),
        name => match commands::find(&name.to_lowercase()) {
            Some(command) => embeds::create_command_help_embed(prefix, command),
            None => embeds::create_error_embed("Unknown command", &format!("`{}` isn't one of my commands", name)),
        },
    };

    msg.channel_id
        .send_message(&ctx.http, CreateMessage::new().embed(embed))
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::clip::ClipKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_announce_tts_text() {
        assert_eq!(announce_tts_text("behold").unwrap(), "behold");
        assert_eq!(announce_tts_text("None").unwrap(), " ");
        assert_eq!(announce_tts_text("nothing").unwrap(), " ");
        assert!(announce_tts_text(&"a".repeat(33)).is_err());
        assert_eq!(announce_tts_text(&"a".repeat(32)).unwrap().len(), 32);
    }

    #[test]
    fn test_require_args() {
        assert!(require_args("", "a clip").is_err());
        assert_eq!(require_args("hello", "a clip").unwrap(), "hello");
    }

    #[test]
    fn test_attachment_name() {
        let local = Clip::new(ClipKind::Local, "hello", "/clips/hello.mp3");
        assert_eq!(attachment_name(&local), "hello.mp3");

        let url = Clip::new(ClipKind::Url, "https://example.com/sfx/boom-1.wav", "/temp/url123.wav");
        assert_eq!(attachment_name(&url), "boom1wav.wav");

        let tts = Clip::new(ClipKind::Tts, "this sentence is far too long to be a file name", "/temp/tts9.mp3");
        assert_eq!(attachment_name(&tts), "tts.mp3");
    }

    #[tokio::test]
    async fn test_clipinfo_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let spoken = dir.path().join("tts1.mp3");
        let checked_in = dir.path().join("hello.mp3");
        std::fs::write(&spoken, b"mp3").unwrap();
        std::fs::write(&checked_in, b"mp3").unwrap();

        discard_unplayed(&Clip::new(ClipKind::Tts, "hi", &spoken).temporary()).await;
        discard_unplayed(&Clip::new(ClipKind::Local, "hello", &checked_in)).await;

        assert!(!spoken.exists());
        assert!(checked_in.exists());
    }

    #[test]
    fn test_pongs() {
        assert_eq!(pongs("").unwrap(), "pong");
        assert_eq!(pongs("3").unwrap(), "pong pong pong");
        assert_eq!(pongs("20").unwrap().matches("pong").count(), 20);

        assert_eq!(
            pongs("0").unwrap_err().to_string(),
            "thats not enough pings. stahp trying to break me.😠"
        );
        assert!(pongs("-4").is_err());
        assert_eq!(
            pongs("21").unwrap_err().to_string(),
            "thats too many pings. stahp trying to break me.😠"
        );
        assert!(pongs("lots").is_err());
    }

    #[test]
    fn test_mentions_are_never_spoken_raw() {
        let cache = Arc::new(Cache::default());
        let cleaned = clean_text(&cache, "hello <@123456789> and @everyone", None, &[]);

        assert!(cleaned.starts_with("hello @"));
        assert!(!cleaned.contains("123456789"));
        assert!(!cleaned.contains("@everyone"));
        assert_eq!(clean_text(&cache, "just words", None, &[]), "just words");
    }

    #[test]
    fn test_scramble_keeps_word_edges() {
        use rand::{rngs::StdRng, SeedableRng};

        let mut rng = StdRng::seed_from_u64(7);
        let text = "according to researchers at cambridge";
        let scrambled = scramble(text, &mut rng);

        assert_eq!(scrambled.split(' ').count(), 5);
        for (original, mixed) in text.split(' ').zip(scrambled.split(' ')) {
            assert_eq!(original.len(), mixed.len());

            let mut a: Vec<char> = original.chars().collect();
            let mut b: Vec<char> = mixed.chars().collect();
            if a.len() >= 4 {
                assert_eq!(a.first(), b.first());
                assert_eq!(a.last(), b.last());
            }
            a.sort_unstable();
            b.sort_unstable();
            assert_eq!(a, b);
        }
        assert_eq!(scramble("", &mut rng), "");
    }

    #[test]
    fn test_invite_link() {
        let link = invite_link(UserId::new(42));
        assert!(link.starts_with("https://discord.com/oauth2/authorize?client_id=42&scope=bot&permissions="));

        let bits: u64 = link.rsplit('=').next().unwrap().parse().unwrap();
        let permissions = Permissions::from_bits_truncate(bits);
        assert!(permissions.connect() && permissions.speak() && permissions.send_messages());
        assert!(!permissions.administrator());
    }

    #[test]
    fn test_announce_target() {
        assert_eq!(announce_target("math <@123>"), ("math", Some(UserId::new(123))));
        assert_eq!(announce_target("dota:axe_kill  <@!123>"), ("dota:axe_kill", Some(UserId::new(123))));
        assert_eq!(announce_target("<@123>"), ("", Some(UserId::new(123))));
        assert_eq!(announce_target("math"), ("math", None));
        assert_eq!(announce_target("tts:hi there"), ("tts:hi there", None));
        assert_eq!(announce_target(""), ("", None));
    }
}
