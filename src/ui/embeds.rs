use serenity::{
    all::Timestamp,
    builder::{CreateEmbed, CreateEmbedFooter},
};
use std::time::Duration;

use crate::{
    audio::clip::Clip,
    bot::commands::{self, Category, CommandInfo},
    sources::local::ClipInfo,
};

/// Standard color palette for the bot
pub mod colors {
    use serenity::all::Colour;

    pub const SUCCESS_GREEN: Colour = Colour::from_rgb(67, 181, 129);
    pub const ERROR_RED: Colour = Colour::from_rgb(220, 53, 69);
    pub const INFO_BLUE: Colour = Colour::from_rgb(52, 144, 220);
    pub const CLIP_PURPLE: Colour = Colour::from_rgb(138, 43, 226);
}

/// Standard footer for all embeds
const STANDARD_FOOTER: &str = "🔊 clipbot";

/// Info about a clip, sent along with its audio file
pub fn create_clip_info_embed(clip: &Clip, local: Option<&ClipInfo>) -> CreateEmbed {
    let mut embed = CreateEmbed::default()
        .title(format!("🔊 {}", clip.clip_id()))
        .color(colors::CLIP_PURPLE)
        .field("🏷️ Type", clip.kind().to_string(), true);

    if let Some(duration) = clip.duration() {
        embed = embed.field("⏱️ Length", format_duration(duration), true);
    }

    if let Some(tags) = local.and_then(|info| info.tags.as_deref()) {
        embed = embed.field("📂 Tags", tags.replace('|', ", "), true);
    }

    if let Some(text) = clip.text() {
        embed = embed.description(format!("\"{}\"", text));
    }

    embed
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

/// Overview of every command, grouped by category
pub fn create_help_embed(prefix: &str) -> CreateEmbed {
    let mut embed = CreateEmbed::default()
        .title("🔊 clipbot")
        .color(colors::INFO_BLUE)
        .description("Plays clips, speaks text and announces people joining your voice channel");

    for category in Category::ALL {
        let lines: Vec<String> = commands::in_category(category)
            .map(|command| format!("• `{}{}` - {}", prefix, command.name, command.help))
            .collect();
        embed = embed.field(category.title(), lines.join("\n"), false);
    }

    embed
        .footer(CreateEmbedFooter::new(format!(
            "Use {}help <command> for details",
            prefix
        )))
        .timestamp(Timestamp::now())
}

/// What the bot is and where to get it
pub fn create_info_embed(bot_name: &str, prefix: &str, invite: &str) -> CreateEmbed {
    let features = [
        format!("• `{prefix}ask` answers any yes or no question with a dota response"),
        format!("• `{prefix}play` plays clips, `{prefix}tts` and `{prefix}smarttts` speak for you"),
        "• Greets people joining and leaving the voice channel I'm in".to_string(),
        format!("• `{prefix}help` lists everything else"),
    ];

    CreateEmbed::default()
        .title(format!("🔊 {bot_name}"))
        .description("The juiciest unsigned 8 bit integer you eva gonna see")
        .color(colors::SUCCESS_GREEN)
        .field("Features", features.join("\n"), false)
        .field("Help", format!("[Invite me to your server]({invite})"), false)
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
        .timestamp(Timestamp::now())
}

/// Help for one command
pub fn create_command_help_embed(prefix: &str, command: &CommandInfo) -> CreateEmbed {
    let usage = format!("`{}{} {}`", prefix, command.name, command.usage);
    let mut embed = CreateEmbed::default()
        .title(format!("❓ {}{}", prefix, command.name))
        .description(command.help)
        .color(colors::INFO_BLUE)
        .field("Usage", usage.replace(" `", "`"), false);

    if !command.aliases.is_empty() {
        let aliases: Vec<String> = command.aliases.iter().map(|a| format!("`{}{}`", prefix, a)).collect();
        embed = embed.field("Aliases", aliases.join(", "), false);
    }

    embed.footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

pub fn create_error_embed(title: &str, description: &str) -> CreateEmbed {
    CreateEmbed::default()
        .title(format!("❌ {}", title))
        .description(description)
        .color(colors::ERROR_RED)
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

pub fn create_success_embed(title: &str, description: &str) -> CreateEmbed {
    CreateEmbed::default()
        .title(format!("✅ {}", title))
        .description(description)
        .color(colors::SUCCESS_GREEN)
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

/// Clip lengths to the millisecond, like `2s 340ms`
pub fn format_duration(duration: Duration) -> String {
    let millis = Duration::from_millis(duration.as_millis() as u64);
    humantime::format_duration(millis).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs_f64(2.3405)), "2s 340ms");
        assert_eq!(format_duration(Duration::from_secs(61)), "1m 1s");
    }
}
