//! Prefix command table and message parsing.

/// Which help section a command is listed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Audio,
    Voice,
    Admin,
    General,
}

impl Category {
    pub const ALL: [Category; 4] = [Category::Audio, Category::Voice, Category::Admin, Category::General];

    pub fn title(self) -> &'static str {
        match self {
            Category::Audio => "🔊 Audio",
            Category::Voice => "🎙️ Voice",
            Category::Admin => "🛡️ Admin",
            Category::General => "📋 General",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandInfo {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub usage: &'static str,
    pub help: &'static str,
    pub category: Category,
}

impl CommandInfo {
    fn matches(&self, name: &str) -> bool {
        self.name == name || self.aliases.contains(&name)
    }
}

const fn command(
    name: &'static str,
    aliases: &'static [&'static str],
    usage: &'static str,
    help: &'static str,
    category: Category,
) -> CommandInfo {
    CommandInfo {
        name,
        aliases,
        usage,
        help,
        category,
    }
}

pub const COMMANDS: &[CommandInfo] = &[
    // Audio
    command("play", &[], "<clip>", "Plays a clip by name, or any clip id like `tts:hello there`", Category::Audio),
    command("playurl", &[], "<url>", "Plays an audio file from a link", Category::Audio),
    command("clips", &["playlist"], "[tag|tags|new]", "Lists clips, clips with a tag, all tags or the 10 newest clips", Category::Audio),
    command("stop", &[], "", "Stops the current clip and empties the queue", Category::Audio),
    command("replay", &[], "", "Replays the last clip", Category::Audio),
    command("clipinfo", &[], "[clipid]", "Shows info and the file for a clip, or for the last clip played", Category::Audio),
    command("tts", &[], "<text>", "Says something in the voice channel", Category::Audio),
    command("ttsclip", &[], "<clip>", "Reads a clip's text out loud", Category::Audio),
    command("smarttts", &["stts"], "<text>", "Finds the best clip for the text, falling back to tts", Category::Audio),
    command("later", &[], "", "Tells you how much later it is", Category::Audio),
    command("setintro", &[], "[clip] [@user]", "Sets or shows the clip played when you join (4.5 seconds max)", Category::Audio),
    command("setoutro", &[], "[clip] [@user]", "Sets or shows the clip played when you leave (4.5 seconds max)", Category::Audio),
    command("setintrotts", &["setwelcome"], "[text]", "Sets or shows what is said before your name when you join", Category::Audio),
    command("setoutrotts", &[], "[text]", "Sets or shows what is said after your name when you leave", Category::Audio),
    // Voz
    command("summon", &[], "", "Joins the voice channel you are in", Category::Voice),
    command("unsummon", &[], "", "Leaves the voice channel", Category::Voice),
    // Admin
    command("ttschannel", &[], "[here|none]", "Sets the channel whose messages are read out loud", Category::Admin),
    command("intros", &[], "on|off", "Turns intro announcements on or off", Category::Admin),
    command("outros", &[], "on|off", "Turns outro announcements on or off", Category::Admin),
    command("ban", &[], "@user", "Stops a user from using the bot's audio", Category::Admin),
    command("unban", &[], "@user", "Lets a banned user use the bot's audio again", Category::Admin),
    // Generales
    command("ping", &[], "[count]", "Pongs a number of times, within reason", Category::General),
    command("echo", &[], "<text>", "Repeats what you say", Category::General),
    command("ask", &[], "<question>", "Answers any question you might have", Category::General),
    command("scramble", &[], "<text>", "Scrambles the insides of words", Category::General),
    command("info", &[], "", "Tells you about the bot", Category::General),
    command("invite", &[], "", "Link for adding the bot to your server", Category::General),
    command("help", &[], "[command]", "Shows this list, or help for one command", Category::General),
];

pub fn find(name: &str) -> Option<&'static CommandInfo> {
    COMMANDS.iter().find(|c| c.matches(name))
}

pub fn in_category(category: Category) -> impl Iterator<Item = &'static CommandInfo> {
    COMMANDS.iter().filter(move |c| c.category == category)
}

/// A message addressed to the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation<'a> {
    pub command: &'static CommandInfo,
    /// Everything after the command name, trimmed.
    pub args: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed<'a> {
    /// Not a command; may still be read out in a tts channel.
    NotCommand,
    Unknown(String),
    Command(Invocation<'a>),
}

pub fn parse<'a>(prefix: &str, content: &'a str) -> Parsed<'a> {
    let Some(rest) = content.trim_start().strip_prefix(prefix) else {
        return Parsed::NotCommand;
    };

    let (name, args) = rest
        .split_once(char::is_whitespace)
        .map_or((rest, ""), |(name, args)| (name, args.trim()));
    if name.is_empty() {
        return Parsed::NotCommand;
    }

    let name = name.to_lowercase();
    match find(&name) {
        Some(command) => Parsed::Command(Invocation { command, args }),
        None => Parsed::Unknown(name),
    }
}
