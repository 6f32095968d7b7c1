//! Command classification
//!
//! Maps the text of an inbound message onto one of the bot's commands.
//! `/hello` and `/start` match exactly; `/setup` and `/generate` match by
//! prefix and carry everything after the token as their argument.

/// Outcome of extracting a command argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Argument {
    /// Nothing followed the command token
    Missing,
    /// Only whitespace followed the command token
    Blank,
    /// Trimmed argument text
    Text(String),
}

impl Argument {
    fn parse(rest: &str) -> Self {
        let rest = strip_bot_mention(rest);
        if rest.is_empty() {
            Self::Missing
        } else if rest.trim().is_empty() {
            Self::Blank
        } else {
            Self::Text(rest.trim().to_string())
        }
    }
}

/// A classified inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Hello,
    Start,
    Setup(Argument),
    Generate(Argument),
    /// Anything unrecognised; replied to verbatim
    Echo,
}

impl Command {
    pub const HELLO: &'static str = "/hello";
    pub const START: &'static str = "/start";
    pub const SETUP: &'static str = "/setup";
    pub const GENERATE: &'static str = "/generate";

    pub fn parse(text: &str) -> Self {
        if text == Self::HELLO {
            return Self::Hello;
        }
        if text == Self::START {
            return Self::Start;
        }
        if let Some(rest) = text.strip_prefix(Self::SETUP) {
            return Self::Setup(Argument::parse(rest));
        }
        if let Some(rest) = text.strip_prefix(Self::GENERATE) {
            return Self::Generate(Argument::parse(rest));
        }
        Self::Echo
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Hello => "hello",
            Self::Start => "start",
            Self::Setup(_) => "setup",
            Self::Generate(_) => "generate",
            Self::Echo => "echo",
        }
    }
}

/// Drop a `@botname` suffix glued to the command token (group chat syntax)
pub fn strip_bot_mention(rest: &str) -> &str {
    match rest.strip_prefix('@') {
        Some(mention) => {
            let end = mention.find(char::is_whitespace).unwrap_or(mention.len());
            &mention[end..]
        }
        None => rest,
    }
}
