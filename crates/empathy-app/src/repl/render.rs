//! Plain-text rendering of the transcript.

use std::io::{self, Write};

use empathy_ai::{ChatError, Role, Session, Turn};

pub const TITLE: &str = "EmpathyBot: Your AI Emotional Support Buddy";
pub const SUBTITLE: &str = "I'm here to listen. Tell me what's on your mind.";
pub const PLACEHOLDER: &str = "Type your message here...";

const BOT_LABEL: &str = "EmpathyBot";
const USER_LABEL: &str = "You";

pub fn header(out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "{TITLE}")?;
    writeln!(out, "{}", "=".repeat(TITLE.len()))?;
    writeln!(out, "{SUBTITLE}")?;
    writeln!(out)
}

pub(super) fn hint(out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "({PLACEHOLDER}  /reset, /history, /stats, /quit)")
}

pub(super) fn prompt(out: &mut impl Write) -> io::Result<()> {
    write!(out, "> ")?;
    out.flush()
}

/// One message as a labelled bubble. An empty reply still gets its bubble.
pub(super) fn turn(out: &mut impl Write, turn: &Turn) -> io::Result<()> {
    let label = match turn.role() {
        Role::User => USER_LABEL,
        Role::Assistant => BOT_LABEL,
    };
    writeln!(out, "{label}:")?;
    if turn.text().is_empty() {
        writeln!(out, "  |")?;
    }
    for line in turn.text().lines() {
        writeln!(out, "  | {line}")?;
    }
    writeln!(out)
}

pub(super) fn turns(out: &mut impl Write, turns: &[Turn]) -> io::Result<()> {
    turns.iter().try_for_each(|t| turn(out, t))
}

/// A failed reply, shown where the bot's bubble would have been.
pub(super) fn error(out: &mut impl Write, err: &ChatError) -> io::Result<()> {
    writeln!(out, "{BOT_LABEL}:")?;
    writeln!(out, "  ! Sorry, I couldn't come up with a reply ({err}).")?;
    writeln!(out)
}

pub(super) fn notice(out: &mut impl Write, text: &str) -> io::Result<()> {
    writeln!(out, "-- {text}")
}

pub(super) fn stats(out: &mut impl Write, session: &Session) -> io::Result<()> {
    let tracker = session.tracker();
    let usage = tracker.total();
    let context = session.context().map_or(0, <[_]>::len);

    writeln!(out, "-- session {}", session.id().short())?;
    writeln!(out, "   turns:            {}", session.turn_count())?;
    writeln!(
        out,
        "   context:          {context} / {} tokens (peak {})",
        session.options().max_length,
        tracker.peak_context()
    )?;
    writeln!(out, "   replies:          {}", tracker.call_count())?;
    writeln!(out, "   prompt tokens:    {}", usage.prompt_tokens)?;
    writeln!(out, "   generated tokens: {}", usage.generated_tokens)
}

pub(super) fn json_history(out: &mut impl Write, turns: &[Turn]) -> io::Result<()> {
    let json = serde_json::to_string_pretty(turns).map_err(io::Error::other)?;
    writeln!(out, "{json}")
}
