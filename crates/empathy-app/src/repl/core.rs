//! The chat loop driving one shared session.

use std::io::{self, Write};

use empathy_ai::{SharedSession, Turn};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{info, warn};

use super::commands::Command;
use super::render;
use super::spinner::Spinner;

pub struct ChatApp {
    session: SharedSession,
    spinner: bool,
    json_history: bool,
}

impl ChatApp {
    pub fn new(session: SharedSession) -> Self {
        Self {
            session,
            spinner: false,
            json_history: false,
        }
    }

    /// Show the "Thinking..." indicator while a reply is generated.
    pub fn with_spinner(mut self, enabled: bool) -> Self {
        self.spinner = enabled;
        self
    }

    /// Print the transcript as JSON once input ends.
    pub fn with_json_history(mut self, enabled: bool) -> Self {
        self.json_history = enabled;
        self
    }

    /// Read lines from `input` until EOF or `/quit`, writing the transcript
    /// to `out`.
    pub async fn run<R, W>(&self, input: R, out: &mut W) -> io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        render::turns(out, self.session.lock().await.turns())?;
        render::hint(out)?;

        let mut lines = input.lines();
        loop {
            render::prompt(out)?;
            let Some(line) = lines.next_line().await? else {
                writeln!(out)?;
                break;
            };

            match Command::parse(&line) {
                Command::Empty => {}
                Command::Quit => break,
                Command::Message(text) => self.chat(out, &text).await?,
                Command::Reset => {
                    let mut session = self.session.lock().await;
                    session.reset();
                    render::notice(out, "Started a new conversation.")?;
                    render::turns(out, session.turns())?;
                }
                Command::History => {
                    render::turns(out, self.session.lock().await.turns())?;
                }
                Command::Stats => {
                    render::stats(out, &*self.session.lock().await)?;
                }
                Command::Unknown(command) => {
                    render::notice(
                        out,
                        &format!("Unknown command {command}. Try /reset, /history, /stats or /quit."),
                    )?;
                }
            }
        }

        let session = self.session.lock().await;
        info!(
            session = %session.id().short(),
            turns = session.turn_count(),
            "chat ended"
        );
        if self.json_history {
            render::json_history(out, session.turns())?;
        }
        Ok(())
    }

    async fn chat<W: Write>(&self, out: &mut W, text: &str) -> io::Result<()> {
        let mut session = self.session.lock().await;
        render::turn(out, &Turn::user(text))?;
        out.flush()?;

        let spinner = self.spinner.then(|| Spinner::start("Thinking..."));
        let result = session.submit(text).await;
        if let Some(spinner) = spinner {
            spinner.stop().await;
        }

        match result {
            Ok(reply) => render::turn(out, &Turn::assistant(reply)),
            Err(e) => {
                warn!(session = %session.id().short(), "reply failed: {e}");
                render::error(out, &e)
            }
        }
    }
}
