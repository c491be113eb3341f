// src/manager/view.rs

//! Terminal rendering for the manager.
//!
//! Output is line-oriented text followed by a single in-place status line:
//!
//! ```text
//! [api] Listening on :3000
//! [web] compiling...
//!     | src/app.tsx
//! alice │ api{R} web{B} worker{I}
//! ```
//!
//! The status line is never terminated with a newline. Before anything else
//! is written, the previous status line is erased by returning to column 0,
//! overwriting exactly as many columns as it used, and returning again.

use std::io::{self, Write};

use colored::{ColoredString, Colorize};

use crate::types::{OutputStream, State};

/// Writer-side state of the consolidated display.
///
/// This is the only thing that writes to the terminal, which keeps command
/// output from tearing the status line.
pub struct StatusView<W: Write> {
    out: W,
    user: String,
    /// Supervised commands in display order, with their last known state.
    commands: Vec<(String, State)>,
    /// Visible width of the status line currently on screen (0 if none).
    summary_width: usize,
}

impl<W: Write> std::fmt::Debug for StatusView<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusView")
            .field("user", &self.user)
            .field("commands", &self.commands)
            .field("summary_width", &self.summary_width)
            .finish_non_exhaustive()
    }
}

impl<W: Write> StatusView<W> {
    pub fn new(out: W, user: impl Into<String>) -> Self {
        Self {
            out,
            user: user.into(),
            commands: Vec::new(),
            summary_width: 0,
        }
    }

    /// Add a command to the status line.
    pub fn track(&mut self, name: &str, state: State) {
        match self.commands.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = state,
            None => self.commands.push((name.to_string(), state)),
        }
    }

    pub fn state_of(&self, name: &str) -> Option<State> {
        self.commands
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, state)| *state)
    }

    /// Plain-text status line, without colors.
    pub fn summary_text(&self) -> String {
        let tokens: Vec<String> = self
            .commands
            .iter()
            .map(|(name, state)| format!("{name}{{{}}}", state.letter()))
            .collect();
        format!("{} │ {}", self.user, tokens.join(" "))
    }

    /// A state change: announce it, then redraw the status line.
    ///
    /// Names that are not tracked (install steps) are announced but get no
    /// token.
    pub fn on_state(&mut self, name: &str, state: State) -> io::Result<()> {
        if let Some(entry) = self.commands.iter_mut().find(|(n, _)| n == name) {
            entry.1 = state;
        }
        self.erase_summary()?;
        let line = format!("[{name}] {}...", state.as_str());
        writeln!(self.out, "{}", line.color(state.color()))?;
        self.render_summary()
    }

    /// A chunk of command output, prefixed with the command name.
    pub fn on_output(&mut self, name: &str, stream: OutputStream, data: &str) -> io::Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        self.erase_summary()?;

        let prefix = format!("[{name}]");
        let styled_prefix = match stream {
            OutputStream::Stdout => prefix.bold(),
            OutputStream::Stderr => prefix.red().bold(),
        };
        // `|` lands under the prefix's closing bracket.
        let indent = " ".repeat(prefix.chars().count().saturating_sub(1));

        let mut lines = data.split('\n');
        if let Some(first) = lines.next() {
            writeln!(self.out, "{styled_prefix} {first}")?;
        }
        for line in lines {
            writeln!(self.out, "{indent}{} {line}", "|".dimmed())?;
        }

        self.render_summary()
    }

    /// A command closed. `restarting` says whether a restart will follow.
    pub fn on_close(&mut self, name: &str, code: i32, restarting: bool) -> io::Result<()> {
        self.erase_summary()?;
        let notice = if restarting {
            format!("[{name}] unexpectedly quit with code {code}, restarting...").yellow()
        } else {
            format!("[{name}] failed with code {code} during install, not restarting").red()
        };
        writeln!(self.out, "{notice}")?;
        self.render_summary()
    }

    /// Erase the previous status line and draw the current one.
    pub fn render_summary(&mut self) -> io::Result<()> {
        self.erase_summary()?;

        let tokens: Vec<String> = self
            .commands
            .iter()
            .map(|(name, state)| status_token(name, *state).to_string())
            .collect();
        write!(self.out, "{} │ {}", self.user.bold(), tokens.join(" "))?;
        self.summary_width = self.summary_text().chars().count();

        self.out.flush()
    }

    /// Leave the status line in place and move to a fresh line.
    pub fn finish(&mut self) -> io::Result<()> {
        if self.summary_width > 0 {
            writeln!(self.out)?;
            self.summary_width = 0;
        }
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn erase_summary(&mut self) -> io::Result<()> {
        if self.summary_width == 0 {
            return Ok(());
        }
        write!(self.out, "\r{}\r", " ".repeat(self.summary_width))?;
        self.summary_width = 0;
        Ok(())
    }
}

/// `name{R}` in the state's color.
pub fn status_token(name: &str, state: State) -> ColoredString {
    format!("{name}{{{}}}", state.letter()).color(state.color())
}

/// The invoking user's name, from `USER` or `USERNAME`.
pub fn current_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .ok()
        .filter(|u| !u.trim().is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}
