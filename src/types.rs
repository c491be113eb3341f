// src/types.rs

use std::fmt;

use colored::Color;

/// Lifecycle state of a supervised command.
///
/// States are derived purely from the command's output (see
/// [`crate::supervisor::classify`]) and from process exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    Initializing,
    Installing,
    Building,
    Ready,
    Failed,
    Closed,
    /// Terminal state of an install step that exited with code 0.
    Complete,
}

impl State {
    /// Lowercase display name, e.g. `"ready"`.
    pub fn as_str(self) -> &'static str {
        match self {
            State::Initializing => "initializing",
            State::Installing => "installing",
            State::Building => "building",
            State::Ready => "ready",
            State::Failed => "failed",
            State::Closed => "closed",
            State::Complete => "complete",
        }
    }

    /// Terminal color used for announcements and status tokens.
    pub fn color(self) -> Color {
        match self {
            State::Initializing => Color::Blue,
            State::Installing => Color::Magenta,
            State::Building => Color::Yellow,
            State::Ready => Color::Green,
            State::Failed => Color::Red,
            State::Closed => Color::BrightBlack,
            State::Complete => Color::Cyan,
        }
    }

    /// Single-letter abbreviation shown in the status summary.
    ///
    /// This is the first letter of the name, so `Initializing`/`Installing`
    /// and `Closed`/`Complete` share a letter; the color tells them apart.
    pub fn letter(self) -> char {
        match self {
            State::Initializing | State::Installing => 'I',
            State::Building => 'B',
            State::Ready => 'R',
            State::Failed => 'F',
            State::Closed | State::Complete => 'C',
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a supervised process exited, as seen by the exit handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartReason {
    /// The process exited on its own.
    Crash,
    /// The process tree was killed deliberately because a watched file
    /// changed; a replacement is spawned right away.
    WatchTriggered,
}

/// Which pipe a chunk of output came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}
