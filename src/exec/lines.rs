// src/exec/lines.rs

//! Turning raw pipe reads into whole-line chunks.

/// Longest unterminated run held back before it is handed over as a line
/// anyway (progress bars redrawn with `\r`, minified bundles, binary noise).
pub const MAX_PENDING_LINE: usize = 64 * 1024;

/// Accumulates bytes from successive reads and hands back only complete
/// lines.
///
/// A line split across two reads is held back until its terminator arrives,
/// so the classifier never sees half a line. Each call to [`push`] returns
/// every complete line from that read as one chunk, joined with `\n` and
/// without a trailing terminator. `\r\n` endings are normalised to `\n`.
/// Once [`MAX_PENDING_LINE`] bytes are waiting, everything buffered is
/// returned as is, so memory stays bounded for output that never ends a line.
///
/// [`push`]: LineBuffer::push
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one read; returns the complete lines it finished, if any.
    pub fn push(&mut self, bytes: &[u8]) -> Option<String> {
        self.pending.extend_from_slice(bytes);

        if self.pending.len() >= MAX_PENDING_LINE {
            let all = std::mem::take(&mut self.pending);
            let all = all.strip_suffix(b"\n").unwrap_or(&all[..]);
            return Some(normalise(all));
        }

        let last_newline = self.pending.iter().rposition(|b| *b == b'\n')?;
        let rest = self.pending.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.pending, rest);

        Some(normalise(&complete[..complete.len() - 1]))
    }

    /// Flush whatever is left once the stream has ended.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.pending);
        Some(normalise(&rest))
    }
}

fn normalise(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect::<Vec<_>>()
        .join("\n")
}
