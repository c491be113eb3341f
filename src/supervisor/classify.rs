// src/supervisor/classify.rs

//! Output classification.

use crate::command::PatternSet;
use crate::types::State;

/// The state each line of `chunk` selects, in line order.
///
/// Lines are classified one at a time (ready beats building beats failed);
/// lines matching nothing are skipped. Consecutive identical states are kept,
/// the caller decides which of them are actual changes.
pub fn classify_lines<'a>(
    patterns: &'a PatternSet,
    chunk: &'a str,
) -> impl Iterator<Item = State> + 'a {
    chunk.split('\n').filter_map(move |line| patterns.classify(line))
}
