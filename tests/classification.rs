// tests/classification.rs

use proptest::prelude::*;

use tend::command::PatternSet;
use tend::exec::{LineBuffer, MAX_PENDING_LINE};
use tend::supervisor::classify::classify_lines;
use tend::types::State;

fn patterns(ready: &[&str], building: &[&str], failed: &[&str]) -> PatternSet {
    let own = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    PatternSet::compile(&own(ready), &own(building), &own(failed)).unwrap()
}

#[test]
fn unmatched_lines_change_nothing() {
    let set = patterns(&["ready"], &["building"], &["error"]);
    assert_eq!(set.classify("hello world"), None);
}

#[test]
fn matching_is_case_insensitive() {
    let set = patterns(&["compiled successfully"], &[], &[]);
    assert_eq!(set.classify("Compiled Successfully in 3s"), Some(State::Ready));
}

#[test]
fn empty_pattern_set_never_matches() {
    let set = PatternSet::default();
    assert!(set.is_empty());
    assert_eq!(set.classify("ready building error"), None);
}

#[test]
fn invalid_pattern_is_config_error() {
    let err = PatternSet::compile(&["(".to_string()], &[], &[]).unwrap_err();
    assert!(err.to_string().contains("invalid `ready` pattern"));
}

#[test]
fn each_line_of_a_chunk_is_classified_in_order() {
    let set = patterns(&["listening"], &["compiling"], &["error"]);
    let found: Vec<State> =
        classify_lines(&set, "compiling app\nerror: oops\nnoise\nlistening on 80").collect();
    assert_eq!(found, vec![State::Building, State::Failed, State::Ready]);
}

proptest! {
    #[test]
    fn ready_beats_building_and_failed(
        prefix in "[a-z ]{0,12}",
        middle in "[a-z ]{0,12}",
        suffix in "[a-z ]{0,12}",
        failed_first in any::<bool>(),
    ) {
        let set = patterns(&["READYMARK"], &["BUILDMARK"], &["FAILMARK"]);
        let (a, b) = if failed_first { ("FAILMARK", "READYMARK") } else { ("READYMARK", "BUILDMARK FAILMARK") };
        let line = format!("{prefix}{a}{middle}{b}{suffix}");
        prop_assert_eq!(set.classify(&line), Some(State::Ready));
    }

    #[test]
    fn building_beats_failed(prefix in "[a-z ]{0,12}", suffix in "[a-z ]{0,12}") {
        let set = patterns(&["READYMARK"], &["BUILDMARK"], &["FAILMARK"]);
        let line = format!("{prefix}FAILMARK BUILDMARK{suffix}");
        prop_assert_eq!(set.classify(&line), Some(State::Building));
    }

    #[test]
    fn line_buffer_never_splits_lines(
        lines in prop::collection::vec("[a-z]{0,8}", 1..8),
        cut in 1usize..7,
    ) {
        let text = lines.iter().map(|l| format!("{l}\n")).collect::<String>();
        let mut buf = LineBuffer::new();
        let mut seen = Vec::new();
        for piece in text.as_bytes().chunks(cut) {
            if let Some(chunk) = buf.push(piece) {
                seen.extend(chunk.split('\n').map(str::to_string));
            }
        }
        prop_assert_eq!(buf.finish(), None);
        prop_assert_eq!(seen, lines);
    }
}

#[test]
fn line_buffer_holds_partial_lines() {
    let mut buf = LineBuffer::new();
    assert_eq!(buf.push(b"webpack comp"), None);
    assert_eq!(
        buf.push(b"iled successfully\r\nnext li"),
        Some("webpack compiled successfully".to_string())
    );
    assert_eq!(buf.push(b"ne\nlast\nta"), Some("next line\nlast".to_string()));
    assert_eq!(buf.finish(), Some("ta".to_string()));
    assert_eq!(buf.finish(), None);
}

#[test]
fn line_buffer_flushes_overlong_unterminated_output() {
    let mut buf = LineBuffer::new();
    let chunk = vec![b'#'; 8 * 1024];

    let mut flushed = Vec::new();
    for _ in 0..64 {
        if let Some(data) = buf.push(&chunk) {
            flushed.push(data);
        }
    }

    // 512 KiB of progress bar without a newline comes out in bounded pieces.
    assert_eq!(flushed.len(), 64 * 8 * 1024 / MAX_PENDING_LINE);
    assert!(flushed.iter().all(|d| d.len() == MAX_PENDING_LINE));
    assert_eq!(buf.finish(), None);

    // Normal line handling resumes afterwards.
    assert_eq!(buf.push(b"compiled\n"), Some("compiled".to_string()));
}
