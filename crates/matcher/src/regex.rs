/*!
The regex backend, built on an anchored dense DFA.
*/

use regex_automata::{
    Anchored, Input, MatchKind,
    dfa::{Automaton, StartKind, dense},
    util::syntax,
};

use crate::{Boundary, Error, OnMatch, PatternScanner};

/// The outcome of one anchored walk starting at a fixed position.
enum Walk {
    /// A full match ending at the given offset.
    Match(usize),
    /// The automaton was still live when the buffer ran out, without
    /// having matched: a match could complete with more data.
    Partial,
    /// No match can start here.
    Dead,
}

/// A scan backend that interprets the pattern as a regex.
///
/// This is the only backend that reports partial-match boundaries, which
/// makes it the only backend that never misses a match straddling a buffer
/// refill in sequential mode.
#[derive(Debug)]
pub struct RegexScanner {
    dfa: dense::DFA<Vec<u32>>,
}

impl RegexScanner {
    /// Compile the given regex into a scanner.
    ///
    /// The pattern is compiled byte-oriented (no Unicode mode, arbitrary
    /// byte escapes allowed) since the haystack is raw binary data.
    pub fn new(
        pattern: &str,
        case_insensitive: bool,
    ) -> Result<RegexScanner, Error> {
        let dfa = dense::Builder::new()
            .configure(
                dense::Config::new()
                    .start_kind(StartKind::Anchored)
                    .match_kind(MatchKind::All),
            )
            .syntax(
                syntax::Config::new()
                    .unicode(false)
                    .utf8(false)
                    .case_insensitive(case_insensitive),
            )
            .build(pattern)
            .map_err(Error::regex)?;
        Ok(RegexScanner { dfa })
    }

    /// Walk the DFA anchored at `at`.
    ///
    /// Match states in a dense DFA are delayed by one byte, so a match
    /// state observed after feeding the byte at `i` denotes a match ending
    /// at `i`, and the end-of-input transition resolves a match ending at
    /// the buffer end.
    fn walk(&self, haystack: &[u8], at: usize) -> Walk {
        let input = Input::new(haystack).anchored(Anchored::Yes).range(at..);
        let mut sid = match self.dfa.start_state_forward(&input) {
            Ok(sid) => sid,
            Err(_) => return Walk::Dead,
        };
        let mut last_match = None;
        for i in at..haystack.len() {
            sid = self.dfa.next_state(sid, haystack[i]);
            if self.dfa.is_special_state(sid) {
                if self.dfa.is_match_state(sid) {
                    last_match = Some(i);
                } else if self.dfa.is_dead_state(sid)
                    || self.dfa.is_quit_state(sid)
                {
                    return match last_match {
                        Some(end) => Walk::Match(end),
                        None => Walk::Dead,
                    };
                }
            }
        }
        let sid = self.dfa.next_eoi_state(sid);
        if self.dfa.is_match_state(sid) {
            last_match = Some(haystack.len());
        }
        match last_match {
            Some(end) => Walk::Match(end),
            // still live at the buffer end
            None => Walk::Partial,
        }
    }
}

impl PatternScanner for RegexScanner {
    fn scan(&self, haystack: &[u8], on_match: &mut OnMatch<'_>) -> Boundary {
        let mut at = 0;
        let mut max_full: Option<usize> = None;
        let mut max_partial: Option<usize> = None;
        while at < haystack.len() {
            match self.walk(haystack, at) {
                Walk::Dead => at += 1,
                Walk::Match(end) => {
                    if on_match(at, end).is_stop() {
                        return Boundary::Stop;
                    }
                    max_full = Some(at);
                    // A full match supersedes any partial seen before it:
                    // the bytes it covers are resolved.
                    max_partial = None;
                    at = if end > at { end } else { at + 1 };
                }
                Walk::Partial => {
                    if max_partial.is_none() {
                        max_partial = Some(at);
                    }
                    at += 1;
                }
            }
        }
        match (max_full, max_partial) {
            (_, None) => Boundary::Resolved,
            (Some(full), Some(partial)) if full >= partial => {
                Boundary::Resolved
            }
            (_, Some(partial)) => Boundary::Partial(partial),
        }
    }
}
