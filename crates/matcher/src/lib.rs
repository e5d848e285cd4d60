/*!
This crate provides the scan backends used by binfind.

A backend is anything implementing [`PatternScanner`]: one operation,
[`PatternScanner::scan`], which runs over a byte range, invokes a callback
for every match and reports a [`Boundary`] describing how much of the range
is fully resolved. The boundary is what makes incremental scanning of an
unbounded stream possible: bytes before the boundary can be discarded, bytes
after it must be re-presented together with the next buffer refill because a
match might still complete across the refill.

Three families of backends exist:

* [`RegexScanner`] compiles the pattern set's regex representation into an
  anchored DFA (via [`regex-automata`](https://docs.rs/regex-automata)) and
  is the only backend that implements partial-match boundary reporting.
* [`SubstringScanner`] matches exact byte patterns with one of several
  pluggable substring algorithms: `memmem` from the
  [`memchr`](https://docs.rs/memchr) crate,
  [`aho-corasick`](https://docs.rs/aho-corasick), or a classical
  Boyer-Moore-Horspool skip search.
* [`MaskScanner`] matches data/mask pairs byte by byte, honoring nyble
  wildcards.

The substring and byte-mask backends always report the whole range as
resolved. A pattern that straddles a buffer refill can therefore be missed
with those backends in sequential mode; this is a documented limitation of
those backends.
*/

#![deny(missing_docs)]

use std::fmt;

pub use crate::{
    mask::MaskScanner,
    regex::RegexScanner,
    substring::{SubstringKind, SubstringScanner},
};

use binfind_pattern::{PatternSet, Representation};

mod mask;
mod regex;
mod substring;

/// Tells a scanner whether to keep going after a match was delivered.
///
/// Returned by the per-match callback.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ScanFlow {
    /// Keep scanning.
    Continue,
    /// Stop scanning this input immediately.
    Stop,
}

impl ScanFlow {
    /// Returns true if this is `ScanFlow::Stop`.
    pub fn is_stop(&self) -> bool {
        *self == ScanFlow::Stop
    }
}

/// The resumable cursor returned by a scan over one buffer.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Boundary {
    /// The callback asked the scanner to stop.
    Stop,
    /// The whole buffer is fully resolved. No trailing partial match can
    /// complete across the next refill.
    Resolved,
    /// Bytes before this offset are fully resolved. Bytes from this offset
    /// to the end of the buffer must be re-presented together with the
    /// next refill.
    Partial(usize),
}

/// The per-match callback. Receives the match's start and end offsets
/// within the scanned buffer.
pub type OnMatch<'a> = dyn FnMut(usize, usize) -> ScanFlow + 'a;

/// A polymorphic scan engine over one buffer of bytes.
pub trait PatternScanner {
    /// Scan `haystack`, invoking `on_match` once per match with the match's
    /// start and end offsets, and report the boundary up to which the
    /// buffer is resolved.
    fn scan(&self, haystack: &[u8], on_match: &mut OnMatch<'_>) -> Boundary;
}

/// The kinds of scan backend that can be constructed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ScannerKind {
    /// The regex backend. This is the default.
    Regex,
    /// Exact substring search using `memchr::memmem`.
    Memmem,
    /// Exact multi-pattern search using Aho-Corasick.
    AhoCorasick,
    /// Exact substring search using Boyer-Moore-Horspool.
    Horspool,
    /// Byte-mask search honoring nyble wildcards.
    Mask,
}

impl ScannerKind {
    /// Map a user-supplied backend name to a kind. Returns `None` for an
    /// unrecognized name.
    pub fn from_name(name: &str) -> Option<ScannerKind> {
        match name {
            "regex" => Some(ScannerKind::Regex),
            "memmem" => Some(ScannerKind::Memmem),
            "aho" => Some(ScannerKind::AhoCorasick),
            "horspool" => Some(ScannerKind::Horspool),
            "mask" => Some(ScannerKind::Mask),
            _ => None,
        }
    }

    /// The pattern representation this backend consumes.
    pub fn representation(&self) -> Representation {
        match *self {
            ScannerKind::Regex => Representation::Regex,
            _ => Representation::Masks,
        }
    }

    /// The backend name, as recognized by [`ScannerKind::from_name`].
    pub fn as_str(&self) -> &'static str {
        match *self {
            ScannerKind::Regex => "regex",
            ScannerKind::Memmem => "memmem",
            ScannerKind::AhoCorasick => "aho",
            ScannerKind::Horspool => "horspool",
            ScannerKind::Mask => "mask",
        }
    }
}

/// Construct the backend of the given kind from a compiled pattern set.
///
/// `case_insensitive` only affects the regex backend; the byte-oriented
/// backends always match bytes exactly.
pub fn build_scanner(
    kind: ScannerKind,
    set: &PatternSet,
    case_insensitive: bool,
) -> Result<Box<dyn PatternScanner>, Error> {
    match kind {
        ScannerKind::Regex => {
            let pattern = set.regex().ok_or_else(Error::representation)?;
            Ok(Box::new(RegexScanner::new(pattern, case_insensitive)?))
        }
        ScannerKind::Memmem => Ok(Box::new(SubstringScanner::new(
            SubstringKind::Memmem,
            set.masks(),
        )?)),
        ScannerKind::AhoCorasick => Ok(Box::new(SubstringScanner::new(
            SubstringKind::AhoCorasick,
            set.masks(),
        )?)),
        ScannerKind::Horspool => Ok(Box::new(SubstringScanner::new(
            SubstringKind::Horspool,
            set.masks(),
        )?)),
        ScannerKind::Mask => Ok(Box::new(MaskScanner::new(set.masks())?)),
    }
}

/// An error that occurred while constructing a scan backend.
#[derive(Clone, Debug)]
pub struct Error {
    kind: ErrorKind,
}

#[derive(Clone, Debug)]
enum ErrorKind {
    /// The regex engine rejected the compiled pattern.
    Regex(String),
    /// The pattern set holds no usable pattern.
    EmptySet,
    /// The pattern set was compiled to the wrong representation for the
    /// requested backend.
    Representation,
}

impl Error {
    pub(crate) fn regex<E: fmt::Display>(err: E) -> Error {
        Error { kind: ErrorKind::Regex(err.to_string()) }
    }

    pub(crate) fn empty_set() -> Error {
        Error { kind: ErrorKind::EmptySet }
    }

    pub(crate) fn representation() -> Error {
        Error { kind: ErrorKind::Representation }
    }
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ErrorKind::Regex(ref msg) => write!(f, "regex error: {}", msg),
            ErrorKind::EmptySet => {
                write!(f, "pattern set contains no non-empty pattern")
            }
            ErrorKind::Representation => write!(
                f,
                "pattern set was compiled to the wrong representation \
                 for this backend"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use binfind_pattern::{PatternCompilerBuilder, Representation};

    #[test]
    fn backend_names() {
        assert_eq!(ScannerKind::from_name("regex"), Some(ScannerKind::Regex));
        assert_eq!(ScannerKind::from_name("mask"), Some(ScannerKind::Mask));
        assert_eq!(ScannerKind::from_name("bogus"), None);
    }

    #[test]
    fn representation_mismatch_is_an_error() {
        let mut b = PatternCompilerBuilder::new();
        b.hex(true).representation(Representation::Masks);
        let set = b.build().compile("41").unwrap();
        assert!(build_scanner(ScannerKind::Regex, &set, false).is_err());
    }

    #[test]
    fn mask_and_regex_backends_agree() {
        // The round-trip property: a mask compiled to regex text and
        // scanned with the regex backend finds the same positions as the
        // mask backend on the original masks.
        let hay = b"\x10\x41\x42\x99\x41\x45\x41\x42";
        let pattern = "41 4?";

        let mut b = PatternCompilerBuilder::new();
        b.hex(true).representation(Representation::Masks);
        let masks = b.build().compile(pattern).unwrap();
        let mut b = PatternCompilerBuilder::new();
        b.hex(true).representation(Representation::Regex);
        let regex = b.build().compile(pattern).unwrap();

        let mut got_mask = vec![];
        let scanner = build_scanner(ScannerKind::Mask, &masks, false).unwrap();
        scanner.scan(hay, &mut |s, e| {
            got_mask.push((s, e));
            ScanFlow::Continue
        });

        let mut got_regex = vec![];
        let scanner =
            build_scanner(ScannerKind::Regex, &regex, false).unwrap();
        scanner.scan(hay, &mut |s, e| {
            got_regex.push((s, e));
            ScanFlow::Continue
        });

        assert_eq!(got_mask, vec![(1, 3), (4, 6), (6, 8)]);
        assert_eq!(got_regex, got_mask);
    }
}
