/*!
Exact substring backends over a choice of classical search algorithms.
*/

use aho_corasick::AhoCorasick;
use memchr::memmem;

use binfind_pattern::ByteMask;

use crate::{Boundary, Error, OnMatch, PatternScanner};

/// Which substring algorithm to use.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SubstringKind {
    /// `memchr::memmem`, the default substring search.
    Memmem,
    /// A single Aho-Corasick automaton over all alternatives.
    AhoCorasick,
    /// Boyer-Moore-Horspool with a bad-character skip table.
    Horspool,
}

/// An exact substring backend.
///
/// Only fully fixed patterns are supported. Patterns carrying nyble
/// wildcards are matched by their data bytes alone: the mask is ignored,
/// with a warning, since none of the substring algorithms can skip over
/// wildcarded positions.
///
/// Each pattern is scanned independently, advancing one byte past each hit,
/// so overlapping occurrences of one pattern are all reported. This backend
/// never reports a partial-match boundary; a match straddling a buffer
/// refill in sequential mode is missed.
#[derive(Debug)]
pub struct SubstringScanner {
    imp: Imp,
}

#[derive(Debug)]
enum Imp {
    Memmem(Vec<(usize, memmem::Finder<'static>)>),
    AhoCorasick(AhoCorasick),
    Horspool(Vec<HorspoolFinder>),
}

impl SubstringScanner {
    /// Build a substring scanner over the non-empty patterns in the set.
    pub fn new(
        kind: SubstringKind,
        masks: &[ByteMask],
    ) -> Result<SubstringScanner, Error> {
        if masks.iter().any(|bm| !bm.is_exact()) {
            log::warn!(
                "pattern contains nyble wildcards, which the substring \
                 backends do not support: matching the data bytes exactly \
                 and ignoring the mask"
            );
        }
        let patterns: Vec<&[u8]> = masks
            .iter()
            .filter(|bm| !bm.is_empty())
            .map(|bm| bm.data.as_slice())
            .collect();
        if patterns.is_empty() {
            return Err(Error::empty_set());
        }
        let imp = match kind {
            SubstringKind::Memmem => Imp::Memmem(
                patterns
                    .iter()
                    .map(|p| (p.len(), memmem::Finder::new(p).into_owned()))
                    .collect(),
            ),
            SubstringKind::AhoCorasick => Imp::AhoCorasick(
                AhoCorasick::new(&patterns).map_err(Error::regex)?,
            ),
            SubstringKind::Horspool => Imp::Horspool(
                patterns.iter().map(|p| HorspoolFinder::new(p)).collect(),
            ),
        };
        Ok(SubstringScanner { imp })
    }
}

impl PatternScanner for SubstringScanner {
    fn scan(&self, haystack: &[u8], on_match: &mut OnMatch<'_>) -> Boundary {
        match self.imp {
            Imp::Memmem(ref finders) => {
                for &(len, ref finder) in finders {
                    let mut at = 0;
                    while let Some(i) = finder.find(&haystack[at..]) {
                        let start = at + i;
                        if on_match(start, start + len).is_stop() {
                            return Boundary::Stop;
                        }
                        at = start + 1;
                    }
                }
            }
            Imp::AhoCorasick(ref ac) => {
                for m in ac.find_overlapping_iter(haystack) {
                    if on_match(m.start(), m.end()).is_stop() {
                        return Boundary::Stop;
                    }
                }
            }
            Imp::Horspool(ref finders) => {
                for finder in finders {
                    let mut at = 0;
                    while let Some(i) = finder.find(&haystack[at..]) {
                        let start = at + i;
                        if on_match(start, start + finder.len()).is_stop() {
                            return Boundary::Stop;
                        }
                        at = start + 1;
                    }
                }
            }
        }
        Boundary::Resolved
    }
}

/// A classical Boyer-Moore-Horspool searcher: on a mismatch, shift by the
/// bad-character skip of the haystack byte aligned with the needle's last
/// position.
#[derive(Debug)]
struct HorspoolFinder {
    needle: Vec<u8>,
    skip: [usize; 256],
}

impl HorspoolFinder {
    fn new(needle: &[u8]) -> HorspoolFinder {
        assert!(!needle.is_empty());
        let mut skip = [needle.len(); 256];
        for (i, &b) in needle[..needle.len() - 1].iter().enumerate() {
            skip[usize::from(b)] = needle.len() - 1 - i;
        }
        HorspoolFinder { needle: needle.to_vec(), skip }
    }

    fn len(&self) -> usize {
        self.needle.len()
    }

    fn find(&self, haystack: &[u8]) -> Option<usize> {
        let n = self.needle.len();
        let mut pos = 0;
        while pos + n <= haystack.len() {
            if haystack[pos..pos + n] == *self.needle {
                return Some(pos);
            }
            let last = haystack[pos + n - 1];
            pos += self.skip[usize::from(last)];
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::ScanFlow;

    fn scanner(kind: SubstringKind, patterns: &[&[u8]]) -> SubstringScanner {
        let masks: Vec<ByteMask> = patterns
            .iter()
            .map(|p| ByteMask::exact(p.to_vec()))
            .collect();
        SubstringScanner::new(kind, &masks).unwrap()
    }

    fn matches(s: &SubstringScanner, hay: &[u8]) -> Vec<(usize, usize)> {
        let mut got = vec![];
        let boundary = s.scan(hay, &mut |s, e| {
            got.push((s, e));
            ScanFlow::Continue
        });
        assert_eq!(boundary, Boundary::Resolved);
        got
    }

    const KINDS: [SubstringKind; 3] = [
        SubstringKind::Memmem,
        SubstringKind::AhoCorasick,
        SubstringKind::Horspool,
    ];

    #[test]
    fn finds_every_occurrence() {
        for kind in KINDS {
            let s = scanner(kind, &[b"ab"]);
            assert_eq!(matches(&s, b"ab ab ab"), vec![(0, 2), (3, 5), (6, 8)]);
        }
    }

    #[test]
    fn finds_overlapping_occurrences() {
        for kind in KINDS {
            let s = scanner(kind, &[b"aa"]);
            assert_eq!(matches(&s, b"aaaa"), vec![(0, 2), (1, 3), (2, 4)]);
        }
    }

    #[test]
    fn multiple_patterns() {
        for kind in KINDS {
            let s = scanner(kind, &[b"ab", b"cd"]);
            let mut got = matches(&s, b"abxcd");
            got.sort();
            assert_eq!(got, vec![(0, 2), (3, 5)]);
        }
    }

    #[test]
    fn stop_after_first_match() {
        for kind in KINDS {
            let s = scanner(kind, &[b"a"]);
            let mut n = 0;
            let boundary = s.scan(b"aaa", &mut |_, _| {
                n += 1;
                ScanFlow::Stop
            });
            assert_eq!(n, 1);
            assert_eq!(boundary, Boundary::Stop);
        }
    }

    #[test]
    fn wildcard_mask_degrades_to_exact_bytes() {
        let bm = ByteMask { data: vec![0x41, 0x00], mask: vec![0xFF, 0x00] };
        let s =
            SubstringScanner::new(SubstringKind::Memmem, &[bm]).unwrap();
        // The wildcard byte is matched as a literal 0x00.
        assert_eq!(matches(&s, b"A\x00AB"), vec![(0, 2)]);
    }

    #[test]
    fn empty_set_is_an_error() {
        assert!(SubstringScanner::new(SubstringKind::Memmem, &[]).is_err());
    }

    #[test]
    fn horspool_skip_table() {
        let f = HorspoolFinder::new(b"abcab");
        assert_eq!(f.find(b"xxabcabxx"), Some(2));
        assert_eq!(f.find(b"abcab"), Some(0));
        assert_eq!(f.find(b"abcac"), None);
        assert_eq!(f.find(b"ab"), None);
    }
}
