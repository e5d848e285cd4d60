/*!
The byte-mask backend: wildcard-aware linear scanning.
*/

use binfind_pattern::ByteMask;

use crate::{Boundary, Error, OnMatch, PatternScanner};

/// A scan backend that honors nyble wildcards.
///
/// Each candidate position is compared byte by byte with
/// `(data[i] ^ haystack[p + i]) & mask[i] == 0`, restarting at the next
/// position on a mismatch. No skip table is built; this is the only
/// backend that supports wildcarded patterns without degrading them.
///
/// Like the substring backends, this backend never reports a partial-match
/// boundary.
#[derive(Clone, Debug)]
pub struct MaskScanner {
    patterns: Vec<ByteMask>,
}

impl MaskScanner {
    /// Build a mask scanner over the non-empty patterns in the set.
    pub fn new(masks: &[ByteMask]) -> Result<MaskScanner, Error> {
        let patterns: Vec<ByteMask> =
            masks.iter().filter(|bm| !bm.is_empty()).cloned().collect();
        if patterns.is_empty() {
            return Err(Error::empty_set());
        }
        Ok(MaskScanner { patterns })
    }

    fn find(bm: &ByteMask, haystack: &[u8], from: usize) -> Option<usize> {
        let n = bm.len();
        if n > haystack.len() {
            return None;
        }
        for at in from..=haystack.len() - n {
            let hit = bm
                .data
                .iter()
                .zip(bm.mask.iter())
                .zip(haystack[at..at + n].iter())
                .all(|((&d, &m), &h)| (d ^ h) & m == 0);
            if hit {
                return Some(at);
            }
        }
        None
    }
}

impl PatternScanner for MaskScanner {
    fn scan(&self, haystack: &[u8], on_match: &mut OnMatch<'_>) -> Boundary {
        for bm in &self.patterns {
            let mut at = 0;
            while let Some(start) = Self::find(bm, haystack, at) {
                if on_match(start, start + bm.len()).is_stop() {
                    return Boundary::Stop;
                }
                at = start + 1;
            }
        }
        Boundary::Resolved
    }
}
