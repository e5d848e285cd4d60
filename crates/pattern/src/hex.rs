/*!
Decoding of hex/nyble-wildcard patterns and GUIDs into data/mask pairs.
*/

use crate::ByteMask;

/// The result of classifying one pattern character.
enum Nyble {
    /// A hex digit with its value.
    Hex(u8),
    /// The `?` wildcard.
    Wildcard,
    /// Anything else. Skipped without error inside a chunk.
    Skip,
}

fn classify(c: char) -> Nyble {
    match c {
        '0'..='9' => Nyble::Hex(c as u8 - b'0'),
        'A'..='F' => Nyble::Hex(c as u8 - b'A' + 10),
        'a'..='f' => Nyble::Hex(c as u8 - b'a' + 10),
        '?' => Nyble::Wildcard,
        _ => Nyble::Skip,
    }
}

fn is_pattern_digit(c: char) -> bool {
    c == '?' || c.is_ascii_hexdigit()
}

/// One `|`-free hex pattern alternative.
///
/// A pattern consists of chunks: maximal runs of hex digits and `?`
/// wildcards, delimited by any other character.
#[derive(Clone, Debug)]
pub(crate) struct HexPattern<'a> {
    pattern: &'a str,
}

impl<'a> HexPattern<'a> {
    pub(crate) fn new(pattern: &'a str) -> HexPattern<'a> {
        HexPattern { pattern }
    }

    fn chunks(&self) -> Vec<&'a str> {
        let mut chunks = vec![];
        let mut rest = self.pattern;
        while let Some(start) = rest.find(is_pattern_digit) {
            rest = &rest[start..];
            let end = rest
                .find(|c| !is_pattern_digit(c))
                .unwrap_or(rest.len());
            chunks.push(&rest[..end]);
            rest = &rest[end..];
        }
        chunks
    }

    /// Decode a single chunk, nyble by nyble.
    ///
    /// Two nybles form one byte. A `?` contributes a zero data bit and
    /// clears the corresponding mask nybble; in the high position it also
    /// resets the in-progress byte. A trailing unpaired nyble is dropped.
    fn decode_chunk(chunk: &str) -> ByteMask {
        let mut bm = ByteMask::default();
        let mut datavalue = 0u8;
        let mut maskvalue = 0u8;
        let mut hi = true;
        for c in chunk.chars() {
            match classify(c) {
                Nyble::Skip => continue,
                Nyble::Wildcard => {
                    if hi {
                        datavalue = 0;
                        maskvalue = 0;
                    }
                }
                Nyble::Hex(v) => {
                    if hi {
                        datavalue = v << 4;
                        maskvalue = 0xF0;
                    } else {
                        datavalue |= v;
                        maskvalue |= 0x0F;
                    }
                }
            }
            if !hi {
                bm.data.push(datavalue);
                bm.mask.push(maskvalue);
            }
            hi = !hi;
        }
        bm
    }

    /// Decode the whole pattern into one data/mask pair.
    ///
    /// When every chunk has the same length and that length is 4, 8, 16 or
    /// 32 nybles (a 2/4/8/16-byte word), each chunk's bytes are reversed so
    /// that a constant written in reading order matches its little-endian
    /// encoding. Otherwise bytes are appended in written order. A chunk
    /// carrying a `?` wildcard is never reversed: the wildcard constrains
    /// the written nyble position, and reversing would move it to a
    /// different byte.
    pub(crate) fn byte_mask(&self) -> ByteMask {
        const WORD_NYBLES: [usize; 4] = [4, 8, 16, 32];

        let chunks = self.chunks();
        let mut sizes: Vec<usize> = chunks.iter().map(|c| c.len()).collect();
        sizes.sort_unstable();
        sizes.dedup();
        let swap = sizes.len() == 1 && WORD_NYBLES.contains(&sizes[0]);

        let mut out = ByteMask::default();
        for chunk in chunks {
            let bm = Self::decode_chunk(chunk);
            if swap && !chunk.contains('?') {
                out.data.extend(bm.data.iter().rev());
                out.mask.extend(bm.mask.iter().rev());
            } else {
                out.data.extend(bm.data);
                out.mask.extend(bm.mask);
            }
        }
        out
    }

    /// Decode the pattern as a GUID in the canonical 8-4-4-4-12 grouping.
    ///
    /// The first three fields are stored little-endian in memory, so their
    /// decoded bytes are reversed; the last two fields are kept in written
    /// order. The result is always 16 bytes.
    pub(crate) fn guid_mask(&self) -> Result<ByteMask, String> {
        const GROUPING: [usize; 5] = [8, 4, 4, 4, 12];
        // wwwwwwww-xxxx-xxxx-bbbb-bbbbbbbbbbbb
        const FIELD_SWAP: [bool; 5] = [true, true, true, false, false];

        let chunks = self.chunks();
        if chunks.len() != GROUPING.len() {
            return Err(format!(
                "expected 5 hyphen-separated fields, got {}",
                chunks.len()
            ));
        }
        let mut out = ByteMask::default();
        for (i, chunk) in chunks.iter().enumerate() {
            if chunk.len() != GROUPING[i] {
                return Err(format!(
                    "field {} has {} digits, expected {}",
                    i + 1,
                    chunk.len(),
                    GROUPING[i]
                ));
            }
            let bm = Self::decode_chunk(chunk);
            if FIELD_SWAP[i] {
                out.data.extend(bm.data.iter().rev());
                out.mask.extend(bm.mask.iter().rev());
            } else {
                out.data.extend(bm.data);
                out.mask.extend(bm.mask);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_splitting() {
        let hp = HexPattern::new("  41 42:43,a?  ");
        assert_eq!(hp.chunks(), vec!["41", "42", "43", "a?"]);
    }

    #[test]
    fn chunk_decoding() {
        let bm = HexPattern::decode_chunk("a1B2");
        assert_eq!(bm.data, vec![0xA1, 0xB2]);
        assert_eq!(bm.mask, vec![0xFF, 0xFF]);
    }

    #[test]
    fn wildcard_resets_byte_in_progress() {
        // '?' in the high position zeroes whatever the previous byte left
        // in the accumulator.
        let bm = HexPattern::decode_chunk("ff?1");
        assert_eq!(bm.data, vec![0xFF, 0x01]);
        assert_eq!(bm.mask, vec![0xFF, 0x0F]);
    }

    #[test]
    fn wildcard_chunk_keeps_written_order() {
        // "41?3" is one word-sized chunk, but the wildcard pins the nyble
        // positions, so no byte swap happens.
        let bm = HexPattern::new("41?3").byte_mask();
        assert_eq!(bm.data, vec![0x41, 0x03]);
        assert_eq!(bm.mask, vec![0xFF, 0x0F]);
    }

    #[test]
    fn wildcard_chunk_unswapped_among_swapped_chunks() {
        let bm = HexPattern::new("1234 4?a8").byte_mask();
        assert_eq!(bm.data, vec![0x34, 0x12, 0x40, 0xA8]);
        assert_eq!(bm.mask, vec![0xFF, 0xFF, 0xF0, 0xFF]);
    }

    #[test]
    fn sixty_four_bit_chunk_swaps() {
        let bm = HexPattern::new("0123456789abcdef").byte_mask();
        assert_eq!(
            bm.data,
            vec![0xEF, 0xCD, 0xAB, 0x89, 0x67, 0x45, 0x23, 0x01]
        );
    }

    #[test]
    fn guid_rejects_short_field() {
        let err = HexPattern::new("1234567-1234-5678-9abc-def012345678")
            .guid_mask()
            .unwrap_err();
        assert!(err.contains("field 1"));
    }

    #[test]
    fn empty_pattern_has_no_chunks() {
        assert!(HexPattern::new("--").chunks().is_empty());
        assert!(HexPattern::new("").byte_mask().is_empty());
    }
}
