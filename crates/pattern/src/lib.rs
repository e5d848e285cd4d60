/*!
This crate compiles user patterns into executable byte-level match
specifications.

A pattern arrives as text: either a literal/regex (`needle`, `foo|bar`), a
hex byte/nyble mask (`41 42 ?3`, `DEADBEEF`) or a GUID in its canonical
grouping (`12345678-1234-5678-9ABC-DEF012345678`). The [`PatternCompiler`]
turns that text, together with a handful of flags, into a [`PatternSet`]:
either a single regex string (for a regex-consuming backend) or a list of
data/mask byte pairs (for substring and byte-mask backends).

# Brief overview

The compiler is the only place that understands pattern *syntax*. Everything
downstream (the scanners in `binfind-matcher`, the stream driver in
`binfind-searcher`) consumes the compiled representation and never looks at
the original text again.

Alternatives are separated by `|` and compiled independently. In hex mode a
pattern is split into whitespace-delimited chunks of hex/`?` characters, and
a uniform chunk width of 4, 8, 16 or 32 nybles triggers a per-chunk byte
swap so that a constant written in natural reading order matches its
little-endian encoding. In GUID mode the canonical 8-4-4-4-12 grouping is
decoded field-wise, with the first three fields byte-reversed. Unless binary
matching is requested, literal patterns additionally grow UTF-16 and UTF-32
widened variants.

# Example

Compile a hex pattern into a data/mask pair:

```
use binfind_pattern::{PatternCompilerBuilder, Representation};

let compiler = PatternCompilerBuilder::new()
    .hex(true)
    .representation(Representation::Masks)
    .build();
let set = compiler.compile("41 4?")?;
assert_eq!(set.masks()[0].data, vec![0x41, 0x40]);
assert_eq!(set.masks()[0].mask, vec![0xFF, 0xF0]);
# Ok::<(), binfind_pattern::PatternError>(())
```
*/

#![deny(missing_docs)]

use std::fmt;

use crate::{hex::HexPattern, wide::widen_regex};

mod hex;
mod wide;

/// A literal-with-wildcards match target.
///
/// `data` and `mask` always have the same length. Each mask byte is one of
/// `0x00` (fully wildcarded), `0xF0` (high nyble fixed), `0x0F` (low nyble
/// fixed) or `0xFF` (fully fixed). A haystack byte `h` matches position `i`
/// when `(data[i] ^ h) & mask[i] == 0`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ByteMask {
    /// The pattern bytes. Wildcarded nybles are zero.
    pub data: Vec<u8>,
    /// The per-byte nyble masks.
    pub mask: Vec<u8>,
}

impl ByteMask {
    /// Create a fully fixed mask from literal bytes.
    pub fn exact(data: Vec<u8>) -> ByteMask {
        let mask = vec![0xFF; data.len()];
        ByteMask { data, mask }
    }

    /// The length of this pattern, in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if this pattern is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns true if every byte is fully fixed, i.e. the pattern can be
    /// handed to an exact substring searcher without losing anything.
    pub fn is_exact(&self) -> bool {
        self.mask.iter().all(|&m| m == 0xFF)
    }

    /// Render this mask as regex text consuming one haystack byte per
    /// pattern byte.
    ///
    /// Fully wildcarded bytes become `.`, a fixed high nyble becomes a
    /// 16-value range `[\xN0-\xNF]`, a fixed low nyble becomes an explicit
    /// 16-member class and fixed bytes become escaped literals.
    pub fn to_regex(&self) -> String {
        let mut out = String::new();
        for (&d, &m) in self.data.iter().zip(self.mask.iter()) {
            match m {
                0x00 => out.push('.'),
                0xF0 => {
                    let lo = d & 0xF0;
                    out.push_str(&format!(
                        r"[\x{:02x}-\x{:02x}]",
                        lo,
                        lo | 0x0F
                    ));
                }
                0x0F => {
                    out.push('[');
                    for hi in (0..0x100usize).step_by(0x10) {
                        out.push_str(&format!(
                            r"\x{:02x}",
                            hi as u8 | (d & 0x0F)
                        ));
                    }
                    out.push(']');
                }
                _ => out.push_str(&format!(r"\x{:02x}", d)),
            }
        }
        out
    }

    /// Widen this mask for wide-character matching by following every byte
    /// with `width - 1` zero-data, zero-mask bytes. `width` is the encoded
    /// unit size: `2` for UTF-16, `4` for UTF-32.
    pub fn widened(&self, width: usize) -> ByteMask {
        assert!(width == 2 || width == 4);
        let mut data = Vec::with_capacity(self.data.len() * width);
        let mut mask = Vec::with_capacity(self.mask.len() * width);
        for (&d, &m) in self.data.iter().zip(self.mask.iter()) {
            data.push(d);
            mask.push(m);
            for _ in 1..width {
                data.push(0);
                mask.push(0);
            }
        }
        ByteMask { data, mask }
    }
}

/// Which representation the compiler should populate.
///
/// Exactly one representation is populated per compiled run, selected by
/// the matcher backend that will consume it.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Representation {
    /// Produce a single regex string, for the regex backend.
    Regex,
    /// Produce a list of data/mask pairs, for the substring and byte-mask
    /// backends.
    Masks,
}

/// A compiled set of alternative patterns.
///
/// Built once per process invocation and read-only thereafter.
#[derive(Clone, Debug, Default)]
pub struct PatternSet {
    regex: Option<String>,
    masks: Vec<ByteMask>,
}

impl PatternSet {
    /// The regex representation, if that is what was compiled.
    pub fn regex(&self) -> Option<&str> {
        self.regex.as_deref()
    }

    /// The data/mask alternatives, if that is what was compiled.
    pub fn masks(&self) -> &[ByteMask] {
        &self.masks
    }
}

/// The configuration of a pattern compiler. Fully determines the
/// transformation pipeline and is frozen once compilation starts.
#[derive(Clone, Copy, Debug)]
struct Config {
    hex: bool,
    guid: bool,
    binary: bool,
    word: bool,
    representation: Representation,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            hex: false,
            guid: false,
            binary: false,
            word: false,
            representation: Representation::Regex,
        }
    }
}

/// A builder for constructing a pattern compiler.
#[derive(Clone, Debug, Default)]
pub struct PatternCompilerBuilder {
    config: Config,
}

impl PatternCompilerBuilder {
    /// Create a new builder with a default configuration.
    pub fn new() -> PatternCompilerBuilder {
        PatternCompilerBuilder { config: Config::default() }
    }

    /// Build a compiler from this configuration.
    pub fn build(&self) -> PatternCompiler {
        PatternCompiler { config: self.config }
    }

    /// Treat the pattern as hex bytes with `?` nyble wildcards.
    ///
    /// Hex patterns are always matched byte-for-byte, so this implies
    /// binary matching (no wide-character variants are generated).
    pub fn hex(&mut self, yes: bool) -> &mut PatternCompilerBuilder {
        self.config.hex = yes;
        self
    }

    /// Treat the pattern as a GUID in its canonical 8-4-4-4-12 grouping.
    ///
    /// Like hex mode, this implies binary matching.
    pub fn guid(&mut self, yes: bool) -> &mut PatternCompilerBuilder {
        self.config.guid = yes;
        self
    }

    /// Match the pattern bytes as written, without generating the UTF-16
    /// and UTF-32 widened variants of literal patterns.
    pub fn binary(&mut self, yes: bool) -> &mut PatternCompilerBuilder {
        self.config.binary = yes;
        self
    }

    /// Anchor the pattern at word boundaries.
    ///
    /// This only affects the regex representation. It is a no-op for the
    /// data/mask representation.
    pub fn word(&mut self, yes: bool) -> &mut PatternCompilerBuilder {
        self.config.word = yes;
        self
    }

    /// Select which representation to populate.
    pub fn representation(
        &mut self,
        repr: Representation,
    ) -> &mut PatternCompilerBuilder {
        self.config.representation = repr;
        self
    }
}

/// Compiles pattern text into a [`PatternSet`].
#[derive(Clone, Debug)]
pub struct PatternCompiler {
    config: Config,
}

impl PatternCompiler {
    /// Create a compiler with a default configuration: literal/regex
    /// pattern, regex representation, wide-character variants enabled.
    pub fn new() -> PatternCompiler {
        PatternCompilerBuilder::new().build()
    }

    /// Compile the given pattern text.
    ///
    /// Alternatives separated by `|` are compiled independently and
    /// recombined. Hex decoding is permissive: characters that are neither
    /// hex digits nor `?` inside a chunk are silently skipped. GUID
    /// decoding is strict and fails with a descriptive error when the
    /// pattern does not consist of exactly five chunks in the canonical
    /// grouping.
    pub fn compile(&self, pattern: &str) -> Result<PatternSet, PatternError> {
        if pattern.is_empty() {
            return Err(PatternError { kind: ErrorKind::Empty });
        }
        let mut set = if self.config.hex {
            self.compile_hex(pattern)?
        } else if self.config.guid {
            self.compile_guid(pattern)?
        } else {
            self.compile_literal(pattern)
        };
        if self.config.word {
            if let Some(re) = set.regex.take() {
                set.regex = Some(format!(r"\b(?:{})\b", re));
            }
        }
        Ok(set)
    }

    fn compile_hex(&self, pattern: &str) -> Result<PatternSet, PatternError> {
        let mut set = PatternSet::default();
        match self.config.representation {
            Representation::Regex => {
                let alts: Vec<String> = pattern
                    .split('|')
                    .map(|alt| HexPattern::new(alt).byte_mask().to_regex())
                    .collect();
                set.regex = Some(alts.join("|"));
            }
            Representation::Masks => {
                for alt in pattern.split('|') {
                    set.masks.push(HexPattern::new(alt).byte_mask());
                }
            }
        }
        Ok(set)
    }

    fn compile_guid(&self, pattern: &str) -> Result<PatternSet, PatternError> {
        let mut set = PatternSet::default();
        match self.config.representation {
            Representation::Regex => {
                let mut alts = vec![];
                for alt in pattern.split('|') {
                    alts.push(guid_mask(alt)?.to_regex());
                }
                set.regex = Some(alts.join("|"));
            }
            Representation::Masks => {
                for alt in pattern.split('|') {
                    set.masks.push(guid_mask(alt)?);
                }
            }
        }
        Ok(set)
    }

    fn compile_literal(&self, pattern: &str) -> PatternSet {
        let mut set = PatternSet::default();
        match self.config.representation {
            Representation::Regex => {
                let mut re = pattern.to_string();
                if !self.config.binary {
                    re = format!(
                        "{}|{}|{}",
                        re,
                        widen_regex(pattern, 2),
                        widen_regex(pattern, 4)
                    );
                }
                set.regex = Some(re);
            }
            Representation::Masks => {
                for alt in pattern.split('|') {
                    set.masks.push(ByteMask::exact(alt.as_bytes().to_vec()));
                }
                if !self.config.binary {
                    let n = set.masks.len();
                    for i in 0..n {
                        set.masks.push(set.masks[i].widened(2));
                        set.masks.push(set.masks[i].widened(4));
                    }
                }
            }
        }
        set
    }
}

impl Default for PatternCompiler {
    fn default() -> PatternCompiler {
        PatternCompiler::new()
    }
}

fn guid_mask(alt: &str) -> Result<ByteMask, PatternError> {
    HexPattern::new(alt).guid_mask().map_err(|reason| PatternError {
        kind: ErrorKind::InvalidGuid { pattern: alt.to_string(), reason },
    })
}

/// An error that occurred while compiling a pattern.
///
/// No valid search specification exists when compilation fails, so callers
/// are expected to abort the whole run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PatternError {
    kind: ErrorKind,
}

#[derive(Clone, Debug, Eq, PartialEq)]
enum ErrorKind {
    /// The pattern text was empty.
    Empty,
    /// The pattern did not tokenize into the canonical GUID grouping.
    InvalidGuid { pattern: String, reason: String },
}

impl std::error::Error for PatternError {}

impl fmt::Display for PatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ErrorKind::Empty => write!(f, "empty pattern"),
            ErrorKind::InvalidGuid { ref pattern, ref reason } => {
                write!(f, "invalid GUID pattern '{}': {}", pattern, reason)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_compiler() -> PatternCompiler {
        let mut b = PatternCompilerBuilder::new();
        b.hex(true).representation(Representation::Masks);
        b.build()
    }

    fn decode(pattern: &str) -> ByteMask {
        let set = mask_compiler().compile(pattern).unwrap();
        assert_eq!(set.masks().len(), 1);
        set.masks()[0].clone()
    }

    #[test]
    fn hex_plain_bytes() {
        let bm = decode("41 42 43");
        assert_eq!(bm.data, vec![0x41, 0x42, 0x43]);
        assert_eq!(bm.mask, vec![0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn hex_low_nyble_wildcard() {
        let bm = decode("41?3");
        assert_eq!(bm.data, vec![0x41, 0x03]);
        assert_eq!(bm.mask, vec![0xFF, 0x0F]);
    }

    #[test]
    fn hex_high_nyble_fixed() {
        let bm = decode("4?");
        assert_eq!(bm.data, vec![0x40]);
        assert_eq!(bm.mask, vec![0xF0]);
    }

    #[test]
    fn hex_full_wildcard_byte() {
        let bm = decode("41 ?? 43");
        assert_eq!(bm.data, vec![0x41, 0x00, 0x43]);
        assert_eq!(bm.mask, vec![0xFF, 0x00, 0xFF]);
    }

    #[test]
    fn hex_uniform_width_byteswap() {
        // One 8-nyble chunk is read as a 32-bit constant and byte-swapped.
        let bm = decode("12345678");
        assert_eq!(bm.data, vec![0x78, 0x56, 0x34, 0x12]);
        assert_eq!(bm.mask, vec![0xFF; 4]);
    }

    #[test]
    fn hex_uniform_width_byteswap_multiple_chunks() {
        let bm = decode("1234 5678");
        assert_eq!(bm.data, vec![0x34, 0x12, 0x78, 0x56]);
    }

    #[test]
    fn hex_mixed_width_no_byteswap() {
        // A trailing odd nyble is dropped; mixed widths keep written order.
        let bm = decode("1234 567");
        assert_eq!(bm.data, vec![0x12, 0x34, 0x56]);
        assert_eq!(bm.mask, vec![0xFF; 3]);
    }

    #[test]
    fn hex_pair_width_no_byteswap() {
        let bm = decode("12 34 56");
        assert_eq!(bm.data, vec![0x12, 0x34, 0x56]);
    }

    #[test]
    fn hex_alternatives() {
        let set = mask_compiler().compile("41|42 43").unwrap();
        assert_eq!(set.masks().len(), 2);
        assert_eq!(set.masks()[0].data, vec![0x41]);
        assert_eq!(set.masks()[1].data, vec![0x42, 0x43]);
    }

    #[test]
    fn hex_permissive_separators() {
        // ':' is not a valid digit, so it separates chunks instead of
        // failing the compile.
        let bm = decode("de:ad:be:ef");
        assert_eq!(bm.data, vec![0xDE, 0xAD, 0xBE, 0xEF]);
    }

    #[test]
    fn guid_field_endianness() {
        let mut b = PatternCompilerBuilder::new();
        b.guid(true).representation(Representation::Masks);
        let set =
            b.build().compile("12345678-1234-5678-9ABC-DEF012345678").unwrap();
        assert_eq!(
            set.masks()[0].data,
            vec![
                0x78, 0x56, 0x34, 0x12, 0x34, 0x12, 0x78, 0x56, 0x9A, 0xBC,
                0xDE, 0xF0, 0x12, 0x34, 0x56, 0x78,
            ]
        );
        assert_eq!(set.masks()[0].mask, vec![0xFF; 16]);
    }

    #[test]
    fn guid_wrong_chunk_count() {
        let mut b = PatternCompilerBuilder::new();
        b.guid(true).representation(Representation::Masks);
        assert!(b.build().compile("12345678-1234-5678").is_err());
    }

    #[test]
    fn guid_wrong_grouping() {
        let mut b = PatternCompilerBuilder::new();
        b.guid(true).representation(Representation::Masks);
        assert!(b.build().compile("1234-5678-1234-5678-9ABC").is_err());
    }

    #[test]
    fn regex_rendering_of_masks() {
        let mut b = PatternCompilerBuilder::new();
        b.hex(true).representation(Representation::Regex);
        let set = b.build().compile("41 ?? 4? ?2 43").unwrap();
        let expected = concat!(
            r"\x41",
            ".",
            r"[\x40-\x4f]",
            r"[\x02\x12\x22\x32\x42\x52\x62\x72\x82\x92\xa2\xb2\xc2\xd2\xe2\xf2]",
            r"\x43",
        );
        assert_eq!(set.regex(), Some(expected));
    }

    #[test]
    fn literal_masks_are_exact() {
        let mut b = PatternCompilerBuilder::new();
        b.binary(true).representation(Representation::Masks);
        let set = b.build().compile("AB|C").unwrap();
        assert_eq!(set.masks().len(), 2);
        assert_eq!(set.masks()[0], ByteMask::exact(b"AB".to_vec()));
        assert_eq!(set.masks()[1], ByteMask::exact(b"C".to_vec()));
    }

    #[test]
    fn literal_masks_widened() {
        let mut b = PatternCompilerBuilder::new();
        b.representation(Representation::Masks);
        let set = b.build().compile("AB").unwrap();
        // original, UTF-16 and UTF-32 variants
        assert_eq!(set.masks().len(), 3);
        assert_eq!(set.masks()[1].data, vec![0x41, 0, 0x42, 0]);
        assert_eq!(set.masks()[1].mask, vec![0xFF, 0, 0xFF, 0]);
        assert_eq!(set.masks()[2].data, vec![0x41, 0, 0, 0, 0x42, 0, 0, 0]);
        assert_eq!(set.masks()[2].mask, vec![0xFF, 0, 0, 0, 0xFF, 0, 0, 0]);
    }

    #[test]
    fn literal_regex_widened() {
        let set = PatternCompiler::new().compile("AB").unwrap();
        assert_eq!(
            set.regex(),
            Some(
                "AB|A\\x00B\\x00|A\\x00\\x00\\x00B\\x00\\x00\\x00"
            )
        );
    }

    #[test]
    fn word_boundary_wraps_regex() {
        let mut b = PatternCompilerBuilder::new();
        b.binary(true).word(true);
        let set = b.build().compile("abc").unwrap();
        assert_eq!(set.regex(), Some(r"\b(?:abc)\b"));
    }

    #[test]
    fn empty_pattern_is_an_error() {
        assert!(PatternCompiler::new().compile("").is_err());
    }
}
