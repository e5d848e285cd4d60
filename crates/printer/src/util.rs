use std::fmt::Write;

use bstr::ByteSlice;

/// Render bytes as a space separated sequence of hex octets.
pub(crate) fn hex_dump(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(3 * bytes.len());
    for (i, &b) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        write!(out, "{:02x}", b).unwrap();
    }
    out
}

/// Render bytes as text, replacing anything non-printable with a dot.
///
/// NUL bytes are dropped entirely rather than replaced, so that widened
/// text matches read as their narrow originals.
pub(crate) fn ascii_dump(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for ch in bytes.chars() {
        match ch {
            '\0' => {}
            c if c.is_ascii_graphic() || c == ' ' => out.push(c),
            _ => out.push('.'),
        }
    }
    out
}

/// Render a 16 byte match as a GUID in its conventional text form.
///
/// The first three fields are little-endian on the wire; the remaining
/// eight bytes are not. Returns `None` when the match is not 16 bytes.
pub(crate) fn guid_string(bytes: &[u8]) -> Option<String> {
    let b: &[u8; 16] = bytes.try_into().ok()?;
    let d1 = u32::from_le_bytes([b[0], b[1], b[2], b[3]]);
    let d2 = u16::from_le_bytes([b[4], b[5]]);
    let d3 = u16::from_le_bytes([b[6], b[7]]);
    Some(format!(
        "{{{:08x}-{:04x}-{:04x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}}}",
        d1, d2, d3, b[8], b[9], b[10], b[11], b[12], b[13], b[14], b[15],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex() {
        assert_eq!(hex_dump(b"\x00\xab\x10"), "00 ab 10");
        assert_eq!(hex_dump(b""), "");
    }

    #[test]
    fn ascii() {
        assert_eq!(ascii_dump(b"ab\x01c d\xff"), "ab.c d.");
        assert_eq!(ascii_dump(b"w\x00i\x00d\x00e\x00"), "wide");
    }

    #[test]
    fn guid() {
        let bytes = b"\x78\x56\x34\x12\x34\x12\x78\x56\
                      \x9a\xbc\xde\xf0\x12\x34\x56\x78";
        assert_eq!(
            guid_string(bytes).unwrap(),
            "{12345678-1234-5678-9abc-def012345678}"
        );
        assert_eq!(guid_string(b"short"), None);
    }
}
