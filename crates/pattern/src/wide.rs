/*!
Regex-token-aware widening of patterns for UTF-16/UTF-32 matching.
*/

/// Widen a regex pattern so that it matches the wide-character encoding of
/// the same text: every unit that consumes one literal haystack byte is
/// followed by `width - 1` zero bytes.
///
/// The tokenizer recognizes escape sequences (`\c`, with `\xHH` treated as
/// one unit), bracket character classes (padded once after the closing
/// bracket), `{m,n}` quantifiers (passed through verbatim) and the
/// structural characters `( ) * + ? ^ $ |` (copied unchanged). Everything
/// else is a literal and gets the zero-byte padding.
pub(crate) fn widen_regex(pattern: &str, width: usize) -> String {
    assert!(width == 2 || width == 4);
    let pad = if width == 2 { r"\x00" } else { r"\x00\x00\x00" };

    let mut out = String::with_capacity(pattern.len() * width);
    let mut esc = String::new();
    let mut class = String::new();
    let mut quantifier = String::new();

    for c in pattern.chars() {
        if !esc.is_empty() {
            esc.push(c);
            if esc.len() > 1 {
                // \xHH is a four-character unit, every other escape is two.
                if esc.as_bytes()[1] != b'x' || esc.len() == 4 {
                    out.push_str(&esc);
                    out.push_str(pad);
                    esc.clear();
                }
            }
        } else if c == '\\' {
            esc.push(c);
        } else if !quantifier.is_empty() {
            quantifier.push(c);
            if c == '}' {
                out.push_str(&quantifier);
                quantifier.clear();
            }
        } else if !class.is_empty() {
            class.push(c);
            if c == ']' {
                out.push_str(&class);
                out.push_str(pad);
                class.clear();
            }
        } else if c == '[' {
            class.push(c);
        } else if c == '{' {
            quantifier.push(c);
        } else if !matches!(c, '(' | ')' | '*' | '|' | '+' | '?' | '^' | '$')
        {
            out.push(c);
            out.push_str(pad);
        } else {
            // structural regex token, no padding
            out.push(c);
        }
    }
    out
}
