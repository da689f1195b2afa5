//! Scheme check for URL-bearing attributes (`href`, `src`, `cite`).

/// Schemes an attribute value may name explicitly.
pub const SAFE_SCHEMES: &[&str] = &["http", "https", "mailto"];

/// Returns true when `value` is a relative/fragment reference or names one of
/// [`SAFE_SCHEMES`].
///
/// Character references are decoded and ASCII whitespace and control
/// characters removed first, so `&#106;avascript:` and `java\tscript:` are
/// recognized for what a browser would make of them. Any colon that appears
/// before the first `/`, `?` or `#` is treated as a scheme delimiter.
pub fn is_safe_url(value: &str) -> bool {
    let normalized: String = decode_references(value)
        .chars()
        .filter(|ch| !ch.is_ascii_whitespace() && !ch.is_control())
        .collect();

    let Some(delimiter) = normalized.find([':', '/', '?', '#']) else {
        return true;
    };
    if !normalized[delimiter..].starts_with(':') {
        return true;
    }

    let scheme = &normalized[..delimiter];
    SAFE_SCHEMES
        .iter()
        .any(|safe| safe.eq_ignore_ascii_case(scheme))
}

/// Decodes numeric character references and the handful of named ones that
/// can spell out a scheme or its delimiters. Unknown references stay literal.
fn decode_references(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];

        match decode_one(rest) {
            Some((ch, consumed)) => {
                out.push(ch);
                rest = &rest[consumed..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

/// Decodes a reference at the start of `s` (which begins with `&`), returning
/// the character and the number of bytes consumed.
fn decode_one(s: &str) -> Option<(char, usize)> {
    let body = &s[1..];

    if let Some(numeric) = body.strip_prefix('#') {
        let (radix, digits_start) = match numeric.as_bytes().first() {
            Some(b'x' | b'X') => (16, 1),
            _ => (10, 0),
        };
        let digits = &numeric[digits_start..];
        let len = digits
            .bytes()
            .take_while(|b| (*b as char).is_digit(radix))
            .count();
        if len == 0 {
            return None;
        }

        let code = digits[..len].chars().fold(0u32, |acc, digit| {
            let value = digit.to_digit(radix).unwrap_or(0);
            acc.saturating_mul(radix).saturating_add(value)
        });
        let ch = match char::from_u32(code) {
            Some(ch) if code != 0 => ch,
            _ => char::REPLACEMENT_CHARACTER,
        };

        let mut consumed = 1 + 1 + digits_start + len;
        if s[consumed..].starts_with(';') {
            consumed += 1;
        }
        return Some((ch, consumed));
    }

    let end = body.find(';')?;
    let ch = match &body[..end] {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "colon" => ':',
        "Tab" => '\t',
        "NewLine" => '\n',
        "nbsp" => '\u{a0}',
        "sol" => '/',
        "num" => '#',
        "quest" => '?',
        "period" => '.',
        "plus" => '+',
        "lpar" => '(',
        "rpar" => ')',
        _ => return None,
    };
    Some((ch, 1 + end + 1))
}
