//! HTML escaping helpers shared by the renderer and the sanitizer.

use std::borrow::Cow;

/// Escapes the five characters that carry meaning in HTML text and attribute
/// values.
///
/// | Char | Entity   |
/// |------|----------|
/// | `&`  | `&amp;`  |
/// | `"`  | `&quot;` |
/// | `<`  | `&lt;`   |
/// | `>`  | `&gt;`   |
/// | `'`  | `&#39;`  |
///
/// Returns the input unchanged (borrowed) when nothing needs escaping.
pub fn escape_html(s: &str) -> Cow<'_, str> {
    escape_with(s, |byte| match byte {
        b'&' => Some("&amp;"),
        b'"' => Some("&quot;"),
        b'<' => Some("&lt;"),
        b'>' => Some("&gt;"),
        b'\'' => Some("&#39;"),
        _ => None,
    })
}

/// Escapes only `<` and `>`.
///
/// Used on text that already went through an HTML tokenizer: entities in it
/// are left alone, stray angle brackets are made inert.
pub fn escape_angle_brackets(s: &str) -> Cow<'_, str> {
    escape_with(s, |byte| match byte {
        b'<' => Some("&lt;"),
        b'>' => Some("&gt;"),
        _ => None,
    })
}

fn escape_with(s: &str, replacement_for: impl Fn(u8) -> Option<&'static str>) -> Cow<'_, str> {
    let mut result: Option<String> = None;
    let mut start = 0;

    for (index, byte) in s.bytes().enumerate() {
        let Some(replacement) = replacement_for(byte) else {
            continue;
        };

        let out = result.get_or_insert_with(|| String::with_capacity(s.len() + 16));
        out.push_str(&s[start..index]);
        out.push_str(replacement);
        start = index + 1;
    }

    match result {
        Some(mut out) => {
            out.push_str(&s[start..]);
            Cow::Owned(out)
        }
        None => Cow::Borrowed(s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_basic_characters() {
        assert_eq!(escape_html("&"), "&amp;");
        assert_eq!(escape_html("<"), "&lt;");
        assert_eq!(escape_html(">"), "&gt;");
        assert_eq!(escape_html("\""), "&quot;");
        assert_eq!(escape_html("'"), "&#39;");
    }

    #[test]
    fn escapes_mixed_content() {
        assert_eq!(
            escape_html("<script>alert('xss')</script>"),
            "&lt;script&gt;alert(&#39;xss&#39;)&lt;/script&gt;"
        );
    }

    #[test]
    fn borrows_when_nothing_to_escape() {
        let text = "Hello world 123 こんにちは";
        assert!(matches!(escape_html(text), Cow::Borrowed(_)));
        assert_eq!(escape_html(""), "");
    }

    #[test]
    fn keeps_multibyte_text_intact() {
        assert_eq!(
            escape_html("🚀 <rocket> & 'emoji'"),
            "🚀 &lt;rocket&gt; &amp; &#39;emoji&#39;"
        );
    }

    #[test]
    fn angle_brackets_leave_entities_alone() {
        assert_eq!(escape_angle_brackets("1 <3 &amp; 2 > 1"), "1 &lt;3 &amp; 2 &gt; 1");
        assert!(matches!(escape_angle_brackets("a &lt; b"), Cow::Borrowed(_)));
    }
}
