//! Syntax highlighting for fenced and indented code blocks.

use std::sync::LazyLock;

use syntect::html::{ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;
use thiserror::Error;

static SYNTAX_SET: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);

pub(crate) const LOG_TARGET: &str = "marksafe::highlight";

const CLASS_STYLE: ClassStyle = ClassStyle::SpacedPrefixed { prefix: "hl-" };

/// Reasons a code block could not be highlighted. The renderer recovers from
/// every variant by emitting the block as escaped text.
#[derive(Debug, Error)]
pub enum HighlightError {
    #[error("syntax highlighting failed: {0}")]
    Syntect(#[from] syntect::Error),
    #[error("highlighter produced no output for non-empty code")]
    Empty,
}

/// Highlights `code` into classed `<span>` markup.
///
/// The language hint is matched against syntax names and file extensions;
/// without a match the first line is used for detection (shebangs, `<?php`
/// and similar), and plain text is the last resort. An unknown language is
/// therefore never an error.
pub fn highlight(code: &str, language: Option<&str>) -> Result<String, HighlightError> {
    let syntax = select_syntax(code, language);
    let mut generator =
        ClassedHTMLGenerator::new_with_class_style(syntax, &SYNTAX_SET, CLASS_STYLE);

    for line in LinesWithEndings::from(code) {
        generator.parse_html_for_line_which_includes_newline(line)?;
    }

    let html = generator.finalize();
    if html.is_empty() && !code.is_empty() {
        return Err(HighlightError::Empty);
    }
    Ok(html)
}

fn select_syntax(code: &str, language: Option<&str>) -> &'static SyntaxReference {
    let set: &'static SyntaxSet = &SYNTAX_SET;

    language
        .map(str::trim)
        .filter(|lang| !lang.is_empty())
        .and_then(|lang| set.find_syntax_by_token(lang))
        .or_else(|| {
            code.lines()
                .next()
                .and_then(|first| set.find_syntax_by_first_line(first))
        })
        .unwrap_or_else(|| {
            if let Some(lang) = language {
                log::trace!(target: LOG_TARGET, "no syntax for {lang:?}, using plain text");
            }
            set.find_syntax_plain_text()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn highlights_known_language() {
        let html = highlight("fn main() {}\n", Some("rust")).expect("rust should highlight");
        assert!(html.contains("<span class=\"hl-"), "got: {html}");
        assert!(html.contains("main"));
    }

    #[test]
    fn unknown_language_falls_back_to_plain_text() {
        let html = highlight("just words\n", Some("no-such-language"))
            .expect("unknown language must not fail");
        assert!(html.contains("just words"));
    }

    #[test]
    fn detects_language_from_first_line() {
        let syntax = select_syntax("#!/bin/bash\necho hi\n", None);
        assert_eq!(syntax.name, "Bourne Again Shell (bash)");
    }

    #[test]
    fn escapes_markup_inside_code() {
        let html = highlight("a < b\n", None).expect("plain text highlights");
        assert!(!html.contains("a < b"));
        assert!(html.contains("a &lt; b"));
    }

    #[test]
    fn empty_code_is_not_an_error() {
        assert!(highlight("", Some("rust")).is_ok());
    }
}
