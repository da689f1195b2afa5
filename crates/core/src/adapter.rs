use pulldown_cmark::Event;
use std::io::{self, Write};

use crate::html_renderer::HtmlRenderer;

/// A bridge that accepts an iterator of Markdown events and streams the
/// resulting HTML directly into an `io::Write`, avoiding an intermediate
/// `String`.
///
/// When the writer is a [`crate::SanitizingWriter`], the final flush is what
/// pushes the tail of the document through the sanitizer.
pub struct PipeAdapter<W> {
    writer: W,
    highlight_code: bool,
}

impl<W: Write> PipeAdapter<W> {
    /// Create a new adapter wrapping an IO writer
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            highlight_code: true,
        }
    }

    pub fn with_highlighting(mut self, enabled: bool) -> Self {
        self.highlight_code = enabled;
        self
    }

    /// Renders every event into the writer, flushes it and hands it back.
    pub fn drive<'a, I>(self, events: I) -> io::Result<W>
    where
        I: Iterator<Item = Event<'a>>,
    {
        let mut writer = HtmlRenderer::new(self.writer)
            .with_highlighting(self.highlight_code)
            .render(events)?;

        writer.flush()?;
        Ok(writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SanitizingWriter;
    use pulldown_cmark::{Options, Parser};

    #[test]
    fn test_streaming_output() {
        let markdown_input = "# Hello Stream\n\n* Item 1\n* Item 2";
        let parser = Parser::new_ext(markdown_input, Options::empty());

        let output_buffer = PipeAdapter::new(Vec::new())
            .drive(parser)
            .expect("Failed to drive stream");
        let output_str = String::from_utf8(output_buffer).unwrap();

        assert!(output_str.contains("<h1>Hello Stream</h1>"));
        assert!(output_str.contains("<li>Item 1</li>"));
    }

    #[test]
    fn flush_finalizes_a_sanitizing_writer() {
        let parser = Parser::new_ext("hi <span onclick=\"x\">there</span>", Options::empty());
        let sanitizer = SanitizingWriter::new(Vec::new());

        let sanitizer = PipeAdapter::new(sanitizer)
            .drive(parser)
            .expect("Failed to drive stream");
        let output_str = String::from_utf8(sanitizer.finish().unwrap()).unwrap();

        assert_eq!(output_str, "<p>hi <span>there</span></p>\n");
    }
}
