//! Untrusted Markdown in, injection-safe HTML out.
//!
//! The pipeline has two independent stages joined by plain HTML text:
//!
//! 1. [`render`]: pulldown-cmark events, with task-list items rewritten by
//!    [`task_list::TaskListItems`], written out by [`HtmlRenderer`]. Code blocks
//!    are highlighted with syntect.
//! 2. [`sanitize`]: the HTML is re-tokenized by lol_html and filtered against
//!    the [`PolicyTable`] whitelist.
//!
//! [`markdown_to_html`] runs both. Every entry point that returns a `String`
//! is total; only [`stream_html`], which writes into a caller's writer, can
//! fail.

use std::io::Write;

use pulldown_cmark::{Event, Parser, TextMergeStream};

mod adapter;
mod end_tags;
mod error;
mod escape;
pub mod highlight;
mod html_renderer;
mod options;
pub mod policy;
mod sanitizer;
pub mod task_list;
pub mod url_scheme;

pub use crate::adapter::PipeAdapter;
pub use crate::error::PipelineError;
pub use crate::escape::escape_html;
pub use crate::html_renderer::HtmlRenderer;
pub use crate::options::PipelineOptions;
pub use crate::policy::PolicyTable;
pub use crate::sanitizer::{SanitizingWriter, filter_attributes, sanitize};
pub use crate::task_list::ListItemKind;

const LOG_TARGET: &str = "marksafe::render";

/// Version of the core crate, surfaced by the bindings.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Converts Markdown to HTML, sanitized unless `sanitize` is false.
///
/// With `sanitize == false` the renderer output is returned as is, raw HTML
/// included. Use that only for trusted input.
pub fn markdown_to_html(source: &str, sanitize: bool) -> String {
    markdown_to_html_with(source, &PipelineOptions::with_sanitize(sanitize))
}

pub fn markdown_to_html_with(source: &str, options: &PipelineOptions) -> String {
    let html = render(source, options);
    if options.sanitize {
        sanitizer::sanitize(&html)
    } else {
        html
    }
}

/// Renders Markdown to HTML without sanitizing it.
///
/// Never fails; should the renderer break down, the source comes back as a
/// single escaped paragraph.
pub fn render(source: &str, options: &PipelineOptions) -> String {
    let adapter = PipeAdapter::new(Vec::with_capacity(source.len() + source.len() / 2))
        .with_highlighting(options.highlight_code);

    match adapter.drive(markdown_events(source, options)) {
        Ok(bytes) => String::from_utf8(bytes)
            .unwrap_or_else(|err| String::from_utf8_lossy(err.as_bytes()).into_owned()),
        Err(err) => {
            log::warn!(target: LOG_TARGET, "rendering failed, emitting escaped source: {err}");
            format!("<p>{}</p>\n", escape_html(source))
        }
    }
}

/// Streams the pipeline's output into `writer` without materializing the
/// rendered HTML, returning the writer once everything is flushed.
pub fn stream_html<W: Write>(
    source: &str,
    options: &PipelineOptions,
    writer: W,
) -> Result<W, PipelineError> {
    let events = markdown_events(source, options);

    if options.sanitize {
        let sanitizer = SanitizingWriter::new(writer);
        PipeAdapter::new(sanitizer)
            .with_highlighting(options.highlight_code)
            .drive(events)?
            .finish()
    } else {
        let writer = PipeAdapter::new(writer)
            .with_highlighting(options.highlight_code)
            .drive(events)?;
        Ok(writer)
    }
}

/// The event stream the renderer consumes: parser output with adjacent text
/// merged and task-list items classified.
pub fn markdown_events<'a>(
    source: &'a str,
    options: &PipelineOptions,
) -> impl Iterator<Item = Event<'a>> + use<'a> {
    let parser = Parser::new_ext(source, options.cmark_options());
    task_list::TaskListItems::new(TextMergeStream::new(parser))
}
