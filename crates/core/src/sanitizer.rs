//! Whitelist HTML sanitizer built on lol_html's streaming tokenizer.
//!
//! Every token is judged on its own, so nesting depth never turns into stack
//! depth:
//!
//! * comments and doctypes are removed;
//! * elements missing from the [`PolicyTable`] are unwrapped (their content
//!   stays and is judged token by token), except script and raw-text elements
//!   which go together with their body;
//! * end tags of such elements are dropped even when nothing was open;
//! * permitted elements keep only permitted attributes, first occurrence
//!   wins, and URL attributes must pass [`is_safe_url`];
//! * text is never unescaped, but stray `<`/`>` are escaped.

use lol_html::errors::RewritingError;
use lol_html::html_content::{ContentType, Element};
use lol_html::{
    HtmlRewriter, OutputSink, Selector, Settings, doc_comments, doc_text, doctype, element,
};
use std::borrow::Cow;
use std::cell::RefCell;
use std::collections::HashSet;
use std::error::Error;
use std::io::{self, Write};
use std::rc::Rc;

use crate::end_tags::EndTagFilter;
use crate::error::PipelineError;
use crate::escape::{escape_angle_brackets, escape_html};
use crate::policy::{AttributeSet, PolicyTable, URL_ATTRIBUTES};
use crate::url_scheme::is_safe_url;

const LOG_TARGET: &str = "marksafe::sanitize";

/// Disallowed elements whose content is removed along with them: script,
/// style and the elements parsed as raw text, whose bodies would otherwise
/// surface as markup once unwrapped.
pub const DISCARD_CONTENT_TAGS: &[&str] = &[
    "script",
    "style",
    "iframe",
    "noscript",
    "noembed",
    "noframes",
    "xmp",
    "plaintext",
    "textarea",
    "title",
];

type HandlerResult = Result<(), Box<dyn Error + Send + Sync>>;

/// Sanitizes an HTML string against [`PolicyTable::global`].
///
/// Never fails: if the tokenizer gives up, the whole input is returned as
/// escaped text, which is inert.
pub fn sanitize(html: &str) -> String {
    let mut sanitizer = SanitizingWriter::new(Vec::with_capacity(html.len()));
    let result = sanitizer
        .write_all(html.as_bytes())
        .map_err(PipelineError::from)
        .and_then(|()| sanitizer.finish());

    match result {
        Ok(bytes) => String::from_utf8(bytes)
            .unwrap_or_else(|err| String::from_utf8_lossy(err.as_bytes()).into_owned()),
        Err(err) => {
            log::warn!(target: LOG_TARGET, "sanitizer failed, emitting input as text: {err}");
            escape_html(html).into_owned()
        }
    }
}

/// Implements [`Write`] so rendered HTML can be sanitized as it is produced.
///
/// The destination writer is shared with lol_html's [`OutputSink`] through a
/// single `Rc<RefCell<Option<W>>>`, so sanitized chunks are forwarded without
/// buffering the document.
pub struct SanitizingWriter<W: Write> {
    rewriter: Option<HtmlRewriter<'static, OutputProxy<W>>>,
    target: Rc<RefCell<Option<W>>>,
    sink_error: Rc<RefCell<Option<io::Error>>>,
}

impl<W: Write> SanitizingWriter<W> {
    pub fn new(writer: W) -> Self {
        let policy = PolicyTable::global();
        let target = Rc::new(RefCell::new(Some(writer)));
        let sink_error = Rc::new(RefCell::new(None));
        let output_sink = OutputProxy::new(
            Rc::clone(&target),
            Rc::clone(&sink_error),
            EndTagFilter::new(policy),
        );
        let rewriter = HtmlRewriter::new(policy_settings(policy), output_sink);

        Self {
            rewriter: Some(rewriter),
            target,
            sink_error,
        }
    }

    /// Flushes the tokenizer and returns the underlying writer.
    pub fn finish(mut self) -> Result<W, PipelineError> {
        self.finalize_if_needed()?;

        let cell = Rc::try_unwrap(self.target)
            .map_err(|_| io::Error::other("sanitizer output still borrowed"))?;

        cell.into_inner()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "writer missing").into())
    }

    fn finalize_if_needed(&mut self) -> Result<(), PipelineError> {
        if let Some(rewriter) = self.rewriter.take() {
            rewriter.end()?;
        }

        Self::take_sink_error(&self.sink_error)?;
        Ok(())
    }

    fn take_sink_error(cell: &Rc<RefCell<Option<io::Error>>>) -> io::Result<()> {
        match cell.borrow_mut().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl<W: Write> Write for SanitizingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let rewriter = self
            .rewriter
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "sanitizer finalized"))?;

        rewriter.write(buf).map_err(rewriting_error_to_io)?;
        Self::take_sink_error(&self.sink_error)?;
        Ok(buf.len())
    }

    /// Ends the document: anything still buffered by the tokenizer is
    /// judged and written. Further writes fail.
    fn flush(&mut self) -> io::Result<()> {
        self.finalize_if_needed().map_err(io::Error::other)
    }
}

fn policy_settings(policy: &'static PolicyTable) -> Settings<'static, 'static> {
    let mut settings = Settings::default();
    settings.element_content_handlers = vec![policy_handler(policy)];
    settings.document_content_handlers = vec![
        doctype!(|doctype| {
            doctype.remove();
            Ok(())
        }),
        doc_comments!(|comment| {
            comment.remove();
            Ok(())
        }),
        doc_text!(|chunk| {
            let escaped = match escape_angle_brackets(chunk.as_str()) {
                Cow::Owned(escaped) => escaped,
                Cow::Borrowed(_) => return Ok(()),
            };
            chunk.replace(&escaped, ContentType::Html);
            Ok(())
        }),
    ];
    settings
}

fn policy_handler(
    policy: &'static PolicyTable,
) -> (
    Cow<'static, Selector>,
    lol_html::ElementContentHandlers<'static>,
) {
    element!("*", move |el| apply_policy(policy, el))
}

fn apply_policy(policy: &PolicyTable, el: &mut Element<'_, '_>) -> HandlerResult {
    let tag = el.tag_name().to_ascii_lowercase();

    let Some(allowed) = policy.attributes_allowed(&tag) else {
        if DISCARD_CONTENT_TAGS.contains(&tag.as_str()) {
            log::trace!(target: LOG_TARGET, "removed <{tag}> with its content");
            el.remove();
        } else {
            log::trace!(target: LOG_TARGET, "unwrapped <{tag}>");
            el.remove_and_keep_content();
        }
        return Ok(());
    };

    let original: Vec<(String, String)> = el
        .attributes()
        .iter()
        .map(|attr| (attr.name().to_ascii_lowercase(), attr.value()))
        .collect();
    let kept = filter_attributes(allowed, &original);

    // Untouched tags keep their exact source bytes.
    if kept.len() == original.len() {
        return Ok(());
    }

    // Rebuilt in one pass; removing attributes one by one rescans the tag
    // for every name.
    let mut start_tag = String::with_capacity(tag.len() + 2 + kept.len() * 16);
    start_tag.push('<');
    start_tag.push_str(&tag);
    for (name, value) in kept {
        start_tag.push(' ');
        start_tag.push_str(name);
        start_tag.push_str("=\"");
        start_tag.push_str(&value.replace('"', "&quot;"));
        start_tag.push('"');
    }
    start_tag.push('>');

    el.start_tag().replace(&start_tag, ContentType::Html);

    Ok(())
}

/// Applies the attribute rules to one tag's attributes, in source order.
///
/// Names outside `allowed` are dropped, a repeated name keeps its first
/// occurrence, and URL attributes with an unsafe scheme are dropped whole.
pub fn filter_attributes<'a>(
    allowed: &AttributeSet,
    attributes: &'a [(String, String)],
) -> Vec<(&'a str, &'a str)> {
    let mut kept: Vec<(&str, &str)> = Vec::with_capacity(attributes.len());
    let mut seen: HashSet<&str> = HashSet::with_capacity(attributes.len());

    for (name, value) in attributes {
        let name = name.as_str();
        if !seen.insert(name) {
            log::trace!(target: LOG_TARGET, "dropped duplicate attribute {name}");
            continue;
        }

        if !allowed.contains(name) {
            log::trace!(target: LOG_TARGET, "dropped attribute {name}");
            continue;
        }
        if URL_ATTRIBUTES.contains(&name) && !is_safe_url(value) {
            log::trace!(target: LOG_TARGET, "dropped {name} with unsafe scheme");
            continue;
        }
        kept.push((name, value.as_str()));
    }

    kept
}

fn rewriting_error_to_io(err: RewritingError) -> io::Error {
    io::Error::other(err)
}

struct OutputProxy<W: Write> {
    target: Rc<RefCell<Option<W>>>,
    sink_error: Rc<RefCell<Option<io::Error>>>,
    end_tags: EndTagFilter,
    filtered: Vec<u8>,
}

impl<W: Write> OutputProxy<W> {
    fn new(
        target: Rc<RefCell<Option<W>>>,
        sink_error: Rc<RefCell<Option<io::Error>>>,
        end_tags: EndTagFilter,
    ) -> Self {
        OutputProxy {
            target,
            sink_error,
            end_tags,
            filtered: Vec::new(),
        }
    }
}

impl<W: Write> OutputSink for OutputProxy<W> {
    /// lol_html signals the end of output with an empty chunk.
    fn handle_chunk(&mut self, chunk: &[u8]) {
        if self.sink_error.borrow().is_some() {
            return;
        }

        self.filtered.clear();
        if chunk.is_empty() {
            self.end_tags.finish(&mut self.filtered);
        } else {
            self.end_tags.feed(chunk, &mut self.filtered);
        }
        if self.filtered.is_empty() {
            return;
        }

        let mut borrow = self.target.borrow_mut();

        if let Some(writer) = borrow.as_mut() {
            if let Err(err) = writer.write_all(&self.filtered) {
                *self.sink_error.borrow_mut() = Some(err);
            }
        }
    }
}
