use std::io::{self, Write};
use std::iter::Peekable;

use pulldown_cmark::{Alignment, CodeBlockKind, Event, LinkType, Tag, TagEnd};

use crate::escape::escape_html;
use crate::highlight::{self, highlight};
use crate::task_list::ListItemKind;

/// Writes HTML for a stream of Markdown events.
///
/// Task items must already carry their [`Event::TaskListMarker`] directly
/// after `Start(Item)` (see [`crate::task_list::TaskListItems`]).
pub struct HtmlRenderer<W: Write> {
    writer: W,
    highlight_code: bool,
    table_head_depth: usize,
    table_stack: Vec<TableState>,
    image_stack: Vec<ImageContext>,
    code_block: Option<CodeBlockState>,
}

struct TableState {
    alignments: Vec<Alignment>,
    column_index: usize,
}

struct ImageContext {
    dest_url: String,
    title: String,
    alt: String,
}

struct CodeBlockState {
    language: Option<String>,
    source: String,
}

impl<W: Write> HtmlRenderer<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            highlight_code: true,
            table_head_depth: 0,
            table_stack: Vec::new(),
            image_stack: Vec::new(),
            code_block: None,
        }
    }

    /// Switches syntax highlighting of code blocks on or off.
    pub fn with_highlighting(mut self, enabled: bool) -> Self {
        self.highlight_code = enabled;
        self
    }

    pub fn render<'a, I>(mut self, iter: I) -> io::Result<W>
    where
        I: IntoIterator<Item = Event<'a>>,
    {
        let mut events = iter.into_iter().peekable();

        while let Some(event) = events.next() {
            if self.handle_image_text(&event) || self.handle_code_text(&event) {
                continue;
            }

            match event {
                Event::Start(Tag::Item) => {
                    let kind = next_item_kind(&mut events);
                    self.writer.write_all(kind.opening_markup().as_bytes())?;
                }
                Event::Start(Tag::Image {
                    dest_url, title, ..
                }) => {
                    self.image_stack.push(ImageContext {
                        dest_url: dest_url.into_string(),
                        title: title.into_string(),
                        alt: String::new(),
                    });
                }
                Event::Start(Tag::CodeBlock(kind)) => {
                    let language = match kind {
                        CodeBlockKind::Fenced(info) => info
                            .split_whitespace()
                            .next()
                            .map(str::to_owned),
                        CodeBlockKind::Indented => None,
                    };
                    self.start_code_block(language)?;
                }
                Event::Start(tag) => self.write_start_tag(tag)?,
                Event::End(TagEnd::Image) => self.finish_image()?,
                Event::End(TagEnd::CodeBlock) => self.finish_code_block()?,
                Event::End(end) => self.write_end_tag(end)?,
                Event::Text(text) => self.write_text(&text)?,
                Event::Code(text) => {
                    self.writer.write_all(b"<code>")?;
                    self.write_text(&text)?;
                    self.writer.write_all(b"</code>")?;
                }
                Event::Html(html) | Event::InlineHtml(html) => {
                    self.writer.write_all(html.as_bytes())?;
                }
                Event::InlineMath(math) | Event::DisplayMath(math) => {
                    self.write_text(&math)?;
                }
                Event::FootnoteReference(label) => {
                    self.writer.write_all(b"[^")?;
                    self.write_text(&label)?;
                    self.writer.write_all(b"]")?;
                }
                Event::TaskListMarker(checked) => {
                    // pulldown-cmark's own task lists place it inside the paragraph of a
                    // loose item, past where `next_item_kind` looks.
                    if checked {
                        self.writer.write_all(
                            b"<input class=\"task-list-item-checkbox\" checked disabled type=\"checkbox\"> ",
                        )?;
                    } else {
                        self.writer.write_all(
                            b"<input class=\"task-list-item-checkbox\" type=\"checkbox\" disabled> ",
                        )?;
                    }
                }
                Event::Rule => self.writer.write_all(b"<hr>\n")?,
                Event::HardBreak => self.writer.write_all(b"<br>\n")?,
                Event::SoftBreak => self.writer.write_all(b"\n")?,
            }
        }

        Ok(self.writer)
    }

    fn write_start_tag(&mut self, tag: Tag<'_>) -> io::Result<()> {
        match tag {
            Tag::Paragraph => self.writer.write_all(b"<p>"),
            Tag::Heading {
                level,
                id,
                classes,
                attrs,
            } => {
                write!(self.writer, "<h{}", level as usize)?;
                if let Some(id) = id {
                    self.write_attr("id", &id)?;
                }
                if !classes.is_empty() {
                    let joined = classes
                        .iter()
                        .map(|class| class.as_ref())
                        .collect::<Vec<_>>()
                        .join(" ");
                    self.write_attr("class", &joined)?;
                }
                for (key, value) in attrs {
                    match value {
                        Some(value) => self.write_attr(&key, &value)?,
                        None => write!(self.writer, " {}", escape_html(&key))?,
                    }
                }
                self.writer.write_all(b">")
            }
            Tag::BlockQuote(_) => self.writer.write_all(b"<blockquote>\n"),
            Tag::List(Some(1)) => self.writer.write_all(b"<ol>\n"),
            Tag::List(Some(start)) => writeln!(self.writer, "<ol start=\"{start}\">"),
            Tag::List(None) => self.writer.write_all(b"<ul>\n"),
            Tag::Table(alignments) => {
                self.table_stack.push(TableState {
                    alignments,
                    column_index: 0,
                });
                self.writer.write_all(b"<table>\n")
            }
            Tag::TableHead => {
                self.table_head_depth += 1;
                self.reset_column();
                self.writer.write_all(b"<thead>\n<tr>")
            }
            Tag::TableRow => {
                self.reset_column();
                self.writer.write_all(b"<tr>")
            }
            Tag::TableCell => {
                let tag = self.cell_tag();
                write!(self.writer, "<{tag}")?;
                if let Some(state) = self.table_stack.last_mut() {
                    let alignment = state.alignments.get(state.column_index).copied();
                    state.column_index += 1;
                    let align = match alignment {
                        Some(Alignment::Left) => Some("left"),
                        Some(Alignment::Center) => Some("center"),
                        Some(Alignment::Right) => Some("right"),
                        Some(Alignment::None) | None => None,
                    };
                    if let Some(align) = align {
                        write!(self.writer, " align=\"{align}\"")?;
                    }
                }
                self.writer.write_all(b">")
            }
            Tag::Emphasis => self.writer.write_all(b"<em>"),
            Tag::Strong => self.writer.write_all(b"<strong>"),
            Tag::Strikethrough => self.writer.write_all(b"<del>"),
            Tag::Link {
                link_type,
                dest_url,
                title,
                ..
            } => {
                self.writer.write_all(b"<a href=\"")?;
                if matches!(link_type, LinkType::Email) && !dest_url.starts_with("mailto:") {
                    self.writer.write_all(b"mailto:")?;
                }
                self.writer.write_all(escape_html(&dest_url).as_bytes())?;
                self.writer.write_all(b"\"")?;
                if !title.is_empty() {
                    self.write_attr("title", &title)?;
                }
                self.writer.write_all(b">")
            }
            // Raw HTML blocks, footnotes, definition lists and metadata are
            // either disabled or carry their markup in the event text.
            _ => Ok(()),
        }
    }

    fn write_end_tag(&mut self, end: TagEnd) -> io::Result<()> {
        match end {
            TagEnd::Paragraph => self.writer.write_all(b"</p>\n"),
            TagEnd::Heading(level) => writeln!(self.writer, "</h{}>", level as usize),
            TagEnd::BlockQuote(_) => self.writer.write_all(b"</blockquote>\n"),
            TagEnd::List(true) => self.writer.write_all(b"</ol>\n"),
            TagEnd::List(false) => self.writer.write_all(b"</ul>\n"),
            TagEnd::Item => self.writer.write_all(b"</li>\n"),
            TagEnd::Table => {
                self.table_stack.pop();
                self.writer.write_all(b"</tbody>\n</table>\n")
            }
            TagEnd::TableHead => {
                self.table_head_depth = self.table_head_depth.saturating_sub(1);
                self.writer.write_all(b"</tr>\n</thead>\n<tbody>\n")
            }
            TagEnd::TableRow => self.writer.write_all(b"</tr>\n"),
            TagEnd::TableCell => {
                let tag = self.cell_tag();
                write!(self.writer, "</{tag}>")
            }
            TagEnd::Emphasis => self.writer.write_all(b"</em>"),
            TagEnd::Strong => self.writer.write_all(b"</strong>"),
            TagEnd::Strikethrough => self.writer.write_all(b"</del>"),
            TagEnd::Link => self.writer.write_all(b"</a>"),
            _ => Ok(()),
        }
    }

    fn cell_tag(&self) -> &'static str {
        if self.table_head_depth > 0 { "th" } else { "td" }
    }

    fn reset_column(&mut self) {
        if let Some(state) = self.table_stack.last_mut() {
            state.column_index = 0;
        }
    }

    fn write_text(&mut self, text: &str) -> io::Result<()> {
        self.writer.write_all(escape_html(text).as_bytes())
    }

    fn write_attr(&mut self, key: &str, value: &str) -> io::Result<()> {
        write!(
            self.writer,
            " {}=\"{}\"",
            escape_html(key),
            escape_html(value)
        )
    }

    fn start_code_block(&mut self, language: Option<String>) -> io::Result<()> {
        match &language {
            Some(lang) => write!(
                self.writer,
                "<pre><code class=\"language-{}\">",
                escape_html(lang)
            )?,
            None => self.writer.write_all(b"<pre><code>")?,
        }
        self.code_block = Some(CodeBlockState {
            language,
            source: String::new(),
        });
        Ok(())
    }

    fn finish_code_block(&mut self) -> io::Result<()> {
        let Some(block) = self.code_block.take() else {
            return Ok(());
        };

        if self.highlight_code {
            match highlight(&block.source, block.language.as_deref()) {
                Ok(html) => self.writer.write_all(html.as_bytes())?,
                Err(err) => {
                    log::warn!(target: highlight::LOG_TARGET, "code block emitted as plain text: {err}");
                    self.write_text(&block.source)?;
                }
            }
        } else {
            self.write_text(&block.source)?;
        }

        self.writer.write_all(b"</code></pre>\n")
    }

    fn handle_code_text(&mut self, event: &Event<'_>) -> bool {
        let Some(block) = self.code_block.as_mut() else {
            return false;
        };
        match event {
            Event::Text(text) => {
                block.source.push_str(text);
                true
            }
            _ => false,
        }
    }

    fn finish_image(&mut self) -> io::Result<()> {
        let Some(image) = self.image_stack.pop() else {
            return Ok(());
        };

        self.writer.write_all(b"<img src=\"")?;
        self.writer
            .write_all(escape_html(&image.dest_url).as_bytes())?;
        self.writer.write_all(b"\" alt=\"")?;
        self.writer.write_all(escape_html(&image.alt).as_bytes())?;
        self.writer.write_all(b"\"")?;
        if !image.title.is_empty() {
            self.write_attr("title", &image.title)?;
        }
        self.writer.write_all(b">")
    }

    /// Collects alt text while inside an image; inline markup in the alt is
    /// flattened to its text.
    fn handle_image_text(&mut self, event: &Event<'_>) -> bool {
        let Some(current) = self.image_stack.last_mut() else {
            return false;
        };
        match event {
            Event::Text(text) | Event::Code(text) => current.alt.push_str(text),
            Event::SoftBreak | Event::HardBreak => current.alt.push(' '),
            Event::Start(Tag::Image { .. }) | Event::End(TagEnd::Image) => return false,
            _ => {}
        }
        true
    }
}

/// Consumes the task marker that follows an item start, if any.
fn next_item_kind<'a, I>(events: &mut Peekable<I>) -> ListItemKind
where
    I: Iterator<Item = Event<'a>>,
{
    match events.next_if(|event| matches!(event, Event::TaskListMarker(_))) {
        Some(Event::TaskListMarker(checked)) => ListItemKind::Task { checked },
        _ => ListItemKind::Plain,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task_list::TaskListItems;
    use pretty_assertions::assert_eq;
    use pulldown_cmark::{Options, Parser, TextMergeStream};

    fn render(input: &str) -> String {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        let events = TaskListItems::new(TextMergeStream::new(Parser::new_ext(input, options)));
        let buffer = HtmlRenderer::new(Vec::new())
            .with_highlighting(false)
            .render(events)
            .expect("rendering into a Vec cannot fail");
        String::from_utf8(buffer).expect("renderer writes UTF-8")
    }

    #[test]
    fn renders_headings_and_paragraphs() {
        assert_eq!(
            render("# Title\n\nSome *soft* text\nwith **bold**."),
            "<h1>Title</h1>\n<p>Some <em>soft</em> text\nwith <strong>bold</strong>.</p>\n"
        );
    }

    #[test]
    fn single_newline_is_not_a_break() {
        assert!(!render("one\ntwo").contains("<br>"));
        assert!(render("one  \ntwo").contains("<br>"));
    }

    #[test]
    fn punctuation_passes_through() {
        assert_eq!(
            render("\"quoted\" -- it's"),
            "<p>&quot;quoted&quot; -- it&#39;s</p>\n"
        );
    }

    #[test]
    fn renders_task_items() {
        assert_eq!(
            render("- [ ] a\n- [x] b\n- c\n"),
            "<ul>\n\
             <li class=\"task-list-li\"><input class=\"task-list-item-checkbox\" type=\"checkbox\" disabled> a</li>\n\
             <li class=\"task-list-li\"><input class=\"task-list-item-checkbox\" checked disabled type=\"checkbox\"> b</li>\n\
             <li>c</li>\n\
             </ul>\n"
        );
    }

    #[test]
    fn task_marker_keeps_inline_rendering_of_the_rest() {
        assert_eq!(
            render("- [x] **done** `now`"),
            "<ul>\n<li class=\"task-list-li\"><input class=\"task-list-item-checkbox\" checked disabled type=\"checkbox\"> <strong>done</strong> <code>now</code></li>\n</ul>\n"
        );
    }

    #[test]
    fn loose_task_items_render_as_plain_items() {
        assert_eq!(
            render("- [ ] a\n\n- [x] b\n"),
            "<ul>\n<li><p>[ ] a</p>\n</li>\n<li><p>[x] b</p>\n</li>\n</ul>\n"
        );
    }

    #[test]
    fn parser_task_markers_inside_a_paragraph() {
        // pulldown-cmark's own task lists put the marker after Start(Paragraph)
        // in loose items.
        let parser = Parser::new_ext("- [ ] a\n\n- [x] b\n", Options::ENABLE_TASKLISTS);
        let buffer = HtmlRenderer::new(Vec::new())
            .render(parser)
            .expect("rendering into a Vec cannot fail");
        let html = String::from_utf8(buffer).expect("renderer writes UTF-8");

        assert!(
            html.contains("<li><p><input class=\"task-list-item-checkbox\" type=\"checkbox\" disabled> "),
            "got: {html}"
        );
        assert!(
            html.contains("<li><p><input class=\"task-list-item-checkbox\" checked disabled type=\"checkbox\"> "),
            "got: {html}"
        );
    }

    #[test]
    fn ordered_lists_keep_their_start() {
        assert_eq!(
            render("3. three\n4. four"),
            "<ol start=\"3\">\n<li>three</li>\n<li>four</li>\n</ol>\n"
        );
    }

    #[test]
    fn renders_tables_with_alignment() {
        let html = render("| a | b |\n|:--|--:|\n| 1 | 2 |\n");
        assert_eq!(
            html,
            "<table>\n<thead>\n<tr><th align=\"left\">a</th><th align=\"right\">b</th></tr>\n</thead>\n<tbody>\n<tr><td align=\"left\">1</td><td align=\"right\">2</td></tr>\n</tbody>\n</table>\n"
        );
    }

    #[test]
    fn renders_links_images_and_autolinks() {
        let html = render("[x](https://example.com \"t\") ![alt *text*](/a.png) <me@example.com>");
        assert!(html.contains("<a href=\"https://example.com\" title=\"t\">x</a>"));
        assert!(html.contains("<img src=\"/a.png\" alt=\"alt text\">"));
        assert!(html.contains("<a href=\"mailto:me@example.com\">me@example.com</a>"));
    }

    #[test]
    fn renders_strikethrough_and_rules() {
        assert_eq!(render("~~gone~~\n\n---"), "<p><del>gone</del></p>\n<hr>\n");
    }

    #[test]
    fn code_blocks_are_escaped_without_highlighting() {
        assert_eq!(
            render("```html\n<b>&</b>\n```"),
            "<pre><code class=\"language-html\">&lt;b&gt;&amp;&lt;/b&gt;\n</code></pre>\n"
        );
    }

    #[test]
    fn highlighted_code_blocks_use_classed_spans() {
        let parser = Parser::new("```rust\nlet x = 1;\n```");
        let events = TaskListItems::new(TextMergeStream::new(parser));
        let buffer = HtmlRenderer::new(Vec::new())
            .render(events)
            .expect("rendering into a Vec cannot fail");
        let html = String::from_utf8(buffer).expect("renderer writes UTF-8");

        assert!(html.starts_with("<pre><code class=\"language-rust\"><span class=\"hl-"));
        assert!(html.ends_with("</code></pre>\n"));
    }

    #[test]
    fn raw_html_passes_through_unfiltered() {
        assert!(render("<script>x</script>").contains("<script>x</script>"));
    }
}
