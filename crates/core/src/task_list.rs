//! Task-list detection for list items.
//!
//! A tight item whose text starts with `[ ]` or `[x]` is a task item. The
//! marker is cut out of the text stream and replaced by a
//! [`Event::TaskListMarker`] placed right after `Start(Item)`, so the renderer
//! can pick the item's markup before it writes the opening `<li>`.
//!
//! Items of a loose list start with a paragraph, not text, and stay plain:
//! `- [ ] a` followed by a blank line renders `<li><p>[ ] a</p></li>`.

use std::collections::VecDeque;

use pulldown_cmark::{CowStr, Event, Tag};

/// How a list item is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListItemKind {
    Plain,
    Task { checked: bool },
}

impl ListItemKind {
    /// Classifies an item by its leading text, returning the text that
    /// remains visible once the marker is removed.
    ///
    /// Whitespace before the marker and after it is consumed. Only a lowercase
    /// `x` checks the box.
    pub fn detect(text: &str) -> (ListItemKind, &str) {
        let trimmed = text.trim_start();
        let (checked, rest) = if let Some(rest) = trimmed.strip_prefix("[ ]") {
            (false, rest)
        } else if let Some(rest) = trimmed.strip_prefix("[x]") {
            (true, rest)
        } else {
            return (ListItemKind::Plain, text);
        };

        (ListItemKind::Task { checked }, rest.trim_start())
    }

    /// Markup that opens the item, up to where its content begins.
    pub fn opening_markup(self) -> &'static str {
        match self {
            ListItemKind::Plain => "<li>",
            ListItemKind::Task { checked: false } => {
                "<li class=\"task-list-li\"><input class=\"task-list-item-checkbox\" type=\"checkbox\" disabled> "
            }
            ListItemKind::Task { checked: true } => {
                "<li class=\"task-list-li\"><input class=\"task-list-item-checkbox\" checked disabled type=\"checkbox\"> "
            }
        }
    }
}

/// Iterator adapter that rewrites task-list items in a Markdown event stream.
///
/// Expects adjacent text events to be merged already (see
/// [`pulldown_cmark::TextMergeStream`]), otherwise a marker split across two
/// text events would go unnoticed.
pub struct TaskListItems<'a, I> {
    inner: I,
    pending: VecDeque<Event<'a>>,
}

impl<'a, I> TaskListItems<'a, I>
where
    I: Iterator<Item = Event<'a>>,
{
    pub fn new(inner: I) -> Self {
        Self {
            inner,
            pending: VecDeque::new(),
        }
    }

    fn classify_item(&mut self) {
        match self.inner.next() {
            Some(Event::Text(text)) => {
                let (kind, rest) = ListItemKind::detect(&text);
                match kind {
                    ListItemKind::Task { checked } => {
                        let rest = rest.to_owned();
                        self.pending.push_back(Event::TaskListMarker(checked));
                        if !rest.is_empty() {
                            self.pending.push_back(Event::Text(CowStr::from(rest)));
                        }
                    }
                    ListItemKind::Plain => self.pending.push_back(Event::Text(text)),
                }
            }
            Some(other) => self.pending.push_back(other),
            None => {}
        }
    }
}

impl<'a, I> Iterator for TaskListItems<'a, I>
where
    I: Iterator<Item = Event<'a>>,
{
    type Item = Event<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(event) = self.pending.pop_front() {
            return Some(event);
        }

        let event = self.inner.next()?;
        if matches!(event, Event::Start(Tag::Item)) {
            self.classify_item();
        }
        Some(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulldown_cmark::{Options, Parser, TextMergeStream};

    fn events(input: &str) -> Vec<Event<'_>> {
        TaskListItems::new(TextMergeStream::new(Parser::new_ext(input, Options::empty())))
            .collect()
    }

    #[test]
    fn detects_unchecked_marker() {
        assert_eq!(
            ListItemKind::detect("[ ] buy milk"),
            (ListItemKind::Task { checked: false }, "buy milk")
        );
    }

    #[test]
    fn detects_checked_marker_with_surrounding_whitespace() {
        assert_eq!(
            ListItemKind::detect("  [x]    done"),
            (ListItemKind::Task { checked: true }, "done")
        );
    }

    #[test]
    fn uppercase_x_is_plain_text() {
        assert_eq!(
            ListItemKind::detect("[X] shout"),
            (ListItemKind::Plain, "[X] shout")
        );
    }

    #[test]
    fn marker_must_lead_the_item() {
        assert_eq!(
            ListItemKind::detect("see [x] later"),
            (ListItemKind::Plain, "see [x] later")
        );
        assert_eq!(
            ListItemKind::detect("[  ] wide"),
            (ListItemKind::Plain, "[  ] wide")
        );
    }

    #[test]
    fn marker_follows_item_start() {
        let events = events("- [x] b");
        let position = events
            .iter()
            .position(|event| matches!(event, Event::Start(Tag::Item)))
            .expect("list item start");

        assert_eq!(events[position + 1], Event::TaskListMarker(true));
        assert_eq!(events[position + 2], Event::Text(CowStr::from("b")));
    }

    #[test]
    fn plain_items_are_untouched() {
        let events = events("- c");
        assert!(!events
            .iter()
            .any(|event| matches!(event, Event::TaskListMarker(_))));
        assert!(events.contains(&Event::Text(CowStr::from("c"))));
    }

    #[test]
    fn loose_items_stay_plain() {
        let events = events("- [ ] a\n\n- [x] b\n");
        assert!(!events
            .iter()
            .any(|event| matches!(event, Event::TaskListMarker(_))));
        assert!(events.contains(&Event::Text(CowStr::from("[ ] a"))));
    }

    #[test]
    fn nested_items_are_classified_independently() {
        let events = events("- [ ] outer\n  - [x] inner\n");
        let markers: Vec<_> = events
            .iter()
            .filter_map(|event| match event {
                Event::TaskListMarker(checked) => Some(*checked),
                _ => None,
            })
            .collect();
        assert_eq!(markers, vec![false, true]);
    }
}
