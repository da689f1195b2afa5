//! Whitelist of HTML tags and the attributes each of them may carry.
//!
//! The table is the sanitizer's only source of truth: a tag that is not listed
//! is unwrapped, an attribute that is not listed for its tag is dropped. No
//! entry ever lists an `on*` event handler, which is what keeps script out of
//! the output.

use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

/// Attributes shared by the block-level structural tags.
pub const COMMON_ATTRIBUTES: &[&str] = &[
    "style",
    "title",
    "accesskey",
    "hidden",
    "translate",
    "draggable",
    "dropzone",
    "dir",
    "contenteditable",
    "contextmenu",
    "class",
];

/// Attributes whose value is a URL and therefore must pass the scheme check.
pub const URL_ATTRIBUTES: &[&str] = &["href", "src", "cite"];

/// Permitted attribute names for a single tag.
pub type AttributeSet = BTreeSet<&'static str>;

static GLOBAL: LazyLock<PolicyTable> = LazyLock::new(PolicyTable::standard);

/// Mapping from lowercase tag name to its permitted attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyTable {
    tags: HashMap<&'static str, AttributeSet>,
}

impl PolicyTable {
    /// The process-wide table, built on first use and never mutated.
    pub fn global() -> &'static PolicyTable {
        &GLOBAL
    }

    /// Returns the attributes permitted on `tag`.
    ///
    /// A permitted tag without attributes yields an empty set; `None` means the
    /// tag itself is not permitted.
    pub fn attributes_allowed(&self, tag: &str) -> Option<&AttributeSet> {
        if tag.bytes().any(|b| b.is_ascii_uppercase()) {
            self.tags.get(tag.to_ascii_lowercase().as_str())
        } else {
            self.tags.get(tag)
        }
    }

    pub fn is_tag_allowed(&self, tag: &str) -> bool {
        self.attributes_allowed(tag).is_some()
    }

    pub fn is_attribute_allowed(&self, tag: &str, attribute: &str) -> bool {
        self.attributes_allowed(tag).is_some_and(|allowed| {
            allowed
                .iter()
                .any(|name| name.eq_ignore_ascii_case(attribute))
        })
    }

    /// Number of permitted tags.
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    fn standard() -> Self {
        let mut builder = PolicyBuilder::default();

        builder.tag(
            "a",
            &[COMMON_ATTRIBUTES, &["target", "href", "title", "align", "width", "height"]],
        );
        builder.tag("abbr", &[&["title"]]);
        builder.tag("address", &[&["width", "height"]]);
        builder.tag("area", &[&["shape", "coords", "href", "alt"]]);
        builder.tag("article", &[&["width", "height"]]);
        builder.tag("aside", &[&["width", "height"]]);
        builder.tag("audio", &[&["autoplay", "controls", "loop", "preload", "src"]]);
        builder.tag("bdi", &[&["dir"]]);
        builder.tag("bdo", &[&["dir"]]);
        builder.tag("blockquote", &[&["cite"]]);
        builder.tag("col", &[&["align", "valign", "span", "width"]]);
        builder.tag("colgroup", &[&["align", "valign", "span", "width"]]);
        builder.tag("del", &[&["datetime"]]);
        builder.tag("details", &[&["open"]]);
        builder.tag("font", &[&["color", "size", "face"]]);
        builder.tag("img", &[&["src", "alt", "title", "width", "height"]]);
        builder.tag("ins", &[&["datetime"]]);
        builder.tag("span", &[&["width", "height"]]);
        builder.tag("table", &[&["width", "border", "align", "valign"]]);
        builder.tag("tbody", &[&["align", "valign"]]);
        builder.tag("td", &[&["width", "rowspan", "colspan", "align", "valign"]]);
        builder.tag("tfoot", &[&["align", "valign"]]);
        builder.tag("th", &[&["width", "rowspan", "colspan", "align", "valign"]]);
        builder.tag("thead", &[&["align", "valign"]]);
        builder.tag("tr", &[&["rowspan", "align", "valign"]]);
        builder.tag(
            "video",
            &[&["autoplay", "controls", "loop", "preload", "src", "height", "width"]],
        );
        // name/value/src stay off so rendered checkboxes cannot post forms.
        builder.tag("input", &[&["class", "checked", "disabled", "type"]]);

        for tag in [
            "div", "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "li", "nav", "ol", "p",
            "section", "ul",
        ] {
            builder.tag(tag, &[COMMON_ATTRIBUTES, &["align"]]);
        }

        for tag in [
            "b", "big", "br", "caption", "center", "cite", "code", "dd", "dl", "dt", "em", "hr",
            "i", "mark", "pre", "s", "small", "sub", "sup", "strong", "tt", "u",
        ] {
            builder.tag(tag, &[]);
        }

        builder.build()
    }
}

#[derive(Default)]
struct PolicyBuilder {
    tags: HashMap<&'static str, AttributeSet>,
}

impl PolicyBuilder {
    fn tag(&mut self, name: &'static str, groups: &[&[&'static str]]) {
        let set = self.tags.entry(name).or_default();
        for group in groups {
            set.extend(group.iter().copied());
        }
    }

    fn build(self) -> PolicyTable {
        PolicyTable { tags: self.tags }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_tags_carry_common_attributes() {
        let policy = PolicyTable::global();
        for tag in ["div", "h1", "h6", "li", "ul", "ol", "p", "section", "nav"] {
            let allowed = policy.attributes_allowed(tag).expect("tag should be permitted");
            for attribute in COMMON_ATTRIBUTES {
                assert!(allowed.contains(attribute), "{tag} is missing {attribute}");
            }
            assert!(allowed.contains("align"));
        }
    }

    #[test]
    fn inline_tags_allow_no_attributes() {
        let policy = PolicyTable::global();
        for tag in ["b", "i", "em", "strong", "code", "pre", "br", "hr"] {
            let allowed = policy.attributes_allowed(tag).expect("tag should be permitted");
            assert!(allowed.is_empty(), "{tag} should allow nothing");
        }
    }

    #[test]
    fn anchor_title_is_not_duplicated() {
        let allowed = PolicyTable::global()
            .attributes_allowed("a")
            .expect("anchors are permitted");
        assert_eq!(allowed.iter().filter(|name| **name == "title").count(), 1);
        assert!(allowed.contains("href"));
        assert!(allowed.contains("target"));
    }

    #[test]
    fn input_cannot_hijack_forms() {
        let policy = PolicyTable::global();
        let allowed = policy.attributes_allowed("input").expect("input is permitted");
        assert_eq!(
            allowed.iter().copied().collect::<Vec<_>>(),
            vec!["checked", "class", "disabled", "type"]
        );
        for attribute in ["name", "value", "src", "formaction"] {
            assert!(!policy.is_attribute_allowed("input", attribute));
        }
    }

    #[test]
    fn no_tag_allows_event_handlers() {
        for allowed in PolicyTable::global().tags.values() {
            assert!(allowed.iter().all(|name| !name.starts_with("on")));
        }
    }

    #[test]
    fn unknown_tags_are_absent() {
        let policy = PolicyTable::global();
        for tag in ["script", "style", "iframe", "object", "form", "foo"] {
            assert!(!policy.is_tag_allowed(tag), "{tag} must not be permitted");
            assert!(policy.attributes_allowed(tag).is_none());
        }
    }

    #[test]
    fn lookups_ignore_ascii_case() {
        let policy = PolicyTable::global();
        assert!(policy.is_tag_allowed("DIV"));
        assert!(policy.is_attribute_allowed("Img", "SRC"));
        assert!(!policy.is_attribute_allowed("IMG", "onerror"));
    }

    #[test]
    fn table_has_every_listed_tag() {
        assert_eq!(PolicyTable::global().len(), 64);
    }
}
