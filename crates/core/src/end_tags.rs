//! Drops end tags of elements the policy does not permit.
//!
//! lol_html only reports end tags that close an element it saw open, so a
//! lone `</iframe>` or `</foo>` reaches the output untouched. This filter
//! sits on the rewriter's output, where text has already been escaped and
//! every remaining `<` starts markup.

use crate::policy::PolicyTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scan {
    Text,
    /// Saw `<`, not yet known whether it opens an end tag.
    Open,
    /// Inside `</name`, collecting the name.
    EndTagName,
    /// Inside any other tag up to its closing `>`.
    Tag {
        keep: bool,
        quote: Option<u8>,
        after_equals: bool,
    },
}

pub(crate) struct EndTagFilter {
    policy: &'static PolicyTable,
    scan: Scan,
    name: Vec<u8>,
}

impl EndTagFilter {
    pub(crate) fn new(policy: &'static PolicyTable) -> Self {
        Self {
            policy,
            scan: Scan::Text,
            name: Vec::new(),
        }
    }

    /// Filters one output chunk into `out`. State carries over, so tags may
    /// be split across chunks.
    pub(crate) fn feed(&mut self, chunk: &[u8], out: &mut Vec<u8>) {
        let mut index = 0;

        while let Some(&byte) = chunk.get(index) {
            match self.scan {
                Scan::Text => {
                    if byte == b'<' {
                        self.scan = Scan::Open;
                    } else {
                        out.push(byte);
                    }
                }
                Scan::Open => {
                    if byte == b'/' {
                        self.name.clear();
                        self.scan = Scan::EndTagName;
                    } else {
                        out.push(b'<');
                        self.scan = Scan::Tag {
                            keep: true,
                            quote: None,
                            after_equals: false,
                        };
                        // Reprocess as the first byte of the tag.
                        continue;
                    }
                }
                Scan::EndTagName => {
                    if self.name.is_empty() && !byte.is_ascii_alphabetic() {
                        out.extend_from_slice(b"</");
                        self.scan = Scan::Tag {
                            keep: true,
                            quote: None,
                            after_equals: false,
                        };
                        continue;
                    }
                    if matches!(byte, b'>' | b'/') || byte.is_ascii_whitespace() {
                        let keep = self.end_tag_allowed();
                        if keep {
                            out.extend_from_slice(b"</");
                            out.extend_from_slice(&self.name);
                        } else {
                            log::trace!(
                                target: "marksafe::sanitize",
                                "dropped stray end tag </{}>",
                                String::from_utf8_lossy(&self.name)
                            );
                        }
                        self.scan = Scan::Tag {
                            keep,
                            quote: None,
                            after_equals: false,
                        };
                        continue;
                    }
                    self.name.push(byte);
                }
                Scan::Tag {
                    keep,
                    quote,
                    after_equals,
                } => {
                    if keep {
                        out.push(byte);
                    }
                    self.scan = match (quote, byte) {
                        (Some(open), _) if byte == open => Scan::Tag {
                            keep,
                            quote: None,
                            after_equals: false,
                        },
                        (Some(_), _) => self.scan,
                        (None, b'>') => Scan::Text,
                        (None, b'"' | b'\'') if after_equals => Scan::Tag {
                            keep,
                            quote: Some(byte),
                            after_equals: false,
                        },
                        (None, b'=') => Scan::Tag {
                            keep,
                            quote: None,
                            after_equals: true,
                        },
                        (None, _) if byte.is_ascii_whitespace() => self.scan,
                        (None, _) => Scan::Tag {
                            keep,
                            quote: None,
                            after_equals: false,
                        },
                    };
                }
            }
            index += 1;
        }
    }

    /// Ends the stream. An end tag cut off by the end of input is dropped.
    pub(crate) fn finish(&mut self, out: &mut Vec<u8>) {
        if self.scan == Scan::Open {
            out.extend_from_slice(b"&lt;");
        }
        self.scan = Scan::Text;
        self.name.clear();
    }

    fn end_tag_allowed(&self) -> bool {
        std::str::from_utf8(&self.name)
            .map(|name| self.policy.is_tag_allowed(name))
            .unwrap_or(false)
    }
}
