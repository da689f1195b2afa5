use pulldown_cmark::Options as CmarkOptions;
use serde::{Deserialize, Serialize};

/// Pipeline configuration. Every switch defaults to on.
///
/// Hard line breaks on single newlines, smart punctuation and footnotes are
/// not configurable: they are always off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineOptions {
    /// Run the rendered HTML through the whitelist sanitizer. Turn off only
    /// for trusted input.
    #[serde(default = "default_true")]
    pub sanitize: bool,
    #[serde(default = "default_true")]
    pub highlight_code: bool,
    #[serde(default = "default_true")]
    pub gfm_tables: bool,
    #[serde(default = "default_true")]
    pub gfm_strikethrough: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            sanitize: true,
            highlight_code: true,
            gfm_tables: true,
            gfm_strikethrough: true,
        }
    }
}

impl PipelineOptions {
    /// Defaults with sanitization switched on or off.
    pub fn with_sanitize(sanitize: bool) -> Self {
        Self {
            sanitize,
            ..Self::default()
        }
    }

    /// Maps the switches onto parser flags.
    ///
    /// | Field | pulldown-cmark flag |
    /// |-------|---------------------|
    /// | `gfm_tables` | `ENABLE_TABLES` |
    /// | `gfm_strikethrough` | `ENABLE_STRIKETHROUGH` |
    ///
    /// `ENABLE_TASKLISTS` stays off; task items are detected by
    /// [`crate::task_list`] so the marker check matches our own rules.
    pub(crate) fn cmark_options(&self) -> CmarkOptions {
        let mut cmark_options = CmarkOptions::empty();

        if self.gfm_tables {
            cmark_options.insert(CmarkOptions::ENABLE_TABLES);
        }

        if self.gfm_strikethrough {
            cmark_options.insert(CmarkOptions::ENABLE_STRIKETHROUGH);
        }

        cmark_options
    }
}

fn default_true() -> bool {
    true
}
