#![deny(missing_docs)]
//! Node.js bindings that surface the marksafe pipeline.

use napi_derive::napi;

/// Returns the version string reported by the core crate.
#[napi]
pub fn version() -> String {
    marksafe_core::version().to_string()
}

/// Converts Markdown into HTML, sanitized unless `sanitize` is `false`.
#[napi(js_name = "markdownToHtml")]
pub fn markdown_to_html(source: String, sanitize: Option<bool>) -> String {
    marksafe_core::markdown_to_html(&source, sanitize.unwrap_or(true))
}

/// Runs only the sanitizer over an HTML fragment.
#[napi(js_name = "sanitizeHtml")]
pub fn sanitize_html(html: String) -> String {
    marksafe_core::sanitize(&html)
}
