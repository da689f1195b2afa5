use js_sys::Function;
use marksafe_core::PipelineOptions;
use std::io::{self, Write};
use wasm_bindgen::JsValue;
use wasm_bindgen::prelude::*;

/// Converts Markdown into an HTML `String`.
///
/// Output is sanitized unless `sanitize` is explicitly `false`.
#[wasm_bindgen(js_name = markdownToHtml)]
pub fn markdown_to_html(input: &str, sanitize: Option<bool>) -> String {
    marksafe_core::markdown_to_html(input, sanitize.unwrap_or(true))
}

/// Runs only the sanitizer over an HTML fragment.
#[wasm_bindgen(js_name = sanitizeHtml)]
pub fn sanitize_html(html: &str) -> String {
    marksafe_core::sanitize(html)
}

/// Streams HTML chunks into the provided JavaScript callback.
///
/// The callback receives each UTF-8 chunk as the sanitizer releases it, so
/// callers can forward output to a `WritableStream` or buffer it manually.
#[wasm_bindgen(js_name = streamHtml)]
pub fn stream_html(
    input: &str,
    chunk_callback: &Function,
    sanitize: Option<bool>,
) -> Result<(), JsError> {
    let options = PipelineOptions::with_sanitize(sanitize.unwrap_or(true));
    let writer = JsChunkWriter::new(chunk_callback.clone());

    let mut writer = marksafe_core::stream_html(input, &options, writer).map_err(to_js_error)?;
    writer.flush().map_err(to_js_error)?;
    Ok(())
}

/// Converts Markdown with individual pipeline switches. Omitted switches keep
/// their defaults.
#[wasm_bindgen(js_name = markdownToHtmlWith)]
pub fn markdown_to_html_with(
    input: &str,
    sanitize: Option<bool>,
    highlight_code: Option<bool>,
) -> String {
    let defaults = PipelineOptions::default();
    let options = PipelineOptions {
        sanitize: sanitize.unwrap_or(defaults.sanitize),
        highlight_code: highlight_code.unwrap_or(defaults.highlight_code),
        ..defaults
    };
    marksafe_core::markdown_to_html_with(input, &options)
}

fn to_js_error<E: ToString>(err: E) -> JsError {
    JsError::new(&err.to_string())
}

struct JsChunkWriter {
    callback: Function,
    // Trailing bytes of a character split across two writes.
    partial: Vec<u8>,
}

impl JsChunkWriter {
    fn new(callback: Function) -> Self {
        Self {
            callback,
            partial: Vec::new(),
        }
    }

    fn emit(&self, chunk: &str) -> io::Result<()> {
        if chunk.is_empty() {
            return Ok(());
        }
        self.callback
            .call1(&JsValue::UNDEFINED, &JsValue::from_str(chunk))
            .map_err(js_callback_error)?;
        Ok(())
    }
}

impl Write for JsChunkWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.partial.extend_from_slice(buf);

        let complete = match std::str::from_utf8(&self.partial) {
            Ok(_) => self.partial.len(),
            Err(err) if err.error_len().is_none() => err.valid_up_to(),
            Err(err) => return Err(io::Error::new(io::ErrorKind::InvalidData, err)),
        };

        let rest = self.partial.split_off(complete);
        let chunk = std::mem::replace(&mut self.partial, rest);
        let chunk = std::str::from_utf8(&chunk)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
        self.emit(chunk)?;

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.partial.is_empty() {
            return Ok(());
        }
        let tail = std::mem::take(&mut self.partial);
        let tail = std::str::from_utf8(&tail)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
        self.emit(tail)
    }
}

fn js_callback_error(err: JsValue) -> io::Error {
    let message = err
        .as_string()
        .or_else(|| {
            js_sys::JSON::stringify(&err)
                .ok()
                .and_then(|s| s.as_string())
        })
        .unwrap_or_else(|| "callback threw".to_string());
    io::Error::other(message)
}
