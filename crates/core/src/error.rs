use std::io;

use lol_html::errors::RewritingError;
use thiserror::Error;

/// Failures of the streaming entry point.
///
/// The string entry points never return these: they recover by emitting
/// inert, escaped text instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to write html: {0}")]
    Io(#[from] io::Error),
    #[error("html sanitizer failed: {0}")]
    Sanitize(#[from] RewritingError),
}
