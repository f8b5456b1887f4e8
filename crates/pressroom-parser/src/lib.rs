//! Pressroom Parser Library
//!
//! Turns content bodies into safe HTML. The generator only sees the
//! [`ContentProcessor`] trait; [`MarkdownProcessor`] is the bundled
//! implementation.

pub mod embed;
pub mod markdown;

pub use embed::{Embed, Provider};
pub use markdown::MarkdownProcessor;
use pressroom_core::Content;
use thiserror::Error;

/// Content processing errors.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The body could not be converted.
    #[error("failed to process content {id}: {message}")]
    Body { id: i64, message: String },
}

/// Result type for processing operations.
pub type Result<T> = std::result::Result<T, ProcessError>;

/// Converts a content body into HTML that is safe to embed in a page.
pub trait ContentProcessor {
    /// Render the body of `content` to HTML.
    fn process(&self, content: &Content) -> Result<String>;
}

impl ContentProcessor for MarkdownProcessor {
    fn process(&self, content: &Content) -> Result<String> {
        Ok(self.render(&content.body))
    }
}
