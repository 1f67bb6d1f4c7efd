//! Utility functions for common operations.
//!
//! - **Text processing**: feed text cleanup and Markdown-safe rendering helpers
//! - **URL validation**: scheme checks for configured feed endpoints

mod text;
mod url_validator;

pub use text::{
    collapse_whitespace, escape_link_target, neutralize_markdown, plain_text, strip_control_chars,
    strip_html, utf16_len,
};
pub use url_validator::{validate_url, UrlValidationError};
