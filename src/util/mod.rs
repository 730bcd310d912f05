//! Utility functions shared by the controller and the CLI.
//!
//! - **URL validation**: scheme checks and SSRF protection for submitted feeds

mod url_validator;

pub use url_validator::{validate_feed_url, UrlValidationError};
