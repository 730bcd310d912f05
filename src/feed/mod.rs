//! Feed retrieval and parsing.
//!
//! - [`parser`] - RSS 2.0 text into [`FeedDocument`], built on `quick-xml`
//! - [`fetcher`] - HTTP download with retry, timeout and size limits
//!
//! # Example
//!
//! ```ignore
//! use feedview::feed::{parse_feed, Fetcher};
//!
//! let text = fetcher.fetch_text("https://example.com/rss.xml").await?;
//! let document = parse_feed(&text)?;
//! ```

mod fetcher;
mod parser;

pub use fetcher::{FetchError, Fetcher};
pub use parser::{parse_feed, FeedDocument, FeedError, FeedItem};
