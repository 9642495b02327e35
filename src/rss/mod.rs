//! RSS feed processing.
//!
//! This module handles the fetching, decoding and parsing of RSS, Atom and JSON feeds.

mod client;
mod fetcher;
mod parser;
mod types;
mod util;

pub use self::types::*;

pub use self::client::{create_http_client, fetch_with_fallback, BROWSER_USER_AGENT, FEED_USER_AGENT};
pub use self::fetcher::{fetch_and_parse, fetch_feed};
pub use self::parser::parse_feed;
pub use self::util::{cleanup_xml, is_valid_url, truncate_chars};
