//! Utility modules shared by the resolver and the question-answering adapter.
//!
//! - [`HttpClient`]: reqwest client with configured timeouts and user agent
//! - [`MemoCache`]: unbounded in-process memo cache keyed by [`cache_key`] digests
//! - [`wrap_text`]: unicode-aware word wrapping for terminal output

mod cache;
mod display;
mod http;

pub use cache::{cache_key, CacheResult, MemoCache};
pub use display::{terminal_width, wrap_text};
pub use http::HttpClient;
