//! Upstream poll-API adapter: HTTP client and payload normalization.

mod client;
mod dto;

pub use client::PollClient;
pub use dto::{RawEvent, RawEventPage};
