mod cache;
mod client;
pub mod odata;

pub use cache::{CacheEntry, ResponseCache};
pub use client::{ApiClient, ConnectionState, RequestOptions};
