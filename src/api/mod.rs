//! Listing providers
//!
//! - Nyaa: search results scraped from nyaa.si

pub mod nyaa;

pub use nyaa::{ListingProvider, NyaaClient, SearchError};
