//! Pages direct-upload and deployment API client.
//!
//! Async HTTP client over `reqwest`. Account endpoints authenticate with the
//! account API token; asset endpoints take the short-lived upload JWT per
//! call.

pub mod client;

pub use client::{Client, Error};
