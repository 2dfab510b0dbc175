//! Origin-restricted HTTP relay for video search and audio stream resolution.
//!
//! Search results are cached for a fixed TTL under a fingerprint of the
//! request parameters; stream info is resolved fresh on every call.

pub mod cache;
pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod relay;
pub mod server;
pub mod upstream;
