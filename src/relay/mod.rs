//! Request handling logic sitting between the HTTP handlers and the
//! upstream providers.

pub mod search;
pub mod stream;

pub use search::{DEFAULT_LIMIT, SearchRelay, fingerprint};
pub use stream::StreamRelay;
