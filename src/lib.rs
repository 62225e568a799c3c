//! marksearch - semantic search sidecar for a remote bookmark service
//!
//! Keeps a Qdrant collection synchronized with a bookmark collection and
//! serves similarity search over it via a small HTTP API.

pub mod bookmarks;
pub mod config;
pub mod embed;
pub mod error;
pub mod normalize;
pub mod server;
pub mod store;
pub mod sync;
