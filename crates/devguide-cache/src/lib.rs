//! devguide Cache
//!
//! Serves each document in one of several byte encodings (plain text,
//! gzip text, gzip serialized envelope). Encodings are derived data: they
//! live in memory, optionally in an on-disk bundle written by the
//! scheduled rebuild job, and are regenerated whenever they are missing or
//! stale.

pub mod codec;
pub mod manager;
pub mod manifest;

pub use codec::{decode, Encoded};
pub use manager::CacheManager;
pub use manifest::{CacheInfo, Manifest, ManifestEntry};
