//! Query text normalization and per-query settings for PostgreSQL.

pub mod fingerprint;
pub mod normalize;
pub mod output;
pub mod scanner;
pub mod settings;

pub use fingerprint::{query_id, QueryId};
pub use normalize::{normalize, NormalizeOptions, Normalized, Normalizer};
