//! Bounds applied while decoding untrusted DSMLv2 documents.
//!
//! These are the defaults for [`DecodeOptions`](crate::codec::DecodeOptions).

/// Maximum element nesting depth of a parsed document.
pub const MAX_ELEMENT_DEPTH: usize = 128;

/// Maximum number of requests in one `batchRequest`.
pub const MAX_REQUESTS_PER_BATCH: usize = 100_000;

/// Maximum number of `<value>` children under one attribute or modification.
pub const MAX_VALUES_PER_ATTRIBUTE: usize = 65_536;

/// Maximum nesting of `and`/`or`/`not` in a search filter.
pub const MAX_FILTER_DEPTH: usize = 64;
