//! XML encoding/decoding for DSMLv2.
//!
//! This module implements the DSMLv2 request wire format over an in-memory
//! element tree.

pub mod batch;
pub mod filter;
pub mod primitives;
pub mod request;
pub mod xml;

pub use batch::{
    DecodeOptions, EncodeOptions, decode_batch, decode_batch_str, decode_batch_str_with_options,
    decode_batch_with_options, encode_batch, encode_batch_to_string,
};
pub use filter::{decode_filter, encode_filter};
pub use primitives::{
    Cursor, DSML_NAMESPACE, XML_SCHEMA_INSTANCE_NAMESPACE, XML_SCHEMA_NAMESPACE, base64_decode,
    base64_encode, needs_base64,
};
pub use request::{
    EncodeContext, decode_request, decode_request_with_options, emit_request, encode_request,
};
pub use xml::{Element, Node};
