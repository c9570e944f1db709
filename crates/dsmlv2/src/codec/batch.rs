//! Batch envelope encoding/decoding for DSMLv2.
//!
//! A document is a single `<batchRequest>` root in the DSMLv2 namespace
//! whose children are requests, in order.

use tracing::debug;

use crate::codec::primitives::{Cursor, DSML_NAMESPACE};
use crate::codec::request::{EncodeContext, REQUEST_ID, decode_request_at, emit_request};
use crate::codec::xml::{Element, split_qname};
use crate::error::{DecodeError, EncodeError};
use crate::limits::{MAX_ELEMENT_DEPTH, MAX_REQUESTS_PER_BATCH, MAX_VALUES_PER_ATTRIBUTE};
use crate::model::{BatchRequest, OnError, Processing, ResponseOrder};

const BATCH_REQUEST: &str = "batchRequest";

// =============================================================================
// OPTIONS
// =============================================================================

/// Options for serializing a document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Indent nested elements by this many spaces. `None` writes everything
    /// on one line.
    ///
    /// Whitespace is only inserted between elements; `<value>` text is
    /// never altered.
    pub indent: Option<usize>,
    /// Write an `<?xml version="1.0" encoding="UTF-8"?>` declaration.
    pub xml_declaration: bool,
}

impl EncodeOptions {
    /// Creates compact options with no declaration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates options for human-readable output: 2-space indent and an XML
    /// declaration.
    pub fn pretty() -> Self {
        Self {
            indent: Some(2),
            xml_declaration: true,
        }
    }
}

/// Bounds applied while decoding. See [`crate::limits`] for the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Maximum element nesting depth.
    pub max_depth: usize,
    /// Maximum number of requests in one batch.
    pub max_requests: usize,
    /// Maximum number of values under one attribute or modification.
    pub max_values: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            max_depth: MAX_ELEMENT_DEPTH,
            max_requests: MAX_REQUESTS_PER_BATCH,
            max_values: MAX_VALUES_PER_ATTRIBUTE,
        }
    }
}

// =============================================================================
// ENCODING
// =============================================================================

/// Encodes a batch as a `<batchRequest>` element tree.
///
/// The `xsd` and `xsi` namespaces are declared on the root only when some
/// value in the document was base64-framed.
pub fn encode_batch(batch: &BatchRequest) -> Result<Element, EncodeError> {
    debug!(requests = batch.requests.len(), "encoding batchRequest");

    let mut root = Element::new(BATCH_REQUEST);
    root.add_namespace(None, DSML_NAMESPACE);
    if let Some(id) = &batch.request_id {
        root.set_attribute(REQUEST_ID, id);
    }
    if let Some(processing) = batch.processing {
        root.set_attribute("processing", processing.as_str());
    }
    if let Some(order) = batch.response_order {
        root.set_attribute("responseOrder", order.as_str());
    }
    if let Some(on_error) = batch.on_error {
        root.set_attribute("onError", on_error.as_str());
    }

    let mut ctx = EncodeContext::new();
    for request in &batch.requests {
        emit_request(&mut root, request, &mut ctx)?;
    }
    ctx.finish(&mut root);

    Ok(root)
}

/// Encodes a batch and serializes it.
pub fn encode_batch_to_string(batch: &BatchRequest, options: &EncodeOptions) -> Result<String, EncodeError> {
    encode_batch(batch)?.to_xml(options)
}

// =============================================================================
// DECODING
// =============================================================================

/// Decodes a `<batchRequest>` element tree.
pub fn decode_batch(root: &Element) -> Result<BatchRequest, DecodeError> {
    decode_batch_with_options(root, DecodeOptions::default())
}

/// Decodes a `<batchRequest>` element tree with the given options.
pub fn decode_batch_with_options(root: &Element, options: DecodeOptions) -> Result<BatchRequest, DecodeError> {
    let mut cursor = Cursor::new(options);
    cursor.within(root, None, |c| {
        if root.local_name() != BATCH_REQUEST {
            return Err(DecodeError::UnsupportedRequest {
                location: c.location(),
                element: root.name().to_string(),
            });
        }
        let prefix = split_qname(root.name()).0.unwrap_or("");
        if c.resolve(prefix) != Some(DSML_NAMESPACE) {
            debug!(element = root.name(), "batchRequest is not in the DSMLv2 namespace");
        }

        c.skip_unknown_attributes(root, &[REQUEST_ID, "processing", "responseOrder", "onError"]);
        let mut batch = BatchRequest {
            request_id: root.attribute(REQUEST_ID).map(str::to_string),
            processing: c.enum_attr(root, "processing", Processing::from_str_opt, "sequential or parallel")?,
            response_order: c.enum_attr(
                root,
                "responseOrder",
                ResponseOrder::from_str_opt,
                "sequential or unordered",
            )?,
            on_error: c.enum_attr(root, "onError", OnError::from_str_opt, "resume or exit")?,
            requests: Vec::new(),
        };

        let count = root.child_elements().count();
        c.check_limit(count, c.options().max_requests, "requests per batch")?;
        debug!(requests = count, "decoding batchRequest");

        batch.requests.reserve(count);
        for (i, child) in root.child_elements().enumerate() {
            batch.requests.push(decode_request_at(c, child, Some(i))?);
        }
        Ok(batch)
    })
}

/// Parses and decodes a DSMLv2 document.
pub fn decode_batch_str(xml: &str) -> Result<BatchRequest, DecodeError> {
    decode_batch_str_with_options(xml, DecodeOptions::default())
}

/// Parses and decodes a DSMLv2 document with the given options.
pub fn decode_batch_str_with_options(xml: &str, options: DecodeOptions) -> Result<BatchRequest, DecodeError> {
    let root = Element::parse_with_depth(xml, options.max_depth)?;
    decode_batch_with_options(&root, options)
}
