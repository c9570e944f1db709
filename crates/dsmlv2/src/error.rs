//! Error types for DSMLv2 encoding/decoding and the request model.

use thiserror::Error;

/// Coarse error classification shared by every error type in this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A required field was missing, a literal was unrecognized, or a
    /// DN/RDN/base64 payload was malformed.
    InvalidRequest,
    /// The request kind has no DSMLv2 encoding in this crate.
    Unsupported,
    /// Structural contradiction, e.g. a duplicate attribute in one entry.
    Inconsistent,
}

impl ErrorKind {
    /// Returns a stable short code for this kind (e.g., "invalid-request").
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::InvalidRequest => "invalid-request",
            ErrorKind::Unsupported => "unsupported",
            ErrorKind::Inconsistent => "inconsistent",
        }
    }
}

/// Error raised while building model values (DNs, attributes, entries).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("invalid DN {input:?}: {reason}")]
    InvalidDn { input: String, reason: &'static str },

    #[error("invalid RDN {input:?}: {reason}")]
    InvalidRdn { input: String, reason: &'static str },

    #[error("attribute identifier is empty")]
    EmptyAttributeId,

    #[error("attribute {id:?} appears more than once in the entry")]
    DuplicateAttribute { id: String },
}

impl ModelError {
    /// Returns the error kind for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ModelError::DuplicateAttribute { .. } => ErrorKind::Inconsistent,
            _ => ErrorKind::InvalidRequest,
        }
    }
}

/// Error during DSMLv2 emission.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodeError {
    #[error("{request} is missing required field {field}")]
    MissingField {
        request: &'static str,
        field: &'static str,
    },

    #[error("{request} has invalid {field}: {reason}")]
    InvalidField {
        request: &'static str,
        field: &'static str,
        reason: &'static str,
    },

    #[error("search filter depth {depth} exceeds maximum {max}")]
    FilterTooDeep { depth: usize, max: usize },

    #[error("{kind} requests have no DSMLv2 encoding")]
    Unsupported { kind: &'static str },

    #[error("XML serialization failed: {0}")]
    Xml(String),
}

impl EncodeError {
    /// Returns the error kind for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EncodeError::Unsupported { .. } => ErrorKind::Unsupported,
            _ => ErrorKind::InvalidRequest,
        }
    }
}

/// Error during DSMLv2 decoding.
///
/// Every variant except [`DecodeError::Xml`] carries the slash-separated path
/// of the offending element, e.g. `batchRequest/addRequest[1]/attr[0]`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    #[error("XML syntax error at byte {position}: {message}")]
    Xml { position: u64, message: String },

    #[error("{location}: missing required attribute {attribute}")]
    MissingAttribute {
        location: String,
        attribute: &'static str,
    },

    #[error("{location}: missing required element <{element}>")]
    MissingElement {
        location: String,
        element: &'static str,
    },

    #[error("{location}: invalid {attribute} value {value:?} (expected {expected})")]
    InvalidValue {
        location: String,
        attribute: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("{location}: {source}")]
    Model {
        location: String,
        #[source]
        source: ModelError,
    },

    #[error("{location}: invalid base64 payload: {message}")]
    InvalidBase64 { location: String, message: String },

    #[error("{location}: unexpected element <{element}>")]
    UnexpectedElement { location: String, element: String },

    #[error("{location}: unsupported request element <{element}>")]
    UnsupportedRequest { location: String, element: String },

    #[error("{location}: {limit} exceeds maximum {max}")]
    LimitExceeded {
        location: String,
        limit: &'static str,
        max: usize,
    },
}

impl DecodeError {
    /// Returns the error kind for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DecodeError::UnsupportedRequest { .. } => ErrorKind::Unsupported,
            DecodeError::Model { source, .. } => source.kind(),
            _ => ErrorKind::InvalidRequest,
        }
    }
}
