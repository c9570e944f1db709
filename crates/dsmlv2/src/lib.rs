//! DSMLv2: LDAP requests as XML.
//!
//! This crate encodes LDAP request values into DSMLv2 `batchRequest`
//! documents and decodes them back, as defined by the OASIS DSMLv2
//! specification.
//!
//! # Overview
//!
//! A document is a `<batchRequest>` root holding requests in order. Each
//! request kind (add, compare, modDN, delete, modify, search, abandon,
//! extended, auth) is one variant of [`Request`]. Values that cannot appear
//! literally in XML text are written base64-framed with
//! `xsi:type="xsd:base64Binary"`, and the `xsd`/`xsi` namespaces are
//! declared on the root only when such a value is present.
//!
//! # Quick Start
//!
//! ```rust
//! use dsmlv2::codec::{decode_batch_str, encode_batch_to_string, EncodeOptions};
//! use dsmlv2::{AddRequest, BatchRequest, Dn};
//!
//! let mut add = AddRequest::new(Dn::parse("cn=alice,ou=people,dc=ex,dc=com").unwrap());
//! add.add_attribute("cn", ["alice"]).unwrap();
//! add.add_attribute("userCertificate;binary", [vec![0xFFu8, 0x00, 0x7F]]).unwrap();
//!
//! let mut batch = BatchRequest::new();
//! batch.push(add);
//!
//! let xml = encode_batch_to_string(&batch, &EncodeOptions::default()).unwrap();
//! assert!(xml.contains(r#"<value xsi:type="xsd:base64Binary">/wB/</value>"#));
//!
//! let decoded = decode_batch_str(&xml).unwrap();
//! assert_eq!(decoded, batch);
//! ```
//!
//! # Modules
//!
//! - [`model`]: Request values (DN, Entry, Filter, Request, BatchRequest)
//! - [`codec`]: XML element tree and DSMLv2 encoding/decoding
//! - [`validate`]: Required-field checks run before emission
//! - [`error`]: Error types
//! - [`limits`]: Bounds for decoding untrusted documents
//!
//! # Security
//!
//! The decoder is meant to handle untrusted input:
//! - Element nesting, batch size, and values per attribute are bounded
//! - Every error names the path of the offending element

pub mod codec;
pub mod error;
pub mod limits;
pub mod model;
pub mod validate;

// Re-export commonly used types at crate root
pub use codec::{
    DecodeOptions, EncodeContext, EncodeOptions, decode_batch, decode_batch_str, decode_request,
    emit_request, encode_batch, encode_batch_to_string,
};
pub use error::{DecodeError, EncodeError, ErrorKind, ModelError};
pub use model::{
    AbandonRequest, AddRequest, Attribute, BatchBuilder, BatchRequest, BindRequest,
    CompareRequest, Control, DeleteRequest, DerefAliases, Dn, DsmlRequest, Entry,
    ExtendedRequest, Filter, Modification, ModifyDnRequest, ModifyOperation, ModifyRequest,
    OnError, Processing, Rdn, Request, RequestKind, ResponseOrder, SearchRequest, SearchScope,
    Value,
};
pub use validate::{validate_batch, validate_request};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// DSML version this crate implements.
pub const DSML_VERSION: &str = "2.0";
