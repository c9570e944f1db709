//! Data model types for DSMLv2 requests.
//!
//! This module contains the value objects the codec reads and writes:
//! - Names (DN, RDN)
//! - Values and attributes
//! - Entries
//! - Search filters
//! - Requests and the batch envelope
//! - Builders (ergonomic construction)

pub mod batch;
pub mod builder;
pub mod dn;
pub mod entry;
pub mod filter;
pub mod request;
pub mod value;

pub use batch::{BatchRequest, OnError, Processing, ResponseOrder};
pub use builder::{AddRequestBuilder, BatchBuilder, ModifyRequestBuilder};
pub use dn::{Ava, Dn, Rdn, escape_value};
pub use entry::Entry;
pub use filter::{AttributeValueAssertion, ExtensibleMatch, Filter, SubstringFilter};
pub use request::{
    AbandonRequest, AddRequest, BindRequest, CompareRequest, Control, DeleteRequest,
    DerefAliases, DsmlRequest, ExtendedRequest, Modification, ModifyDnRequest, ModifyOperation,
    ModifyRequest, Request, RequestKind, SearchRequest, SearchScope,
};
pub use value::{Attribute, Value};
