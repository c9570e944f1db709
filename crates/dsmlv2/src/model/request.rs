//! LDAP request values carried in a DSMLv2 batch.
//!
//! Each request kind is a plain struct; [`Request`] is the tagged union over
//! them and [`DsmlRequest`] adds the envelope fields every DSMLv2 request
//! shares (`requestID` and controls).
//!
//! Fields that DSMLv2 requires are `Option`s so that a partially filled
//! request can be represented; emission rejects it with
//! [`EncodeError::MissingField`](crate::EncodeError::MissingField).

use std::fmt;

use crate::error::ModelError;
use crate::model::{Attribute, Dn, Entry, Filter, Rdn, Value};

/// A request control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Control {
    /// Control type OID.
    pub oid: String,
    pub criticality: bool,
    pub value: Option<Value>,
}

impl Control {
    /// Creates a non-critical control with no value.
    pub fn new(oid: impl Into<String>) -> Self {
        Self {
            oid: oid.into(),
            criticality: false,
            value: None,
        }
    }

    /// Sets the criticality flag.
    pub fn critical(mut self, criticality: bool) -> Self {
        self.criticality = criticality;
        self
    }

    /// Sets the control value.
    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }
}

/// The kind of a request, used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Bind,
    Unbind,
    Add,
    Compare,
    ModifyDn,
    Delete,
    Modify,
    Search,
    Abandon,
    Extended,
}

impl RequestKind {
    /// Returns a short lowercase name (e.g., "add", "modify-dn").
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Bind => "bind",
            RequestKind::Unbind => "unbind",
            RequestKind::Add => "add",
            RequestKind::Compare => "compare",
            RequestKind::ModifyDn => "modify-dn",
            RequestKind::Delete => "delete",
            RequestKind::Modify => "modify",
            RequestKind::Search => "search",
            RequestKind::Abandon => "abandon",
            RequestKind::Extended => "extended",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An LDAP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Bind(BindRequest),
    Unbind,
    Add(AddRequest),
    Compare(CompareRequest),
    ModifyDn(ModifyDnRequest),
    Delete(DeleteRequest),
    Modify(ModifyRequest),
    Search(SearchRequest),
    Abandon(AbandonRequest),
    Extended(ExtendedRequest),
}

impl Request {
    /// Returns the kind of this request.
    pub fn kind(&self) -> RequestKind {
        match self {
            Request::Bind(_) => RequestKind::Bind,
            Request::Unbind => RequestKind::Unbind,
            Request::Add(_) => RequestKind::Add,
            Request::Compare(_) => RequestKind::Compare,
            Request::ModifyDn(_) => RequestKind::ModifyDn,
            Request::Delete(_) => RequestKind::Delete,
            Request::Modify(_) => RequestKind::Modify,
            Request::Search(_) => RequestKind::Search,
            Request::Abandon(_) => RequestKind::Abandon,
            Request::Extended(_) => RequestKind::Extended,
        }
    }
}

/// A request together with its DSMLv2 envelope fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DsmlRequest {
    pub request_id: Option<String>,
    pub controls: Vec<Control>,
    pub request: Request,
}

impl DsmlRequest {
    /// Wraps a request with no request ID and no controls.
    pub fn new(request: impl Into<Request>) -> Self {
        Self {
            request_id: None,
            controls: Vec::new(),
            request: request.into(),
        }
    }

    /// Sets the request ID.
    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }

    /// Appends a control.
    pub fn with_control(mut self, control: Control) -> Self {
        self.controls.push(control);
        self
    }

    /// Returns the kind of the wrapped request.
    pub fn kind(&self) -> RequestKind {
        self.request.kind()
    }
}

impl From<Request> for DsmlRequest {
    fn from(request: Request) -> Self {
        Self::new(request)
    }
}

/// Bind request; DSMLv2 `authRequest`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BindRequest {
    pub principal: Option<String>,
}

impl BindRequest {
    pub fn new(principal: impl Into<String>) -> Self {
        Self {
            principal: Some(principal.into()),
        }
    }
}

/// Add request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AddRequest {
    pub entry: Entry,
}

impl AddRequest {
    /// Creates an add request for an empty entry with the given DN.
    pub fn new(dn: Dn) -> Self {
        Self {
            entry: Entry::with_dn(dn),
        }
    }

    /// Returns the DN of the entry to add.
    pub fn dn(&self) -> Option<&Dn> {
        self.entry.dn()
    }

    /// Appends values to an attribute of the entry, creating it if needed.
    pub fn add_attribute<V: Into<Value>>(
        &mut self,
        id: &str,
        values: impl IntoIterator<Item = V>,
    ) -> Result<(), ModelError> {
        self.entry.add_values(id, values)
    }
}

/// Compare request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompareRequest {
    pub dn: Option<Dn>,
    /// Attribute description, possibly with options.
    pub attribute_desc: Option<String>,
    pub assertion_value: Option<Value>,
}

impl CompareRequest {
    pub fn new(dn: Dn, attribute_desc: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            dn: Some(dn),
            attribute_desc: Some(attribute_desc.into()),
            assertion_value: Some(value.into()),
        }
    }
}

/// Modify DN request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifyDnRequest {
    pub dn: Option<Dn>,
    pub new_rdn: Option<Rdn>,
    /// Defaults to true.
    pub delete_old_rdn: bool,
    /// Absent means rename in place.
    pub new_superior: Option<Dn>,
}

impl Default for ModifyDnRequest {
    fn default() -> Self {
        Self {
            dn: None,
            new_rdn: None,
            delete_old_rdn: true,
            new_superior: None,
        }
    }
}

impl ModifyDnRequest {
    /// Creates a rename-in-place request that deletes the old RDN.
    pub fn new(dn: Dn, new_rdn: Rdn) -> Self {
        Self {
            dn: Some(dn),
            new_rdn: Some(new_rdn),
            ..Self::default()
        }
    }

    /// Sets the delete-old-RDN flag.
    pub fn delete_old_rdn(mut self, delete: bool) -> Self {
        self.delete_old_rdn = delete;
        self
    }

    /// Moves the entry under a new superior.
    pub fn new_superior(mut self, superior: Dn) -> Self {
        self.new_superior = Some(superior);
        self
    }
}

/// Delete request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeleteRequest {
    pub dn: Option<Dn>,
}

impl DeleteRequest {
    pub fn new(dn: Dn) -> Self {
        Self { dn: Some(dn) }
    }
}

/// Operation of a single modification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModifyOperation {
    Add,
    Delete,
    Replace,
}

impl ModifyOperation {
    /// Returns the DSMLv2 literal.
    pub fn as_str(&self) -> &'static str {
        match self {
            ModifyOperation::Add => "add",
            ModifyOperation::Delete => "delete",
            ModifyOperation::Replace => "replace",
        }
    }

    /// Parses a DSMLv2 literal.
    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "add" => Some(ModifyOperation::Add),
            "delete" => Some(ModifyOperation::Delete),
            "replace" => Some(ModifyOperation::Replace),
            _ => None,
        }
    }
}

/// One change of a modify request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Modification {
    pub operation: ModifyOperation,
    pub attribute: Attribute,
}

/// Modify request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ModifyRequest {
    pub dn: Option<Dn>,
    pub modifications: Vec<Modification>,
}

impl ModifyRequest {
    pub fn new(dn: Dn) -> Self {
        Self {
            dn: Some(dn),
            modifications: Vec::new(),
        }
    }

    /// Appends a modification.
    pub fn push(&mut self, operation: ModifyOperation, attribute: Attribute) {
        self.modifications.push(Modification {
            operation,
            attribute,
        });
    }
}

/// Search scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchScope {
    BaseObject,
    SingleLevel,
    WholeSubtree,
}

impl SearchScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchScope::BaseObject => "baseObject",
            SearchScope::SingleLevel => "singleLevel",
            SearchScope::WholeSubtree => "wholeSubtree",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "baseObject" => Some(SearchScope::BaseObject),
            "singleLevel" => Some(SearchScope::SingleLevel),
            "wholeSubtree" => Some(SearchScope::WholeSubtree),
            _ => None,
        }
    }
}

/// Alias dereferencing policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DerefAliases {
    Never,
    InSearching,
    FindingBaseObj,
    Always,
}

impl DerefAliases {
    pub fn as_str(&self) -> &'static str {
        match self {
            DerefAliases::Never => "neverDerefAliases",
            DerefAliases::InSearching => "derefInSearching",
            DerefAliases::FindingBaseObj => "derefFindingBaseObj",
            DerefAliases::Always => "derefAlways",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "neverDerefAliases" => Some(DerefAliases::Never),
            "derefInSearching" => Some(DerefAliases::InSearching),
            "derefFindingBaseObj" => Some(DerefAliases::FindingBaseObj),
            "derefAlways" => Some(DerefAliases::Always),
            _ => None,
        }
    }
}

/// Search request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchRequest {
    pub base: Option<Dn>,
    pub scope: Option<SearchScope>,
    pub deref_aliases: Option<DerefAliases>,
    /// 0 means no limit.
    pub size_limit: u32,
    /// Seconds; 0 means no limit.
    pub time_limit: u32,
    pub types_only: bool,
    pub filter: Option<Filter>,
    /// Requested attribute descriptions, in order.
    pub attributes: Vec<String>,
}

impl SearchRequest {
    /// Creates a search with the required fields set.
    pub fn new(base: Dn, scope: SearchScope, filter: Filter) -> Self {
        Self {
            base: Some(base),
            scope: Some(scope),
            deref_aliases: Some(DerefAliases::Never),
            filter: Some(filter),
            ..Self::default()
        }
    }
}

/// Abandon request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AbandonRequest {
    /// The `requestID` of the request to abandon.
    pub abandon_id: Option<String>,
}

impl AbandonRequest {
    pub fn new(abandon_id: impl Into<String>) -> Self {
        Self {
            abandon_id: Some(abandon_id.into()),
        }
    }
}

/// Extended request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExtendedRequest {
    /// Request OID.
    pub request_name: Option<String>,
    pub request_value: Option<Value>,
}

impl ExtendedRequest {
    pub fn new(request_name: impl Into<String>) -> Self {
        Self {
            request_name: Some(request_name.into()),
            request_value: None,
        }
    }
}

macro_rules! impl_into_request {
    ($($ty:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Request {
                fn from(r: $ty) -> Self {
                    Request::$variant(r)
                }
            }

            impl From<$ty> for DsmlRequest {
                fn from(r: $ty) -> Self {
                    DsmlRequest::new(Request::$variant(r))
                }
            }
        )*
    };
}

impl_into_request!(
    BindRequest => Bind,
    AddRequest => Add,
    CompareRequest => Compare,
    ModifyDnRequest => ModifyDn,
    DeleteRequest => Delete,
    ModifyRequest => Modify,
    SearchRequest => Search,
    AbandonRequest => Abandon,
    ExtendedRequest => Extended,
);
