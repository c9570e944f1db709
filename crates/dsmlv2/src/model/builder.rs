//! Builder API for ergonomic batch construction.
//!
//! # Example
//!
//! ```rust
//! use dsmlv2::model::builder::BatchBuilder;
//! use dsmlv2::{Dn, OnError};
//!
//! let batch = BatchBuilder::new()
//!     .request_id("batch-1")
//!     .on_error(OnError::Resume)
//!     .add(Dn::parse("cn=alice,ou=people,dc=ex,dc=com").unwrap(), |a| a
//!         .attr("objectClass", ["top", "person"])
//!         .attr("cn", ["alice"])
//!         .attr("sn", ["Liddell"])
//!     )
//!     .delete(Dn::parse("cn=bob,ou=people,dc=ex,dc=com").unwrap())
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(batch.requests.len(), 2);
//! ```

use crate::error::ModelError;
use crate::model::{
    AbandonRequest, AddRequest, Attribute, BatchRequest, BindRequest, CompareRequest,
    DeleteRequest, Dn, DsmlRequest, ExtendedRequest, ModifyDnRequest, ModifyOperation,
    ModifyRequest, OnError, Processing, Rdn, ResponseOrder, Value,
};

/// Builder for a [`BatchRequest`].
///
/// Model errors raised inside nested builders are kept and reported by
/// [`build`](Self::build); the first one wins.
#[derive(Debug, Clone, Default)]
pub struct BatchBuilder {
    batch: BatchRequest,
    error: Option<ModelError>,
}

impl BatchBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the batch request ID.
    pub fn request_id(mut self, id: impl Into<String>) -> Self {
        self.batch.request_id = Some(id.into());
        self
    }

    /// Sets the processing mode.
    pub fn processing(mut self, processing: Processing) -> Self {
        self.batch.processing = Some(processing);
        self
    }

    /// Sets the response order.
    pub fn response_order(mut self, order: ResponseOrder) -> Self {
        self.batch.response_order = Some(order);
        self
    }

    /// Sets the on-error policy.
    pub fn on_error(mut self, on_error: OnError) -> Self {
        self.batch.on_error = Some(on_error);
        self
    }

    /// Appends any request.
    pub fn request(mut self, request: impl Into<DsmlRequest>) -> Self {
        self.batch.requests.push(request.into());
        self
    }

    // =========================================================================
    // Request shorthands
    // =========================================================================

    /// Appends an authRequest.
    pub fn bind(self, principal: impl Into<String>) -> Self {
        self.request(BindRequest::new(principal))
    }

    /// Appends an add request built by `f`.
    pub fn add<F>(mut self, dn: Dn, f: F) -> Self
    where
        F: FnOnce(AddRequestBuilder) -> AddRequestBuilder,
    {
        let builder = f(AddRequestBuilder::new(dn));
        self.keep_error(builder.error);
        self.request(builder.request)
    }

    /// Appends a compare request.
    pub fn compare(self, dn: Dn, attribute_desc: impl Into<String>, value: impl Into<Value>) -> Self {
        self.request(CompareRequest::new(dn, attribute_desc, value))
    }

    /// Appends a delete request.
    pub fn delete(self, dn: Dn) -> Self {
        self.request(DeleteRequest::new(dn))
    }

    /// Appends a modify DN request.
    pub fn modify_dn(
        self,
        dn: Dn,
        new_rdn: Rdn,
        delete_old_rdn: bool,
        new_superior: Option<Dn>,
    ) -> Self {
        let mut request = ModifyDnRequest::new(dn, new_rdn).delete_old_rdn(delete_old_rdn);
        request.new_superior = new_superior;
        self.request(request)
    }

    /// Appends a modify request built by `f`.
    pub fn modify<F>(mut self, dn: Dn, f: F) -> Self
    where
        F: FnOnce(ModifyRequestBuilder) -> ModifyRequestBuilder,
    {
        let builder = f(ModifyRequestBuilder::new(dn));
        self.keep_error(builder.error);
        self.request(builder.request)
    }

    /// Appends an abandon request.
    pub fn abandon(self, abandon_id: impl Into<String>) -> Self {
        self.request(AbandonRequest::new(abandon_id))
    }

    /// Appends an extended request.
    pub fn extended(self, request_name: impl Into<String>, value: Option<Value>) -> Self {
        let mut request = ExtendedRequest::new(request_name);
        request.request_value = value;
        self.request(request)
    }

    fn keep_error(&mut self, error: Option<ModelError>) {
        if self.error.is_none() {
            self.error = error;
        }
    }

    /// Builds the batch.
    pub fn build(self) -> Result<BatchRequest, ModelError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.batch),
        }
    }
}

/// Builder for the entry of an add request.
#[derive(Debug, Clone)]
pub struct AddRequestBuilder {
    request: AddRequest,
    error: Option<ModelError>,
}

impl AddRequestBuilder {
    fn new(dn: Dn) -> Self {
        Self {
            request: AddRequest::new(dn),
            error: None,
        }
    }

    /// Appends values to an attribute, creating it on first use.
    pub fn attr<V: Into<Value>>(mut self, id: &str, values: impl IntoIterator<Item = V>) -> Self {
        if let Err(err) = self.request.add_attribute(id, values) {
            self.error.get_or_insert(err);
        }
        self
    }

    /// Appends a prepared attribute. A repeated identifier is an error.
    pub fn attribute(mut self, attribute: Attribute) -> Self {
        if let Err(err) = self.request.entry.push_attribute(attribute) {
            self.error.get_or_insert(err);
        }
        self
    }
}

/// Builder for the modifications of a modify request.
#[derive(Debug, Clone)]
pub struct ModifyRequestBuilder {
    request: ModifyRequest,
    error: Option<ModelError>,
}

impl ModifyRequestBuilder {
    fn new(dn: Dn) -> Self {
        Self {
            request: ModifyRequest::new(dn),
            error: None,
        }
    }

    fn change<V: Into<Value>>(
        mut self,
        operation: ModifyOperation,
        id: &str,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        match Attribute::with_values(id, values) {
            Ok(attribute) => self.request.push(operation, attribute),
            Err(err) => {
                self.error.get_or_insert(err);
            }
        }
        self
    }

    /// Adds values to an attribute.
    pub fn add<V: Into<Value>>(self, id: &str, values: impl IntoIterator<Item = V>) -> Self {
        self.change(ModifyOperation::Add, id, values)
    }

    /// Deletes values (or the whole attribute when `values` is empty).
    pub fn delete<V: Into<Value>>(self, id: &str, values: impl IntoIterator<Item = V>) -> Self {
        self.change(ModifyOperation::Delete, id, values)
    }

    /// Replaces all values of an attribute.
    pub fn replace<V: Into<Value>>(self, id: &str, values: impl IntoIterator<Item = V>) -> Self {
        self.change(ModifyOperation::Replace, id, values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Request;

    fn dn(s: &str) -> Dn {
        Dn::parse(s).unwrap()
    }

    #[test]
    fn test_builder_preserves_order() {
        let batch = BatchBuilder::new()
            .processing(Processing::Parallel)
            .bind("cn=admin")
            .add(dn("cn=a,dc=ex"), |a| a.attr("cn", ["a"]).attr("sn", ["b"]))
            .modify(dn("cn=a,dc=ex"), |m| {
                m.replace("mail", ["a@ex.com"]).delete("description", Vec::<Value>::new())
            })
            .abandon("3")
            .build()
            .unwrap();

        assert_eq!(batch.processing, Some(Processing::Parallel));
        let kinds: Vec<_> = batch.requests.iter().map(|r| r.kind().as_str()).collect();
        assert_eq!(kinds, ["bind", "add", "modify", "abandon"]);

        match &batch.requests[2].request {
            Request::Modify(m) => {
                assert_eq!(m.modifications.len(), 2);
                assert_eq!(m.modifications[1].operation, ModifyOperation::Delete);
                assert!(m.modifications[1].attribute.is_empty());
            }
            other => panic!("expected modify, got {other:?}"),
        }
    }

    #[test]
    fn test_builder_reports_first_error() {
        let err = BatchBuilder::new()
            .add(dn("cn=a"), |a| {
                a.attribute(Attribute::new("cn").unwrap())
                    .attribute(Attribute::new("CN").unwrap())
            })
            .modify(dn("cn=a"), |m| m.add("", ["x"]))
            .build()
            .unwrap_err();
        assert_eq!(err, ModelError::DuplicateAttribute { id: "CN".into() });
    }
}
