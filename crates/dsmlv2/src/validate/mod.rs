//! Pre-emission validation for DSMLv2 requests.
//!
//! The model allows partially filled requests; these checks reject, before
//! any XML is produced, anything that has no valid DSMLv2 form:
//! - required fields that are unset
//! - empty identifiers (control type, attribute description, OIDs)
//! - search filters that are empty or nested too deeply

use crate::codec::request::element_name;
use crate::error::EncodeError;
use crate::limits::MAX_FILTER_DEPTH;
use crate::model::{BatchRequest, DsmlRequest, Filter, Request};

/// Validates every request of a batch, in order.
pub fn validate_batch(batch: &BatchRequest) -> Result<(), EncodeError> {
    batch.requests.iter().try_for_each(validate_request)
}

/// Validates one request.
pub fn validate_request(request: &DsmlRequest) -> Result<(), EncodeError> {
    let kind = request.kind();
    let Some(name) = element_name(kind) else {
        return Err(EncodeError::Unsupported { kind: kind.as_str() });
    };

    for control in &request.controls {
        non_empty(Some(control.oid.as_str()), name, "control type")?;
    }

    match &request.request {
        Request::Bind(r) => {
            present(r.principal.as_ref(), name, "principal")?;
        }
        Request::Unbind => {}
        Request::Add(r) => {
            present(r.entry.dn(), name, "dn")?;
        }
        Request::Compare(r) => {
            present(r.dn.as_ref(), name, "dn")?;
            non_empty(r.attribute_desc.as_deref(), name, "attributeDesc")?;
            present(r.assertion_value.as_ref(), name, "assertionValue")?;
        }
        Request::ModifyDn(r) => {
            present(r.dn.as_ref(), name, "dn")?;
            present(r.new_rdn.as_ref(), name, "newrdn")?;
        }
        Request::Delete(r) => {
            present(r.dn.as_ref(), name, "dn")?;
        }
        Request::Modify(r) => {
            present(r.dn.as_ref(), name, "dn")?;
        }
        Request::Search(r) => {
            present(r.base.as_ref(), name, "dn")?;
            present(r.scope.as_ref(), name, "scope")?;
            present(r.deref_aliases.as_ref(), name, "derefAliases")?;
            validate_filter(present(r.filter.as_ref(), name, "filter")?)?;
            for attribute in &r.attributes {
                non_empty(Some(attribute.as_str()), name, "attributes")?;
            }
        }
        Request::Abandon(r) => {
            non_empty(r.abandon_id.as_deref(), name, "abandonID")?;
        }
        Request::Extended(r) => {
            non_empty(r.request_name.as_deref(), name, "requestName")?;
        }
    }
    Ok(())
}

/// Validates a search filter.
pub fn validate_filter(filter: &Filter) -> Result<(), EncodeError> {
    let depth = filter.depth();
    if depth > MAX_FILTER_DEPTH {
        return Err(EncodeError::FilterTooDeep {
            depth,
            max: MAX_FILTER_DEPTH,
        });
    }
    check_filter(filter)
}

fn check_filter(filter: &Filter) -> Result<(), EncodeError> {
    const REQUEST: &str = "searchRequest";

    match filter {
        Filter::And(items) | Filter::Or(items) => items.iter().try_for_each(check_filter),
        Filter::Not(inner) => check_filter(inner),
        Filter::EqualityMatch(ava)
        | Filter::GreaterOrEqual(ava)
        | Filter::LessOrEqual(ava)
        | Filter::ApproxMatch(ava) => non_empty(Some(ava.name.as_str()), REQUEST, "filter name").map(drop),
        Filter::Present(name) => non_empty(Some(name.as_str()), REQUEST, "filter name").map(drop),
        Filter::Substrings(s) => {
            non_empty(Some(s.name.as_str()), REQUEST, "filter name")?;
            if s.is_empty() {
                return Err(EncodeError::InvalidField {
                    request: REQUEST,
                    field: "filter",
                    reason: "substrings filter has no initial, any or final component",
                });
            }
            Ok(())
        }
        Filter::ExtensibleMatch(m) => {
            if m.name.is_none() && m.matching_rule.is_none() {
                return Err(EncodeError::InvalidField {
                    request: REQUEST,
                    field: "filter",
                    reason: "extensibleMatch needs a name or a matchingRule",
                });
            }
            Ok(())
        }
    }
}

fn present<'r, T>(
    field: Option<&'r T>,
    request: &'static str,
    name: &'static str,
) -> Result<&'r T, EncodeError> {
    field.ok_or(EncodeError::MissingField {
        request,
        field: name,
    })
}

fn non_empty<'r>(
    field: Option<&'r str>,
    request: &'static str,
    name: &'static str,
) -> Result<&'r str, EncodeError> {
    match field {
        None => Err(EncodeError::MissingField {
            request,
            field: name,
        }),
        Some(value) if value.trim().is_empty() => Err(EncodeError::InvalidField {
            request,
            field: name,
            reason: "must not be empty",
        }),
        Some(value) => Ok(value),
    }
}
