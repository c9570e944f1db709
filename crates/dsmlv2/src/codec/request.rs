//! Request encoding/decoding for DSMLv2.
//!
//! Each request kind has an `encode_*` function that fills a detached
//! element and a `decode_*` function that reads one back. The element is
//! only attached to the caller's parent once it is complete, so a failed
//! emission leaves the parent untouched.

use tracing::trace;

use crate::codec::DecodeOptions;
use crate::codec::filter::{decode_filter, encode_filter};
use crate::codec::primitives::{
    Cursor, XML_SCHEMA_INSTANCE_NAMESPACE, XML_SCHEMA_NAMESPACE, XSD_BASE64_BINARY, XSD_PREFIX,
    XSI_PREFIX, XSI_TYPE, base64_encode, value_needs_base64,
};
use crate::codec::xml::Element;
use crate::error::{DecodeError, EncodeError};
use crate::model::value::has_binary_option;
use crate::model::{
    AbandonRequest, AddRequest, Attribute, BindRequest, CompareRequest, Control, DeleteRequest,
    DerefAliases, DsmlRequest, Entry, ExtendedRequest, Modification, ModifyDnRequest,
    ModifyOperation, ModifyRequest, Request, RequestKind, SearchRequest, SearchScope, Value,
};
use crate::validate::validate_request;

// Request element names
pub(crate) const AUTH_REQUEST: &str = "authRequest";
pub(crate) const ADD_REQUEST: &str = "addRequest";
pub(crate) const COMPARE_REQUEST: &str = "compareRequest";
pub(crate) const MOD_DN_REQUEST: &str = "modDNRequest";
pub(crate) const DEL_REQUEST: &str = "delRequest";
pub(crate) const MODIFY_REQUEST: &str = "modifyRequest";
pub(crate) const SEARCH_REQUEST: &str = "searchRequest";
pub(crate) const ABANDON_REQUEST: &str = "abandonRequest";
pub(crate) const EXTENDED_REQUEST: &str = "extendedRequest";

// Child element names
const CONTROL: &str = "control";
const CONTROL_VALUE: &str = "controlValue";
const ATTR: &str = "attr";
const VALUE: &str = "value";
const ASSERTION: &str = "assertion";
const MODIFICATION: &str = "modification";
const FILTER: &str = "filter";
const ATTRIBUTES: &str = "attributes";
const ATTRIBUTE: &str = "attribute";
const REQUEST_NAME: &str = "requestName";
const REQUEST_VALUE: &str = "requestValue";

// XML attribute names
pub(crate) const REQUEST_ID: &str = "requestID";
const DN: &str = "dn";
const NAME: &str = "name";

/// Returns the DSMLv2 element name for a request kind, if it has one.
pub fn element_name(kind: RequestKind) -> Option<&'static str> {
    match kind {
        RequestKind::Bind => Some(AUTH_REQUEST),
        RequestKind::Unbind => None,
        RequestKind::Add => Some(ADD_REQUEST),
        RequestKind::Compare => Some(COMPARE_REQUEST),
        RequestKind::ModifyDn => Some(MOD_DN_REQUEST),
        RequestKind::Delete => Some(DEL_REQUEST),
        RequestKind::Modify => Some(MODIFY_REQUEST),
        RequestKind::Search => Some(SEARCH_REQUEST),
        RequestKind::Abandon => Some(ABANDON_REQUEST),
        RequestKind::Extended => Some(EXTENDED_REQUEST),
    }
}

// =============================================================================
// ENCODING
// =============================================================================

/// Document-wide state threaded through request emission.
///
/// Value emitters record here that a base64-framed value was written;
/// [`finish`](Self::finish) then declares the `xsd`/`xsi` namespaces on the
/// document root, once.
#[derive(Debug, Clone, Default)]
pub struct EncodeContext {
    base64_written: bool,
    namespaces_declared: bool,
}

impl EncodeContext {
    /// Creates a fresh context for one document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if any emitted value was base64-framed.
    pub fn base64_written(&self) -> bool {
        self.base64_written
    }

    /// Declares the `xsd`/`xsi` namespaces on `root` if a base64-framed
    /// value was emitted and they were not declared yet. Returns true if
    /// declarations were added.
    pub fn finish(&mut self, root: &mut Element) -> bool {
        if !self.base64_written || self.namespaces_declared {
            return false;
        }
        root.add_namespace(Some(XSD_PREFIX), XML_SCHEMA_NAMESPACE);
        root.add_namespace(Some(XSI_PREFIX), XML_SCHEMA_INSTANCE_NAMESPACE);
        self.namespaces_declared = true;
        trace!(root = root.name(), "declared xsd/xsi namespaces");
        true
    }
}

/// Emits `request` as a new child of `parent` and returns the child.
///
/// On error `parent` and `ctx` are left unchanged.
pub fn emit_request<'p>(
    parent: &'p mut Element,
    request: &DsmlRequest,
    ctx: &mut EncodeContext,
) -> Result<&'p mut Element, EncodeError> {
    let mut local = EncodeContext::new();
    let element = encode_request(request, &mut local)?;
    ctx.base64_written |= local.base64_written;
    Ok(parent.push_child(element))
}

/// Encodes `request` as a detached element.
pub fn encode_request(request: &DsmlRequest, ctx: &mut EncodeContext) -> Result<Element, EncodeError> {
    validate_request(request)?;

    let kind = request.kind();
    let name = element_name(kind).ok_or(EncodeError::Unsupported {
        kind: kind.as_str(),
    })?;
    let mut el = Element::new(name);

    if let Some(id) = &request.request_id {
        el.set_attribute(REQUEST_ID, id);
    }
    for control in &request.controls {
        encode_control(&mut el, control, ctx);
    }

    match &request.request {
        Request::Bind(r) => encode_bind(&mut el, r)?,
        Request::Unbind => return Err(EncodeError::Unsupported { kind: kind.as_str() }),
        Request::Add(r) => encode_add(&mut el, r, ctx)?,
        Request::Compare(r) => encode_compare(&mut el, r, ctx)?,
        Request::ModifyDn(r) => encode_modify_dn(&mut el, r)?,
        Request::Delete(r) => encode_delete(&mut el, r)?,
        Request::Modify(r) => encode_modify(&mut el, r, ctx)?,
        Request::Search(r) => encode_search(&mut el, r, ctx)?,
        Request::Abandon(r) => encode_abandon(&mut el, r)?,
        Request::Extended(r) => encode_extended(&mut el, r, ctx)?,
    }

    trace!(element = name, "emitted request");
    Ok(el)
}

fn required<'r, T: ?Sized>(
    field: Option<&'r T>,
    request: &'static str,
    name: &'static str,
) -> Result<&'r T, EncodeError> {
    field.ok_or(EncodeError::MissingField {
        request,
        field: name,
    })
}

/// Appends a value-carrying child, base64-framed when required.
pub(crate) fn write_value(
    parent: &mut Element,
    name: &str,
    value: &Value,
    binary_by_syntax: bool,
    ctx: &mut EncodeContext,
) {
    let el = parent.add_child(name);
    match value {
        Value::String(text) if !value_needs_base64(value, binary_by_syntax) => {
            if !text.is_empty() {
                el.add_text(text.as_str());
            }
        }
        _ => {
            el.set_attribute(XSI_TYPE, XSD_BASE64_BINARY);
            if !value.is_empty() {
                el.add_text(base64_encode(value.as_bytes()));
            }
            ctx.base64_written = true;
        }
    }
}

fn encode_control(el: &mut Element, control: &Control, ctx: &mut EncodeContext) {
    let control_el = el.add_child(CONTROL);
    control_el.set_attribute("type", control.oid.as_str());
    if control.criticality {
        control_el.set_attribute("criticality", "true");
    }
    if let Some(value) = &control.value {
        write_value(control_el, CONTROL_VALUE, value, false, ctx);
    }
}

fn encode_bind(el: &mut Element, r: &BindRequest) -> Result<(), EncodeError> {
    let principal = required(r.principal.as_deref(), AUTH_REQUEST, "principal")?;
    el.set_attribute("principal", principal);
    Ok(())
}

fn encode_add(el: &mut Element, r: &AddRequest, ctx: &mut EncodeContext) -> Result<(), EncodeError> {
    let dn = required(r.entry.dn(), ADD_REQUEST, DN)?;
    el.set_attribute(DN, dn.up_name());

    for attribute in r.entry.attributes() {
        let attr_el = el.add_child(ATTR);
        attr_el.set_attribute(NAME, attribute.id());
        for value in attribute.values() {
            write_value(attr_el, VALUE, value, attribute.is_binary(), ctx);
        }
    }
    Ok(())
}

fn encode_compare(
    el: &mut Element,
    r: &CompareRequest,
    ctx: &mut EncodeContext,
) -> Result<(), EncodeError> {
    let dn = required(r.dn.as_ref(), COMPARE_REQUEST, DN)?;
    let desc = required(r.attribute_desc.as_deref(), COMPARE_REQUEST, "attributeDesc")?;
    let value = required(r.assertion_value.as_ref(), COMPARE_REQUEST, "assertionValue")?;

    el.set_attribute(DN, dn.up_name());
    let assertion = el.add_child(ASSERTION);
    assertion.set_attribute(NAME, desc);
    write_value(assertion, VALUE, value, has_binary_option(desc), ctx);
    Ok(())
}

fn encode_modify_dn(el: &mut Element, r: &ModifyDnRequest) -> Result<(), EncodeError> {
    let dn = required(r.dn.as_ref(), MOD_DN_REQUEST, DN)?;
    let new_rdn = required(r.new_rdn.as_ref(), MOD_DN_REQUEST, "newrdn")?;

    el.set_attribute(DN, dn.up_name());
    el.set_attribute("newrdn", new_rdn.up_name());
    el.set_attribute("deleteoldrdn", if r.delete_old_rdn { "true" } else { "false" });
    if let Some(superior) = &r.new_superior {
        el.set_attribute("newSuperior", superior.up_name());
    }
    Ok(())
}

fn encode_delete(el: &mut Element, r: &DeleteRequest) -> Result<(), EncodeError> {
    let dn = required(r.dn.as_ref(), DEL_REQUEST, DN)?;
    el.set_attribute(DN, dn.up_name());
    Ok(())
}

fn encode_modify(el: &mut Element, r: &ModifyRequest, ctx: &mut EncodeContext) -> Result<(), EncodeError> {
    let dn = required(r.dn.as_ref(), MODIFY_REQUEST, DN)?;
    el.set_attribute(DN, dn.up_name());

    for modification in &r.modifications {
        let attribute = &modification.attribute;
        let mod_el = el.add_child(MODIFICATION);
        mod_el.set_attribute(NAME, attribute.id());
        mod_el.set_attribute("operation", modification.operation.as_str());
        for value in attribute.values() {
            write_value(mod_el, VALUE, value, attribute.is_binary(), ctx);
        }
    }
    Ok(())
}

fn encode_search(el: &mut Element, r: &SearchRequest, ctx: &mut EncodeContext) -> Result<(), EncodeError> {
    let base = required(r.base.as_ref(), SEARCH_REQUEST, DN)?;
    let scope = required(r.scope.as_ref(), SEARCH_REQUEST, "scope")?;
    let deref = required(r.deref_aliases.as_ref(), SEARCH_REQUEST, "derefAliases")?;
    let filter = required(r.filter.as_ref(), SEARCH_REQUEST, FILTER)?;

    el.set_attribute(DN, base.up_name());
    el.set_attribute("scope", scope.as_str());
    el.set_attribute("derefAliases", deref.as_str());
    if r.size_limit != 0 {
        el.set_attribute("sizeLimit", r.size_limit.to_string());
    }
    if r.time_limit != 0 {
        el.set_attribute("timeLimit", r.time_limit.to_string());
    }
    if r.types_only {
        el.set_attribute("typesOnly", "true");
    }

    encode_filter(el.add_child(FILTER), filter, ctx);

    if !r.attributes.is_empty() {
        let attributes = el.add_child(ATTRIBUTES);
        for name in &r.attributes {
            attributes.add_child(ATTRIBUTE).set_attribute(NAME, name.as_str());
        }
    }
    Ok(())
}

fn encode_abandon(el: &mut Element, r: &AbandonRequest) -> Result<(), EncodeError> {
    let id = required(r.abandon_id.as_deref(), ABANDON_REQUEST, "abandonID")?;
    el.set_attribute("abandonID", id);
    Ok(())
}

fn encode_extended(
    el: &mut Element,
    r: &ExtendedRequest,
    ctx: &mut EncodeContext,
) -> Result<(), EncodeError> {
    let oid = required(r.request_name.as_deref(), EXTENDED_REQUEST, REQUEST_NAME)?;
    el.add_child(REQUEST_NAME).add_text(oid);
    if let Some(value) = &r.request_value {
        write_value(el, REQUEST_VALUE, value, false, ctx);
    }
    Ok(())
}

// =============================================================================
// DECODING
// =============================================================================

/// Decodes a single request element, e.g. one taken out of a batch.
pub fn decode_request(el: &Element) -> Result<DsmlRequest, DecodeError> {
    decode_request_with_options(el, DecodeOptions::default())
}

/// Decodes a single request element with the given options.
pub fn decode_request_with_options(
    el: &Element,
    options: DecodeOptions,
) -> Result<DsmlRequest, DecodeError> {
    let mut cursor = Cursor::new(options);
    decode_request_at(&mut cursor, el, None)
}

/// Decodes the request at `el`, dispatching on its local name.
pub(crate) fn decode_request_at<'a>(
    cursor: &mut Cursor<'a>,
    el: &'a Element,
    index: Option<usize>,
) -> Result<DsmlRequest, DecodeError> {
    cursor.within(el, index, |c| {
        let request = match el.local_name() {
            AUTH_REQUEST => Request::Bind(decode_bind(c, el)?),
            ADD_REQUEST => Request::Add(decode_add(c, el)?),
            COMPARE_REQUEST => Request::Compare(decode_compare(c, el)?),
            MOD_DN_REQUEST => Request::ModifyDn(decode_modify_dn(c, el)?),
            DEL_REQUEST => Request::Delete(decode_delete(c, el)?),
            MODIFY_REQUEST => Request::Modify(decode_modify(c, el)?),
            SEARCH_REQUEST => Request::Search(decode_search(c, el)?),
            ABANDON_REQUEST => Request::Abandon(decode_abandon(c, el)?),
            EXTENDED_REQUEST => Request::Extended(decode_extended(c, el)?),
            _ => {
                return Err(DecodeError::UnsupportedRequest {
                    location: c.location(),
                    element: el.name().to_string(),
                });
            }
        };

        let mut controls = Vec::new();
        let mut in_body = false;
        for (i, child) in el.child_elements().enumerate() {
            if child.local_name() != CONTROL {
                in_body = true;
            } else if in_body {
                return Err(c.unexpected(child));
            } else {
                controls.push(c.within(child, Some(i), |c| decode_control(c, child))?);
            }
        }

        trace!(location = %c.location(), "decoded request");
        Ok(DsmlRequest {
            request_id: el.attribute(REQUEST_ID).map(str::to_string),
            controls,
            request,
        })
    })
}

/// Child elements other than the leading `<control>`s, with their positions.
fn body(el: &Element) -> impl Iterator<Item = (usize, &Element)> {
    el.child_elements()
        .enumerate()
        .filter(|(_, child)| child.local_name() != CONTROL)
}

fn expect_no_body(c: &Cursor<'_>, el: &Element) -> Result<(), DecodeError> {
    match body(el).next() {
        Some((_, child)) => Err(c.unexpected(child)),
        None => Ok(()),
    }
}

fn decode_control<'a>(c: &mut Cursor<'a>, el: &'a Element) -> Result<Control, DecodeError> {
    c.skip_unknown_attributes(el, &["type", "criticality"]);
    let mut control = Control::new(c.required_attr(el, "type")?);
    control.criticality = c.bool_attr(el, "criticality", false)?;

    for (i, child) in el.child_elements().enumerate() {
        if child.local_name() != CONTROL_VALUE || control.value.is_some() {
            return Err(c.unexpected(child));
        }
        control.value = Some(c.read_value(child, Some(i))?);
    }
    Ok(control)
}

fn decode_bind<'a>(c: &mut Cursor<'a>, el: &'a Element) -> Result<BindRequest, DecodeError> {
    c.skip_unknown_attributes(el, &[REQUEST_ID, "principal"]);
    let principal = c.required_attr(el, "principal")?;
    expect_no_body(c, el)?;
    Ok(BindRequest::new(principal))
}

fn decode_add<'a>(c: &mut Cursor<'a>, el: &'a Element) -> Result<AddRequest, DecodeError> {
    c.skip_unknown_attributes(el, &[REQUEST_ID, DN]);
    let mut entry = Entry::with_dn(c.dn_attr(el, DN)?);

    for (i, child) in body(el) {
        if child.local_name() != ATTR {
            return Err(c.unexpected(child));
        }
        c.within(child, Some(i), |c| {
            let attribute = decode_attribute(c, child)?;
            entry.push_attribute(attribute).map_err(|e| c.model_error(e))
        })?;
    }
    Ok(AddRequest { entry })
}

/// Reads the `name` attribute and `<value>` children of an `<attr>` or
/// `<modification>` element.
fn decode_attribute<'a>(c: &mut Cursor<'a>, el: &'a Element) -> Result<Attribute, DecodeError> {
    let name = c.required_attr(el, NAME)?;
    let mut attribute = Attribute::new(name).map_err(|e| c.model_error(e))?;

    for (i, child) in el.child_elements().enumerate() {
        if child.local_name() != VALUE {
            return Err(c.unexpected(child));
        }
        c.check_limit(attribute.len() + 1, c.options().max_values, "values per attribute")?;
        attribute.push(c.read_value(child, Some(i))?);
    }
    Ok(attribute)
}

/// Reads the single `<value>` child of `el`.
pub(crate) fn decode_single_value<'a>(c: &mut Cursor<'a>, el: &'a Element) -> Result<Value, DecodeError> {
    let mut value = None;
    for (i, child) in el.child_elements().enumerate() {
        if child.local_name() != VALUE || value.is_some() {
            return Err(c.unexpected(child));
        }
        value = Some(c.read_value(child, Some(i))?);
    }
    value.ok_or_else(|| c.missing_element(VALUE))
}

fn decode_compare<'a>(c: &mut Cursor<'a>, el: &'a Element) -> Result<CompareRequest, DecodeError> {
    c.skip_unknown_attributes(el, &[REQUEST_ID, DN]);
    let dn = c.dn_attr(el, DN)?;

    let mut assertion = None;
    for (i, child) in body(el) {
        if child.local_name() != ASSERTION || assertion.is_some() {
            return Err(c.unexpected(child));
        }
        assertion = Some(c.within(child, Some(i), |c| {
            c.skip_unknown_attributes(child, &[NAME]);
            let name = c.required_attr(child, NAME)?;
            let value = decode_single_value(c, child)?;
            Ok((name, value))
        })?);
    }
    let (desc, value) = assertion.ok_or_else(|| c.missing_element(ASSERTION))?;

    Ok(CompareRequest::new(dn, desc, value))
}

fn decode_modify_dn<'a>(c: &mut Cursor<'a>, el: &'a Element) -> Result<ModifyDnRequest, DecodeError> {
    c.skip_unknown_attributes(el, &[REQUEST_ID, DN, "newrdn", "deleteoldrdn", "newSuperior"]);
    let request = ModifyDnRequest {
        dn: Some(c.dn_attr(el, DN)?),
        new_rdn: Some(c.rdn_attr(el, "newrdn")?),
        delete_old_rdn: c.bool_attr(el, "deleteoldrdn", true)?,
        new_superior: c.optional_dn_attr(el, "newSuperior")?,
    };
    expect_no_body(c, el)?;
    Ok(request)
}

fn decode_delete<'a>(c: &mut Cursor<'a>, el: &'a Element) -> Result<DeleteRequest, DecodeError> {
    c.skip_unknown_attributes(el, &[REQUEST_ID, DN]);
    let dn = c.dn_attr(el, DN)?;
    expect_no_body(c, el)?;
    Ok(DeleteRequest::new(dn))
}

fn decode_modify<'a>(c: &mut Cursor<'a>, el: &'a Element) -> Result<ModifyRequest, DecodeError> {
    c.skip_unknown_attributes(el, &[REQUEST_ID, DN]);
    let mut request = ModifyRequest::new(c.dn_attr(el, DN)?);

    for (i, child) in body(el) {
        if child.local_name() != MODIFICATION {
            return Err(c.unexpected(child));
        }
        let modification = c.within(child, Some(i), |c| {
            c.skip_unknown_attributes(child, &[NAME, "operation"]);
            let raw = c.required_attr(child, "operation")?;
            let operation = ModifyOperation::from_str_opt(raw)
                .ok_or_else(|| c.invalid_value("operation", raw, "add, delete or replace"))?;
            Ok(Modification {
                operation,
                attribute: decode_attribute(c, child)?,
            })
        })?;
        request.modifications.push(modification);
    }
    Ok(request)
}

fn decode_search<'a>(c: &mut Cursor<'a>, el: &'a Element) -> Result<SearchRequest, DecodeError> {
    c.skip_unknown_attributes(
        el,
        &[REQUEST_ID, DN, "scope", "derefAliases", "sizeLimit", "timeLimit", "typesOnly"],
    );
    let base = c.dn_attr(el, DN)?;
    c.required_attr(el, "scope")?;
    let scope = c.enum_attr(
        el,
        "scope",
        SearchScope::from_str_opt,
        "baseObject, singleLevel or wholeSubtree",
    )?;
    c.required_attr(el, "derefAliases")?;
    let deref_aliases = c.enum_attr(
        el,
        "derefAliases",
        DerefAliases::from_str_opt,
        "neverDerefAliases, derefInSearching, derefFindingBaseObj or derefAlways",
    )?;

    let mut request = SearchRequest {
        base: Some(base),
        scope,
        deref_aliases,
        size_limit: c.u32_attr(el, "sizeLimit")?,
        time_limit: c.u32_attr(el, "timeLimit")?,
        types_only: c.bool_attr(el, "typesOnly", false)?,
        filter: None,
        attributes: Vec::new(),
    };

    let mut seen_attributes = false;
    for (i, child) in body(el) {
        match child.local_name() {
            FILTER if request.filter.is_none() => {
                request.filter = Some(c.within(child, Some(i), |c| decode_filter(c, child))?);
            }
            ATTRIBUTES if !seen_attributes => {
                seen_attributes = true;
                request.attributes = c.within(child, Some(i), |c| decode_attribute_list(c, child))?;
            }
            _ => return Err(c.unexpected(child)),
        }
    }
    if request.filter.is_none() {
        return Err(c.missing_element(FILTER));
    }
    Ok(request)
}

fn decode_attribute_list<'a>(c: &mut Cursor<'a>, el: &'a Element) -> Result<Vec<String>, DecodeError> {
    let mut names = Vec::new();
    for (i, child) in el.child_elements().enumerate() {
        if child.local_name() != ATTRIBUTE {
            return Err(c.unexpected(child));
        }
        let name = c.within(child, Some(i), |c| c.required_attr(child, NAME))?;
        names.push(name.to_string());
    }
    Ok(names)
}

fn decode_abandon<'a>(c: &mut Cursor<'a>, el: &'a Element) -> Result<AbandonRequest, DecodeError> {
    c.skip_unknown_attributes(el, &[REQUEST_ID, "abandonID"]);
    let id = c.required_attr(el, "abandonID")?;
    expect_no_body(c, el)?;
    Ok(AbandonRequest::new(id))
}

fn decode_extended<'a>(c: &mut Cursor<'a>, el: &'a Element) -> Result<ExtendedRequest, DecodeError> {
    c.skip_unknown_attributes(el, &[REQUEST_ID]);
    let mut request = ExtendedRequest::default();

    for (i, child) in body(el) {
        match child.local_name() {
            REQUEST_NAME if request.request_name.is_none() => {
                if let Some(grandchild) = child.child_elements().next() {
                    return Err(c.unexpected(grandchild));
                }
                request.request_name = Some(child.text().trim().to_string());
            }
            REQUEST_VALUE if request.request_value.is_none() => {
                request.request_value = Some(c.read_value(child, Some(i))?);
            }
            _ => return Err(c.unexpected(child)),
        }
    }
    if request.request_name.is_none() {
        return Err(c.missing_element(REQUEST_NAME));
    }
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use crate::codec::EncodeOptions;
    use crate::model::{Dn, Rdn};

    fn dn(s: &str) -> Dn {
        Dn::parse(s).unwrap()
    }

    fn emit_to_string(request: DsmlRequest) -> String {
        let mut root = Element::new("root");
        let mut ctx = EncodeContext::new();
        emit_request(&mut root, &request, &mut ctx).unwrap();
        ctx.finish(&mut root);
        root.to_xml(&EncodeOptions::default()).unwrap()
    }

    #[test]
    fn test_emit_compare() {
        let request = CompareRequest::new(dn("uid=bob,ou=people,dc=ex,dc=com"), "sn", "Smith");
        let xml = emit_to_string(request.into());
        assert_eq!(
            xml,
            concat!(
                "<root>",
                r#"<compareRequest dn="uid=bob,ou=people,dc=ex,dc=com">"#,
                r#"<assertion name="sn"><value>Smith</value></assertion>"#,
                "</compareRequest>",
                "</root>"
            )
        );
    }

    #[test]
    fn test_compare_without_attribute_is_rejected() {
        let request = CompareRequest {
            dn: Some(dn("uid=bob")),
            attribute_desc: None,
            assertion_value: Some(Value::from("Smith")),
        };
        let mut root = Element::new("root");
        let mut ctx = EncodeContext::new();
        let err = emit_request(&mut root, &request.into(), &mut ctx).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        assert!(root.children().is_empty());
    }

    #[test]
    fn test_modify_dn_deleteoldrdn_false() {
        let request = ModifyDnRequest::new(dn("cn=x,ou=a"), Rdn::parse("cn=y").unwrap())
            .delete_old_rdn(false);
        let xml = emit_to_string(request.into());
        assert!(xml.contains(r#"<modDNRequest dn="cn=x,ou=a" newrdn="cn=y" deleteoldrdn="false"/>"#));
    }

    #[test]
    fn test_unbind_is_unsupported() {
        let mut ctx = EncodeContext::new();
        let err = encode_request(&DsmlRequest::new(Request::Unbind), &mut ctx).unwrap_err();
        assert_eq!(err, EncodeError::Unsupported { kind: "unbind" });
        assert_eq!(err.kind(), ErrorKind::Unsupported);
    }

    #[test]
    fn test_failed_emission_leaves_context_clean() {
        let mut entry = Entry::new();
        entry.add_value("userCertificate;binary", vec![1u8, 2, 3]).unwrap();
        let request = DsmlRequest::new(AddRequest { entry });

        let mut root = Element::new("root");
        let mut ctx = EncodeContext::new();
        assert!(emit_request(&mut root, &request, &mut ctx).is_err());
        assert!(!ctx.base64_written());
        assert!(!ctx.finish(&mut root));
        assert!(root.children().is_empty());
    }

    #[test]
    fn test_controls_come_first() {
        let request = DsmlRequest::new(DeleteRequest::new(dn("cn=a")))
            .with_request_id("4")
            .with_control(Control::new("1.2.840.113556.1.4.805").critical(true))
            .with_control(Control::new("1.3.6.1.4.1.42.2.27.8.5.1").with_value(vec![0x30u8, 0x00]));
        let xml = emit_to_string(request);
        assert!(xml.contains(concat!(
            r#"<delRequest requestID="4" dn="cn=a">"#,
            r#"<control type="1.2.840.113556.1.4.805" criticality="true"/>"#,
            r#"<control type="1.3.6.1.4.1.42.2.27.8.5.1">"#,
            r#"<controlValue xsi:type="xsd:base64Binary">MAA=</controlValue></control>"#,
            "</delRequest>"
        )));
        assert!(xml.starts_with(r#"<root xmlns:xsd="http://www.w3.org/2001/XMLSchema" xmlns:xsi="#));
    }

    #[test]
    fn test_decode_modify_dn_literals() {
        let el = Element::parse(r#"<modDNRequest dn="cn=x" newrdn="cn=y" deleteoldrdn="FALSE"/>"#).unwrap();
        match decode_request(&el).unwrap().request {
            Request::ModifyDn(r) => {
                assert!(!r.delete_old_rdn);
                assert!(r.new_superior.is_none());
            }
            other => panic!("expected modDN, got {other:?}"),
        }

        let el = Element::parse(r#"<modDNRequest dn="cn=x" newrdn="cn=y" deleteoldrdn="maybe"/>"#).unwrap();
        let err = decode_request(&el).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidValue { attribute: "deleteoldrdn", .. }));

        let el = Element::parse(r#"<modDNRequest dn="cn=x" newrdn="cn=y"/>"#).unwrap();
        match decode_request(&el).unwrap().request {
            Request::ModifyDn(r) => assert!(r.delete_old_rdn),
            other => panic!("expected modDN, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_rejects_malformed_dn() {
        let el = Element::parse(r#"<delRequest dn="cn=a,,dc=b"/>"#).unwrap();
        let err = decode_request(&el).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        assert!(matches!(err, DecodeError::Model { ref location, .. } if location == "delRequest"));
    }

    #[test]
    fn test_decode_unknown_child_is_invalid() {
        let el = Element::parse(r#"<addRequest dn="cn=a"><attr name="cn"/><bogus/></addRequest>"#).unwrap();
        let err = decode_request(&el).unwrap_err();
        assert_eq!(
            err,
            DecodeError::UnexpectedElement {
                location: "addRequest".into(),
                element: "bogus".into(),
            }
        );
    }

    #[test]
    fn test_decode_control_after_body_is_rejected() {
        let el = Element::parse(
            r#"<addRequest dn="cn=a"><control type="1.1"/><attr name="cn"/><control type="1.2"/></addRequest>"#,
        )
        .unwrap();
        let err = decode_request(&el).unwrap_err();
        assert_eq!(
            err,
            DecodeError::UnexpectedElement {
                location: "addRequest".into(),
                element: "control".into(),
            }
        );

        let el = Element::parse(r#"<delRequest dn="cn=a"><control type="1.1"/></delRequest>"#).unwrap();
        assert_eq!(decode_request(&el).unwrap().controls, [Control::new("1.1")]);
    }

    #[test]
    fn test_decode_duplicate_attribute_is_inconsistent() {
        let el = Element::parse(
            r#"<addRequest dn="cn=a"><attr name="cn"><value>a</value></attr><attr name="CN"/></addRequest>"#,
        )
        .unwrap();
        let err = decode_request(&el).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Inconsistent);
        assert!(err.to_string().starts_with("addRequest/attr[1]:"));
    }

    #[test]
    fn test_decode_ignores_unknown_attributes() {
        let el = Element::parse(
            r#"<compareRequest dn="cn=a" future="1" requestID="9"><assertion name="sn" x="y"><value>S</value></assertion></compareRequest>"#,
        )
        .unwrap();
        let decoded = decode_request(&el).unwrap();
        assert_eq!(decoded.request_id.as_deref(), Some("9"));
        assert_eq!(
            decoded.request,
            Request::Compare(CompareRequest::new(dn("cn=a"), "sn", "S"))
        );
    }

    #[test]
    fn test_decode_compare_requires_value() {
        let el = Element::parse(r#"<compareRequest dn="cn=a"><assertion name="sn"/></compareRequest>"#).unwrap();
        let err = decode_request(&el).unwrap_err();
        assert_eq!(
            err,
            DecodeError::MissingElement {
                location: "compareRequest/assertion[0]".into(),
                element: "value",
            }
        );
    }

    #[test]
    fn test_decode_modify() {
        let el = Element::parse(concat!(
            r#"<modifyRequest dn="cn=a">"#,
            r#"<modification name="mail" operation="replace"><value>a@ex.com</value></modification>"#,
            r#"<modification name="description" operation="delete"/>"#,
            r#"</modifyRequest>"#
        ))
        .unwrap();
        let Request::Modify(modify) = decode_request(&el).unwrap().request else {
            panic!("expected modify");
        };
        assert_eq!(modify.modifications.len(), 2);
        assert_eq!(modify.modifications[0].operation, ModifyOperation::Replace);
        assert_eq!(modify.modifications[0].attribute.values(), &[Value::from("a@ex.com")]);
        assert!(modify.modifications[1].attribute.is_empty());

        let el = Element::parse(r#"<modifyRequest dn="cn=a"><modification name="x" operation="merge"/></modifyRequest>"#)
            .unwrap();
        assert!(matches!(
            decode_request(&el),
            Err(DecodeError::InvalidValue { attribute: "operation", .. })
        ));
    }

    #[test]
    fn test_decode_extended_and_abandon() {
        let el = Element::parse(concat!(
            r#"<extendedRequest><requestName> 1.3.6.1.4.1.4203.1.11.3 </requestName>"#,
            r#"<requestValue xsi:type="xsd:base64Binary">AQI=</requestValue></extendedRequest>"#
        ))
        .unwrap();
        let Request::Extended(ext) = decode_request(&el).unwrap().request else {
            panic!("expected extended");
        };
        assert_eq!(ext.request_name.as_deref(), Some("1.3.6.1.4.1.4203.1.11.3"));
        assert_eq!(ext.request_value, Some(Value::Binary(vec![1, 2])));

        let el = Element::parse(r#"<abandonRequest/>"#).unwrap();
        assert!(matches!(
            decode_request(&el),
            Err(DecodeError::MissingAttribute { attribute: "abandonID", .. })
        ));
    }

    #[test]
    fn test_decode_search_requires_filter() {
        let el = Element::parse(
            r#"<searchRequest dn="dc=ex" scope="wholeSubtree" derefAliases="neverDerefAliases"/>"#,
        )
        .unwrap();
        assert!(matches!(
            decode_request(&el),
            Err(DecodeError::MissingElement { element: "filter", .. })
        ));

        let el = Element::parse(
            r#"<searchRequest dn="dc=ex" scope="subtree" derefAliases="neverDerefAliases"><filter><present name="cn"/></filter></searchRequest>"#,
        )
        .unwrap();
        assert!(matches!(
            decode_request(&el),
            Err(DecodeError::InvalidValue { attribute: "scope", .. })
        ));
    }

    #[test]
    fn test_unknown_request_is_unsupported() {
        let el = Element::parse(r#"<unbindRequest/>"#).unwrap();
        let err = decode_request(&el).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
    }
}
