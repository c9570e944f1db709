//! Search filter encoding/decoding.
//!
//! A `<filter>` element holds exactly one filter item; `<and>`, `<or>` and
//! `<not>` nest further items.

use crate::codec::primitives::Cursor;
use crate::codec::request::{EncodeContext, decode_single_value, write_value};
use crate::codec::xml::Element;
use crate::error::DecodeError;
use crate::limits::MAX_FILTER_DEPTH;
use crate::model::value::has_binary_option;
use crate::model::{AttributeValueAssertion, ExtensibleMatch, Filter, SubstringFilter};

const AND: &str = "and";
const OR: &str = "or";
const NOT: &str = "not";
const EQUALITY_MATCH: &str = "equalityMatch";
const SUBSTRINGS: &str = "substrings";
const GREATER_OR_EQUAL: &str = "greaterOrEqual";
const LESS_OR_EQUAL: &str = "lessOrEqual";
const PRESENT: &str = "present";
const APPROX_MATCH: &str = "approxMatch";
const EXTENSIBLE_MATCH: &str = "extensibleMatch";

const INITIAL: &str = "initial";
const ANY: &str = "any";
const FINAL: &str = "final";
const VALUE: &str = "value";
const NAME: &str = "name";

// =============================================================================
// ENCODING
// =============================================================================

/// Appends `filter` as a child of `parent`.
///
/// Callers are expected to have validated the filter; see
/// [`validate_filter`](crate::validate::validate_filter).
pub fn encode_filter(parent: &mut Element, filter: &Filter, ctx: &mut EncodeContext) {
    match filter {
        Filter::And(items) => {
            let el = parent.add_child(AND);
            for item in items {
                encode_filter(el, item, ctx);
            }
        }
        Filter::Or(items) => {
            let el = parent.add_child(OR);
            for item in items {
                encode_filter(el, item, ctx);
            }
        }
        Filter::Not(inner) => encode_filter(parent.add_child(NOT), inner, ctx),
        Filter::EqualityMatch(ava) => encode_ava(parent, EQUALITY_MATCH, ava, ctx),
        Filter::GreaterOrEqual(ava) => encode_ava(parent, GREATER_OR_EQUAL, ava, ctx),
        Filter::LessOrEqual(ava) => encode_ava(parent, LESS_OR_EQUAL, ava, ctx),
        Filter::ApproxMatch(ava) => encode_ava(parent, APPROX_MATCH, ava, ctx),
        Filter::Present(name) => {
            parent.add_child(PRESENT).set_attribute(NAME, name.as_str());
        }
        Filter::Substrings(substrings) => encode_substrings(parent, substrings, ctx),
        Filter::ExtensibleMatch(m) => encode_extensible(parent, m, ctx),
    }
}

fn encode_ava(parent: &mut Element, tag: &str, ava: &AttributeValueAssertion, ctx: &mut EncodeContext) {
    let el = parent.add_child(tag);
    el.set_attribute(NAME, ava.name.as_str());
    write_value(el, VALUE, &ava.value, has_binary_option(&ava.name), ctx);
}

fn encode_substrings(parent: &mut Element, s: &SubstringFilter, ctx: &mut EncodeContext) {
    let binary = has_binary_option(&s.name);
    let el = parent.add_child(SUBSTRINGS);
    el.set_attribute(NAME, s.name.as_str());
    if let Some(initial) = &s.initial {
        write_value(el, INITIAL, initial, binary, ctx);
    }
    for any in &s.any {
        write_value(el, ANY, any, binary, ctx);
    }
    if let Some(final_) = &s.final_ {
        write_value(el, FINAL, final_, binary, ctx);
    }
}

fn encode_extensible(parent: &mut Element, m: &ExtensibleMatch, ctx: &mut EncodeContext) {
    let el = parent.add_child(EXTENSIBLE_MATCH);
    if let Some(name) = &m.name {
        el.set_attribute(NAME, name.as_str());
    }
    if let Some(rule) = &m.matching_rule {
        el.set_attribute("matchingRule", rule.as_str());
    }
    if m.dn_attributes {
        el.set_attribute("dnAttributes", "true");
    }
    let binary = m.name.as_deref().is_some_and(has_binary_option);
    write_value(el, VALUE, &m.value, binary, ctx);
}

// =============================================================================
// DECODING
// =============================================================================

/// Decodes the single filter item held by a `<filter>` element, which must
/// be the cursor's current element.
pub fn decode_filter<'a>(c: &mut Cursor<'a>, el: &'a Element) -> Result<Filter, DecodeError> {
    let mut items = el.child_elements().enumerate();
    let (index, first) = items.next().ok_or_else(|| c.missing_element("filter item"))?;
    if let Some((_, extra)) = items.next() {
        return Err(c.unexpected(extra));
    }
    decode_item(c, first, index, 1)
}

fn decode_item<'a>(
    c: &mut Cursor<'a>,
    el: &'a Element,
    index: usize,
    depth: usize,
) -> Result<Filter, DecodeError> {
    c.within(el, Some(index), |c| {
        if depth > MAX_FILTER_DEPTH {
            return Err(DecodeError::LimitExceeded {
                location: c.location(),
                limit: "filter depth",
                max: MAX_FILTER_DEPTH,
            });
        }

        match el.local_name() {
            AND => Ok(Filter::And(decode_set(c, el, depth)?)),
            OR => Ok(Filter::Or(decode_set(c, el, depth)?)),
            NOT => {
                let mut items = el.child_elements().enumerate();
                let (i, inner) = items.next().ok_or_else(|| c.missing_element("filter item"))?;
                if let Some((_, extra)) = items.next() {
                    return Err(c.unexpected(extra));
                }
                Ok(Filter::Not(Box::new(decode_item(c, inner, i, depth + 1)?)))
            }
            EQUALITY_MATCH => Ok(Filter::EqualityMatch(decode_ava(c, el)?)),
            GREATER_OR_EQUAL => Ok(Filter::GreaterOrEqual(decode_ava(c, el)?)),
            LESS_OR_EQUAL => Ok(Filter::LessOrEqual(decode_ava(c, el)?)),
            APPROX_MATCH => Ok(Filter::ApproxMatch(decode_ava(c, el)?)),
            PRESENT => {
                c.skip_unknown_attributes(el, &[NAME]);
                if let Some(child) = el.child_elements().next() {
                    return Err(c.unexpected(child));
                }
                Ok(Filter::Present(c.required_attr(el, NAME)?.to_string()))
            }
            SUBSTRINGS => Ok(Filter::Substrings(decode_substrings(c, el)?)),
            EXTENSIBLE_MATCH => Ok(Filter::ExtensibleMatch(decode_extensible(c, el)?)),
            _ => Err(DecodeError::UnexpectedElement {
                location: c.location(),
                element: el.name().to_string(),
            }),
        }
    })
}

fn decode_set<'a>(c: &mut Cursor<'a>, el: &'a Element, depth: usize) -> Result<Vec<Filter>, DecodeError> {
    el.child_elements()
        .enumerate()
        .map(|(i, child)| decode_item(c, child, i, depth + 1))
        .collect()
}

fn decode_ava<'a>(c: &mut Cursor<'a>, el: &'a Element) -> Result<AttributeValueAssertion, DecodeError> {
    c.skip_unknown_attributes(el, &[NAME]);
    let name = c.required_attr(el, NAME)?;
    let value = decode_single_value(c, el)?;
    Ok(AttributeValueAssertion::new(name, value))
}

fn decode_substrings<'a>(c: &mut Cursor<'a>, el: &'a Element) -> Result<SubstringFilter, DecodeError> {
    c.skip_unknown_attributes(el, &[NAME]);
    let mut filter = SubstringFilter {
        name: c.required_attr(el, NAME)?.to_string(),
        ..SubstringFilter::default()
    };

    for (i, child) in el.child_elements().enumerate() {
        match child.local_name() {
            INITIAL if filter.initial.is_none() && filter.any.is_empty() && filter.final_.is_none() => {
                filter.initial = Some(c.read_value(child, Some(i))?);
            }
            ANY if filter.final_.is_none() => filter.any.push(c.read_value(child, Some(i))?),
            FINAL if filter.final_.is_none() => {
                filter.final_ = Some(c.read_value(child, Some(i))?);
            }
            _ => return Err(c.unexpected(child)),
        }
    }
    if filter.is_empty() {
        return Err(c.missing_element("initial, any or final"));
    }
    Ok(filter)
}

fn decode_extensible<'a>(c: &mut Cursor<'a>, el: &'a Element) -> Result<ExtensibleMatch, DecodeError> {
    c.skip_unknown_attributes(el, &[NAME, "matchingRule", "dnAttributes"]);
    Ok(ExtensibleMatch {
        matching_rule: el.attribute("matchingRule").map(str::to_string),
        name: el.attribute(NAME).map(str::to_string),
        dn_attributes: c.bool_attr(el, "dnAttributes", false)?,
        value: decode_single_value(c, el)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{DecodeOptions, EncodeOptions};
    use crate::model::Value;

    fn encode(filter: &Filter) -> (String, bool) {
        let mut el = Element::new("filter");
        let mut ctx = EncodeContext::new();
        encode_filter(&mut el, filter, &mut ctx);
        (el.to_xml(&EncodeOptions::default()).unwrap(), ctx.base64_written())
    }

    fn decode(xml: &str) -> Result<Filter, DecodeError> {
        let el = Element::parse(xml).unwrap();
        let mut cursor = Cursor::new(DecodeOptions::default());
        cursor.within(&el, None, |c| decode_filter(c, &el))
    }

    #[test]
    fn test_encode_nested() {
        let filter = Filter::And(vec![
            Filter::equality("objectClass", "person"),
            Filter::negate(Filter::present("mail")),
        ]);
        let (xml, base64) = encode(&filter);
        assert_eq!(
            xml,
            concat!(
                "<filter><and>",
                r#"<equalityMatch name="objectClass"><value>person</value></equalityMatch>"#,
                r#"<not><present name="mail"/></not>"#,
                "</and></filter>"
            )
        );
        assert!(!base64);
    }

    #[test]
    fn test_encode_substrings_order() {
        let filter = Filter::Substrings(SubstringFilter {
            name: "cn".into(),
            initial: Some("Al".into()),
            any: vec!["ic".into()],
            final_: Some("e".into()),
        });
        let (xml, _) = encode(&filter);
        assert_eq!(
            xml,
            r#"<filter><substrings name="cn"><initial>Al</initial><any>ic</any><final>e</final></substrings></filter>"#
        );
    }

    #[test]
    fn test_encode_binary_assertion() {
        let filter = Filter::equality("objectGUID", vec![0xFFu8, 0x00]);
        let (xml, base64) = encode(&filter);
        assert!(xml.contains(r#"<value xsi:type="xsd:base64Binary">/wA=</value>"#));
        assert!(base64);
    }

    #[test]
    fn test_decode_filter_tree() {
        let filter = decode(concat!(
            "<filter><or>",
            r#"<greaterOrEqual name="uidNumber"><value>1000</value></greaterOrEqual>"#,
            r#"<extensibleMatch matchingRule="2.5.13.5" dnAttributes="true"><value>x</value></extensibleMatch>"#,
            "</or></filter>"
        ))
        .unwrap();
        assert_eq!(
            filter,
            Filter::Or(vec![
                Filter::GreaterOrEqual(AttributeValueAssertion::new("uidNumber", "1000")),
                Filter::ExtensibleMatch(ExtensibleMatch {
                    matching_rule: Some("2.5.13.5".into()),
                    name: None,
                    value: Value::from("x"),
                    dn_attributes: true,
                }),
            ])
        );
    }

    #[test]
    fn test_decode_filter_errors() {
        assert!(matches!(
            decode("<filter/>"),
            Err(DecodeError::MissingElement { element: "filter item", .. })
        ));
        assert!(matches!(
            decode(r#"<filter><present name="a"/><present name="b"/></filter>"#),
            Err(DecodeError::UnexpectedElement { .. })
        ));
        assert!(matches!(
            decode(r#"<filter><substrings name="cn"/></filter>"#),
            Err(DecodeError::MissingElement { .. })
        ));
        assert!(matches!(
            decode(r#"<filter><substrings name="cn"><final>a</final><initial>b</initial></substrings></filter>"#),
            Err(DecodeError::UnexpectedElement { .. })
        ));

        let err = decode(r#"<filter><and><fuzzy name="cn"/></and></filter>"#).unwrap_err();
        assert_eq!(
            err,
            DecodeError::UnexpectedElement {
                location: "filter/and[0]/fuzzy[0]".into(),
                element: "fuzzy".into(),
            }
        );
    }

    #[test]
    fn test_decode_depth_limit() {
        let depth = MAX_FILTER_DEPTH + 1;
        let xml = format!(
            "<filter>{}<present name=\"cn\"/>{}</filter>",
            "<not>".repeat(depth),
            "</not>".repeat(depth)
        );
        assert!(matches!(
            decode(&xml),
            Err(DecodeError::LimitExceeded { limit: "filter depth", .. })
        ));
    }
}
