//! Shared helpers for DSMLv2 encoding/decoding.
//!
//! Implements the base64 framing rule, the base64 codec, namespace
//! constants, and the [`Cursor`] used to walk element trees.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::trace;

use crate::codec::DecodeOptions;
use crate::codec::xml::{Element, split_qname};
use crate::error::{DecodeError, ModelError};
use crate::model::{Dn, Rdn, Value};

/// DSMLv2 core namespace, declared as the default namespace of the root.
pub const DSML_NAMESPACE: &str = "urn:oasis:names:tc:DSML:2:0:core";
/// XML Schema namespace, bound to `xsd`.
pub const XML_SCHEMA_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";
/// XML Schema Instance namespace, bound to `xsi`.
pub const XML_SCHEMA_INSTANCE_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

pub const XSD_PREFIX: &str = "xsd";
pub const XSI_PREFIX: &str = "xsi";
/// Local name of the XSD type tagging base64 payloads.
pub const BASE64_BINARY: &str = "base64Binary";
/// Attribute placed on base64-framed value elements.
pub const XSI_TYPE: &str = "xsi:type";
/// Value of [`XSI_TYPE`] for base64-framed values.
pub const XSD_BASE64_BINARY: &str = "xsd:base64Binary";

// =============================================================================
// BASE64 FRAMING
// =============================================================================

/// Returns true if this octet cannot appear as-is in `<value>` text.
///
/// That is any octet above 0x7F, or below 0x20 other than LF and CR.
#[inline]
pub fn byte_needs_base64(byte: u8) -> bool {
    byte > 0x7F || (byte < 0x20 && byte != b'\n' && byte != b'\r')
}

/// Returns true if any octet of the payload needs base64 framing.
pub fn needs_base64(bytes: &[u8]) -> bool {
    bytes.iter().copied().any(byte_needs_base64)
}

/// Returns true if `value` must be emitted base64-framed.
///
/// Binary-form values and values of attributes that are binary by syntax
/// are always framed; string values only when their UTF-8 bytes need it.
pub fn value_needs_base64(value: &Value, binary_by_syntax: bool) -> bool {
    binary_by_syntax || value.is_binary() || needs_base64(value.as_bytes())
}

/// Encodes bytes as RFC 4648 base64 without line wrapping.
pub fn base64_encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decodes RFC 4648 base64, ignoring any whitespace in the input.
pub fn base64_decode(text: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD.decode(compact)
}

// =============================================================================
// DECODING CURSOR
// =============================================================================

/// Tracks the element path and in-scope namespace bindings while walking
/// a DSMLv2 element tree.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    /// `(prefix, uri)` bindings, innermost last; the default namespace has
    /// an empty prefix.
    scopes: Vec<(&'a str, &'a str)>,
    path: Vec<String>,
    options: DecodeOptions,
}

impl<'a> Cursor<'a> {
    /// Creates a cursor positioned above the root.
    pub fn new(options: DecodeOptions) -> Self {
        Self {
            scopes: Vec::new(),
            path: Vec::new(),
            options,
        }
    }

    /// Returns the decode options.
    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    /// Returns the slash-separated path of the current element.
    pub fn location(&self) -> String {
        self.path.join("/")
    }

    /// Runs `f` with `el` as the current element. `index` is the position
    /// of `el` among its parent's child elements, if it should be shown.
    pub fn within<T>(
        &mut self,
        el: &'a Element,
        index: Option<usize>,
        f: impl FnOnce(&mut Self) -> Result<T, DecodeError>,
    ) -> Result<T, DecodeError> {
        if self.path.len() >= self.options.max_depth {
            return Err(DecodeError::LimitExceeded {
                location: self.location(),
                limit: "element depth",
                max: self.options.max_depth,
            });
        }

        let mark = self.scopes.len();
        self.scopes.extend(el.namespace_declarations());
        self.path.push(match index {
            Some(i) => format!("{}[{i}]", el.local_name()),
            None => el.local_name().to_string(),
        });

        let result = f(self);

        self.path.pop();
        self.scopes.truncate(mark);
        result
    }

    /// Resolves a namespace prefix against the enclosing declarations.
    pub fn resolve(&self, prefix: &str) -> Option<&'a str> {
        self.scopes
            .iter()
            .rev()
            .find(|(p, _)| *p == prefix)
            .map(|(_, uri)| *uri)
    }

    /// Logs attributes of `el` that are neither known nor namespace
    /// declarations. They are otherwise ignored.
    pub fn skip_unknown_attributes(&self, el: &Element, known: &[&str]) {
        for (name, _) in el.attributes() {
            if name == "xmlns" || name.starts_with("xmlns:") || known.contains(&name) {
                continue;
            }
            trace!(location = %self.location(), attribute = name, "ignoring unknown attribute");
        }
    }

    // =========================================================================
    // Errors
    // =========================================================================

    pub fn unexpected(&self, el: &Element) -> DecodeError {
        DecodeError::UnexpectedElement {
            location: self.location(),
            element: el.name().to_string(),
        }
    }

    pub fn missing_element(&self, element: &'static str) -> DecodeError {
        DecodeError::MissingElement {
            location: self.location(),
            element,
        }
    }

    pub fn model_error(&self, source: ModelError) -> DecodeError {
        DecodeError::Model {
            location: self.location(),
            source,
        }
    }

    pub fn check_limit(&self, count: usize, max: usize, limit: &'static str) -> Result<(), DecodeError> {
        if count > max {
            return Err(DecodeError::LimitExceeded {
                location: self.location(),
                limit,
                max,
            });
        }
        Ok(())
    }

    // =========================================================================
    // Attributes
    // =========================================================================

    /// Reads a required attribute.
    pub fn required_attr(&self, el: &'a Element, name: &'static str) -> Result<&'a str, DecodeError> {
        el.attribute(name).ok_or_else(|| DecodeError::MissingAttribute {
            location: self.location(),
            attribute: name,
        })
    }

    /// Reads a required DN attribute.
    pub fn dn_attr(&self, el: &'a Element, name: &'static str) -> Result<Dn, DecodeError> {
        let raw = self.required_attr(el, name)?;
        Dn::parse(raw).map_err(|e| self.model_error(e))
    }

    /// Reads an optional DN attribute.
    pub fn optional_dn_attr(&self, el: &'a Element, name: &'static str) -> Result<Option<Dn>, DecodeError> {
        el.attribute(name)
            .map(|raw| Dn::parse(raw).map_err(|e| self.model_error(e)))
            .transpose()
    }

    /// Reads a required RDN attribute.
    pub fn rdn_attr(&self, el: &'a Element, name: &'static str) -> Result<Rdn, DecodeError> {
        let raw = self.required_attr(el, name)?;
        Rdn::parse(raw).map_err(|e| self.model_error(e))
    }

    /// Reads a boolean attribute; `true`/`false` in any case.
    pub fn bool_attr(&self, el: &'a Element, name: &'static str, default: bool) -> Result<bool, DecodeError> {
        match el.attribute(name) {
            None => Ok(default),
            Some(raw) if raw.eq_ignore_ascii_case("true") => Ok(true),
            Some(raw) if raw.eq_ignore_ascii_case("false") => Ok(false),
            Some(raw) => Err(self.invalid_value(name, raw, "true or false")),
        }
    }

    /// Reads a non-negative integer attribute, defaulting to 0.
    pub fn u32_attr(&self, el: &'a Element, name: &'static str) -> Result<u32, DecodeError> {
        match el.attribute(name) {
            None => Ok(0),
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| self.invalid_value(name, raw, "a non-negative integer")),
        }
    }

    /// Reads an optional enumerated attribute.
    pub fn enum_attr<T>(
        &self,
        el: &'a Element,
        name: &'static str,
        parse: fn(&str) -> Option<T>,
        expected: &'static str,
    ) -> Result<Option<T>, DecodeError> {
        match el.attribute(name) {
            None => Ok(None),
            Some(raw) => parse(raw)
                .map(Some)
                .ok_or_else(|| self.invalid_value(name, raw, expected)),
        }
    }

    pub fn invalid_value(&self, attribute: &'static str, value: &str, expected: &'static str) -> DecodeError {
        DecodeError::InvalidValue {
            location: self.location(),
            attribute,
            value: value.to_string(),
            expected,
        }
    }

    // =========================================================================
    // Values
    // =========================================================================

    /// Reads a value-carrying element such as `<value>` or `<controlValue>`.
    ///
    /// Content tagged `xsi:type="…:base64Binary"` becomes a binary value;
    /// anything else is taken as text.
    pub fn read_value(&mut self, el: &'a Element, index: Option<usize>) -> Result<Value, DecodeError> {
        self.within(el, index, |cursor| {
            if let Some(child) = el.child_elements().next() {
                return Err(cursor.unexpected(child));
            }
            let text = el.text();
            if cursor.is_base64(el) {
                base64_decode(&text)
                    .map(Value::Binary)
                    .map_err(|e| DecodeError::InvalidBase64 {
                        location: cursor.location(),
                        message: e.to_string(),
                    })
            } else {
                Ok(Value::String(text.into_owned()))
            }
        })
    }

    fn is_base64(&self, el: &Element) -> bool {
        el.attributes().any(|(name, value)| {
            let (prefix, local) = split_qname(name);
            local == "type"
                && prefix.is_some_and(|p| self.is_xsi_prefix(p))
                && split_qname(value).1 == BASE64_BINARY
        })
    }

    /// A prefix not bound in scope counts as XSI when it is literally `xsi`,
    /// so fragments detached from their root still decode.
    fn is_xsi_prefix(&self, prefix: &str) -> bool {
        match self.resolve(prefix) {
            Some(uri) => uri == XML_SCHEMA_INSTANCE_NAMESPACE,
            None => prefix == XSI_PREFIX,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_byte_predicate_boundaries() {
        assert!(byte_needs_base64(0x00));
        assert!(byte_needs_base64(0x09));
        assert!(!byte_needs_base64(0x0A));
        assert!(!byte_needs_base64(0x0D));
        assert!(byte_needs_base64(0x1F));
        assert!(!byte_needs_base64(0x20));
        assert!(!byte_needs_base64(0x7F));
        assert!(byte_needs_base64(0x80));
        assert!(byte_needs_base64(0xFF));
    }

    #[test]
    fn test_value_predicate() {
        assert!(!value_needs_base64(&Value::from("line1\nline2\r\n"), false));
        assert!(value_needs_base64(&Value::from("line1\nline2\tline3"), false));
        assert!(value_needs_base64(&Value::from("café"), false));
        assert!(value_needs_base64(&Value::from("plain"), true));
        assert!(value_needs_base64(&Value::Binary(b"plain".to_vec()), false));
    }

    #[test]
    fn test_base64_codec() {
        assert_eq!(base64_encode(&[0xFF, 0x00, 0x7F]), "/wB/");
        assert_eq!(base64_decode(" /w\nB/ ").unwrap(), vec![0xFF, 0x00, 0x7F]);
        assert!(base64_decode("not base64!").is_err());
    }

    #[test]
    fn test_read_value_framing() {
        let root = Element::parse(concat!(
            r#"<r xmlns:x="http://www.w3.org/2001/XMLSchema-instance">"#,
            r#"<value x:type="xsd:base64Binary">/wB/</value>"#,
            r#"<value>alice</value>"#,
            r#"<value xsi:type="xsd:base64Binary">YQ==</value>"#,
            r#"<value xmlns:xsi="urn:other" xsi:type="xsd:base64Binary">YQ==</value>"#,
            r#"</r>"#
        ))
        .unwrap();

        let mut cursor = Cursor::new(DecodeOptions::default());
        let values = cursor
            .within(&root, None, |c| {
                root.child_elements()
                    .enumerate()
                    .map(|(i, el)| c.read_value(el, Some(i)))
                    .collect::<Result<Vec<_>, _>>()
            })
            .unwrap();

        assert_eq!(values[0], Value::Binary(vec![0xFF, 0x00, 0x7F]));
        assert_eq!(values[1], Value::from("alice"));
        // unbound `xsi` prefix is accepted
        assert_eq!(values[2], Value::Binary(b"a".to_vec()));
        // `xsi` bound to something else is not XSI
        assert_eq!(values[3], Value::from("YQ=="));
    }

    #[test]
    fn test_bad_base64_reports_location() {
        let root = Element::parse(r#"<r><value xsi:type="xsd:base64Binary">@@@</value></r>"#).unwrap();
        let mut cursor = Cursor::new(DecodeOptions::default());
        let err = cursor
            .within(&root, None, |c| c.read_value(root.find_child("value").unwrap(), Some(0)))
            .unwrap_err();
        match err {
            DecodeError::InvalidBase64 { location, .. } => assert_eq!(location, "r/value[0]"),
            other => panic!("expected InvalidBase64, got {other:?}"),
        }
    }

    #[test]
    fn test_bool_attr_literals() {
        let el = Element::parse(r#"<e a="TRUE" b="False" c="yes"/>"#).unwrap();
        let cursor = Cursor::new(DecodeOptions::default());
        assert!(cursor.bool_attr(&el, "a", false).unwrap());
        assert!(!cursor.bool_attr(&el, "b", true).unwrap());
        assert!(cursor.bool_attr(&el, "missing", true).unwrap());
        assert!(matches!(
            cursor.bool_attr(&el, "c", true),
            Err(DecodeError::InvalidValue { .. })
        ));
    }

    proptest! {
        #[test]
        fn prop_predicate_matches_rule(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
            let expected = bytes.iter().any(|&b| b > 0x7F || (b < 0x20 && b != 0x0A && b != 0x0D));
            prop_assert_eq!(needs_base64(&bytes), expected);
        }

        #[test]
        fn prop_base64_recovers_bytes(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
            prop_assert_eq!(base64_decode(&base64_encode(&bytes)).unwrap(), bytes);
        }
    }
}
