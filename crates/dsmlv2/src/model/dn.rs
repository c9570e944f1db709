//! Distinguished names and relative distinguished names (RFC 4514).
//!
//! Both types keep two textual forms:
//! - the *user-supplied* form, emitted verbatim in DSMLv2 `dn`/`newrdn`
//!   attributes
//! - the *canonical* form (lowercased types, insignificant whitespace
//!   removed, multi-valued RDNs sorted), used for equality and hashing

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::error::ModelError;

/// Characters that may follow a backslash in an attribute value.
const ESCAPABLE: &[char] = &[',', '+', '"', '\\', '<', '>', ';', '=', '#', ' '];

/// One `type=value` pair of an RDN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ava {
    attr_type: String,
    value: String,
    /// Value was written in `#hexstring` form and is kept verbatim.
    hex: bool,
}

impl Ava {
    /// Creates a pair from an attribute type and an unescaped value.
    pub fn new(attr_type: impl Into<String>, value: impl Into<String>) -> Result<Self, ModelError> {
        let attr_type = attr_type.into().trim().to_string();
        let value = value.into();
        if !is_valid_type(&attr_type) {
            return Err(ModelError::InvalidRdn {
                input: format!("{attr_type}={value}"),
                reason: "attribute type is empty or malformed",
            });
        }
        Ok(Self {
            attr_type,
            value,
            hex: false,
        })
    }

    /// Returns the attribute type as written.
    pub fn attr_type(&self) -> &str {
        &self.attr_type
    }

    /// Returns the unescaped value.
    pub fn value(&self) -> &str {
        &self.value
    }

    fn escaped_value(&self) -> String {
        if self.hex {
            self.value.clone()
        } else {
            escape_value(&self.value)
        }
    }

    fn user_form(&self) -> String {
        format!("{}={}", self.attr_type, self.escaped_value())
    }
}

/// A relative distinguished name: one or more attribute-value pairs.
#[derive(Debug, Clone)]
pub struct Rdn {
    avas: Vec<Ava>,
    up: String,
    canonical: String,
}

impl Rdn {
    /// Creates a single-valued RDN.
    pub fn new(attr_type: impl Into<String>, value: impl Into<String>) -> Result<Self, ModelError> {
        Self::from_avas(vec![Ava::new(attr_type, value)?])
    }

    /// Creates an RDN from its pairs. The user form keeps the given order.
    pub fn from_avas(avas: Vec<Ava>) -> Result<Self, ModelError> {
        if avas.is_empty() {
            return Err(ModelError::InvalidRdn {
                input: String::new(),
                reason: "RDN has no attribute-value pair",
            });
        }
        let up = avas.iter().map(Ava::user_form).collect::<Vec<_>>().join("+");
        let canonical = canonical_rdn(&avas);
        Ok(Self { avas, up, canonical })
    }

    /// Parses an RDN such as `cn=John Smith+uid=jsmith`.
    pub fn parse(input: &str) -> Result<Self, ModelError> {
        let invalid = |reason: &'static str| ModelError::InvalidRdn {
            input: input.to_string(),
            reason,
        };
        let up = trim_unescaped(input);
        if split_unescaped(up, &[',', ';']).map_err(invalid)?.len() > 1 {
            return Err(invalid("RDN contains a DN separator"));
        }
        Self::parse_component(up).map_err(invalid)
    }

    fn parse_component(raw: &str) -> Result<Self, &'static str> {
        let up = trim_unescaped(raw);
        if up.is_empty() {
            return Err("empty RDN");
        }

        let mut avas = Vec::new();
        for part in split_unescaped(up, &['+'])? {
            let eq = find_unescaped(part, '=').ok_or("missing '=' in attribute-value pair")?;
            let attr_type = part[..eq].trim();
            if !is_valid_type(attr_type) {
                return Err("attribute type is empty or malformed");
            }
            let (value, hex) = unescape_value(&part[eq + 1..])?;
            avas.push(Ava {
                attr_type: attr_type.to_string(),
                value,
                hex,
            });
        }

        let canonical = canonical_rdn(&avas);
        Ok(Self {
            avas,
            up: up.to_string(),
            canonical,
        })
    }

    /// Returns the attribute-value pairs in user order.
    pub fn avas(&self) -> &[Ava] {
        &self.avas
    }

    /// Returns the attribute type of the first pair.
    pub fn attr_type(&self) -> &str {
        self.avas[0].attr_type()
    }

    /// Returns the value of the first pair.
    pub fn value(&self) -> &str {
        self.avas[0].value()
    }

    /// Returns true if this RDN has more than one pair.
    pub fn is_multi_valued(&self) -> bool {
        self.avas.len() > 1
    }

    /// Returns the user-supplied textual form.
    pub fn up_name(&self) -> &str {
        &self.up
    }

    /// Returns the canonical textual form.
    pub fn canonical(&self) -> &str {
        &self.canonical
    }
}

impl PartialEq for Rdn {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical
    }
}

impl Eq for Rdn {}

impl Hash for Rdn {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical.hash(state);
    }
}

impl fmt::Display for Rdn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.up)
    }
}

impl FromStr for Rdn {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A distinguished name: an ordered sequence of RDNs, leaf first.
///
/// The empty DN (the root DSE) is valid.
#[derive(Debug, Clone, Default)]
pub struct Dn {
    rdns: Vec<Rdn>,
    up: String,
    canonical: String,
}

impl Dn {
    /// Returns the empty DN.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parses a DN such as `cn=alice,ou=people,dc=example,dc=com`.
    ///
    /// Both `,` and the legacy `;` separate RDNs.
    pub fn parse(input: &str) -> Result<Self, ModelError> {
        let invalid = |reason: &'static str| ModelError::InvalidDn {
            input: input.to_string(),
            reason,
        };
        let up = trim_unescaped(input);
        if up.is_empty() {
            return Ok(Self::empty());
        }

        let mut rdns = Vec::new();
        for raw in split_unescaped(up, &[',', ';']).map_err(invalid)? {
            rdns.push(Rdn::parse_component(raw).map_err(invalid)?);
        }

        let canonical = canonical_dn(&rdns);
        Ok(Self {
            rdns,
            up: up.to_string(),
            canonical,
        })
    }

    /// Builds a DN from RDNs; the user form joins their user forms with `,`.
    pub fn from_rdns(rdns: Vec<Rdn>) -> Self {
        let up = rdns.iter().map(Rdn::up_name).collect::<Vec<_>>().join(",");
        let canonical = canonical_dn(&rdns);
        Self { rdns, up, canonical }
    }

    /// Returns the RDNs, leaf first.
    pub fn rdns(&self) -> &[Rdn] {
        &self.rdns
    }

    /// Returns the leaf RDN, or None for the empty DN.
    pub fn rdn(&self) -> Option<&Rdn> {
        self.rdns.first()
    }

    /// Returns the number of RDNs.
    pub fn len(&self) -> usize {
        self.rdns.len()
    }

    /// Returns true for the empty DN.
    pub fn is_empty(&self) -> bool {
        self.rdns.is_empty()
    }

    /// Returns the DN with the leaf RDN removed, or None for the empty DN.
    pub fn parent(&self) -> Option<Dn> {
        if self.rdns.is_empty() {
            return None;
        }
        Some(Self::from_rdns(self.rdns[1..].to_vec()))
    }

    /// Returns a new DN with `rdn` prepended as the leaf.
    pub fn child(&self, rdn: Rdn) -> Dn {
        let mut rdns = Vec::with_capacity(self.rdns.len() + 1);
        rdns.push(rdn);
        rdns.extend(self.rdns.iter().cloned());
        Self::from_rdns(rdns)
    }

    /// Returns the user-supplied textual form.
    pub fn up_name(&self) -> &str {
        &self.up
    }

    /// Returns the canonical textual form.
    pub fn canonical(&self) -> &str {
        &self.canonical
    }
}

impl PartialEq for Dn {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical
    }
}

impl Eq for Dn {}

impl Hash for Dn {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical.hash(state);
    }
}

impl fmt::Display for Dn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.up)
    }
}

impl FromStr for Dn {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Escapes an attribute value for its RFC 4514 string form.
pub fn escape_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let last = value.chars().count().saturating_sub(1);
    for (i, c) in value.chars().enumerate() {
        match c {
            ',' | '+' | '"' | '\\' | '<' | '>' | ';' | '=' => {
                out.push('\\');
                out.push(c);
            }
            '#' if i == 0 => out.push_str("\\#"),
            ' ' if i == 0 || i == last => out.push_str("\\ "),
            '\0' => out.push_str("\\00"),
            _ => out.push(c),
        }
    }
    out
}

fn canonical_rdn(avas: &[Ava]) -> String {
    let mut pairs: Vec<(String, String)> = avas
        .iter()
        .map(|ava| (ava.attr_type.to_ascii_lowercase(), ava.escaped_value()))
        .collect();
    pairs.sort();
    pairs
        .into_iter()
        .map(|(t, v)| format!("{t}={v}"))
        .collect::<Vec<_>>()
        .join("+")
}

fn canonical_dn(rdns: &[Rdn]) -> String {
    rdns.iter().map(Rdn::canonical).collect::<Vec<_>>().join(",")
}

fn is_valid_type(attr_type: &str) -> bool {
    attr_type.chars().next().is_some_and(|c| c.is_ascii_alphanumeric())
        && attr_type
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
}

/// Trims surrounding whitespace, keeping a trailing space that is escaped.
fn trim_unescaped(s: &str) -> &str {
    let s = s.trim_start();
    let end = s.trim_end().len();
    let backslashes = s[..end].bytes().rev().take_while(|&b| b == b'\\').count();
    if backslashes % 2 == 1 && end < s.len() {
        let next_len = s[end..].chars().next().map_or(0, char::len_utf8);
        &s[..end + next_len]
    } else {
        &s[..end]
    }
}

/// Splits on separators that are neither escaped nor inside quotes.
fn split_unescaped<'s>(input: &'s str, separators: &[char]) -> Result<Vec<&'s str>, &'static str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut escaped = false;
    let mut quoted = false;

    for (i, c) in input.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '"' => quoted = !quoted,
            c if !quoted && separators.contains(&c) => {
                parts.push(&input[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }

    if escaped {
        return Err("dangling escape at end of input");
    }
    if quoted {
        return Err("unterminated quoted value");
    }
    parts.push(&input[start..]);
    Ok(parts)
}

fn find_unescaped(input: &str, target: char) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in input.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == target {
            return Some(i);
        }
    }
    None
}

/// Unescapes a raw value. Returns the value and whether it was `#hex` form.
fn unescape_value(raw: &str) -> Result<(String, bool), &'static str> {
    let raw = raw.trim_start();
    if raw.starts_with('#') {
        return Ok((raw.trim_end().to_string(), true));
    }
    if let Some(inner) = raw.strip_prefix('"') {
        let body = inner
            .trim_end()
            .strip_suffix('"')
            .ok_or("unterminated quoted value")?;
        return unescape_chars(body, false).map(|v| (v, false));
    }
    unescape_chars(raw, true).map(|v| (v, false))
}

fn unescape_chars(raw: &str, trim_end: bool) -> Result<String, &'static str> {
    let mut out = String::with_capacity(raw.len());
    let mut pending = Vec::new();
    let mut significant = 0;
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c == '\\' {
            let next = chars.next().ok_or("dangling escape")?;
            if let Some(high) = next.to_digit(16) {
                let low = chars
                    .next()
                    .and_then(|c| c.to_digit(16))
                    .ok_or("malformed hex escape")?;
                pending.push(((high << 4) | low) as u8);
                continue;
            }
            if !ESCAPABLE.contains(&next) {
                return Err("invalid escape sequence");
            }
            flush_pending(&mut pending, &mut out)?;
            out.push(next);
            significant = out.len();
        } else {
            if flush_pending(&mut pending, &mut out)? {
                significant = out.len();
            }
            out.push(c);
            if !c.is_whitespace() {
                significant = out.len();
            }
        }
    }
    if flush_pending(&mut pending, &mut out)? {
        significant = out.len();
    }

    if trim_end {
        out.truncate(significant);
    }
    Ok(out)
}

/// Appends hex-escaped bytes as UTF-8. Returns true if anything was flushed.
fn flush_pending(pending: &mut Vec<u8>, out: &mut String) -> Result<bool, &'static str> {
    if pending.is_empty() {
        return Ok(false);
    }
    let text = std::str::from_utf8(pending).map_err(|_| "hex escape is not valid UTF-8")?;
    out.push_str(text);
    pending.clear();
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_simple_dn() {
        let dn = Dn::parse("cn=alice,ou=people,dc=ex,dc=com").unwrap();
        assert_eq!(dn.len(), 4);
        assert_eq!(dn.rdn().unwrap().attr_type(), "cn");
        assert_eq!(dn.rdn().unwrap().value(), "alice");
        assert_eq!(dn.up_name(), "cn=alice,ou=people,dc=ex,dc=com");
    }

    #[test]
    fn test_canonical_equality() {
        let a = Dn::parse("CN=Alice , OU=People").unwrap();
        let b = Dn::parse("cn=Alice,ou=People").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.canonical(), "cn=Alice,ou=People");
        // user form is kept
        assert_eq!(a.up_name(), "CN=Alice , OU=People");
    }

    #[test]
    fn test_multi_valued_rdn_order() {
        let a = Rdn::parse("cn=a+sn=b").unwrap();
        let b = Rdn::parse("sn=b + cn=a").unwrap();
        assert!(a.is_multi_valued());
        assert_eq!(a, b);
        assert_eq!(b.canonical(), "cn=a+sn=b");
        assert_eq!(b.up_name(), "sn=b + cn=a");
    }

    #[test]
    fn test_escapes() {
        let dn = Dn::parse(r"cn=Smith\, John,dc=ex").unwrap();
        assert_eq!(dn.len(), 2);
        assert_eq!(dn.rdn().unwrap().value(), "Smith, John");

        let dn = Dn::parse(r"cn=caf\C3\A9").unwrap();
        assert_eq!(dn.rdn().unwrap().value(), "café");

        let dn = Dn::parse(r#"cn="a,b",dc=ex"#).unwrap();
        assert_eq!(dn.len(), 2);
        assert_eq!(dn.rdn().unwrap().value(), "a,b");

        let dn = Dn::parse(r"cn=foo\ ").unwrap();
        assert_eq!(dn.rdn().unwrap().value(), "foo ");
    }

    #[test]
    fn test_hex_value_kept_verbatim() {
        let rdn = Rdn::parse("1.3.6.1.4.1.1466.0=#04024869").unwrap();
        assert_eq!(rdn.value(), "#04024869");
        assert_eq!(rdn.canonical(), "1.3.6.1.4.1.1466.0=#04024869");
    }

    #[test]
    fn test_empty_dn() {
        let dn = Dn::parse("  ").unwrap();
        assert!(dn.is_empty());
        assert_eq!(dn.up_name(), "");
        assert_eq!(dn, Dn::empty());
        assert!(dn.parent().is_none());
    }

    #[test]
    fn test_malformed_dns() {
        for input in ["cn", "=x", "cn=a,,dc=b", r"cn=a\", r"cn=\zz", r#"cn="abc"#, "c n=x"] {
            let err = Dn::parse(input).unwrap_err();
            assert!(
                matches!(err, ModelError::InvalidDn { .. }),
                "{input:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn test_rdn_rejects_separator() {
        assert!(Rdn::parse("cn=a,dc=b").is_err());
        assert!(Rdn::parse("").is_err());
        assert!(Rdn::from_avas(Vec::new()).is_err());
    }

    #[test]
    fn test_parent_and_child() {
        let dn = Dn::parse("cn=x,ou=a").unwrap();
        let parent = dn.parent().unwrap();
        assert_eq!(parent.up_name(), "ou=a");

        let moved = parent.child(Rdn::new("cn", "y").unwrap());
        assert_eq!(moved.up_name(), "cn=y,ou=a");
    }

    #[test]
    fn test_escape_value() {
        assert_eq!(escape_value("a,b"), r"a\,b");
        assert_eq!(escape_value("#x"), r"\#x");
        assert_eq!(escape_value(" x "), r"\ x\ ");
        assert_eq!(escape_value("plain"), "plain");
    }

    proptest! {
        #[test]
        fn prop_dn_reparses_from_user_form(
            pairs in proptest::collection::vec(("[a-z][a-z0-9]{0,7}", "[ -~]{0,12}"), 1..5)
        ) {
            let rdns: Vec<Rdn> = pairs
                .iter()
                .map(|(t, v)| Rdn::new(t.as_str(), v.as_str()).unwrap())
                .collect();
            let dn = Dn::from_rdns(rdns);
            let reparsed = Dn::parse(dn.up_name()).unwrap();
            prop_assert_eq!(&reparsed, &dn);
            for (rdn, (_, v)) in reparsed.rdns().iter().zip(pairs.iter()) {
                prop_assert_eq!(rdn.value(), v.as_str());
            }
        }
    }
}
