//! Attribute values and attributes.

use crate::error::ModelError;

/// A single attribute value, tagged as text or raw bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    /// UTF-8 text.
    String(String),
    /// Opaque octets, always emitted base64-framed.
    Binary(Vec<u8>),
}

impl Value {
    /// Returns the raw bytes of the value.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Value::String(s) => s.as_bytes(),
            Value::Binary(b) => b,
        }
    }

    /// Returns the text if this is a string-form value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            Value::Binary(_) => None,
        }
    }

    /// Returns true for binary-form values.
    pub fn is_binary(&self) -> bool {
        matches!(self, Value::Binary(_))
    }

    /// Returns the payload length in bytes.
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Returns true if the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Binary(b)
    }
}

impl From<&[u8]> for Value {
    fn from(b: &[u8]) -> Self {
        Value::Binary(b.to_vec())
    }
}

/// Returns true if an attribute description carries the `;binary` option.
pub fn has_binary_option(description: &str) -> bool {
    description
        .split(';')
        .skip(1)
        .any(|opt| opt.eq_ignore_ascii_case("binary"))
}

/// A named, ordered sequence of values.
///
/// The identifier is an attribute description: a type optionally followed
/// by `;`-separated options (e.g. `userCertificate;binary`). Equality
/// compares the description and the values; the binary flag is an encoding
/// policy and is not part of it.
#[derive(Debug, Clone)]
pub struct Attribute {
    id: String,
    values: Vec<Value>,
    /// Binary by syntax: every value is emitted base64-framed.
    binary: bool,
}

impl PartialEq for Attribute {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.values == other.values
    }
}

impl Eq for Attribute {}

impl Attribute {
    /// Creates an attribute with no values.
    ///
    /// The binary flag is set when the description carries the `;binary`
    /// transfer option.
    pub fn new(id: impl Into<String>) -> Result<Self, ModelError> {
        let id = id.into().trim().to_string();
        if id.is_empty() {
            return Err(ModelError::EmptyAttributeId);
        }
        let binary = has_binary_option(&id);
        Ok(Self {
            id,
            values: Vec::new(),
            binary,
        })
    }

    /// Creates an attribute with the given values, in order.
    pub fn with_values<V: Into<Value>>(
        id: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Result<Self, ModelError> {
        let mut attr = Self::new(id)?;
        attr.values.extend(values.into_iter().map(Into::into));
        Ok(attr)
    }

    /// Marks the attribute as binary by syntax.
    pub fn binary(mut self, binary: bool) -> Self {
        self.binary = binary;
        self
    }

    /// Returns the attribute description.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the attribute type without options.
    pub fn base_type(&self) -> &str {
        self.id.split(';').next().unwrap_or(&self.id)
    }

    /// Returns true if the attribute is binary by syntax.
    pub fn is_binary(&self) -> bool {
        self.binary
    }

    /// Returns the values in insertion order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Appends a value.
    pub fn push(&mut self, value: impl Into<Value>) {
        self.values.push(value.into());
    }

    /// Returns the number of values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the attribute has no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
