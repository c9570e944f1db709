//! Directory entries: a DN plus uniquely named, ordered attributes.

use rustc_hash::FxHashMap;

use crate::error::ModelError;
use crate::model::{Attribute, Dn, Value};

/// An entry under construction for an Add request.
///
/// Attribute identifiers are unique case-insensitively; insertion order
/// of attributes and of their values is preserved.
#[derive(Debug, Clone, Default)]
pub struct Entry {
    dn: Option<Dn>,
    attributes: Vec<Attribute>,
    /// Lowercased identifier -> position in `attributes`.
    index: FxHashMap<String, usize>,
}

impl Entry {
    /// Creates an entry with no DN and no attributes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty entry with the given DN.
    pub fn with_dn(dn: Dn) -> Self {
        Self {
            dn: Some(dn),
            ..Self::default()
        }
    }

    /// Returns the DN, if set.
    pub fn dn(&self) -> Option<&Dn> {
        self.dn.as_ref()
    }

    /// Sets the DN.
    pub fn set_dn(&mut self, dn: Dn) {
        self.dn = Some(dn);
    }

    /// Returns the attributes in insertion order.
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Looks up an attribute by identifier, ignoring case.
    pub fn get(&self, id: &str) -> Option<&Attribute> {
        self.index
            .get(&id.to_ascii_lowercase())
            .map(|&i| &self.attributes[i])
    }

    /// Returns true if an attribute with this identifier exists.
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(&id.to_ascii_lowercase())
    }

    /// Returns the number of attributes.
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Returns true if the entry has no attributes.
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Appends a whole attribute. Fails if the identifier is already present.
    pub fn push_attribute(&mut self, attribute: Attribute) -> Result<(), ModelError> {
        let key = attribute.id().to_ascii_lowercase();
        if self.index.contains_key(&key) {
            return Err(ModelError::DuplicateAttribute {
                id: attribute.id().to_string(),
            });
        }
        self.index.insert(key, self.attributes.len());
        self.attributes.push(attribute);
        Ok(())
    }

    /// Appends values to the named attribute, creating it if needed.
    pub fn add_values<V: Into<Value>>(
        &mut self,
        id: &str,
        values: impl IntoIterator<Item = V>,
    ) -> Result<(), ModelError> {
        let key = id.trim().to_ascii_lowercase();
        let position = match self.index.get(&key) {
            Some(&i) => i,
            None => {
                self.push_attribute(Attribute::new(id)?)?;
                self.attributes.len() - 1
            }
        };
        let attribute = &mut self.attributes[position];
        for value in values {
            attribute.push(value);
        }
        Ok(())
    }

    /// Appends a single value to the named attribute, creating it if needed.
    pub fn add_value(&mut self, id: &str, value: impl Into<Value>) -> Result<(), ModelError> {
        self.add_values(id, [value.into()])
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.dn == other.dn && self.attributes == other.attributes
    }
}

impl Eq for Entry {}

impl<'a> IntoIterator for &'a Entry {
    type Item = &'a Attribute;
    type IntoIter = std::slice::Iter<'a, Attribute>;

    fn into_iter(self) -> Self::IntoIter {
        self.attributes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_lookup() {
        let mut entry = Entry::new();
        entry.add_value("objectClass", "person").unwrap();
        entry.add_value("OBJECTCLASS", "top").unwrap();

        assert_eq!(entry.len(), 1);
        let oc = entry.get("objectclass").unwrap();
        assert_eq!(oc.id(), "objectClass");
        assert_eq!(oc.values(), &[Value::from("person"), Value::from("top")]);
    }

    #[test]
    fn test_duplicate_push_is_inconsistent() {
        let mut entry = Entry::new();
        entry.push_attribute(Attribute::new("cn").unwrap()).unwrap();
        let err = entry
            .push_attribute(Attribute::new("CN").unwrap())
            .unwrap_err();
        assert_eq!(err, ModelError::DuplicateAttribute { id: "CN".into() });
        assert_eq!(err.kind(), crate::ErrorKind::Inconsistent);
    }

    #[test]
    fn test_insertion_order() {
        let mut entry = Entry::with_dn(Dn::parse("cn=a").unwrap());
        entry.add_value("sn", "b").unwrap();
        entry.add_value("cn", "a").unwrap();
        entry.add_values("mail", Vec::<Value>::new()).unwrap();

        let ids: Vec<&str> = entry.attributes().iter().map(Attribute::id).collect();
        assert_eq!(ids, ["sn", "cn", "mail"]);
        assert!(entry.get("mail").unwrap().is_empty());
    }
}
