//! Search filters (RFC 4511 Section 4.5.1).

use crate::model::Value;

/// A search filter tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    EqualityMatch(AttributeValueAssertion),
    Substrings(SubstringFilter),
    GreaterOrEqual(AttributeValueAssertion),
    LessOrEqual(AttributeValueAssertion),
    Present(String),
    ApproxMatch(AttributeValueAssertion),
    ExtensibleMatch(ExtensibleMatch),
}

impl Filter {
    /// Builds an equality filter.
    pub fn equality(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::EqualityMatch(AttributeValueAssertion::new(name, value))
    }

    /// Builds a presence filter.
    pub fn present(name: impl Into<String>) -> Self {
        Filter::Present(name.into())
    }

    /// Builds a negation.
    pub fn negate(filter: Filter) -> Self {
        Filter::Not(Box::new(filter))
    }

    /// Returns the nesting depth; leaf filters have depth 1.
    pub fn depth(&self) -> usize {
        match self {
            Filter::And(children) | Filter::Or(children) => {
                1 + children.iter().map(Filter::depth).max().unwrap_or(0)
            }
            Filter::Not(inner) => 1 + inner.depth(),
            _ => 1,
        }
    }
}

/// An attribute description and an assertion value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeValueAssertion {
    pub name: String,
    pub value: Value,
}

impl AttributeValueAssertion {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A substring assertion; at least one component must be present.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubstringFilter {
    pub name: String,
    pub initial: Option<Value>,
    pub any: Vec<Value>,
    pub final_: Option<Value>,
}

impl SubstringFilter {
    /// Returns true if no component is set.
    pub fn is_empty(&self) -> bool {
        self.initial.is_none() && self.any.is_empty() && self.final_.is_none()
    }
}

/// An extensible match assertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensibleMatch {
    pub matching_rule: Option<String>,
    pub name: Option<String>,
    pub value: Value,
    pub dn_attributes: bool,
}
