//! Argument Value Module
//!
//! Defines the dynamic argument value type that cache keys are built from.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

// == Cache Key ==
/// A cache key: the ordered sequence of argument values a call was made
/// with, or a single derived composite value (serialized key mode).
///
/// Keys are immutable once stored. Equality between keys is always delegated
/// to the active [`KeyComparator`](crate::key::KeyComparator), never to
/// structural identity of the container.
pub type CacheKey = Vec<Arg>;

// == Argument Value ==
/// A single argument value.
///
/// Composite variants (`List`, `Map`, `Element`) are reference-counted so
/// that the shallow comparator can test pointer identity, the way reference
/// equality behaves in dynamic languages. Cloning an `Arg` is cheap.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Arg {
    /// Absent / null value
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Floating-point value
    Float(f64),
    /// String value
    Str(String),
    /// Ordered list of values, compared by identity in shallow mode
    List(Arc<Vec<Arg>>),
    /// String-keyed map of values, compared by identity in shallow mode
    Map(Arc<BTreeMap<String, Arg>>),
    /// UI-element-like composite value (see [`Element`])
    Element(Arc<Element>),
}

impl Arg {
    // == List Constructor ==
    /// Creates a list argument from the given values.
    pub fn list(values: impl Into<Vec<Arg>>) -> Self {
        Arg::List(Arc::new(values.into()))
    }

    // == Map Constructor ==
    /// Creates a map argument from the given entries.
    pub fn map(entries: impl IntoIterator<Item = (String, Arg)>) -> Self {
        Arg::Map(Arc::new(entries.into_iter().collect()))
    }

    // == Element Constructor ==
    /// Creates an element argument.
    pub fn element(element: Element) -> Self {
        Arg::Element(Arc::new(element))
    }

    /// Returns the element payload, if this value is an element.
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Arg::Element(element) => Some(element),
            _ => None,
        }
    }
}

// == Primitive Conversions ==
impl From<bool> for Arg {
    fn from(value: bool) -> Self {
        Arg::Bool(value)
    }
}

impl From<i64> for Arg {
    fn from(value: i64) -> Self {
        Arg::Int(value)
    }
}

impl From<i32> for Arg {
    fn from(value: i32) -> Self {
        Arg::Int(value as i64)
    }
}

impl From<f64> for Arg {
    fn from(value: f64) -> Self {
        Arg::Float(value)
    }
}

impl From<&str> for Arg {
    fn from(value: &str) -> Self {
        Arg::Str(value.to_string())
    }
}

impl From<String> for Arg {
    fn from(value: String) -> Self {
        Arg::Str(value)
    }
}

// == Element ==
/// A UI-element-like composite value: a kind tag, an optional stable
/// identity field, and a bag of named properties.
///
/// This is the one composite type the single-element comparator treats
/// specially, comparing the identity fields plus a shallow diff of the
/// property bag instead of pointer identity.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Element {
    /// Element kind (component or tag name)
    pub kind: String,
    /// Stable identity field, when the producer assigned one
    pub id: Option<String>,
    /// Named properties
    pub props: BTreeMap<String, Arg>,
}

impl Element {
    // == Constructor ==
    /// Creates a new element with the given kind and no properties.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: None,
            props: BTreeMap::new(),
        }
    }

    /// Sets the stable identity field.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Adds a named property.
    pub fn with_prop(mut self, name: impl Into<String>, value: impl Into<Arg>) -> Self {
        self.props.insert(name.into(), value.into());
        self
    }
}

// == Key Serialization ==
/// Derives the canonical string form of a key for the serialized
/// key-comparison mode.
///
/// Non-finite floats render as `null` (matching JSON stringification in
/// dynamic languages); any other serialization failure falls back to the
/// debug rendering rather than failing the call.
pub fn serialize_key(key: &[Arg]) -> String {
    serde_json::to_string(key).unwrap_or_else(|_| format!("{key:?}"))
}
