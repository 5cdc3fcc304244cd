//! Native value kinds held by a partition
//!
//! Every entry in a partition is one of six native kinds. Values are stored as
//! JSON of the shape `{"type": "<Kind>", "value": <value>}` so that a dump of a
//! partition carries its own type labels.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The fixed set of kinds a partition can hold natively
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NativeKind {
    /// `bool`
    Boolean,
    /// 32-bit signed integer
    Int,
    /// 32-bit float
    Float,
    /// 64-bit signed integer
    Long,
    /// UTF-8 string
    String,
    /// Ordered set of strings
    StringSet,
}

impl NativeKind {
    /// Name used in the `type` field of a stored entry
    pub fn as_str(&self) -> &'static str {
        match self {
            NativeKind::Boolean => "Boolean",
            NativeKind::Int => "Int",
            NativeKind::Float => "Float",
            NativeKind::Long => "Long",
            NativeKind::String => "String",
            NativeKind::StringSet => "StringSet",
        }
    }
}

impl fmt::Display for NativeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An ordered, insertion-preserving collection of strings
///
/// Building one through [`FromIterator`] or [`StringSet::insert`] drops
/// duplicates. Position is stable once stored, so position 0 can carry meaning
/// (the typed-set codec keeps its type tag there).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StringSet(Vec<String>);

impl StringSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Wrap an already ordered list without deduplicating it
    ///
    /// Used for layouts where the first element is structural and may equal a
    /// later member.
    pub fn from_ordered(items: Vec<String>) -> Self {
        Self(items)
    }

    /// Append a string unless it is already present; returns whether it was added
    pub fn insert(&mut self, item: impl Into<String>) -> bool {
        let item = item.into();
        if self.0.contains(&item) {
            return false;
        }
        self.0.push(item);
        true
    }

    /// Element at a position
    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set has no elements
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in stored order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Borrow the elements in stored order
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl<S: Into<String>> FromIterator<S> for StringSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = StringSet::new();
        for item in iter {
            set.insert(item);
        }
        set
    }
}

impl IntoIterator for StringSet {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// A value of one of the native kinds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum NativeValue {
    /// Boolean value
    Boolean(bool),
    /// 32-bit integer value
    Int(i32),
    /// 32-bit float value
    Float(#[serde(with = "float_text")] f32),
    /// 64-bit integer value
    Long(i64),
    /// String value
    String(String),
    /// String set value
    StringSet(StringSet),
}

/// JSON numbers cannot hold non-finite floats; those are written as the
/// strings `NaN`, `Infinity` and `-Infinity` instead
mod float_text {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f32, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_nan() {
            serializer.serialize_str("NaN")
        } else if *value == f32::INFINITY {
            serializer.serialize_str("Infinity")
        } else if *value == f32::NEG_INFINITY {
            serializer.serialize_str("-Infinity")
        } else {
            serializer.serialize_f32(*value)
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f32),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f32, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(f) => Ok(f),
            Repr::Text(text) => match text.as_str() {
                "NaN" => Ok(f32::NAN),
                "Infinity" => Ok(f32::INFINITY),
                "-Infinity" => Ok(f32::NEG_INFINITY),
                other => Err(de::Error::invalid_value(
                    de::Unexpected::Str(other),
                    &"a number, NaN, Infinity or -Infinity",
                )),
            },
        }
    }
}

impl NativeValue {
    /// Kind of this value
    pub fn kind(&self) -> NativeKind {
        match self {
            NativeValue::Boolean(_) => NativeKind::Boolean,
            NativeValue::Int(_) => NativeKind::Int,
            NativeValue::Float(_) => NativeKind::Float,
            NativeValue::Long(_) => NativeKind::Long,
            NativeValue::String(_) => NativeKind::String,
            NativeValue::StringSet(_) => NativeKind::StringSet,
        }
    }

    /// Encode for storage
    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Decode a stored entry
    pub fn from_bytes(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }

    /// The boolean, if this is one
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            NativeValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// The integer, if this is an `Int`
    pub fn as_int(&self) -> Option<i32> {
        match self {
            NativeValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// The float, if this is one
    pub fn as_float(&self) -> Option<f32> {
        match self {
            NativeValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// The integer, if this is a `Long`
    pub fn as_long(&self) -> Option<i64> {
        match self {
            NativeValue::Long(l) => Some(*l),
            _ => None,
        }
    }

    /// The string, if this is one
    pub fn as_str(&self) -> Option<&str> {
        match self {
            NativeValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// The string set, if this is one
    pub fn as_string_set(&self) -> Option<&StringSet> {
        match self {
            NativeValue::StringSet(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for NativeValue {
    fn from(value: bool) -> Self {
        NativeValue::Boolean(value)
    }
}

impl From<i32> for NativeValue {
    fn from(value: i32) -> Self {
        NativeValue::Int(value)
    }
}

impl From<f32> for NativeValue {
    fn from(value: f32) -> Self {
        NativeValue::Float(value)
    }
}

impl From<i64> for NativeValue {
    fn from(value: i64) -> Self {
        NativeValue::Long(value)
    }
}

impl From<String> for NativeValue {
    fn from(value: String) -> Self {
        NativeValue::String(value)
    }
}

impl From<&str> for NativeValue {
    fn from(value: &str) -> Self {
        NativeValue::String(value.to_string())
    }
}

impl From<StringSet> for NativeValue {
    fn from(value: StringSet) -> Self {
        NativeValue::StringSet(value)
    }
}
