//! Typed preference values
//!
//! [`PrefValue`] is the closed set of shapes a preference can take: the five
//! scalar native kinds, a homogeneous set, or a complex structured value that
//! is stored as a serialized blob. [`PrefType`] maps Rust types onto it.

use ciborium::Value;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::BTreeSet;
use storage::{NativeValue, StringSet};

use crate::descriptor::PrefKind;
use crate::error::Result;

/// A homogeneous set of one supported element kind
#[derive(Debug, Clone, PartialEq)]
pub enum TypedSet {
    /// Set of 32-bit integers
    Int(BTreeSet<i32>),
    /// Set of booleans
    Boolean(BTreeSet<bool>),
    /// Floats in insertion order, without duplicates
    Float(Vec<f32>),
    /// Set of 64-bit integers
    Long(BTreeSet<i64>),
    /// Set of strings
    String(BTreeSet<String>),
    /// A stored set whose type tag was not recognized, returned verbatim
    Raw(StringSet),
}

impl Default for TypedSet {
    /// An empty set with no element kind
    fn default() -> Self {
        TypedSet::Raw(StringSet::new())
    }
}

impl TypedSet {
    /// Build a float set, dropping repeated values
    pub fn floats(values: impl IntoIterator<Item = f32>) -> Self {
        let mut out: Vec<f32> = Vec::new();
        for value in values {
            if !out.contains(&value) {
                out.push(value);
            }
        }
        TypedSet::Float(out)
    }

    /// Number of members
    pub fn len(&self) -> usize {
        match self {
            TypedSet::Int(s) => s.len(),
            TypedSet::Boolean(s) => s.len(),
            TypedSet::Float(s) => s.len(),
            TypedSet::Long(s) => s.len(),
            TypedSet::String(s) => s.len(),
            TypedSet::Raw(s) => s.len(),
        }
    }

    /// Whether the set has no members
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A preference value of any supported kind
#[derive(Debug, Clone, PartialEq)]
pub enum PrefValue {
    /// Boolean value
    Boolean(bool),
    /// 32-bit integer value
    Int(i32),
    /// 32-bit float value
    Float(f32),
    /// 64-bit integer value
    Long(i64),
    /// String value
    String(String),
    /// Homogeneous set
    Set(TypedSet),
    /// Structured value stored as a serialized blob
    Complex(Value),
}

impl PrefValue {
    /// Kind of this value
    pub fn kind(&self) -> PrefKind {
        match self {
            PrefValue::Boolean(_) => PrefKind::Boolean,
            PrefValue::Int(_) => PrefKind::Int,
            PrefValue::Float(_) => PrefKind::Float,
            PrefValue::Long(_) => PrefKind::Long,
            PrefValue::String(_) => PrefKind::String,
            PrefValue::Set(_) => PrefKind::Set,
            PrefValue::Complex(_) => PrefKind::Complex,
        }
    }

    /// Serialize any value into the complex form
    pub fn complex<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        Ok(PrefValue::Complex(Value::serialized(value)?))
    }

    /// The scalar native value, if this is one of the five scalar kinds
    pub fn to_native(&self) -> Option<NativeValue> {
        match self {
            PrefValue::Boolean(b) => Some(NativeValue::Boolean(*b)),
            PrefValue::Int(i) => Some(NativeValue::Int(*i)),
            PrefValue::Float(f) => Some(NativeValue::Float(*f)),
            PrefValue::Long(l) => Some(NativeValue::Long(*l)),
            PrefValue::String(s) => Some(NativeValue::String(s.clone())),
            PrefValue::Set(_) | PrefValue::Complex(_) => None,
        }
    }
}

impl From<bool> for PrefValue {
    fn from(value: bool) -> Self {
        PrefValue::Boolean(value)
    }
}

impl From<i32> for PrefValue {
    fn from(value: i32) -> Self {
        PrefValue::Int(value)
    }
}

impl From<f32> for PrefValue {
    fn from(value: f32) -> Self {
        PrefValue::Float(value)
    }
}

impl From<i64> for PrefValue {
    fn from(value: i64) -> Self {
        PrefValue::Long(value)
    }
}

impl From<String> for PrefValue {
    fn from(value: String) -> Self {
        PrefValue::String(value)
    }
}

impl From<&str> for PrefValue {
    fn from(value: &str) -> Self {
        PrefValue::String(value.to_string())
    }
}

impl From<TypedSet> for PrefValue {
    fn from(value: TypedSet) -> Self {
        PrefValue::Set(value)
    }
}

/// Rust types that can be read from and written to preferences
pub trait PrefType: Sized {
    /// Kind this value is stored as
    fn pref_kind(&self) -> PrefKind;

    /// Convert into a storable value
    fn into_pref_value(self) -> Result<PrefValue>;

    /// Convert back from a stored value; `None` when the shape does not match
    fn from_pref_value(value: PrefValue) -> Option<Self>;
}

impl PrefType for PrefValue {
    fn pref_kind(&self) -> PrefKind {
        self.kind()
    }

    fn into_pref_value(self) -> Result<PrefValue> {
        Ok(self)
    }

    fn from_pref_value(value: PrefValue) -> Option<Self> {
        Some(value)
    }
}

macro_rules! scalar_pref_type {
    ($ty:ty, $variant:ident) => {
        impl PrefType for $ty {
            fn pref_kind(&self) -> PrefKind {
                PrefKind::$variant
            }

            fn into_pref_value(self) -> Result<PrefValue> {
                Ok(PrefValue::$variant(self))
            }

            fn from_pref_value(value: PrefValue) -> Option<Self> {
                match value {
                    PrefValue::$variant(v) => Some(v),
                    _ => None,
                }
            }
        }
    };
}

scalar_pref_type!(bool, Boolean);
scalar_pref_type!(i32, Int);
scalar_pref_type!(f32, Float);
scalar_pref_type!(i64, Long);
scalar_pref_type!(String, String);

macro_rules! set_pref_type {
    ($ty:ty, $variant:ident) => {
        impl PrefType for BTreeSet<$ty> {
            fn pref_kind(&self) -> PrefKind {
                PrefKind::Set
            }

            fn into_pref_value(self) -> Result<PrefValue> {
                Ok(PrefValue::Set(TypedSet::$variant(self)))
            }

            fn from_pref_value(value: PrefValue) -> Option<Self> {
                match value {
                    PrefValue::Set(TypedSet::$variant(s)) => Some(s),
                    _ => None,
                }
            }
        }
    };
}

set_pref_type!(i32, Int);
set_pref_type!(bool, Boolean);
set_pref_type!(i64, Long);

impl PrefType for BTreeSet<String> {
    fn pref_kind(&self) -> PrefKind {
        PrefKind::Set
    }

    fn into_pref_value(self) -> Result<PrefValue> {
        Ok(PrefValue::Set(TypedSet::String(self)))
    }

    fn from_pref_value(value: PrefValue) -> Option<Self> {
        match value {
            PrefValue::Set(TypedSet::String(s)) => Some(s),
            // an untagged set still reads as plain strings
            PrefValue::Set(TypedSet::Raw(raw)) => Some(raw.into_iter().collect()),
            _ => None,
        }
    }
}

impl PrefType for TypedSet {
    fn pref_kind(&self) -> PrefKind {
        PrefKind::Set
    }

    fn into_pref_value(self) -> Result<PrefValue> {
        Ok(PrefValue::Set(self))
    }

    fn from_pref_value(value: PrefValue) -> Option<Self> {
        match value {
            PrefValue::Set(s) => Some(s),
            _ => None,
        }
    }
}

/// Wrapper storing any serde type through the serialized-blob path
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Complex<T>(pub T);

impl<T> Complex<T> {
    /// Unwrap the inner value
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> PrefType for Complex<T>
where
    T: Serialize + DeserializeOwned,
{
    fn pref_kind(&self) -> PrefKind {
        PrefKind::Complex
    }

    fn into_pref_value(self) -> Result<PrefValue> {
        PrefValue::complex(&self.0)
    }

    fn from_pref_value(value: PrefValue) -> Option<Self> {
        match value {
            PrefValue::Complex(v) => match v.deserialized::<T>() {
                Ok(inner) => Some(Complex(inner)),
                Err(e) => {
                    tracing::debug!("Stored complex value no longer matches its type: {}", e);
                    None
                }
            },
            _ => None,
        }
    }
}
