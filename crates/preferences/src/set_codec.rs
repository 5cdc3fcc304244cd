//! Encoding of typed sets onto native string sets
//!
//! A typed set is stored as an ordered string set laid out as
//! `[tag, member, member, ...]`, where the tag names the element kind. The tag
//! always occupies position 0, even when a member has the same text.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use storage::StringSet;

use crate::value::TypedSet;

/// Element kind tag stored at the head of an encoded set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SetTag {
    /// `i32` members
    Int,
    /// `bool` members
    Boolean,
    /// `f32` members
    Float,
    /// `i64` members
    Long,
    /// `String` members
    String,
}

impl SetTag {
    /// Literal written into the store
    pub fn as_str(&self) -> &'static str {
        match self {
            SetTag::Int => "Int",
            SetTag::Boolean => "Boolean",
            SetTag::Float => "Float",
            SetTag::Long => "Long",
            SetTag::String => "String",
        }
    }
}

impl fmt::Display for SetTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SetTag {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Int" => Ok(SetTag::Int),
            "Boolean" => Ok(SetTag::Boolean),
            "Float" => Ok(SetTag::Float),
            "Long" => Ok(SetTag::Long),
            "String" => Ok(SetTag::String),
            _ => Err(()),
        }
    }
}

/// A typed set split into its tag and stringified members
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedSet {
    /// Element kind
    pub tag: SetTag,
    /// Members in their string form, without duplicates
    pub members: Vec<String>,
}

impl EncodedSet {
    /// Split a typed set; `None` for raw sets, which are stored as they are
    pub fn from_typed(set: &TypedSet) -> Option<Self> {
        let (tag, members): (SetTag, Vec<String>) = match set {
            TypedSet::Int(s) => (SetTag::Int, s.iter().map(ToString::to_string).collect()),
            TypedSet::Boolean(s) => (SetTag::Boolean, s.iter().map(ToString::to_string).collect()),
            TypedSet::Float(s) => (SetTag::Float, s.iter().map(ToString::to_string).collect()),
            TypedSet::Long(s) => (SetTag::Long, s.iter().map(ToString::to_string).collect()),
            TypedSet::String(s) => (SetTag::String, s.iter().cloned().collect()),
            TypedSet::Raw(_) => return None,
        };
        Some(Self { tag, members })
    }

    /// Native layout: tag first, then members
    pub fn into_string_set(self) -> StringSet {
        let members: StringSet = self.members.into_iter().collect();
        let mut ordered = Vec::with_capacity(members.len() + 1);
        ordered.push(self.tag.as_str().to_string());
        ordered.extend(members);
        StringSet::from_ordered(ordered)
    }
}

/// Encode a typed set for storage
///
/// Returns `None` for an empty set: its element kind cannot be recorded, so
/// nothing should be written.
pub fn encode(set: &TypedSet) -> Option<StringSet> {
    if set.is_empty() {
        return None;
    }

    match set {
        TypedSet::Raw(raw) => Some(raw.clone()),
        typed => EncodedSet::from_typed(typed).map(EncodedSet::into_string_set),
    }
}

/// Decode a stored string set
///
/// Returns `None` for an empty set. Members that do not parse as the tagged
/// kind are dropped. An unknown tag yields [`TypedSet::Raw`] holding the
/// stored set unchanged, tag included.
pub fn decode(raw: StringSet) -> Option<TypedSet> {
    let tag = raw.get(0)?;
    let Ok(tag) = tag.parse::<SetTag>() else {
        tracing::debug!("Unrecognized set tag {:?}, returning raw set", tag);
        return Some(TypedSet::Raw(raw));
    };

    let members = raw.iter().skip(1);
    let set = match tag {
        SetTag::Int => TypedSet::Int(parse_all(members)),
        SetTag::Boolean => TypedSet::Boolean(parse_all(members)),
        SetTag::Float => TypedSet::floats(members.filter_map(|m| m.parse::<f32>().ok())),
        SetTag::Long => TypedSet::Long(parse_all(members)),
        SetTag::String => TypedSet::String(members.map(str::to_string).collect()),
    };
    Some(set)
}

fn parse_all<'a, T>(members: impl Iterator<Item = &'a str>) -> BTreeSet<T>
where
    T: FromStr + Ord,
{
    members.filter_map(|m| m.parse::<T>().ok()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> StringSet {
        StringSet::from_ordered(items.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_tag_comes_first() {
        let set = TypedSet::Int([3, 1, 2].into_iter().collect());
        let encoded = encode(&set).unwrap();
        assert_eq!(encoded, strings(&["Int", "1", "2", "3"]));
    }

    #[test]
    fn test_empty_set_encodes_to_nothing() {
        assert_eq!(encode(&TypedSet::Long(BTreeSet::new())), None);
        assert_eq!(encode(&TypedSet::Raw(StringSet::new())), None);
        assert_eq!(decode(StringSet::new()), None);
    }

    #[test]
    fn test_round_trips() {
        let sets = [
            TypedSet::Int([1, -2, 300].into_iter().collect()),
            TypedSet::Boolean([true, false].into_iter().collect()),
            TypedSet::floats([0.5, 2.25]),
            TypedSet::Long([i64::MAX, 0].into_iter().collect()),
            TypedSet::String(["a".to_string(), "b c".to_string()].into_iter().collect()),
        ];

        for set in sets {
            assert_eq!(decode(encode(&set).unwrap()), Some(set));
        }
    }

    #[test]
    fn test_member_equal_to_tag_survives() {
        let set = TypedSet::String(["String".to_string(), "x".to_string()].into_iter().collect());
        let encoded = encode(&set).unwrap();
        assert_eq!(encoded.len(), 3);
        assert_eq!(decode(encoded), Some(set));
    }

    #[test]
    fn test_unparsable_members_dropped() {
        let decoded = decode(strings(&["Int", "1", "two", "3"])).unwrap();
        assert_eq!(decoded, TypedSet::Int([1, 3].into_iter().collect()));

        let decoded = decode(strings(&["Boolean", "true", "TRUE", "yes"])).unwrap();
        assert_eq!(decoded, TypedSet::Boolean([true].into_iter().collect()));

        let decoded = decode(strings(&["Long", "99999999999", "1.5"])).unwrap();
        assert_eq!(decoded, TypedSet::Long([99_999_999_999].into_iter().collect()));
    }

    #[test]
    fn test_unknown_tag_returns_raw_set() {
        let raw = strings(&["Double", "1.0", "2.0"]);
        assert_eq!(decode(raw.clone()), Some(TypedSet::Raw(raw)));
    }

    #[test]
    fn test_tag_only_decodes_to_empty_typed_set() {
        assert_eq!(decode(strings(&["Int"])), Some(TypedSet::Int(BTreeSet::new())));
    }

    #[test]
    fn test_tag_parsing() {
        assert_eq!("Float".parse::<SetTag>(), Ok(SetTag::Float));
        assert!("int".parse::<SetTag>().is_err());
        assert_eq!(SetTag::Boolean.to_string(), "Boolean");
    }
}
