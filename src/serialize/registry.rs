//! Type registry for polymorphic config families.
//!
//! Each family is a closed enum whose variants are written with a
//! `__type__` tag. The registry maps every known tag back to its family so a
//! document written by a newer build fails loudly instead of half-parsing.

use rustc_hash::FxHashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::{Error, Result};

/// Field holding a record's type tag.
pub const TYPE_TAG: &str = "__type__";

/// A closed family of tagged config variants.
pub trait TypeFamily: Serialize + DeserializeOwned {
    /// Family name, used in error messages.
    const FAMILY: &'static str;
    /// Every tag this family can be written with.
    const TAGS: &'static [&'static str];

    /// Tag of this value's variant.
    fn type_tag(&self) -> &'static str;
}

/// Implements [`TypeFamily`] for an internally tagged enum whose variant
/// names are the tags.
macro_rules! type_family {
    ($family:ty, $name:literal, [$($variant:ident),+ $(,)?]) => {
        impl $crate::serialize::TypeFamily for $family {
            const FAMILY: &'static str = $name;
            const TAGS: &'static [&'static str] = &[$(stringify!($variant)),+];

            fn type_tag(&self) -> &'static str {
                match self {
                    $(Self::$variant(..) => stringify!($variant)),+
                }
            }
        }
    };
}
pub(crate) use type_family;

/// Tag → family lookup.
#[derive(Debug, Default, Clone)]
pub struct TypeRegistry {
    tags: FxHashMap<&'static str, &'static str>,
}

impl TypeRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every tag of a family.
    pub fn register<T: TypeFamily>(&mut self) -> &mut Self {
        for tag in T::TAGS {
            self.tags.insert(*tag, T::FAMILY);
        }
        self
    }

    /// Number of known tags.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Check if no family is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Family a tag belongs to.
    #[must_use]
    pub fn family_of(&self, tag: &str) -> Option<&'static str> {
        self.tags.get(tag).copied()
    }

    /// Resolve a tag against a family.
    ///
    /// # Errors
    ///
    /// [`Error::UnresolvableTypeTag`] if the tag is unknown or belongs to a
    /// different family.
    pub fn resolve(&self, family: &str, tag: &str) -> Result<()> {
        match self.family_of(tag) {
            Some(found) if found == family => Ok(()),
            _ => Err(Error::UnresolvableTypeTag {
                family: family.to_string(),
                tag: tag.to_string(),
            }),
        }
    }

    /// Walk a document and check that every nested `__type__` tag is known.
    ///
    /// # Errors
    ///
    /// [`Error::UnresolvableTypeTag`] for the first unknown tag found.
    pub fn check_tags(&self, value: &Value) -> Result<()> {
        match value {
            Value::Object(map) => {
                if let Some(tag) = map.get(TYPE_TAG) {
                    let tag = tag.as_str().unwrap_or_default();
                    if self.family_of(tag).is_none() {
                        return Err(Error::UnresolvableTypeTag {
                            family: "config".to_string(),
                            tag: tag.to_string(),
                        });
                    }
                }
                map.values().try_for_each(|v| self.check_tags(v))
            }
            Value::Array(values) => values.iter().try_for_each(|v| self.check_tags(v)),
            _ => Ok(()),
        }
    }

    /// Turn a document back into a typed family value.
    ///
    /// # Errors
    ///
    /// [`Error::UnresolvableTypeTag`] for a missing or unknown tag,
    /// [`Error::Serialization`] if the fields do not fit the variant.
    pub fn structure<T: TypeFamily>(&self, value: Value) -> Result<T> {
        let tag = value
            .get(TYPE_TAG)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        self.resolve(T::FAMILY, &tag)?;
        self.check_tags(&value)?;
        Ok(serde_json::from_value(value)?)
    }
}

/// Convert a typed value into its plain nested-map form.
///
/// # Errors
///
/// Returns error if the value cannot be represented as JSON.
pub fn unstructure<T: Serialize>(value: &T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}
