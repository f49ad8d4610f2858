//! Serialization layer
//!
//! Converts typed records to and from plain JSON documents:
//! - [`float`]: sentinel encoding for non-finite floats
//! - [`canonical`]: sorted-key JSON and SHA-256 content ids
//! - [`registry`]: `__type__` tag resolution for config families

pub mod canonical;
pub mod float;
pub mod registry;

pub use canonical::{content_id, differing_fields, to_canonical_json_bytes, ID_FIELD};
pub use registry::{unstructure, TypeFamily, TypeRegistry, TYPE_TAG};
pub(crate) use registry::type_family;
