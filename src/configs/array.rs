//! Array and graph store configs.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::named_family;

/// Array stored in a zarr/n5 container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZarrArrayConfig {
    /// Unique name.
    pub name: String,
    /// Container path.
    pub file_name: PathBuf,
    /// Dataset inside the container.
    pub dataset: String,
    /// Snap requested regions to this grid.
    #[serde(default)]
    pub snap_to_grid: Option<Vec<u32>>,
}

/// Rescales a source array's intensities to `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntensitiesArrayConfig {
    /// Unique name.
    pub name: String,
    /// Array to normalize.
    pub source_array_config: Box<ArrayConfig>,
    /// Value mapped to 0.
    #[serde(with = "crate::serialize::float")]
    pub min: f64,
    /// Value mapped to 1.
    #[serde(with = "crate::serialize::float")]
    pub max: f64,
}

/// Logical OR over the channels of a source array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicalOrArrayConfig {
    /// Unique name.
    pub name: String,
    /// Array to reduce.
    pub source_array_config: Box<ArrayConfig>,
}

/// Placeholder array, used in tests and demos.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DummyArrayConfig {
    /// Unique name.
    pub name: String,
}

/// Array family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "__type__")]
pub enum ArrayConfig {
    /// Zarr/n5 container.
    ZarrArrayConfig(ZarrArrayConfig),
    /// Intensity normalization.
    IntensitiesArrayConfig(IntensitiesArrayConfig),
    /// Channel OR.
    LogicalOrArrayConfig(LogicalOrArrayConfig),
    /// Dummy.
    DummyArrayConfig(DummyArrayConfig),
}

named_family!(
    ArrayConfig,
    "ArrayConfig",
    Array,
    [
        ZarrArrayConfig,
        IntensitiesArrayConfig,
        LogicalOrArrayConfig,
        DummyArrayConfig,
    ]
);

/// Points read from a CSV file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvGraphStoreConfig {
    /// Unique name.
    pub name: String,
    /// CSV path.
    pub path: PathBuf,
}

/// Placeholder graph store, used in tests and demos.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DummyGraphStoreConfig {
    /// Unique name.
    pub name: String,
}

/// Graph store family (sample points for datasets).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "__type__")]
pub enum GraphStoreConfig {
    /// CSV points.
    CsvGraphStoreConfig(CsvGraphStoreConfig),
    /// Dummy.
    DummyGraphStoreConfig(DummyGraphStoreConfig),
}

named_family!(
    GraphStoreConfig,
    "GraphStoreConfig",
    GraphStore,
    [CsvGraphStoreConfig, DummyGraphStoreConfig]
);
