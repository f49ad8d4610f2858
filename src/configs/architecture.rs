//! Architecture configs.

use serde::{Deserialize, Serialize};

use super::named_family;

/// U-Net with a configurable number of levels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UNetConfig {
    /// Unique name.
    pub name: String,
    /// Spatial input shape.
    pub input_shape: Vec<u32>,
    /// Feature maps of the output layer.
    pub fmaps_out: u32,
    /// Feature maps of the first level.
    pub num_fmaps: u32,
    /// Multiplier applied per level.
    pub fmap_inc_factor: u32,
    /// Per-level downsampling factors.
    pub downsample_factors: Vec<Vec<u32>>,
    /// Upsample by repetition instead of transposed convolution.
    #[serde(default)]
    pub constant_upsample: bool,
}

/// Minimal architecture, used in tests and demos.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DummyArchitectureConfig {
    /// Unique name.
    pub name: String,
    /// Input channels.
    pub num_in_channels: u32,
    /// Output channels.
    pub num_out_channels: u32,
}

/// Network architecture family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "__type__")]
pub enum ArchitectureConfig {
    /// U-Net.
    UNetConfig(UNetConfig),
    /// Dummy.
    DummyArchitectureConfig(DummyArchitectureConfig),
}

named_family!(
    ArchitectureConfig,
    "ArchitectureConfig",
    Architecture,
    [UNetConfig, DummyArchitectureConfig]
);
