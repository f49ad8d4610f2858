//! Post-processor parameter sets.

use serde::{Deserialize, Serialize};

use crate::serialize::type_family;

/// Argmax over channels; no tunable parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArgmaxPostProcessorParameters {
    /// Index of this set among the evaluated sets.
    pub id: u32,
}

/// Threshold a single channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdPostProcessorParameters {
    /// Index of this set among the evaluated sets.
    pub id: u32,
    /// Foreground threshold.
    #[serde(with = "crate::serialize::float")]
    pub threshold: f64,
}

/// Watershed over predicted affinities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatershedPostProcessorParameters {
    /// Index of this set among the evaluated sets.
    pub id: u32,
    /// Merge bias.
    #[serde(with = "crate::serialize::float")]
    pub bias: f64,
}

/// Dummy post-processing, used in tests and demos.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DummyPostProcessorParameters {
    /// Index of this set among the evaluated sets.
    pub id: u32,
    /// Minimum object size.
    pub min_size: u32,
}

/// One parameter set a post-processor was evaluated with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "__type__")]
#[allow(clippy::enum_variant_names)]
pub enum PostProcessorParameters {
    /// Argmax.
    ArgmaxPostProcessorParameters(ArgmaxPostProcessorParameters),
    /// Threshold.
    ThresholdPostProcessorParameters(ThresholdPostProcessorParameters),
    /// Watershed.
    WatershedPostProcessorParameters(WatershedPostProcessorParameters),
    /// Dummy.
    DummyPostProcessorParameters(DummyPostProcessorParameters),
}

type_family!(
    PostProcessorParameters,
    "PostProcessorParameters",
    [
        ArgmaxPostProcessorParameters,
        ThresholdPostProcessorParameters,
        WatershedPostProcessorParameters,
        DummyPostProcessorParameters,
    ]
);

impl PostProcessorParameters {
    /// Index of this set among the evaluated sets.
    #[must_use]
    pub const fn id(&self) -> u32 {
        match self {
            Self::ArgmaxPostProcessorParameters(p) => p.id,
            Self::ThresholdPostProcessorParameters(p) => p.id,
            Self::WatershedPostProcessorParameters(p) => p.id,
            Self::DummyPostProcessorParameters(p) => p.id,
        }
    }

    /// Short human-readable label, e.g. `threshold=0.5`.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::ArgmaxPostProcessorParameters(_) => "argmax".to_string(),
            Self::ThresholdPostProcessorParameters(p) => format!("threshold={}", p.threshold),
            Self::WatershedPostProcessorParameters(p) => format!("bias={}", p.bias),
            Self::DummyPostProcessorParameters(p) => format!("min_size={}", p.min_size),
        }
    }
}
