//! Task configs.

use serde::{Deserialize, Serialize};

use super::evaluation::{
    BinarySegmentationEvaluationScores, Criterion, DummyEvaluationScores,
    InstanceEvaluationScores,
};
use super::named_family;

/// Predict affinities over a neighborhood, evaluated as instances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffinitiesTaskConfig {
    /// Unique name.
    pub name: String,
    /// Neighborhood offsets.
    pub neighborhood: Vec<Vec<i32>>,
}

/// Predict signed distances per channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceTaskConfig {
    /// Unique name.
    pub name: String,
    /// Channel (class) names.
    pub channels: Vec<String>,
    /// Distance scale.
    #[serde(with = "crate::serialize::float")]
    pub scale_factor: f64,
    /// Mask distances that cannot be computed reliably.
    #[serde(default)]
    pub mask_distances: bool,
}

/// Predict one-hot class probabilities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OneHotTaskConfig {
    /// Unique name.
    pub name: String,
    /// Class names.
    pub classes: Vec<String>,
}

/// Minimal task, used in tests and demos.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DummyTaskConfig {
    /// Unique name.
    pub name: String,
    /// Embedding dimensions.
    pub embedding_dims: u32,
    /// Detection threshold.
    #[serde(with = "crate::serialize::float")]
    pub detection_threshold: f64,
}

/// Task family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "__type__")]
pub enum TaskConfig {
    /// Affinities.
    AffinitiesTaskConfig(AffinitiesTaskConfig),
    /// Distances.
    DistanceTaskConfig(DistanceTaskConfig),
    /// One-hot.
    OneHotTaskConfig(OneHotTaskConfig),
    /// Dummy.
    DummyTaskConfig(DummyTaskConfig),
}

named_family!(
    TaskConfig,
    "TaskConfig",
    Task,
    [
        AffinitiesTaskConfig,
        DistanceTaskConfig,
        OneHotTaskConfig,
        DummyTaskConfig,
    ]
);

impl TaskConfig {
    /// Criteria the task's evaluator reports, in score-vector order.
    #[must_use]
    pub fn evaluation_criteria(&self) -> Vec<Criterion> {
        match self {
            Self::AffinitiesTaskConfig(_) => InstanceEvaluationScores::criteria(),
            Self::DistanceTaskConfig(_) | Self::OneHotTaskConfig(_) => {
                BinarySegmentationEvaluationScores::criteria()
            }
            Self::DummyTaskConfig(_) => DummyEvaluationScores::criteria(),
        }
    }
}
