//! Trainer configs.

use serde::{Deserialize, Serialize};

use super::named_family;

/// Trainer fed by a gunpowder pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GunpowderTrainerConfig {
    /// Unique name.
    pub name: String,
    /// Samples per batch.
    pub batch_size: u32,
    /// Optimizer learning rate.
    #[serde(with = "crate::serialize::float")]
    pub learning_rate: f64,
    /// Parallel data fetchers.
    pub num_data_fetchers: u32,
    /// Names of the augmentations applied, in order.
    #[serde(default)]
    pub augments: Vec<String>,
}

/// Minimal trainer, used in tests and demos.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DummyTrainerConfig {
    /// Unique name.
    pub name: String,
    /// Samples per batch.
    pub batch_size: u32,
    /// Optimizer learning rate.
    #[serde(with = "crate::serialize::float")]
    pub learning_rate: f64,
    /// Mirror augmentation on/off.
    pub mirror_augment: bool,
}

/// Trainer family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "__type__")]
pub enum TrainerConfig {
    /// Gunpowder.
    GunpowderTrainerConfig(GunpowderTrainerConfig),
    /// Dummy.
    DummyTrainerConfig(DummyTrainerConfig),
}

named_family!(
    TrainerConfig,
    "TrainerConfig",
    Trainer,
    [GunpowderTrainerConfig, DummyTrainerConfig]
);
