//! Dataset and datasplit configs.

use serde::{Deserialize, Serialize};

use super::array::{ArrayConfig, GraphStoreConfig};
use super::{named_family, ConfigRecord};

/// Raw data with optional ground truth and mask.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawGTDatasetConfig {
    /// Unique name.
    pub name: String,
    /// Sampling weight relative to sibling datasets.
    #[serde(default = "default_weight")]
    pub weight: u32,
    /// Raw input.
    pub raw_config: ArrayConfig,
    /// Ground truth.
    #[serde(default)]
    pub gt_config: Option<ArrayConfig>,
    /// Mask of valid ground truth.
    #[serde(default)]
    pub mask_config: Option<ArrayConfig>,
    /// Points to sample around.
    #[serde(default)]
    pub sample_points: Option<GraphStoreConfig>,
}

/// Raw data only, used in tests and demos.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DummyDatasetConfig {
    /// Unique name.
    pub name: String,
    /// Sampling weight relative to sibling datasets.
    #[serde(default = "default_weight")]
    pub weight: u32,
    /// Raw input.
    pub raw_config: ArrayConfig,
}

const fn default_weight() -> u32 {
    1
}

/// Dataset family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "__type__")]
pub enum DatasetConfig {
    /// Raw + ground truth.
    RawGTDatasetConfig(RawGTDatasetConfig),
    /// Dummy.
    DummyDatasetConfig(DummyDatasetConfig),
}

named_family!(
    DatasetConfig,
    "DatasetConfig",
    Dataset,
    [RawGTDatasetConfig, DummyDatasetConfig]
);

/// Separate training and validation datasets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainValidateDataSplitConfig {
    /// Unique name.
    pub name: String,
    /// Datasets to train on.
    pub train_configs: Vec<DatasetConfig>,
    /// Datasets to validate on.
    pub validate_configs: Vec<DatasetConfig>,
}

/// Single training dataset, no validation, used in tests and demos.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DummyDataSplitConfig {
    /// Unique name.
    pub name: String,
    /// The training dataset.
    pub train_config: DatasetConfig,
}

/// Datasplit family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "__type__")]
pub enum DataSplitConfig {
    /// Train/validate.
    TrainValidateDataSplitConfig(TrainValidateDataSplitConfig),
    /// Dummy.
    DummyDataSplitConfig(DummyDataSplitConfig),
}

named_family!(
    DataSplitConfig,
    "DataSplitConfig",
    DataSplit,
    [TrainValidateDataSplitConfig, DummyDataSplitConfig]
);

impl DataSplitConfig {
    /// Datasets validation runs on. A dummy split validates on its training set.
    #[must_use]
    pub fn validation_datasets(&self) -> Vec<&DatasetConfig> {
        match self {
            Self::TrainValidateDataSplitConfig(split) => split.validate_configs.iter().collect(),
            Self::DummyDataSplitConfig(split) => vec![&split.train_config],
        }
    }

    /// Names of [`Self::validation_datasets`].
    #[must_use]
    pub fn validation_dataset_names(&self) -> Vec<String> {
        self.validation_datasets()
            .into_iter()
            .map(|d| d.name().to_string())
            .collect()
    }
}
