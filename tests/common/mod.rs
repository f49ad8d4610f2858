//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::sync::Arc;

use trueno_runstore::config::{StoreConfig, Stores};
use trueno_runstore::configs::{
    ArchitectureConfig, ArrayConfig, DataSplitConfig, DatasetConfig, DummyArchitectureConfig,
    DummyArrayConfig, DummyDatasetConfig, DummyPostProcessorParameters, DummyTaskConfig,
    DummyTrainerConfig, PostProcessorParameters, RunConfig, TaskConfig, TrainValidateDataSplitConfig,
    TrainerConfig,
};
use trueno_runstore::experiment::TrainingStats;
use trueno_runstore::kv::{KvStore, MemoryKvStore};

pub fn memory_backend() -> Arc<dyn KvStore> {
    Arc::new(MemoryKvStore::new())
}

pub fn memory_stores() -> (Arc<dyn KvStore>, Stores) {
    let backend = memory_backend();
    let stores = Stores::with_backend(Arc::clone(&backend), &StoreConfig::default());
    (backend, stores)
}

pub fn dataset(name: &str) -> DatasetConfig {
    DatasetConfig::DummyDatasetConfig(DummyDatasetConfig {
        name: name.to_string(),
        weight: 1,
        raw_config: ArrayConfig::DummyArrayConfig(DummyArrayConfig {
            name: format!("{name}_raw"),
        }),
    })
}

pub fn task(name: &str, embedding_dims: u32) -> TaskConfig {
    TaskConfig::DummyTaskConfig(DummyTaskConfig {
        name: name.to_string(),
        embedding_dims,
        detection_threshold: 0.5,
    })
}

/// Run over the dummy task, validated on datasets `val_a` and `val_b`.
pub fn run_config(name: &str) -> RunConfig {
    RunConfig::builder(
        name,
        task("dummy_task", 12),
        ArchitectureConfig::DummyArchitectureConfig(DummyArchitectureConfig {
            name: "dummy_arch".to_string(),
            num_in_channels: 1,
            num_out_channels: 12,
        }),
        TrainerConfig::DummyTrainerConfig(DummyTrainerConfig {
            name: "dummy_trainer".to_string(),
            batch_size: 2,
            learning_rate: 1e-5,
            mirror_augment: true,
        }),
        DataSplitConfig::TrainValidateDataSplitConfig(TrainValidateDataSplitConfig {
            name: "dummy_split".to_string(),
            train_configs: vec![dataset("train")],
            validate_configs: vec![dataset("val_a"), dataset("val_b")],
        }),
    )
    .num_iterations(100)
    .validation_interval(10)
    .build()
}

pub fn params(id: u32) -> PostProcessorParameters {
    PostProcessorParameters::DummyPostProcessorParameters(DummyPostProcessorParameters {
        id,
        min_size: 10 * (id + 1),
    })
}

/// Stats for `iterations` with a constant loss, exact in binary.
pub fn training(iterations: std::ops::Range<u64>, loss: f64) -> TrainingStats {
    let mut stats = TrainingStats::new();
    for iteration in iterations {
        stats.add_iteration(iteration, loss, 0.25).unwrap();
    }
    stats
}
