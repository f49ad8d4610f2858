//! Round-trip tests: every config variant survives unstructure/structure and
//! a trip through the config store

mod common;

use std::fmt::Debug;

use common::{dataset, memory_stores, params, run_config};
use trueno_runstore::configs::*;
use trueno_runstore::serialize::{unstructure, TypeFamily};

fn assert_round_trip<T: TypeFamily + PartialEq + Debug>(value: &T) {
    let doc = unstructure(value).unwrap();
    assert_eq!(doc["__type__"], value.type_tag());
    let back: T = registry().structure(doc).unwrap();
    assert_eq!(&back, value);
}

fn assert_stored_round_trip<C: ConfigRecord + PartialEq + Debug>(value: &C) {
    let (_, stores) = memory_stores();
    let id = stores.configs.store(value).unwrap();
    assert_eq!(&stores.configs.retrieve::<C>(value.name()).unwrap(), value);
    assert_eq!(&stores.configs.retrieve_by_id::<C>(&id).unwrap(), value);
}

fn zarr(name: &str) -> ArrayConfig {
    ArrayConfig::ZarrArrayConfig(ZarrArrayConfig {
        name: name.to_string(),
        file_name: "/data/sample.zarr".into(),
        dataset: format!("volumes/{name}"),
        snap_to_grid: Some(vec![4, 4, 4]),
    })
}

fn arrays() -> Vec<ArrayConfig> {
    vec![
        zarr("raw"),
        ArrayConfig::IntensitiesArrayConfig(IntensitiesArrayConfig {
            name: "raw_norm".to_string(),
            source_array_config: Box::new(zarr("raw")),
            min: 0.0,
            max: 255.0,
        }),
        ArrayConfig::LogicalOrArrayConfig(LogicalOrArrayConfig {
            name: "mask".to_string(),
            source_array_config: Box::new(zarr("labels")),
        }),
        ArrayConfig::DummyArrayConfig(DummyArrayConfig {
            name: "dummy".to_string(),
        }),
    ]
}

fn graph_stores() -> Vec<GraphStoreConfig> {
    vec![
        GraphStoreConfig::CsvGraphStoreConfig(CsvGraphStoreConfig {
            name: "points".to_string(),
            path: "/data/points.csv".into(),
        }),
        GraphStoreConfig::DummyGraphStoreConfig(DummyGraphStoreConfig {
            name: "dummy_points".to_string(),
        }),
    ]
}

fn datasets() -> Vec<DatasetConfig> {
    vec![
        DatasetConfig::RawGTDatasetConfig(RawGTDatasetConfig {
            name: "sample_a".to_string(),
            weight: 2,
            raw_config: zarr("raw"),
            gt_config: Some(zarr("labels")),
            mask_config: None,
            sample_points: graph_stores().into_iter().next(),
        }),
        dataset("dummy_dataset"),
    ]
}

fn datasplits() -> Vec<DataSplitConfig> {
    vec![
        DataSplitConfig::TrainValidateDataSplitConfig(TrainValidateDataSplitConfig {
            name: "split".to_string(),
            train_configs: datasets(),
            validate_configs: vec![dataset("val")],
        }),
        DataSplitConfig::DummyDataSplitConfig(DummyDataSplitConfig {
            name: "dummy_split".to_string(),
            train_config: dataset("train"),
        }),
    ]
}

fn tasks() -> Vec<TaskConfig> {
    vec![
        TaskConfig::AffinitiesTaskConfig(AffinitiesTaskConfig {
            name: "affs".to_string(),
            neighborhood: vec![vec![1, 0, 0], vec![0, 1, 0], vec![0, 0, 1]],
        }),
        TaskConfig::DistanceTaskConfig(DistanceTaskConfig {
            name: "dist".to_string(),
            channels: vec!["mito".to_string(), "er".to_string()],
            scale_factor: 50.0,
            mask_distances: true,
        }),
        TaskConfig::OneHotTaskConfig(OneHotTaskConfig {
            name: "onehot".to_string(),
            classes: vec!["bg".to_string(), "fg".to_string()],
        }),
        TaskConfig::DummyTaskConfig(DummyTaskConfig {
            name: "dummy_task".to_string(),
            embedding_dims: 12,
            detection_threshold: f64::INFINITY,
        }),
    ]
}

fn architectures() -> Vec<ArchitectureConfig> {
    vec![
        ArchitectureConfig::UNetConfig(UNetConfig {
            name: "unet".to_string(),
            input_shape: vec![132, 132, 132],
            fmaps_out: 12,
            num_fmaps: 12,
            fmap_inc_factor: 6,
            downsample_factors: vec![vec![2, 2, 2], vec![3, 3, 3]],
            constant_upsample: true,
        }),
        ArchitectureConfig::DummyArchitectureConfig(DummyArchitectureConfig {
            name: "dummy_arch".to_string(),
            num_in_channels: 1,
            num_out_channels: 2,
        }),
    ]
}

fn trainers() -> Vec<TrainerConfig> {
    vec![
        TrainerConfig::GunpowderTrainerConfig(GunpowderTrainerConfig {
            name: "gp".to_string(),
            batch_size: 1,
            learning_rate: 1e-4,
            num_data_fetchers: 20,
            augments: vec!["elastic".to_string(), "intensity".to_string()],
        }),
        TrainerConfig::DummyTrainerConfig(DummyTrainerConfig {
            name: "dummy_trainer".to_string(),
            batch_size: 2,
            learning_rate: f64::NEG_INFINITY,
            mirror_augment: false,
        }),
    ]
}

#[test]
fn test_named_families_round_trip() {
    for value in arrays() {
        assert_round_trip(&value);
        assert_stored_round_trip(&value);
    }
    for value in graph_stores() {
        assert_round_trip(&value);
        assert_stored_round_trip(&value);
    }
    for value in datasets() {
        assert_round_trip(&value);
        assert_stored_round_trip(&value);
    }
    for value in datasplits() {
        assert_round_trip(&value);
        assert_stored_round_trip(&value);
    }
    for value in tasks() {
        assert_round_trip(&value);
        assert_stored_round_trip(&value);
    }
    for value in architectures() {
        assert_round_trip(&value);
        assert_stored_round_trip(&value);
    }
    for value in trainers() {
        assert_round_trip(&value);
        assert_stored_round_trip(&value);
    }
}

#[test]
fn test_run_config_round_trip() {
    let mut run = run_config("run");
    assert_round_trip(&run);
    assert_stored_round_trip(&run);

    run.started = Some("2024-05-01T08:30:00Z".parse().unwrap());
    assert_round_trip(&run);
    assert_stored_round_trip(&run);
}

#[test]
fn test_unnamed_families_round_trip() {
    let scores = [
        EvaluationScores::InstanceEvaluationScores(InstanceEvaluationScores {
            voi_split: 0.5,
            voi_merge: 0.25,
        }),
        EvaluationScores::BinarySegmentationEvaluationScores(BinarySegmentationEvaluationScores {
            dice: 0.75,
            jaccard: 0.5,
            hausdorff: f64::INFINITY,
            false_negative_rate: 0.125,
            false_positive_rate: 0.0,
        }),
        EvaluationScores::DummyEvaluationScores(DummyEvaluationScores {
            frizz_level: 3.0,
            blipp_score: 1.5,
        }),
    ];
    for value in &scores {
        assert_round_trip(value);
        assert_eq!(value.criteria().len(), value.values().len());
    }

    let parameters = [
        PostProcessorParameters::ArgmaxPostProcessorParameters(ArgmaxPostProcessorParameters {
            id: 0,
        }),
        PostProcessorParameters::ThresholdPostProcessorParameters(
            ThresholdPostProcessorParameters {
                id: 1,
                threshold: 0.5,
            },
        ),
        PostProcessorParameters::WatershedPostProcessorParameters(
            WatershedPostProcessorParameters { id: 2, bias: -0.5 },
        ),
        params(3),
    ];
    for value in &parameters {
        assert_round_trip(value);
    }
}

#[test]
fn test_nan_fields_are_written_as_sentinels() {
    let trainer = TrainerConfig::DummyTrainerConfig(DummyTrainerConfig {
        name: "nan_trainer".to_string(),
        batch_size: 1,
        learning_rate: f64::NAN,
        mirror_augment: false,
    });
    let doc = unstructure(&trainer).unwrap();
    assert_eq!(doc["learning_rate"], "NaN");

    // storing twice neither conflicts nor duplicates
    let (_, stores) = memory_stores();
    let id = stores.configs.store(&trainer).unwrap();
    assert_eq!(stores.configs.store(&trainer).unwrap(), id);
    match stores.configs.retrieve::<TrainerConfig>("nan_trainer").unwrap() {
        TrainerConfig::DummyTrainerConfig(t) => assert!(t.learning_rate.is_nan()),
        other => panic!("unexpected variant {other:?}"),
    }
}
