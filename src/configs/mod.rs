//! Config records
//!
//! Every polymorphic config family is a closed enum written with a
//! `__type__` tag. Named families are [`ConfigRecord`]s and can be kept in
//! a [`ConfigStore`](crate::store::ConfigStore):
//!
//! ```text
//! RunConfig ──┬── TaskConfig
//!             ├── ArchitectureConfig
//!             ├── TrainerConfig
//!             └── DataSplitConfig ──< DatasetConfig ──┬── ArrayConfig
//!                                                     └── GraphStoreConfig
//! ```
//!
//! `EvaluationScores` and `PostProcessorParameters` are unnamed families that
//! only appear inside validation records.

use std::fmt;
use std::sync::OnceLock;

use crate::serialize::{TypeFamily, TypeRegistry};

/// Implements [`TypeFamily`] and [`ConfigRecord`] for a named family.
macro_rules! named_family {
    ($family:ty, $name:literal, $kind:ident, [$($variant:ident),+ $(,)?]) => {
        $crate::serialize::type_family!($family, $name, [$($variant),+]);

        impl $crate::configs::ConfigRecord for $family {
            const KIND: $crate::configs::ConfigKind = $crate::configs::ConfigKind::$kind;

            fn name(&self) -> &str {
                match self {
                    $(Self::$variant(inner) => &inner.name),+
                }
            }
        }
    };
}
pub(crate) use named_family;

mod architecture;
mod array;
mod datasplit;
mod evaluation;
mod post_processor;
mod run;
mod task;
mod trainer;

pub use architecture::{ArchitectureConfig, DummyArchitectureConfig, UNetConfig};
pub use array::{
    ArrayConfig, CsvGraphStoreConfig, DummyArrayConfig, DummyGraphStoreConfig, GraphStoreConfig,
    IntensitiesArrayConfig, LogicalOrArrayConfig, ZarrArrayConfig,
};
pub use datasplit::{
    DataSplitConfig, DatasetConfig, DummyDataSplitConfig, DummyDatasetConfig, RawGTDatasetConfig,
    TrainValidateDataSplitConfig,
};
pub use evaluation::{
    BinarySegmentationEvaluationScores, Criterion, DummyEvaluationScores, EvaluationScores,
    InstanceEvaluationScores,
};
pub use post_processor::{
    ArgmaxPostProcessorParameters, DummyPostProcessorParameters, PostProcessorParameters,
    ThresholdPostProcessorParameters, WatershedPostProcessorParameters,
};
pub use run::{RunConfig, RunConfigBuilder};
pub use task::{
    AffinitiesTaskConfig, DistanceTaskConfig, DummyTaskConfig, OneHotTaskConfig, TaskConfig,
};
pub use trainer::{DummyTrainerConfig, GunpowderTrainerConfig, TrainerConfig};

/// Kinds of named config records. Each kind has its own id and name space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKind {
    /// [`RunConfig`]
    Run,
    /// [`TaskConfig`]
    Task,
    /// [`ArchitectureConfig`]
    Architecture,
    /// [`TrainerConfig`]
    Trainer,
    /// [`DataSplitConfig`]
    DataSplit,
    /// [`DatasetConfig`]
    Dataset,
    /// [`ArrayConfig`]
    Array,
    /// [`GraphStoreConfig`]
    GraphStore,
}

impl ConfigKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 8] = [
        Self::Run,
        Self::Task,
        Self::Architecture,
        Self::Trainer,
        Self::DataSplit,
        Self::Dataset,
        Self::Array,
        Self::GraphStore,
    ];

    /// Collection name used in storage keys.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Run => "runs",
            Self::Task => "tasks",
            Self::Architecture => "architectures",
            Self::Trainer => "trainers",
            Self::DataSplit => "datasplits",
            Self::Dataset => "datasets",
            Self::Array => "arrays",
            Self::GraphStore => "graph_stores",
        }
    }
}

impl fmt::Display for ConfigKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named, typed config record.
pub trait ConfigRecord: TypeFamily + Clone {
    /// Kind (collection) the record is stored under.
    const KIND: ConfigKind;
    /// Mutable bookkeeping fields, ignored for identity and conflict checks.
    const BOOKKEEPING: &'static [&'static str] = &[];

    /// Human-readable name, unique per kind.
    fn name(&self) -> &str;
}

/// Register every config family with a registry.
pub fn register_hierarchies(registry: &mut TypeRegistry) {
    registry
        .register::<RunConfig>()
        .register::<TaskConfig>()
        .register::<ArchitectureConfig>()
        .register::<TrainerConfig>()
        .register::<DataSplitConfig>()
        .register::<DatasetConfig>()
        .register::<ArrayConfig>()
        .register::<GraphStoreConfig>()
        .register::<EvaluationScores>()
        .register::<PostProcessorParameters>();
}

/// Process-wide registry with every family registered.
pub fn registry() -> &'static TypeRegistry {
    static REGISTRY: OnceLock<TypeRegistry> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut registry = TypeRegistry::new();
        register_hierarchies(&mut registry);
        registry
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialize::{unstructure, TYPE_TAG};
    use serde_json::json;

    fn dummy_array(name: &str) -> ArrayConfig {
        ArrayConfig::DummyArrayConfig(DummyArrayConfig {
            name: name.to_string(),
        })
    }

    #[test]
    fn test_registry_knows_every_family() {
        let registry = registry();
        assert_eq!(registry.family_of("UNetConfig"), Some("ArchitectureConfig"));
        assert_eq!(registry.family_of("RunConfig"), Some("RunConfig"));
        assert_eq!(
            registry.family_of("ThresholdPostProcessorParameters"),
            Some("PostProcessorParameters")
        );
        assert!(registry.family_of("FancyNewConfig").is_none());
    }

    #[test]
    fn test_unstructure_writes_type_tag() {
        let value = unstructure(&dummy_array("raw")).unwrap();
        assert_eq!(value[TYPE_TAG], "DummyArrayConfig");
        assert_eq!(value["name"], "raw");
    }

    #[test]
    fn test_nested_round_trip() {
        let array = ArrayConfig::IntensitiesArrayConfig(IntensitiesArrayConfig {
            name: "norm".to_string(),
            source_array_config: Box::new(ArrayConfig::ZarrArrayConfig(ZarrArrayConfig {
                name: "raw".to_string(),
                file_name: "data.zarr".into(),
                dataset: "volumes/raw".to_string(),
                snap_to_grid: None,
            })),
            min: 0.0,
            max: 255.0,
        });
        let value = unstructure(&array).unwrap();
        assert_eq!(value["source_array_config"][TYPE_TAG], "ZarrArrayConfig");
        let back: ArrayConfig = registry().structure(value).unwrap();
        assert_eq!(back, array);
    }

    #[test]
    fn test_unknown_tag_is_unresolvable() {
        let value = json!({"__type__": "HoloArrayConfig", "name": "x"});
        let err = registry().structure::<ArrayConfig>(value).unwrap_err();
        assert!(matches!(err, crate::Error::UnresolvableTypeTag { .. }));
    }

    #[test]
    fn test_unknown_nested_tag_is_unresolvable() {
        let value = json!({
            "__type__": "LogicalOrArrayConfig",
            "name": "or",
            "source_array_config": {"__type__": "HoloArrayConfig", "name": "x"}
        });
        let err = registry().structure::<ArrayConfig>(value).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::UnresolvableTypeTag { ref tag, .. } if tag == "HoloArrayConfig"
        ));
    }

    #[test]
    fn test_tag_of_wrong_family_is_unresolvable() {
        let value = json!({"__type__": "DummyTaskConfig", "name": "x"});
        assert!(registry().structure::<ArrayConfig>(value).is_err());
    }

    #[test]
    fn test_config_kind_names_unique() {
        let mut names: Vec<_> = ConfigKind::ALL.iter().map(ConfigKind::as_str).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), ConfigKind::ALL.len());
    }
}
