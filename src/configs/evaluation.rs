//! Evaluation scores and criteria.

use serde::{Deserialize, Serialize};

use crate::serialize::type_family;

/// A named scalar metric with an optimization direction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Criterion {
    /// Metric name, e.g. `"voi_split"`.
    pub name: String,
    /// `true` if larger values are better.
    pub higher_is_better: bool,
}

impl Criterion {
    /// Criterion where larger values win.
    #[must_use]
    pub fn higher(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            higher_is_better: true,
        }
    }

    /// Criterion where smaller values win.
    #[must_use]
    pub fn lower(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            higher_is_better: false,
        }
    }

    /// Whether `candidate` strictly beats `incumbent`. NaN never beats anything,
    /// and any number beats NaN.
    #[must_use]
    pub fn improves(&self, candidate: f64, incumbent: f64) -> bool {
        if candidate.is_nan() {
            return false;
        }
        if incumbent.is_nan() {
            return true;
        }
        if self.higher_is_better {
            candidate > incumbent
        } else {
            candidate < incumbent
        }
    }
}

/// Instance segmentation scores (variation of information).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceEvaluationScores {
    /// Split part of the variation of information.
    #[serde(with = "crate::serialize::float")]
    pub voi_split: f64,
    /// Merge part of the variation of information.
    #[serde(with = "crate::serialize::float")]
    pub voi_merge: f64,
}

impl InstanceEvaluationScores {
    /// Criteria in score-vector order.
    #[must_use]
    pub fn criteria() -> Vec<Criterion> {
        vec![
            Criterion::lower("voi_split"),
            Criterion::lower("voi_merge"),
            Criterion::lower("voi"),
        ]
    }

    fn values(&self) -> Vec<f64> {
        vec![self.voi_split, self.voi_merge, self.voi_split + self.voi_merge]
    }
}

/// Binary (foreground/background) segmentation scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinarySegmentationEvaluationScores {
    /// Sørensen–Dice coefficient.
    #[serde(with = "crate::serialize::float")]
    pub dice: f64,
    /// Jaccard index.
    #[serde(with = "crate::serialize::float")]
    pub jaccard: f64,
    /// Hausdorff distance.
    #[serde(with = "crate::serialize::float")]
    pub hausdorff: f64,
    /// Fraction of missed foreground.
    #[serde(with = "crate::serialize::float")]
    pub false_negative_rate: f64,
    /// Fraction of spurious foreground.
    #[serde(with = "crate::serialize::float")]
    pub false_positive_rate: f64,
}

impl BinarySegmentationEvaluationScores {
    /// Criteria in score-vector order.
    #[must_use]
    pub fn criteria() -> Vec<Criterion> {
        vec![
            Criterion::higher("dice"),
            Criterion::higher("jaccard"),
            Criterion::lower("hausdorff"),
            Criterion::lower("false_negative_rate"),
            Criterion::lower("false_positive_rate"),
        ]
    }

    fn values(&self) -> Vec<f64> {
        vec![
            self.dice,
            self.jaccard,
            self.hausdorff,
            self.false_negative_rate,
            self.false_positive_rate,
        ]
    }
}

/// Scores of the dummy task, used in tests and demos.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DummyEvaluationScores {
    /// Higher is better.
    #[serde(with = "crate::serialize::float")]
    pub frizz_level: f64,
    /// Lower is better.
    #[serde(with = "crate::serialize::float")]
    pub blipp_score: f64,
}

impl DummyEvaluationScores {
    /// Criteria in score-vector order.
    #[must_use]
    pub fn criteria() -> Vec<Criterion> {
        vec![Criterion::higher("frizz_level"), Criterion::lower("blipp_score")]
    }

    fn values(&self) -> Vec<f64> {
        vec![self.frizz_level, self.blipp_score]
    }
}

/// Scores an evaluator produced for one (dataset, parameter set) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "__type__")]
#[allow(clippy::enum_variant_names)]
pub enum EvaluationScores {
    /// Instance segmentation.
    InstanceEvaluationScores(InstanceEvaluationScores),
    /// Binary segmentation.
    BinarySegmentationEvaluationScores(BinarySegmentationEvaluationScores),
    /// Dummy task.
    DummyEvaluationScores(DummyEvaluationScores),
}

type_family!(
    EvaluationScores,
    "EvaluationScores",
    [
        InstanceEvaluationScores,
        BinarySegmentationEvaluationScores,
        DummyEvaluationScores,
    ]
);

impl EvaluationScores {
    /// Criteria of this score kind, in [`Self::values`] order.
    #[must_use]
    pub fn criteria(&self) -> Vec<Criterion> {
        match self {
            Self::InstanceEvaluationScores(_) => InstanceEvaluationScores::criteria(),
            Self::BinarySegmentationEvaluationScores(_) => {
                BinarySegmentationEvaluationScores::criteria()
            }
            Self::DummyEvaluationScores(_) => DummyEvaluationScores::criteria(),
        }
    }

    /// Per-criterion score vector.
    #[must_use]
    pub fn values(&self) -> Vec<f64> {
        match self {
            Self::InstanceEvaluationScores(s) => s.values(),
            Self::BinarySegmentationEvaluationScores(s) => s.values(),
            Self::DummyEvaluationScores(s) => s.values(),
        }
    }

    /// Direction of a criterion, `None` if this kind does not define it.
    #[must_use]
    pub fn higher_is_better(&self, criterion: &str) -> Option<bool> {
        self.criteria()
            .into_iter()
            .find(|c| c.name == criterion)
            .map(|c| c.higher_is_better)
    }
}
