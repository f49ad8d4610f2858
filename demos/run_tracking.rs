//! Run Tracking Example
//!
//! Demonstrates storing a run, training with periodic pushes, restarting,
//! and picking the best validation result.
//!
//! Run with: cargo run --example run_tracking
//! Verbose:  RUST_LOG=trueno_runstore=debug cargo run --example run_tracking

use anyhow::Context;
use tracing_subscriber::EnvFilter;
use trueno_runstore::config::{StoreConfig, Stores};
use trueno_runstore::configs::{
    ArchitectureConfig, ArrayConfig, DataSplitConfig, DatasetConfig, DummyArchitectureConfig,
    DummyArrayConfig, DummyDatasetConfig, DummyEvaluationScores, DummyTaskConfig,
    DummyTrainerConfig, EvaluationScores, PostProcessorParameters, RunConfig, TaskConfig,
    ThresholdPostProcessorParameters, TrainValidateDataSplitConfig, TrainerConfig,
};
use trueno_runstore::experiment::{Run, RunStatus, ValidationIterationScores};
use trueno_runstore::validation::{best_per_criterion, to_table, Dim};

fn dataset(name: &str) -> DatasetConfig {
    DatasetConfig::DummyDatasetConfig(DummyDatasetConfig {
        name: name.to_string(),
        weight: 1,
        raw_config: ArrayConfig::DummyArrayConfig(DummyArrayConfig {
            name: format!("{name}_raw"),
        }),
    })
}

fn run_config() -> RunConfig {
    RunConfig::builder(
        "demo_run",
        TaskConfig::DummyTaskConfig(DummyTaskConfig {
            name: "demo_task".to_string(),
            embedding_dims: 12,
            detection_threshold: 0.5,
        }),
        ArchitectureConfig::DummyArchitectureConfig(DummyArchitectureConfig {
            name: "demo_arch".to_string(),
            num_in_channels: 1,
            num_out_channels: 12,
        }),
        TrainerConfig::DummyTrainerConfig(DummyTrainerConfig {
            name: "demo_trainer".to_string(),
            batch_size: 4,
            learning_rate: 1e-4,
            mirror_augment: true,
        }),
        DataSplitConfig::TrainValidateDataSplitConfig(TrainValidateDataSplitConfig {
            name: "demo_split".to_string(),
            train_configs: vec![dataset("train")],
            validate_configs: vec![dataset("val_a"), dataset("val_b")],
        }),
    )
    .num_iterations(60)
    .validation_interval(20)
    .build()
}

fn thresholds() -> Vec<PostProcessorParameters> {
    [0.3, 0.5, 0.7]
        .into_iter()
        .zip(0..)
        .map(|(threshold, id)| {
            PostProcessorParameters::ThresholdPostProcessorParameters(
                ThresholdPostProcessorParameters { id, threshold },
            )
        })
        .collect()
}

/// Stand-in for a real training loop and evaluator.
fn train(run: &mut Run, until: u64) -> anyhow::Result<()> {
    let interval = run.config().validation_interval;
    let parameters = run.validation_scores().axes().parameters.clone();
    let datasets = run.validation_scores().axes().datasets.clone();

    for iteration in run.training_stats().trained_until()..until {
        let progress = f64::from(u32::try_from(iteration)?);
        run.training_stats_mut()
            .add_iteration(iteration, 1.0 / (1.0 + progress), 0.05)?;

        if (iteration + 1) % interval == 0 {
            let mut record = ValidationIterationScores::new(iteration);
            for dataset in &datasets {
                for (p, parameters) in parameters.iter().enumerate() {
                    let offset = f64::from(u32::try_from(p)?);
                    let scores = EvaluationScores::DummyEvaluationScores(DummyEvaluationScores {
                        frizz_level: progress / 100.0 - (offset - 1.0).abs() * 0.1,
                        blipp_score: 1.0 / (1.0 + progress) + offset * 0.01,
                    });
                    record = record.with_evaluation(dataset.clone(), parameters.clone(), &scores);
                }
            }
            run.validation_scores_mut().add_iteration_scores(record)?;
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("=== Trueno-Runstore Run Tracking ===\n");

    let root = std::env::temp_dir().join(format!("runstore-demo-{}", std::process::id()));
    let config = StoreConfig::files(&root);
    println!("Store: {}\n", root.display());

    // -------------------------------------------------------------------------
    // 1. First process: store the run, train, push
    // -------------------------------------------------------------------------
    println!("1. Training iterations 0..40...");
    {
        let stores = Stores::open(&config)?;
        let mut run = Run::new(run_config(), thresholds());
        run.start();
        train(&mut run, 40)?;
        let id = run.sync(&stores.configs, &stores.stats)?;
        println!("   Run id: {id}");
        println!(
            "   Pushed {} training records, {} validation records",
            run.training_stats().len(),
            run.validation_scores().len()
        );
    }

    // -------------------------------------------------------------------------
    // 2. Second process: resume and finish
    // -------------------------------------------------------------------------
    println!("\n2. Resuming...");
    let stores = Stores::open(&config)?;
    let mut run = Run::resume(&stores.configs, &stores.stats, "demo_run")
        .context("run should be stored by step 1")?;
    println!(
        "   Status {:?}, trained until {}",
        run.status(),
        run.training_stats().trained_until()
    );
    let limit = run.config().num_iterations;
    train(&mut run, limit)?;
    run.complete(RunStatus::Success);
    run.sync(&stores.configs, &stores.stats)?;

    // -------------------------------------------------------------------------
    // 3. Analysis
    // -------------------------------------------------------------------------
    println!("\n3. Best results");
    let scores = stores.stats.pull_validation_scores("demo_run")?;
    let table = to_table(&scores);
    let (coordinates, values) = best_per_criterion(&table, Dim::Parameter)?;
    let parameter_axis = table.axis(Dim::Parameter).context("parameter axis")?;
    for (flat, (best, value)) in coordinates.values().iter().zip(values.values()).enumerate() {
        let index = coordinates.coordinate(flat);
        let labels: Vec<String> = coordinates
            .axes()
            .iter()
            .zip(&index)
            .map(|(axis, &i)| axis.labels()[i].to_string())
            .collect();
        let winner = best.map_or_else(
            || "-".to_string(),
            |p| parameter_axis.labels()[p].to_string(),
        );
        println!("   {:<28} best {winner:<14} = {value:.3}", labels.join(" / "));
    }

    if let Some(best) = run.best_validation()? {
        println!(
            "\n   Selected: iteration {} on {} with {} ({} = {:.3})",
            best.iteration,
            best.dataset,
            best.parameters.label(),
            run.config().validation_score,
            best.value
        );
    }

    std::fs::remove_dir_all(&root).ok();
    println!("\n=== Done ===");
    Ok(())
}
