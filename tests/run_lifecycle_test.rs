//! Run lifecycle tests: a run process that restarts, falls behind, or races

mod common;

use common::{params, run_config};
use trueno_runstore::config::{StoreConfig, Stores};
use trueno_runstore::configs::{DummyEvaluationScores, EvaluationScores};
use trueno_runstore::experiment::{Run, RunStatus, ValidationIterationScores};
use trueno_runstore::store::ReconcilePolicy;
use trueno_runstore::Error;

fn evaluation(frizz_level: f64) -> EvaluationScores {
    EvaluationScores::DummyEvaluationScores(DummyEvaluationScores {
        frizz_level,
        blipp_score: 1.0 - frizz_level,
    })
}

/// Train `run` up to `until`, validating every 10 iterations.
fn train(run: &mut Run, until: u64) {
    for iteration in run.training_stats().trained_until()..until {
        run.training_stats_mut()
            .add_iteration(iteration, 1.0 / f64::from(1u32 << (iteration % 8)), 0.5)
            .unwrap();
        if iteration % 10 == 9 {
            let quality = f64::from(u32::try_from(iteration).unwrap()) / 1000.0;
            let mut record = ValidationIterationScores::new(iteration);
            for dataset in ["val_a", "val_b"] {
                for id in 0..2 {
                    record = record.with_evaluation(dataset, params(id), &evaluation(quality));
                }
            }
            run.validation_scores_mut().add_iteration_scores(record).unwrap();
        }
    }
}

#[test]
fn test_restart_resumes_where_store_left_off() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig::files(dir.path());

    {
        let stores = Stores::open(&config).unwrap();
        let mut run = Run::new(run_config("resumable"), vec![params(0), params(1)]);
        run.start();
        train(&mut run, 30);
        run.sync(&stores.configs, &stores.stats).unwrap();
    }

    // new process
    let stores = Stores::open(&config).unwrap();
    let mut run = Run::resume(&stores.configs, &stores.stats, "resumable").unwrap();
    assert_eq!(run.status(), RunStatus::Running);
    assert_eq!(run.training_stats().trained_until(), 30);
    assert_eq!(run.validation_scores().validated_until(), 30);

    train(&mut run, 50);
    run.complete(RunStatus::Success);
    run.sync(&stores.configs, &stores.stats).unwrap();

    let done = Run::resume(&stores.configs, &stores.stats, "resumable").unwrap();
    assert_eq!(done.status(), RunStatus::Success);
    assert_eq!(done.training_stats().len(), 50);
    assert_eq!(done.validation_scores().len(), 5);

    let best = done.best_validation().unwrap().unwrap();
    assert_eq!(best.iteration, 49);
    assert_eq!(best.dataset, "val_a");
    assert_eq!(best.parameters, params(0));
}

#[test]
fn test_retrained_run_replaces_stale_tail() {
    let stores = Stores::open(&StoreConfig::default()).unwrap();
    let mut first = Run::new(run_config("retrained"), vec![params(0), params(1)]);
    train(&mut first, 40);
    first.sync(&stores.configs, &stores.stats).unwrap();

    let mut again = Run::new(run_config("retrained"), vec![params(0), params(1)]);
    train(&mut again, 20);
    again.sync(&stores.configs, &stores.stats).unwrap();

    let pulled = stores.stats.pull_training_stats("retrained").unwrap();
    assert_eq!(pulled.trained_until(), 20);
    assert_eq!(
        stores
            .stats
            .pull_validation_scores("retrained")
            .unwrap()
            .validated_until(),
        20
    );
}

#[test]
fn test_reject_rollback_protects_longer_series() {
    let config = StoreConfig {
        reconcile: ReconcilePolicy::RejectRollback,
        ..StoreConfig::default()
    };
    let stores = Stores::open(&config).unwrap();
    let mut first = Run::new(run_config("guarded"), vec![params(0)]);
    train(&mut first, 40);
    first.sync(&stores.configs, &stores.stats).unwrap();

    let mut stale = Run::new(run_config("guarded"), vec![params(0)]);
    train(&mut stale, 20);
    assert!(matches!(
        stale.sync(&stores.configs, &stores.stats),
        Err(Error::StaleLocalSeries { .. })
    ));
    assert_eq!(
        stores.stats.pull_training_stats("guarded").unwrap().trained_until(),
        40
    );
}

#[test]
fn test_changed_config_under_same_name_is_rejected() {
    let stores = Stores::open(&StoreConfig::default()).unwrap();
    Run::new(run_config("named"), vec![params(0)])
        .sync(&stores.configs, &stores.stats)
        .unwrap();

    let mut changed = run_config("named");
    changed.num_iterations += 1;
    assert!(matches!(
        Run::new(changed, vec![params(0)]).sync(&stores.configs, &stores.stats),
        Err(Error::DuplicateName { .. })
    ));
}
