//! Job lifecycle integration tests.
//!
//! Exercises the state machine through the registry and runner with a stub
//! capability operating on real temp files.

mod common;

use std::time::Duration;

use common::{StubMode, TestHarness};
use morphd::jobs::JobStatus;
use morphd_engines::ConvertOptions;

// ---------------------------------------------------------------------------
// Queue -> run -> progress -> complete
// ---------------------------------------------------------------------------

#[tokio::test]
async fn job_runs_to_completion() {
    let harness = TestHarness::new();
    let input = harness.write_input("note.txt", b"hello");

    let job = harness.registry.create(
        input,
        morphd_core::Category::Document,
        "out".into(),
        ConvertOptions::default(),
        None,
    );
    assert_eq!(job.status, JobStatus::Queued);
    assert_eq!(job.progress, 0);

    harness.runner.run(job.id).await;

    let done = harness.registry.get(job.id).unwrap();
    assert_eq!(done.status, JobStatus::Completed);
    assert_eq!(done.progress, 100);
    assert_eq!(done.eta_seconds, Some(0));
    assert_eq!(done.output_paths.len(), 1);
    assert!(done.output_paths[0].exists());
    assert_eq!(
        std::fs::read(&done.output_paths[0]).unwrap(),
        b"hello".to_vec()
    );
}

// ---------------------------------------------------------------------------
// Engine failure -> failed with the engine message
// ---------------------------------------------------------------------------

#[tokio::test]
async fn engine_failure_is_recorded_on_the_job() {
    let harness = TestHarness::with_stub(StubMode::Fail("codec exploded".into()));
    let input = harness.write_input("bad.txt", b"x");

    let job = harness.registry.create(
        input,
        morphd_core::Category::Document,
        "out".into(),
        ConvertOptions::default(),
        None,
    );

    harness.runner.run(job.id).await;

    let failed = harness.registry.get(job.id).unwrap();
    assert_eq!(failed.status, JobStatus::Failed);
    let error = failed.error.unwrap();
    assert!(error.contains("codec exploded"), "error was: {error}");
    assert!(failed.output_paths.is_empty());
}

// ---------------------------------------------------------------------------
// Cancel while queued -> engine never starts
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cancel_while_queued_skips_execution() {
    let harness = TestHarness::new();
    let input = harness.write_input("queued.txt", b"x");

    let job = harness.registry.create(
        input.clone(),
        morphd_core::Category::Document,
        "out".into(),
        ConvertOptions::default(),
        None,
    );

    let cancelled = harness.registry.cancel(job.id).unwrap();
    assert_eq!(cancelled.status, JobStatus::Cancelled);
    // Cancellation removes the input artifact best-effort.
    assert!(!input.exists());

    harness.runner.run(job.id).await;

    let still = harness.registry.get(job.id).unwrap();
    assert_eq!(still.status, JobStatus::Cancelled);
    assert!(still.output_paths.is_empty());
}

// ---------------------------------------------------------------------------
// Cancel while running -> late result is discarded
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cancel_while_running_discards_the_result() {
    let harness = TestHarness::with_stub(StubMode::Slow(Duration::from_millis(200)));
    let input = harness.write_input("slow.txt", b"payload");

    let job = harness.registry.create(
        input,
        morphd_core::Category::Document,
        "out".into(),
        ConvertOptions::default(),
        None,
    );

    harness.runner.spawn(job.id);

    // Wait for the job to reach running, then cancel mid-flight.
    for _ in 0..50 {
        if harness.registry.get(job.id).unwrap().status == JobStatus::Running {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(
        harness.registry.get(job.id).unwrap().status,
        JobStatus::Running
    );
    harness.registry.cancel(job.id).unwrap();

    // Let the in-flight conversion finish; its output must be discarded.
    tokio::time::sleep(Duration::from_millis(400)).await;

    let job = harness.registry.get(job.id).unwrap();
    assert_eq!(job.status, JobStatus::Cancelled);
    assert!(job.output_paths.is_empty());
    assert!(
        !harness.config.conversion.output_dir.join("slow.out").exists(),
        "stale output should have been removed"
    );
}

// ---------------------------------------------------------------------------
// Batch fan-out: one bad sibling does not sink the batch
// ---------------------------------------------------------------------------

#[tokio::test]
async fn batch_jobs_share_a_batch_id_and_complete() {
    let harness = TestHarness::new();
    let batch_id = Some(morphd_core::BatchId::new());

    let mut ids = Vec::new();
    for n in 0..3 {
        let input = harness.write_input(&format!("file{n}.txt"), b"data");
        let job = harness.registry.create(
            input,
            morphd_core::Category::Document,
            "out".into(),
            ConvertOptions::default(),
            batch_id,
        );
        ids.push(job.id);
    }

    harness.runner.run_batch(ids.clone()).await;

    for id in ids {
        let job = harness.registry.get(id).unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.batch_id, batch_id);
    }
}

#[tokio::test]
async fn batch_with_missing_input_fails_only_that_job() {
    let harness = TestHarness::new();

    let good = harness.write_input("good.txt", b"ok");
    let missing = harness.input_dir.path().join("missing.txt");

    let good_job = harness.registry.create(
        good,
        morphd_core::Category::Document,
        "out".into(),
        ConvertOptions::default(),
        None,
    );
    let bad_job = harness.registry.create(
        missing,
        morphd_core::Category::Document,
        "out".into(),
        ConvertOptions::default(),
        None,
    );

    harness
        .runner
        .run_batch(vec![good_job.id, bad_job.id])
        .await;

    assert_eq!(
        harness.registry.get(good_job.id).unwrap().status,
        JobStatus::Completed
    );
    assert_eq!(
        harness.registry.get(bad_job.id).unwrap().status,
        JobStatus::Failed
    );
}
