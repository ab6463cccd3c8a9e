//! End-to-end page-operation tests through the document capability and the
//! full job pipeline. These paths are pure lopdf, so no external engines
//! are needed.

mod common;

use common::{pdf_page_count, TestHarness};
use morphd::jobs::JobStatus;
use morphd_core::Category;
use morphd_engines::ConvertOptions;

fn submit_pdf_job(
    harness: &TestHarness,
    input: std::path::PathBuf,
    options: ConvertOptions,
) -> morphd_core::JobId {
    let category = harness
        .capabilities
        .validate(&input, "pdf")
        .expect("pdf submission should validate");
    assert_eq!(category, Category::Document);
    harness
        .registry
        .create(input, category, "pdf".into(), options, None)
        .id
}

// ---------------------------------------------------------------------------
// Split: two halves of a 10-page document
// ---------------------------------------------------------------------------

#[tokio::test]
async fn split_ten_pages_into_two_halves() {
    let harness = TestHarness::with_real_capabilities();
    let input = harness.write_pdf("tenpager.pdf", 10);

    let options = ConvertOptions {
        split: vec!["1-5".into(), "6-10".into()],
        ..ConvertOptions::default()
    };
    let id = submit_pdf_job(&harness, input, options);

    harness.runner.run(id).await;

    let job = harness.registry.get(id).unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.progress, 100);
    assert_eq!(job.output_paths.len(), 2);

    for path in &job.output_paths {
        assert!(path.exists(), "{} missing", path.display());
        assert_eq!(pdf_page_count(path), 5);
    }
    assert!(job.output_paths[0]
        .file_name()
        .unwrap()
        .to_string_lossy()
        .contains("part-1"));
}

// ---------------------------------------------------------------------------
// Split: out-of-range ranges are skipped
// ---------------------------------------------------------------------------

#[tokio::test]
async fn split_skips_out_of_range_specs() {
    let harness = TestHarness::with_real_capabilities();
    let input = harness.write_pdf("tenpager.pdf", 10);

    let options = ConvertOptions {
        split: vec!["1-3".into(), "20-30".into()],
        ..ConvertOptions::default()
    };
    let id = submit_pdf_job(&harness, input, options);

    harness.runner.run(id).await;

    let job = harness.registry.get(id).unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.output_paths.len(), 1);
    assert_eq!(pdf_page_count(&job.output_paths[0]), 3);
}

// ---------------------------------------------------------------------------
// Split: nothing matches -> the job fails rather than "succeeding" empty
// ---------------------------------------------------------------------------

#[tokio::test]
async fn split_with_no_matching_pages_fails() {
    let harness = TestHarness::with_real_capabilities();
    let input = harness.write_pdf("small.pdf", 3);

    let options = ConvertOptions {
        split: vec!["10-20".into()],
        ..ConvertOptions::default()
    };
    let id = submit_pdf_job(&harness, input, options);

    harness.runner.run(id).await;

    let job = harness.registry.get(id).unwrap();
    assert_eq!(job.status, JobStatus::Failed);
}

// ---------------------------------------------------------------------------
// Page selection
// ---------------------------------------------------------------------------

#[tokio::test]
async fn page_range_subsets_the_document() {
    let harness = TestHarness::with_real_capabilities();
    let input = harness.write_pdf("report.pdf", 8);

    let options = ConvertOptions {
        page_range: Some("5,1-3".into()),
        ..ConvertOptions::default()
    };
    let id = submit_pdf_job(&harness, input, options);

    harness.runner.run(id).await;

    let job = harness.registry.get(id).unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.output_paths.len(), 1);
    assert_eq!(pdf_page_count(&job.output_paths[0]), 4);
}

// ---------------------------------------------------------------------------
// Merge
// ---------------------------------------------------------------------------

#[tokio::test]
async fn merge_appends_documents_in_order() {
    let harness = TestHarness::with_real_capabilities();
    let first = harness.write_pdf("first.pdf", 3);
    let second = harness.write_pdf("second.pdf", 2);

    let options = ConvertOptions {
        merge: vec![second],
        ..ConvertOptions::default()
    };
    let id = submit_pdf_job(&harness, first, options);

    harness.runner.run(id).await;

    let job = harness.registry.get(id).unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.output_paths.len(), 1);
    assert_eq!(pdf_page_count(&job.output_paths[0]), 5);
}

// ---------------------------------------------------------------------------
// Plain pdf -> pdf rewrite keeps the page count
// ---------------------------------------------------------------------------

#[tokio::test]
async fn plain_rewrite_preserves_pages() {
    let harness = TestHarness::with_real_capabilities();
    let input = harness.write_pdf("plain.pdf", 6);

    let id = submit_pdf_job(&harness, input, ConvertOptions::default());
    harness.runner.run(id).await;

    let job = harness.registry.get(id).unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(pdf_page_count(&job.output_paths[0]), 6);
}
