//! Dispatcher state machine integration tests.
//!
//! Memory stores, stubbed extractors, and the scripted mock backend make
//! every lifecycle property observable: idempotence via the generation call
//! counter, zombie re-dispatch, caller-driven error retry, the catch-all
//! terminal boundary, and duplicate concurrent uploads.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use harmon_core::{
    BlobStore, BlobStream, ContentDigest, DocType, DocumentKind, Error, GenerationError, Job,
    JobStatus, JobStore, OcrExtractor, PageRecord, Result, TableExtractor, TableRecord,
    TextExtractor, TextStrategy, TypeDetector,
};
use harmon_inference::{MockGenerationBackend, MockOutcome};
use harmon_jobs::{InlineScheduler, JobDispatcher, PipelineRunner, WorkerConfig, WorkerScheduler};
use harmon_pipeline::{MetadataSynthesizer, Pipeline, SynthesizerConfig};
use harmon_store::{MemoryBlobStore, MemoryJobStore};

const CSV: &[u8] = b"Dist_Code,Year,Amount\n101,2021,5000\n102,2021,6200\n";

/// Opt-in test logging: `RUST_LOG=debug cargo test -p harmon-jobs`.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ---------------------------------------------------------------------------
// Stubs
// ---------------------------------------------------------------------------

/// Extractor stubs for tests that never leave the tabular path.
struct UnusedDetector;

#[async_trait]
impl TypeDetector for UnusedDetector {
    async fn detect(&self, _path: &Path) -> Result<DocType> {
        Err(Error::Extraction("detector must not run".to_string()))
    }
}

/// Detector that panics, to exercise the catch-all boundary.
struct PanickingDetector;

#[async_trait]
impl TypeDetector for PanickingDetector {
    async fn detect(&self, _path: &Path) -> Result<DocType> {
        panic!("detector exploded");
    }
}

struct UnusedText;

#[async_trait]
impl TextExtractor for UnusedText {
    async fn extract_pages(&self, _path: &Path, _strategy: TextStrategy) -> Result<Vec<PageRecord>> {
        Err(Error::Extraction("text extractor must not run".to_string()))
    }
}

struct UnusedOcr;

#[async_trait]
impl OcrExtractor for UnusedOcr {
    async fn ocr_pages(&self, _path: &Path) -> Result<Vec<PageRecord>> {
        Err(Error::Extraction("ocr must not run".to_string()))
    }
}

struct UnusedTables;

#[async_trait]
impl TableExtractor for UnusedTables {
    async fn extract_tables(&self, _path: &Path) -> Result<Vec<TableRecord>> {
        Err(Error::Extraction("table extractor must not run".to_string()))
    }
}

/// Blob store whose reads always fail, for the storage-failure boundary.
struct ReadFailingBlobStore(MemoryBlobStore);

#[async_trait]
impl BlobStore for ReadFailingBlobStore {
    async fn save(&self, key: &str, data: &[u8]) -> Result<String> {
        self.0.save(key, data).await
    }

    async fn get(&self, _key: &str) -> Result<Vec<u8>> {
        Err(Error::Storage("simulated backend outage".to_string()))
    }

    async fn get_stream(&self, _key: &str) -> Result<BlobStream> {
        Err(Error::Storage("simulated backend outage".to_string()))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.0.delete(key).await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        self.0.list(prefix).await
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn record_json() -> String {
    serde_json::json!({
        "catalog_info": {
            "title": "District Expenditure 2021",
            "description": "District-wise expenditure figures.",
            "sector": "Finance",
            "keywords": ["expenditure", "district"]
        },
        "provenance": {
            "source": "Ministry of Finance",
            "jurisdiction": "National",
            "data_owner": "CGA"
        },
        "spatial_temporal": {
            "temporal_range": "2021-2021",
            "spatial_coverage": "National",
            "granularity": "District"
        },
        "technical_metadata": {
            "format": "CSV",
            "schema_details": [
                {"column": "Dist_Code", "standardized_header": "District_Code", "type": "Int", "description": "LGD district code"}
            ],
            "ai_readiness_level": 0.9,
            "machine_readable": true
        }
    })
    .to_string()
}

fn build_pipeline(backend: Arc<MockGenerationBackend>) -> Arc<Pipeline> {
    build_pipeline_with_detector(backend, Arc::new(UnusedDetector))
}

fn build_pipeline_with_detector(
    backend: Arc<MockGenerationBackend>,
    detector: Arc<dyn TypeDetector>,
) -> Arc<Pipeline> {
    let synthesizer = MetadataSynthesizer::new(
        backend,
        SynthesizerConfig::default()
            .with_base_delay_ms(1)
            .with_unknown_delay_ms(1),
    );
    Arc::new(Pipeline::new(
        detector,
        Arc::new(UnusedText),
        Arc::new(UnusedOcr),
        Arc::new(UnusedTables),
        synthesizer,
    ))
}

fn happy_backend() -> Arc<MockGenerationBackend> {
    Arc::new(
        MockGenerationBackend::new()
            .with_candidates(vec!["gemini-1.5-flash"])
            .with_default_response(record_json()),
    )
}

struct TestRig {
    dispatcher: JobDispatcher,
    jobs: Arc<MemoryJobStore>,
    blobs: Arc<MemoryBlobStore>,
}

fn inline_rig(backend: Arc<MockGenerationBackend>) -> TestRig {
    let jobs = Arc::new(MemoryJobStore::new());
    let blobs = Arc::new(MemoryBlobStore::new());
    let runner = Arc::new(PipelineRunner::new(
        jobs.clone(),
        blobs.clone(),
        build_pipeline(backend),
    ));
    let dispatcher = JobDispatcher::new(
        jobs.clone(),
        blobs.clone(),
        Arc::new(InlineScheduler::new(runner)),
    );
    TestRig {
        dispatcher,
        jobs,
        blobs,
    }
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn submit_then_poll_reaches_success() {
    init_tracing();
    let backend = happy_backend();
    let rig = inline_rig(backend.clone());

    let receipt = rig
        .dispatcher
        .submit(CSV, "spend.csv", DocumentKind::Tabular)
        .await
        .unwrap();
    assert_eq!(receipt.status, JobStatus::Processing);
    assert_eq!(receipt.digest, ContentDigest::of(CSV));

    let job = rig.dispatcher.poll(&receipt.digest).await.unwrap();
    assert_eq!(job.status, JobStatus::Success);
    assert_eq!(job.original_filename, "spend.csv");

    let record = job.result.unwrap();
    assert_eq!(record.catalog_info.title, "District Expenditure 2021");
    let schema = record.technical_metadata.schema_details.unwrap();
    assert_eq!(schema[0].standardized_header, "District_Code");

    // One blob stored under {digest}.csv
    let keys = rig.blobs.list("").await.unwrap();
    assert_eq!(keys, vec![format!("{}.csv", receipt.digest)]);
}

#[tokio::test]
async fn identical_bytes_are_idempotent_after_success() {
    let backend = happy_backend();
    let rig = inline_rig(backend.clone());

    rig.dispatcher
        .submit(CSV, "spend.csv", DocumentKind::Tabular)
        .await
        .unwrap();
    assert_eq!(backend.generate_call_count(), 1);

    let second = rig
        .dispatcher
        .submit(CSV, "spend.csv", DocumentKind::Tabular)
        .await
        .unwrap();
    assert_eq!(second.status, JobStatus::Success);
    // No second pipeline execution
    assert_eq!(backend.generate_call_count(), 1);
}

#[tokio::test]
async fn filename_is_metadata_not_identity() {
    let backend = happy_backend();
    let rig = inline_rig(backend.clone());

    rig.dispatcher
        .submit(CSV, "original.csv", DocumentKind::Tabular)
        .await
        .unwrap();
    let second = rig
        .dispatcher
        .submit(CSV, "renamed-copy.csv", DocumentKind::Tabular)
        .await
        .unwrap();

    assert_eq!(second.status, JobStatus::Success);
    assert_eq!(backend.generate_call_count(), 1);
    // The stored record keeps the first filename
    let job = rig.dispatcher.poll(&second.digest).await.unwrap();
    assert_eq!(job.original_filename, "original.csv");
}

#[tokio::test]
async fn zombie_processing_job_is_redispatched() {
    let backend = happy_backend();
    let rig = inline_rig(backend.clone());

    // A prior worker wrote `processing` and died without a terminal write
    let digest = ContentDigest::of(CSV);
    let zombie = Job::processing(digest.clone(), "spend.csv");
    rig.jobs.save(&digest, &zombie).await.unwrap();

    let receipt = rig
        .dispatcher
        .submit(CSV, "spend.csv", DocumentKind::Tabular)
        .await
        .unwrap();
    assert_eq!(receipt.status, JobStatus::Processing);

    // Exactly one fresh pipeline execution
    assert_eq!(backend.generate_call_count(), 1);
    let job = rig.dispatcher.poll(&digest).await.unwrap();
    assert_eq!(job.status, JobStatus::Success);
}

#[tokio::test]
async fn terminal_error_retries_only_on_resubmission() {
    let backend = Arc::new(
        MockGenerationBackend::new()
            .with_candidates(vec!["m1"])
            .with_sequence(
                "m1",
                vec![
                    MockOutcome::Err(GenerationError::InvalidInput("bad request".into())),
                    MockOutcome::Ok(record_json()),
                ],
            ),
    );
    let rig = inline_rig(backend.clone());

    rig.dispatcher
        .submit(CSV, "spend.csv", DocumentKind::Tabular)
        .await
        .unwrap();
    let digest = ContentDigest::of(CSV);

    let job = rig.dispatcher.poll(&digest).await.unwrap();
    assert_eq!(job.status, JobStatus::Error);
    assert!(job.error_message.is_some());
    // The error-shaped record is still populated for consumers
    assert!(job.result.as_ref().unwrap().is_error_shaped());
    assert_eq!(backend.generate_call_count(), 1);

    // Polling again does not retry
    rig.dispatcher.poll(&digest).await.unwrap();
    assert_eq!(backend.generate_call_count(), 1);

    // Explicit re-submission does
    rig.dispatcher
        .submit(CSV, "spend.csv", DocumentKind::Tabular)
        .await
        .unwrap();
    let job = rig.dispatcher.poll(&digest).await.unwrap();
    assert_eq!(job.status, JobStatus::Success);
    assert_eq!(backend.generate_call_count(), 2);
}

#[tokio::test]
async fn poll_unknown_digest_is_not_found() {
    let rig = inline_rig(happy_backend());
    let digest = ContentDigest::of(b"never submitted");
    let err = rig.dispatcher.poll(&digest).await.unwrap_err();
    assert!(matches!(err, Error::JobNotFound(_)));
}

// ---------------------------------------------------------------------------
// Failure boundaries
// ---------------------------------------------------------------------------

#[tokio::test]
async fn storage_read_failure_writes_terminal_error() {
    let backend = happy_backend();
    let jobs = Arc::new(MemoryJobStore::new());
    let blobs = Arc::new(ReadFailingBlobStore(MemoryBlobStore::new()));
    let runner = Arc::new(PipelineRunner::new(
        jobs.clone(),
        blobs.clone(),
        build_pipeline(backend.clone()),
    ));
    let dispatcher = JobDispatcher::new(jobs, blobs, Arc::new(InlineScheduler::new(runner)));

    let receipt = dispatcher
        .submit(CSV, "spend.csv", DocumentKind::Tabular)
        .await
        .unwrap();

    let job = dispatcher.poll(&receipt.digest).await.unwrap();
    assert_eq!(job.status, JobStatus::Error);
    assert!(job
        .error_message
        .unwrap()
        .contains("Failed to read stored upload"));
    // The model was never consulted
    assert_eq!(backend.generate_call_count(), 0);
}

#[tokio::test]
async fn panicking_stage_still_writes_terminal_error() {
    let backend = happy_backend();
    let jobs = Arc::new(MemoryJobStore::new());
    let blobs = Arc::new(MemoryBlobStore::new());
    let runner = Arc::new(PipelineRunner::new(
        jobs.clone(),
        blobs.clone(),
        build_pipeline_with_detector(backend, Arc::new(PanickingDetector)),
    ));
    let dispatcher = JobDispatcher::new(jobs, blobs, Arc::new(InlineScheduler::new(runner)));

    let receipt = dispatcher
        .submit(b"%PDF-1.4 fake", "doc.pdf", DocumentKind::Pdf)
        .await
        .unwrap();

    // Never stuck in processing: the catch-all boundary landed a terminal
    // error despite the panic.
    let job = dispatcher.poll(&receipt.digest).await.unwrap();
    assert_eq!(job.status, JobStatus::Error);
    assert!(job.error_message.unwrap().contains("panicked"));
}

// ---------------------------------------------------------------------------
// Concurrency and scheduling
// ---------------------------------------------------------------------------

#[tokio::test]
async fn concurrent_duplicate_uploads_converge_on_one_record() {
    let backend = happy_backend();
    let rig = Arc::new(inline_rig(backend.clone()));

    let a = {
        let rig = rig.clone();
        tokio::spawn(async move {
            rig.dispatcher
                .submit(CSV, "caller-a.csv", DocumentKind::Tabular)
                .await
                .unwrap()
        })
    };
    let b = {
        let rig = rig.clone();
        tokio::spawn(async move {
            rig.dispatcher
                .submit(CSV, "caller-b.csv", DocumentKind::Tabular)
                .await
                .unwrap()
        })
    };
    let (receipt_a, receipt_b) = (a.await.unwrap(), b.await.unwrap());
    assert_eq!(receipt_a.digest, receipt_b.digest);

    // Both callers observe the same terminal record
    let job_a = rig.dispatcher.poll(&receipt_a.digest).await.unwrap();
    let job_b = rig.dispatcher.poll(&receipt_b.digest).await.unwrap();
    assert_eq!(job_a.status, JobStatus::Success);
    assert_eq!(job_a.result, job_b.result);

    // Depending on interleaving the second submit is either a cache hit or
    // a zombie re-dispatch; last-write-wins allows at most two runs.
    let runs = backend.generate_call_count();
    assert!((1..=2).contains(&runs), "unexpected run count {}", runs);
    assert_eq!(rig.jobs.len().await, 1);
}

#[tokio::test]
async fn worker_scheduler_produces_identical_transitions() {
    init_tracing();
    let backend = happy_backend();
    let jobs = Arc::new(MemoryJobStore::new());
    let blobs = Arc::new(MemoryBlobStore::new());
    let runner = Arc::new(PipelineRunner::new(
        jobs.clone(),
        blobs.clone(),
        build_pipeline(backend.clone()),
    ));
    let (scheduler, handle) =
        WorkerScheduler::start(runner, WorkerConfig::default().with_max_concurrent(2));
    let dispatcher = JobDispatcher::new(jobs, blobs, Arc::new(scheduler));

    let receipt = dispatcher
        .submit(CSV, "spend.csv", DocumentKind::Tabular)
        .await
        .unwrap();
    assert_eq!(receipt.status, JobStatus::Processing);

    // Poll until the background run lands its terminal write
    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
    let job = loop {
        let job = dispatcher.poll(&receipt.digest).await.unwrap();
        if job.status.is_terminal() {
            break job;
        }
        assert!(std::time::Instant::now() < deadline, "job never left processing");
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    };

    assert_eq!(job.status, JobStatus::Success);
    assert_eq!(backend.generate_call_count(), 1);
    handle.shutdown().await.unwrap();
}
