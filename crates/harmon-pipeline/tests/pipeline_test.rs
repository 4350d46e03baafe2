//! Pipeline driver tests with stubbed leaf extractors.
//!
//! Stage isolation, fallback chains, and the no-content short-circuit are
//! all observable without any external tools: every extractor is injected.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use harmon_core::{
    DocType, DocumentKind, Error, ExtractionMethod, GenerationError, OcrExtractor, PageRecord,
    Result, Sector, TableExtractor, TableRecord, TextExtractor, TextStrategy, TypeDetector,
};
use harmon_inference::MockGenerationBackend;
use harmon_pipeline::{MetadataSynthesizer, Pipeline, SynthesizerConfig};

// ---------------------------------------------------------------------------
// Stub extractors
// ---------------------------------------------------------------------------

struct StubDetector(std::result::Result<DocType, String>);

#[async_trait]
impl TypeDetector for StubDetector {
    async fn detect(&self, _path: &Path) -> Result<DocType> {
        self.0.clone().map_err(Error::Extraction)
    }
}

struct StubText {
    raw: std::result::Result<Vec<PageRecord>, String>,
    layout: std::result::Result<Vec<PageRecord>, String>,
}

#[async_trait]
impl TextExtractor for StubText {
    async fn extract_pages(&self, _path: &Path, strategy: TextStrategy) -> Result<Vec<PageRecord>> {
        let outcome = match strategy {
            TextStrategy::Raw => &self.raw,
            TextStrategy::Layout => &self.layout,
        };
        outcome.clone().map_err(Error::Extraction)
    }
}

struct StubOcr(std::result::Result<Vec<PageRecord>, String>);

#[async_trait]
impl OcrExtractor for StubOcr {
    async fn ocr_pages(&self, _path: &Path) -> Result<Vec<PageRecord>> {
        self.0.clone().map_err(Error::Extraction)
    }
}

struct StubTables(std::result::Result<Vec<TableRecord>, String>);

#[async_trait]
impl TableExtractor for StubTables {
    async fn extract_tables(&self, _path: &Path) -> Result<Vec<TableRecord>> {
        self.0.clone().map_err(Error::Extraction)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn pages_of(texts: &[&str]) -> Vec<PageRecord> {
    texts
        .iter()
        .enumerate()
        .map(|(i, text)| PageRecord {
            page_number: (i + 1) as u32,
            text: text.to_string(),
        })
        .collect()
}

fn sample_table() -> TableRecord {
    TableRecord {
        table_id: 0,
        page_number: 1,
        accuracy: 0.92,
        whitespace_ratio: 0.05,
        grid: vec![
            vec!["Dist_Code".to_string(), "Year".to_string()],
            vec!["101".to_string(), "2021".to_string()],
        ],
    }
}

fn record_json() -> String {
    serde_json::json!({
        "catalog_info": {
            "title": "District Enrolment Statistics 2021",
            "description": "Annual school enrolment by district.",
            "sector": "Education",
            "keywords": ["education", "enrolment"]
        },
        "provenance": {
            "source": "Ministry of Education",
            "jurisdiction": "National",
            "data_owner": "UDISE+"
        },
        "spatial_temporal": {
            "temporal_range": "2021-2022",
            "spatial_coverage": "National",
            "granularity": "District"
        },
        "technical_metadata": {
            "format": "PDF",
            "ai_readiness_level": 0.6,
            "machine_readable": false
        }
    })
    .to_string()
}

fn pipeline_with(
    detector: StubDetector,
    text: StubText,
    ocr: StubOcr,
    tables: StubTables,
    backend: Arc<MockGenerationBackend>,
) -> Pipeline {
    let synthesizer = MetadataSynthesizer::new(
        backend,
        SynthesizerConfig::default()
            .with_base_delay_ms(1)
            .with_unknown_delay_ms(1),
    );
    Pipeline::new(
        Arc::new(detector),
        Arc::new(text),
        Arc::new(ocr),
        Arc::new(tables),
        synthesizer,
    )
}

fn happy_backend() -> Arc<MockGenerationBackend> {
    Arc::new(
        MockGenerationBackend::new()
            .with_candidates(vec!["gemini-1.5-flash"])
            .with_default_response(record_json()),
    )
}

// ---------------------------------------------------------------------------
// PDF path
// ---------------------------------------------------------------------------

#[tokio::test]
async fn digital_happy_path() {
    let backend = happy_backend();
    let pipeline = pipeline_with(
        StubDetector(Ok(DocType::Digital)),
        StubText {
            raw: Ok(pages_of(&["Enrolment by district, 2021. Detailed tables follow."])),
            layout: Ok(vec![]),
        },
        StubOcr(Err("must not run".to_string())),
        StubTables(Ok(vec![sample_table()])),
        backend.clone(),
    );

    let report = pipeline.run(b"%PDF-bytes", "report.pdf", DocumentKind::Pdf).await;

    assert_eq!(report.doc_type, Some(DocType::Digital));
    assert_eq!(report.lineage.extraction_method, ExtractionMethod::DigitalText);
    assert_eq!(report.metadata.catalog_info.sector, Sector::Education);
    assert!(report.errors.is_empty(), "unexpected errors: {:?}", report.errors);
    assert_eq!(backend.generate_call_count(), 1);
    assert_eq!(
        report.semantic.column_mappings["Dist_Code"],
        "spatial_district"
    );
}

#[tokio::test]
async fn blank_raw_text_falls_back_to_layout_strategy() {
    let pipeline = pipeline_with(
        StubDetector(Ok(DocType::Digital)),
        StubText {
            raw: Ok(pages_of(&["", "  "])),
            layout: Ok(pages_of(&["Recovered by layout-preserving extraction."])),
        },
        StubOcr(Err("must not run".to_string())),
        StubTables(Ok(vec![])),
        happy_backend(),
    );

    let report = pipeline.run(b"%PDF", "layout.pdf", DocumentKind::Pdf).await;

    assert_eq!(report.lineage.extraction_method, ExtractionMethod::DigitalText);
    assert!(report.pages[0].text.contains("layout-preserving"));
    assert!(!report.metadata.is_error_shaped());
}

#[tokio::test]
async fn digital_extraction_failure_falls_back_to_ocr() {
    let pipeline = pipeline_with(
        StubDetector(Ok(DocType::Digital)),
        StubText {
            raw: Err("pdftotext crashed".to_string()),
            layout: Ok(vec![]),
        },
        StubOcr(Ok(pages_of(&["OCR recovered this page."]))),
        StubTables(Ok(vec![])),
        happy_backend(),
    );

    let report = pipeline.run(b"%PDF", "scan.pdf", DocumentKind::Pdf).await;

    assert_eq!(report.lineage.extraction_method, ExtractionMethod::OcrFallback);
    assert!(report
        .errors
        .iter()
        .any(|e| e.starts_with("Text extraction:")));
    assert!(!report.metadata.is_error_shaped());
}

#[tokio::test]
async fn scanned_document_goes_straight_to_ocr() {
    let pipeline = pipeline_with(
        StubDetector(Ok(DocType::Scanned)),
        StubText {
            raw: Err("must not run".to_string()),
            layout: Err("must not run".to_string()),
        },
        StubOcr(Ok(pages_of(&["Text recovered from a scanned page."]))),
        StubTables(Ok(vec![])),
        happy_backend(),
    );

    let report = pipeline.run(b"%PDF", "scanned.pdf", DocumentKind::Pdf).await;

    assert_eq!(report.doc_type, Some(DocType::Scanned));
    assert_eq!(report.lineage.extraction_method, ExtractionMethod::FullOcr);
    assert!(report.errors.is_empty());
}

#[tokio::test]
async fn detector_failure_defaults_to_digital() {
    let pipeline = pipeline_with(
        StubDetector(Err("pdfimages not installed".to_string())),
        StubText {
            raw: Ok(pages_of(&["Plain digital content."])),
            layout: Ok(vec![]),
        },
        StubOcr(Err("must not run".to_string())),
        StubTables(Ok(vec![])),
        happy_backend(),
    );

    let report = pipeline.run(b"%PDF", "noimg.pdf", DocumentKind::Pdf).await;

    assert_eq!(report.doc_type, Some(DocType::Digital));
    assert!(report.errors.iter().any(|e| e.starts_with("Detection:")));
    assert!(!report.metadata.is_error_shaped());
}

#[tokio::test]
async fn table_failure_never_blocks_text_results() {
    let pipeline = pipeline_with(
        StubDetector(Ok(DocType::Digital)),
        StubText {
            raw: Ok(pages_of(&["Text survives a table extractor crash."])),
            layout: Ok(vec![]),
        },
        StubOcr(Err("must not run".to_string())),
        StubTables(Err("grid detector segfault".to_string())),
        happy_backend(),
    );

    let report = pipeline.run(b"%PDF", "tables.pdf", DocumentKind::Pdf).await;

    assert!(report.tables.is_empty());
    assert!(report
        .errors
        .iter()
        .any(|e| e.starts_with("Table extraction:")));
    assert!(!report.metadata.is_error_shaped());
}

#[tokio::test]
async fn no_content_skips_generation_entirely() {
    let backend = happy_backend();
    let pipeline = pipeline_with(
        StubDetector(Ok(DocType::Digital)),
        StubText {
            raw: Ok(vec![]),
            layout: Ok(vec![]),
        },
        StubOcr(Ok(vec![])),
        StubTables(Ok(vec![])),
        backend.clone(),
    );

    let report = pipeline.run(b"%PDF", "empty.pdf", DocumentKind::Pdf).await;

    assert!(report.metadata.is_error_shaped());
    assert_eq!(report.metadata.catalog_info.sector, Sector::Governance);
    assert_eq!(report.confidence, 0.0);
    assert_eq!(backend.generate_call_count(), 0, "empty prompt must never reach the model");
}

#[tokio::test]
async fn synthesis_exhaustion_substitutes_error_shaped_record() {
    let backend = Arc::new(
        MockGenerationBackend::new()
            .with_candidates(vec!["m1"])
            .with_failure("m1", GenerationError::InvalidInput("400".into())),
    );
    let pipeline = pipeline_with(
        StubDetector(Ok(DocType::Digital)),
        StubText {
            raw: Ok(pages_of(&["Plenty of extractable text to prompt with."])),
            layout: Ok(vec![]),
        },
        StubOcr(Err("must not run".to_string())),
        StubTables(Ok(vec![])),
        backend,
    );

    let report = pipeline.run(b"%PDF", "doc.pdf", DocumentKind::Pdf).await;

    assert!(report.metadata.is_error_shaped());
    assert_eq!(report.metadata.technical_metadata.format, "PDF");
    assert!(report
        .errors
        .iter()
        .any(|e| e.starts_with("Metadata synthesis:")));
    // Extraction was fine, so confidence reflects the text, not the failure
    assert!(report.confidence > 0.0);
}

#[tokio::test]
async fn invalid_pdf_bytes_never_reach_extractors() {
    let backend = happy_backend();
    let pipeline = pipeline_with(
        StubDetector(Err("must not run".to_string())),
        StubText {
            raw: Err("must not run".to_string()),
            layout: Err("must not run".to_string()),
        },
        StubOcr(Err("must not run".to_string())),
        StubTables(Err("must not run".to_string())),
        backend.clone(),
    );

    let report = pipeline
        .run(b"GIF89a not a pdf", "fake.pdf", DocumentKind::Pdf)
        .await;

    assert!(report.metadata.is_error_shaped());
    assert!(report.errors.iter().any(|e| e.starts_with("Validation:")));
    // Extraction was skipped entirely, so only the validation and
    // no-content errors are present and the model was never consulted.
    assert_eq!(backend.generate_call_count(), 0);
}

// ---------------------------------------------------------------------------
// Tabular path
// ---------------------------------------------------------------------------

#[tokio::test]
async fn tabular_end_to_end() {
    let backend = happy_backend();
    let pipeline = pipeline_with(
        StubDetector(Err("must not run".to_string())),
        StubText {
            raw: Err("must not run".to_string()),
            layout: Err("must not run".to_string()),
        },
        StubOcr(Err("must not run".to_string())),
        StubTables(Err("must not run".to_string())),
        backend.clone(),
    );

    let csv = b"Dist_Code,Year,Amount\n101,2021,5000\n102,2021,6200\n";
    let report = pipeline.run(csv, "spend.csv", DocumentKind::Tabular).await;

    assert_eq!(report.doc_type, None);
    assert_eq!(report.lineage.extraction_method, ExtractionMethod::Tabular);
    assert_eq!(report.tables.len(), 1);
    assert_eq!(
        report.semantic.column_mappings["Dist_Code"],
        "spatial_district"
    );
    assert!((report.semantic.semantic_confidence - 1.0).abs() < 1e-9);
    assert!(!report.metadata.is_error_shaped());
    assert_eq!(backend.generate_call_count(), 1);
    // The prompt carried the headers and the sample rows
    let prompt = &backend.calls()[0].prompt;
    assert!(prompt.contains("Dist_Code"));
    assert!(prompt.contains("101, 2021, 5000"));
}

#[tokio::test]
async fn tabular_empty_input_is_error_shaped_without_generation() {
    let backend = happy_backend();
    let pipeline = pipeline_with(
        StubDetector(Err("must not run".to_string())),
        StubText {
            raw: Err("must not run".to_string()),
            layout: Err("must not run".to_string()),
        },
        StubOcr(Err("must not run".to_string())),
        StubTables(Err("must not run".to_string())),
        backend.clone(),
    );

    let report = pipeline.run(b"", "empty.csv", DocumentKind::Tabular).await;

    assert!(report.metadata.is_error_shaped());
    assert_eq!(report.metadata.technical_metadata.format, "CSV");
    assert_eq!(report.confidence, 0.0);
    assert_eq!(backend.generate_call_count(), 0);
}
