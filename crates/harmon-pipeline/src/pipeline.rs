//! The pipeline driver: ordered stages with per-stage fault isolation.
//!
//! A failing stage never aborts the run. Each stage's fallible result folds
//! into an accumulating error list and the run continues with the best
//! available partial data, so a single broken extractor degrades the output
//! instead of killing the job. Only the complete absence of content changes
//! the course: synthesis is skipped and an error-shaped record substituted,
//! because prompting a model with nothing produces confident nonsense.

use std::io::Write;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{info, instrument, warn};

use harmon_core::{
    DocType, DocumentKind, ExtractionMethod, Lineage, MetadataRecord, OcrExtractor, PageRecord,
    SemanticMapping, TableExtractor, TableRecord, TextExtractor, TextStrategy, TypeDetector,
};

use crate::cleaner::clean_pages;
use crate::confidence::score_confidence;
use crate::extract::tabular::CsvTabularExtractor;
use crate::prompts;
use crate::schema_map::map_tables;
use crate::synthesizer::MetadataSynthesizer;

/// A stage-scoped failure, recorded but not fatal.
#[derive(Debug, Clone)]
pub struct StageError {
    pub stage: &'static str,
    pub message: String,
}

impl StageError {
    pub fn new(stage: &'static str, message: impl std::fmt::Display) -> Self {
        Self {
            stage,
            message: message.to_string(),
        }
    }
}

impl std::fmt::Display for StageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.stage, self.message)
    }
}

/// Full output of one pipeline run. `metadata` is what lands in
/// `Job.result`; the rest is returned to synchronous callers and logged.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    /// Detected PDF type; `None` on the tabular path.
    pub doc_type: Option<DocType>,
    pub pages: Vec<PageRecord>,
    pub tables: Vec<TableRecord>,
    pub semantic: SemanticMapping,
    pub confidence: f64,
    pub metadata: MetadataRecord,
    pub lineage: Lineage,
    /// Stage-scoped error strings accumulated across the run.
    pub errors: Vec<String>,
}

/// Composes the extractors, cleaner, mapper, scorer, and synthesizer into
/// one fault-isolated run. All capabilities are injected at construction.
pub struct Pipeline {
    detector: Arc<dyn TypeDetector>,
    text: Arc<dyn TextExtractor>,
    ocr: Arc<dyn OcrExtractor>,
    tables: Arc<dyn TableExtractor>,
    synthesizer: MetadataSynthesizer,
}

fn has_text(pages: &[PageRecord]) -> bool {
    pages.iter().any(|p| !p.text.trim().is_empty())
}

impl Pipeline {
    pub fn new(
        detector: Arc<dyn TypeDetector>,
        text: Arc<dyn TextExtractor>,
        ocr: Arc<dyn OcrExtractor>,
        tables: Arc<dyn TableExtractor>,
        synthesizer: MetadataSynthesizer,
    ) -> Self {
        Self {
            detector,
            text,
            ocr,
            tables,
            synthesizer,
        }
    }

    /// Run the full pipeline over raw upload bytes.
    #[instrument(skip(self, data))]
    pub async fn run(&self, data: &[u8], source_name: &str, kind: DocumentKind) -> PipelineReport {
        let start = Instant::now();
        let report = match kind {
            DocumentKind::Pdf => self.run_pdf(data, source_name).await,
            DocumentKind::Tabular => self.run_tabular(data, source_name).await,
        };
        info!(
            duration_ms = start.elapsed().as_millis() as u64,
            confidence = report.confidence,
            stage_errors = report.errors.len(),
            "Pipeline run complete"
        );
        report
    }

    async fn run_pdf(&self, data: &[u8], source_name: &str) -> PipelineReport {
        let mut errors: Vec<String> = Vec::new();

        // Per-run-unique scratch file; released on every exit path when the
        // guard drops. Invalid bytes skip extraction entirely rather than
        // feeding garbage to the external tools.
        let scratch = match crate::extract::validate_pdf_magic(data, source_name) {
            Ok(()) => match materialize(data) {
                Ok(file) => Some(file),
                Err(e) => {
                    errors.push(StageError::new("Materialization", e).to_string());
                    None
                }
            },
            Err(e) => {
                errors.push(StageError::new("Validation", e).to_string());
                None
            }
        };

        let mut doc_type = DocType::Digital;
        let mut method = ExtractionMethod::DigitalText;
        let mut pages: Vec<PageRecord> = Vec::new();
        let mut tables: Vec<TableRecord> = Vec::new();

        if let Some(scratch) = &scratch {
            let path = scratch.path();

            // 1. Type detection; failure defaults to digital.
            doc_type = match self.detector.detect(path).await {
                Ok(doc_type) => doc_type,
                Err(e) => {
                    errors.push(StageError::new("Detection", e).to_string());
                    DocType::Digital
                }
            };

            // 2. Extraction, branching on detected type.
            match doc_type {
                DocType::Digital => {
                    match self.text.extract_pages(path, TextStrategy::Raw).await {
                        Ok(extracted) => pages = extracted,
                        Err(e) => errors.push(StageError::new("Text extraction", e).to_string()),
                    }

                    // Secondary strategy, then OCR as a last resort
                    if !has_text(&pages) {
                        match self.text.extract_pages(path, TextStrategy::Layout).await {
                            Ok(extracted) if has_text(&extracted) => pages = extracted,
                            Ok(_) => {}
                            Err(e) => {
                                errors.push(StageError::new("Layout extraction", e).to_string())
                            }
                        }
                    }
                    if !has_text(&pages) {
                        warn!(source = source_name, "Digital extraction empty, attempting OCR fallback");
                        match self.ocr.ocr_pages(path).await {
                            Ok(extracted) if !extracted.is_empty() => {
                                pages = extracted;
                                method = ExtractionMethod::OcrFallback;
                            }
                            Ok(_) => {}
                            Err(e) => errors.push(StageError::new("OCR fallback", e).to_string()),
                        }
                    }
                }
                DocType::Scanned => {
                    method = ExtractionMethod::FullOcr;
                    match self.ocr.ocr_pages(path).await {
                        Ok(extracted) => pages = extracted,
                        Err(e) => errors.push(StageError::new("OCR", e).to_string()),
                    }
                }
            }

            // Table detection is independent and non-blocking.
            match self.tables.extract_tables(path).await {
                Ok(extracted) => tables = extracted,
                Err(e) => errors.push(StageError::new("Table extraction", e).to_string()),
            }
        }

        if pages.is_empty() {
            errors.push("No text could be extracted from the PDF (empty or unsupported).".to_string());
        }

        // 3–5. Clean, map, score. Pure stages.
        let cleaned = clean_pages(&pages);
        let semantic = map_tables(&tables);
        let confidence = score_confidence(&cleaned, &tables);

        // 6. Synthesis, skipped outright when there is nothing to prompt with.
        let metadata = if !has_text(&cleaned) {
            let message = "No text could be extracted from the PDF.";
            errors.push(message.to_string());
            MetadataRecord::error_shaped(message, "PDF")
        } else {
            let full_text: String = cleaned
                .iter()
                .map(|p| p.text.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            self.synthesize(&prompts::document_prompt(&full_text), "PDF", &mut errors)
                .await
        };

        // 7. Lineage stamp.
        let lineage = Lineage::stamp(source_name, confidence, method);

        PipelineReport {
            doc_type: Some(doc_type),
            pages: cleaned,
            tables,
            semantic,
            confidence,
            metadata,
            lineage,
            errors,
        }
    }

    async fn run_tabular(&self, data: &[u8], source_name: &str) -> PipelineReport {
        let mut errors: Vec<String> = Vec::new();

        let mut headers: Vec<String> = Vec::new();
        let mut sample_rows: Vec<Vec<String>> = Vec::new();
        let mut tables: Vec<TableRecord> = Vec::new();

        match CsvTabularExtractor.extract(data) {
            Ok(extraction) => {
                headers = extraction.headers;
                sample_rows = extraction.sample_rows;
                tables = vec![extraction.table];
            }
            Err(e) => errors.push(StageError::new("Tabular extraction", e).to_string()),
        }

        let semantic = map_tables(&tables);
        let confidence = score_confidence(&[], &tables);

        let metadata = if headers.is_empty() {
            let message = "No columns could be extracted from the tabular file.";
            errors.push(message.to_string());
            MetadataRecord::error_shaped(message, "CSV")
        } else {
            self.synthesize(
                &prompts::tabular_prompt(source_name, &headers, &sample_rows),
                "CSV",
                &mut errors,
            )
            .await
        };

        let lineage = Lineage::stamp(source_name, confidence, ExtractionMethod::Tabular);

        PipelineReport {
            doc_type: None,
            pages: Vec::new(),
            tables,
            semantic,
            confidence,
            metadata,
            lineage,
            errors,
        }
    }

    /// Run synthesis and fold any failure into an error-shaped record.
    async fn synthesize(
        &self,
        prompt: &str,
        format: &str,
        errors: &mut Vec<String>,
    ) -> MetadataRecord {
        match self.synthesizer.synthesize(prompt).await {
            Ok(record) if record.is_error_shaped() => {
                // A parsed record that carries its own error marker is still
                // a failure; normalize it so the shape stays canonical.
                let message = record
                    .error
                    .unwrap_or_else(|| "Metadata generation failed".to_string());
                errors.push(StageError::new("Metadata synthesis", &message).to_string());
                MetadataRecord::error_shaped(message, format)
            }
            Ok(record) => record,
            Err(failure) => {
                errors.push(StageError::new("Metadata synthesis", &failure).to_string());
                MetadataRecord::error_shaped(failure.to_string(), format)
            }
        }
    }
}

/// Write upload bytes to a per-run-unique scratch file.
fn materialize(data: &[u8]) -> std::io::Result<NamedTempFile> {
    let mut file = NamedTempFile::new()?;
    file.write_all(data)?;
    file.flush()?;
    Ok(file)
}
