//! Poppler-backed text extraction and type detection.
//!
//! `pdftotext` emits a form feed after each page, which gives page
//! boundaries without a PDF library in-process. The type detector combines
//! total text-layer length with `pdfimages -list` image counts.

use std::path::Path;

use async_trait::async_trait;
use tracing::debug;

use harmon_core::defaults::{EXTRACTION_CMD_TIMEOUT_SECS, SCANNED_TEXT_THRESHOLD};
use harmon_core::{DocType, PageRecord, Result, TextExtractor, TextStrategy, TypeDetector};

use tokio::process::Command;

use super::run_cmd_with_timeout;

/// Text-layer extractor shelling out to `pdftotext` (poppler-utils).
pub struct PopplerTextExtractor;

/// Split raw `pdftotext` output into 1-based page records.
///
/// `pdftotext` appends a form feed after every page, including the last,
/// so a trailing empty segment is dropped rather than counted as a page.
fn split_pages(raw: &str) -> Vec<PageRecord> {
    let mut segments: Vec<&str> = raw.split('\u{c}').collect();
    if matches!(segments.last(), Some(last) if last.trim().is_empty()) {
        segments.pop();
    }
    segments
        .into_iter()
        .enumerate()
        .map(|(i, text)| PageRecord {
            page_number: (i + 1) as u32,
            text: text.to_string(),
        })
        .collect()
}

#[async_trait]
impl TextExtractor for PopplerTextExtractor {
    async fn extract_pages(&self, path: &Path, strategy: TextStrategy) -> Result<Vec<PageRecord>> {
        let mut cmd = Command::new("pdftotext");
        if matches!(strategy, TextStrategy::Layout) {
            cmd.arg("-layout");
        }
        cmd.arg(path).arg("-");

        let raw = run_cmd_with_timeout(&mut cmd, EXTRACTION_CMD_TIMEOUT_SECS).await?;
        let pages = split_pages(&raw);
        debug!(
            pages = pages.len(),
            ?strategy,
            "pdftotext extraction complete"
        );
        Ok(pages)
    }
}

/// Digital/scanned classifier: text layer shorter than the scanned
/// threshold *and* at least one embedded image means scanned.
pub struct PopplerTypeDetector;

impl PopplerTypeDetector {
    /// Count image rows in `pdfimages -list` output (two header lines).
    fn count_images(listing: &str) -> usize {
        listing.lines().skip(2).filter(|l| !l.trim().is_empty()).count()
    }
}

#[async_trait]
impl TypeDetector for PopplerTypeDetector {
    async fn detect(&self, path: &Path) -> Result<DocType> {
        let text = run_cmd_with_timeout(
            Command::new("pdftotext").arg(path).arg("-"),
            EXTRACTION_CMD_TIMEOUT_SECS,
        )
        .await?;
        let total_text = text.trim().len();

        let listing = run_cmd_with_timeout(
            Command::new("pdfimages").arg("-list").arg(path),
            EXTRACTION_CMD_TIMEOUT_SECS,
        )
        .await?;
        let total_images = Self::count_images(&listing);

        let doc_type = if total_text < SCANNED_TEXT_THRESHOLD && total_images > 0 {
            DocType::Scanned
        } else {
            DocType::Digital
        };
        debug!(total_text, total_images, ?doc_type, "PDF type detected");
        Ok(doc_type)
    }
}
