//! OCR extraction via pdftoppm + tesseract, with a per-page hybrid
//! shortcut: a cheap text-layer read that yields more than a few characters
//! skips the expensive render+OCR pass for that page entirely.

use std::path::Path;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, warn};

use harmon_core::defaults::{
    EXTRACTION_CMD_TIMEOUT_SECS, OCR_DPI, OCR_LANGUAGE, OCR_PAGE_SKIP_THRESHOLD,
};
use harmon_core::{Error, OcrExtractor, PageRecord, Result};

use super::{run_cmd_status, run_cmd_with_timeout};

/// OCR extractor shelling out to `pdftoppm` and `tesseract`.
pub struct TesseractOcrExtractor {
    dpi: u32,
    language: String,
}

impl Default for TesseractOcrExtractor {
    fn default() -> Self {
        Self {
            dpi: OCR_DPI,
            language: OCR_LANGUAGE.to_string(),
        }
    }
}

impl TesseractOcrExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Page count from `pdfinfo` output.
    fn parse_page_count(pdfinfo_output: &str) -> Option<usize> {
        pdfinfo_output.lines().find_map(|line| {
            let (key, value) = line.split_once(':')?;
            if key.trim() == "Pages" {
                value.trim().parse().ok()
            } else {
                None
            }
        })
    }

    /// Render one page to PNG and OCR it. Returns empty text on OCR
    /// failure so a single bad page never sinks the document.
    async fn ocr_single_page(&self, path: &Path, page: usize) -> String {
        let img_dir = match TempDir::new() {
            Ok(dir) => dir,
            Err(e) => {
                warn!(page, error = %e, "Failed to create OCR scratch dir");
                return String::new();
            }
        };
        let img_prefix = img_dir.path().join("page");

        let rendered = run_cmd_status(
            Command::new("pdftoppm")
                .arg("-png")
                .arg("-r")
                .arg(self.dpi.to_string())
                .arg("-f")
                .arg(page.to_string())
                .arg("-l")
                .arg(page.to_string())
                .arg(path)
                .arg(&img_prefix),
            EXTRACTION_CMD_TIMEOUT_SECS * 3,
        )
        .await;
        if let Err(e) = rendered {
            warn!(page, error = %e, "Page render failed, skipping OCR");
            return String::new();
        }

        // pdftoppm names output page-N.png; pick up whatever landed
        let mut image_path = None;
        if let Ok(entries) = std::fs::read_dir(img_dir.path()) {
            for entry in entries.flatten() {
                if entry.path().extension().and_then(|e| e.to_str()) == Some("png") {
                    image_path = Some(entry.path());
                    break;
                }
            }
        }
        let Some(image_path) = image_path else {
            warn!(page, "No page image rendered");
            return String::new();
        };

        let output_base = img_dir.path().join("ocr");
        let result = run_cmd_status(
            Command::new("tesseract")
                .arg(&image_path)
                .arg(&output_base)
                .arg("-l")
                .arg(&self.language),
            EXTRACTION_CMD_TIMEOUT_SECS,
        )
        .await;

        match result {
            Ok(()) => std::fs::read_to_string(output_base.with_extension("txt"))
                .unwrap_or_default()
                .trim()
                .to_string(),
            Err(e) => {
                warn!(page, error = %e, "OCR failed for page, skipping");
                String::new()
            }
        }
    }
}

#[async_trait]
impl OcrExtractor for TesseractOcrExtractor {
    async fn ocr_pages(&self, path: &Path) -> Result<Vec<PageRecord>> {
        let pdfinfo = run_cmd_with_timeout(
            Command::new("pdfinfo").arg(path),
            EXTRACTION_CMD_TIMEOUT_SECS,
        )
        .await?;
        let page_count = Self::parse_page_count(&pdfinfo)
            .ok_or_else(|| Error::Extraction("pdfinfo reported no page count".to_string()))?;

        let mut pages = Vec::with_capacity(page_count);
        for page in 1..=page_count {
            // Hybrid strategy: a usable text layer on this page makes the
            // render+OCR pass unnecessary.
            let cheap = run_cmd_with_timeout(
                Command::new("pdftotext")
                    .arg("-f")
                    .arg(page.to_string())
                    .arg("-l")
                    .arg(page.to_string())
                    .arg(path)
                    .arg("-"),
                EXTRACTION_CMD_TIMEOUT_SECS,
            )
            .await
            .unwrap_or_default();

            let cheap = cheap.replace('\u{c}', "");
            let trimmed = cheap.trim();
            if trimmed.len() > OCR_PAGE_SKIP_THRESHOLD {
                debug!(page, chars = trimmed.len(), "Text layer found, skipping OCR");
                pages.push(PageRecord {
                    page_number: page as u32,
                    text: trimmed.to_string(),
                });
                continue;
            }

            debug!(page, dpi = self.dpi, "No text layer, running OCR");
            let text = self.ocr_single_page(path, page).await;
            pages.push(PageRecord {
                page_number: page as u32,
                text,
            });
        }

        Ok(pages)
    }
}
