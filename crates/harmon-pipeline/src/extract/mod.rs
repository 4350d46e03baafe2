//! Leaf extractor implementations.

pub mod ocr;
pub mod poppler;
pub mod tables;
pub mod tabular;

pub use ocr::TesseractOcrExtractor;
pub use poppler::{PopplerTextExtractor, PopplerTypeDetector};
pub use tables::{CommandTableExtractor, NullTableExtractor};
pub use tabular::{CsvTabularExtractor, TabularExtraction};

use tokio::process::Command;

use harmon_core::{Error, Result};

/// Validate the `%PDF` magic header before handing bytes to external tools.
pub(crate) fn validate_pdf_magic(data: &[u8], filename: &str) -> Result<()> {
    if data.is_empty() {
        return Err(Error::InvalidInput(
            "cannot extract from empty PDF data".to_string(),
        ));
    }
    if data.len() < 4 || &data[0..4] != b"%PDF" {
        return Err(Error::InvalidInput(format!(
            "file '{}' is not a valid PDF (missing %PDF header)",
            filename
        )));
    }
    Ok(())
}

/// Run a command with a timeout, returning stdout as a string.
pub(crate) async fn run_cmd_with_timeout(cmd: &mut Command, timeout_secs: u64) -> Result<String> {
    let output = tokio::time::timeout(std::time::Duration::from_secs(timeout_secs), cmd.output())
        .await
        .map_err(|_| {
            Error::Extraction(format!("external command timed out after {}s", timeout_secs))
        })?
        .map_err(|e| Error::Extraction(format!("failed to execute command: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::Extraction(format!(
            "command failed (exit {}): {}",
            output.status,
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Run a command that writes its output to files rather than stdout.
pub(crate) async fn run_cmd_status(cmd: &mut Command, timeout_secs: u64) -> Result<()> {
    let output = tokio::time::timeout(std::time::Duration::from_secs(timeout_secs), cmd.output())
        .await
        .map_err(|_| {
            Error::Extraction(format!("external command timed out after {}s", timeout_secs))
        })?
        .map_err(|e| Error::Extraction(format!("failed to execute command: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::Extraction(format!(
            "command failed (exit {}): {}",
            output.status,
            stderr.trim()
        )));
    }

    Ok(())
}
