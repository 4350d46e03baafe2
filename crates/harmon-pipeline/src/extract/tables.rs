//! Table grid extraction.
//!
//! Grid detection itself is an external capability. [`CommandTableExtractor`]
//! consumes it through a process contract: the configured command receives
//! the PDF path as its final argument and prints a JSON array of
//! `{ "page": u32, "accuracy": f64, "whitespace": f64, "data": [[cell]] }`
//! objects to stdout. Detectors that report whitespace as a 0–100
//! percentage are rescaled into [0, 1]; null cells normalize to empty
//! strings so grids are never sparse in the record model.

use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tokio::process::Command;
use tracing::debug;

use harmon_core::defaults::EXTRACTION_CMD_TIMEOUT_SECS;
use harmon_core::{Result, TableExtractor, TableRecord};

use super::run_cmd_with_timeout;

#[derive(Deserialize)]
struct WireTable {
    page: u32,
    #[serde(default)]
    accuracy: f64,
    #[serde(default)]
    whitespace: f64,
    #[serde(default)]
    data: Vec<Vec<JsonValue>>,
}

fn cell_to_string(cell: &JsonValue) -> String {
    match cell {
        JsonValue::Null => String::new(),
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn normalize_ratio(value: f64) -> f64 {
    // Accept both 0–1 ratios and 0–100 percentages.
    let value = if value > 1.0 { value / 100.0 } else { value };
    value.clamp(0.0, 1.0)
}

/// Parse the detector's stdout JSON into table records.
fn parse_tables(stdout: &str) -> Result<Vec<TableRecord>> {
    let wire: Vec<WireTable> = serde_json::from_str(stdout)?;
    Ok(wire
        .into_iter()
        .enumerate()
        .map(|(i, t)| TableRecord {
            table_id: i as u32,
            page_number: t.page,
            accuracy: normalize_ratio(t.accuracy),
            whitespace_ratio: normalize_ratio(t.whitespace),
            grid: t
                .data
                .iter()
                .map(|row| row.iter().map(cell_to_string).collect())
                .collect(),
        })
        .collect())
}

/// Table extractor driving an external grid-detection command.
pub struct CommandTableExtractor {
    program: String,
    args: Vec<String>,
}

impl CommandTableExtractor {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<S: Into<String>>(mut self, args: Vec<S>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}

#[async_trait]
impl TableExtractor for CommandTableExtractor {
    async fn extract_tables(&self, path: &Path) -> Result<Vec<TableRecord>> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).arg(path);

        let stdout = run_cmd_with_timeout(&mut cmd, EXTRACTION_CMD_TIMEOUT_SECS).await?;
        let tables = parse_tables(&stdout)?;
        debug!(tables = tables.len(), "Table grid detection complete");
        Ok(tables)
    }
}

/// No-op extractor for deployments without a grid-detection command.
pub struct NullTableExtractor;

#[async_trait]
impl TableExtractor for NullTableExtractor {
    async fn extract_tables(&self, _path: &Path) -> Result<Vec<TableRecord>> {
        Ok(Vec::new())
    }
}
