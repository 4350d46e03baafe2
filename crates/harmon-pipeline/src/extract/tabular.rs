//! Tabular (CSV) ingestion.
//!
//! The tabular path never touches the PDF machinery: headers and a small
//! row sample feed the synthesis prompt directly, and the full grid becomes
//! a single [`TableRecord`] so the schema mapper and confidence scorer
//! treat both document kinds uniformly.

use harmon_core::defaults::TABULAR_SAMPLE_ROWS;
use harmon_core::{Error, Result, TableRecord};

/// Parsed tabular upload.
#[derive(Debug, Clone)]
pub struct TabularExtraction {
    pub headers: Vec<String>,
    /// Up to [`TABULAR_SAMPLE_ROWS`] data rows for the prompt.
    pub sample_rows: Vec<Vec<String>>,
    /// Data rows, excluding the header.
    pub row_count: usize,
    /// Whole grid (header + data) as one table record.
    pub table: TableRecord,
}

/// CSV extractor over raw upload bytes.
pub struct CsvTabularExtractor;

impl CsvTabularExtractor {
    pub fn extract(&self, data: &[u8]) -> Result<TabularExtraction> {
        if data.is_empty() {
            return Err(Error::InvalidInput(
                "cannot extract from empty tabular data".to_string(),
            ));
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(data);

        let mut grid: Vec<Vec<String>> = Vec::new();
        for record in reader.records() {
            let record =
                record.map_err(|e| Error::Extraction(format!("CSV parse error: {}", e)))?;
            grid.push(record.iter().map(|cell| cell.trim().to_string()).collect());
        }

        if grid.is_empty() {
            return Err(Error::Extraction(
                "tabular file contains no rows".to_string(),
            ));
        }

        let headers = grid[0].clone();
        let sample_rows: Vec<Vec<String>> =
            grid.iter().skip(1).take(TABULAR_SAMPLE_ROWS).cloned().collect();
        let row_count = grid.len() - 1;

        let total_cells: usize = grid.iter().map(|r| r.len()).sum();
        let empty_cells: usize = grid
            .iter()
            .flat_map(|r| r.iter())
            .filter(|c| c.is_empty())
            .count();
        let whitespace_ratio = if total_cells == 0 {
            1.0
        } else {
            empty_cells as f64 / total_cells as f64
        };

        Ok(TabularExtraction {
            headers,
            sample_rows,
            row_count,
            table: TableRecord {
                table_id: 0,
                page_number: 1,
                accuracy: 1.0,
                whitespace_ratio,
                grid,
            },
        })
    }
}
