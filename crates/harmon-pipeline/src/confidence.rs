//! Composite extraction-quality estimate.
//!
//! Two proxies: text density (empty pages mean the extractors struggled)
//! and table sparsity (mostly-whitespace grids mean the structure detection
//! is shaky). The score is multiplicative with a 0.1 floor; exactly 0.0 is
//! reserved for "no structured content found at all".

use harmon_core::defaults::{
    CONFIDENCE_FLOOR, SPARSE_TEXT_PROBABLE, SPARSE_TEXT_SUSPECT, TABLE_WHITESPACE_SPARSE,
};
use harmon_core::{PageRecord, TableRecord};

/// Score one run's extraction outputs into [0.0, 1.0].
pub fn score_confidence(pages: &[PageRecord], tables: &[TableRecord]) -> f64 {
    if pages.is_empty() && tables.is_empty() {
        return 0.0;
    }

    let mut score = 1.0_f64;

    let total_len: usize = pages.iter().map(|p| p.text.len()).sum();
    if total_len < SPARSE_TEXT_SUSPECT {
        score *= 0.5; // suspiciously empty
    } else if total_len < SPARSE_TEXT_PROBABLE {
        score *= 0.8; // probably sparse
    }

    for table in tables {
        if table.whitespace_ratio > TABLE_WHITESPACE_SPARSE {
            score *= 0.9;
        }
    }

    (score.max(CONFIDENCE_FLOOR) * 100.0).round() / 100.0
}
