//! Column header normalization against a canonical vocabulary.
//!
//! Headers in government datasets are wildly inconsistent ("Dist_Code",
//! "dist code", "DISTCODE"). Each label is normalized to a slug, then
//! matched by token containment against a fixed canonical dictionary;
//! anything unmatched keeps its slug. The semantic confidence reflects the
//! matched fraction.

use std::collections::BTreeMap;

use tracing::debug;

use harmon_core::{SemanticMapping, TableRecord};

/// Canonical short tokens and the labels they map to. Order matters: the
/// first containment match wins, so more specific tokens come first.
const CANONICAL_COLUMNS: [(&str, &str); 16] = [
    ("expenditure", "financial_expenditure"),
    ("budget", "financial_budget"),
    ("amount", "financial_amount"),
    ("revenue", "financial_revenue"),
    ("district", "spatial_district"),
    ("dist", "spatial_district"),
    ("village", "spatial_village"),
    ("state", "spatial_state"),
    ("block", "spatial_block"),
    ("year", "temporal_year"),
    ("month", "temporal_month"),
    ("date", "temporal_date"),
    ("population", "demographic_population"),
    ("pop", "demographic_population"),
    ("literacy", "demographic_literacy"),
    ("gender", "demographic_gender"),
];

/// Normalize a raw header into a slug: lowercase, `%` spelled out,
/// punctuation and whitespace runs collapsed to single underscores.
pub fn normalize_label(label: &str) -> String {
    let lowered = label.trim().to_lowercase().replace('%', " percent ");
    let mut slug = String::with_capacity(lowered.len());
    let mut last_was_sep = true;
    for c in lowered.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
            last_was_sep = false;
        } else if !last_was_sep {
            slug.push('_');
            last_was_sep = true;
        }
    }
    while slug.ends_with('_') {
        slug.pop();
    }
    slug
}

/// Map one header to its canonical label, or to its slug when no canonical
/// token is contained in it.
pub fn map_label(label: &str) -> (String, bool) {
    let slug = normalize_label(label);
    for (token, canonical) in CANONICAL_COLUMNS {
        if slug.contains(token) {
            return (canonical.to_string(), true);
        }
    }
    (slug, false)
}

/// Map the header rows of all detected tables into one semantic mapping.
///
/// Confidence is `0.5 + 0.5 * matched/total`; 0.5 expresses "nothing to
/// match" rather than "no match confidence".
pub fn map_tables(tables: &[TableRecord]) -> SemanticMapping {
    let mut column_mappings = BTreeMap::new();
    let mut total = 0usize;
    let mut matched = 0usize;

    for table in tables {
        let Some(headers) = table.header_row() else {
            continue;
        };
        for header in headers {
            if header.trim().is_empty() {
                continue;
            }
            let (canonical, hit) = map_label(header);
            total += 1;
            if hit {
                matched += 1;
            }
            column_mappings.insert(header.clone(), canonical);
        }
    }

    let semantic_confidence = if total == 0 {
        0.5
    } else {
        0.5 + 0.5 * (matched as f64 / total as f64)
    };
    debug!(total, matched, semantic_confidence, "Mapped column headers");

    SemanticMapping {
        column_mappings,
        semantic_confidence,
    }
}
