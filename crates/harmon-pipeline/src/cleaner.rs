//! Boilerplate removal from extracted page text.
//!
//! Headers, footers, and watermarks repeat on most pages; content does not.
//! A line present on more than 60% of pages is dropped, as is anything
//! matching the page-number pattern. Single-page documents skip the
//! frequency rule entirely, because with one page every line is "100%
//! frequent" and the rule would erase the content.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use harmon_core::defaults::BOILERPLATE_LINE_FREQUENCY;
use harmon_core::PageRecord;

static PAGE_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Page \d+").expect("static pattern compiles"));

/// Remove boilerplate lines from extracted pages.
pub fn clean_pages(pages: &[PageRecord]) -> Vec<PageRecord> {
    if pages.len() > 1 {
        // How many distinct pages each trimmed line appears on
        let mut page_frequency: HashMap<&str, usize> = HashMap::new();
        for page in pages {
            let distinct: HashSet<&str> = page.text.lines().map(str::trim).collect();
            for line in distinct {
                *page_frequency.entry(line).or_default() += 1;
            }
        }

        let cutoff = pages.len() as f64 * BOILERPLATE_LINE_FREQUENCY;
        let cleaned = pages
            .iter()
            .map(|page| {
                let kept: Vec<&str> = page
                    .text
                    .lines()
                    .map(str::trim)
                    .filter(|line| {
                        page_frequency.get(line).copied().unwrap_or(0) as f64 <= cutoff
                            && !PAGE_NUMBER_RE.is_match(line)
                    })
                    .collect();
                PageRecord {
                    page_number: page.page_number,
                    text: kept.join("\n"),
                }
            })
            .collect();
        debug!(pages = pages.len(), "Cleaned multi-page document");
        cleaned
    } else {
        // Single page: only the page-number pattern rule applies
        pages
            .iter()
            .map(|page| {
                let kept: Vec<&str> = page
                    .text
                    .lines()
                    .map(str::trim)
                    .filter(|line| !PAGE_NUMBER_RE.is_match(line))
                    .collect();
                PageRecord {
                    page_number: page.page_number,
                    text: kept.join("\n"),
                }
            })
            .collect()
    }
}
