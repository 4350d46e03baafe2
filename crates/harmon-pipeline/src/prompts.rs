//! Prompt templates for metadata synthesis.
//!
//! All prompt engineering lives here, away from retry and candidate logic,
//! so wording can change without touching the synthesizer. Both templates
//! pin the closed sector vocabulary and the granularity ladder, and demand
//! a bare JSON object in the exact `MetadataRecord` shape.

use harmon_core::defaults::PROMPT_MAX_CHARS;
use harmon_core::Sector;

/// Granularity ladder offered to the model.
pub const GRANULARITY_VALUES: &str = "National, State, District, Sub-District, Village";

/// Comma-separated closed sector vocabulary.
pub fn sector_vocabulary() -> String {
    Sector::ALL
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Truncate document text to the prompt budget, marking the cut.
fn truncate_text(text: &str) -> String {
    if text.chars().count() <= PROMPT_MAX_CHARS {
        return text.to_string();
    }
    let head: String = text.chars().take(PROMPT_MAX_CHARS).collect();
    format!("{}...(truncated)", head)
}

/// Prompt for the document (PDF) path: cleaned page text in, catalog
/// record out.
pub fn document_prompt(full_text: &str) -> String {
    format!(
        r#"Act as a Senior Data Architect for a national data management office.
Analyze the following text extracted from a government document and generate a high-precision JSON metadata object.

DOCUMENT TEXT (may be truncated):
{text}

---
STANDARDIZATION RULES:
1. **Sector**: MUST be one of: [{sectors}]. If unsure, use "Governance".
2. **Ministry/Department**: Expand abbreviations to the full department name.
3. **Geography**: Detect the specific state, district, or "National".
4. **Granularity**: Choose from [{granularity}].

OUTPUT JSON STRUCTURE:
{{
    "catalog_info": {{
        "title": "Formal, descriptive title",
        "description": "Professional summary including the purpose and scope of the data.",
        "sector": "One of the standard sectors listed above",
        "keywords": ["tag1", "tag2", "tag3"]
    }},
    "provenance": {{
        "source": "Full name of the ministry or department",
        "jurisdiction": "Specific state/district or the country",
        "data_owner": "Name of the publishing entity or agency"
    }},
    "spatial_temporal": {{
        "temporal_range": "YYYY-MM-DD to YYYY-MM-DD (or 'YYYY-YYYY')",
        "spatial_coverage": "Specific region name",
        "granularity": "One of the granularity values above"
    }},
    "technical_metadata": {{
        "format": "PDF",
        "ai_readiness_level": 0.6,
        "machine_readable": false
    }}
}}

INSTRUCTIONS:
- Output ONLY valid JSON.
- If data is missing, infer reasonable defaults from context."#,
        text = truncate_text(full_text),
        sectors = sector_vocabulary(),
        granularity = GRANULARITY_VALUES,
    )
}

/// Prompt for the tabular path: headers and a small row sample in, catalog
/// record with per-column `schema_details` out.
pub fn tabular_prompt(filename: &str, headers: &[String], sample_rows: &[Vec<String>]) -> String {
    let sample: String = sample_rows
        .iter()
        .map(|row| row.join(", "))
        .collect::<Vec<_>>()
        .join("\n    ");

    format!(
        r#"Act as a Senior Data Architect for a national data management office.
Standardize the following raw metadata from a structured dataset (CSV) into a strictly compliant JSON object.

RAW INPUT:
- Filename: {filename}
- Headers: {headers:?}
- Data preview (first rows):
    {sample}

---
STANDARDIZATION RULES:
1. **Sector**: MUST be one of: [{sectors}].
2. **Ministry**: Infer the central or state ministry responsible for this data.
3. **Granularity**: Analyse columns. A district code column implies 'District'; a state code column implies 'State'. Choose from [{granularity}].
4. **Dates**: Normalize date ranges to ISO format (YYYY-MM-DD).
5. **Headers**: You MUST map every original column to a standardized, clean snake_case name.

OUTPUT JSON STRUCTURE:
{{
    "catalog_info": {{
        "title": "Formal descriptive title",
        "description": "Concise summary of the dataset's contents and utility.",
        "sector": "Standard sector from the list",
        "keywords": ["tag1", "tag2", "tag3"]
    }},
    "provenance": {{
        "source": "Ministry/department name",
        "jurisdiction": "State/district or the country",
        "data_owner": "Agency name"
    }},
    "spatial_temporal": {{
        "temporal_range": "YYYY-YYYY",
        "spatial_coverage": "Region name",
        "granularity": "One of the granularity values above"
    }},
    "technical_metadata": {{
        "format": "CSV",
        "schema_details": [{{ "column": "original_col_name", "standardized_header": "Standardized_Name", "type": "String/Int/Float", "description": "What this column represents" }}],
        "ai_readiness_level": 0.9,
        "machine_readable": true
    }}
}}

INSTRUCTIONS:
- Map EVERY original column to a "standardized_header".
- Output ONLY valid JSON."#,
        filename = filename,
        headers = headers,
        sample = sample,
        sectors = sector_vocabulary(),
        granularity = GRANULARITY_VALUES,
    )
}
