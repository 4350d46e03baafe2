//! Wire-visible data model for harmon.
//!
//! `MetadataRecord` and its groups are an external contract: downstream
//! consumers (e.g. the harmonized-CSV regeneration step that renames columns
//! from `schema_details`) depend on these exact field names and nesting.
//! Synthesized *content* varies per run; the shape must not.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::digest::ContentDigest;

// =============================================================================
// JOB TYPES
// =============================================================================

/// Status of a processing job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Dispatched, no terminal write yet.
    Processing,
    /// Pipeline completed and `result` is populated.
    Success,
    /// Pipeline failed and `error_message` is populated.
    Error,
}

impl JobStatus {
    /// Whether this status is a terminal state.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Processing)
    }
}

/// A processing job, keyed by content digest.
///
/// Created on first upload of a digest; mutated only by the run that
/// completes or fails the pipeline for that digest; never deleted by the
/// pipeline itself (retention is an external policy).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub digest: ContentDigest,
    pub original_filename: String,
    pub status: JobStatus,
    pub result: Option<MetadataRecord>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Create a fresh job in `Processing` state.
    pub fn processing(digest: ContentDigest, original_filename: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            digest,
            original_filename: original_filename.into(),
            status: JobStatus::Processing,
            result: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Terminal success write.
    pub fn complete(mut self, result: MetadataRecord) -> Self {
        self.status = JobStatus::Success;
        self.result = Some(result);
        self.error_message = None;
        self.updated_at = Utc::now();
        self
    }

    /// Terminal error write.
    pub fn fail(mut self, message: impl Into<String>) -> Self {
        self.status = JobStatus::Error;
        self.error_message = Some(message.into());
        self.updated_at = Utc::now();
        self
    }
}

// =============================================================================
// EXTRACTION TYPES
// =============================================================================

/// One page of extracted text. Page numbers are 1-based and contiguous.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    pub page_number: u32,
    pub text: String,
}

/// One detected table grid.
///
/// Cells are never null: missing values normalize to empty strings at the
/// extractor boundary. `accuracy` and `whitespace_ratio` are both in [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRecord {
    pub table_id: u32,
    pub page_number: u32,
    pub accuracy: f64,
    pub whitespace_ratio: f64,
    pub grid: Vec<Vec<String>>,
}

impl TableRecord {
    /// First row of the grid, conventionally the header row.
    pub fn header_row(&self) -> Option<&[String]> {
        self.grid.first().map(|r| r.as_slice())
    }
}

/// Column-label normalization result from the schema mapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticMapping {
    /// Original column label -> canonical label.
    pub column_mappings: std::collections::BTreeMap<String, String>,
    pub semantic_confidence: f64,
}

/// Classification of a PDF's content layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocType {
    /// Has an extractable text layer.
    Digital,
    /// Image-only; needs OCR.
    Scanned,
}

/// Kind of document accepted at upload, supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Pdf,
    Tabular,
}

impl DocumentKind {
    /// Best-effort kind detection from magic bytes and extension, for
    /// callers that don't know the kind up front.
    pub fn detect(filename: &str, bytes: &[u8]) -> Self {
        if let Some(kind) = infer::get(bytes) {
            if kind.mime_type() == "application/pdf" {
                return DocumentKind::Pdf;
            }
        }
        let ext = filename.rsplit('.').next().unwrap_or("").to_lowercase();
        match ext.as_str() {
            "pdf" => DocumentKind::Pdf,
            _ => DocumentKind::Tabular,
        }
    }
}

/// Which extraction path actually produced the text that went downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// Plain digital text layer.
    DigitalText,
    /// Digital strategies yielded nothing; OCR ran as a last resort.
    OcrFallback,
    /// Document was classified scanned and OCR ran directly.
    FullOcr,
    /// Tabular ingestion (CSV), no PDF machinery involved.
    Tabular,
}

impl std::fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DigitalText => write!(f, "digital_text"),
            Self::OcrFallback => write!(f, "ocr_fallback"),
            Self::FullOcr => write!(f, "full_ocr"),
            Self::Tabular => write!(f, "tabular"),
        }
    }
}

// =============================================================================
// METADATA RECORD
// =============================================================================

/// Closed sector vocabulary. `catalog_info.sector` must be drawn from this
/// set; anything else coerces to `Governance` on deserialization so model
/// output can never leak an out-of-vocabulary sector into stored records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sector {
    Agriculture,
    Education,
    Healthcare,
    Finance,
    Energy,
    Transport,
    UrbanDevelopment,
    RuralDevelopment,
    LawAndJustice,
    ScienceAndTech,
    Environment,
    Governance,
}

impl Sector {
    /// All canonical labels, in vocabulary order.
    pub const ALL: [Sector; 12] = [
        Sector::Agriculture,
        Sector::Education,
        Sector::Healthcare,
        Sector::Finance,
        Sector::Energy,
        Sector::Transport,
        Sector::UrbanDevelopment,
        Sector::RuralDevelopment,
        Sector::LawAndJustice,
        Sector::ScienceAndTech,
        Sector::Environment,
        Sector::Governance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sector::Agriculture => "Agriculture",
            Sector::Education => "Education",
            Sector::Healthcare => "Healthcare",
            Sector::Finance => "Finance",
            Sector::Energy => "Energy",
            Sector::Transport => "Transport",
            Sector::UrbanDevelopment => "Urban Development",
            Sector::RuralDevelopment => "Rural Development",
            Sector::LawAndJustice => "Law & Justice",
            Sector::ScienceAndTech => "Science & Tech",
            Sector::Environment => "Environment",
            Sector::Governance => "Governance",
        }
    }

    /// Case-insensitive label lookup; unknown labels fall back to Governance.
    pub fn from_label(label: &str) -> Self {
        let wanted = label.trim();
        Self::ALL
            .into_iter()
            .find(|s| s.as_str().eq_ignore_ascii_case(wanted))
            .unwrap_or(Sector::Governance)
    }
}

impl std::fmt::Display for Sector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Sector {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Sector {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(Sector::from_label(&label))
    }
}

/// Catalog group of the metadata record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogInfo {
    pub title: String,
    pub description: String,
    pub sector: Sector,
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// Provenance group of the metadata record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub jurisdiction: String,
    #[serde(default)]
    pub data_owner: String,
}

/// Spatial/temporal group of the metadata record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialTemporal {
    #[serde(default)]
    pub temporal_range: String,
    #[serde(default)]
    pub spatial_coverage: String,
    /// Spatial resolution label (National/State/District/Sub-District/Village).
    #[serde(default)]
    pub granularity: String,
}

/// One entry of `technical_metadata.schema_details` for tabular datasets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaColumn {
    pub column: String,
    pub standardized_header: String,
    #[serde(default, rename = "type")]
    pub column_type: String,
    #[serde(default)]
    pub description: String,
}

/// Technical group of the metadata record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalMetadata {
    pub format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_details: Option<Vec<SchemaColumn>>,
    #[serde(default)]
    pub ai_readiness_level: f64,
    #[serde(default)]
    pub machine_readable: bool,
}

/// The pipeline's externally visible output, embedded into `Job.result`.
///
/// All four groups are always present, including in the error-shaped
/// variant, so downstream consumers never see a partial record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub catalog_info: CatalogInfo,
    pub provenance: Provenance,
    pub spatial_temporal: SpatialTemporal,
    pub technical_metadata: TechnicalMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl MetadataRecord {
    /// Well-formed error-shaped record: all four groups present, default
    /// Governance sector, explicit error/summary fields.
    pub fn error_shaped(message: impl Into<String>, format: &str) -> Self {
        let message = message.into();
        Self {
            catalog_info: CatalogInfo {
                title: "Processing Error".to_string(),
                description: message.clone(),
                sector: Sector::Governance,
                keywords: Vec::new(),
            },
            provenance: Provenance {
                source: String::new(),
                jurisdiction: String::new(),
                data_owner: String::new(),
            },
            spatial_temporal: SpatialTemporal {
                temporal_range: String::new(),
                spatial_coverage: String::new(),
                granularity: String::new(),
            },
            technical_metadata: TechnicalMetadata {
                format: format.to_string(),
                schema_details: None,
                ai_readiness_level: 0.0,
                machine_readable: false,
            },
            error: Some(message.clone()),
            summary: Some(message),
        }
    }

    /// Whether this record is the error-shaped substitute.
    pub fn is_error_shaped(&self) -> bool {
        self.error.is_some()
    }
}

// =============================================================================
// LINEAGE
// =============================================================================

/// Provenance stamp for one pipeline run. Appended once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lineage {
    pub source_identifier: String,
    pub processed_at: DateTime<Utc>,
    pub confidence: f64,
    pub extraction_method: ExtractionMethod,
}

impl Lineage {
    pub fn stamp(source: impl Into<String>, confidence: f64, method: ExtractionMethod) -> Self {
        Self {
            source_identifier: source.into(),
            processed_at: Utc::now(),
            confidence,
            extraction_method: method,
        }
    }
}
