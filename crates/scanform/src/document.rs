//! Document model shared by the pipeline, the repository and the service.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Lifecycle of a document.
///
/// `Completed` and `Failed` are soft-terminal: a correction moves either of
/// them to `Corrected`, and a new processing run may start from them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessingStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Corrected,
}

impl ProcessingStatus {
    pub const ALL: [ProcessingStatus; 5] = [
        ProcessingStatus::Pending,
        ProcessingStatus::Processing,
        ProcessingStatus::Completed,
        ProcessingStatus::Failed,
        ProcessingStatus::Corrected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStatus::Pending => "PENDING",
            ProcessingStatus::Processing => "PROCESSING",
            ProcessingStatus::Completed => "COMPLETED",
            ProcessingStatus::Failed => "FAILED",
            ProcessingStatus::Corrected => "CORRECTED",
        }
    }

    /// States a correction may be applied to.
    pub fn accepts_correction(&self) -> bool {
        matches!(
            self,
            ProcessingStatus::Completed | ProcessingStatus::Failed | ProcessingStatus::Corrected
        )
    }
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(ProcessingStatus::Pending),
            "PROCESSING" => Ok(ProcessingStatus::Processing),
            "COMPLETED" => Ok(ProcessingStatus::Completed),
            "FAILED" => Ok(ProcessingStatus::Failed),
            "CORRECTED" => Ok(ProcessingStatus::Corrected),
            other => Err(format!("unknown processing status: {}", other)),
        }
    }
}

/// Accepted upload formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Png,
    Jpeg,
    Pdf,
}

impl ContentType {
    /// Parses a MIME type, ignoring case and parameters such as `; charset=`.
    pub fn parse(mime: &str) -> Result<Self, ValidationError> {
        let essence = mime
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match essence.as_str() {
            "image/png" => Ok(ContentType::Png),
            "image/jpeg" | "image/jpg" => Ok(ContentType::Jpeg),
            "application/pdf" => Ok(ContentType::Pdf),
            _ => Err(ValidationError::UnsupportedContentType(mime.to_string())),
        }
    }

    /// Guesses the content type from a file name's extension.
    pub fn guess_from_filename(filename: &str) -> Option<Self> {
        mime_guess::from_path(filename)
            .iter()
            .find_map(|mime| Self::parse(mime.essence_str()).ok())
    }

    pub fn as_mime(&self) -> &'static str {
        match self {
            ContentType::Png => "image/png",
            ContentType::Jpeg => "image/jpeg",
            ContentType::Pdf => "application/pdf",
        }
    }

    pub fn is_pdf(&self) -> bool {
        matches!(self, ContentType::Pdf)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_mime())
    }
}

/// One uploaded artifact and everything the pipeline learned about it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub stored_filename: String,
    pub original_filename: String,
    pub content_type: ContentType,
    pub size: u64,
    /// Opaque locator understood by the [`crate::storage::ContentStore`].
    pub storage_locator: String,
    pub status: ProcessingStatus,
    pub extracted_text: Option<String>,
    pub extracted_json: Option<String>,
    pub corrected_json: Option<String>,
    pub error_message: Option<String>,
    pub progress: u8,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// A freshly uploaded document: `PENDING` with zero progress.
    pub fn new_pending(
        stored_filename: String,
        original_filename: String,
        content_type: ContentType,
        size: u64,
        storage_locator: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            stored_filename,
            original_filename,
            content_type,
            size,
            storage_locator,
            status: ProcessingStatus::Pending,
            extracted_text: None,
            extracted_json: None,
            corrected_json: None,
            error_message: None,
            progress: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Field extraction metadata owned by a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub id: i64,
    pub document_id: String,
    pub source_field: String,
    pub target_field: String,
    pub field_type: String,
    pub extracted_value: Option<String>,
    pub corrected_value: Option<String>,
    pub validation_rule: Option<String>,
    pub confidence: Option<f64>,
}

/// A field mapping produced by a processing run, before it has a row id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewFieldMapping {
    pub source_field: String,
    pub target_field: String,
    pub field_type: String,
    pub extracted_value: Option<String>,
    pub confidence: Option<f64>,
}

/// Columns a page of documents may be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    OriginalFilename,
    Status,
    Id,
}

impl SortField {
    pub fn column(&self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
            SortField::OriginalFilename => "original_filename",
            SortField::Status => "status",
            SortField::Id => "id",
        }
    }
}

impl FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created_at" | "createdAt" => Ok(SortField::CreatedAt),
            "updated_at" | "updatedAt" => Ok(SortField::UpdatedAt),
            "original_filename" | "originalFilename" => Ok(SortField::OriginalFilename),
            "status" => Ok(SortField::Status),
            "id" => Ok(SortField::Id),
            other => Err(format!("cannot sort by '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(format!("unknown sort direction '{}'", other)),
        }
    }
}

/// Zero-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
    pub sort_by: SortField,
    pub direction: SortDirection,
}

impl PageRequest {
    pub const MAX_SIZE: u32 = 100;

    pub fn new(page: u32, size: u32) -> Self {
        Self {
            page,
            size: size.clamp(1, Self::MAX_SIZE),
            sort_by: SortField::default(),
            direction: SortDirection::default(),
        }
    }

    pub fn sorted(mut self, sort_by: SortField, direction: SortDirection) -> Self {
        self.sort_by = sort_by;
        self.direction = direction;
        self
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page) * u64::from(self.size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(0, 20)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub size: u32,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> u64 {
        if self.size == 0 {
            return 0;
        }
        self.total.div_ceil(u64::from(self.size))
    }
}
