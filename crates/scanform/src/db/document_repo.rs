//! Document rows: CRUD operations for the `documents` table.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

use crate::document::{ContentType, Document, Page, PageRequest, ProcessingStatus};

use super::DatabaseError;

/// A raw document row from the database.
#[derive(Debug, Clone)]
struct DocumentRow {
    id: String,
    stored_filename: String,
    original_filename: String,
    content_type: String,
    size: i64,
    storage_locator: String,
    status: String,
    extracted_text: Option<String>,
    extracted_json: Option<String>,
    corrected_json: Option<String>,
    error_message: Option<String>,
    progress: i64,
    created_at: String,
    updated_at: String,
}

impl DocumentRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            stored_filename: row.get("stored_filename")?,
            original_filename: row.get("original_filename")?,
            content_type: row.get("content_type")?,
            size: row.get("size")?,
            storage_locator: row.get("storage_locator")?,
            status: row.get("status")?,
            extracted_text: row.get("extracted_text")?,
            extracted_json: row.get("extracted_json")?,
            corrected_json: row.get("corrected_json")?,
            error_message: row.get("error_message")?,
            progress: row.get("progress")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    fn into_document(self) -> Result<Document, DatabaseError> {
        let content_type =
            ContentType::parse(&self.content_type).map_err(|_| DatabaseError::InvalidColumn {
                column: "content_type",
                value: self.content_type.clone(),
            })?;
        let status = self
            .status
            .parse::<ProcessingStatus>()
            .map_err(|_| DatabaseError::InvalidColumn {
                column: "status",
                value: self.status.clone(),
            })?;
        let progress = u8::try_from(self.progress).map_err(|_| DatabaseError::InvalidColumn {
            column: "progress",
            value: self.progress.to_string(),
        })?;

        Ok(Document {
            id: self.id,
            stored_filename: self.stored_filename,
            original_filename: self.original_filename,
            content_type,
            size: self.size.max(0) as u64,
            storage_locator: self.storage_locator,
            status,
            extracted_text: self.extracted_text,
            extracted_json: self.extracted_json,
            corrected_json: self.corrected_json,
            error_message: self.error_message,
            progress,
            created_at: parse_timestamp("created_at", &self.created_at)?,
            updated_at: parse_timestamp("updated_at", &self.updated_at)?,
        })
    }
}

fn parse_timestamp(column: &'static str, value: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| DatabaseError::InvalidColumn {
            column,
            value: value.to_string(),
        })
}

fn collect(rows: Vec<DocumentRow>) -> Result<Vec<Document>, DatabaseError> {
    rows.into_iter().map(DocumentRow::into_document).collect()
}

/// Inserts a new document row.
pub fn insert(conn: &Connection, doc: &Document) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO documents (id, stored_filename, original_filename, content_type, size,
         storage_locator, status, extracted_text, extracted_json, corrected_json,
         error_message, progress, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            doc.id,
            doc.stored_filename,
            doc.original_filename,
            doc.content_type.as_mime(),
            doc.size as i64,
            doc.storage_locator,
            doc.status.as_str(),
            doc.extracted_text,
            doc.extracted_json,
            doc.corrected_json,
            doc.error_message,
            doc.progress,
            doc.created_at.to_rfc3339(),
            doc.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

/// Overwrites the mutable columns of an existing row. Returns the number of
/// rows touched (0 when the id is unknown).
pub fn update(conn: &Connection, doc: &Document) -> Result<usize, DatabaseError> {
    let changed = conn.execute(
        "UPDATE documents SET status=?2, extracted_text=?3, extracted_json=?4,
         corrected_json=?5, error_message=?6, progress=?7, updated_at=?8
         WHERE id=?1",
        params![
            doc.id,
            doc.status.as_str(),
            doc.extracted_text,
            doc.extracted_json,
            doc.corrected_json,
            doc.error_message,
            doc.progress,
            doc.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(changed)
}

/// Finds a document by its ID.
pub fn find_by_id(conn: &Connection, id: &str) -> Result<Option<Document>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT * FROM documents WHERE id = ?1")?;
    let mut rows = stmt.query_map(params![id], DocumentRow::from_row)?;
    match rows.next() {
        Some(Ok(row)) => Ok(Some(row.into_document()?)),
        Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
        None => Ok(None),
    }
}

/// All documents in the given status, oldest first.
pub fn find_by_status(
    conn: &Connection,
    status: ProcessingStatus,
) -> Result<Vec<Document>, DatabaseError> {
    let mut stmt =
        conn.prepare("SELECT * FROM documents WHERE status = ?1 ORDER BY created_at ASC, id ASC")?;
    let rows = stmt
        .query_map(params![status.as_str()], DocumentRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    collect(rows)
}

/// Documents whose original filename contains `fragment`, ignoring case.
pub fn search_by_filename(
    conn: &Connection,
    fragment: &str,
) -> Result<Vec<Document>, DatabaseError> {
    let escaped = fragment
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    let pattern = format!("%{}%", escaped.to_lowercase());
    let mut stmt = conn.prepare(
        "SELECT * FROM documents WHERE lower(original_filename) LIKE ?1 ESCAPE '\\'
         ORDER BY created_at DESC",
    )?;
    let rows = stmt
        .query_map(params![pattern], DocumentRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    collect(rows)
}

/// One page of documents plus the total row count.
///
/// The ORDER BY column comes from the `SortField` whitelist, never from
/// caller text.
pub fn query_page(conn: &Connection, request: &PageRequest) -> Result<Page<Document>, DatabaseError> {
    let total: u64 = conn.query_row("SELECT COUNT(*) FROM documents", [], |r| r.get(0))?;

    let sql = format!(
        "SELECT * FROM documents ORDER BY {} {}, id ASC LIMIT ?1 OFFSET ?2",
        request.sort_by.column(),
        request.direction.as_sql()
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(
            params![i64::from(request.size), request.offset() as i64],
            DocumentRow::from_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Page {
        items: collect(rows)?,
        total,
        page: request.page,
        size: request.size,
    })
}

/// Counts documents with the given status.
pub fn count_by_status(conn: &Connection, status: ProcessingStatus) -> Result<u64, DatabaseError> {
    let count: u64 = conn.query_row(
        "SELECT COUNT(*) FROM documents WHERE status = ?1",
        params![status.as_str()],
        |r| r.get(0),
    )?;
    Ok(count)
}

/// Deletes a document row; its field mappings cascade.
pub fn delete(conn: &Connection, id: &str) -> Result<bool, DatabaseError> {
    let changed = conn.execute("DELETE FROM documents WHERE id = ?1", params![id])?;
    Ok(changed > 0)
}
