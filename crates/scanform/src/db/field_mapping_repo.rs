//! Field mapping rows owned by a document.

use rusqlite::{params, Connection, Row};

use crate::document::{FieldMapping, NewFieldMapping};

use super::DatabaseError;

fn from_row(row: &Row<'_>) -> Result<FieldMapping, rusqlite::Error> {
    Ok(FieldMapping {
        id: row.get("id")?,
        document_id: row.get("document_id")?,
        source_field: row.get("source_field")?,
        target_field: row.get("target_field")?,
        field_type: row.get("field_type")?,
        extracted_value: row.get("extracted_value")?,
        corrected_value: row.get("corrected_value")?,
        validation_rule: row.get("validation_rule")?,
        confidence: row.get("confidence")?,
    })
}

/// Replaces every mapping of a document with `mappings`.
///
/// Callers run this inside the transaction that completes the document.
pub fn replace_for_document(
    conn: &Connection,
    document_id: &str,
    mappings: &[NewFieldMapping],
) -> Result<(), DatabaseError> {
    conn.execute(
        "DELETE FROM field_mappings WHERE document_id = ?1",
        params![document_id],
    )?;

    let mut stmt = conn.prepare(
        "INSERT INTO field_mappings (document_id, source_field, target_field, field_type,
         extracted_value, confidence)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    for mapping in mappings {
        stmt.execute(params![
            document_id,
            mapping.source_field,
            mapping.target_field,
            mapping.field_type,
            mapping.extracted_value,
            mapping.confidence,
        ])?;
    }
    Ok(())
}

/// Mappings of a document in insertion order.
pub fn find_by_document(
    conn: &Connection,
    document_id: &str,
) -> Result<Vec<FieldMapping>, DatabaseError> {
    let mut stmt =
        conn.prepare("SELECT * FROM field_mappings WHERE document_id = ?1 ORDER BY id ASC")?;
    let rows = stmt
        .query_map(params![document_id], from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
