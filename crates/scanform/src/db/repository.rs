//! The document repository seam.
//!
//! The pipeline and the service only talk to `DocumentRepository`; the
//! SQLite implementation is the production backend and tests wrap it to
//! observe writes.

use crate::document::{Document, FieldMapping, NewFieldMapping, Page, PageRequest, ProcessingStatus};

use super::{document_repo, field_mapping_repo, Database, DatabaseError};

pub trait DocumentRepository: Send + Sync {
    fn insert(&self, doc: &Document) -> Result<(), DatabaseError>;

    fn find_by_id(&self, id: &str) -> Result<Option<Document>, DatabaseError>;

    /// Persists the mutable state of an existing document.
    fn save(&self, doc: &Document) -> Result<(), DatabaseError>;

    /// Persists a finished run and its field mappings atomically.
    fn complete(&self, doc: &Document, mappings: &[NewFieldMapping]) -> Result<(), DatabaseError>;

    fn find_by_status(&self, status: ProcessingStatus) -> Result<Vec<Document>, DatabaseError>;

    fn find_page(&self, request: &PageRequest) -> Result<Page<Document>, DatabaseError>;

    fn count_by_status(&self, status: ProcessingStatus) -> Result<u64, DatabaseError>;

    fn search_by_filename(&self, fragment: &str) -> Result<Vec<Document>, DatabaseError>;

    fn field_mappings(&self, document_id: &str) -> Result<Vec<FieldMapping>, DatabaseError>;

    /// Removes a document. Only used to roll back a failed upload.
    fn delete(&self, id: &str) -> Result<bool, DatabaseError>;
}

#[derive(Clone)]
pub struct SqliteDocumentRepository {
    db: Database,
}

impl SqliteDocumentRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

fn ensure_updated(changed: usize, id: &str) -> Result<(), DatabaseError> {
    if changed == 0 {
        return Err(DatabaseError::MissingRow(id.to_string()));
    }
    Ok(())
}

impl DocumentRepository for SqliteDocumentRepository {
    fn insert(&self, doc: &Document) -> Result<(), DatabaseError> {
        self.db.with_conn(|conn| document_repo::insert(conn, doc))
    }

    fn find_by_id(&self, id: &str) -> Result<Option<Document>, DatabaseError> {
        self.db.with_conn(|conn| document_repo::find_by_id(conn, id))
    }

    fn save(&self, doc: &Document) -> Result<(), DatabaseError> {
        self.db
            .with_conn(|conn| ensure_updated(document_repo::update(conn, doc)?, &doc.id))
    }

    fn complete(&self, doc: &Document, mappings: &[NewFieldMapping]) -> Result<(), DatabaseError> {
        self.db.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            ensure_updated(document_repo::update(&tx, doc)?, &doc.id)?;
            field_mapping_repo::replace_for_document(&tx, &doc.id, mappings)?;
            tx.commit()?;
            Ok(())
        })
    }

    fn find_by_status(&self, status: ProcessingStatus) -> Result<Vec<Document>, DatabaseError> {
        self.db
            .with_conn(|conn| document_repo::find_by_status(conn, status))
    }

    fn find_page(&self, request: &PageRequest) -> Result<Page<Document>, DatabaseError> {
        self.db
            .with_conn(|conn| document_repo::query_page(conn, request))
    }

    fn count_by_status(&self, status: ProcessingStatus) -> Result<u64, DatabaseError> {
        self.db
            .with_conn(|conn| document_repo::count_by_status(conn, status))
    }

    fn search_by_filename(&self, fragment: &str) -> Result<Vec<Document>, DatabaseError> {
        self.db
            .with_conn(|conn| document_repo::search_by_filename(conn, fragment))
    }

    fn field_mappings(&self, document_id: &str) -> Result<Vec<FieldMapping>, DatabaseError> {
        self.db
            .with_conn(|conn| field_mapping_repo::find_by_document(conn, document_id))
    }

    fn delete(&self, id: &str) -> Result<bool, DatabaseError> {
        self.db.with_conn(|conn| document_repo::delete(conn, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::ContentType;

    fn repo() -> SqliteDocumentRepository {
        SqliteDocumentRepository::new(Database::open_in_memory().unwrap())
    }

    fn doc() -> Document {
        Document::new_pending(
            "x_form.png".to_string(),
            "form.png".to_string(),
            ContentType::Png,
            10,
            "x_form.png".to_string(),
        )
    }

    #[test]
    fn test_save_unknown_document_fails() {
        let repo = repo();
        let doc = doc();
        match repo.save(&doc) {
            Err(DatabaseError::MissingRow(id)) => assert_eq!(id, doc.id),
            other => panic!("expected MissingRow, got {:?}", other),
        }
    }

    #[test]
    fn test_complete_writes_document_and_mappings_together() {
        let repo = repo();
        let mut doc = doc();
        repo.insert(&doc).unwrap();

        doc.status = ProcessingStatus::Completed;
        doc.progress = 100;
        doc.extracted_json = Some(r#"{"age":42}"#.to_string());
        let mappings = vec![NewFieldMapping {
            source_field: "Age".to_string(),
            target_field: "age".to_string(),
            field_type: "integer".to_string(),
            extracted_value: Some("42".to_string()),
            confidence: Some(91.0),
        }];
        repo.complete(&doc, &mappings).unwrap();

        let stored = repo.find_by_id(&doc.id).unwrap().unwrap();
        assert_eq!(stored.status, ProcessingStatus::Completed);
        assert_eq!(stored.progress, 100);
        assert_eq!(repo.field_mappings(&doc.id).unwrap().len(), 1);
    }

    #[test]
    fn test_complete_rolls_back_when_document_missing() {
        let repo = repo();
        let ghost = doc();
        let result = repo.complete(&ghost, &[]);
        assert!(result.is_err());
        assert!(repo.field_mappings(&ghost.id).unwrap().is_empty());
    }
}
