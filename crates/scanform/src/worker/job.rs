use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use crossbeam_channel::Sender;

use crate::document::{Document, ProcessingStatus};
use crate::ocr::EngineType;
use crate::pipeline::PipelineContext;

/// Terminal state of one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentOutcome {
    pub document_id: String,
    pub status: ProcessingStatus,
    pub progress: u8,
    pub error: Option<String>,
    pub engine: Option<EngineType>,
    pub confidence: Option<u8>,
}

impl DocumentOutcome {
    pub fn success(document: &Document, engine: Option<EngineType>, confidence: Option<u8>) -> Self {
        Self {
            document_id: document.id.clone(),
            status: document.status,
            progress: document.progress,
            error: None,
            engine,
            confidence,
        }
    }

    pub fn failure(document: &Document, error: impl Into<String>) -> Self {
        Self {
            document_id: document.id.clone(),
            status: ProcessingStatus::Failed,
            progress: document.progress,
            error: Some(error.into()),
            engine: None,
            confidence: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ProcessingStatus::Completed
    }
}

/// Ids with a run queued or in progress.
#[derive(Clone, Default)]
pub struct InFlightRegistry {
    ids: Arc<Mutex<HashSet<String>>>,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `id`. Returns `None` if a run for it is already in flight.
    pub fn claim(&self, id: &str) -> Option<InFlightGuard> {
        let mut ids = self.ids.lock().unwrap_or_else(PoisonError::into_inner);
        if !ids.insert(id.to_string()) {
            return None;
        }
        Some(InFlightGuard {
            ids: Arc::clone(&self.ids),
            id: id.to_string(),
        })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Releases its id when dropped.
pub struct InFlightGuard {
    ids: Arc<Mutex<HashSet<String>>>,
    id: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}

/// A started document waiting for a worker.
pub struct ProcessingJob {
    pub context: PipelineContext,
    pub reply: Sender<DocumentOutcome>,
    pub guard: Option<InFlightGuard>,
}
