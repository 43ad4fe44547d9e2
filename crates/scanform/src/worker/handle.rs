use std::time::Duration;

use crossbeam_channel::Receiver;

use crate::error::{ServiceError, WorkerError};

use super::job::DocumentOutcome;

/// Acknowledgment for a started run. The run proceeds whether or not the
/// handle is kept; the persisted document is the authoritative state.
pub struct ProcessingHandle {
    document_id: String,
    receiver: Receiver<DocumentOutcome>,
}

impl ProcessingHandle {
    pub(crate) fn new(document_id: String, receiver: Receiver<DocumentOutcome>) -> Self {
        Self {
            document_id,
            receiver,
        }
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    /// Blocks until the run reaches a terminal state.
    pub fn wait(self) -> Result<DocumentOutcome, WorkerError> {
        self.receiver.recv().map_err(|_| WorkerError::ChannelClosed)
    }

    pub fn wait_timeout(&self, timeout: Duration) -> Option<DocumentOutcome> {
        self.receiver.recv_timeout(timeout).ok()
    }

    pub fn try_result(&self) -> Option<DocumentOutcome> {
        self.receiver.try_recv().ok()
    }
}

/// Per-id result of a batch.
#[derive(Debug)]
pub struct BatchResult {
    pub document_id: String,
    /// `Err` when the run could not be started (unknown id, already running).
    pub outcome: Result<DocumentOutcome, ServiceError>,
}

enum BatchEntry {
    Started(ProcessingHandle),
    Rejected {
        document_id: String,
        error: ServiceError,
    },
}

/// Handles for every id of a batch, in input order.
pub struct BatchHandle {
    entries: Vec<BatchEntry>,
}

impl BatchHandle {
    pub(crate) fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub(crate) fn push_started(&mut self, handle: ProcessingHandle) {
        self.entries.push(BatchEntry::Started(handle));
    }

    pub(crate) fn push_rejected(&mut self, document_id: String, error: ServiceError) {
        self.entries.push(BatchEntry::Rejected { document_id, error });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of ids whose run was started.
    pub fn started(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e, BatchEntry::Started(_)))
            .count()
    }

    /// Waits for every started run. Results keep the input order.
    pub fn wait(self) -> Vec<BatchResult> {
        self.entries
            .into_iter()
            .map(|entry| match entry {
                BatchEntry::Started(handle) => {
                    let document_id = handle.document_id().to_string();
                    let outcome = handle.wait().map_err(ServiceError::from);
                    BatchResult {
                        document_id,
                        outcome,
                    }
                }
                BatchEntry::Rejected { document_id, error } => BatchResult {
                    document_id,
                    outcome: Err(error),
                },
            })
            .collect()
    }
}
