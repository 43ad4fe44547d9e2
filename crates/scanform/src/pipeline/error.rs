use thiserror::Error;

use crate::db::DatabaseError;
use crate::error::ProcessError;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Processing(#[from] ProcessError),

    /// Detail is logged where it happens; the message is what gets
    /// recorded on the document.
    #[error("Internal error while saving document state")]
    Persistence(#[from] DatabaseError),
}
