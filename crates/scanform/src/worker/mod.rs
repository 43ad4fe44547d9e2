pub mod handle;
pub mod job;
pub mod pool;

pub use handle::{BatchHandle, BatchResult, ProcessingHandle};
pub use job::{DocumentOutcome, InFlightGuard, InFlightRegistry, ProcessingJob};
pub use pool::WorkerPool;
