pub mod config;
pub mod context;
pub mod error;
pub mod progress;
pub mod runner;

pub use config::PipelineConfig;
pub use context::{PipelineContext, Recognition};
pub use error::PipelineError;
pub use progress::{LogProgress, NoopProgress, PipelinePhase, ProgressEvent, ProgressReporter};
pub use runner::{page_progress, Pipeline};
