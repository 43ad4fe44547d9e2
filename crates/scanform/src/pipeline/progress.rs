use std::fmt;

use crate::ocr::EngineType;

/// Coarse stage of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelinePhase {
    Started,
    Loading,
    Preprocessing,
    RenderingPages,
    Recognizing,
    GeneratingJson,
}

impl fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PipelinePhase::Started => "started",
            PipelinePhase::Loading => "loading",
            PipelinePhase::Preprocessing => "preprocessing",
            PipelinePhase::RenderingPages => "rendering_pages",
            PipelinePhase::Recognizing => "recognizing",
            PipelinePhase::GeneratingJson => "generating_json",
        };
        f.write_str(s)
    }
}

/// Events emitted by the pipeline. The persisted document row stays the
/// source of truth; these mirror its checkpoints for in-process observers.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Checkpoint {
        document_id: String,
        phase: PipelinePhase,
        progress: u8,
    },
    Completed {
        document_id: String,
        engine: Option<EngineType>,
        confidence: Option<u8>,
    },
    Failed {
        document_id: String,
        error: String,
    },
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// Discards all events.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Mirrors events into the log at debug level.
pub struct LogProgress;

impl ProgressReporter for LogProgress {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Checkpoint {
                document_id,
                phase,
                progress,
            } => tracing::debug!(%document_id, %phase, progress, "Pipeline checkpoint"),
            ProgressEvent::Completed {
                document_id,
                engine,
                confidence,
            } => tracing::info!(
                %document_id,
                engine = engine.map(|e| e.as_str()).unwrap_or("none"),
                ?confidence,
                "Document processed"
            ),
            ProgressEvent::Failed { document_id, error } => {
                tracing::warn!(%document_id, "Document processing failed: {}", error)
            }
        }
    }
}
