use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info_span, warn};

use crate::db::DocumentRepository;
use crate::document::{Document, ProcessingStatus};
use crate::error::ProcessError;
use crate::extract::{extract_fields, fields_to_object};
use crate::ocr::{EngineType, OcrService, OcrSession};
use crate::processor::{preprocess_bytes, PageRasterizer};
use crate::sanitize;
use crate::storage::ContentStore;
use crate::worker::job::DocumentOutcome;

use super::config::PipelineConfig;
use super::context::{PipelineContext, Recognition};
use super::error::PipelineError;
use super::progress::{PipelinePhase, ProgressEvent, ProgressReporter};

pub const PROGRESS_STARTED: u8 = 10;
pub const PROGRESS_LOADED: u8 = 20;
pub const PROGRESS_PREPROCESSING: u8 = 30;
pub const PROGRESS_PREPROCESSED: u8 = 50;
pub const PROGRESS_PAGES_START: u8 = 30;
pub const PROGRESS_PAGES_DONE: u8 = 60;
pub const PROGRESS_RECOGNIZED: u8 = 70;
pub const PROGRESS_COMPLETE: u8 = 100;

/// Progress checkpoint before rendering page `index` (0-based) of `total`.
pub fn page_progress(index: usize, total: usize) -> u8 {
    if total == 0 {
        return PROGRESS_PAGES_START;
    }
    let span = usize::from(PROGRESS_PAGES_DONE - PROGRESS_PAGES_START);
    let offset = index.min(total) * span / total;
    PROGRESS_PAGES_START + offset as u8
}

/// Drives one document through load, OCR, JSON generation and commit.
///
/// Every checkpoint is written through the repository, so the persisted
/// row always shows how far the run got.
pub struct Pipeline {
    config: PipelineConfig,
    repo: Arc<dyn DocumentRepository>,
    store: Arc<dyn ContentStore>,
    ocr: Arc<OcrService>,
    rasterizer: Arc<dyn PageRasterizer>,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        repo: Arc<dyn DocumentRepository>,
        store: Arc<dyn ContentStore>,
        ocr: Arc<OcrService>,
        rasterizer: Arc<dyn PageRasterizer>,
    ) -> Self {
        Self {
            config,
            repo,
            store,
            ocr,
            rasterizer,
        }
    }

    /// Moves a document to `PROCESSING` at 10% and persists it.
    ///
    /// Text and JSON from an earlier run are kept until this run commits.
    pub fn start(
        &self,
        mut document: Document,
        requested_engine: Option<EngineType>,
    ) -> Result<PipelineContext, PipelineError> {
        document.status = ProcessingStatus::Processing;
        document.progress = PROGRESS_STARTED;
        document.error_message = None;
        document.touch();
        self.repo.save(&document)?;
        Ok(PipelineContext::new(document, requested_engine))
    }

    /// Runs every stage. Failures are recorded on the document, never
    /// returned.
    pub fn run(
        &self,
        mut ctx: PipelineContext,
        progress: &dyn ProgressReporter,
    ) -> (DocumentOutcome, PipelineContext) {
        let filename = sanitize::redact_path(Path::new(&ctx.document.original_filename));
        let _pipeline_span = info_span!("pipeline",
            document_id = %ctx.document.id,
            filename = %filename,
            content_type = %ctx.document.content_type,
        )
        .entered();

        progress.report(ProgressEvent::Checkpoint {
            document_id: ctx.document.id.clone(),
            phase: PipelinePhase::Started,
            progress: ctx.document.progress,
        });

        // Settings are pinned here; language changes during the run do not apply.
        let session = self.ocr.session();

        match self.run_steps(&mut ctx, &session, progress) {
            Ok(()) => {
                let recognition = ctx.recognition;
                progress.report(ProgressEvent::Completed {
                    document_id: ctx.document.id.clone(),
                    engine: recognition.map(|r| r.engine),
                    confidence: recognition.map(|r| r.confidence),
                });
                let outcome = DocumentOutcome::success(
                    &ctx.document,
                    recognition.map(|r| r.engine),
                    recognition.map(|r| r.confidence),
                );
                (outcome, ctx)
            }
            Err(e) => {
                let message = e.to_string();
                self.record_failure(&mut ctx, &message);
                progress.report(ProgressEvent::Failed {
                    document_id: ctx.document.id.clone(),
                    error: message.clone(),
                });
                (DocumentOutcome::failure(&ctx.document, message), ctx)
            }
        }
    }

    fn run_steps(
        &self,
        ctx: &mut PipelineContext,
        session: &OcrSession,
        progress: &dyn ProgressReporter,
    ) -> Result<(), PipelineError> {
        {
            let _step = info_span!("load_content").entered();
            self.step_load_content(ctx, progress)?;
        }
        {
            let _step = info_span!("extract_text").entered();
            self.step_extract_text(ctx, session, progress)?;
        }
        {
            let _step = info_span!("generate_json").entered();
            self.step_generate_json(ctx, progress);
        }
        {
            let _step = info_span!("commit").entered();
            self.step_commit(ctx)?;
        }
        Ok(())
    }

    /// Persists a new progress value if it moves forward.
    fn checkpoint(
        &self,
        ctx: &mut PipelineContext,
        value: u8,
        phase: PipelinePhase,
        progress: &dyn ProgressReporter,
    ) -> Result<(), PipelineError> {
        if value <= ctx.document.progress {
            return Ok(());
        }
        ctx.document.progress = value;
        ctx.document.touch();
        self.repo.save(&ctx.document).map_err(|e| {
            tracing::error!("Failed to save progress for {}: {}", ctx.document.id, e);
            e
        })?;
        progress.report(ProgressEvent::Checkpoint {
            document_id: ctx.document.id.clone(),
            phase,
            progress: value,
        });
        Ok(())
    }

    fn step_load_content(
        &self,
        ctx: &mut PipelineContext,
        progress: &dyn ProgressReporter,
    ) -> Result<(), PipelineError> {
        let bytes = self
            .store
            .load(&ctx.document.storage_locator)
            .map_err(ProcessError::from)?;
        debug!(bytes = bytes.len(), "Loaded stored content");
        ctx.content = Some(bytes);
        self.checkpoint(ctx, PROGRESS_LOADED, PipelinePhase::Loading, progress)
    }

    fn step_extract_text(
        &self,
        ctx: &mut PipelineContext,
        session: &OcrSession,
        progress: &dyn ProgressReporter,
    ) -> Result<(), PipelineError> {
        let content = ctx
            .content
            .take()
            .ok_or_else(|| ProcessError::Internal("content not loaded".to_string()))?;

        let text = if ctx.document.content_type.is_pdf() {
            self.extract_pdf(ctx, &content, session, progress)?;
            ctx.page_texts.join("\n").trim().to_string()
        } else {
            self.extract_image(ctx, &content, session, progress)?;
            ctx.page_texts.join("\n")
        };

        ctx.text = Some(text);
        self.checkpoint(ctx, PROGRESS_RECOGNIZED, PipelinePhase::Recognizing, progress)
    }

    fn extract_image(
        &self,
        ctx: &mut PipelineContext,
        content: &[u8],
        session: &OcrSession,
        progress: &dyn ProgressReporter,
    ) -> Result<(), PipelineError> {
        self.checkpoint(
            ctx,
            PROGRESS_PREPROCESSING,
            PipelinePhase::Preprocessing,
            progress,
        )?;
        let image = preprocess_bytes(content)?;
        self.checkpoint(
            ctx,
            PROGRESS_PREPROCESSED,
            PipelinePhase::Preprocessing,
            progress,
        )?;

        let output = session
            .extract_with(&image, ctx.requested_engine)
            .map_err(ProcessError::from)?;
        ctx.recognition = Some(Recognition {
            engine: output.engine,
            confidence: output.confidence,
        });
        ctx.page_texts.push(output.text);
        Ok(())
    }

    fn extract_pdf(
        &self,
        ctx: &mut PipelineContext,
        content: &[u8],
        session: &OcrSession,
        progress: &dyn ProgressReporter,
    ) -> Result<(), PipelineError> {
        let pages = self.rasterizer.open(content)?;
        let total = pages.page_count();
        if total == 0 {
            return Err(ProcessError::PdfProcessing("PDF has no pages".to_string()).into());
        }
        debug!(pages = total, dpi = self.config.pdf_dpi, "Rasterizing PDF");

        let mut confidence_sum: u32 = 0;
        let mut last_engine = None;
        for index in 0..total {
            self.checkpoint(
                ctx,
                page_progress(index, total),
                PipelinePhase::RenderingPages,
                progress,
            )?;

            let page_number = u32::try_from(index + 1)
                .map_err(|_| ProcessError::PdfProcessing("too many pages".to_string()))?;
            let rendered = pages.render_page(page_number, self.config.pdf_dpi)?;
            let image = preprocess_bytes(&rendered)?;
            let output = session
                .extract_with(&image, ctx.requested_engine)
                .map_err(ProcessError::from)?;

            debug!(
                page = page_number,
                engine = %output.engine,
                chars = output.text.len(),
                "Recognized page"
            );
            confidence_sum += u32::from(output.confidence);
            last_engine = Some(output.engine);
            ctx.page_texts.push(output.text);
        }

        if let Some(engine) = last_engine {
            let mean = confidence_sum / total as u32;
            ctx.recognition = Some(Recognition {
                engine,
                confidence: mean.min(100) as u8,
            });
        }

        self.checkpoint(
            ctx,
            PROGRESS_PAGES_DONE,
            PipelinePhase::RenderingPages,
            progress,
        )
    }

    fn step_generate_json(&self, ctx: &mut PipelineContext, progress: &dyn ProgressReporter) {
        let text = ctx.text.as_deref().unwrap_or_default();
        let fields = extract_fields(text);
        let json = serde_json::Value::Object(fields_to_object(&fields)).to_string();
        debug!(fields = fields.len(), "Generated JSON");
        ctx.fields = fields;
        ctx.json = Some(json);
        progress.report(ProgressEvent::Checkpoint {
            document_id: ctx.document.id.clone(),
            phase: PipelinePhase::GeneratingJson,
            progress: ctx.document.progress,
        });
    }

    /// Writes the result and its field mappings in one transaction. The
    /// context keeps the pre-run document until the write succeeds.
    fn step_commit(&self, ctx: &mut PipelineContext) -> Result<(), PipelineError> {
        let confidence = ctx.recognition.map(|r| f64::from(r.confidence));
        let mappings: Vec<_> = ctx
            .fields
            .iter()
            .map(|f| f.to_mapping(confidence))
            .collect();

        let mut done = ctx.document.clone();
        done.extracted_text = ctx.text.clone();
        done.extracted_json = ctx.json.clone();
        done.status = ProcessingStatus::Completed;
        done.progress = PROGRESS_COMPLETE;
        done.error_message = None;
        done.touch();

        self.repo.complete(&done, &mappings).map_err(|e| {
            tracing::error!("Failed to commit results for {}: {}", done.id, e);
            e
        })?;
        ctx.document = done;
        Ok(())
    }

    fn record_failure(&self, ctx: &mut PipelineContext, message: &str) {
        warn!("Processing failed for {}: {}", ctx.document.id, message);
        ctx.document.status = ProcessingStatus::Failed;
        ctx.document.error_message = Some(message.to_string());
        ctx.document.touch();
        if let Err(e) = self.repo.save(&ctx.document) {
            tracing::error!(
                "Failed to record failure for {}: {}",
                ctx.document.id,
                e
            );
        }
    }
}
