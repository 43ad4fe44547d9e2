//! Caller-facing document operations.
//!
//! `DocumentService` validates requests, owns the worker pool and maps
//! lower-level failures onto [`ServiceError`]. Reads go straight to the
//! repository; processing runs on the pool and is observed through the
//! persisted document.

use std::sync::Arc;

use crossbeam_channel::bounded;

use crate::config::{Config, DEFAULT_MAX_UPLOAD_BYTES};
use crate::db::DocumentRepository;
use crate::document::{
    ContentType, Document, FieldMapping, Page, PageRequest, ProcessingStatus,
};
use crate::error::{ServiceError, ValidationError};
use crate::extract::{self, ExtractionError};
use crate::ocr::{
    self, CurrentLanguages, EngineInfo, EngineType, LanguageInfo, OcrService, OcrSettings,
};
use crate::pipeline::{NoopProgress, Pipeline, PipelineConfig, ProgressReporter};
use crate::processor::{PageRasterizer, PopplerRasterizer};
use crate::storage::ContentStore;
use crate::worker::{
    BatchHandle, InFlightRegistry, ProcessingHandle, ProcessingJob, WorkerPool,
};

type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// Assembles a [`DocumentService`]. Repository and content store are
/// required; everything else has a production default.
pub struct DocumentServiceBuilder {
    repo: Arc<dyn DocumentRepository>,
    store: Arc<dyn ContentStore>,
    ocr: Option<Arc<OcrService>>,
    rasterizer: Arc<dyn PageRasterizer>,
    progress: Arc<dyn ProgressReporter>,
    pipeline_config: PipelineConfig,
    worker_count: usize,
    max_upload_bytes: u64,
}

impl DocumentServiceBuilder {
    pub fn new(repo: Arc<dyn DocumentRepository>, store: Arc<dyn ContentStore>) -> Self {
        Self {
            repo,
            store,
            ocr: None,
            rasterizer: Arc::new(PopplerRasterizer),
            progress: Arc::new(NoopProgress),
            pipeline_config: PipelineConfig::default(),
            worker_count: num_cpus::get().max(1),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    /// Applies worker count, upload limit, DPI and OCR settings.
    pub fn config(mut self, config: &Config) -> Self {
        self.pipeline_config = PipelineConfig::from_config(config);
        self.worker_count = config.worker_count;
        self.max_upload_bytes = config.max_upload_bytes;
        if self.ocr.is_none() {
            self.ocr = Some(Arc::new(OcrService::new(OcrSettings::from_config(
                &config.ocr,
            ))));
        }
        self
    }

    pub fn ocr(mut self, ocr: Arc<OcrService>) -> Self {
        self.ocr = Some(ocr);
        self
    }

    pub fn rasterizer(mut self, rasterizer: Arc<dyn PageRasterizer>) -> Self {
        self.rasterizer = rasterizer;
        self
    }

    pub fn progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    pub fn worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }

    pub fn max_upload_bytes(mut self, limit: u64) -> Self {
        self.max_upload_bytes = limit;
        self
    }

    pub fn build(self) -> ServiceResult<DocumentService> {
        let ocr = self
            .ocr
            .unwrap_or_else(|| Arc::new(OcrService::new(OcrSettings::default())));
        let pipeline = Arc::new(Pipeline::new(
            self.pipeline_config,
            Arc::clone(&self.repo),
            Arc::clone(&self.store),
            Arc::clone(&ocr),
            self.rasterizer,
        ));
        let pool = WorkerPool::new(Arc::clone(&pipeline), self.progress, self.worker_count)?;

        Ok(DocumentService {
            repo: self.repo,
            store: self.store,
            ocr,
            pipeline,
            pool,
            in_flight: InFlightRegistry::new(),
            max_upload_bytes: self.max_upload_bytes,
        })
    }
}

pub struct DocumentService {
    repo: Arc<dyn DocumentRepository>,
    store: Arc<dyn ContentStore>,
    ocr: Arc<OcrService>,
    pipeline: Arc<Pipeline>,
    pool: WorkerPool,
    in_flight: InFlightRegistry,
    max_upload_bytes: u64,
}

impl DocumentService {
    pub fn builder(
        repo: Arc<dyn DocumentRepository>,
        store: Arc<dyn ContentStore>,
    ) -> DocumentServiceBuilder {
        DocumentServiceBuilder::new(repo, store)
    }

    /// Validates and stores an upload, returning the new `PENDING` document.
    ///
    /// Nothing is written when validation fails. If the row cannot be
    /// inserted, the stored bytes are removed again.
    pub fn upload_document(
        &self,
        bytes: &[u8],
        original_filename: &str,
        content_type: &str,
        size: u64,
    ) -> ServiceResult<Document> {
        let content_type = self.validate_upload(bytes, content_type, size)?;

        let stored = self
            .store
            .store(bytes, original_filename)
            .map_err(|e| ServiceError::internal("Failed to store upload", e))?;

        let document = Document::new_pending(
            stored.stored_filename,
            original_filename.to_string(),
            content_type,
            bytes.len() as u64,
            stored.locator,
        );

        if let Err(e) = self.repo.insert(&document) {
            if let Err(remove_err) = self.store.remove(&document.storage_locator) {
                tracing::warn!(
                    "Failed to remove stored upload after insert failure: {}",
                    remove_err
                );
            }
            return Err(ServiceError::internal("Failed to persist upload", e));
        }

        tracing::info!(
            document_id = %document.id,
            content_type = %document.content_type,
            size = document.size,
            "Document uploaded"
        );
        Ok(document)
    }

    fn validate_upload(
        &self,
        bytes: &[u8],
        content_type: &str,
        declared_size: u64,
    ) -> Result<ContentType, ValidationError> {
        if bytes.is_empty() || declared_size == 0 {
            return Err(ValidationError::EmptyFile);
        }
        let content_type = ContentType::parse(content_type)?;
        let size = declared_size.max(bytes.len() as u64);
        if size > self.max_upload_bytes {
            return Err(ValidationError::FileTooLarge {
                size,
                limit: self.max_upload_bytes,
            });
        }
        Ok(content_type)
    }

    /// Starts a background run. Returns once the document is `PROCESSING`.
    pub fn start_processing(&self, id: &str) -> ServiceResult<ProcessingHandle> {
        self.start_processing_with(id, None)
    }

    /// Like [`Self::start_processing`], forcing an OCR engine. An
    /// unavailable engine falls back to the local one.
    pub fn start_processing_with(
        &self,
        id: &str,
        engine: Option<EngineType>,
    ) -> ServiceResult<ProcessingHandle> {
        let guard = self
            .in_flight
            .claim(id)
            .ok_or_else(|| ServiceError::AlreadyProcessing(id.to_string()))?;
        let document = self.require(id)?;

        // A PROCESSING row without an in-flight claim is left over from an
        // interrupted process and may be restarted.
        if document.status == ProcessingStatus::Corrected {
            return Err(ServiceError::InvalidTransition {
                id: id.to_string(),
                from: document.status,
                action: "process",
            });
        }

        let context = self
            .pipeline
            .start(document, engine)
            .map_err(|e| ServiceError::internal("Failed to start processing", e))?;
        let started = context.document.clone();

        let (reply, receiver) = bounded(1);
        let job = ProcessingJob {
            context,
            reply,
            guard: Some(guard),
        };
        if let Err(e) = self.pool.submit(job) {
            self.mark_unscheduled(started);
            return Err(e.into());
        }

        tracing::debug!(document_id = %id, "Processing queued");
        Ok(ProcessingHandle::new(id.to_string(), receiver))
    }

    fn mark_unscheduled(&self, mut document: Document) {
        document.status = ProcessingStatus::Failed;
        document.error_message = Some("Processing could not be scheduled".to_string());
        document.touch();
        if let Err(e) = self.repo.save(&document) {
            tracing::error!("Failed to record scheduling failure for {}: {}", document.id, e);
        }
    }

    /// Starts every id independently. Ids that cannot be started are
    /// reported in place; they never affect the others.
    pub fn process_batch<S: AsRef<str>>(&self, ids: &[S]) -> BatchHandle {
        let mut batch = BatchHandle::new();
        for id in ids {
            let id = id.as_ref();
            match self.start_processing(id) {
                Ok(handle) => batch.push_started(handle),
                Err(e) => {
                    tracing::warn!(document_id = %id, "Batch item not started: {}", e);
                    batch.push_rejected(id.to_string(), e);
                }
            }
        }
        tracing::info!(
            total = batch.len(),
            started = batch.started(),
            "Batch submitted"
        );
        batch
    }

    /// Replaces the document's structured data with a manual correction.
    ///
    /// Allowed once a run has finished (`COMPLETED` or `FAILED`) and again
    /// on an already corrected document. Invalid JSON leaves it untouched.
    pub fn apply_correction(&self, id: &str, corrected_json: &str) -> ServiceResult<Document> {
        self.require(id)?;

        if !extract::is_valid_json(corrected_json) {
            let reason = serde_json::from_str::<serde_json::Value>(corrected_json)
                .err()
                .map(|e| e.to_string())
                .unwrap_or_default();
            return Err(ServiceError::InvalidCorrection(reason));
        }

        let _guard = self
            .in_flight
            .claim(id)
            .ok_or_else(|| ServiceError::AlreadyProcessing(id.to_string()))?;

        // Read under the claim so no run can write in between.
        let mut document = self.require(id)?;
        if !document.status.accepts_correction() {
            return Err(ServiceError::InvalidTransition {
                id: id.to_string(),
                from: document.status,
                action: "correct",
            });
        }

        document.corrected_json = Some(corrected_json.to_string());
        document.status = ProcessingStatus::Corrected;
        document.progress = 100;
        document.error_message = None;
        document.touch();
        self.repo
            .save(&document)
            .map_err(|e| ServiceError::internal("Failed to save correction", e))?;

        tracing::info!(document_id = %id, "Correction applied");
        Ok(document)
    }

    pub fn get_document(&self, id: &str) -> ServiceResult<Document> {
        self.require(id)
    }

    pub fn list_by_status(&self, status: ProcessingStatus) -> ServiceResult<Vec<Document>> {
        self.repo
            .find_by_status(status)
            .map_err(|e| ServiceError::internal("Failed to list documents", e))
    }

    pub fn list_paged(&self, request: &PageRequest) -> ServiceResult<Page<Document>> {
        self.repo
            .find_page(request)
            .map_err(|e| ServiceError::internal("Failed to list documents", e))
    }

    pub fn count_by_status(&self, status: ProcessingStatus) -> ServiceResult<u64> {
        self.repo
            .count_by_status(status)
            .map_err(|e| ServiceError::internal("Failed to count documents", e))
    }

    pub fn search_by_filename(&self, fragment: &str) -> ServiceResult<Vec<Document>> {
        self.repo
            .search_by_filename(fragment)
            .map_err(|e| ServiceError::internal("Failed to search documents", e))
    }

    pub fn field_mappings(&self, id: &str) -> ServiceResult<Vec<FieldMapping>> {
        self.require(id)?;
        self.repo
            .field_mappings(id)
            .map_err(|e| ServiceError::internal("Failed to load field mappings", e))
    }

    /// Extracted JSON with any correction laid over it.
    ///
    /// A correction that is not a JSON object replaces the extracted data
    /// wholesale. `None` when the document has no structured data yet.
    pub fn merged_json(&self, id: &str) -> ServiceResult<Option<String>> {
        let document = self.require(id)?;
        let extracted = document.extracted_json;
        let corrected = match (document.status, document.corrected_json) {
            (ProcessingStatus::Corrected, Some(c)) => c,
            _ => return Ok(extracted),
        };
        let base = extracted.as_deref().unwrap_or("{}");
        match extract::merge(base, &corrected) {
            Ok(merged) => Ok(Some(merged)),
            Err(ExtractionError::NotAnObject) => Ok(Some(corrected)),
            Err(e) => Err(ServiceError::internal("Stored JSON is unreadable", e)),
        }
    }

    pub fn set_language(&self, primary: &str, additional: &[String]) -> CurrentLanguages {
        self.ocr.set_language(primary, additional)
    }

    pub fn current_languages(&self) -> CurrentLanguages {
        self.ocr.current_languages()
    }

    pub fn supported_languages(&self) -> &'static [LanguageInfo] {
        ocr::supported_languages()
    }

    pub fn is_language_supported(&self, code: &str) -> bool {
        ocr::is_language_supported(code)
    }

    pub fn available_engines(&self) -> Vec<EngineType> {
        self.ocr.available_engines()
    }

    pub fn engine_status(&self) -> Vec<EngineInfo> {
        self.ocr.engine_status()
    }

    pub fn is_handwriting_recognition_available(&self) -> bool {
        self.ocr.is_handwriting_recognition_available()
    }

    /// True while a run for `id` is queued or executing in this process.
    pub fn is_in_flight(&self, id: &str) -> bool {
        self.in_flight.contains(id)
    }

    /// Finishes queued runs and stops the workers.
    pub fn shutdown(self) {
        self.pool.wait();
    }

    fn require(&self, id: &str) -> ServiceResult<Document> {
        self.repo
            .find_by_id(id)
            .map_err(|e| ServiceError::internal("Failed to load document", e))?
            .ok_or_else(|| ServiceError::NotFound(id.to_string()))
    }
}
