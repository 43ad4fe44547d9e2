//! Test harness wiring a `DocumentService` to fakes.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use scanform::ocr::OcrSettings;
use scanform::processor::PageRasterizer;
use scanform::{
    Database, Document, DocumentOutcome, DocumentService, FileStorage, OcrService,
    SqliteDocumentRepository,
};

use super::builders::{PageImageBuilder, SIGNUP_FORM_TEXT};
use super::fakes::{FakeRasterizer, RecordingProgress, RecordingRepository, ScriptedProvider};

/// A document service over an in-memory database, a temp upload
/// directory and scripted OCR engines.
pub struct TestHarness {
    temp_dir: TempDir,
    pub repo: Arc<RecordingRepository>,
    pub provider: Arc<ScriptedProvider>,
    pub ocr: Arc<OcrService>,
    pub progress: Arc<RecordingProgress>,
    pub service: DocumentService,
}

impl TestHarness {
    pub fn new() -> Self {
        HarnessBuilder::new().build()
    }

    pub fn builder() -> HarnessBuilder {
        HarnessBuilder::new()
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.temp_dir.path().join("uploads")
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn upload(&self, bytes: &[u8], filename: &str, content_type: &str) -> Document {
        self.service
            .upload_document(bytes, filename, content_type, bytes.len() as u64)
            .expect("upload document")
    }

    pub fn upload_form(&self, filename: &str) -> Document {
        self.upload(&PageImageBuilder::new().png(), filename, "image/png")
    }

    /// Starts processing and blocks until the run has finished.
    pub fn process(&self, id: &str) -> DocumentOutcome {
        self.service
            .start_processing(id)
            .expect("start processing")
            .wait()
            .expect("processing outcome")
    }

    pub fn document(&self, id: &str) -> Document {
        self.service.get_document(id).expect("load document")
    }

    /// Number of files currently in the upload directory.
    pub fn stored_files(&self) -> usize {
        std::fs::read_dir(self.upload_dir())
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

pub struct HarnessBuilder {
    text: String,
    worker_count: usize,
    max_upload_bytes: Option<u64>,
    settings: OcrSettings,
    rasterizer: Option<Arc<dyn PageRasterizer>>,
}

impl HarnessBuilder {
    pub fn new() -> Self {
        Self {
            text: SIGNUP_FORM_TEXT.to_string(),
            worker_count: 2,
            max_upload_bytes: None,
            settings: OcrSettings {
                auto_detect_handwriting: false,
                ..OcrSettings::default()
            },
            rasterizer: None,
        }
    }

    /// Text every scripted engine returns unless told otherwise.
    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn worker_count(mut self, count: usize) -> Self {
        self.worker_count = count;
        self
    }

    pub fn max_upload_bytes(mut self, limit: u64) -> Self {
        self.max_upload_bytes = Some(limit);
        self
    }

    pub fn settings(mut self, settings: OcrSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn rasterizer(mut self, rasterizer: Arc<dyn PageRasterizer>) -> Self {
        self.rasterizer = Some(rasterizer);
        self
    }

    pub fn build(self) -> TestHarness {
        let temp_dir = TempDir::new().expect("create temp dir");
        let upload_dir = temp_dir.path().join("uploads");

        let db = Database::open_in_memory().expect("open in-memory database");
        let repo = Arc::new(RecordingRepository::new(SqliteDocumentRepository::new(db)));
        let store = Arc::new(FileStorage::new(&upload_dir));

        let provider = ScriptedProvider::new(&self.text);
        let ocr = Arc::new(OcrService::with_provider(
            self.settings,
            Arc::clone(&provider) as _,
        ));
        let progress = Arc::new(RecordingProgress::default());
        let rasterizer = self
            .rasterizer
            .unwrap_or_else(|| Arc::new(FakeRasterizer::new(1)));

        let mut builder = DocumentService::builder(Arc::clone(&repo) as _, store)
            .ocr(Arc::clone(&ocr))
            .rasterizer(rasterizer)
            .progress(Arc::clone(&progress) as _)
            .worker_count(self.worker_count);
        if let Some(limit) = self.max_upload_bytes {
            builder = builder.max_upload_bytes(limit);
        }
        let service = builder.build().expect("build document service");

        TestHarness {
            temp_dir,
            repo,
            provider,
            ocr,
            progress,
            service,
        }
    }
}

impl Default for HarnessBuilder {
    fn default() -> Self {
        Self::new()
    }
}
