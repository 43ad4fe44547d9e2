//! Test doubles for the service's seams.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crossbeam_channel::{unbounded, Receiver, Sender};
use image::GrayImage;

use scanform::document::NewFieldMapping;
use scanform::ocr::{EngineProvider, EngineSet, OcrSettings};
use scanform::processor::{PageRasterizer, RasterPages};
use scanform::{
    DatabaseError, Document, DocumentRepository, EngineType, FieldMapping, OcrEngine, OcrError,
    Page, PageRequest, ProcessError, ProcessingStatus, ProgressEvent, ProgressReporter,
    SqliteDocumentRepository,
};

use super::builders::PageImageBuilder;

/// Shared script for one fake engine. Queued responses are used first,
/// then the default text.
pub struct EngineScript {
    kind: EngineType,
    available: AtomicBool,
    failing: AtomicBool,
    confidence: AtomicU8,
    default_text: Mutex<String>,
    queued: Mutex<VecDeque<String>>,
    gate: Mutex<Option<Receiver<()>>>,
    calls: AtomicUsize,
}

impl EngineScript {
    pub fn new(kind: EngineType, text: &str) -> Arc<Self> {
        Arc::new(Self {
            kind,
            available: AtomicBool::new(true),
            failing: AtomicBool::new(false),
            confidence: AtomicU8::new(90),
            default_text: Mutex::new(text.to_string()),
            queued: Mutex::new(VecDeque::new()),
            gate: Mutex::new(None),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_confidence(&self, confidence: u8) {
        self.confidence.store(confidence, Ordering::SeqCst);
    }

    pub fn set_text(&self, text: &str) {
        *self.default_text.lock().unwrap() = text.to_string();
    }

    pub fn queue(&self, texts: &[&str]) {
        let mut queued = self.queued.lock().unwrap();
        queued.extend(texts.iter().map(|t| t.to_string()));
    }

    /// Blocks the next extraction until the returned sender fires or is
    /// dropped.
    pub fn hold(&self) -> Sender<()> {
        let (release, gate) = unbounded();
        *self.gate.lock().unwrap() = Some(gate);
        release
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_text(&self) -> Result<String, OcrError> {
        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.recv();
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(OcrError::EngineFailed {
                engine: self.kind,
                message: "scripted failure".to_string(),
            });
        }
        if let Some(text) = self.queued.lock().unwrap().pop_front() {
            return Ok(text);
        }
        Ok(self.default_text.lock().unwrap().clone())
    }
}

struct ScriptedEngine {
    script: Arc<EngineScript>,
}

impl OcrEngine for ScriptedEngine {
    fn engine_type(&self) -> EngineType {
        self.script.kind
    }

    fn is_available(&self) -> bool {
        self.script.available.load(Ordering::SeqCst)
    }

    fn extract_text(&self, _image: &GrayImage) -> Result<String, OcrError> {
        self.script.next_text()
    }

    fn confidence(&self) -> u8 {
        self.script.confidence.load(Ordering::SeqCst)
    }
}

/// Hands out scripted engines and records the local language tag each
/// time a set is built.
pub struct ScriptedProvider {
    pub local: Arc<EngineScript>,
    pub remote: Arc<EngineScript>,
    sessions: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new(local_text: &str) -> Arc<Self> {
        let remote = EngineScript::new(EngineType::Remote, local_text);
        remote.set_available(false);
        Arc::new(Self {
            local: EngineScript::new(EngineType::Local, local_text),
            remote,
            sessions: Mutex::new(Vec::new()),
        })
    }

    /// Local language tags, one per session opened so far.
    pub fn session_languages(&self) -> Vec<String> {
        self.sessions.lock().unwrap().clone()
    }
}

impl EngineProvider for ScriptedProvider {
    fn engines(&self, settings: &OcrSettings) -> EngineSet {
        self.sessions
            .lock()
            .unwrap()
            .push(settings.local_language_tag());
        EngineSet {
            local: Box::new(ScriptedEngine {
                script: Arc::clone(&self.local),
            }),
            remote: Box::new(ScriptedEngine {
                script: Arc::clone(&self.remote),
            }),
        }
    }
}

/// Rasterizer that reports a fixed page count and renders blank forms.
pub struct FakeRasterizer {
    pages: usize,
    fail_on_page: Option<u32>,
    opened: AtomicUsize,
    rendered: Mutex<Vec<(u32, u32)>>,
}

impl FakeRasterizer {
    pub fn new(pages: usize) -> Self {
        Self {
            pages,
            fail_on_page: None,
            opened: AtomicUsize::new(0),
            rendered: Mutex::new(Vec::new()),
        }
    }

    /// Number of PDFs opened so far.
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn failing_on(mut self, page: u32) -> Self {
        self.fail_on_page = Some(page);
        self
    }

    /// `(page, dpi)` for every render call.
    pub fn rendered(&self) -> Vec<(u32, u32)> {
        self.rendered.lock().unwrap().clone()
    }
}

impl PageRasterizer for FakeRasterizer {
    fn open<'a>(&'a self, _pdf: &[u8]) -> Result<Box<dyn RasterPages + 'a>, ProcessError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakePages { rasterizer: self }))
    }
}

struct FakePages<'a> {
    rasterizer: &'a FakeRasterizer,
}

impl RasterPages for FakePages<'_> {
    fn page_count(&self) -> usize {
        self.rasterizer.pages
    }

    fn render_page(&self, page: u32, dpi: u32) -> Result<Vec<u8>, ProcessError> {
        self.rasterizer.rendered.lock().unwrap().push((page, dpi));
        if self.rasterizer.fail_on_page == Some(page) {
            return Err(ProcessError::PageRender {
                page,
                reason: "scripted render failure".to_string(),
            });
        }
        Ok(PageImageBuilder::new().png())
    }
}

/// Collects every progress event.
#[derive(Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingProgress {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Checkpoint values reported for one document, in order.
    pub fn checkpoints(&self, document_id: &str) -> Vec<u8> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ProgressEvent::Checkpoint {
                    document_id: id,
                    progress,
                    ..
                } if id == document_id => Some(progress),
                _ => None,
            })
            .collect()
    }
}

impl ProgressReporter for RecordingProgress {
    fn report(&self, event: ProgressEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// A persisted write as seen by the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateWrite {
    pub document_id: String,
    pub status: ProcessingStatus,
    pub progress: u8,
}

/// SQLite repository that records every state write and can be told to
/// reject inserts.
pub struct RecordingRepository {
    inner: SqliteDocumentRepository,
    writes: Mutex<Vec<StateWrite>>,
    reject_inserts: AtomicBool,
}

impl RecordingRepository {
    pub fn new(inner: SqliteDocumentRepository) -> Self {
        Self {
            inner,
            writes: Mutex::new(Vec::new()),
            reject_inserts: AtomicBool::new(false),
        }
    }

    pub fn reject_inserts(&self, reject: bool) {
        self.reject_inserts.store(reject, Ordering::SeqCst);
    }

    pub fn writes_for(&self, document_id: &str) -> Vec<StateWrite> {
        self.writes
            .lock()
            .unwrap()
            .iter()
            .filter(|w| w.document_id == document_id)
            .cloned()
            .collect()
    }

    fn record(&self, doc: &Document) {
        self.writes.lock().unwrap().push(StateWrite {
            document_id: doc.id.clone(),
            status: doc.status,
            progress: doc.progress,
        });
    }
}

impl DocumentRepository for RecordingRepository {
    fn insert(&self, doc: &Document) -> Result<(), DatabaseError> {
        if self.reject_inserts.load(Ordering::SeqCst) {
            return Err(DatabaseError::Sqlite(rusqlite::Error::InvalidQuery));
        }
        self.inner.insert(doc)
    }

    fn find_by_id(&self, id: &str) -> Result<Option<Document>, DatabaseError> {
        self.inner.find_by_id(id)
    }

    fn save(&self, doc: &Document) -> Result<(), DatabaseError> {
        self.inner.save(doc)?;
        self.record(doc);
        Ok(())
    }

    fn complete(&self, doc: &Document, mappings: &[NewFieldMapping]) -> Result<(), DatabaseError> {
        self.inner.complete(doc, mappings)?;
        self.record(doc);
        Ok(())
    }

    fn find_by_status(&self, status: ProcessingStatus) -> Result<Vec<Document>, DatabaseError> {
        self.inner.find_by_status(status)
    }

    fn find_page(&self, request: &PageRequest) -> Result<Page<Document>, DatabaseError> {
        self.inner.find_page(request)
    }

    fn count_by_status(&self, status: ProcessingStatus) -> Result<u64, DatabaseError> {
        self.inner.count_by_status(status)
    }

    fn search_by_filename(&self, fragment: &str) -> Result<Vec<Document>, DatabaseError> {
        self.inner.search_by_filename(fragment)
    }

    fn field_mappings(&self, document_id: &str) -> Result<Vec<FieldMapping>, DatabaseError> {
        self.inner.field_mappings(document_id)
    }

    fn delete(&self, id: &str) -> Result<bool, DatabaseError> {
        self.inner.delete(id)
    }
}
