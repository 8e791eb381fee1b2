//! Document service double shared by the session and host tests
//!
//! Documents are lists of page labels; the serialized form is `FAKE` on the
//! first line followed by one label per line.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};

use tokio::sync::Notify;

use pdf_reorder::pdf::{DocumentService, PageSource, Viewport};
use pdf_reorder::{Error, Result, SaveStatus};

const MAGIC: &str = "FAKE";

#[derive(Debug, Clone, PartialEq)]
pub struct FakeDocument {
    pub pages: Vec<String>,
}

#[derive(Debug, Default)]
pub struct FakeStats {
    pub compose_calls: AtomicUsize,
    pub serialize_calls: AtomicUsize,
    pub fail_saves: AtomicBool,
    /// While true, `compose` blocks
    gate_closed: Mutex<bool>,
    gate: Condvar,
    /// Signalled each time `compose` is entered
    pub compose_started: Notify,
}

impl FakeStats {
    pub fn composes(&self) -> usize {
        self.compose_calls.load(Ordering::SeqCst)
    }

    pub fn serializes(&self) -> usize {
        self.serialize_calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_saves.store(failing, Ordering::SeqCst);
    }

    pub fn close_gate(&self) {
        *self.gate_closed.lock().unwrap() = true;
    }

    pub fn open_gate(&self) {
        *self.gate_closed.lock().unwrap() = false;
        self.gate.notify_all();
    }

    fn wait_at_gate(&self) {
        let closed = self.gate_closed.lock().unwrap();
        let _open = self.gate.wait_while(closed, |closed| *closed).unwrap();
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakeService {
    pub stats: Arc<FakeStats>,
}

impl FakeService {
    pub fn new() -> (Self, Arc<FakeStats>) {
        let service = Self::default();
        let stats = Arc::clone(&service.stats);
        (service, stats)
    }
}

impl DocumentService for FakeService {
    type Document = FakeDocument;

    fn load(&self, bytes: &[u8]) -> Result<FakeDocument> {
        let text = std::str::from_utf8(bytes).map_err(|e| Error::Parse(e.to_string()))?;
        let mut lines = text.lines();
        if lines.next() != Some(MAGIC) {
            return Err(Error::Parse("missing header".to_string()));
        }
        Ok(FakeDocument {
            pages: lines.filter(|l| !l.is_empty()).map(str::to_string).collect(),
        })
    }

    fn page_count(&self, document: &FakeDocument) -> usize {
        document.pages.len()
    }

    fn render_viewport(&self, document: &FakeDocument, page_index: usize, scale: f32) -> Result<Viewport> {
        if page_index >= document.pages.len() {
            return Err(Error::OutOfRange { position: page_index, len: document.pages.len() });
        }
        Ok(Viewport { width: 100.0 * scale, height: 150.0 * scale })
    }

    fn compose(&self, sources: &[PageSource<'_, FakeDocument>]) -> Result<FakeDocument> {
        self.stats.compose_calls.fetch_add(1, Ordering::SeqCst);
        self.stats.compose_started.notify_one();
        self.stats.wait_at_gate();
        if self.stats.fail_saves.load(Ordering::SeqCst) {
            return Err(Error::General("compose refused".to_string()));
        }
        let mut pages = Vec::new();
        for source in sources {
            for &index in &source.pages {
                let page = source.document.pages.get(index).ok_or_else(|| {
                    Error::PageSelection(format!("no page {index}"))
                })?;
                pages.push(page.clone());
            }
        }
        Ok(FakeDocument { pages })
    }

    fn serialize(&self, document: &FakeDocument) -> Result<Vec<u8>> {
        self.stats.serialize_calls.fetch_add(1, Ordering::SeqCst);
        let mut text = String::from(MAGIC);
        for page in &document.pages {
            text.push('\n');
            text.push_str(page);
        }
        Ok(text.into_bytes())
    }
}

/// Serialized fake document with pages `{prefix}-0 .. {prefix}-{pages-1}`
pub fn fake_pdf(prefix: &str, pages: usize) -> Vec<u8> {
    let mut text = String::from(MAGIC);
    for i in 0..pages {
        text.push_str(&format!("\n{prefix}-{i}"));
    }
    text.into_bytes()
}

/// Page labels of serialized fake bytes
pub fn labels(bytes: &[u8]) -> Vec<String> {
    std::str::from_utf8(bytes)
        .unwrap()
        .lines()
        .skip(1)
        .map(str::to_string)
        .collect()
}

pub type StatusLog = Arc<Mutex<Vec<(SaveStatus, Vec<usize>)>>>;

/// Observer that records every status transition
pub fn recording_observer() -> (impl FnMut(SaveStatus, &[usize]) + Send + 'static, StatusLog) {
    let log: StatusLog = Arc::default();
    let sink = Arc::clone(&log);
    let observer = move |status: SaveStatus, order: &[usize]| {
        sink.lock().unwrap().push((status, order.to_vec()));
    };
    (observer, log)
}

pub fn statuses(log: &StatusLog) -> Vec<SaveStatus> {
    log.lock().unwrap().iter().map(|(s, _)| *s).collect()
}
