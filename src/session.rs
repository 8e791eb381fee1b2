//! Reorder session: the owned state behind a host UI
//!
//! A [`Session`] owns the working document, the page registry and the
//! auto-save coordinator. Hosts call the `on_*` methods; everything that
//! talks to the document service is also available as a detached job
//! ([`LoadJob`], [`SaveJob`]) so an async host can run it off-thread and
//! hand the result back with [`Session::apply_load`] or
//! [`Session::complete_save`].

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::autosave::{AutoSaveCoordinator, SaveSnapshot, SaveStatus, StatusObserver};
use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::pdf::{DocumentService, PageSource, Viewport};
use crate::preview::PreviewCursor;
use crate::registry::PageRegistry;
use crate::reorder::{apply_drag, PageDrag};

/// One entry of the thumbnail strip
#[derive(Debug, Clone, PartialEq)]
pub struct Thumbnail {
    /// Display position (0-based)
    pub position: usize,
    /// Page identity shown at this position
    pub page: usize,
    /// Label following the display position, e.g. "Page 1"
    pub label: String,
    pub viewport: Viewport,
}

pub struct Session<S: DocumentService> {
    service: Arc<S>,
    config: SessionConfig,
    document: Option<Arc<S::Document>>,
    registry: PageRegistry,
    coordinator: AutoSaveCoordinator,
    preview: PreviewCursor,
    last_saved: Option<Arc<Vec<u8>>>,
}

impl<S: DocumentService> Session<S> {
    pub fn new(service: S, config: SessionConfig) -> Result<Self> {
        config.validate()?;
        let coordinator = AutoSaveCoordinator::new(config.debounce, config.saved_display);
        Ok(Self {
            service: Arc::new(service),
            config,
            document: None,
            registry: PageRegistry::default(),
            coordinator,
            preview: PreviewCursor::default(),
            last_saved: None,
        })
    }

    pub fn set_observer(&mut self, observer: impl StatusObserver + 'static) {
        self.coordinator.set_observer(Box::new(observer));
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// The working document, if a file was loaded
    pub fn document(&self) -> Option<&S::Document> {
        self.document.as_deref()
    }

    pub fn registry(&self) -> &PageRegistry {
        &self.registry
    }

    /// Page identities in display order
    pub fn current_order(&self) -> Vec<usize> {
        self.registry.current_order()
    }

    pub fn status(&self) -> SaveStatus {
        self.coordinator.status()
    }

    pub fn save_snapshot(&self) -> &SaveSnapshot {
        self.coordinator.snapshot()
    }

    /// Bytes of the last successful save
    pub fn last_saved(&self) -> Option<Arc<Vec<u8>>> {
        self.last_saved.clone()
    }

    pub fn is_saving(&self) -> bool {
        self.coordinator.is_saving()
    }

    pub fn is_settled(&self) -> bool {
        self.coordinator.is_settled()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.coordinator.next_deadline()
    }

    /// Load a file and merge it after the pages already present
    pub fn on_file_loaded(&mut self, bytes: &[u8]) -> Result<usize> {
        let loaded = self.load_job(bytes.to_vec()).run()?;
        self.apply_load(loaded)
    }

    /// Detached load for running the service calls elsewhere
    pub fn load_job(&self, bytes: Vec<u8>) -> LoadJob<S> {
        LoadJob {
            service: Arc::clone(&self.service),
            base: self.document.clone(),
            bytes,
        }
    }

    /// Install the result of a [`LoadJob`]
    pub fn apply_load(&mut self, loaded: LoadedDocument<S::Document>) -> Result<usize> {
        let same_base = match (&loaded.base, &self.document) {
            (None, None) => true,
            (Some(base), Some(current)) => Arc::ptr_eq(base, current),
            _ => false,
        };
        if !same_base {
            return Err(Error::General(
                "working document changed while the file was loading".to_string(),
            ));
        }

        if self.document.is_none() {
            self.registry = PageRegistry::initialize(loaded.added)?;
            self.coordinator.set_baseline(self.registry.current_order());
        } else {
            self.registry.append(loaded.added)?;
        }
        self.document = Some(Arc::new(loaded.document));
        self.preview = PreviewCursor::new(self.registry.len());

        info!(added = loaded.added, total = self.registry.len(), "file loaded");
        Ok(loaded.added)
    }

    /// Move the page shown at `from` to `to`
    pub fn on_page_dragged(&mut self, from: usize, to: usize) -> Result<()> {
        self.on_page_dragged_at(from, to, Instant::now())
    }

    pub fn on_page_dragged_at(&mut self, from: usize, to: usize, now: Instant) -> Result<()> {
        if self.document.is_none() {
            return Err(Error::NoDocument);
        }
        match apply_drag(&mut self.registry, PageDrag::new(from, to)) {
            Ok(Some(_)) => {
                let order = self.registry.current_order();
                self.coordinator.notify_change(now, &order);
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(e) => {
                warn!(from, to, error = %e, "reorder ignored");
                Err(e)
            }
        }
    }

    /// Advance the auto-save timers; returns a save to run when one is due
    pub fn poll(&mut self, now: Instant) -> Option<SaveJob<S>> {
        let document = self.document.clone()?;
        let order = self.registry.current_order();
        let order = self.coordinator.poll(now, &order)?;
        debug!(?order, "auto-save due");
        Some(self.save_job(document, order))
    }

    /// Start a scheduled auto-save now instead of at its deadline.
    ///
    /// Skip-if-unchanged still applies. Used when the owner is going away.
    pub fn flush_pending(&mut self) -> Option<SaveJob<S>> {
        let deadline = self.coordinator.pending_deadline()?;
        self.poll(deadline)
    }

    /// Export the current order right away
    pub fn on_save_requested(&mut self) -> Result<Arc<Vec<u8>>> {
        let outcome = self.begin_manual_save()?.run();
        self.complete_save(outcome, Instant::now())
    }

    /// Start a manual save; the returned job must be completed with [`complete_save`](Self::complete_save)
    pub fn begin_manual_save(&mut self) -> Result<SaveJob<S>> {
        let document = self.document.clone().ok_or(Error::NoDocument)?;
        let order = self.registry.current_order();
        self.coordinator.begin_manual(&order)?;
        Ok(self.save_job(document, order))
    }

    fn save_job(&self, document: Arc<S::Document>, order: Vec<usize>) -> SaveJob<S> {
        SaveJob {
            service: Arc::clone(&self.service),
            document,
            order,
            autosave_path: self.config.autosave_path.clone(),
        }
    }

    /// Apply the result of a [`SaveJob`].
    ///
    /// On success the composed document replaces the working document and
    /// the registry is rebased onto it. On failure nothing but the status
    /// changes.
    pub fn complete_save(
        &mut self,
        outcome: SaveOutcome<S::Document>,
        now: Instant,
    ) -> Result<Arc<Vec<u8>>> {
        let installed = outcome.result.and_then(|saved| {
            let current = self.document.as_ref().ok_or(Error::NoDocument)?;
            if !Arc::ptr_eq(current, &outcome.base) {
                return Err(Error::General("working document replaced during save".to_string()).into_save_error());
            }
            let registry = self.registry.rebased(&outcome.order).map_err(Error::into_save_error)?;
            Ok((registry, saved))
        });

        match installed {
            Ok((registry, saved)) => {
                self.registry = registry;
                self.document = Some(Arc::new(saved.document));
                let bytes = Arc::new(saved.bytes);
                self.last_saved = Some(Arc::clone(&bytes));

                let baseline: Vec<usize> = (0..self.registry.len()).collect();
                let current = self.registry.current_order();
                self.coordinator.complete(now, baseline, &current);
                info!(pages = self.registry.len(), bytes = bytes.len(), "saved");
                Ok(bytes)
            }
            Err(e) => {
                warn!(error = %e, "save failed, page order kept");
                let current = self.registry.current_order();
                self.coordinator.fail(&current);
                Err(e)
            }
        }
    }

    /// Thumbnail strip in display order
    pub fn thumbnails(&self) -> Result<Vec<Thumbnail>> {
        let document = self.document.as_deref().ok_or(Error::NoDocument)?;
        let entries = self.registry.entries();
        let pages: Vec<usize> = entries.iter().map(|entry| entry.original_index).collect();
        let viewports = self
            .service
            .render_viewports(document, &pages, self.config.thumbnail_scale)?;

        Ok(entries
            .iter()
            .zip(viewports)
            .map(|(entry, viewport)| Thumbnail {
                position: entry.current_position,
                page: entry.original_index,
                label: format!("Page {}", entry.current_position + 1),
                viewport,
            })
            .collect())
    }

    pub fn preview(&self) -> PreviewCursor {
        self.preview
    }

    /// Move the preview by `delta` pages
    pub fn navigate_preview(&mut self, delta: isize) -> bool {
        self.preview.navigate(delta)
    }

    /// Viewport of the page under the preview cursor
    pub fn preview_viewport(&self) -> Result<Viewport> {
        let document = self.document.as_deref().ok_or(Error::NoDocument)?;
        let position = self.preview.current().saturating_sub(1);
        let entry = self.registry.entry_at(position).ok_or(Error::OutOfRange {
            position,
            len: self.registry.len(),
        })?;
        self.service
            .render_viewport(document, entry.original_index, self.config.preview_scale)
    }
}

/// Service work for loading a file, detached from the session
pub struct LoadJob<S: DocumentService> {
    service: Arc<S>,
    base: Option<Arc<S::Document>>,
    bytes: Vec<u8>,
}

/// A loaded (and, when needed, merged) working document
pub struct LoadedDocument<D> {
    base: Option<Arc<D>>,
    document: D,
    added: usize,
}

impl<S: DocumentService> LoadJob<S> {
    pub fn run(self) -> Result<LoadedDocument<S::Document>> {
        let incoming = self.service.load(&self.bytes)?;
        let added = self.service.page_count(&incoming);
        if added == 0 {
            return Err(Error::InvalidDocument("document has no pages".to_string()));
        }

        let document = match self.base.as_deref() {
            None => incoming,
            Some(current) => {
                let existing = self.service.page_count(current);
                self.service.compose(&[
                    PageSource::all(current, existing),
                    PageSource::all(&incoming, added),
                ])?
            }
        };

        Ok(LoadedDocument {
            base: self.base,
            document,
            added,
        })
    }
}

/// Service work for one save, detached from the session
pub struct SaveJob<S: DocumentService> {
    service: Arc<S>,
    document: Arc<S::Document>,
    order: Vec<usize>,
    autosave_path: Option<PathBuf>,
}

/// Composed document and its serialized bytes
pub struct SavedDocument<D> {
    pub document: D,
    pub bytes: Vec<u8>,
}

/// What a [`SaveJob`] produced, tagged with what it was asked to save
pub struct SaveOutcome<D> {
    base: Arc<D>,
    order: Vec<usize>,
    result: Result<SavedDocument<D>>,
}

impl<D> SaveOutcome<D> {
    /// Outcome for a job that never produced a result
    pub fn abandoned(base: Arc<D>, order: Vec<usize>, error: Error) -> Self {
        Self {
            base,
            order,
            result: Err(error.into_save_error()),
        }
    }

    pub fn order(&self) -> &[usize] {
        &self.order
    }

    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

impl<S: DocumentService> SaveJob<S> {
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Handles needed to report this job with [`SaveOutcome::abandoned`]
    pub fn identity(&self) -> (Arc<S::Document>, Vec<usize>) {
        (Arc::clone(&self.document), self.order.clone())
    }

    pub fn run(self) -> SaveOutcome<S::Document> {
        let result = self.compose_and_serialize().map_err(Error::into_save_error);
        SaveOutcome {
            base: self.document,
            order: self.order,
            result,
        }
    }

    fn compose_and_serialize(&self) -> Result<SavedDocument<S::Document>> {
        let document = self.service.compose(&[PageSource {
            document: &*self.document,
            pages: self.order.clone(),
        }])?;
        let bytes = self.service.serialize(&document)?;
        if let Some(path) = &self.autosave_path {
            std::fs::write(path, &bytes)?;
            debug!(path = %path.display(), "wrote save");
        }
        Ok(SavedDocument { document, bytes })
    }
}
