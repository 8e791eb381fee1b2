//! Async host runtime
//!
//! [`spawn_session`] moves a [`Session`] into a tokio task. The task applies
//! commands in arrival order, fires the debounce timer, and runs document
//! service work on the blocking pool so reorders keep flowing while a save
//! is in flight. Loads and manual saves wait for a running auto-save first.
//! When the task stops, a scheduled auto-save is run before it exits.

use std::ops::ControlFlow;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, warn};

use crate::autosave::SaveStatus;
use crate::error::{Error, Result};
use crate::pdf::DocumentService;
use crate::session::{SaveJob, SaveOutcome, Session, Thumbnail};

const COMMAND_BUFFER: usize = 64;

/// Point-in-time view of a running session
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub order: Vec<usize>,
    pub status: SaveStatus,
    pub total_pages: usize,
    pub last_saved: Option<Arc<Vec<u8>>>,
}

enum Command {
    FileLoaded {
        bytes: Vec<u8>,
        reply: oneshot::Sender<Result<usize>>,
    },
    PageDragged {
        from: usize,
        to: usize,
        reply: oneshot::Sender<Result<()>>,
    },
    SaveRequested {
        reply: oneshot::Sender<Result<Arc<Vec<u8>>>>,
    },
    Snapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
    Thumbnails {
        reply: oneshot::Sender<Result<Vec<Thumbnail>>>,
    },
    Settle {
        reply: oneshot::Sender<()>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Cheap, cloneable handle to a running session
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
}

impl SessionHandle {
    pub async fn file_loaded(&self, bytes: Vec<u8>) -> Result<usize> {
        self.request(|reply| Command::FileLoaded { bytes, reply }).await?
    }

    /// Positions are 0-based
    pub async fn page_dragged(&self, from: usize, to: usize) -> Result<()> {
        self.request(|reply| Command::PageDragged { from, to, reply }).await?
    }

    /// Manual export of the current order
    pub async fn save_requested(&self) -> Result<Arc<Vec<u8>>> {
        self.request(|reply| Command::SaveRequested { reply }).await?
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    pub async fn thumbnails(&self) -> Result<Vec<Thumbnail>> {
        self.request(|reply| Command::Thumbnails { reply }).await?
    }

    /// Resolves once no auto-save is scheduled or running
    pub async fn settle(&self) -> Result<()> {
        self.request(|reply| Command::Settle { reply }).await
    }

    /// Save outstanding changes and stop the session task, even while other
    /// handles are alive
    pub async fn shutdown(self) -> Result<()> {
        self.request(|reply| Command::Shutdown { reply }).await
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(make(reply))
            .await
            .map_err(|_| Error::SessionClosed)?;
        response.await.map_err(|_| Error::SessionClosed)
    }
}

/// Run `session` on its own task.
///
/// The task ends when every [`SessionHandle`] is dropped. It finishes a
/// save that is already running, runs any scheduled one, and hands the
/// session back.
pub fn spawn_session<S>(session: Session<S>) -> (SessionHandle, JoinHandle<Session<S>>)
where
    S: DocumentService + Send + Sync + 'static,
    S::Document: Send + Sync + 'static,
{
    let (commands, receiver) = mpsc::channel(COMMAND_BUFFER);
    let task = tokio::spawn(run(session, receiver));
    (SessionHandle { commands }, task)
}

/// A save running on the blocking pool
struct InFlight<D> {
    base: Arc<D>,
    order: Vec<usize>,
    task: JoinHandle<SaveOutcome<D>>,
}

impl<D: Send + Sync + 'static> InFlight<D> {
    fn spawn<S>(job: SaveJob<S>) -> Self
    where
        S: DocumentService<Document = D> + Send + Sync + 'static,
    {
        let (base, order) = job.identity();
        Self {
            base,
            order,
            task: tokio::task::spawn_blocking(move || job.run()),
        }
    }

    async fn finish(&mut self) -> SaveOutcome<D> {
        match (&mut self.task).await {
            Ok(outcome) => outcome,
            Err(e) => SaveOutcome::abandoned(
                Arc::clone(&self.base),
                self.order.clone(),
                Error::General(format!("save task failed: {e}")),
            ),
        }
    }
}

async fn run<S>(mut session: Session<S>, mut commands: mpsc::Receiver<Command>) -> Session<S>
where
    S: DocumentService + Send + Sync + 'static,
    S::Document: Send + Sync + 'static,
{
    let mut in_flight: Option<InFlight<S::Document>> = None;
    let mut settle_waiters: Vec<oneshot::Sender<()>> = Vec::new();

    loop {
        if in_flight.is_none() {
            if let Some(job) = session.poll(Instant::now().into_std()) {
                in_flight = Some(InFlight::spawn(job));
            }
        }
        if in_flight.is_none() && session.is_settled() {
            for waiter in settle_waiters.drain(..) {
                let _ = waiter.send(());
            }
        }

        let deadline = session.next_deadline().map(Instant::from_std);

        tokio::select! {
            command = commands.recv() => match command {
                Some(command) => {
                    let flow = handle(&mut session, &mut in_flight, &mut settle_waiters, command).await;
                    if flow.is_break() {
                        break;
                    }
                }
                None => break,
            },
            outcome = finish_in_flight(&mut in_flight), if in_flight.is_some() => {
                in_flight = None;
                // Failures surface through the status observer
                let _ = session.complete_save(outcome, Instant::now().into_std());
            }
            _ = sleep_until_deadline(deadline), if deadline.is_some() && in_flight.is_none() => {}
        }
    }

    flush(&mut session, &mut in_flight).await;
    debug!("session task stopped");
    session
}

async fn handle<S>(
    session: &mut Session<S>,
    in_flight: &mut Option<InFlight<S::Document>>,
    settle_waiters: &mut Vec<oneshot::Sender<()>>,
    command: Command,
) -> ControlFlow<()>
where
    S: DocumentService + Send + Sync + 'static,
    S::Document: Send + Sync + 'static,
{
    match command {
        Command::FileLoaded { bytes, reply } => {
            drain(session, in_flight).await;
            let job = session.load_job(bytes);
            let result = match tokio::task::spawn_blocking(move || job.run()).await {
                Ok(loaded) => loaded.and_then(|loaded| session.apply_load(loaded)),
                Err(e) => Err(Error::General(format!("load task failed: {e}"))),
            };
            if let Err(e) = &result {
                warn!(error = %e, "load failed");
            }
            let _ = reply.send(result);
        }
        Command::PageDragged { from, to, reply } => {
            let result = session.on_page_dragged_at(from, to, Instant::now().into_std());
            let _ = reply.send(result);
        }
        Command::SaveRequested { reply } => {
            drain(session, in_flight).await;
            let result = match session.begin_manual_save() {
                Ok(job) => {
                    let outcome = InFlight::spawn(job).finish().await;
                    session.complete_save(outcome, Instant::now().into_std())
                }
                Err(e) => Err(e),
            };
            let _ = reply.send(result);
        }
        Command::Snapshot { reply } => {
            let _ = reply.send(SessionSnapshot {
                order: session.current_order(),
                status: session.status(),
                total_pages: session.registry().len(),
                last_saved: session.last_saved(),
            });
        }
        Command::Thumbnails { reply } => {
            let _ = reply.send(session.thumbnails());
        }
        Command::Settle { reply } => settle_waiters.push(reply),
        Command::Shutdown { reply } => {
            flush(session, in_flight).await;
            let _ = reply.send(());
            return ControlFlow::Break(());
        }
    }
    ControlFlow::Continue(())
}

/// Wait for a running save and apply its result
async fn drain<S>(session: &mut Session<S>, in_flight: &mut Option<InFlight<S::Document>>)
where
    S: DocumentService + Send + Sync + 'static,
    S::Document: Send + Sync + 'static,
{
    if let Some(mut save) = in_flight.take() {
        let outcome = save.finish().await;
        let _ = session.complete_save(outcome, Instant::now().into_std());
    }
}

/// Wait for a running save, then run the scheduled one without waiting for its deadline
async fn flush<S>(session: &mut Session<S>, in_flight: &mut Option<InFlight<S::Document>>)
where
    S: DocumentService + Send + Sync + 'static,
    S::Document: Send + Sync + 'static,
{
    drain(session, in_flight).await;
    while let Some(job) = session.flush_pending() {
        debug!(order = ?job.order(), "saving before stop");
        let outcome = InFlight::spawn(job).finish().await;
        let _ = session.complete_save(outcome, Instant::now().into_std());
    }
}

async fn finish_in_flight<D: Send + Sync + 'static>(in_flight: &mut Option<InFlight<D>>) -> SaveOutcome<D> {
    match in_flight.as_mut() {
        Some(save) => save.finish().await,
        None => std::future::pending().await,
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}
