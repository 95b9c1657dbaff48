//! Shared fakes for the session-layer tests.

use std::collections::VecDeque;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::{broadcast, Notify};

use shared::{
    domain::{ContainerId, DatabaseId, ServerId},
    protocol::{ViewCommand, ViewEvent},
};

use crate::{
    cancel::CancellationToken,
    connection::ConnectionDescriptor,
    driver::{DocumentStoreDriver, DriverError, QueryOptions, QueryPage},
    HostNotifier, NewDocumentEditor, QueryViewSurface, SurfaceFactory, SurfaceOptions,
};

pub(crate) fn descriptor(container: &str) -> ConnectionDescriptor {
    ConnectionDescriptor {
        server: ServerId::new("https://acct.example.net:443/"),
        database: DatabaseId::new("orders"),
        container: ContainerId::new(container),
        auth_key: "test-master-key".to_string(),
        is_emulator: true,
    }
}

pub(crate) struct FakeSurface {
    commands: Mutex<Vec<ViewCommand>>,
    events: broadcast::Sender<ViewEvent>,
    reveal_count: AtomicUsize,
    dispose_count: AtomicUsize,
}

impl FakeSurface {
    pub(crate) fn new() -> Arc<Self> {
        let (events, _) = broadcast::channel(64);
        Arc::new(Self {
            commands: Mutex::new(Vec::new()),
            events,
            reveal_count: AtomicUsize::new(0),
            dispose_count: AtomicUsize::new(0),
        })
    }

    /// Simulates the view emitting an event across the isolation boundary.
    pub(crate) fn emit(&self, event: ViewEvent) {
        let _ = self.events.send(event);
    }

    pub(crate) fn command_log(&self) -> Vec<ViewCommand> {
        self.commands.lock().expect("commands lock").clone()
    }

    pub(crate) fn reveal_count(&self) -> usize {
        self.reveal_count.load(Ordering::SeqCst)
    }

    pub(crate) fn dispose_count(&self) -> usize {
        self.dispose_count.load(Ordering::SeqCst)
    }
}

impl QueryViewSurface for FakeSurface {
    fn send_command(&self, command: ViewCommand) -> Result<()> {
        self.commands.lock().expect("commands lock").push(command);
        Ok(())
    }

    fn subscribe_events(&self) -> broadcast::Receiver<ViewEvent> {
        self.events.subscribe()
    }

    fn reveal(&self) {
        self.reveal_count.fetch_add(1, Ordering::SeqCst);
    }

    fn dispose(&self) {
        self.dispose_count.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub(crate) struct FakeSurfaceFactory {
    created: Mutex<Vec<Arc<FakeSurface>>>,
}

impl FakeSurfaceFactory {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn created_count(&self) -> usize {
        self.created.lock().expect("created lock").len()
    }

    pub(crate) fn surface(&self, index: usize) -> Arc<FakeSurface> {
        Arc::clone(&self.created.lock().expect("created lock")[index])
    }
}

impl SurfaceFactory for FakeSurfaceFactory {
    fn create_surface(&self, _options: SurfaceOptions) -> Result<Arc<dyn QueryViewSurface>> {
        let surface = FakeSurface::new();
        self.created
            .lock()
            .expect("created lock")
            .push(Arc::clone(&surface));
        Ok(surface)
    }
}

/// Driver that serves a scripted sequence of pages. With a gate installed it
/// parks inside the call until notified, which lets tests cancel or dispose
/// mid-flight deterministically.
pub(crate) struct ScriptedDriver {
    pages: Mutex<VecDeque<Result<QueryPage, DriverError>>>,
    gate: Option<Arc<Notify>>,
}

impl ScriptedDriver {
    pub(crate) fn new(pages: Vec<Result<QueryPage, DriverError>>) -> Self {
        Self {
            pages: Mutex::new(pages.into_iter().collect()),
            gate: None,
        }
    }

    pub(crate) fn gated(pages: Vec<Result<QueryPage, DriverError>>, gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new(pages)
        }
    }
}

#[async_trait]
impl DocumentStoreDriver for ScriptedDriver {
    async fn query_documents(
        &self,
        _connection: &ConnectionDescriptor,
        _query_text: &str,
        _options: QueryOptions,
        cancel: &CancellationToken,
    ) -> Result<QueryPage, DriverError> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
            if cancel.is_cancelled() {
                return Err(DriverError::Aborted);
            }
        }

        self.pages
            .lock()
            .expect("pages lock")
            .pop_front()
            .unwrap_or_else(|| Ok(QueryPage::default()))
    }
}

#[derive(Default)]
pub(crate) struct CollectingNotifier {
    infos: Mutex<Vec<String>>,
    warnings: Mutex<Vec<String>>,
    errors: Mutex<Vec<String>>,
    status_updates: Mutex<Vec<Option<String>>>,
}

impl CollectingNotifier {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn infos(&self) -> Vec<String> {
        self.infos.lock().expect("infos lock").clone()
    }

    pub(crate) fn warnings(&self) -> Vec<String> {
        self.warnings.lock().expect("warnings lock").clone()
    }

    pub(crate) fn errors(&self) -> Vec<String> {
        self.errors.lock().expect("errors lock").clone()
    }

    /// `Some(text)` for a status shown, `None` for a clear.
    pub(crate) fn status_updates(&self) -> Vec<Option<String>> {
        self.status_updates.lock().expect("status lock").clone()
    }
}

impl HostNotifier for CollectingNotifier {
    fn info(&self, message: &str) {
        self.infos.lock().expect("infos lock").push(message.to_string());
    }

    fn warn(&self, message: &str) {
        self.warnings
            .lock()
            .expect("warnings lock")
            .push(message.to_string());
    }

    fn error(&self, message: &str) {
        self.errors
            .lock()
            .expect("errors lock")
            .push(message.to_string());
    }

    fn show_status(&self, text: &str) {
        self.status_updates
            .lock()
            .expect("status lock")
            .push(Some(text.to_string()));
    }

    fn clear_status(&self) {
        self.status_updates.lock().expect("status lock").push(None);
    }
}

#[derive(Default)]
pub(crate) struct RecordingDocumentEditor {
    opened_for: Mutex<Vec<String>>,
}

impl RecordingDocumentEditor {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn opened_for(&self) -> Vec<String> {
        self.opened_for.lock().expect("opened lock").clone()
    }
}

#[async_trait]
impl NewDocumentEditor for RecordingDocumentEditor {
    async fn open_new_document(&self, target: &ConnectionDescriptor) -> Result<()> {
        self.opened_for
            .lock()
            .expect("opened lock")
            .push(target.container.to_string());
        Ok(())
    }
}

/// Polls until `condition` holds; spawned session work has no completion
/// handle to await, so tests observe its effects instead.
pub(crate) async fn wait_until<F>(what: &str, condition: F)
where
    F: Fn() -> bool,
{
    for _ in 0..400 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for {what}");
}
