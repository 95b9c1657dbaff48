use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{info, warn};

use shared::{
    domain::{PagingMode, QueryId, SessionKey},
    error::SessionError,
    protocol::{UserQuery, ViewCommand, ViewEvent},
};

use crate::{
    cancel::CancellationToken,
    config::Settings,
    connection::ConnectionDescriptor,
    coordinator::{QueryCoordinator, QueryOutcome},
    HostNotifier, NewDocumentEditor, QueryViewSurface,
};

/// Lifecycle of one view session.
///
/// `Created` until the surface signals ready, `Ready` between queries,
/// `QueryInFlight` while exactly one execution is outstanding, `Disposed`
/// terminal once the surface is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    Ready,
    QueryInFlight,
    Disposed,
}

/// What the event pump should do after a dispatched event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventFlow {
    Continue,
    Disposed,
}

/// Point-in-time view of a session for status listings.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub key: SessionKey,
    pub state: SessionState,
    pub created_at: DateTime<Utc>,
    pub last_query_at: Option<DateTime<Utc>>,
}

struct InFlightQuery {
    id: QueryId,
    cancel: CancellationToken,
}

struct SessionInner {
    state: SessionState,
    in_flight: Option<InFlightQuery>,
    last_query_at: Option<DateTime<Utc>>,
}

/// One live binding between a session key and a UI surface.
///
/// Every event the surface emits funnels through [`handle_event`]; all state
/// transitions go through the single inner lock. Query execution runs on a
/// spawned task so cancel and dispose events stay deliverable while a query
/// is in flight.
///
/// [`handle_event`]: ViewSession::handle_event
pub struct ViewSession {
    key: SessionKey,
    connection: ConnectionDescriptor,
    surface: Arc<dyn QueryViewSurface>,
    coordinator: Arc<QueryCoordinator>,
    notifier: Arc<dyn HostNotifier>,
    documents: Arc<dyn NewDocumentEditor>,
    paging_mode: PagingMode,
    default_query_text: String,
    created_at: DateTime<Utc>,
    inner: Mutex<SessionInner>,
}

impl ViewSession {
    pub(crate) fn new(
        connection: ConnectionDescriptor,
        surface: Arc<dyn QueryViewSurface>,
        coordinator: Arc<QueryCoordinator>,
        notifier: Arc<dyn HostNotifier>,
        documents: Arc<dyn NewDocumentEditor>,
        settings: &Settings,
    ) -> Arc<Self> {
        Arc::new(Self {
            key: connection.session_key(),
            connection,
            surface,
            coordinator,
            notifier,
            documents,
            paging_mode: settings.paging_mode,
            default_query_text: settings.default_query_text.clone(),
            created_at: Utc::now(),
            inner: Mutex::new(SessionInner {
                state: SessionState::Created,
                in_flight: None,
                last_query_at: None,
            }),
        })
    }

    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    /// Bring the surface to the foreground; refocuses an existing tab.
    pub fn reveal(&self) {
        self.surface.reveal();
    }

    pub async fn state(&self) -> SessionState {
        self.inner.lock().await.state
    }

    pub async fn is_disposed(&self) -> bool {
        self.state().await == SessionState::Disposed
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let inner = self.inner.lock().await;
        SessionSnapshot {
            key: self.key.clone(),
            state: inner.state,
            created_at: self.created_at,
            last_query_at: inner.last_query_at,
        }
    }

    /// Single dispatch point for everything the surface sends back.
    pub async fn handle_event(self: &Arc<Self>, event: ViewEvent) -> EventFlow {
        match event {
            ViewEvent::Ready => self.on_ready().await,
            ViewEvent::QuerySubmit(query) => self.on_query_submit(query).await,
            ViewEvent::QueryCancel => self.on_query_cancel().await,
            ViewEvent::CreateNewDocument => self.on_create_new_document().await,
            ViewEvent::Dispose => return self.on_dispose().await,
        }
        EventFlow::Continue
    }

    async fn on_ready(&self) {
        {
            let mut inner = self.inner.lock().await;
            match inner.state {
                SessionState::Created => inner.state = SessionState::Ready,
                SessionState::Disposed => return,
                _ => {
                    warn!("query view for {} signaled ready more than once", self.key);
                    return;
                }
            }
        }

        self.send_or_log(ViewCommand::Initialize {
            connection_id: self.connection.server.clone(),
            database_name: self.connection.database.clone(),
            container_name: self.connection.container.clone(),
            paging_mode: self.paging_mode,
            default_query_text: self.default_query_text.clone(),
        });
        info!("query view ready for {}", self.key);
    }

    async fn on_query_submit(self: &Arc<Self>, query: UserQuery) {
        let (query_id, cancel) = {
            let mut inner = self.inner.lock().await;
            match inner.state {
                SessionState::Ready => {}
                SessionState::QueryInFlight => {
                    // the view disables submission while progress is shown;
                    // getting here means it misbehaved
                    drop(inner);
                    self.notifier
                        .warn(&SessionError::QueryInFlight(self.key.clone()).to_string());
                    return;
                }
                SessionState::Created => {
                    warn!(
                        "query submitted before the view for {} was initialized; ignoring",
                        self.key
                    );
                    return;
                }
                SessionState::Disposed => return,
            }

            let id = QueryId::generate();
            let cancel = CancellationToken::new();
            inner.state = SessionState::QueryInFlight;
            inner.in_flight = Some(InFlightQuery {
                id,
                cancel: cancel.clone(),
            });
            inner.last_query_at = Some(Utc::now());
            (id, cancel)
        };

        info!("query {query_id} submitted for {}", self.key);
        self.notifier.show_status("Running query...");
        self.send_or_log(ViewCommand::SetProgress(true));

        let session = Arc::clone(self);
        tokio::spawn(async move {
            session.run_query(query_id, query, cancel).await;
        });
    }

    async fn run_query(self: Arc<Self>, query_id: QueryId, query: UserQuery, cancel: CancellationToken) {
        let outcome = self
            .coordinator
            .execute(&self.key, &self.connection, &query, &cancel)
            .await;

        {
            let mut inner = self.inner.lock().await;
            let still_current = inner
                .in_flight
                .as_ref()
                .is_some_and(|in_flight| in_flight.id == query_id);
            if !still_current || inner.state == SessionState::Disposed {
                info!(
                    "query {query_id} for {} settled after disposal; dropping the result",
                    self.key
                );
                return;
            }
            inner.in_flight = None;
            inner.state = SessionState::Ready;
        }

        self.notifier.clear_status();
        self.send_or_log(ViewCommand::SetProgress(false));

        match outcome {
            QueryOutcome::Completed(payload) => {
                info!(
                    "query {query_id} for {} returned {} documents",
                    self.key,
                    payload.documents.len()
                );
                self.send_or_log(ViewCommand::QueryResult(payload));
            }
            QueryOutcome::Cancelled => {
                info!("query {query_id} for {} cancelled", self.key);
                self.notifier.info(&SessionError::Cancelled.to_string());
            }
            QueryOutcome::Failed(err) => {
                warn!("query {query_id} for {} failed: {err}", self.key);
                self.notifier.error(&err.to_string());
            }
        }
    }

    async fn on_query_cancel(&self) {
        let cancelled = {
            let inner = self.inner.lock().await;
            inner.in_flight.as_ref().map(|in_flight| {
                in_flight.cancel.cancel();
                in_flight.id
            })
        };

        match cancelled {
            Some(query_id) => {
                info!("cancellation requested for query {query_id} on {}", self.key);
                self.notifier.info("Cancelling the running query");
            }
            None => {
                // a cancel with nothing in flight is a view glitch worth
                // surfacing, not a failure
                warn!("cancel requested for {} with no query in flight", self.key);
                self.notifier.warn("No query is currently running");
            }
        }
    }

    async fn on_create_new_document(&self) {
        if let Err(err) = self.documents.open_new_document(&self.connection).await {
            self.notifier
                .error(&format!("Unable to open a new document editor: {err:#}"));
        }
    }

    async fn on_dispose(&self) -> EventFlow {
        self.teardown().await;
        info!("query view for {} disposed by the surface", self.key);
        EventFlow::Disposed
    }

    /// Terminal transition; idempotent. Cancels in-flight work and releases
    /// the surface handle.
    pub async fn dispose(&self) {
        self.teardown().await;
    }

    async fn teardown(&self) {
        let already_disposed = {
            let mut inner = self.inner.lock().await;
            let already = inner.state == SessionState::Disposed;
            if let Some(in_flight) = inner.in_flight.take() {
                in_flight.cancel.cancel();
            }
            inner.state = SessionState::Disposed;
            already
        };

        if !already_disposed {
            self.notifier.clear_status();
            self.surface.dispose();
        }
    }

    fn send_or_log(&self, command: ViewCommand) {
        if let Err(err) = self.surface.send_command(command) {
            warn!(
                "failed to push a command to the query view for {}: {err:#}",
                self.key
            );
        }
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
