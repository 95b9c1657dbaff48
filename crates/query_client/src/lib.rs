//! Query view sessions for a document store.
//!
//! Mediates between a host process (an editor-style extension) and sandboxed
//! UI surfaces that run NoSQL queries: one live surface per (server,
//! database, container) target, a typed command/event protocol across the
//! isolation boundary, result accumulation for infinite paging, and
//! cooperative cancellation of in-flight queries.

pub mod cache;
pub mod cancel;
pub mod config;
pub mod connection;
pub mod coordinator;
pub mod driver;
pub mod registry;
pub mod session;

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use shared::{
    domain::SessionKey,
    error::SessionError,
    protocol::{ViewCommand, ViewEvent},
};

use crate::{
    cache::ResultPageCache,
    config::Settings,
    connection::{ConnectedTargetStore, ConnectionDescriptor},
    coordinator::QueryCoordinator,
    driver::{DocumentStoreDriver, MissingDocumentStoreDriver},
    registry::ViewSessionRegistry,
    session::{EventFlow, SessionSnapshot, ViewSession},
};

/// Handle on one webview-style surface hosting the query view. The host's
/// windowing layer implements this; the session layer only pushes commands,
/// subscribes to events, and releases the handle on teardown.
pub trait QueryViewSurface: Send + Sync {
    /// Fire-and-forget push; the surface delivers commands in send order.
    fn send_command(&self, command: ViewCommand) -> Result<()>;
    fn subscribe_events(&self) -> broadcast::Receiver<ViewEvent>;
    /// Bring the surface to the foreground (focus an existing tab).
    fn reveal(&self);
    /// Release the underlying surface handle. Idempotent.
    fn dispose(&self);
}

#[derive(Debug, Clone)]
pub struct SurfaceOptions {
    pub title: String,
}

pub trait SurfaceFactory: Send + Sync {
    fn create_surface(&self, options: SurfaceOptions) -> Result<Arc<dyn QueryViewSurface>>;
}

/// Host notification and status-line seam. User-facing failures travel
/// through here, never through the view's command channel.
pub trait HostNotifier: Send + Sync {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
    fn show_status(&self, text: &str);
    fn clear_status(&self);
}

/// Fallback notifier that routes everything into the log stream.
pub struct LogNotifier;

impl HostNotifier for LogNotifier {
    fn info(&self, message: &str) {
        info!("{message}");
    }

    fn warn(&self, message: &str) {
        warn!("{message}");
    }

    fn error(&self, message: &str) {
        error!("{message}");
    }

    fn show_status(&self, text: &str) {
        info!("status: {text}");
    }

    fn clear_status(&self) {}
}

/// Seam for the host's document editing: the view can ask for a blank
/// document editor targeting its container, but file handling itself stays
/// outside this crate.
#[async_trait]
pub trait NewDocumentEditor: Send + Sync {
    async fn open_new_document(&self, target: &ConnectionDescriptor) -> Result<()>;
}

pub struct MissingNewDocumentEditor;

#[async_trait]
impl NewDocumentEditor for MissingNewDocumentEditor {
    async fn open_new_document(&self, target: &ConnectionDescriptor) -> Result<()> {
        Err(anyhow::anyhow!(
            "no document editor is available for container {}",
            target.container
        ))
    }
}

/// Top-level owner of the session stores, constructed once at host
/// activation and torn down at deactivation. The registry and the result
/// page cache are plain fields here rather than process-wide globals, so
/// lifecycle and tests stay explicit.
pub struct QuerySessionManager {
    registry: ViewSessionRegistry,
    cache: Arc<ResultPageCache>,
    coordinator: Arc<QueryCoordinator>,
    connected_target: Arc<ConnectedTargetStore>,
    surfaces: Arc<dyn SurfaceFactory>,
    notifier: Arc<dyn HostNotifier>,
    documents: Arc<dyn NewDocumentEditor>,
    settings: Settings,
}

impl QuerySessionManager {
    pub fn new(
        driver: Arc<dyn DocumentStoreDriver>,
        surfaces: Arc<dyn SurfaceFactory>,
        notifier: Arc<dyn HostNotifier>,
        documents: Arc<dyn NewDocumentEditor>,
        connected_target: Arc<ConnectedTargetStore>,
        settings: Settings,
    ) -> Arc<Self> {
        let cache = Arc::new(ResultPageCache::new());
        let coordinator = Arc::new(QueryCoordinator::new(
            driver,
            Arc::clone(&cache),
            settings.clone(),
        ));
        Arc::new(Self {
            registry: ViewSessionRegistry::new(),
            cache,
            coordinator,
            connected_target,
            surfaces,
            notifier,
            documents,
            settings,
        })
    }

    /// Construct with no database backend or document editor; queries fail
    /// with a transport diagnostic until a real driver is wired in.
    pub fn new_without_driver(
        surfaces: Arc<dyn SurfaceFactory>,
        notifier: Arc<dyn HostNotifier>,
        connected_target: Arc<ConnectedTargetStore>,
        settings: Settings,
    ) -> Arc<Self> {
        Self::new(
            Arc::new(MissingDocumentStoreDriver),
            surfaces,
            notifier,
            Arc::new(MissingNewDocumentEditor),
            connected_target,
            settings,
        )
    }

    /// Records the target the user connected to; subsequent
    /// [`open_query_view`] calls resolve against it.
    ///
    /// [`open_query_view`]: QuerySessionManager::open_query_view
    pub async fn connect_target(&self, connection: ConnectionDescriptor) {
        info!("connected to container {}", connection.session_key());
        self.connected_target.set(connection).await;
    }

    /// Opens the query view for the currently connected container, or
    /// refocuses the live one. With no resolvable target this reports
    /// through the notifier and fails; no session is created.
    pub async fn open_query_view(self: &Arc<Self>) -> Result<Arc<ViewSession>> {
        let Some(connection) = self.connected_target.get().await else {
            self.notifier.error(&SessionError::MissingTarget.to_string());
            return Err(SessionError::MissingTarget.into());
        };
        if !connection.has_resolvable_target() {
            self.notifier.error(&SessionError::MissingTarget.to_string());
            return Err(SessionError::MissingTarget.into());
        }

        let key = connection.session_key();
        let session = self
            .registry
            .get_or_create(&key, || self.build_session(connection))
            .await?;
        session.reveal();
        Ok(session)
    }

    fn build_session(self: &Arc<Self>, connection: ConnectionDescriptor) -> Result<Arc<ViewSession>> {
        let key = connection.session_key();
        let surface = self
            .surfaces
            .create_surface(SurfaceOptions {
                title: connection.container.to_string(),
            })
            .with_context(|| format!("failed to create a query view surface for {key}"))?;
        let events = surface.subscribe_events();

        let session = ViewSession::new(
            connection,
            surface,
            Arc::clone(&self.coordinator),
            Arc::clone(&self.notifier),
            Arc::clone(&self.documents),
            &self.settings,
        );
        self.spawn_event_pump(Arc::clone(&session), events);
        info!("created a query view session for {key}");
        Ok(session)
    }

    /// Drains surface events into the session until the surface disposes
    /// itself, then evicts the session and its cached pages.
    fn spawn_event_pump(
        self: &Arc<Self>,
        session: Arc<ViewSession>,
        mut events: broadcast::Receiver<ViewEvent>,
    ) {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        if session.handle_event(event).await == EventFlow::Disposed {
                            manager.evict(session.key()).await;
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(
                            "query view event stream for {} lagged by {missed} events",
                            session.key()
                        );
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        // surface dropped without a dispose event; tear the
                        // session down anyway
                        session.dispose().await;
                        manager.evict(session.key()).await;
                        break;
                    }
                }
            }
        });
    }

    async fn evict(&self, key: &SessionKey) {
        self.registry.remove(key).await;
        // stale pages must not resurface if the view is reopened for this key
        self.cache.invalidate(key).await;
    }

    pub async fn session_count(&self) -> usize {
        self.registry.len().await
    }

    pub async fn session_snapshots(&self) -> Vec<SessionSnapshot> {
        self.registry.snapshots().await
    }

    /// Extension-shutdown teardown: disposes every live session and clears
    /// both stores.
    pub async fn dispose_all(&self) {
        self.registry.dispose_all().await;
        self.cache.clear().await;
        info!("disposed all query view sessions");
    }
}

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
