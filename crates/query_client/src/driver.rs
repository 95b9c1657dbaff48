use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use shared::protocol::QueryMetrics;

use crate::{cancel::CancellationToken, connection::ConnectionDescriptor};

/// One page of results from the document store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryPage {
    pub documents: Vec<Value>,
    /// Present when the store has more results beyond this page.
    pub continuation_token: Option<String>,
    pub metrics: Option<QueryMetrics>,
}

#[derive(Debug, Clone)]
pub struct QueryOptions {
    pub max_item_count: u32,
    pub populate_metrics: bool,
    /// Cursor from the previous page when continuing an infinite-paging
    /// query; `None` starts from the beginning.
    pub continuation_token: Option<String>,
}

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("query rejected: {0}")]
    Query(String),
    /// The driver observed the cancellation token and abandoned the request.
    #[error("query aborted")]
    Aborted,
}

/// Narrow seam in front of the document database driver. The driver owns its
/// transport and auth handling; this layer hands it a connection descriptor,
/// the query text, paging options, and a cancellation token to honor
/// mid-flight.
#[async_trait]
pub trait DocumentStoreDriver: Send + Sync {
    async fn query_documents(
        &self,
        connection: &ConnectionDescriptor,
        query_text: &str,
        options: QueryOptions,
        cancel: &CancellationToken,
    ) -> Result<QueryPage, DriverError>;
}

/// Placeholder for embeddings constructed without a database backend.
pub struct MissingDocumentStoreDriver;

#[async_trait]
impl DocumentStoreDriver for MissingDocumentStoreDriver {
    async fn query_documents(
        &self,
        connection: &ConnectionDescriptor,
        _query_text: &str,
        _options: QueryOptions,
        _cancel: &CancellationToken,
    ) -> Result<QueryPage, DriverError> {
        Err(DriverError::Transport(format!(
            "no document store driver configured for {}",
            connection.session_key()
        )))
    }
}
