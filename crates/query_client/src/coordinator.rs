use std::sync::Arc;

use shared::{
    domain::{PagingMode, SessionKey},
    error::SessionError,
    protocol::{QueryResultPayload, UserQuery},
};

use crate::{
    cache::{CachedResultSet, ResultPageCache},
    cancel::CancellationToken,
    config::Settings,
    connection::ConnectionDescriptor,
    driver::{DocumentStoreDriver, DriverError, QueryOptions},
};

/// Result of one query execution, as a value. Failures never cross the
/// session boundary as errors: the UI transport is not an error channel, so
/// the session reports failures through the host notifier instead.
#[derive(Debug, PartialEq)]
pub enum QueryOutcome {
    Completed(QueryResultPayload),
    Cancelled,
    Failed(SessionError),
}

/// Runs submitted queries against the driver and keeps the result page cache
/// coherent with the paging directive. The coordinator is the cache's only
/// writer; the session state machine guarantees at most one execution per key
/// at a time, so merges for a key never interleave.
pub struct QueryCoordinator {
    driver: Arc<dyn DocumentStoreDriver>,
    cache: Arc<ResultPageCache>,
    settings: Settings,
}

impl QueryCoordinator {
    pub fn new(
        driver: Arc<dyn DocumentStoreDriver>,
        cache: Arc<ResultPageCache>,
        settings: Settings,
    ) -> Self {
        Self {
            driver,
            cache,
            settings,
        }
    }

    pub async fn execute(
        &self,
        key: &SessionKey,
        connection: &ConnectionDescriptor,
        submission: &UserQuery,
        cancel: &CancellationToken,
    ) -> QueryOutcome {
        if !connection.has_resolvable_target() {
            return QueryOutcome::Failed(SessionError::MissingTarget);
        }

        let options = QueryOptions {
            max_item_count: self.settings.max_item_count,
            populate_metrics: self.settings.populate_query_metrics,
            continuation_token: submission.paging_info.continuation_token.clone(),
        };

        let page = match self
            .driver
            .query_documents(connection, &submission.query, options, cancel)
            .await
        {
            Ok(page) => page,
            Err(DriverError::Aborted) => return QueryOutcome::Cancelled,
            Err(err) => {
                return QueryOutcome::Failed(SessionError::QueryExecution(err.to_string()))
            }
        };

        if cancel.is_cancelled() {
            // the token tripped while the page was in flight; drop the page
            // without touching the cache
            return QueryOutcome::Cancelled;
        }

        let payload = match submission.paging_info.kind {
            PagingMode::OneShot => QueryResultPayload {
                documents: page.documents,
                continuation_token: page.continuation_token,
                metrics: page.metrics,
            },
            PagingMode::Infinite => {
                // continuing a paged query appends to what the view has
                // already accumulated; a fresh submission starts over
                let mut documents = if submission.paging_info.continuation_token.is_some() {
                    self.cache
                        .get(key)
                        .await
                        .map(|entry| entry.documents)
                        .unwrap_or_default()
                } else {
                    Vec::new()
                };
                documents.extend(page.documents);

                self.cache
                    .set(
                        key.clone(),
                        CachedResultSet {
                            documents: documents.clone(),
                            continuation_token: page.continuation_token.clone(),
                        },
                    )
                    .await;

                QueryResultPayload {
                    documents,
                    continuation_token: page.continuation_token,
                    metrics: page.metrics,
                }
            }
        };

        QueryOutcome::Completed(payload)
    }
}
