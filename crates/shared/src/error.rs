use thiserror::Error;

use crate::domain::SessionKey;

/// Failure taxonomy for the query session layer.
///
/// `Cancelled` marks a normal transition back to ready, not a failure; it
/// exists so outcomes can be matched exhaustively and reported uniformly.
/// `DuplicateSession` guards a registry invariant and is never expected in
/// normal operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("no connected database and container; connect to a container before running queries")]
    MissingTarget,
    #[error("query execution failed: {0}")]
    QueryExecution(String),
    #[error("query was cancelled before completion")]
    Cancelled,
    #[error("a query is already running for {0}")]
    QueryInFlight(SessionKey),
    #[error("registry already holds a live session for {0}")]
    DuplicateSession(SessionKey),
}
