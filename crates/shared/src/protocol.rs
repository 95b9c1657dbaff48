use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{ContainerId, DatabaseId, PagingMode, ServerId};

/// Commands the host pushes into a query view. One-way and fire-and-forget;
/// the surface delivers them in send order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ViewCommand {
    #[serde(rename_all = "camelCase")]
    Initialize {
        connection_id: ServerId,
        database_name: DatabaseId,
        container_name: ContainerId,
        paging_mode: PagingMode,
        default_query_text: String,
    },
    SetProgress(bool),
    QueryResult(QueryResultPayload),
}

/// Events a query view sends back to the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ViewEvent {
    Ready,
    QuerySubmit(UserQuery),
    QueryCancel,
    CreateNewDocument,
    Dispose,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserQuery {
    pub query: String,
    pub paging_info: PagingInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagingInfo {
    pub kind: PagingMode,
    /// Cursor handed back by the view when continuing an infinite-paging
    /// query; absent on a fresh submission.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continuation_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResultPayload {
    /// Accumulated in fetch order when infinite paging is active.
    pub documents: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continuation_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<QueryMetrics>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryMetrics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_charge: Option<f64>,
    pub retrieved_document_count: u64,
    pub execution_time_ms: u64,
    pub fetched_at: DateTime<Utc>,
}
