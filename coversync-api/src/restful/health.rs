use serde::{Deserialize, Serialize};

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub actors: usize,
    pub sse_clients: usize,
    /// Position change events lost because the event bus was full
    pub dropped_events: u64,
    /// RFC 3339 timestamp
    pub timestamp: String,
}
