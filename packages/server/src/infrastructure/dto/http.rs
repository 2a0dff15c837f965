//! HTTP API response DTOs.

use serde::{Deserialize, Serialize};

/// One entry of `GET /api/rooms`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSummaryDto {
    pub name: String,
    pub viewers: usize,
    /// RFC 3339 creation time.
    pub created_at: String,
}
