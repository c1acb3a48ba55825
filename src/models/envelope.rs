//! Response wrappers shared by the server and the client.

use serde::{Deserialize, Serialize};

/// Body returned by the reset endpoints: `{"data": [...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataEnvelope<T> {
    /// The freshly restored collection.
    pub data: Vec<T>,
}

impl<T> DataEnvelope<T> {
    /// Wraps a collection.
    #[inline]
    #[must_use]
    pub const fn new(data: Vec<T>) -> Self {
        Self { data }
    }

    /// Unwraps the collection.
    #[inline]
    #[must_use]
    pub fn into_inner(self) -> Vec<T> {
        self.data
    }
}

/// Body returned by `GET /api/health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Always `"ok"` while the server is answering.
    pub status: String,
}

impl HealthStatus {
    /// The healthy status.
    #[inline]
    #[must_use]
    pub fn ok() -> Self {
        Self {
            status: "ok".to_owned(),
        }
    }
}
