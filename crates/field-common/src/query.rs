//! Request/response query interface to the simulation backend.
//!
//! The engine never writes through this interface; it only loads snapshots,
//! per-index frames and profile lookups.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{FieldError, FieldResult};

/// Initial field snapshot load.
pub const OP_FIELD_SNAPSHOT: &str = "field_snapshot";
/// Per-index scalar frame load.
pub const OP_SCALAR_FRAME: &str = "scalar_frame";
/// Per-index vector frame load.
pub const OP_VECTOR_FRAME: &str = "vector_frame";
/// Polygon / profile lookup.
pub const OP_PROFILE_LOOKUP: &str = "profile_lookup";

/// Response envelope: `{"status":"ok","content":...}` or `{"status":"error","message":...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QueryResponse {
    Ok {
        #[serde(default)]
        content: Value,
    },
    Error {
        #[serde(default)]
        message: String,
    },
}

impl QueryResponse {
    pub fn ok(content: Value) -> Self {
        Self::Ok { content }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Unwrap the content, mapping a backend error to `FieldError::Query`.
    pub fn into_content(self, operation: &str) -> FieldResult<Value> {
        match self {
            QueryResponse::Ok { content } => Ok(content),
            QueryResponse::Error { message } => Err(FieldError::query(operation, message)),
        }
    }

    /// Unwrap and deserialize the content.
    pub fn into_typed<T: serde::de::DeserializeOwned>(self, operation: &str) -> FieldResult<T> {
        let content = self.into_content(operation)?;
        Ok(serde_json::from_value(content)?)
    }
}

/// The single request/response function the engine consumes.
#[async_trait]
pub trait QueryClient: Send + Sync {
    async fn query(&self, operation: &str, payload: Value) -> FieldResult<QueryResponse>;
}
