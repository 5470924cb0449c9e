//! Document-store collaborator.
//!
//! The engine never talks to a store directly. Queries are handed to a
//! [`GraphClient`] as text plus bind variables and come back as a lazy
//! stream of JSON rows.

mod memory;

pub use memory::{MemoryClient, RecordedQuery};

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::Error;

/// Bind variables of one query.
pub type BindVars = BTreeMap<String, serde_json::Value>;

/// Lazy stream of result rows.
pub type RowStream = Box<dyn Iterator<Item = Result<serde_json::Value, ClientError>> + Send>;

/// Classification of a client failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientErrorKind {
    NotFound,
    Conflict,
    UniqueConstraint,
    Syntax,
    Connection,
    Other,
}

impl std::fmt::Display for ClientErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ClientErrorKind::NotFound => "not found",
            ClientErrorKind::Conflict => "conflict",
            ClientErrorKind::UniqueConstraint => "unique constraint violated",
            ClientErrorKind::Syntax => "syntax error",
            ClientErrorKind::Connection => "connection error",
            ClientErrorKind::Other => "error",
        };
        f.write_str(name)
    }
}

/// Failure reported by a client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ClientError {
    pub kind: ClientErrorKind,
    pub message: String,
}

impl ClientError {
    pub fn new(kind: ClientErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ClientErrorKind::NotFound, message)
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ClientErrorKind::NotFound
    }
}

impl From<ClientError> for Error {
    fn from(err: ClientError) -> Self {
        Error::Execution {
            kind: err.kind,
            message: err.message,
        }
    }
}

/// Store-assigned metadata of a written document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMeta {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_key")]
    pub key: String,
    #[serde(rename = "_rev")]
    pub rev: String,
}

/// Executes queries and document writes against a store.
///
/// Collection arguments are physical collection names.
pub trait GraphClient: Send + Sync {
    /// Run a query; rows are produced lazily.
    fn query(&self, text: &str, bind_vars: &BindVars) -> Result<RowStream, ClientError>;

    /// Insert a document, assigning a key when it has none.
    fn insert(
        &self,
        collection: &str,
        document: serde_json::Value,
    ) -> Result<DocumentMeta, ClientError>;

    /// Replace the document stored under `key`.
    fn replace(
        &self,
        collection: &str,
        key: &str,
        document: serde_json::Value,
    ) -> Result<DocumentMeta, ClientError>;

    /// Delete the document stored under `key`.
    fn delete(&self, collection: &str, key: &str) -> Result<(), ClientError>;

    /// Read the document stored under `key`, if any.
    fn get(&self, collection: &str, key: &str) -> Result<Option<serde_json::Value>, ClientError>;

    /// Create `collection` unless it exists.
    fn ensure_collection(&self, collection: &str) -> Result<(), ClientError>;
}

impl<C: GraphClient + ?Sized> GraphClient for Arc<C> {
    fn query(&self, text: &str, bind_vars: &BindVars) -> Result<RowStream, ClientError> {
        (**self).query(text, bind_vars)
    }

    fn insert(
        &self,
        collection: &str,
        document: serde_json::Value,
    ) -> Result<DocumentMeta, ClientError> {
        (**self).insert(collection, document)
    }

    fn replace(
        &self,
        collection: &str,
        key: &str,
        document: serde_json::Value,
    ) -> Result<DocumentMeta, ClientError> {
        (**self).replace(collection, key, document)
    }

    fn delete(&self, collection: &str, key: &str) -> Result<(), ClientError> {
        (**self).delete(collection, key)
    }

    fn get(&self, collection: &str, key: &str) -> Result<Option<serde_json::Value>, ClientError> {
        (**self).get(collection, key)
    }

    fn ensure_collection(&self, collection: &str) -> Result<(), ClientError> {
        (**self).ensure_collection(collection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_conversion() {
        let err: Error = ClientError::not_found("gone").into();
        match err {
            Error::Execution { kind, message } => {
                assert_eq!(kind, ClientErrorKind::NotFound);
                assert_eq!(message, "gone");
            }
            other => panic!("expected Execution, got {:?}", other),
        }
    }

    #[test]
    fn test_client_error_display() {
        let err = ClientError::new(ClientErrorKind::UniqueConstraint, "g_v/a");
        assert_eq!(err.to_string(), "unique constraint violated: g_v/a");
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_document_meta_serde() {
        let meta: DocumentMeta =
            serde_json::from_str(r#"{"_id": "g_v/a", "_key": "a", "_rev": "1"}"#).unwrap();
        assert_eq!(meta.key, "a");
        assert_eq!(meta.id, "g_v/a");
    }
}
