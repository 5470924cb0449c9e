//! Element identities.

use serde::{Deserialize, Serialize};

/// Separator between graph name and collection in physical names.
pub const GRAPH_SEPARATOR: char = '_';

/// Separator between collection and key in document ids.
pub const KEY_SEPARATOR: char = '/';

/// The kind of graph element a document stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Vertex,
    Edge,
}

impl std::fmt::Display for ElementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ElementKind::Vertex => write!(f, "vertex"),
            ElementKind::Edge => write!(f, "edge"),
        }
    }
}

/// Edge direction relative to a vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Out,
    In,
    Both,
}

impl Direction {
    /// The traversal keyword for this direction.
    pub fn keyword(self) -> &'static str {
        match self {
            Direction::Out => "OUTBOUND",
            Direction::In => "INBOUND",
            Direction::Both => "ANY",
        }
    }
}

/// Persistent identity of a graph element.
///
/// The collection is the logical (unprefixed) name. A missing key means the
/// element's collection is known but the store has not assigned a key yet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId {
    /// Graph namespace.
    pub graph: String,
    /// Logical collection name.
    pub collection: String,
    /// Document key, if assigned.
    pub key: Option<String>,
}

impl ElementId {
    /// Create an identity with a key.
    pub fn new(
        graph: impl Into<String>,
        collection: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            graph: graph.into(),
            collection: collection.into(),
            key: Some(key.into()),
        }
    }

    /// Create an identity whose key is not assigned yet.
    pub fn unkeyed(graph: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            graph: graph.into(),
            collection: collection.into(),
            key: None,
        }
    }

    /// Return a copy with the given key.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Physical collection name, `<graph>_<collection>`.
    pub fn physical_collection(&self) -> String {
        format!("{}{}{}", self.graph, GRAPH_SEPARATOR, self.collection)
    }

    /// Persisted document id, `<graph>_<collection>/<key>`.
    pub fn document_id(&self) -> Option<String> {
        self.key
            .as_ref()
            .map(|key| format!("{}{}{}", self.physical_collection(), KEY_SEPARATOR, key))
    }
}

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.document_id() {
            Some(id) => f.write_str(&id),
            None => write!(f, "{}/<unassigned>", self.physical_collection()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_id() {
        let id = ElementId::new("g", "person", "alice");
        assert_eq!(id.physical_collection(), "g_person");
        assert_eq!(id.document_id().as_deref(), Some("g_person/alice"));
        assert_eq!(id.to_string(), "g_person/alice");
    }

    #[test]
    fn test_unkeyed() {
        let id = ElementId::unkeyed("g", "person");
        assert_eq!(id.document_id(), None);
        assert_eq!(id.clone().with_key("k").key.as_deref(), Some("k"));
    }

    #[test]
    fn test_direction_keyword() {
        assert_eq!(Direction::Out.keyword(), "OUTBOUND");
        assert_eq!(Direction::In.keyword(), "INBOUND");
        assert_eq!(Direction::Both.keyword(), "ANY");
    }
}
