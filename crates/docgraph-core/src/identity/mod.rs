//! Element identity schemes.
//!
//! Every element is stored as a document whose persisted id is
//! `<graph>_<collection>/<key>`. What the traversal layer sees as the element
//! id depends on the graph type:
//!
//! - [`SingleCollection`]: one vertex and one edge collection, the id is the
//!   bare key.
//! - [`MultiCollection`]: one collection per label, the id is
//!   `<collection>/<key>` and the collection doubles as the label.
//!
//! The scheme is picked once from [`GraphType`] and shared read-only.

mod multi;
mod single;

pub use multi::MultiCollection;
pub use single::SingleCollection;

use std::sync::Arc;

use docgraph_proto::element::{GRAPH_SEPARATOR, KEY_SEPARATOR};
use docgraph_proto::{ElementId, ElementKind, Predicate, Value};

use crate::config::{GraphConfig, GraphType};
use crate::error::Error;

/// Encoding and validation rules for traversal-level ids.
pub trait IdentityScheme: Send + Sync + std::fmt::Debug {
    /// The graph type this scheme implements.
    fn graph_type(&self) -> GraphType;

    /// Document field compared against traversal ids in queries.
    fn id_field(&self) -> &'static str;

    /// Resolve the collection from an explicit collection, a label and the
    /// per-graph default.
    fn infer_collection(
        &self,
        collection: Option<&str>,
        label: Option<&str>,
        default: &str,
    ) -> Result<String, Error>;

    /// Check that a label can be stored under this scheme.
    fn validate_label(&self, label: &str) -> Result<(), Error>;

    /// Check the format of a traversal-level id.
    fn validate_id(&self, id: &str, label: Option<&str>) -> Result<(), Error>;

    /// Traversal-level id of an element; `None` while the key is unassigned.
    fn encode(&self, id: &ElementId) -> Option<String>;

    /// Split a traversal-level id into collection and key.
    fn decode(&self, id: &str, label: Option<&str>, default: &str)
        -> Result<(String, String), Error>;
}

/// The scheme for a graph type.
pub fn scheme_for(graph_type: GraphType) -> Arc<dyn IdentityScheme> {
    match graph_type {
        GraphType::Simple => Arc::new(SingleCollection),
        GraphType::Complex => Arc::new(MultiCollection),
    }
}

/// Check one persisted id part (graph name, collection or key).
pub fn validate_id_part(part: &str) -> Result<(), Error> {
    for c in [GRAPH_SEPARATOR, KEY_SEPARATOR] {
        if part.contains(c) {
            return Err(Error::InvalidId(format!(
                "id part ({}) contains invalid character '{}'",
                part, c
            )));
        }
    }
    Ok(())
}

/// Text of a traversal id given as a string or an integer.
///
/// Integer ids are read as their decimal text, wherever they appear.
pub fn id_text(value: &Value) -> Result<String, Error> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Int32(i) => Ok(i.to_string()),
        Value::Int64(i) => Ok(i.to_string()),
        other => Err(Error::InvalidId(format!(
            "id ({}) must be a string or integer, got {}",
            other,
            other.type_name()
        ))),
    }
}

/// Rewrite integer operands of an id predicate to their decimal text, so the
/// predicate compares against encoded ids.
pub fn id_predicate(predicate: &Predicate) -> Predicate {
    fn operand(value: &Value) -> Value {
        match value {
            Value::Int32(i) => Value::String(i.to_string()),
            Value::Int64(i) => Value::String(i.to_string()),
            Value::List(items) => Value::List(items.iter().map(operand).collect()),
            other => other.clone(),
        }
    }

    match predicate {
        Predicate::And { predicates } => Predicate::And {
            predicates: predicates.iter().map(id_predicate).collect(),
        },
        Predicate::Or { predicates } => Predicate::Or {
            predicates: predicates.iter().map(id_predicate).collect(),
        },
        Predicate::Compare { op, value } => Predicate::Compare {
            op: op.clone(),
            value: operand(value),
        },
    }
}

/// Builds and parses element identities for one graph.
#[derive(Debug, Clone)]
pub struct IdFactory {
    config: Arc<GraphConfig>,
    scheme: Arc<dyn IdentityScheme>,
}

impl IdFactory {
    /// Create a factory using the scheme selected by the configuration.
    pub fn new(config: Arc<GraphConfig>) -> Self {
        let scheme = scheme_for(config.graph_type);
        Self { config, scheme }
    }

    /// The active scheme.
    pub fn scheme(&self) -> &dyn IdentityScheme {
        self.scheme.as_ref()
    }

    /// Build the identity of a new or referenced element.
    ///
    /// With no id, only the collection is resolved and the key is left for
    /// the store to assign.
    pub fn create_id(
        &self,
        kind: ElementKind,
        label: Option<&str>,
        id: Option<&str>,
    ) -> Result<ElementId, Error> {
        let default = self.config.default_collection(kind);
        if let Some(label) = label {
            self.scheme.validate_label(label)?;
        }
        match id {
            Some(id) => {
                let (collection, key) = self.scheme.decode(id, label, &default)?;
                validate_id_part(&collection)?;
                validate_id_part(&key)?;
                Ok(ElementId::new(&self.config.graph_name, collection, key))
            }
            None => {
                let collection = self.scheme.infer_collection(None, label, &default)?;
                validate_id_part(&collection)?;
                Ok(ElementId::unkeyed(&self.config.graph_name, collection))
            }
        }
    }

    /// Parse a traversal-level id.
    pub fn parse_id(&self, kind: ElementKind, id: &str) -> Result<ElementId, Error> {
        self.create_id(kind, None, Some(id))
    }

    /// Parse a persisted document id, `<graph>_<collection>/<key>`.
    pub fn parse_document_id(&self, document_id: &str) -> Result<ElementId, Error> {
        let invalid = || Error::InvalidId(format!("malformed document id ({})", document_id));

        let (physical, key) = document_id.split_once(KEY_SEPARATOR).ok_or_else(invalid)?;
        let collection = physical
            .strip_prefix(self.config.graph_name.as_str())
            .and_then(|rest| rest.strip_prefix(GRAPH_SEPARATOR))
            .ok_or_else(invalid)?;
        if collection.is_empty() || key.is_empty() {
            return Err(invalid());
        }
        validate_id_part(collection)?;
        validate_id_part(key)?;
        Ok(ElementId::new(&self.config.graph_name, collection, key))
    }

    /// Traversal-level id of an element.
    pub fn encode(&self, id: &ElementId) -> Option<String> {
        self.scheme.encode(id)
    }

    /// Value stored in [`IdentityScheme::id_field`] for a traversal id.
    pub fn stored_id(&self, kind: ElementKind, id: &str) -> Result<String, Error> {
        let element_id = self.parse_id(kind, id)?;
        let stored = match self.scheme.graph_type() {
            GraphType::Simple => element_id.key,
            GraphType::Complex => element_id.document_id(),
        };
        stored.ok_or_else(|| Error::InvalidId(format!("id ({}) has no key", id)))
    }
}
