//! Graph configuration.
//!
//! A [`GraphConfig`] names the database and graph, picks the identity scheme
//! and declares which collections hold vertices and edges. It is validated
//! once when a graph handle is opened and read-only afterwards.

use std::collections::BTreeSet;
use std::path::Path;

use docgraph_proto::element::{GRAPH_SEPARATOR, KEY_SEPARATOR};
use docgraph_proto::ElementKind;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Default database name.
pub const DEFAULT_DB_NAME: &str = "_system";

/// Default graph name.
pub const DEFAULT_GRAPH_NAME: &str = "tinkerpop";

/// Default document field holding the element label.
pub const DEFAULT_LABEL_FIELD: &str = "_label";

/// Default vertex collection and label.
pub const DEFAULT_VERTEX_COLLECTION: &str = "vertex";

/// Default edge collection and label.
pub const DEFAULT_EDGE_COLLECTION: &str = "edge";

/// Document fields owned by the store or by the element mapping.
pub const RESERVED_FIELDS: [&str; 7] = ["_id", "_key", "_rev", "_from", "_to", "_meta", "_version"];

/// Logical collection names eligible for one element kind.
pub type CollectionSet = BTreeSet<String>;

/// Identity scheme selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphType {
    /// One vertex and one edge collection; ids are bare keys.
    #[default]
    Simple,
    /// One collection per label; ids are `<label>/<key>`.
    Complex,
}

/// An edge collection with the vertex collections it connects.
///
/// Text form: `knows:[person,dog]->[person]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EdgeDefinition {
    pub collection: String,
    pub from: BTreeSet<String>,
    pub to: BTreeSet<String>,
}

impl EdgeDefinition {
    /// Create an edge definition.
    pub fn new<I, J, S, T>(collection: impl Into<String>, from: I, to: J) -> Self
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            collection: collection.into(),
            from: from.into_iter().map(Into::into).collect(),
            to: to.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse the text form.
    pub fn parse(s: &str) -> Result<Self, Error> {
        let invalid = || Error::InvalidConfig(format!("invalid edge definition: {}", s));

        let (collection, rest) = s.split_once(':').ok_or_else(invalid)?;
        let (from, to) = rest.split_once("->").ok_or_else(invalid)?;
        let collection = collection.trim();
        if collection.is_empty() {
            return Err(invalid());
        }

        let from = parse_bracket_list(from).ok_or_else(invalid)?;
        let to = parse_bracket_list(to).ok_or_else(invalid)?;
        if from.is_empty() || to.is_empty() {
            return Err(invalid());
        }

        Ok(Self {
            collection: collection.to_string(),
            from,
            to,
        })
    }
}

fn parse_bracket_list(s: &str) -> Option<BTreeSet<String>> {
    let inner = s.trim().strip_prefix('[')?.strip_suffix(']')?;
    Some(
        inner
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect(),
    )
}

impl TryFrom<String> for EdgeDefinition {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        EdgeDefinition::parse(&s)
    }
}

impl From<EdgeDefinition> for String {
    fn from(def: EdgeDefinition) -> Self {
        def.to_string()
    }
}

impl std::fmt::Display for EdgeDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let from: Vec<&str> = self.from.iter().map(String::as_str).collect();
        let to: Vec<&str> = self.to.iter().map(String::as_str).collect();
        write!(
            f,
            "{}:[{}]->[{}]",
            self.collection,
            from.join(","),
            to.join(",")
        )
    }
}

/// Static configuration of one graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GraphConfig {
    /// Database holding the graph.
    pub db_name: String,
    /// Graph name; prefixes every physical collection.
    pub graph_name: String,
    /// Identity scheme.
    pub graph_type: GraphType,
    /// Document field holding the element label.
    pub label_field: String,
    /// Vertex collections (logical names).
    pub vertices: BTreeSet<String>,
    /// Edge collections (logical names).
    pub edges: BTreeSet<String>,
    /// Edge definitions; their collections are added on validation.
    pub edge_definitions: Vec<EdgeDefinition>,
    /// Vertex collections not referenced by any edge definition.
    pub orphan_collections: BTreeSet<String>,
    /// Whether missing collections may be created by the client.
    pub enable_data_definition: bool,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphConfig {
    /// Create a configuration with defaults and no collections.
    pub fn new() -> Self {
        Self {
            db_name: DEFAULT_DB_NAME.to_string(),
            graph_name: DEFAULT_GRAPH_NAME.to_string(),
            graph_type: GraphType::Simple,
            label_field: DEFAULT_LABEL_FIELD.to_string(),
            vertices: BTreeSet::new(),
            edges: BTreeSet::new(),
            edge_definitions: Vec::new(),
            orphan_collections: BTreeSet::new(),
            enable_data_definition: false,
        }
    }

    /// Load a configuration from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a configuration from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Set the database name.
    pub fn with_db_name(mut self, name: impl Into<String>) -> Self {
        self.db_name = name.into();
        self
    }

    /// Set the graph name.
    pub fn with_graph_name(mut self, name: impl Into<String>) -> Self {
        self.graph_name = name.into();
        self
    }

    /// Set the identity scheme.
    pub fn with_graph_type(mut self, graph_type: GraphType) -> Self {
        self.graph_type = graph_type;
        self
    }

    /// Set the label field.
    pub fn with_label_field(mut self, field: impl Into<String>) -> Self {
        self.label_field = field.into();
        self
    }

    /// Add a vertex collection.
    pub fn with_vertex_collection(mut self, name: impl Into<String>) -> Self {
        self.vertices.insert(name.into());
        self
    }

    /// Add an edge collection.
    pub fn with_edge_collection(mut self, name: impl Into<String>) -> Self {
        self.edges.insert(name.into());
        self
    }

    /// Add an edge definition.
    pub fn add_edge_definition(mut self, def: EdgeDefinition) -> Self {
        self.edge_definitions.push(def);
        self
    }

    /// Add orphan vertex collections.
    pub fn add_orphan_collections<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.orphan_collections
            .extend(names.into_iter().map(Into::into));
        self
    }

    /// Allow the client to create missing collections.
    pub fn with_data_definition(mut self, enabled: bool) -> Self {
        self.enable_data_definition = enabled;
        self
    }

    /// Validate the configuration and fill in derived collections.
    ///
    /// Collections named by edge definitions and orphan lists are merged into
    /// the vertex and edge sets. A simple graph with no collections gets the
    /// default `vertex` and `edge` collections.
    pub fn validate(mut self) -> Result<Self, Error> {
        if self.db_name.trim().is_empty() {
            return Err(Error::InvalidConfig("database name must not be blank".into()));
        }
        if self.graph_name.trim().is_empty() {
            return Err(Error::InvalidConfig("graph name must not be blank".into()));
        }
        if self.label_field.is_empty() {
            return Err(Error::InvalidConfig("label field must not be empty".into()));
        }

        for def in &self.edge_definitions {
            self.edges.insert(def.collection.clone());
            self.vertices.extend(def.from.iter().cloned());
            self.vertices.extend(def.to.iter().cloned());
        }
        self.vertices.extend(self.orphan_collections.iter().cloned());

        if self.graph_type == GraphType::Simple {
            if self.vertices.len() > 1 {
                return Err(Error::InvalidConfig(
                    "simple graph must have at most one vertex collection".into(),
                ));
            }
            if self.edges.len() > 1 {
                return Err(Error::InvalidConfig(
                    "simple graph must have at most one edge collection".into(),
                ));
            }
            if self.vertices.is_empty() {
                self.vertices.insert(DEFAULT_VERTEX_COLLECTION.to_string());
            }
            if self.edges.is_empty() {
                self.edges.insert(DEFAULT_EDGE_COLLECTION.to_string());
            }
            if self.edge_definitions.is_empty() {
                let edge = self.default_collection(ElementKind::Edge);
                let vertex = self.default_collection(ElementKind::Vertex);
                self.edge_definitions
                    .push(EdgeDefinition::new(edge, [vertex.clone()], [vertex]));
            }
        }

        check_name("graph name", &self.graph_name)?;
        for name in self.vertices.iter().chain(self.edges.iter()) {
            check_name("collection name", name)?;
        }

        Ok(self)
    }

    /// Collections eligible for an element kind.
    pub fn collections(&self, kind: ElementKind) -> CollectionSet {
        match kind {
            ElementKind::Vertex => self.vertices.clone(),
            ElementKind::Edge => self.edges.clone(),
        }
    }

    /// Collection used when neither collection nor label is given.
    ///
    /// A simple graph has exactly one collection per kind. A complex graph
    /// falls back to the default label, which must itself be a collection to
    /// be usable.
    pub fn default_collection(&self, kind: ElementKind) -> String {
        let (set, fallback) = match kind {
            ElementKind::Vertex => (&self.vertices, DEFAULT_VERTEX_COLLECTION),
            ElementKind::Edge => (&self.edges, DEFAULT_EDGE_COLLECTION),
        };
        match self.graph_type {
            GraphType::Simple => set
                .iter()
                .next()
                .cloned()
                .unwrap_or_else(|| fallback.to_string()),
            GraphType::Complex => fallback.to_string(),
        }
    }

    /// Physical collection name, `<graph>_<name>`.
    pub fn physical_collection(&self, name: &str) -> String {
        format!("{}{}{}", self.graph_name, GRAPH_SEPARATOR, name)
    }

    /// Reserved document fields, including the label field.
    pub fn reserved_fields(&self) -> Vec<&str> {
        let mut fields: Vec<&str> = RESERVED_FIELDS.to_vec();
        if !fields.contains(&self.label_field.as_str()) {
            fields.push(&self.label_field);
        }
        fields
    }

    /// Whether a property key collides with a reserved field.
    pub fn is_reserved_field(&self, key: &str) -> bool {
        key == self.label_field || RESERVED_FIELDS.contains(&key)
    }
}

fn check_name(what: &str, name: &str) -> Result<(), Error> {
    if name.is_empty() {
        return Err(Error::InvalidConfig(format!("{} must not be empty", what)));
    }
    for c in [GRAPH_SEPARATOR, KEY_SEPARATOR] {
        if name.contains(c) {
            return Err(Error::InvalidConfig(format!(
                "{} ({}) contains invalid character '{}'",
                what, name, c
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = GraphConfig::new();
        assert_eq!(config.db_name, "_system");
        assert_eq!(config.graph_name, "tinkerpop");
        assert_eq!(config.graph_type, GraphType::Simple);
        assert_eq!(config.label_field, "_label");
    }

    #[test]
    fn test_simple_defaults_applied() {
        let config = GraphConfig::new().validate().unwrap();
        assert_eq!(config.collections(ElementKind::Vertex).len(), 1);
        assert!(config.vertices.contains("vertex"));
        assert!(config.edges.contains("edge"));
        assert_eq!(config.edge_definitions[0].to_string(), "edge:[vertex]->[vertex]");
        assert_eq!(config.default_collection(ElementKind::Edge), "edge");
    }

    #[test]
    fn test_simple_rejects_multiple_collections() {
        let result = GraphConfig::new()
            .with_vertex_collection("a")
            .with_vertex_collection("b")
            .validate();
        assert!(matches!(result, Err(Error::InvalidConfig(_))));

        let result = GraphConfig::new()
            .add_edge_definition(EdgeDefinition::new("e", ["a"], ["a"]))
            .add_edge_definition(EdgeDefinition::new("f", ["a"], ["a"]))
            .validate();
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_complex_derives_collections() {
        let config = GraphConfig::new()
            .with_graph_type(GraphType::Complex)
            .add_edge_definition(EdgeDefinition::parse("knows:[person]->[person,dog]").unwrap())
            .add_orphan_collections(["city"])
            .validate()
            .unwrap();

        let vertices: Vec<&str> = config.vertices.iter().map(String::as_str).collect();
        assert_eq!(vertices, vec!["city", "dog", "person"]);
        assert!(config.edges.contains("knows"));
        assert_eq!(config.physical_collection("person"), "tinkerpop_person");
    }

    #[test]
    fn test_rejects_bad_names() {
        assert!(GraphConfig::new().with_db_name("  ").validate().is_err());
        assert!(GraphConfig::new().with_graph_name("").validate().is_err());
        assert!(GraphConfig::new().with_label_field("").validate().is_err());

        let err = GraphConfig::new()
            .with_graph_name("my_graph")
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("my_graph"));

        let err = GraphConfig::new()
            .with_graph_type(GraphType::Complex)
            .with_vertex_collection("a/b")
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("'/'"));
    }

    #[test]
    fn test_edge_definition_parse() {
        let def = EdgeDefinition::parse("e2:[a, b]->[c,d]").unwrap();
        assert_eq!(def.collection, "e2");
        assert!(def.from.contains("a") && def.from.contains("b"));
        assert!(def.to.contains("c") && def.to.contains("d"));
        assert_eq!(def.to_string(), "e2:[a,b]->[c,d]");

        assert!(EdgeDefinition::parse("e2[a]->[b]").is_err());
        assert!(EdgeDefinition::parse("e2:[a]-[b]").is_err());
        assert!(EdgeDefinition::parse("e2:[]->[b]").is_err());
        assert!(EdgeDefinition::parse(":[a]->[b]").is_err());
    }

    #[test]
    fn test_reserved_fields() {
        let config = GraphConfig::new().with_label_field("kind");
        assert!(config.is_reserved_field("_key"));
        assert!(config.is_reserved_field("kind"));
        assert!(!config.is_reserved_field("_label"));
        assert!(!config.is_reserved_field("name"));
        assert_eq!(config.reserved_fields().len(), 8);
    }

    #[test]
    fn test_load_from_json() {
        let json = r#"{
            "graphName": "social",
            "graphType": "complex",
            "edgeDefinitions": ["knows:[person]->[person]"],
            "orphanCollections": ["city"]
        }"#;
        let config = GraphConfig::from_json_str(json).unwrap().validate().unwrap();
        assert_eq!(config.graph_name, "social");
        assert_eq!(config.db_name, "_system");
        assert_eq!(config.graph_type, GraphType::Complex);
        assert!(config.vertices.contains("person"));
        assert!(config.vertices.contains("city"));

        assert!(GraphConfig::from_json_str(r#"{"edgeDefinitions": ["bad"]}"#).is_err());
    }

    #[test]
    fn test_load_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"graphName": "files"}}"#).unwrap();
        let config = GraphConfig::from_path(file.path()).unwrap();
        assert_eq!(config.graph_name, "files");

        assert!(matches!(
            GraphConfig::from_path("/nonexistent/graph.json"),
            Err(Error::Io(_))
        ));
    }
}
