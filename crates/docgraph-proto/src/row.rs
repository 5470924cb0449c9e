//! Decoded result rows.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::element::{ElementId, ElementKind};
use crate::value::Value;

/// A vertex decoded from a stored document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub id: ElementId,
    pub label: String,
    /// Store revision, if the row carried one.
    pub revision: Option<String>,
    pub properties: BTreeMap<String, Value>,
    /// Per-property metadata, keyed by property name.
    pub meta: BTreeMap<String, BTreeMap<String, Value>>,
}

/// An edge decoded from a stored document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: ElementId,
    pub label: String,
    pub revision: Option<String>,
    pub from: ElementId,
    pub to: ElementId,
    pub properties: BTreeMap<String, Value>,
}

/// A decoded graph element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Element {
    Vertex(Vertex),
    Edge(Edge),
}

impl Element {
    pub fn kind(&self) -> ElementKind {
        match self {
            Element::Vertex(_) => ElementKind::Vertex,
            Element::Edge(_) => ElementKind::Edge,
        }
    }

    pub fn id(&self) -> &ElementId {
        match self {
            Element::Vertex(v) => &v.id,
            Element::Edge(e) => &e.id,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Element::Vertex(v) => &v.label,
            Element::Edge(e) => &e.label,
        }
    }

    pub fn properties(&self) -> &BTreeMap<String, Value> {
        match self {
            Element::Vertex(v) => &v.properties,
            Element::Edge(e) => &e.properties,
        }
    }

    /// Get a property value; `None` when the property is absent.
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties().get(key)
    }
}

/// One row returned by a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Row {
    Element(Element),
    List(Vec<Row>),
    Map(BTreeMap<String, Row>),
    Value(Value),
}

impl Row {
    /// Take the element out of an element row.
    pub fn into_element(self) -> Option<Element> {
        match self {
            Row::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Borrow the scalar value of a value row.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Row::Value(v) => Some(v),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_vertex() -> Vertex {
        let mut properties = BTreeMap::new();
        properties.insert("name".to_string(), Value::from("alice"));
        properties.insert("nick".to_string(), Value::Null);
        Vertex {
            id: ElementId::new("g", "person", "alice"),
            label: "person".into(),
            revision: None,
            properties,
            meta: BTreeMap::new(),
        }
    }

    #[test]
    fn test_element_accessors() {
        let element = Element::Vertex(make_vertex());
        assert_eq!(element.kind(), ElementKind::Vertex);
        assert_eq!(element.label(), "person");
        assert_eq!(element.id().key.as_deref(), Some("alice"));
        assert_eq!(element.property("name"), Some(&Value::from("alice")));
        assert_eq!(element.property("nick"), Some(&Value::Null));
        assert_eq!(element.property("age"), None);
    }

    #[test]
    fn test_row_accessors() {
        let row = Row::Element(Element::Vertex(make_vertex()));
        assert!(row.as_value().is_none());
        assert!(row.into_element().is_some());
        assert_eq!(Row::Value(Value::Int32(1)).as_value(), Some(&Value::Int32(1)));
    }
}
