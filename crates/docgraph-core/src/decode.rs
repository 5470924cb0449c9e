//! Decoding of result rows.
//!
//! Rows come back as JSON. A document carrying `_key`, `_id`, `_rev` and the
//! label field is a vertex; one that also carries `_from` and `_to` is an
//! edge. Arrays and objects that are not documents are decoded element-wise
//! and anything else becomes a scalar [`Value`].

use std::collections::BTreeMap;

use docgraph_proto::{Edge, Element, ElementId, Row, Value, Vertex};
use serde_json::{Map, Value as Json};

use crate::config::RESERVED_FIELDS;
use crate::error::Error;
use crate::identity::IdFactory;

const META_FIELD: &str = "_meta";

/// Decodes JSON rows into [`Row`]s.
#[derive(Debug, Clone)]
pub struct RowDecoder {
    ids: IdFactory,
    label_field: String,
}

impl RowDecoder {
    pub fn new(ids: IdFactory, label_field: impl Into<String>) -> Self {
        Self {
            ids,
            label_field: label_field.into(),
        }
    }

    /// Decode one row.
    pub fn decode(&self, row: &Json) -> Result<Row, Error> {
        match row {
            Json::Object(fields) if self.is_document(fields) => {
                self.decode_element(fields).map(Row::Element)
            }
            Json::Object(fields) => {
                let mut map = BTreeMap::new();
                for (key, value) in fields {
                    map.insert(key.clone(), self.decode(value)?);
                }
                Ok(Row::Map(map))
            }
            Json::Array(items) => items
                .iter()
                .map(|item| self.decode(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Row::List),
            scalar => Ok(Row::Value(Value::from_json(scalar)?)),
        }
    }

    /// Decode a row that must be an element.
    pub fn decode_element_row(&self, row: &Json) -> Result<Element, Error> {
        match row {
            Json::Object(fields) if self.is_document(fields) => self.decode_element(fields),
            other => Err(Error::Decode(format!("expected a graph element, got {}", other))),
        }
    }

    fn is_document(&self, fields: &Map<String, Json>) -> bool {
        ["_key", "_id", "_rev", self.label_field.as_str()]
            .iter()
            .all(|f| fields.contains_key(*f))
    }

    fn decode_element(&self, fields: &Map<String, Json>) -> Result<Element, Error> {
        let id = self.document_id(fields, "_id")?;
        let label = match fields.get(&self.label_field) {
            Some(Json::String(label)) => label.clone(),
            _ => id.collection.clone(),
        };
        let revision = fields.get("_rev").and_then(Json::as_str).map(str::to_string);
        let properties = self.properties(fields)?;

        if fields.contains_key("_from") && fields.contains_key("_to") {
            return Ok(Element::Edge(Edge {
                from: self.document_id(fields, "_from")?,
                to: self.document_id(fields, "_to")?,
                id,
                label,
                revision,
                properties,
            }));
        }

        Ok(Element::Vertex(Vertex {
            id,
            label,
            revision,
            properties,
            meta: self.meta(fields)?,
        }))
    }

    fn document_id(&self, fields: &Map<String, Json>, field: &str) -> Result<ElementId, Error> {
        let raw = fields
            .get(field)
            .and_then(Json::as_str)
            .ok_or_else(|| Error::Decode(format!("field {} must be a string", field)))?;
        self.ids
            .parse_document_id(raw)
            .map_err(|e| Error::Decode(format!("field {}: {}", field, e)))
    }

    fn properties(&self, fields: &Map<String, Json>) -> Result<BTreeMap<String, Value>, Error> {
        let mut properties = BTreeMap::new();
        for (key, value) in fields {
            if key == &self.label_field || RESERVED_FIELDS.contains(&key.as_str()) {
                continue;
            }
            let value = Value::from_json(value)
                .map_err(|e| Error::Decode(format!("property {}: {}", key, e)))?;
            properties.insert(key.clone(), value);
        }
        Ok(properties)
    }

    fn meta(
        &self,
        fields: &Map<String, Json>,
    ) -> Result<BTreeMap<String, BTreeMap<String, Value>>, Error> {
        let mut meta = BTreeMap::new();
        let Some(raw) = fields.get(META_FIELD) else {
            return Ok(meta);
        };
        let entries = raw
            .as_object()
            .ok_or_else(|| Error::Decode(format!("field {} must be an object", META_FIELD)))?;
        for (property, values) in entries {
            match Value::from_json(values)? {
                Value::Map(map) => {
                    meta.insert(property.clone(), map);
                }
                other => {
                    return Err(Error::Decode(format!(
                        "metadata of {} must be an object, got {}",
                        property,
                        other.type_name()
                    )))
                }
            }
        }
        Ok(meta)
    }
}
