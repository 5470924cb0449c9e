//! Graph variables.
//!
//! Every graph owns one document in [`VARIABLES_COLLECTION`], keyed by the
//! graph name. Its `_version` field records the library version that last
//! opened the graph; every other non-reserved field is a variable.

use std::collections::BTreeMap;

use docgraph_proto::Value;
use regex::Regex;
use serde_json::{Map, Value as Json};

use crate::config::GraphConfig;
use crate::error::Error;

/// Collection holding the variables document of every graph in a database.
pub const VARIABLES_COLLECTION: &str = "TINKERPOP-GRAPH-VARIABLES";

/// Field holding the library version.
pub const VERSION_FIELD: &str = "_version";

/// Version stamped into the variables document on open.
pub const LIBRARY_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Decoded variables document of one graph.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphVariables {
    key: String,
    version: String,
    values: BTreeMap<String, Value>,
}

impl GraphVariables {
    pub fn new(key: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            version: version.into(),
            values: BTreeMap::new(),
        }
    }

    /// Document key, the graph name.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn as_map(&self) -> &BTreeMap<String, Value> {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub(crate) fn set(&mut self, key: String, value: Value) {
        self.values.insert(key, value);
    }

    pub(crate) fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    pub(crate) fn set_version(&mut self, version: impl Into<String>) {
        self.version = version.into();
    }

    /// Decode a stored document, skipping reserved fields.
    pub fn from_document(document: &Json, config: &GraphConfig) -> Result<Self, Error> {
        let fields = document
            .as_object()
            .ok_or_else(|| Error::Decode(format!("variables document is not an object: {}", document)))?;
        let key = string_field(fields, "_key")?;
        let version = string_field(fields, VERSION_FIELD)?;

        let mut variables = Self::new(key, version);
        for (name, value) in fields {
            if !config.is_reserved_field(name) {
                variables.set(name.clone(), Value::from_json(value)?);
            }
        }
        Ok(variables)
    }

    /// Encode as a document for insert or replace.
    pub fn to_document(&self) -> Json {
        let mut fields = Map::new();
        fields.insert("_key".to_string(), Json::String(self.key.clone()));
        fields.insert(VERSION_FIELD.to_string(), Json::String(self.version.clone()));
        for (name, value) in &self.values {
            fields.insert(name.clone(), value.to_json());
        }
        Json::Object(fields)
    }
}

fn string_field(fields: &Map<String, Json>, name: &str) -> Result<String, Error> {
    fields
        .get(name)
        .and_then(Json::as_str)
        .map(str::to_string)
        .ok_or_else(|| Error::Decode(format!("variables document has no string field {}", name)))
}

/// Fail when `stored` was written by a newer library than this one.
pub fn check_version(stored: &str) -> Result<(), Error> {
    if parse_version(stored)? > parse_version(LIBRARY_VERSION)? {
        return Err(Error::IncompatibleVersion {
            stored: stored.to_string(),
            library: LIBRARY_VERSION.to_string(),
        });
    }
    Ok(())
}

/// Leading `major.minor.patch` of a version string.
fn parse_version(version: &str) -> Result<(u64, u64, u64), Error> {
    let invalid = || Error::InvalidVersion(version.to_string());
    let pattern = Regex::new(r"^(0|[1-9]\d*)\.(0|[1-9]\d*)\.(0|[1-9]\d*)")
        .map_err(|e| Error::InvalidVersion(e.to_string()))?;
    let captures = pattern.captures(version).ok_or_else(invalid)?;
    let part = |i: usize| -> Result<u64, Error> {
        captures
            .get(i)
            .and_then(|m| m.as_str().parse().ok())
            .ok_or_else(invalid)
    };
    Ok((part(1)?, part(2)?, part(3)?))
}

/// Check that `value` can be kept as a variable: scalars and lists of them.
pub fn check_variable(key: &str, value: &Value, config: &GraphConfig) -> Result<(), Error> {
    if key.is_empty() {
        return Err(Error::InvalidVariable("key can not be empty".to_string()));
    }
    if config.is_reserved_field(key) {
        return Err(Error::InvalidVariable(format!(
            "key can not be a reserved key: {}",
            key
        )));
    }
    match value {
        Value::Null => Err(Error::InvalidVariable(format!(
            "value of {} can not be null",
            key
        ))),
        Value::List(items) => {
            for item in items {
                if matches!(item, Value::Null | Value::List(_) | Value::Map(_)) {
                    return Err(Error::InvalidVariable(format!(
                        "list value of {} may only hold non-null scalars, got {}",
                        key,
                        item.type_name()
                    )));
                }
            }
            Ok(())
        }
        Value::Map(_) => Err(Error::InvalidVariable(format!(
            "value of {} has unsupported type map",
            key
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> GraphConfig {
        GraphConfig::new().validate().unwrap()
    }

    #[test]
    fn test_document_round_trip() {
        let mut variables = GraphVariables::new("tinkerpop", "0.1.0");
        variables.set("answer".into(), Value::Int32(42));
        variables.set("tags".into(), Value::List(vec![Value::from("a")]));

        let document = variables.to_document();
        assert_eq!(
            document,
            json!({"_key": "tinkerpop", "_version": "0.1.0", "answer": 42, "tags": ["a"]})
        );
        assert_eq!(GraphVariables::from_document(&document, &config()).unwrap(), variables);
    }

    #[test]
    fn test_from_document_skips_reserved_fields() {
        let document = json!({
            "_key": "tinkerpop",
            "_id": "TINKERPOP-GRAPH-VARIABLES/tinkerpop",
            "_rev": "7",
            "_version": "0.0.1",
            "x": "y"
        });
        let variables = GraphVariables::from_document(&document, &config()).unwrap();
        assert_eq!(variables.version(), "0.0.1");
        assert_eq!(variables.keys().collect::<Vec<_>>(), vec!["x"]);
    }

    #[test]
    fn test_from_document_requires_version() {
        let err = GraphVariables::from_document(&json!({"_key": "g"}), &config()).unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn test_check_version() {
        assert!(check_version("0.0.1").is_ok());
        assert!(check_version(LIBRARY_VERSION).is_ok());
        assert!(check_version("0.1.0-SNAPSHOT").is_ok());

        let err = check_version("999.999.999").unwrap_err();
        assert!(matches!(err, Error::IncompatibleVersion { .. }));
        assert!(err
            .to_string()
            .contains("Existing graph has more recent version [999.999.999]"));

        assert!(matches!(check_version("1.x"), Err(Error::InvalidVersion(_))));
        assert!(matches!(check_version("01.0.0"), Err(Error::InvalidVersion(_))));
    }

    #[test]
    fn test_check_variable() {
        let config = config();
        assert!(check_variable("n", &Value::Int64(1), &config).is_ok());
        assert!(check_variable("n", &Value::List(vec![Value::Bool(true)]), &config).is_ok());

        for (key, value) in [
            ("", Value::Int32(1)),
            ("_key", Value::Int32(1)),
            ("_version", Value::Int32(1)),
            ("n", Value::Null),
            ("n", Value::Map(BTreeMap::new())),
            ("n", Value::List(vec![Value::Null])),
        ] {
            let err = check_variable(key, &value, &config).unwrap_err();
            assert!(err.is_validation(), "{}", err);
        }
    }
}
