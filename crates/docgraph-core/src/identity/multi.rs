use docgraph_proto::element::{GRAPH_SEPARATOR, KEY_SEPARATOR};
use docgraph_proto::ElementId;

use super::{validate_id_part, IdentityScheme};
use crate::config::GraphType;
use crate::error::Error;

/// Multi-collection scheme: the traversal id is `<collection>/<key>` and the
/// collection is the element label.
#[derive(Debug, Clone, Copy, Default)]
pub struct MultiCollection;

const LABEL_PLACEHOLDER: &str = "<label>";

impl IdentityScheme for MultiCollection {
    fn graph_type(&self) -> GraphType {
        GraphType::Complex
    }

    fn id_field(&self) -> &'static str {
        "_id"
    }

    fn infer_collection(
        &self,
        collection: Option<&str>,
        label: Option<&str>,
        default: &str,
    ) -> Result<String, Error> {
        match (collection, label) {
            (Some(collection), Some(label)) if collection != label => Err(Error::LabelMismatch {
                label: label.to_string(),
                collection: collection.to_string(),
            }),
            (Some(collection), _) => Ok(collection.to_string()),
            (None, Some(label)) => Ok(label.to_string()),
            (None, None) => Ok(default.to_string()),
        }
    }

    fn validate_label(&self, label: &str) -> Result<(), Error> {
        validate_id_part(label)
    }

    fn validate_id(&self, id: &str, label: Option<&str>) -> Result<(), Error> {
        if id.contains(GRAPH_SEPARATOR) {
            return Err(Error::InvalidId(format!(
                "id ({}) contains invalid character '{}'",
                id, GRAPH_SEPARATOR
            )));
        }

        let prefix = label.unwrap_or(LABEL_PLACEHOLDER);
        let (collection, key) = match id.split_once(KEY_SEPARATOR) {
            Some((collection, key)) if !collection.is_empty() => (collection, key),
            _ => {
                return Err(Error::InvalidId(format!(
                    "id ({}) must start with label prefix {}/",
                    id, prefix
                )))
            }
        };

        if let Some(label) = label {
            if collection != label {
                return Err(Error::LabelMismatch {
                    label: label.to_string(),
                    collection: collection.to_string(),
                });
            }
        }
        if key.is_empty() {
            return Err(Error::InvalidId(format!(
                "id ({}) must have format {}/<key>",
                id, prefix
            )));
        }
        if key.contains(KEY_SEPARATOR) {
            return Err(Error::InvalidId(format!(
                "key ({}) contains invalid character '{}'",
                key, KEY_SEPARATOR
            )));
        }
        Ok(())
    }

    fn encode(&self, id: &ElementId) -> Option<String> {
        id.key
            .as_ref()
            .map(|key| format!("{}{}{}", id.collection, KEY_SEPARATOR, key))
    }

    fn decode(
        &self,
        id: &str,
        label: Option<&str>,
        default: &str,
    ) -> Result<(String, String), Error> {
        self.validate_id(id, label)?;
        let (collection, key) = id
            .split_once(KEY_SEPARATOR)
            .ok_or_else(|| Error::InvalidId(format!("id ({}) has no key", id)))?;
        let collection = self.infer_collection(Some(collection), label, default)?;
        Ok((collection, key.to_string()))
    }
}
