use docgraph_proto::element::{GRAPH_SEPARATOR, KEY_SEPARATOR};
use docgraph_proto::ElementId;

use super::IdentityScheme;
use crate::config::GraphType;
use crate::error::Error;

/// Single-collection scheme: the traversal id is the document key.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleCollection;

impl IdentityScheme for SingleCollection {
    fn graph_type(&self) -> GraphType {
        GraphType::Simple
    }

    fn id_field(&self) -> &'static str {
        "_key"
    }

    fn infer_collection(
        &self,
        _collection: Option<&str>,
        _label: Option<&str>,
        default: &str,
    ) -> Result<String, Error> {
        Ok(default.to_string())
    }

    fn validate_label(&self, _label: &str) -> Result<(), Error> {
        Ok(())
    }

    fn validate_id(&self, id: &str, _label: Option<&str>) -> Result<(), Error> {
        for c in [KEY_SEPARATOR, GRAPH_SEPARATOR] {
            if id.contains(c) {
                return Err(Error::InvalidId(format!(
                    "id ({}) contains invalid character '{}'",
                    id, c
                )));
            }
        }
        if id.is_empty() {
            return Err(Error::InvalidId("id must not be empty".into()));
        }
        Ok(())
    }

    fn encode(&self, id: &ElementId) -> Option<String> {
        id.key.clone()
    }

    fn decode(
        &self,
        id: &str,
        label: Option<&str>,
        default: &str,
    ) -> Result<(String, String), Error> {
        self.validate_id(id, label)?;
        Ok((self.infer_collection(None, label, default)?, id.to_string()))
    }
}
