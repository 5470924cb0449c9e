//! In-memory client.
//!
//! Understands just enough of the generated query shapes to serve tests and
//! local runs: by-id fetches through `DOCUMENT(@ids)`, one-hop neighbor
//! queries, and collection scans. `FILTER` clauses are not evaluated, so a
//! scan returns every document of the named collections.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use serde_json::{json, Map, Value as Json};
use tracing::trace;

use super::{BindVars, ClientError, ClientErrorKind, DocumentMeta, GraphClient, RowStream};

type Collections = BTreeMap<String, BTreeMap<String, Json>>;

/// A query as it was issued.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedQuery {
    pub text: String,
    pub bind_vars: BindVars,
}

/// A [`GraphClient`] backed by in-process maps.
#[derive(Debug, Default)]
pub struct MemoryClient {
    collections: RwLock<Collections>,
    canned: RwLock<BTreeMap<String, Result<Vec<Json>, ClientError>>>,
    queries: Mutex<Vec<RecordedQuery>>,
    next_key: AtomicU64,
    next_rev: AtomicU64,
}

impl MemoryClient {
    /// Create an empty client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer the exact query `text` with `rows`.
    pub fn respond(&self, text: impl Into<String>, rows: Vec<Json>) {
        self.canned.write().insert(text.into(), Ok(rows));
    }

    /// Fail the exact query `text` with `error`.
    pub fn fail(&self, text: impl Into<String>, error: ClientError) {
        self.canned.write().insert(text.into(), Err(error));
    }

    /// Every query issued so far, oldest first.
    pub fn queries(&self) -> Vec<RecordedQuery> {
        self.queries.lock().clone()
    }

    /// Number of queries issued so far.
    pub fn query_count(&self) -> usize {
        self.queries.lock().len()
    }

    /// Forget recorded queries.
    pub fn clear_queries(&self) {
        self.queries.lock().clear();
    }

    /// Look up a stored document.
    pub fn document(&self, collection: &str, key: &str) -> Option<Json> {
        self.collections
            .read()
            .get(collection)
            .and_then(|docs| docs.get(key))
            .cloned()
    }

    /// Number of documents in a collection.
    pub fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .get(collection)
            .map_or(0, BTreeMap::len)
    }

    fn rev(&self) -> String {
        (self.next_rev.fetch_add(1, Ordering::Relaxed) + 1).to_string()
    }

    fn lookup(collections: &Collections, document_id: &str) -> Option<Json> {
        let (collection, key) = document_id.split_once('/')?;
        collections.get(collection)?.get(key).cloned()
    }

    fn by_ids(&self, bind_vars: &BindVars) -> Result<Vec<Json>, ClientError> {
        let ids = string_list(bind_vars, "ids")?;
        let collections = self.collections.read();
        Ok(ids
            .iter()
            .filter_map(|id| Self::lookup(&collections, id))
            .collect())
    }

    fn neighbors(&self, text: &str, bind_vars: &BindVars) -> Result<Vec<Json>, ClientError> {
        let start = bind_vars
            .get("startId")
            .and_then(Json::as_str)
            .ok_or_else(|| syntax("missing bind variable @startId"))?;
        let edge_collections = string_list(bind_vars, "edgeCollections")?;
        let (outbound, inbound) = if text.contains(" OUTBOUND ") {
            (true, false)
        } else if text.contains(" INBOUND ") {
            (false, true)
        } else if text.contains(" ANY ") {
            (true, true)
        } else {
            return Err(syntax("missing traversal direction"));
        };
        let return_edges = text.trim_end().ends_with("RETURN e");

        let collections = self.collections.read();
        let mut rows = Vec::new();
        for name in &edge_collections {
            let Some(edges) = collections.get(name) else {
                continue;
            };
            for edge in edges.values() {
                let from = edge.get("_from").and_then(Json::as_str);
                let to = edge.get("_to").and_then(Json::as_str);
                let other = if outbound && from == Some(start) {
                    to
                } else if inbound && to == Some(start) {
                    from
                } else {
                    None
                };
                let Some(other) = other else {
                    continue;
                };
                if return_edges {
                    rows.push(edge.clone());
                } else if let Some(vertex) = Self::lookup(&collections, other) {
                    rows.push(vertex);
                }
            }
        }
        Ok(rows)
    }

    fn scan(&self, text: &str) -> Result<Vec<Json>, ClientError> {
        let names = scanned_collections(text);
        if names.is_empty() {
            return Err(syntax(format!("unsupported query: {}", text)));
        }
        let collections = self.collections.read();
        Ok(names
            .iter()
            .filter_map(|name| collections.get(name))
            .flat_map(|docs| docs.values().cloned())
            .collect())
    }
}

impl GraphClient for MemoryClient {
    fn query(&self, text: &str, bind_vars: &BindVars) -> Result<RowStream, ClientError> {
        self.queries.lock().push(RecordedQuery {
            text: text.to_string(),
            bind_vars: bind_vars.clone(),
        });
        trace!(query = text, "memory client query");

        let rows = if let Some(canned) = self.canned.read().get(text) {
            canned.clone()?
        } else if text.contains("DOCUMENT(@ids)") {
            self.by_ids(bind_vars)?
        } else if text.contains("@startId") {
            self.neighbors(text, bind_vars)?
        } else {
            self.scan(text)?
        };
        Ok(Box::new(rows.into_iter().map(Ok)))
    }

    fn insert(&self, collection: &str, document: Json) -> Result<DocumentMeta, ClientError> {
        let mut fields = into_object(document)?;
        let key = match fields.get("_key").and_then(Json::as_str) {
            Some(key) => key.to_string(),
            None => (self.next_key.fetch_add(1, Ordering::Relaxed) + 1).to_string(),
        };

        let mut collections = self.collections.write();
        let docs = collections.entry(collection.to_string()).or_default();
        if docs.contains_key(&key) {
            return Err(ClientError::new(
                ClientErrorKind::UniqueConstraint,
                format!("{}/{}", collection, key),
            ));
        }
        let meta = DocumentMeta {
            id: format!("{}/{}", collection, key),
            key: key.clone(),
            rev: self.rev(),
        };
        stamp(&mut fields, &meta);
        docs.insert(key, Json::Object(fields));
        Ok(meta)
    }

    fn replace(
        &self,
        collection: &str,
        key: &str,
        document: Json,
    ) -> Result<DocumentMeta, ClientError> {
        let mut fields = into_object(document)?;
        let mut collections = self.collections.write();
        let slot = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(key))
            .ok_or_else(|| ClientError::not_found(format!("{}/{}", collection, key)))?;
        let meta = DocumentMeta {
            id: format!("{}/{}", collection, key),
            key: key.to_string(),
            rev: self.rev(),
        };
        stamp(&mut fields, &meta);
        *slot = Json::Object(fields);
        Ok(meta)
    }

    fn delete(&self, collection: &str, key: &str) -> Result<(), ClientError> {
        self.collections
            .write()
            .get_mut(collection)
            .and_then(|docs| docs.remove(key))
            .map(|_| ())
            .ok_or_else(|| ClientError::not_found(format!("{}/{}", collection, key)))
    }

    fn get(&self, collection: &str, key: &str) -> Result<Option<Json>, ClientError> {
        Ok(self.document(collection, key))
    }

    fn ensure_collection(&self, collection: &str) -> Result<(), ClientError> {
        self.collections
            .write()
            .entry(collection.to_string())
            .or_default();
        Ok(())
    }
}

fn syntax(message: impl Into<String>) -> ClientError {
    ClientError::new(ClientErrorKind::Syntax, message)
}

fn into_object(document: Json) -> Result<Map<String, Json>, ClientError> {
    match document {
        Json::Object(fields) => Ok(fields),
        other => Err(ClientError::new(
            ClientErrorKind::Other,
            format!("document must be an object, got {}", other),
        )),
    }
}

fn stamp(fields: &mut Map<String, Json>, meta: &DocumentMeta) {
    fields.insert("_key".into(), json!(meta.key));
    fields.insert("_id".into(), json!(meta.id));
    fields.insert("_rev".into(), json!(meta.rev));
}

fn string_list(bind_vars: &BindVars, name: &str) -> Result<Vec<String>, ClientError> {
    let items = bind_vars
        .get(name)
        .and_then(Json::as_array)
        .ok_or_else(|| syntax(format!("bind variable @{} must be an array", name)))?;
    Ok(items
        .iter()
        .filter_map(Json::as_str)
        .map(str::to_string)
        .collect())
}

/// Collection names appearing as `` IN `name` `` in a query.
fn scanned_collections(text: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut rest = text;
    while let Some(pos) = rest.find("IN `") {
        let after = &rest[pos + 4..];
        let Some(end) = after.find('`') else {
            break;
        };
        names.push(after[..end].to_string());
        rest = &after[end + 1..];
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, Json)]) -> BindVars {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn run(client: &MemoryClient, text: &str, bind_vars: &BindVars) -> Vec<Json> {
        client
            .query(text, bind_vars)
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    #[test]
    fn test_insert_assigns_key_and_rev() {
        let client = MemoryClient::new();
        let meta = client.insert("g_vertex", json!({"name": "a"})).unwrap();
        assert_eq!(meta.key, "1");
        assert_eq!(meta.id, "g_vertex/1");

        let doc = client.document("g_vertex", "1").unwrap();
        assert_eq!(doc["_rev"], json!(meta.rev));
        assert_eq!(doc["name"], json!("a"));
    }

    #[test]
    fn test_insert_duplicate_key() {
        let client = MemoryClient::new();
        client.insert("g_vertex", json!({"_key": "a"})).unwrap();
        let err = client.insert("g_vertex", json!({"_key": "a"})).unwrap_err();
        assert_eq!(err.kind, ClientErrorKind::UniqueConstraint);
    }

    #[test]
    fn test_replace_and_delete() {
        let client = MemoryClient::new();
        let first = client.insert("g_vertex", json!({"_key": "a", "n": 1})).unwrap();
        let second = client.replace("g_vertex", "a", json!({"n": 2})).unwrap();
        assert_ne!(first.rev, second.rev);
        assert_eq!(client.document("g_vertex", "a").unwrap()["n"], json!(2));

        client.delete("g_vertex", "a").unwrap();
        assert!(client.delete("g_vertex", "a").unwrap_err().is_not_found());
        assert!(client.replace("g_vertex", "a", json!({})).unwrap_err().is_not_found());
    }

    #[test]
    fn test_get_and_ensure_collection() {
        let client = MemoryClient::new();
        client.ensure_collection("g_vars").unwrap();
        assert_eq!(client.count("g_vars"), 0);
        assert_eq!(client.get("g_vars", "a").unwrap(), None);

        client.insert("g_vars", json!({"_key": "a", "n": 1})).unwrap();
        client.ensure_collection("g_vars").unwrap();
        assert_eq!(client.count("g_vars"), 1);
        assert_eq!(client.get("g_vars", "a").unwrap().unwrap()["n"], json!(1));
    }

    #[test]
    fn test_scan_ignores_filter() {
        let client = MemoryClient::new();
        client.insert("g_a", json!({"_key": "1"})).unwrap();
        client.insert("g_b", json!({"_key": "2"})).unwrap();
        client.insert("g_c", json!({"_key": "3"})).unwrap();

        let rows = run(
            &client,
            "FOR d IN UNION((FOR x IN `g_a` FILTER `x`.`n` == 1 RETURN x),(FOR x IN `g_b` RETURN x)) RETURN d",
            &BindVars::new(),
        );
        assert_eq!(rows.len(), 2);
        assert_eq!(client.query_count(), 1);
    }

    #[test]
    fn test_document_lookup() {
        let client = MemoryClient::new();
        client.insert("g_a", json!({"_key": "1"})).unwrap();
        let rows = run(
            &client,
            "FOR d IN DOCUMENT(@ids) RETURN d",
            &vars(&[("ids", json!(["g_a/1", "g_a/2"]))]),
        );
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["_id"], json!("g_a/1"));
    }

    #[test]
    fn test_neighbors() {
        let client = MemoryClient::new();
        client.insert("g_v", json!({"_key": "a"})).unwrap();
        client.insert("g_v", json!({"_key": "b"})).unwrap();
        client
            .insert("g_e", json!({"_from": "g_v/a", "_to": "g_v/b"}))
            .unwrap();

        let bind = vars(&[
            ("startId", json!("g_v/a")),
            ("edgeCollections", json!(["g_e"])),
        ]);
        let rows = run(&client, "FOR v, e IN 1..1 OUTBOUND @startId RETURN v", &bind);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["_key"], json!("b"));

        let rows = run(&client, "FOR v, e IN 1..1 INBOUND @startId RETURN v", &bind);
        assert!(rows.is_empty());

        let rows = run(&client, "FOR v, e IN 1..1 ANY @startId RETURN e", &bind);
        assert_eq!(rows[0]["_from"], json!("g_v/a"));
    }

    #[test]
    fn test_canned_responses() {
        let client = MemoryClient::new();
        client.respond("RETURN 1", vec![json!(1)]);
        client.fail("RETURN 2", ClientError::new(ClientErrorKind::Connection, "down"));

        assert_eq!(run(&client, "RETURN 1", &BindVars::new()), vec![json!(1)]);
        let err = client.query("RETURN 2", &BindVars::new()).err().unwrap();
        assert_eq!(err.kind, ClientErrorKind::Connection);

        let err = client.query("RETURN 3", &BindVars::new()).err().unwrap();
        assert_eq!(err.kind, ClientErrorKind::Syntax);
        assert_eq!(client.queries().len(), 3);
    }

    #[test]
    fn test_scanned_collections() {
        assert_eq!(
            scanned_collections("FOR x IN `a` RETURN x UNION FOR y IN `b` RETURN y"),
            vec!["a", "b"]
        );
        assert!(scanned_collections("RETURN 1").is_empty());
    }
}
