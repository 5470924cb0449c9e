//! Query assembly.
//!
//! Turns a selection (kind, candidate ids, eligible collections) and a list
//! of has-containers into query text. Three shapes are produced:
//!
//! - by-id fetch: `FOR d IN DOCUMENT(@ids) [FILTER ..] RETURN d`
//! - single collection: ``FOR x IN `g_c` [FILTER ..] RETURN x``
//! - several collections: `FOR d IN UNION((..),(..)) RETURN d`

use std::sync::Arc;

use docgraph_proto::{
    ops, Direction, ElementId, ElementKind, HasContainer, HasKey, Predicate, Support, Value,
};
use serde::{Deserialize, Serialize};

use super::residual::ResidualFilter;
use crate::client::BindVars;
use crate::config::{CollectionSet, GraphConfig, GraphType};
use crate::error::Error;
use crate::filter::{map_predicate, quote_name, Filter};
use crate::identity::{id_text, IdFactory};

/// Query text with its bind variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AqlQuery {
    pub text: String,
    pub bind_vars: BindVars,
}

impl std::fmt::Display for AqlQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

/// A container together with the support of its pushed-down form.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedPredicate {
    pub container: HasContainer,
    pub filter: Filter,
    pub support: Support,
}

/// Executable plan for one scan.
#[derive(Debug, Clone)]
pub struct ScanPlan {
    pub query: AqlQuery,
    /// Support of the combined filter.
    pub support: Support,
    pub predicates: Vec<PlannedPredicate>,
    /// Re-checked in-process on every fetched row.
    pub residual: ResidualFilter,
}

/// Assembles queries for one graph.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    config: Arc<GraphConfig>,
    ids: IdFactory,
}

impl QueryBuilder {
    pub fn new(config: Arc<GraphConfig>, ids: IdFactory) -> Self {
        Self { config, ids }
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub fn ids(&self) -> &IdFactory {
        &self.ids
    }

    /// Document field a container key compares against.
    pub fn field_for<'a>(&'a self, key: &'a HasKey) -> Option<&'a str> {
        match key {
            HasKey::Label => Some(self.config.label_field.as_str()),
            HasKey::Id => Some(self.ids.scheme().id_field()),
            HasKey::Property(name) => Some(name.as_str()),
            HasKey::Synthetic(_) => None,
        }
    }

    /// Map one container to its pushdown filter.
    ///
    /// Synthetic accessors have no stored counterpart and map to
    /// [`Filter::Empty`]. Id operands are converted to stored ids; text
    /// operators on ids are left to the residual check.
    pub fn map_container(
        &self,
        kind: ElementKind,
        container: &HasContainer,
    ) -> Result<Filter, Error> {
        let Some(field) = self.field_for(&container.key) else {
            return Ok(Filter::Empty);
        };
        match container.key {
            HasKey::Id => match self.stored_id_predicate(kind, &container.predicate)? {
                Some(predicate) => map_predicate(field, &predicate),
                None => Ok(Filter::Empty),
            },
            _ => map_predicate(field, &container.predicate),
        }
    }

    fn stored_id_predicate(
        &self,
        kind: ElementKind,
        predicate: &Predicate,
    ) -> Result<Option<Predicate>, Error> {
        let (op, value) = match predicate {
            Predicate::And { predicates } | Predicate::Or { predicates } => {
                let mut converted = Vec::with_capacity(predicates.len());
                for p in predicates {
                    match self.stored_id_predicate(kind, p)? {
                        Some(p) => converted.push(p),
                        None => return Ok(None),
                    }
                }
                let rebuilt = match predicate {
                    Predicate::And { .. } => Predicate::And {
                        predicates: converted,
                    },
                    _ => Predicate::Or {
                        predicates: converted,
                    },
                };
                return Ok(Some(rebuilt));
            }
            Predicate::Compare { op, value } => (op.as_str(), value),
        };

        let value = match op {
            ops::EQ | ops::NEQ | ops::LT | ops::LTE | ops::GT | ops::GTE => {
                self.stored_id_value(kind, value)?
            }
            ops::WITHIN | ops::WITHOUT => match value {
                Value::List(items) => Value::List(
                    items
                        .iter()
                        .map(|v| self.stored_id_value(kind, v))
                        .collect::<Result<Vec<_>, _>>()?,
                ),
                other => self.stored_id_value(kind, other)?,
            },
            _ => return Ok(None),
        };
        Ok(Some(Predicate::named(op, value)))
    }

    fn stored_id_value(&self, kind: ElementKind, value: &Value) -> Result<Value, Error> {
        let id = id_text(value)?;
        Ok(Value::String(self.ids.stored_id(kind, &id)?))
    }

    /// Plan a scan: map and combine the containers, render the query and
    /// keep every container for the in-process re-check.
    pub fn plan(
        &self,
        kind: ElementKind,
        ids: &[String],
        predicates: &[HasContainer],
        collections: &CollectionSet,
    ) -> Result<ScanPlan, Error> {
        let mut planned = Vec::with_capacity(predicates.len());
        for container in predicates {
            let filter = self.map_container(kind, container)?;
            planned.push(PlannedPredicate {
                container: container.clone(),
                support: filter.support(),
                filter,
            });
        }

        let combined = Filter::and(planned.iter().map(|p| p.filter.clone()).collect());
        let query = self.build_scan(kind, ids, &combined, collections)?;

        Ok(ScanPlan {
            query,
            support: combined.support(),
            predicates: planned,
            residual: ResidualFilter::new(predicates.to_vec(), self.ids.clone()),
        })
    }

    /// Render a scan over `collections`, or a by-id fetch when `ids` is not
    /// empty.
    pub fn build_scan(
        &self,
        kind: ElementKind,
        ids: &[String],
        filter: &Filter,
        collections: &CollectionSet,
    ) -> Result<AqlQuery, Error> {
        if collections.is_empty() {
            return Err(Error::NoCollections);
        }

        let mut bind_vars = BindVars::new();
        let text = if !ids.is_empty() {
            let mut document_ids = Vec::with_capacity(ids.len());
            for id in ids {
                let element_id = self.ids.parse_id(kind, id)?;
                if !collections.contains(&element_id.collection) {
                    continue;
                }
                if let Some(document_id) = element_id.document_id() {
                    document_ids.push(serde_json::Value::String(document_id));
                }
            }
            bind_vars.insert("ids".to_string(), serde_json::Value::Array(document_ids));
            format!("FOR d IN DOCUMENT(@ids){} RETURN d", filter_clause(filter, "d"))
        } else if collections.len() == 1 {
            self.collection_scan(collections.iter().next().map_or("", String::as_str), filter)
        } else {
            let arms: Vec<String> = collections
                .iter()
                .map(|c| format!("({})", self.collection_scan(c, filter)))
                .collect();
            format!("FOR d IN UNION({}) RETURN d", arms.join(","))
        };

        Ok(AqlQuery { text, bind_vars })
    }

    fn collection_scan(&self, collection: &str, filter: &Filter) -> String {
        format!(
            "FOR x IN {}{} RETURN x",
            quote_name(&self.config.physical_collection(collection)),
            filter_clause(filter, "x")
        )
    }

    /// One-hop neighborhood of `start`, returning vertices or edges.
    ///
    /// Under the multi-collection scheme the edge labels are the edge
    /// collections; otherwise the single edge collection is traversed and the
    /// labels become a filter on the label field.
    pub fn neighbors(
        &self,
        start: &ElementId,
        direction: Direction,
        edge_labels: &[String],
        target: ElementKind,
    ) -> Result<AqlQuery, Error> {
        let start_id = start
            .document_id()
            .ok_or_else(|| Error::InvalidId(format!("element {} has no key", start)))?;

        let edges = self.config.collections(ElementKind::Edge);
        let mut label_filter = Filter::Empty;
        let collections: Vec<String> = match self.config.graph_type {
            GraphType::Complex if !edge_labels.is_empty() => {
                for label in edge_labels {
                    if !edges.contains(label) {
                        return Err(Error::UnknownCollection(label.clone()));
                    }
                }
                edge_labels.to_vec()
            }
            _ => {
                if !edge_labels.is_empty() {
                    let labels = edge_labels.iter().map(|l| Value::from(l.as_str())).collect();
                    label_filter = Filter::within(&self.config.label_field, labels);
                }
                edges.into_iter().collect()
            }
        };

        let physical: Vec<serde_json::Value> = collections
            .iter()
            .map(|c| serde_json::Value::String(self.config.physical_collection(c)))
            .collect();
        let mut bind_vars = BindVars::new();
        bind_vars.insert("startId".to_string(), serde_json::Value::String(start_id));
        bind_vars.insert(
            "edgeCollections".to_string(),
            serde_json::Value::Array(physical),
        );

        let ret = match target {
            ElementKind::Vertex => "v",
            ElementKind::Edge => "e",
        };
        let text = format!(
            "FOR v, e IN 1..1 {} @startId GRAPH {} OPTIONS {{edgeCollections: @edgeCollections}}{} RETURN {}",
            direction.keyword(),
            docgraph_proto::value::quote(&self.config.graph_name),
            filter_clause(&label_filter, "e"),
            ret
        );
        Ok(AqlQuery { text, bind_vars })
    }
}

fn filter_clause(filter: &Filter, var: &str) -> String {
    filter
        .render(var)
        .map(|rendered| format!(" FILTER {}", rendered))
        .unwrap_or_default()
}
