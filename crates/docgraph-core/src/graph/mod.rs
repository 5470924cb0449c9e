//! Graph facade.
//!
//! [`Graph`] ties a validated configuration to a [`GraphClient`]: it
//! rewrites traversals, plans and runs scans, and writes elements.

mod iter;
mod variables;

pub use iter::{ElementIter, RowIter};
pub use variables::{
    check_version, GraphVariables, LIBRARY_VERSION, VARIABLES_COLLECTION, VERSION_FIELD,
};

use std::collections::BTreeMap;
use std::sync::Arc;

use docgraph_proto::{
    Direction, Edge, ElementId, ElementKind, HasContainer, RawValue, ScanStep, Step, Value, Vertex,
};
use serde_json::{Map, Value as Json};
use tracing::{debug, info, warn};

use crate::client::{BindVars, ClientError, ClientErrorKind, DocumentMeta, GraphClient};
use crate::config::{CollectionSet, GraphConfig, DEFAULT_EDGE_COLLECTION, DEFAULT_VERTEX_COLLECTION};
use crate::decode::RowDecoder;
use crate::error::Error;
use crate::identity::IdFactory;
use crate::query::{QueryBuilder, ScanPlan};
use crate::rewrite::{rewrite, RewriteContext};

/// A graph stored as documents behind a client.
pub struct Graph<C> {
    config: Arc<GraphConfig>,
    builder: QueryBuilder,
    rewriter: RewriteContext,
    decoder: RowDecoder,
    client: C,
}

impl<C: GraphClient> Graph<C> {
    /// Validate `config` and bind it to `client`.
    pub fn open(config: GraphConfig, client: C) -> Result<Self, Error> {
        let config = Arc::new(config.validate()?);
        let ids = IdFactory::new(config.clone());
        let builder = QueryBuilder::new(config.clone(), ids.clone());

        info!(
            graph = %config.graph_name,
            db = %config.db_name,
            graph_type = ?config.graph_type,
            vertices = config.vertices.len(),
            edges = config.edges.len(),
            "opened graph"
        );

        let graph = Self {
            rewriter: RewriteContext::from_builder(builder.clone()),
            decoder: RowDecoder::new(ids, config.label_field.clone()),
            builder,
            config,
            client,
        };
        graph.init_variables()?;
        Ok(graph)
    }

    /// Create the variables document if needed and stamp the library
    /// version into it.
    fn init_variables(&self) -> Result<(), Error> {
        self.client.ensure_collection(VARIABLES_COLLECTION)?;
        let mut variables = match self.load_variables()? {
            Some(variables) => variables,
            None => {
                let fresh = GraphVariables::new(&self.config.graph_name, LIBRARY_VERSION);
                self.client
                    .insert(VARIABLES_COLLECTION, fresh.to_document())?;
                fresh
            }
        };

        check_version(variables.version())?;
        if variables.version() != LIBRARY_VERSION {
            info!(
                graph = %self.config.graph_name,
                from = variables.version(),
                to = LIBRARY_VERSION,
                "updating graph version"
            );
        }
        variables.set_version(LIBRARY_VERSION);
        self.store_variables(&variables)
    }

    fn load_variables(&self) -> Result<Option<GraphVariables>, Error> {
        self.client
            .get(VARIABLES_COLLECTION, &self.config.graph_name)?
            .map(|document| GraphVariables::from_document(&document, &self.config))
            .transpose()
    }

    fn store_variables(&self, variables: &GraphVariables) -> Result<(), Error> {
        self.client
            .replace(VARIABLES_COLLECTION, variables.key(), variables.to_document())?;
        Ok(())
    }

    /// Current graph variables, read from the store.
    pub fn variables(&self) -> Result<GraphVariables, Error> {
        self.load_variables()?.ok_or_else(|| {
            ClientError::not_found(format!(
                "{}/{}",
                VARIABLES_COLLECTION, self.config.graph_name
            ))
            .into()
        })
    }

    /// Set one graph variable.
    pub fn set_variable(
        &self,
        key: &str,
        value: impl Into<RawValue>,
    ) -> Result<GraphVariables, Error> {
        let value = Value::of(value.into())?;
        variables::check_variable(key, &value, &self.config)?;
        let mut variables = self.variables()?;
        debug!(graph = %self.config.graph_name, key, "setting graph variable");
        variables.set(key.to_string(), value);
        self.store_variables(&variables)?;
        Ok(variables)
    }

    /// Remove one graph variable; removing an absent key is not an error.
    pub fn remove_variable(&self, key: &str) -> Result<GraphVariables, Error> {
        let mut variables = self.variables()?;
        if variables.remove(key).is_some() {
            debug!(graph = %self.config.graph_name, key, "removing graph variable");
            self.store_variables(&variables)?;
        }
        Ok(variables)
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn ids(&self) -> &IdFactory {
        self.builder.ids()
    }

    pub fn query_builder(&self) -> &QueryBuilder {
        &self.builder
    }

    /// Rewrite a compiled traversal, absorbing filters into the leading scan.
    pub fn rewrite(&self, steps: Vec<Step>) -> Result<Vec<Step>, Error> {
        rewrite(steps, &self.rewriter)
    }

    /// Plan a scan without running it.
    pub fn plan_scan(
        &self,
        kind: ElementKind,
        ids: &[String],
        predicates: &[HasContainer],
        collections: &CollectionSet,
    ) -> Result<ScanPlan, Error> {
        self.builder.plan(kind, ids, predicates, collections)
    }

    /// Elements selected by a scan step.
    ///
    /// Planning errors surface here; the query itself is sent on the first
    /// pull. A scan whose collections were all narrowed away yields nothing.
    pub fn scan(&self, step: &ScanStep) -> Result<ElementIter<'_, C>, Error> {
        if step.collections.is_empty() {
            debug!(kind = %step.kind, "scan over no collections");
            return Ok(ElementIter::empty(&self.client, &self.decoder));
        }
        let plan = self.plan_scan(step.kind, &step.ids, &step.containers, &step.collections)?;
        let residual = (!plan.residual.is_empty()).then_some(plan.residual);
        Ok(ElementIter::new(&self.client, &self.decoder, plan.query, residual))
    }

    /// Run an ad-hoc query and decode its rows.
    pub fn query(&self, text: &str, bind_vars: &BindVars) -> Result<RowIter<'_>, Error> {
        debug!(query = text, bind_vars = bind_vars.len(), "executing ad-hoc query");
        let stream = self.client.query(text, bind_vars)?;
        Ok(RowIter::new(&self.decoder, stream))
    }

    /// Vertices by id, or all vertices when `ids` is empty.
    pub fn vertices(&self, ids: &[String]) -> Result<ElementIter<'_, C>, Error> {
        self.scan(&self.select(ElementKind::Vertex, ids))
    }

    /// Edges by id, or all edges when `ids` is empty.
    pub fn edges(&self, ids: &[String]) -> Result<ElementIter<'_, C>, Error> {
        self.scan(&self.select(ElementKind::Edge, ids))
    }

    fn select(&self, kind: ElementKind, ids: &[String]) -> ScanStep {
        ScanStep {
            kind,
            ids: ids.to_vec(),
            containers: Vec::new(),
            collections: self.config.collections(kind),
            labels: Vec::new(),
        }
    }

    /// Vertices one hop away from `vertex`.
    pub fn vertex_neighbors(
        &self,
        vertex: &ElementId,
        direction: Direction,
        edge_labels: &[String],
    ) -> Result<ElementIter<'_, C>, Error> {
        let query = self
            .builder
            .neighbors(vertex, direction, edge_labels, ElementKind::Vertex)?;
        Ok(ElementIter::new(&self.client, &self.decoder, query, None))
    }

    /// Edges incident to `vertex`.
    pub fn vertex_edges(
        &self,
        vertex: &ElementId,
        direction: Direction,
        edge_labels: &[String],
    ) -> Result<ElementIter<'_, C>, Error> {
        let query = self
            .builder
            .neighbors(vertex, direction, edge_labels, ElementKind::Edge)?;
        Ok(ElementIter::new(&self.client, &self.decoder, query, None))
    }

    /// Insert a vertex.
    pub fn add_vertex<I, K, V>(
        &self,
        label: Option<&str>,
        id: Option<&str>,
        properties: I,
    ) -> Result<Vertex, Error>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<RawValue>,
    {
        let (element_id, label) = self.new_element(ElementKind::Vertex, label, id)?;
        let properties = self.classify(properties)?;
        let document = self.document(&element_id, &label, &properties, None)?;
        let meta = self.insert(&element_id, document)?;

        Ok(Vertex {
            id: element_id.with_key(meta.key),
            label,
            revision: Some(meta.rev),
            properties,
            meta: BTreeMap::new(),
        })
    }

    /// Insert an edge between two stored vertices.
    pub fn add_edge<I, K, V>(
        &self,
        label: Option<&str>,
        id: Option<&str>,
        from: &ElementId,
        to: &ElementId,
        properties: I,
    ) -> Result<Edge, Error>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<RawValue>,
    {
        let (element_id, label) = self.new_element(ElementKind::Edge, label, id)?;
        let properties = self.classify(properties)?;
        let document = self.document(&element_id, &label, &properties, Some((from, to)))?;
        let meta = self.insert(&element_id, document)?;

        Ok(Edge {
            id: element_id.with_key(meta.key),
            label,
            revision: Some(meta.rev),
            from: from.clone(),
            to: to.clone(),
            properties,
        })
    }

    /// Write back a vertex's label and properties.
    pub fn update_vertex(&self, vertex: &Vertex) -> Result<Vertex, Error> {
        self.check_properties(&vertex.properties)?;
        let document = self.document(&vertex.id, &vertex.label, &vertex.properties, None)?;
        let meta = self.replace(&vertex.id, document)?;
        Ok(Vertex {
            revision: Some(meta.rev),
            ..vertex.clone()
        })
    }

    /// Write back an edge's label and properties.
    pub fn update_edge(&self, edge: &Edge) -> Result<Edge, Error> {
        self.check_properties(&edge.properties)?;
        let document = self.document(
            &edge.id,
            &edge.label,
            &edge.properties,
            Some((&edge.from, &edge.to)),
        )?;
        let meta = self.replace(&edge.id, document)?;
        Ok(Edge {
            revision: Some(meta.rev),
            ..edge.clone()
        })
    }

    /// Remove a vertex; removing a missing vertex is not an error.
    pub fn remove_vertex(&self, id: &ElementId) -> Result<(), Error> {
        self.remove(id)
    }

    /// Remove an edge; removing a missing edge is not an error.
    pub fn remove_edge(&self, id: &ElementId) -> Result<(), Error> {
        self.remove(id)
    }

    fn new_element(
        &self,
        kind: ElementKind,
        label: Option<&str>,
        id: Option<&str>,
    ) -> Result<(ElementId, String), Error> {
        let element_id = self.ids().create_id(kind, label, id)?;
        if !self.config.collections(kind).contains(&element_id.collection)
            && !self.config.enable_data_definition
        {
            return Err(Error::UnknownCollection(element_id.collection));
        }
        let label = match label {
            Some(label) => label.to_string(),
            None => match kind {
                ElementKind::Vertex => DEFAULT_VERTEX_COLLECTION.to_string(),
                ElementKind::Edge => DEFAULT_EDGE_COLLECTION.to_string(),
            },
        };
        Ok((element_id, label))
    }

    fn classify<I, K, V>(&self, properties: I) -> Result<BTreeMap<String, Value>, Error>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<RawValue>,
    {
        let mut classified = BTreeMap::new();
        for (key, value) in properties {
            let key = key.into();
            if self.config.is_reserved_field(&key) {
                return Err(Error::ReservedField(key));
            }
            classified.insert(key, Value::of(value.into())?);
        }
        Ok(classified)
    }

    fn check_properties(&self, properties: &BTreeMap<String, Value>) -> Result<(), Error> {
        match properties.keys().find(|k| self.config.is_reserved_field(k)) {
            Some(key) => Err(Error::ReservedField(key.clone())),
            None => Ok(()),
        }
    }

    fn document(
        &self,
        id: &ElementId,
        label: &str,
        properties: &BTreeMap<String, Value>,
        endpoints: Option<(&ElementId, &ElementId)>,
    ) -> Result<Json, Error> {
        let mut fields = Map::new();
        if let Some(key) = &id.key {
            fields.insert("_key".to_string(), Json::String(key.clone()));
        }
        fields.insert(self.config.label_field.clone(), Json::String(label.to_string()));
        if let Some((from, to)) = endpoints {
            fields.insert("_from".to_string(), Json::String(endpoint(from)?));
            fields.insert("_to".to_string(), Json::String(endpoint(to)?));
        }
        for (key, value) in properties {
            fields.insert(key.clone(), value.to_json());
        }
        Ok(Json::Object(fields))
    }

    fn insert(&self, id: &ElementId, document: Json) -> Result<DocumentMeta, Error> {
        debug!(collection = %id.physical_collection(), "inserting document");
        self.client
            .insert(&id.physical_collection(), document)
            .map_err(|e| match e.kind {
                ClientErrorKind::UniqueConstraint => Error::ElementExists(self.display_id(id)),
                _ => e.into(),
            })
    }

    fn replace(&self, id: &ElementId, document: Json) -> Result<DocumentMeta, Error> {
        let key = element_key(id)?;
        debug!(element = %id, "replacing document");
        Ok(self.client.replace(&id.physical_collection(), key, document)?)
    }

    fn remove(&self, id: &ElementId) -> Result<(), Error> {
        let key = element_key(id)?;
        match self.client.delete(&id.physical_collection(), key) {
            Ok(()) => Ok(()),
            Err(ClientError {
                kind: ClientErrorKind::NotFound,
                message,
            }) => {
                warn!(element = %id, %message, "element to remove was not found");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn display_id(&self, id: &ElementId) -> String {
        self.ids().encode(id).unwrap_or_else(|| id.to_string())
    }
}

fn element_key(id: &ElementId) -> Result<&str, Error> {
    id.key
        .as_deref()
        .ok_or_else(|| Error::InvalidId(format!("element {} has no key", id)))
}

fn endpoint(id: &ElementId) -> Result<String, Error> {
    id.document_id()
        .ok_or_else(|| Error::InvalidId(format!("edge endpoint {} has no key", id)))
}
