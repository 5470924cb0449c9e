//! docgraph core - predicate pushdown and query assembly for graphs stored
//! in a document database.
//!
//! A traversal's leading selection and the filters following it are
//! rewritten into a single scan, planned into query text with as much of the
//! filtering pushed into the store as can be done exactly, and executed
//! through a [`GraphClient`]. Whatever the store cannot decide is re-checked
//! in-process.

pub mod client;
pub mod config;
pub mod decode;
pub mod error;
pub mod filter;
pub mod graph;
pub mod identity;
pub mod query;
pub mod rewrite;

pub use client::{
    BindVars, ClientError, ClientErrorKind, DocumentMeta, GraphClient, MemoryClient, RowStream,
};
pub use config::{CollectionSet, EdgeDefinition, GraphConfig, GraphType};
pub use decode::RowDecoder;
pub use error::Error;
pub use filter::{map_predicate, Filter};
pub use graph::{ElementIter, Graph, GraphVariables, RowIter};
pub use identity::{IdFactory, IdentityScheme, MultiCollection, SingleCollection};
pub use query::{
    AqlQuery, PlannedPredicate, PredicateEvaluator, QueryBuilder, ResidualFilter, ScanPlan,
};
pub use rewrite::{rewrite, RewriteContext};

/// Re-export shared types.
pub use docgraph_proto as proto;
