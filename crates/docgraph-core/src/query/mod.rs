//! Query planning for docgraph.
//!
//! The builder assembles scan and neighbor queries from has-containers; the
//! residual module re-checks fetched rows with traversal semantics.

mod builder;
pub mod residual;

pub use builder::{AqlQuery, PlannedPredicate, QueryBuilder, ScanPlan};
pub use residual::{PredicateEvaluator, ResidualFilter};
