//! Traversal explanation.

use docgraph_core::{AqlQuery, Graph, GraphClient, PlannedPredicate};
use docgraph_proto::{ElementKind, Step, Support};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ExplainError {
    /// Parse or compile error, rendered with the source snippet.
    #[error("{0}")]
    Language(String),

    #[error(transparent)]
    Graph(#[from] docgraph_core::Error),
}

/// How the leading scan of a traversal will be executed.
#[derive(Debug)]
pub struct ScanExplanation {
    pub kind: ElementKind,
    pub ids: Vec<String>,
    pub collections: Vec<String>,
    /// `None` when every collection was narrowed away and nothing is queried.
    pub query: Option<AqlQuery>,
    pub support: Support,
    pub predicates: Vec<PlannedPredicate>,
}

#[derive(Debug)]
pub struct Explanation {
    /// Steps after rewriting.
    pub steps: Vec<Step>,
    pub scan: Option<ScanExplanation>,
}

/// Parse, compile, rewrite and plan `source` against `graph`.
pub fn explain<C: GraphClient>(graph: &Graph<C>, source: &str) -> Result<Explanation, ExplainError> {
    let steps = docgraph_lang::parse_and_compile(source)
        .map_err(|e| ExplainError::Language(e.format_with_source(source)))?;
    let steps = graph.rewrite(steps)?;
    debug!(steps = steps.len(), "rewrote traversal");

    let scan = match steps.first() {
        Some(Step::Scan(scan)) if scan.collections.is_empty() => Some(ScanExplanation {
            kind: scan.kind,
            ids: scan.ids.clone(),
            collections: vec![],
            query: None,
            support: Support::None,
            predicates: vec![],
        }),
        Some(Step::Scan(scan)) => {
            let plan =
                graph.plan_scan(scan.kind, &scan.ids, &scan.containers, &scan.collections)?;
            Some(ScanExplanation {
                kind: scan.kind,
                ids: scan.ids.clone(),
                collections: scan.collections.iter().cloned().collect(),
                query: Some(plan.query),
                support: plan.support,
                predicates: plan.predicates,
            })
        }
        _ => None,
    };

    Ok(Explanation { steps, scan })
}
