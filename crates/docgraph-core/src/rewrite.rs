//! Step rewriting.
//!
//! Replaces a leading `V(..)`/`E(..)` selection with a [`ScanStep`] that
//! absorbs the has-containers following it, up to the first opaque step.
//! Absorbed containers are pushed down to the store when the scan is
//! planned; containers that cannot be pushed stay in the traversal.

use std::sync::Arc;

use docgraph_proto::{
    ops, ElementKind, HasContainer, HasKey, HasStep, Predicate, ScanStep, SelectStep, Step, Value,
};
use tracing::debug;

use crate::config::{GraphConfig, GraphType};
use crate::error::Error;
use crate::identity::{id_text, IdFactory};
use crate::query::{PredicateEvaluator, QueryBuilder};

/// Everything the rewriter needs to know about the graph.
#[derive(Debug, Clone)]
pub struct RewriteContext {
    builder: QueryBuilder,
}

impl RewriteContext {
    pub fn new(config: Arc<GraphConfig>) -> Self {
        let ids = IdFactory::new(config.clone());
        Self {
            builder: QueryBuilder::new(config, ids),
        }
    }

    pub fn from_builder(builder: QueryBuilder) -> Self {
        Self { builder }
    }

    fn config(&self) -> &GraphConfig {
        self.builder.config()
    }
}

/// Rewrite a compiled traversal.
///
/// Only a selection at position 0 is rewritten; a list already starting with
/// a scan, or starting with anything else, is returned unchanged.
pub fn rewrite(steps: Vec<Step>, ctx: &RewriteContext) -> Result<Vec<Step>, Error> {
    let mut steps = steps.into_iter();
    let select = match steps.next() {
        Some(Step::Select(select)) => select,
        Some(other) => {
            let mut out = vec![other];
            out.extend(steps);
            return Ok(out);
        }
        None => return Ok(Vec::new()),
    };

    let mut scan = start_scan(select, ctx)?;
    let mut rest = Vec::new();
    let mut absorbing = true;

    for step in steps {
        if !absorbing {
            rest.push(step);
            continue;
        }
        match step {
            Step::Barrier => rest.push(Step::Barrier),
            Step::Has(has) => {
                let mut kept = Vec::new();
                for container in has.containers {
                    if !absorb(&mut scan, &container, ctx)? {
                        kept.push(container);
                    }
                }
                if kept.is_empty() {
                    scan.labels.extend(has.labels);
                } else {
                    rest.push(Step::Has(HasStep {
                        containers: kept,
                        labels: has.labels,
                    }));
                }
            }
            other => {
                absorbing = false;
                rest.push(other);
            }
        }
    }

    debug!(
        kind = %scan.kind,
        ids = scan.ids.len(),
        absorbed = scan.containers.len(),
        collections = scan.collections.len(),
        remaining = rest.len(),
        "rewrote selection into scan"
    );

    let mut out = Vec::with_capacity(rest.len() + 1);
    out.push(Step::Scan(scan));
    out.extend(rest);
    Ok(out)
}

fn start_scan(select: SelectStep, ctx: &RewriteContext) -> Result<ScanStep, Error> {
    for id in &select.ids {
        ctx.builder.ids().parse_id(select.kind, id)?;
    }
    Ok(ScanStep {
        kind: select.kind,
        ids: select.ids,
        containers: Vec::new(),
        collections: ctx.config().collections(select.kind),
        labels: select.labels,
    })
}

/// Try to absorb one container into the scan; `false` leaves it in place.
fn absorb(scan: &mut ScanStep, container: &HasContainer, ctx: &RewriteContext) -> Result<bool, Error> {
    match &container.key {
        HasKey::Id if scan.ids.is_empty() => {
            if let Some(ids) = folded_ids(scan.kind, &container.predicate, ctx)? {
                scan.ids = ids;
                return Ok(true);
            }
        }
        HasKey::Label if ctx.config().graph_type == GraphType::Complex => {
            let mut narrowed = scan.collections.clone();
            for collection in &scan.collections {
                let name = Value::from(collection.as_str());
                if !PredicateEvaluator::test(&container.predicate, Some(&name))? {
                    narrowed.remove(collection);
                }
            }
            scan.collections = narrowed;
            return Ok(true);
        }
        HasKey::Synthetic(_) => return Ok(false),
        _ => {}
    }

    let filter = ctx.builder.map_container(scan.kind, container)?;
    if filter.support().is_pushable() {
        scan.containers.push(container.clone());
        Ok(true)
    } else {
        Ok(false)
    }
}

/// Ids named by an `eq`/`within` id predicate.
fn folded_ids(
    kind: ElementKind,
    predicate: &Predicate,
    ctx: &RewriteContext,
) -> Result<Option<Vec<String>>, Error> {
    let values: Vec<&Value> = match predicate {
        Predicate::Compare { op, value } if op == ops::EQ => vec![value],
        Predicate::Compare { op, value } if op == ops::WITHIN => match value.as_list() {
            Some(items) => items.iter().collect(),
            None => vec![value],
        },
        _ => return Ok(None),
    };

    let mut ids = Vec::with_capacity(values.len());
    for value in values {
        let id = id_text(value)?;
        ctx.builder.ids().parse_id(kind, &id)?;
        ids.push(id);
    }
    Ok(Some(ids))
}
