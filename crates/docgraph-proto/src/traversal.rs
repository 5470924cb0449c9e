//! Traversal step IR.
//!
//! A compiled traversal is an ordered list of [`Step`] descriptors. Front
//! ends (the text language, the [`Traversal`] builder) produce `Select`,
//! `Has`, `Barrier` and `Other` steps; the rewriter in `docgraph-core`
//! replaces the leading selection with a `Scan`.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::element::ElementKind;
use crate::predicate::Predicate;
use crate::value::Value;

/// Accessor name for the element label.
pub const LABEL_ACCESSOR: &str = "~label";
/// Accessor name for the element id.
pub const ID_ACCESSOR: &str = "~id";
/// Accessor name for a property's key.
pub const KEY_ACCESSOR: &str = "~key";
/// Accessor name for a property's value.
pub const VALUE_ACCESSOR: &str = "~value";

/// What a has-container tests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum HasKey {
    /// The element label.
    Label,
    /// The element id.
    Id,
    /// A stored property.
    Property(String),
    /// An accessor with no stored counterpart (`~key`, `~value`).
    Synthetic(String),
}

impl HasKey {
    /// Resolve an accessor or property name.
    pub fn parse(name: &str) -> HasKey {
        match name {
            LABEL_ACCESSOR => HasKey::Label,
            ID_ACCESSOR => HasKey::Id,
            KEY_ACCESSOR | VALUE_ACCESSOR => HasKey::Synthetic(name.to_string()),
            other => HasKey::Property(other.to_string()),
        }
    }

    /// The accessor or property name.
    pub fn name(&self) -> &str {
        match self {
            HasKey::Label => LABEL_ACCESSOR,
            HasKey::Id => ID_ACCESSOR,
            HasKey::Property(name) | HasKey::Synthetic(name) => name,
        }
    }
}

/// A predicate bound to the key it tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HasContainer {
    pub key: HasKey,
    pub predicate: Predicate,
}

impl HasContainer {
    /// Create a container.
    pub fn new(key: HasKey, predicate: Predicate) -> Self {
        Self { key, predicate }
    }

    /// Container on a stored property.
    pub fn property(name: impl Into<String>, predicate: Predicate) -> Self {
        Self::new(HasKey::Property(name.into()), predicate)
    }

    /// Container on the element label.
    pub fn label(predicate: Predicate) -> Self {
        Self::new(HasKey::Label, predicate)
    }

    /// Container on the element id.
    pub fn id(predicate: Predicate) -> Self {
        Self::new(HasKey::Id, predicate)
    }
}

impl std::fmt::Display for HasContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.key.name(), self.predicate)
    }
}

/// Start step: `V(ids...)` or `E(ids...)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectStep {
    pub kind: ElementKind,
    pub ids: Vec<String>,
    pub labels: Vec<String>,
}

/// Filter step holding one or more containers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HasStep {
    pub containers: Vec<HasContainer>,
    pub labels: Vec<String>,
}

/// Any step the rewriter does not look into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OtherStep {
    pub name: String,
    pub args: Vec<Value>,
    pub labels: Vec<String>,
}

/// Selection with its absorbed filters, ready to be planned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanStep {
    pub kind: ElementKind,
    /// Candidate traversal ids; empty means scan.
    pub ids: Vec<String>,
    /// Absorbed containers, in traversal order.
    pub containers: Vec<HasContainer>,
    /// Eligible logical collections.
    pub collections: BTreeSet<String>,
    pub labels: Vec<String>,
}

/// One step of a compiled traversal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    Select(SelectStep),
    Has(HasStep),
    Barrier,
    Other(OtherStep),
    Scan(ScanStep),
}

impl Step {
    /// Step labels attached with `as(...)`.
    pub fn labels(&self) -> &[String] {
        match self {
            Step::Select(s) => &s.labels,
            Step::Has(s) => &s.labels,
            Step::Other(s) => &s.labels,
            Step::Scan(s) => &s.labels,
            Step::Barrier => &[],
        }
    }

    fn labels_mut(&mut self) -> Option<&mut Vec<String>> {
        match self {
            Step::Select(s) => Some(&mut s.labels),
            Step::Has(s) => Some(&mut s.labels),
            Step::Other(s) => Some(&mut s.labels),
            Step::Scan(s) => Some(&mut s.labels),
            Step::Barrier => None,
        }
    }
}

fn write_labels(f: &mut std::fmt::Formatter<'_>, labels: &[String]) -> std::fmt::Result {
    for label in labels {
        write!(f, "@{}", label)?;
    }
    Ok(())
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Step::Select(s) => {
                let name = match s.kind {
                    ElementKind::Vertex => "V",
                    ElementKind::Edge => "E",
                };
                write!(f, "{}({})", name, s.ids.join(", "))?;
            }
            Step::Has(s) => {
                let parts: Vec<String> = s.containers.iter().map(|c| c.to_string()).collect();
                write!(f, "has({})", parts.join(", "))?;
            }
            Step::Barrier => write!(f, "barrier()")?,
            Step::Other(s) => {
                let parts: Vec<String> = s.args.iter().map(Value::render).collect();
                write!(f, "{}({})", s.name, parts.join(", "))?;
            }
            Step::Scan(s) => {
                let containers: Vec<String> =
                    s.containers.iter().map(|c| c.to_string()).collect();
                let collections: Vec<&str> = s.collections.iter().map(String::as_str).collect();
                write!(
                    f,
                    "Scan[{}]({}; {}; {})",
                    s.kind,
                    s.ids.join(", "),
                    collections.join(", "),
                    containers.join(", ")
                )?;
            }
        }
        write_labels(f, self.labels())
    }
}

/// Builder for step lists.
///
/// ```
/// use docgraph_proto::{Predicate, Traversal};
///
/// let steps = Traversal::vertices(Vec::<String>::new())
///     .has_label(["person"])
///     .has("age", Predicate::gt(30))
///     .step("out")
///     .into_steps();
/// assert_eq!(steps.len(), 4);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Traversal {
    steps: Vec<Step>,
}

impl Traversal {
    /// Start with `V(ids...)`.
    pub fn vertices<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::select(ElementKind::Vertex, ids)
    }

    /// Start with `E(ids...)`.
    pub fn edges<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::select(ElementKind::Edge, ids)
    }

    fn select<I, S>(kind: ElementKind, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            steps: vec![Step::Select(SelectStep {
                kind,
                ids: ids.into_iter().map(Into::into).collect(),
                labels: vec![],
            })],
        }
    }

    /// Append a step.
    pub fn with_step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Filter on a property.
    pub fn has(self, key: impl Into<String>, predicate: Predicate) -> Self {
        let key = key.into();
        self.has_container(HasContainer::new(HasKey::parse(&key), predicate))
    }

    /// Filter with a prepared container.
    pub fn has_container(self, container: HasContainer) -> Self {
        self.with_step(Step::Has(HasStep {
            containers: vec![container],
            labels: vec![],
        }))
    }

    /// Filter on labels: `eq` for one, `within` for several.
    pub fn has_label<I, S>(self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let predicate = one_or_within(labels.into_iter().map(|s| Value::String(s.into())));
        self.has_container(HasContainer::label(predicate))
    }

    /// Filter on ids: `eq` for one, `within` for several.
    pub fn has_id<I, S>(self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let predicate = one_or_within(ids.into_iter().map(|s| Value::String(s.into())));
        self.has_container(HasContainer::id(predicate))
    }

    /// Append a no-op barrier.
    pub fn barrier(self) -> Self {
        self.with_step(Step::Barrier)
    }

    /// Append an opaque step.
    pub fn step(self, name: impl Into<String>) -> Self {
        self.with_step(Step::Other(OtherStep {
            name: name.into(),
            args: vec![],
            labels: vec![],
        }))
    }

    /// Attach a step label to the last labelable step.
    pub fn as_(mut self, label: impl Into<String>) -> Self {
        if let Some(labels) = self.steps.iter_mut().rev().find_map(Step::labels_mut) {
            labels.push(label.into());
        }
        self
    }

    /// Finish building.
    pub fn into_steps(self) -> Vec<Step> {
        self.steps
    }
}

fn one_or_within(values: impl Iterator<Item = Value>) -> Predicate {
    let mut values: Vec<Value> = values.collect();
    if values.len() == 1 {
        Predicate::eq(values.remove(0))
    } else {
        Predicate::within(values)
    }
}
