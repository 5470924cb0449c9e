//! docgraph shared types
//!
//! Values, predicates, traversal step descriptors, element identities and
//! decoded rows shared by the planner, the traversal language and the CLI.

pub mod element;
pub mod error;
pub mod predicate;
pub mod row;
pub mod support;
pub mod traversal;
pub mod value;

pub use element::{Direction, ElementId, ElementKind};
pub use error::ValueError;
pub use predicate::{ops, Predicate};
pub use row::{Edge, Element, Row, Vertex};
pub use support::Support;
pub use traversal::{
    HasContainer, HasKey, HasStep, OtherStep, ScanStep, SelectStep, Step, Traversal,
};
pub use value::{RawValue, Value};
