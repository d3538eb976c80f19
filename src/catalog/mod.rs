//! Step/feature catalog: the static description of the guided workflow.
//!
//! A catalog is a validated list of steps. Each step is bound to a route and
//! owns an ordered list of features, the highlightable targets the tour
//! points at. Only the first feature of a step is ever auto-highlighted.

pub mod model;
pub mod registry;
pub mod steps;

pub use model::{ActionKind, CommonIssue, Feature, Step, TooltipSide};
pub use registry::Catalog;
pub use steps::{default_catalog, default_steps};
