//! Navigation and highlight dispatch.
//!
//! [`GuideEngine`] is the single context object: it owns the catalog, the
//! progress store, the manual-trigger set and the telemetry tracker, and
//! talks to the page only through a [`Host`](crate::host::Host).

pub mod engine;
pub mod navigation;
pub mod outcome;

pub use engine::{GuideDeps, GuideEngine, GuideSnapshot, resolve_catalog};
pub use navigation::{NavigationPlan, plan_navigation};
pub use outcome::{DispatchOutcome, HighlightOutcome, TriggerOutcome};
