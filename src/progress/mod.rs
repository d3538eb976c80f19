//! Progress: which step the user is on and how far each step has come.
//!
//! The record is persisted after every mutation and reloaded at startup, with
//! a one-time migration for blobs written by older releases. Panel visibility
//! lives alongside it but always starts hidden.

pub mod state;
pub mod store;

pub use state::{
    ConnectionHealth, DomainProgress, PanelVisibility, Progress, SimulationState, StepStatus,
    TrainingState, VisibilityChange,
};
pub use store::{BlobMigration, ProgressStore, migrate_blob};
