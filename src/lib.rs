//! Console Guide: guided tour orchestration for a web operations console.

pub mod catalog;
pub mod config;
pub mod debug;
pub mod dispatcher;
pub mod error;
pub mod geometry;
pub mod host;
pub mod logging;
pub mod progress;
pub mod store;
pub mod suppression;
pub mod tasks;
pub mod telemetry;
pub mod wait;
