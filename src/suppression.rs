//! Manual-trigger tracker: features the user has already acted on this session.
//!
//! The set only grows. It is never persisted, so a fresh process (a full page
//! reload, in browser terms) starts empty.

use std::collections::HashSet;

use tokio::sync::RwLock;
use tracing::debug;

use crate::catalog::Step;

/// Session-scoped set of manually exercised feature ids.
#[derive(Default)]
pub struct ManualTriggerSet {
    ids: RwLock<HashSet<String>>,
}

impl ManualTriggerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that the user exercised `feature_id`. Returns whether it was new.
    pub async fn mark(&self, feature_id: &str) -> bool {
        let inserted = self.ids.write().await.insert(feature_id.to_string());
        if inserted {
            debug!(feature = feature_id, "Feature marked as manually triggered");
        }
        inserted
    }

    pub async fn is_marked(&self, feature_id: &str) -> bool {
        self.ids.read().await.contains(feature_id)
    }

    /// Whether any feature of `step` has been exercised. Any manual interaction
    /// in a step suppresses auto-highlighting of its first feature.
    pub async fn any_marked_in(&self, step: &Step) -> bool {
        let ids = self.ids.read().await;
        step.features.iter().any(|f| ids.contains(&f.id))
    }

    /// Prerequisites of a feature that have not been exercised yet.
    pub async fn unmet<'a>(&self, prerequisites: &'a [String]) -> Vec<&'a str> {
        let ids = self.ids.read().await;
        prerequisites
            .iter()
            .filter(|p| !ids.contains(p.as_str()))
            .map(String::as_str)
            .collect()
    }

    /// Snapshot of the marked ids, sorted.
    pub async fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.ids.read().await.iter().cloned().collect();
        ids.sort();
        ids
    }
}
