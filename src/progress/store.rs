//! ProgressStore: owns the progress record, persists every mutation.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use super::state::{
    DEPRECATED_VISIBILITY_FIELD, DomainProgress, PanelVisibility, Progress, StepStatus,
    VisibilityChange,
};
use crate::catalog::Catalog;
use crate::config::storage_keys;
use crate::error::GuideError;
use crate::store::KeyValueStorage;

/// Outcome of inspecting a persisted progress blob.
#[derive(Debug, Clone, PartialEq)]
pub enum BlobMigration {
    /// Nothing to strip.
    Clean(Value),
    /// The deprecated field was removed; the rewritten blob is included.
    Stripped { value: Value, rewritten: String },
    /// Not valid JSON, or not an object.
    Corrupt(String),
}

/// Strip the deprecated visibility field from a persisted blob, if present.
pub fn migrate_blob(raw: &str) -> BlobMigration {
    let mut value: Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => return BlobMigration::Corrupt(e.to_string()),
    };
    let Some(obj) = value.as_object_mut() else {
        return BlobMigration::Corrupt("progress blob is not an object".to_string());
    };
    if obj.remove(DEPRECATED_VISIBILITY_FIELD).is_none() {
        return BlobMigration::Clean(value);
    }
    match serde_json::to_string(&value) {
        Ok(rewritten) => BlobMigration::Stripped { value, rewritten },
        Err(e) => BlobMigration::Corrupt(e.to_string()),
    }
}

/// Holds the current progress and writes it through to durable storage.
///
/// The in-memory record is authoritative: a failed write is logged and the
/// mutation still stands.
pub struct ProgressStore {
    storage: Arc<dyn KeyValueStorage>,
    steps: Vec<u32>,
    first_step: u32,
    state: RwLock<Progress>,
}

impl ProgressStore {
    /// Load persisted progress for `catalog`, migrating old blobs and falling
    /// back to the initial state when nothing usable is stored.
    pub async fn load(storage: Arc<dyn KeyValueStorage>, catalog: &Catalog) -> Self {
        let steps = catalog.step_numbers();
        let first_step = catalog.first_step();
        let progress = Self::read_persisted(storage.as_ref(), &steps, first_step)
            .await
            .unwrap_or_else(|| Progress::initial(&steps, first_step));

        Self {
            storage,
            steps,
            first_step,
            state: RwLock::new(progress),
        }
    }

    async fn read_persisted(
        storage: &dyn KeyValueStorage,
        steps: &[u32],
        first_step: u32,
    ) -> Option<Progress> {
        let raw = match storage.get(storage_keys::PROGRESS).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("Failed to read guide progress: {}", e);
                return None;
            }
        };

        let value = match migrate_blob(&raw) {
            BlobMigration::Clean(value) => value,
            BlobMigration::Stripped { value, rewritten } => {
                info!(field = DEPRECATED_VISIBILITY_FIELD, "Stripped deprecated field from persisted progress");
                if let Err(e) = storage.set(storage_keys::PROGRESS, &rewritten).await {
                    warn!("Failed to rewrite migrated guide progress: {}", e);
                }
                value
            }
            BlobMigration::Corrupt(reason) => {
                error!(raw = %raw, "Persisted guide progress is corrupt, using defaults: {}", reason);
                return None;
            }
        };

        match serde_json::from_value::<Progress>(value) {
            Ok(mut progress) => {
                progress.reconcile(steps, first_step);
                Some(progress)
            }
            Err(e) => {
                error!(raw = %raw, "Persisted guide progress has an invalid shape, using defaults: {}", e);
                None
            }
        }
    }

    /// Make `step` the single active step.
    pub async fn select_step(&self, step: u32) -> Result<(), GuideError> {
        self.ensure_known(step)?;
        self.mutate(|p| p.select(step)).await;
        Ok(())
    }

    /// Mark `step` completed. The active step is unchanged.
    pub async fn complete_step(&self, step: u32) -> Result<(), GuideError> {
        self.ensure_known(step)?;
        self.mutate(|p| p.complete(step)).await;
        Ok(())
    }

    /// Flag a step whose underlying data was found broken.
    pub async fn mark_error(&self, step: u32) -> Result<(), GuideError> {
        self.ensure_known(step)?;
        self.mutate(|p| p.set_error(step)).await;
        Ok(())
    }

    pub async fn select_platform(&self, platform: Option<String>) {
        self.mutate(|p| p.platform_selection = platform).await;
    }

    pub async fn record_route(&self, route: &str) {
        {
            let state = self.state.read().await;
            if state.last_visited_route == route {
                return;
            }
        }
        self.mutate(|p| p.last_visited_route = route.to_string()).await;
    }

    /// Update the per-domain record. Not persisted.
    pub async fn update_domain(&self, update: impl FnOnce(&mut DomainProgress)) {
        update(&mut self.state.write().await.domain);
    }

    /// The single coordinated panel/content visibility operation.
    pub async fn apply_visibility(&self, change: VisibilityChange) -> PanelVisibility {
        let mut state = self.state.write().await;
        state.panel.apply(change);
        state.panel
    }

    /// Back to the initial state: first step active, everything else pending.
    pub async fn reset(&self) {
        let steps = self.steps.clone();
        let first = self.first_step;
        self.mutate(move |p| *p = Progress::initial(&steps, first)).await;
    }

    pub async fn snapshot(&self) -> Progress {
        self.state.read().await.clone()
    }

    pub async fn current_step(&self) -> u32 {
        self.state.read().await.current_step
    }

    pub async fn status(&self, step: u32) -> Option<StepStatus> {
        self.state.read().await.status(step)
    }

    pub async fn panel(&self) -> PanelVisibility {
        self.state.read().await.panel
    }

    /// The blob currently in durable storage, for diagnostics.
    pub async fn raw_persisted(&self) -> Option<String> {
        match self.storage.get(storage_keys::PROGRESS).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Failed to read guide progress: {}", e);
                None
            }
        }
    }

    fn ensure_known(&self, step: u32) -> Result<(), GuideError> {
        if self.steps.contains(&step) {
            Ok(())
        } else {
            Err(GuideError::UnknownStep(step))
        }
    }

    /// Apply `change` and write the result through. The write guard is held
    /// until storage acknowledges, so blobs land in mutation order.
    async fn mutate(&self, change: impl FnOnce(&mut Progress)) {
        let mut state = self.state.write().await;
        change(&mut state);
        match serde_json::to_string(&*state) {
            Ok(json) => {
                if let Err(e) = self.storage.set(storage_keys::PROGRESS, &json).await {
                    warn!("Failed to persist guide progress: {}", e);
                }
            }
            Err(e) => warn!("Failed to serialize guide progress: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Step, default_catalog};
    use crate::progress::TrainingState;
    use crate::error::StorageError;
    use crate::store::MemoryStorage;

    /// Storage that holds back the writes `slow_if` picks.
    struct SlowWrites {
        inner: MemoryStorage,
        slow_if: fn(&str) -> bool,
    }

    #[async_trait::async_trait]
    impl KeyValueStorage for SlowWrites {
        async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            if (self.slow_if)(value) {
                tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            }
            self.inner.set(key, value).await
        }

        async fn remove(&self, key: &str) -> Result<bool, StorageError> {
            self.inner.remove(key).await
        }
    }

    async fn store_with(storage: Arc<MemoryStorage>) -> ProgressStore {
        let catalog = default_catalog().unwrap();
        ProgressStore::load(storage, &catalog).await
    }

    #[tokio::test]
    async fn fresh_store_starts_at_step_one() {
        let store = store_with(Arc::new(MemoryStorage::new())).await;
        let p = store.snapshot().await;
        assert_eq!(p.current_step, 1);
        assert_eq!(p.active_steps(), vec![1]);
        assert_eq!(p.panel, PanelVisibility::default());
    }

    #[tokio::test]
    async fn mutations_are_persisted_and_reloaded() {
        let storage = Arc::new(MemoryStorage::new());
        {
            let store = store_with(Arc::clone(&storage)).await;
            store.select_step(3).await.unwrap();
            store.complete_step(2).await.unwrap();
            store.select_platform(Some("kubernetes".to_string())).await;
            store.record_route("/metrics?tab=model").await;
            store.apply_visibility(VisibilityChange::ShowContent).await;
        }

        let store = store_with(storage).await;
        let p = store.snapshot().await;
        assert_eq!(p.current_step, 3);
        assert_eq!(p.status(2), Some(StepStatus::Completed));
        assert_eq!(p.platform_selection.as_deref(), Some("kubernetes"));
        assert_eq!(p.last_visited_route, "/metrics?tab=model");
        // Visibility is never persisted.
        assert_eq!(p.panel, PanelVisibility::default());
    }

    #[tokio::test]
    async fn unknown_step_is_rejected() {
        let store = store_with(Arc::new(MemoryStorage::new())).await;
        assert!(matches!(store.select_step(42).await, Err(GuideError::UnknownStep(42))));
        assert_eq!(store.current_step().await, 1);
    }

    #[tokio::test]
    async fn deprecated_field_is_stripped_and_rewritten() {
        let blob = r#"{"currentStep":2,"stepStatusMap":{"1":"completed","2":"active"},"platformSelection":null,"lastVisitedRoute":"/projects","isVisible":true}"#;
        let storage = Arc::new(MemoryStorage::with_value(storage_keys::PROGRESS, blob));
        let store = store_with(Arc::clone(&storage)).await;

        let raw = storage.get(storage_keys::PROGRESS).await.unwrap().unwrap();
        assert!(!raw.contains(DEPRECATED_VISIBILITY_FIELD));
        let p = store.snapshot().await;
        assert_eq!(p.current_step, 2);
        assert_eq!(p.status(1), Some(StepStatus::Completed));
        assert!(!serde_json::to_string(&p).unwrap().contains(DEPRECATED_VISIBILITY_FIELD));
    }

    #[tokio::test]
    async fn corrupt_blob_falls_back_to_defaults() {
        let storage = Arc::new(MemoryStorage::with_value(storage_keys::PROGRESS, "{not json"));
        let store = store_with(storage).await;
        assert_eq!(store.current_step().await, 1);

        let wrong_shape = Arc::new(MemoryStorage::with_value(storage_keys::PROGRESS, r#"{"currentStep":"two"}"#));
        let store = store_with(wrong_shape).await;
        assert_eq!(store.snapshot().await.active_steps(), vec![1]);
    }

    #[tokio::test]
    async fn reset_returns_to_initial_state() {
        let store = store_with(Arc::new(MemoryStorage::new())).await;
        store.select_step(5).await.unwrap();
        store.complete_step(5).await.unwrap();
        store.reset().await;
        let p = store.snapshot().await;
        assert_eq!(p.current_step, 1);
        assert_eq!(p.active_steps(), vec![1]);
    }

    #[tokio::test]
    async fn domain_updates_stay_in_memory() {
        let storage = Arc::new(MemoryStorage::new());
        let store = store_with(Arc::clone(&storage)).await;
        store
            .update_domain(|d| d.training_state = TrainingState::Running)
            .await;
        assert_eq!(
            store.snapshot().await.domain.training_state,
            TrainingState::Running
        );
        assert!(storage.get(storage_keys::PROGRESS).await.unwrap().is_none());
    }

    #[test]
    fn migrate_blob_classifies() {
        assert!(matches!(migrate_blob(r#"{"currentStep":1}"#), BlobMigration::Clean(_)));
        assert!(matches!(migrate_blob("[1,2]"), BlobMigration::Corrupt(_)));
        match migrate_blob(r#"{"currentStep":1,"isVisible":false}"#) {
            BlobMigration::Stripped { rewritten, .. } => assert_eq!(rewritten, r#"{"currentStep":1}"#),
            other => panic!("expected stripped, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn load_with_custom_catalog() {
        let catalog = Catalog::new(vec![Step::new(10, "Only", "/only")]).unwrap();
        let store = ProgressStore::load(Arc::new(MemoryStorage::new()), &catalog).await;
        assert_eq!(store.current_step().await, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_mutations_persist_in_order() {
        let storage = Arc::new(SlowWrites {
            inner: MemoryStorage::new(),
            slow_if: |blob| blob.contains(r#""currentStep":2"#),
        });
        let store = ProgressStore::load(storage, &default_catalog().unwrap()).await;

        let (second, third) = tokio::join!(store.select_step(2), store.select_step(3));
        second.unwrap();
        third.unwrap();

        assert_eq!(store.current_step().await, 3);
        let persisted: Progress =
            serde_json::from_str(&store.raw_persisted().await.unwrap()).unwrap();
        assert_eq!(persisted.current_step, 3);
        assert_eq!(persisted.active_steps(), vec![3]);
    }
}
