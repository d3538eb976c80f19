//! Diagnostics tracker: an append-only side channel of guide events.
//!
//! Events are kept in a bounded ring buffer mirrored to durable storage so a
//! support export can include what happened before a reload. Nothing in the
//! guide ever reads them back to make a decision.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{TelemetryConfig, storage_keys};
use crate::error::ExportError;
use crate::store::KeyValueStorage;

/// User id recorded when storage holds none.
pub const ANONYMOUS_USER: &str = "anonymous";

/// One recorded event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryEvent {
    pub name: String,
    pub properties: Value,
    pub timestamp: DateTime<Utc>,
    pub session_id: Uuid,
    pub user_id: String,
}

/// A start/stop range narrowing what the next export includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionWindow {
    pub started_at: DateTime<Utc>,
    pub stopped_at: Option<DateTime<Utc>>,
}

/// A named export ready to be written.
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub file_name: String,
    pub contents: String,
    pub event_count: usize,
}

/// Destination for export artifacts.
#[async_trait]
pub trait LogExporter: Send + Sync {
    /// Write the artifact, returning where it went.
    async fn write(&self, artifact: &ExportArtifact) -> Result<PathBuf, ExportError>;
}

/// Writes artifacts into a directory.
pub struct FileExporter {
    dir: PathBuf,
}

impl FileExporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl LogExporter for FileExporter {
    async fn write(&self, artifact: &ExportArtifact) -> Result<PathBuf, ExportError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(&artifact.file_name);
        tokio::fs::write(&path, &artifact.contents)
            .await
            .map_err(|e| ExportError::Write {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        Ok(path)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportDocument<'a> {
    session_id: Uuid,
    user_id: &'a str,
    exported_at: DateTime<Utc>,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    event_count: usize,
    events: Vec<&'a TelemetryEvent>,
}

/// Records guide events for later export.
pub struct TelemetryTracker {
    storage: Arc<dyn KeyValueStorage>,
    exporter: Arc<dyn LogExporter>,
    config: TelemetryConfig,
    session_id: Uuid,
    user_id: String,
    events: RwLock<VecDeque<TelemetryEvent>>,
    window: RwLock<Option<CollectionWindow>>,
}

impl TelemetryTracker {
    /// Create a tracker with a fresh session id, restoring events a previous
    /// session left in storage.
    pub async fn new(
        storage: Arc<dyn KeyValueStorage>,
        exporter: Arc<dyn LogExporter>,
        config: TelemetryConfig,
    ) -> Self {
        let user_id = match storage.get(storage_keys::USER_ID).await {
            Ok(Some(id)) if !id.trim().is_empty() => id.trim().to_string(),
            Ok(_) => ANONYMOUS_USER.to_string(),
            Err(e) => {
                warn!("Failed to read telemetry user id: {}", e);
                ANONYMOUS_USER.to_string()
            }
        };

        let mut events = Self::restore(storage.as_ref()).await;
        while events.len() > config.capacity {
            events.pop_front();
        }

        let session_id = Uuid::new_v4();
        info!(session = %session_id, user = %user_id, restored = events.len(), "Telemetry session started");

        Self {
            storage,
            exporter,
            config,
            session_id,
            user_id,
            events: RwLock::new(events),
            window: RwLock::new(None),
        }
    }

    async fn restore(storage: &dyn KeyValueStorage) -> VecDeque<TelemetryEvent> {
        let raw = match storage.get(storage_keys::TELEMETRY_EVENTS).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return VecDeque::new(),
            Err(e) => {
                warn!("Failed to read telemetry events: {}", e);
                return VecDeque::new();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(events) => events,
            Err(e) => {
                warn!("Discarding unreadable telemetry buffer: {}", e);
                VecDeque::new()
            }
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Record a named event with a property bag.
    pub async fn track(&self, name: &str, properties: Value) {
        let event = TelemetryEvent {
            name: name.to_string(),
            properties,
            timestamp: Utc::now(),
            session_id: self.session_id,
            user_id: self.user_id.clone(),
        };
        self.record(event).await;
    }

    /// Append an already-built event, evicting the oldest beyond capacity.
    pub async fn record(&self, event: TelemetryEvent) {
        debug!(event = %event.name, "Telemetry event");
        let mut events = self.events.write().await;
        events.push_back(event);
        while events.len() > self.config.capacity {
            events.pop_front();
        }
        match serde_json::to_string(&*events) {
            Ok(json) => {
                if let Err(e) = self.storage.set(storage_keys::TELEMETRY_EVENTS, &json).await {
                    warn!("Failed to persist telemetry events: {}", e);
                }
            }
            Err(e) => warn!("Failed to serialize telemetry events: {}", e),
        }
    }

    pub async fn events(&self) -> Vec<TelemetryEvent> {
        self.events.read().await.iter().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.events.read().await.is_empty()
    }

    /// Open a collection window starting now. Replaces any previous window.
    pub async fn start_collection(&self) -> CollectionWindow {
        let window = CollectionWindow {
            started_at: Utc::now(),
            stopped_at: None,
        };
        *self.window.write().await = Some(window);
        info!("Telemetry collection window started");
        window
    }

    /// Close the open window. `None` if none was started.
    pub async fn stop_collection(&self) -> Option<CollectionWindow> {
        let mut guard = self.window.write().await;
        let window = guard.as_mut()?;
        if window.stopped_at.is_none() {
            window.stopped_at = Some(Utc::now());
            info!("Telemetry collection window stopped");
        }
        Some(*window)
    }

    pub async fn window(&self) -> Option<CollectionWindow> {
        *self.window.read().await
    }

    /// Export events in the collection window, or in the default recent range
    /// when no window was opened. Failures are logged and yield `None`.
    pub async fn export_logs(&self) -> Option<PathBuf> {
        let (from, to) = match self.window().await {
            Some(w) => (w.started_at, w.stopped_at.unwrap_or_else(Utc::now)),
            None => (self.since(self.config.default_export_window), Utc::now()),
        };
        self.export_range(from, to).await
    }

    /// Export events from the last `range`.
    pub async fn export_recent(&self, range: Duration) -> Option<PathBuf> {
        self.export_range(self.since(range), Utc::now()).await
    }

    async fn export_range(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Option<PathBuf> {
        let artifact = match self.build_artifact(from, to).await {
            Ok(a) => a,
            Err(e) => {
                warn!("Failed to build telemetry export: {}", e);
                return None;
            }
        };
        match self.exporter.write(&artifact).await {
            Ok(path) => {
                info!(path = %path.display(), events = artifact.event_count, "Exported guide logs");
                Some(path)
            }
            Err(e) => {
                warn!("Failed to export guide logs: {}", e);
                None
            }
        }
    }

    /// Serialize the events with timestamps in `[from, to]`.
    pub async fn build_artifact(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<ExportArtifact, ExportError> {
        let events = self.events.read().await;
        let selected: Vec<&TelemetryEvent> = events
            .iter()
            .filter(|e| e.timestamp >= from && e.timestamp <= to)
            .collect();
        let exported_at = Utc::now();
        let document = ExportDocument {
            session_id: self.session_id,
            user_id: &self.user_id,
            exported_at,
            from,
            to,
            event_count: selected.len(),
            events: selected,
        };
        let contents = serde_json::to_string_pretty(&document).map_err(std::io::Error::from)?;
        Ok(ExportArtifact {
            file_name: format!("guide-logs-{}.json", exported_at.format("%Y%m%dT%H%M%S%.3fZ")),
            contents,
            event_count: document.event_count,
        })
    }

    fn since(&self, range: Duration) -> DateTime<Utc> {
        let range = chrono::Duration::from_std(range).unwrap_or(chrono::Duration::MAX);
        Utc::now()
            .checked_sub_signed(range)
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use crate::store::MemoryStorage;
    use std::sync::Mutex;

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

    /// Exporter that keeps artifacts in memory, or fails on demand.
    #[derive(Default)]
    struct CapturingExporter {
        fail: bool,
        written: Mutex<Vec<ExportArtifact>>,
    }

    #[async_trait]
    impl LogExporter for CapturingExporter {
        async fn write(&self, artifact: &ExportArtifact) -> Result<PathBuf, ExportError> {
            if self.fail {
                return Err(ExportError::Write {
                    path: PathBuf::from("/dev/full"),
                    reason: "disk full".to_string(),
                });
            }
            self.written.lock().unwrap().push(artifact.clone());
            Ok(PathBuf::from(&artifact.file_name))
        }
    }

    fn config(capacity: usize) -> TelemetryConfig {
        TelemetryConfig {
            capacity,
            ..TelemetryConfig::default()
        }
    }

    async fn tracker(
        storage: Arc<MemoryStorage>,
        exporter: Arc<CapturingExporter>,
        capacity: usize,
    ) -> TelemetryTracker {
        TelemetryTracker::new(storage, exporter, config(capacity)).await
    }

    fn event_at(tracker: &TelemetryTracker, name: &str, timestamp: DateTime<Utc>) -> TelemetryEvent {
        TelemetryEvent {
            name: name.to_string(),
            properties: serde_json::json!({}),
            timestamp,
            session_id: tracker.session_id(),
            user_id: tracker.user_id().to_string(),
        }
    }

    #[tokio::test]
    async fn user_id_defaults_to_anonymous() {
        let t = tracker(Arc::new(MemoryStorage::new()), Arc::default(), 10).await;
        assert_eq!(t.user_id(), ANONYMOUS_USER);

        let named = tracker(
            Arc::new(MemoryStorage::with_value(storage_keys::USER_ID, "ops-7")),
            Arc::default(),
            10,
        )
        .await;
        assert_eq!(named.user_id(), "ops-7");
        assert_ne!(t.session_id(), named.session_id());
    }

    #[tokio::test]
    async fn ring_buffer_keeps_most_recent() {
        let t = tracker(Arc::new(MemoryStorage::new()), Arc::default(), 3).await;
        for i in 0..5 {
            t.track(&format!("e{i}"), serde_json::json!({ "i": i })).await;
        }
        let names: Vec<String> = t.events().await.into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["e2", "e3", "e4"]);
    }

    #[tokio::test]
    async fn events_survive_a_new_session() {
        let storage = Arc::new(MemoryStorage::new());
        let first = tracker(Arc::clone(&storage), Arc::default(), 10).await;
        first.track("step_selected", serde_json::json!({ "step": 2 })).await;

        let second = tracker(storage, Arc::default(), 10).await;
        let events = second.events().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].session_id, first.session_id());
        assert_eq!(events[0].properties["step"], 2);
    }

    #[tokio::test]
    async fn export_defaults_to_recent_range() {
        let exporter = Arc::new(CapturingExporter::default());
        let t = tracker(Arc::new(MemoryStorage::new()), Arc::clone(&exporter), 10).await;
        t.record(event_at(&t, "old", Utc::now() - chrono::Duration::hours(2))).await;
        t.track("fresh", serde_json::json!({})).await;

        let path = t.export_logs().await.unwrap();
        assert!(path.to_string_lossy().starts_with("guide-logs-"));

        let written = exporter.written.lock().unwrap();
        assert_eq!(written[0].event_count, 1);
        let doc: Value = serde_json::from_str(&written[0].contents).unwrap();
        assert_eq!(doc["events"][0]["name"], "fresh");
        assert_eq!(doc["userId"], ANONYMOUS_USER);
    }

    #[tokio::test]
    async fn collection_window_narrows_export() {
        let exporter = Arc::new(CapturingExporter::default());
        let t = tracker(Arc::new(MemoryStorage::new()), Arc::clone(&exporter), 10).await;
        t.record(event_at(&t, "before", Utc::now() - chrono::Duration::seconds(30))).await;

        let window = t.start_collection().await;
        t.record(event_at(&t, "inside", window.started_at)).await;
        let closed = t.stop_collection().await.unwrap();
        t.record(event_at(&t, "after", closed.stopped_at.unwrap() + chrono::Duration::seconds(5)))
            .await;

        t.export_logs().await.unwrap();
        let written = exporter.written.lock().unwrap();
        let doc: Value = serde_json::from_str(&written[0].contents).unwrap();
        let names: Vec<&str> = doc["events"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|e| e["name"].as_str())
            .collect();
        assert_eq!(names, vec!["inside"]);
    }

    #[tokio::test]
    async fn stop_without_start_is_none() {
        let t = tracker(Arc::new(MemoryStorage::new()), Arc::default(), 10).await;
        assert!(t.stop_collection().await.is_none());
    }

    #[tokio::test]
    async fn export_failure_is_swallowed() {
        let exporter = Arc::new(CapturingExporter {
            fail: true,
            ..Default::default()
        });
        let t = tracker(Arc::new(MemoryStorage::new()), exporter, 10).await;
        t.track("x", serde_json::json!({})).await;
        assert!(t.export_logs().await.is_none());
    }

    #[tokio::test]
    async fn file_exporter_writes_named_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = Arc::new(FileExporter::new(dir.path().join("exports")));
        let t = TelemetryTracker::new(Arc::new(MemoryStorage::new()), exporter, config(10)).await;
        t.track("guide_started", serde_json::json!({})).await;

        let path = t.export_recent(Duration::from_secs(300)).await.unwrap();
        assert!(path.starts_with(dir.path().join("exports")));
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("guide_started"));
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_events_persist_in_order() {
        let storage = Arc::new(SlowWrites {
            inner: MemoryStorage::new(),
            slow_if: |blob| !blob.contains("\"second\""),
        });
        let t = TelemetryTracker::new(storage.clone(), Arc::new(CapturingExporter::default()), config(10)).await;

        tokio::join!(
            t.track("first", serde_json::json!({})),
            t.track("second", serde_json::json!({})),
        );

        let raw = storage.get(storage_keys::TELEMETRY_EVENTS).await.unwrap().unwrap();
        let persisted: Vec<TelemetryEvent> = serde_json::from_str(&raw).unwrap();
        let names: Vec<String> = persisted.into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["first", "second"]);
    }
}
