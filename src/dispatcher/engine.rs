//! GuideEngine: the context object tying catalog, progress, host and
//! telemetry together, and the dispatcher that drives navigation and
//! highlighting.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use serde_json::json;
use tokio::time::{MissedTickBehavior, interval, sleep};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::navigation::{NavigationPlan, plan_navigation};
use super::outcome::{DispatchOutcome, HighlightOutcome, TriggerOutcome};
use crate::catalog::{ActionKind, Catalog, Feature, default_catalog};
use crate::config::GuideConfig;
use crate::error::Result;
use crate::geometry::{Placement, Size, compute_placement};
use crate::host::{Host, Location, TooltipView};
use crate::progress::{
    DomainProgress, PanelVisibility, Progress, ProgressStore, VisibilityChange,
};
use crate::store::KeyValueStorage;
use crate::suppression::ManualTriggerSet;
use crate::tasks::{TaskGroup, TaskHandle};
use crate::telemetry::{LogExporter, TelemetryTracker};
use crate::wait::{wait_for_element, wait_for_page_ready};

/// Collaborators an engine is built over.
#[derive(Clone)]
pub struct GuideDeps {
    pub host: Arc<dyn Host>,
    pub storage: Arc<dyn KeyValueStorage>,
    pub exporter: Arc<dyn LogExporter>,
}

/// Everything a debug view wants to show at once.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuideSnapshot {
    pub progress: Progress,
    pub panel: PanelVisibility,
    pub domain: DomainProgress,
    pub location: Location,
    pub active_tooltip: Option<TooltipView>,
    pub manual_triggers: Vec<String>,
    pub pending_tasks: usize,
    pub session_id: Uuid,
}

/// The guide. Cheap to share as `Arc<GuideEngine>`; operations that schedule
/// delayed work take `self: &Arc<Self>` so the spawned task can hold the engine.
pub struct GuideEngine {
    config: GuideConfig,
    catalog: Catalog,
    host: Arc<dyn Host>,
    progress: ProgressStore,
    manual: ManualTriggerSet,
    telemetry: TelemetryTracker,
    /// Post-navigation checks and highlights of the current selection.
    step_tasks: TaskGroup,
    /// Pending tooltip removals.
    tooltip_tasks: TaskGroup,
    watcher: Mutex<Option<TaskHandle>>,
    active_tooltip: Mutex<Option<TooltipView>>,
}

impl GuideEngine {
    /// Build an engine over `catalog`, loading persisted progress and telemetry.
    pub async fn new(config: GuideConfig, catalog: Catalog, deps: GuideDeps) -> Arc<Self> {
        let progress = ProgressStore::load(Arc::clone(&deps.storage), &catalog).await;
        let telemetry = TelemetryTracker::new(
            Arc::clone(&deps.storage),
            deps.exporter,
            config.telemetry.clone(),
        )
        .await;

        info!(
            steps = catalog.len(),
            current = progress.current_step().await,
            "Guide engine ready"
        );

        Arc::new(Self {
            config,
            catalog,
            host: deps.host,
            progress,
            manual: ManualTriggerSet::new(),
            telemetry,
            step_tasks: TaskGroup::new(),
            tooltip_tasks: TaskGroup::new(),
            watcher: Mutex::new(None),
            active_tooltip: Mutex::new(None),
        })
    }

    /// Build an engine using the catalog named by `config.catalog_path`, or
    /// the built-in one.
    pub async fn from_config(config: GuideConfig, deps: GuideDeps) -> Result<Arc<Self>> {
        let catalog = resolve_catalog(&config).await?;
        Ok(Self::new(config, catalog, deps).await)
    }

    pub fn config(&self) -> &GuideConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn host(&self) -> &Arc<dyn Host> {
        &self.host
    }

    pub fn progress(&self) -> &ProgressStore {
        &self.progress
    }

    pub fn manual_triggers(&self) -> &ManualTriggerSet {
        &self.manual
    }

    pub fn telemetry(&self) -> &TelemetryTracker {
        &self.telemetry
    }

    // ── Step dispatch ───────────────────────────────────────────────

    /// Make step `number` current, route to its page and schedule the
    /// auto-highlight of its first feature.
    ///
    /// Pending work from any earlier selection is cancelled first. An unknown
    /// step is logged and otherwise ignored.
    pub async fn select_step(self: &Arc<Self>, number: u32) -> DispatchOutcome {
        let Some(step) = self.catalog.step(number) else {
            warn!(step = number, "Step not found in guide catalog");
            self.telemetry
                .track("step_not_found", json!({ "step": number }))
                .await;
            return DispatchOutcome::UnknownStep;
        };

        self.step_tasks.cancel_all();
        if let Err(e) = self.progress.select_step(number).await {
            warn!("Failed to select step {}: {}", number, e);
            return DispatchOutcome::UnknownStep;
        }
        self.telemetry
            .track("step_selected", json!({ "step": number, "title": step.title }))
            .await;

        let navigated = self.navigate_to(&step.location()).await;

        let engine = Arc::clone(self);
        self.step_tasks.spawn("post-navigation-check", async move {
            engine.after_step_navigation(number).await;
        });

        DispatchOutcome::Dispatched { navigated }
    }

    /// Settle, record where the page ended up, then auto-highlight the first
    /// feature unless the user already works the step by hand.
    async fn after_step_navigation(&self, number: u32) {
        sleep(self.config.navigation_settle_delay).await;

        let Some(step) = self.catalog.step(number) else {
            return;
        };
        let location = self.host.current_location();
        self.progress.record_route(&location.full_url()).await;
        if location.path != step.location().path {
            debug!(step = number, at = %location, "Page differs from step route after navigation");
        }

        let Some(first) = step.first_feature() else {
            debug!(step = number, "Step has no features to highlight");
            return;
        };

        sleep(self.config.auto_highlight_delay).await;

        if self.manual.any_marked_in(step).await {
            debug!(step = number, "Auto-highlight suppressed by manual trigger");
            self.telemetry
                .track("auto_highlight_suppressed", json!({ "step": number }))
                .await;
            return;
        }
        let missing = self.manual.unmet(&first.prerequisites).await;
        if !missing.is_empty() {
            debug!(step = number, feature = %first.id, ?missing, "Auto-highlight skipped, prerequisites unmet");
            return;
        }

        self.highlight_feature(number, &first.id).await;
    }

    // ── Feature dispatch ────────────────────────────────────────────

    /// The user picked a feature from the guide panel.
    pub async fn trigger_feature(self: &Arc<Self>, number: u32, feature_id: &str) -> TriggerOutcome {
        let Some(step) = self.catalog.step(number) else {
            warn!(step = number, "Step not found in guide catalog");
            return TriggerOutcome::UnknownStep;
        };
        let Some(feature) = step.feature(feature_id) else {
            warn!(step = number, feature = %feature_id, "Feature not found in guide catalog");
            self.telemetry
                .track("feature_not_found", json!({ "step": number, "feature": feature_id }))
                .await;
            return TriggerOutcome::UnknownFeature;
        };

        let missing: Vec<String> = self
            .manual
            .unmet(&feature.prerequisites)
            .await
            .into_iter()
            .map(str::to_string)
            .collect();
        if !missing.is_empty() {
            info!(step = number, feature = %feature.id, ?missing, "Feature prerequisites not met");
            self.telemetry
                .track(
                    "prerequisites_unmet",
                    json!({ "step": number, "feature": feature.id, "missing": missing }),
                )
                .await;
            return TriggerOutcome::PrerequisitesUnmet { missing };
        }

        self.step_tasks.cancel_all();
        self.manual.mark(&feature.id).await;
        self.telemetry
            .track(
                "feature_triggered",
                json!({ "step": number, "feature": feature.id, "action": feature.action }),
            )
            .await;

        let navigated = match feature.action {
            ActionKind::Navigation => self.navigate_to(&step.feature_location(feature)).await,
            ActionKind::Direct => false,
        };

        let engine = Arc::clone(self);
        let id = feature.id.clone();
        self.step_tasks.spawn("feature-highlight", async move {
            sleep(engine.config.click_highlight_delay).await;
            engine.highlight_feature(number, &id).await;
        });

        TriggerOutcome::Triggered { navigated }
    }

    /// The user acted on a feature's target directly, outside the guide.
    pub async fn record_manual_trigger(&self, feature_id: &str) -> bool {
        let newly = self.manual.mark(feature_id).await;
        if newly {
            self.telemetry
                .track("manual_trigger", json!({ "feature": feature_id }))
                .await;
        }
        newly
    }

    // ── Highlight ───────────────────────────────────────────────────

    /// Wait for the feature's target and point a tooltip at it.
    ///
    /// Replaces whatever tooltip is on screen. A target that never renders,
    /// or renders disabled, leaves no tooltip at all.
    pub async fn highlight_feature(&self, number: u32, feature_id: &str) -> HighlightOutcome {
        let Some(feature) = self.catalog.feature(number, feature_id) else {
            warn!(step = number, feature = %feature_id, "Feature not found in guide catalog");
            return HighlightOutcome::UnknownFeature;
        };

        let host = self.host.as_ref();
        if !wait_for_page_ready(host, self.config.element_poll_interval, self.config.page_ready_timeout).await {
            debug!(step = number, "Page not ready before timeout, highlighting anyway");
        }

        let Some(element) = wait_for_element(
            host,
            &feature.selector,
            self.config.element_poll_interval,
            self.config.element_timeout,
        )
        .await
        else {
            warn!(step = number, feature = %feature.id, selector = %feature.selector, "Highlight target not found");
            self.telemetry
                .track(
                    "highlight_target_missing",
                    json!({ "step": number, "feature": feature.id, "selector": feature.selector }),
                )
                .await;
            return HighlightOutcome::TargetNotFound;
        };

        if element.disabled && !feature.allow_disabled {
            warn!(step = number, feature = %feature.id, "Highlight target is disabled");
            return HighlightOutcome::TargetDisabled;
        }

        let placement = compute_placement(
            element.rect,
            self.config.tooltip_size,
            feature.side_or_default(),
            host.viewport(),
        );
        let view = tooltip_view(number, feature, placement, self.config.tooltip_size);

        // An aborted exit leaves the dismissed tooltip on screen.
        let exit_pending = self.tooltip_tasks.cancel_all() > 0;
        {
            let mut active = self.active_tooltip();
            if active.take().is_some() || exit_pending {
                host.remove_tooltip();
            }
            host.render_tooltip(&view);
            *active = Some(view);
        }

        debug!(step = number, feature = %feature.id, side = %placement.side, "Tooltip shown");
        self.telemetry
            .track("tooltip_shown", json!({ "step": number, "feature": feature.id }))
            .await;
        HighlightOutcome::Shown { placement }
    }

    /// Animate the tooltip out and remove it once the animation ends.
    pub fn dismiss_tooltip(self: &Arc<Self>) -> bool {
        if self.active_tooltip().take().is_none() {
            return false;
        }
        self.host.begin_tooltip_exit();
        let engine = Arc::clone(self);
        self.tooltip_tasks.spawn("tooltip-exit", async move {
            sleep(engine.config.tooltip_exit_delay).await;
            engine.host.remove_tooltip();
        });
        true
    }

    pub fn active_tooltip_view(&self) -> Option<TooltipView> {
        self.active_tooltip().clone()
    }

    fn remove_tooltip_now(&self) {
        let exit_pending = self.tooltip_tasks.cancel_all() > 0;
        if self.active_tooltip().take().is_some() || exit_pending {
            self.host.remove_tooltip();
        }
    }

    // ── Progress passthroughs ───────────────────────────────────────

    pub async fn complete_step(&self, number: u32) -> bool {
        match self.progress.complete_step(number).await {
            Ok(()) => {
                info!(step = number, "Step completed");
                self.telemetry
                    .track("step_completed", json!({ "step": number }))
                    .await;
                true
            }
            Err(e) => {
                warn!("Failed to complete step: {}", e);
                false
            }
        }
    }

    pub async fn mark_step_error(&self, number: u32) -> bool {
        match self.progress.mark_error(number).await {
            Ok(()) => {
                self.telemetry
                    .track("step_error", json!({ "step": number }))
                    .await;
                true
            }
            Err(e) => {
                warn!("Failed to flag step error: {}", e);
                false
            }
        }
    }

    pub async fn select_platform(&self, platform: Option<String>) {
        self.telemetry
            .track("platform_selected", json!({ "platform": platform }))
            .await;
        self.progress.select_platform(platform).await;
    }

    pub async fn update_domain(&self, update: impl FnOnce(&mut DomainProgress)) {
        self.progress.update_domain(update).await;
    }

    pub async fn set_visibility(&self, change: VisibilityChange) -> PanelVisibility {
        let panel = self.progress.apply_visibility(change).await;
        debug!(?change, ?panel, "Guide visibility changed");
        panel
    }

    /// Start the tour over from the first step.
    pub async fn restart(self: &Arc<Self>) -> DispatchOutcome {
        self.step_tasks.cancel_all();
        self.remove_tooltip_now();
        self.progress.reset().await;
        info!("Guide tour restarted");
        self.telemetry.track("tour_restarted", json!({})).await;
        self.select_step(self.catalog.first_step()).await
    }

    // ── URL watcher ─────────────────────────────────────────────────

    /// Follow the page's location from now on. Idempotent.
    pub fn start(self: &Arc<Self>) {
        let mut watcher = lock(&self.watcher);
        if watcher.as_ref().is_some_and(|w| !w.is_finished()) {
            return;
        }

        let mut changes = BroadcastStream::new(self.host.subscribe_navigation());
        let engine = Arc::clone(self);
        let poll_every = self.config.url_poll_interval;

        *watcher = Some(TaskHandle::spawn("url-watcher", async move {
            let mut last = engine.host.current_location();
            engine.on_location_change(&last).await;

            let mut poll = interval(poll_every);
            poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
            poll.tick().await;

            loop {
                let seen = tokio::select! {
                    change = changes.next() => match change {
                        Some(Ok(location)) => location,
                        Some(Err(e)) => {
                            debug!("Navigation events lagged: {}", e);
                            engine.host.current_location()
                        }
                        None => break,
                    },
                    _ = poll.tick() => engine.host.current_location(),
                };
                if seen != last {
                    engine.on_location_change(&seen).await;
                    last = seen;
                }
            }
            debug!("Navigation channel closed, URL watcher stopped");
        }));
        info!("Guide URL watcher started");
    }

    async fn on_location_change(&self, location: &Location) {
        let route = location.full_url();
        self.progress.record_route(&route).await;
        let matched = self.catalog.step_for_path(&location.path).map(|s| s.number);
        debug!(route = %route, step = ?matched, "Location changed");
        self.telemetry
            .track("route_changed", json!({ "route": route, "step": matched }))
            .await;
    }

    /// Tear down: stop the watcher, cancel every pending task, remove any tooltip.
    pub fn shutdown(&self) {
        if let Some(watcher) = lock(&self.watcher).take() {
            watcher.cancel();
        }
        let cancelled = self.step_tasks.cancel_all();
        self.remove_tooltip_now();
        info!(cancelled, "Guide engine shut down");
    }

    // ── Inspection ──────────────────────────────────────────────────

    /// Tasks scheduled but not yet run, excluding the watcher.
    pub fn pending_tasks(&self) -> usize {
        self.step_tasks.pending() + self.tooltip_tasks.pending()
    }

    pub fn is_watching(&self) -> bool {
        lock(&self.watcher).as_ref().is_some_and(|w| !w.is_finished())
    }

    pub async fn snapshot(&self) -> GuideSnapshot {
        let progress = self.progress.snapshot().await;
        GuideSnapshot {
            panel: progress.panel,
            domain: progress.domain.clone(),
            progress,
            location: self.host.current_location(),
            active_tooltip: self.active_tooltip_view(),
            manual_triggers: self.manual.ids().await,
            pending_tasks: self.pending_tasks(),
            session_id: self.telemetry.session_id(),
        }
    }

    // ── Helpers ─────────────────────────────────────────────────────

    /// Navigate to `target` unless already there. Returns whether it navigated.
    async fn navigate_to(&self, target: &Location) -> bool {
        match plan_navigation(target, &self.host.current_location()) {
            NavigationPlan::Stay => {
                debug!(route = %target, "Already on target route");
                false
            }
            NavigationPlan::Navigate(location) => {
                info!(route = %location, "Guide navigating");
                self.host.navigate(&location.path, location.query.as_deref()).await;
                true
            }
        }
    }

    fn active_tooltip(&self) -> MutexGuard<'_, Option<TooltipView>> {
        lock(&self.active_tooltip)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn tooltip_view(number: u32, feature: &Feature, placement: Placement, size: Size) -> TooltipView {
    TooltipView {
        step: number,
        feature_id: feature.id.clone(),
        title: feature.name.clone(),
        text: feature.hint_text().to_string(),
        placement,
        size,
    }
}

/// The catalog file named by `config.catalog_path`, or the built-in catalog.
pub async fn resolve_catalog(config: &GuideConfig) -> Result<Catalog> {
    let Some(path) = &config.catalog_path else {
        return Ok(default_catalog()?);
    };
    let catalog = Catalog::load(path).await?;
    info!(path = %path.display(), steps = catalog.len(), "Loaded guide catalog");
    Ok(catalog)
}
