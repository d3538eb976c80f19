//! DebugConsole: operator callables over a running guide.

use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use tracing::info;

use super::command::{CommandParser, ConsoleCommand, HELP};
use crate::dispatcher::{DispatchOutcome, GuideEngine, TriggerOutcome};
use crate::host::guide_nodes;
use crate::progress::{BlobMigration, PanelVisibility, StepStatus, migrate_blob};

/// Result of a quick diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticReport {
    /// The stored progress blob still carries the retired visibility field.
    pub deprecated_field_present: bool,
    /// The stored progress blob cannot be parsed.
    pub corrupt_progress: bool,
    pub visible_guide_nodes: Vec<String>,
    /// Guide nodes on screen that the guide's own state says should be hidden.
    pub unexpected_guide_nodes: Vec<String>,
    pub current_step: u32,
    pub active_steps: Vec<u32>,
    pub manual_triggers: Vec<String>,
    pub location: String,
    pub issues: Vec<String>,
}

impl DiagnosticReport {
    pub fn is_healthy(&self) -> bool {
        self.issues.is_empty()
    }
}

/// A diagnostic followed by a log export.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnoseAndExport {
    pub report: DiagnosticReport,
    pub export_path: Option<PathBuf>,
}

/// What the console prints back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleReply {
    Output(String),
    Quit,
}

/// Debug callables over a shared [`GuideEngine`].
#[derive(Clone)]
pub struct DebugConsole {
    engine: Arc<GuideEngine>,
}

impl DebugConsole {
    pub fn new(engine: Arc<GuideEngine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Arc<GuideEngine> {
        &self.engine
    }

    /// Export telemetry for the collection window or the recent default range.
    pub async fn export_logs(&self) -> Option<PathBuf> {
        self.engine.telemetry().export_logs().await
    }

    /// Look for the two known failure signatures: a stale persisted field and
    /// guide nodes left visible.
    pub async fn quick_diagnose(&self) -> DiagnosticReport {
        let (deprecated_field_present, corrupt_progress) =
            match self.engine.progress().raw_persisted().await.as_deref().map(migrate_blob) {
                Some(BlobMigration::Stripped { .. }) => (true, false),
                Some(BlobMigration::Corrupt(_)) => (false, true),
                Some(BlobMigration::Clean(_)) | None => (false, false),
            };

        let progress = self.engine.progress().snapshot().await;
        let tooltip_active = self.engine.active_tooltip_view().is_some();
        let host = self.engine.host();

        let mut visible_guide_nodes = Vec::new();
        let mut unexpected_guide_nodes = Vec::new();
        for selector in guide_nodes::ALL {
            let shown = host.query_selector(selector).is_some_and(|e| e.visible);
            if !shown {
                continue;
            }
            visible_guide_nodes.push(selector.to_string());
            if !node_expected(selector, progress.panel, tooltip_active) {
                unexpected_guide_nodes.push(selector.to_string());
            }
        }

        let mut issues = Vec::new();
        if deprecated_field_present {
            issues.push("persisted progress still carries the deprecated visibility field".to_string());
        }
        if corrupt_progress {
            issues.push("persisted progress cannot be parsed".to_string());
        }
        for node in &unexpected_guide_nodes {
            issues.push(format!("guide node {node} is visible unexpectedly"));
        }

        let report = DiagnosticReport {
            deprecated_field_present,
            corrupt_progress,
            visible_guide_nodes,
            unexpected_guide_nodes,
            current_step: progress.current_step,
            active_steps: progress.active_steps(),
            manual_triggers: self.engine.manual_triggers().ids().await,
            location: host.current_location().full_url(),
            issues,
        };

        info!(healthy = report.is_healthy(), issues = report.issues.len(), "Guide diagnostic run");
        self.engine
            .telemetry()
            .track("diagnostic_run", json!({ "issues": report.issues }))
            .await;
        report
    }

    pub async fn diagnose_and_export(&self) -> DiagnoseAndExport {
        let report = self.quick_diagnose().await;
        let export_path = self.export_logs().await;
        DiagnoseAndExport {
            report,
            export_path,
        }
    }

    /// Select step `number` as if its entry in the guide panel was clicked.
    pub async fn simulate_step_click(&self, number: u32) -> DispatchOutcome {
        info!(step = number, "Simulating guide step click");
        self.engine
            .telemetry()
            .track("debug_step_click", json!({ "step": number }))
            .await;
        self.engine.select_step(number).await
    }

    /// Run one line of the console command language.
    pub async fn execute(&self, line: &str) -> ConsoleReply {
        let output = match CommandParser::parse(line) {
            ConsoleCommand::Quit => return ConsoleReply::Quit,
            ConsoleCommand::Help => HELP.to_string(),
            ConsoleCommand::Usage(usage) => format!("usage: {usage}"),
            ConsoleCommand::Unknown(input) => format!("unknown command: {input} (try `help`)"),
            ConsoleCommand::Status => self.status_text().await,
            ConsoleCommand::Click { step } => match self.simulate_step_click(step).await {
                DispatchOutcome::UnknownStep => format!("no step {step}"),
                DispatchOutcome::Dispatched { navigated: true } => format!("step {step} selected, navigating"),
                DispatchOutcome::Dispatched { navigated: false } => format!("step {step} selected"),
            },
            ConsoleCommand::Trigger { step, feature } => {
                match self.engine.trigger_feature(step, &feature).await {
                    TriggerOutcome::UnknownStep => format!("no step {step}"),
                    TriggerOutcome::UnknownFeature => format!("no feature {feature} in step {step}"),
                    TriggerOutcome::PrerequisitesUnmet { missing } => {
                        format!("{feature} needs {} first", missing.join(", "))
                    }
                    TriggerOutcome::Triggered { .. } => format!("{feature} triggered"),
                }
            }
            ConsoleCommand::Manual { feature } => {
                if self.engine.record_manual_trigger(&feature).await {
                    format!("{feature} recorded as used")
                } else {
                    format!("{feature} was already recorded")
                }
            }
            ConsoleCommand::Complete { step } => {
                if self.engine.complete_step(step).await {
                    format!("step {step} completed")
                } else {
                    format!("no step {step}")
                }
            }
            ConsoleCommand::Error { step } => {
                if self.engine.mark_step_error(step).await {
                    format!("step {step} flagged")
                } else {
                    format!("no step {step}")
                }
            }
            ConsoleCommand::Dismiss => {
                if self.engine.dismiss_tooltip() {
                    "tooltip dismissed".to_string()
                } else {
                    "no tooltip on screen".to_string()
                }
            }
            ConsoleCommand::Panel(change) => {
                let panel = self.engine.set_visibility(change).await;
                format!("panel {}, content {}", shown(panel.panel_visible), shown(panel.content_visible))
            }
            ConsoleCommand::Diagnose => report_text(&self.quick_diagnose().await),
            ConsoleCommand::Export => export_text(self.export_logs().await),
            ConsoleCommand::DiagnoseExport => {
                let result = self.diagnose_and_export().await;
                format!("{}\n{}", report_text(&result.report), export_text(result.export_path))
            }
            ConsoleCommand::CollectStart => {
                let window = self.engine.telemetry().start_collection().await;
                format!("collecting since {}", window.started_at.to_rfc3339())
            }
            ConsoleCommand::CollectStop => match self.engine.telemetry().stop_collection().await {
                Some(window) => format!(
                    "collection window {} .. {}",
                    window.started_at.to_rfc3339(),
                    window.stopped_at.map(|t| t.to_rfc3339()).unwrap_or_default()
                ),
                None => "no collection window open".to_string(),
            },
            ConsoleCommand::Restart => match self.engine.restart().await {
                DispatchOutcome::UnknownStep => "restart failed".to_string(),
                DispatchOutcome::Dispatched { .. } => "tour restarted".to_string(),
            },
        };
        ConsoleReply::Output(output)
    }

    async fn status_text(&self) -> String {
        let snapshot = self.engine.snapshot().await;
        let mut out = String::new();
        let _ = writeln!(out, "location: {}", snapshot.location);
        let _ = writeln!(out, "current step: {}", snapshot.progress.current_step);
        for step in self.engine.catalog().steps() {
            let status = snapshot
                .progress
                .status(step.number)
                .unwrap_or(StepStatus::Pending);
            let _ = writeln!(out, "  {:>2}. {:<32} {}", step.number, step.title, status);
        }
        let tooltip = snapshot
            .active_tooltip
            .map(|t| format!("{} (step {})", t.feature_id, t.step))
            .unwrap_or_else(|| "none".to_string());
        let _ = writeln!(out, "tooltip: {tooltip}");
        let _ = writeln!(out, "manual triggers: {}", snapshot.manual_triggers.join(", "));
        let _ = write!(out, "pending tasks: {}", snapshot.pending_tasks);
        out
    }
}

fn node_expected(selector: &str, panel: PanelVisibility, tooltip_active: bool) -> bool {
    match selector {
        guide_nodes::TOOLTIP | guide_nodes::HIGHLIGHT => tooltip_active,
        guide_nodes::PANEL => panel.panel_visible,
        guide_nodes::PANEL_CONTENT => panel.content_visible,
        _ => true,
    }
}

fn shown(visible: bool) -> &'static str {
    if visible { "shown" } else { "hidden" }
}

fn report_text(report: &DiagnosticReport) -> String {
    if report.is_healthy() {
        format!("ok: step {} active, no issues", report.current_step)
    } else {
        let mut out = format!("{} issue(s):", report.issues.len());
        for issue in &report.issues {
            out.push_str("\n  - ");
            out.push_str(issue);
        }
        out
    }
}

fn export_text(path: Option<PathBuf>) -> String {
    match path {
        Some(path) => format!("logs exported to {}", path.display()),
        None => "log export failed (see log)".to_string(),
    }
}
