//! Progress state machine: per-step status, workflow position, panel flags.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Visibility flag written by older releases. Stripped on load.
pub const DEPRECATED_VISIBILITY_FIELD: &str = "isVisible";

/// Status of one step.
///
/// Selecting a step is a full repaint: every step goes back to `Pending` and
/// the selected one becomes `Active`, so at most one step is ever active.
/// Completion touches only its own step. `Error` is only ever set from
/// outside, when a step's underlying data is found broken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Active,
    Completed,
    Error,
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Error => "error",
        };
        write!(f, "{s}")
    }
}

/// Health of the connection registered in the first step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionHealth {
    #[default]
    Unknown,
    Healthy,
    Unhealthy,
}

/// Lifecycle of a detector training task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingState {
    #[default]
    NotStarted,
    Running,
    Completed,
    Failed,
}

/// Lifecycle of a fault-injection simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationState {
    #[default]
    NotStarted,
    Running,
    Succeeded,
    Failed,
}

/// What the console pages have reported about the user's resources.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainProgress {
    pub connection_health: ConnectionHealth,
    /// `None` until the data source has been validated once.
    pub data_source_valid: Option<bool>,
    pub metric_model_complete: bool,
    pub training_state: TrainingState,
    pub simulation_state: SimulationState,
}

/// A requested change to the guide's side panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisibilityChange {
    ShowPanel,
    HidePanel,
    TogglePanel,
    ShowContent,
    HideContent,
}

/// Side panel and its expanded content. Content visible implies panel visible.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelVisibility {
    pub panel_visible: bool,
    pub content_visible: bool,
}

impl PanelVisibility {
    /// Apply a change, keeping both flags consistent.
    pub fn apply(&mut self, change: VisibilityChange) {
        match change {
            VisibilityChange::ShowPanel => self.panel_visible = true,
            VisibilityChange::HidePanel => {
                self.panel_visible = false;
                self.content_visible = false;
            }
            VisibilityChange::TogglePanel => {
                let next = if self.panel_visible {
                    VisibilityChange::HidePanel
                } else {
                    VisibilityChange::ShowPanel
                };
                self.apply(next);
            }
            VisibilityChange::ShowContent => {
                self.panel_visible = true;
                self.content_visible = true;
            }
            VisibilityChange::HideContent => self.content_visible = false,
        }
    }
}

/// Workflow progress. Only the camelCase fields are persisted; panel flags
/// always start hidden and domain progress is re-reported by the pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub current_step: u32,
    #[serde(rename = "stepStatusMap")]
    pub step_status: BTreeMap<u32, StepStatus>,
    #[serde(default)]
    pub platform_selection: Option<String>,
    #[serde(default)]
    pub last_visited_route: String,
    #[serde(skip)]
    pub domain: DomainProgress,
    #[serde(skip)]
    pub panel: PanelVisibility,
}

impl Progress {
    /// Initial state: `first` active, every other step pending.
    pub fn initial(steps: &[u32], first: u32) -> Self {
        let mut progress = Self {
            current_step: first,
            step_status: steps.iter().map(|n| (*n, StepStatus::Pending)).collect(),
            platform_selection: None,
            last_visited_route: String::new(),
            domain: DomainProgress::default(),
            panel: PanelVisibility::default(),
        };
        progress.select(first);
        progress
    }

    /// Make `step` the single active step. Every other status, including
    /// `Completed`, is reset to `Pending`.
    pub fn select(&mut self, step: u32) {
        for status in self.step_status.values_mut() {
            *status = StepStatus::Pending;
        }
        self.step_status.insert(step, StepStatus::Active);
        self.current_step = step;
    }

    /// Mark `step` completed without touching any other step.
    pub fn complete(&mut self, step: u32) {
        self.step_status.insert(step, StepStatus::Completed);
    }

    pub fn set_error(&mut self, step: u32) {
        self.step_status.insert(step, StepStatus::Error);
    }

    pub fn status(&self, step: u32) -> Option<StepStatus> {
        self.step_status.get(&step).copied()
    }

    pub fn active_steps(&self) -> Vec<u32> {
        self.step_status
            .iter()
            .filter(|(_, s)| **s == StepStatus::Active)
            .map(|(n, _)| *n)
            .collect()
    }

    /// Align a loaded record with the catalog: unknown steps dropped, missing
    /// ones pending, an unknown current step replaced by `first`, and no
    /// step other than the current one left active.
    pub fn reconcile(&mut self, steps: &[u32], first: u32) {
        self.step_status.retain(|n, _| steps.contains(n));
        for n in steps {
            self.step_status.entry(*n).or_insert(StepStatus::Pending);
        }
        if !steps.contains(&self.current_step) {
            self.select(first);
            return;
        }
        let current = self.current_step;
        for (n, status) in self.step_status.iter_mut() {
            if *n != current && *status == StepStatus::Active {
                *status = StepStatus::Pending;
            }
        }
        if self.status(current) == Some(StepStatus::Pending) {
            self.step_status.insert(current, StepStatus::Active);
        }
    }
}
