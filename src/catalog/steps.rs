//! Built-in workflow for the operations console.
//!
//! Connections → projects → metric model → training task → fault-injection
//! simulation → notification strategy. Each feature points at a
//! `data-testid` the corresponding console page renders.

use super::model::{CommonIssue, Feature, Step, TooltipSide};
use super::registry::Catalog;
use crate::error::CatalogError;

fn testid(id: &str) -> String {
    format!("[data-testid=\"{id}\"]")
}

/// The default six-step console workflow.
pub fn default_steps() -> Vec<Step> {
    vec![
        Step::new(1, "Connect a data source", "/connections")
            .with_icon("link")
            .with_description(
                "Register the cluster or database the platform will observe and verify it is reachable.",
            )
            .with_feature(
                Feature::navigation("new-connection", "New connection", &testid("new-connection-btn"))
                    .with_tooltip("Start here: create a connection to your cluster or data store.")
                    .with_side(TooltipSide::Bottom),
            )
            .with_feature(
                Feature::direct("test-connection", "Test connection", &testid("test-connection-btn"))
                    .with_tooltip("Check that the platform can reach the endpoint with these credentials.")
                    .requires(&["new-connection"]),
            )
            .with_feature(
                Feature::direct("delete-connection", "Delete connection", &testid("delete-connection-btn"))
                    .with_description("Select a row in the table before deleting.")
                    .with_side(TooltipSide::Left)
                    .allow_disabled(),
            )
            .with_criteria(&[
                "At least one connection exists",
                "The connection health check reports healthy",
            ])
            .with_issue(
                CommonIssue::new(
                    "Connection test times out",
                    "Confirm the endpoint is reachable from the platform network and the port is open.",
                )
                .with_action("test-connection"),
            )
            .with_issue(CommonIssue::new(
                "Authentication rejected",
                "Re-enter the credentials; tokens copied with trailing whitespace are rejected.",
            )),
        Step::new(2, "Create a project", "/projects")
            .with_icon("folder")
            .with_description("Group the resources you want to analyse under a project bound to a connection.")
            .with_feature(
                Feature::navigation("new-project", "New project", &testid("new-project-btn"))
                    .with_tooltip("Create a project to hold your data sources and models.")
                    .with_side(TooltipSide::Bottom),
            )
            .with_feature(
                Feature::direct("bind-connection", "Bind connection", &testid("project-connection-select"))
                    .with_tooltip("Pick the connection this project reads from.")
                    .requires(&["new-project"])
                    .with_side(TooltipSide::Right),
            )
            .with_criteria(&["A project exists", "The project is bound to a healthy connection"])
            .with_issue(CommonIssue::new(
                "Connection missing from the dropdown",
                "Only healthy connections are listed; fix the connection in step 1 first.",
            )),
        Step::new(3, "Configure the metric model", "/metrics?tab=model")
            .with_icon("chart")
            .with_description("Map raw metrics from the data source into the model the detectors train on.")
            .with_feature(
                Feature::navigation("new-metric-model", "New metric model", &testid("new-metric-model-btn"))
                    .with_tooltip("Define which metrics feed anomaly detection.")
                    .with_side(TooltipSide::Bottom),
            )
            .with_feature(
                Feature::direct("map-metric-fields", "Map fields", &testid("metric-field-mapping"))
                    .with_tooltip("Map each source column to a metric dimension.")
                    .requires(&["new-metric-model"])
                    .with_side(TooltipSide::Right),
            )
            .with_feature(
                Feature::navigation("validate-source", "Validate data source", &testid("validate-source-btn"))
                    .with_route("/metrics?tab=sources")
                    .with_tooltip("Run validation to confirm the source returns samples."),
            )
            .with_criteria(&[
                "The data source validates",
                "Every required dimension is mapped",
            ])
            .with_issue(
                CommonIssue::new(
                    "Validation returns no samples",
                    "Widen the time range or check that the source query matches existing series.",
                )
                .with_action("validate-source"),
            ),
        Step::new(4, "Train a detection task", "/tasks/training")
            .with_icon("cpu")
            .with_description("Train the anomaly detector on the metric model's history.")
            .with_feature(
                Feature::navigation("new-training-task", "New training task", &testid("new-training-task-btn"))
                    .with_tooltip("Create a training task for the metric model.")
                    .with_side(TooltipSide::Bottom),
            )
            .with_feature(
                Feature::direct("start-training", "Start training", &testid("start-training-btn"))
                    .with_tooltip("Select the task row, then start training.")
                    .requires(&["new-training-task"])
                    .allow_disabled(),
            )
            .with_criteria(&["A training task reaches the completed state"])
            .with_issue(CommonIssue::new(
                "Training fails immediately",
                "The metric model needs at least a day of history; extend the training window.",
            )),
        Step::new(5, "Simulate a fault injection", "/injection?mode=simulate")
            .with_icon("zap")
            .with_description("Replay a synthetic fault to confirm the detector and alerting fire.")
            .with_feature(
                Feature::navigation("new-injection-rule", "New injection rule", &testid("new-injection-rule-btn"))
                    .with_tooltip("Describe the fault to inject: target, magnitude and duration.")
                    .with_side(TooltipSide::Bottom),
            )
            .with_feature(
                Feature::direct("run-simulation", "Run simulation", &testid("run-simulation-btn"))
                    .with_tooltip("Run the rule in simulation mode; nothing touches production.")
                    .requires(&["new-injection-rule"])
                    .allow_disabled(),
            )
            .with_criteria(&["A simulation completes and produces at least one detection"])
            .with_issue(
                CommonIssue::new(
                    "Simulation produces no detections",
                    "Raise the injected magnitude or check that the trained task covers the target metric.",
                )
                .with_action("run-simulation"),
            ),
        Step::new(6, "Set up notifications", "/notifications")
            .with_icon("bell")
            .with_description("Route detections to the people who act on them.")
            .with_feature(
                Feature::navigation("new-strategy", "New notification strategy", &testid("new-strategy-btn"))
                    .with_tooltip("Create a strategy that decides who is notified and when.")
                    .with_side(TooltipSide::Bottom),
            )
            .with_feature(
                Feature::navigation("bind-accounts", "Bind accounts", &testid("strategy-accounts-select"))
                    .with_route("/accounts")
                    .with_tooltip("Attach the accounts that receive notifications.")
                    .requires(&["new-strategy"]),
            )
            .with_criteria(&["A strategy exists with at least one bound account"]),
    ]
}

/// Build the validated default catalog.
pub fn default_catalog() -> Result<Catalog, CatalogError> {
    Catalog::new(default_steps())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ActionKind;

    #[test]
    fn default_catalog_validates() {
        let catalog = default_catalog().unwrap();
        assert_eq!(catalog.step_numbers(), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn every_step_has_a_first_feature() {
        let catalog = default_catalog().unwrap();
        for step in catalog.steps() {
            let first = step.first_feature().expect("step without features");
            assert_eq!(first.action, ActionKind::Navigation, "step {}", step.number);
            assert!(first.prerequisites.is_empty(), "step {}", step.number);
        }
    }

    #[test]
    fn query_routes_are_present() {
        let catalog = default_catalog().unwrap();
        let with_query: Vec<u32> = catalog
            .steps()
            .iter()
            .filter(|s| s.location().query.is_some())
            .map(|s| s.number)
            .collect();
        assert_eq!(with_query, vec![3, 5]);
    }

    #[test]
    fn selectors_use_test_ids() {
        let catalog = default_catalog().unwrap();
        let feature = catalog.feature(1, "new-connection").unwrap();
        assert_eq!(feature.selector, "[data-testid=\"new-connection-btn\"]");
    }
}
