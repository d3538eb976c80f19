//! Step and feature definitions.

use serde::{Deserialize, Serialize};

use crate::host::Location;

/// How triggering a feature reaches its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Invoke an in-page affordance without navigating.
    Direct,
    /// Route to the feature's page first, then highlight.
    Navigation,
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Direct => write!(f, "direct"),
            Self::Navigation => write!(f, "navigation"),
        }
    }
}

/// Side of the target a tooltip is placed on.
///
/// Parsed leniently: anything unrecognized becomes `Top`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TooltipSide {
    #[default]
    Top,
    Bottom,
    Left,
    Right,
}

impl TooltipSide {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "bottom" => Self::Bottom,
            "left" => Self::Left,
            "right" => Self::Right,
            _ => Self::Top,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Bottom => "bottom",
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

impl From<String> for TooltipSide {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<TooltipSide> for String {
    fn from(side: TooltipSide) -> Self {
        side.as_str().to_string()
    }
}

impl std::fmt::Display for TooltipSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A known problem shown alongside a step. Display-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommonIssue {
    pub issue: String,
    pub solution: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

impl CommonIssue {
    pub fn new(issue: &str, solution: &str) -> Self {
        Self {
            issue: issue.to_string(),
            solution: solution.to_string(),
            action: None,
        }
    }

    pub fn with_action(mut self, action: &str) -> Self {
        self.action = Some(action.to_string());
        self
    }
}

/// One highlightable action inside a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feature {
    /// Unique within the owning step.
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// DOM selector of the target, e.g. `[data-testid="new-connection-btn"]`.
    pub selector: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,
    pub action: ActionKind,
    /// Overrides the step route for `navigation` features.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side: Option<TooltipSide>,
    /// Feature ids that must have been exercised before this one is guided.
    #[serde(default, rename = "prerequisiteSteps", skip_serializing_if = "Vec::is_empty")]
    pub prerequisites: Vec<String>,
    /// Highlight the target even while it is disabled (e.g. "select a row first").
    #[serde(default)]
    pub allow_disabled: bool,
}

impl Feature {
    fn new(id: &str, name: &str, selector: &str, action: ActionKind) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: String::new(),
            selector: selector.to_string(),
            tooltip: None,
            action,
            route: None,
            side: None,
            prerequisites: Vec::new(),
            allow_disabled: false,
        }
    }

    /// A feature reached by routing to its page first.
    pub fn navigation(id: &str, name: &str, selector: &str) -> Self {
        Self::new(id, name, selector, ActionKind::Navigation)
    }

    /// A feature invoked in place.
    pub fn direct(id: &str, name: &str, selector: &str) -> Self {
        Self::new(id, name, selector, ActionKind::Direct)
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_tooltip(mut self, tooltip: &str) -> Self {
        self.tooltip = Some(tooltip.to_string());
        self
    }

    pub fn with_route(mut self, route: &str) -> Self {
        self.route = Some(route.to_string());
        self
    }

    pub fn with_side(mut self, side: TooltipSide) -> Self {
        self.side = Some(side);
        self
    }

    pub fn requires(mut self, prerequisites: &[&str]) -> Self {
        self.prerequisites = prerequisites.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn allow_disabled(mut self) -> Self {
        self.allow_disabled = true;
        self
    }

    /// Text shown in the tooltip: the explicit tooltip, else the description, else the name.
    pub fn hint_text(&self) -> &str {
        match self.tooltip.as_deref() {
            Some(t) => t,
            None if !self.description.is_empty() => &self.description,
            None => &self.name,
        }
    }

    pub fn side_or_default(&self) -> TooltipSide {
        self.side.unwrap_or_default()
    }
}

/// One stage of the workflow, bound to a route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    /// Defines the sequence; unique across the catalog.
    pub number: u32,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// May carry a query fragment, e.g. `/metrics?tab=model`.
    pub route: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub features: Vec<Feature>,
    #[serde(default)]
    pub completion_criteria: Vec<String>,
    #[serde(default)]
    pub common_issues: Vec<CommonIssue>,
}

impl Step {
    pub fn new(number: u32, title: &str, route: &str) -> Self {
        Self {
            number,
            title: title.to_string(),
            description: String::new(),
            route: route.to_string(),
            icon: String::new(),
            features: Vec::new(),
            completion_criteria: Vec::new(),
            common_issues: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_icon(mut self, icon: &str) -> Self {
        self.icon = icon.to_string();
        self
    }

    pub fn with_feature(mut self, feature: Feature) -> Self {
        self.features.push(feature);
        self
    }

    pub fn with_criteria(mut self, criteria: &[&str]) -> Self {
        self.completion_criteria = criteria.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with_issue(mut self, issue: CommonIssue) -> Self {
        self.common_issues.push(issue);
        self
    }

    pub fn location(&self) -> Location {
        Location::parse(&self.route)
    }

    pub fn feature(&self, id: &str) -> Option<&Feature> {
        self.features.iter().find(|f| f.id == id)
    }

    /// The only feature eligible for auto-highlight.
    pub fn first_feature(&self) -> Option<&Feature> {
        self.features.first()
    }

    /// Route a feature navigates to: its own route, else the step's.
    pub fn feature_location(&self, feature: &Feature) -> Location {
        feature
            .route
            .as_deref()
            .map(Location::parse)
            .unwrap_or_else(|| self.location())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tooltip_side_parses_leniently() {
        assert_eq!(TooltipSide::parse("bottom"), TooltipSide::Bottom);
        assert_eq!(TooltipSide::parse(" Left "), TooltipSide::Left);
        assert_eq!(TooltipSide::parse("RIGHT"), TooltipSide::Right);
        assert_eq!(TooltipSide::parse("center"), TooltipSide::Top);
        assert_eq!(TooltipSide::parse(""), TooltipSide::Top);
    }

    #[test]
    fn tooltip_side_serde_accepts_unknown_values() {
        let side: TooltipSide = serde_json::from_str("\"sideways\"").unwrap();
        assert_eq!(side, TooltipSide::Top);
        assert_eq!(serde_json::to_string(&TooltipSide::Left).unwrap(), "\"left\"");
    }

    #[test]
    fn feature_json_uses_prerequisite_steps_key() {
        let json = r#"{
            "id": "test-connection",
            "name": "Test connection",
            "selector": "[data-testid=\"test-connection-btn\"]",
            "action": "direct",
            "prerequisiteSteps": ["new-connection"],
            "allowDisabled": true
        }"#;
        let feature: Feature = serde_json::from_str(json).unwrap();
        assert_eq!(feature.prerequisites, vec!["new-connection".to_string()]);
        assert!(feature.allow_disabled);
        assert_eq!(feature.action, ActionKind::Direct);
        assert!(feature.side.is_none());
    }

    #[test]
    fn hint_text_falls_back() {
        let bare = Feature::direct("a", "Alpha", "#a");
        assert_eq!(bare.hint_text(), "Alpha");
        let described = bare.clone().with_description("Does alpha");
        assert_eq!(described.hint_text(), "Does alpha");
        let tipped = described.with_tooltip("Click here");
        assert_eq!(tipped.hint_text(), "Click here");
    }

    #[test]
    fn feature_route_overrides_step_route() {
        let step = Step::new(1, "Connections", "/connections")
            .with_feature(Feature::navigation("new", "New", "#new").with_route("/connections/new?kind=k8s"))
            .with_feature(Feature::direct("delete", "Delete", "#delete"));

        let own = step.feature_location(step.feature("new").unwrap());
        assert_eq!(own.path, "/connections/new");
        assert_eq!(own.query.as_deref(), Some("kind=k8s"));

        let inherited = step.feature_location(step.feature("delete").unwrap());
        assert_eq!(inherited.path, "/connections");
        assert!(inherited.query.is_none());
    }
}
