//! Host capabilities: everything the guide needs from the page it runs in.
//!
//! The engine never touches a document, history or location directly. A host
//! exposes the current URL, a navigation primitive, element lookup, a single
//! navigation-event channel and a place to render the tooltip. A browser
//! binding implements this trait; [`SimulatedHost`] implements it in memory.

pub mod simulated;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::geometry::{Placement, Rect, Size};

pub use simulated::SimulatedHost;

/// Path plus optional query string, without origin or fragment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

impl Location {
    pub fn new(path: &str, query: Option<&str>) -> Self {
        Self {
            path: normalize_path(path),
            query: query.filter(|q| !q.is_empty()).map(str::to_string),
        }
    }

    /// Parse a route or URL such as `/a?b=c` or `https://host/a?b=c#frag`.
    pub fn parse(url: &str) -> Self {
        let without_origin = match url.find("://") {
            Some(scheme_end) => {
                let rest = &url[scheme_end + 3..];
                rest.find('/').map(|i| &rest[i..]).unwrap_or("/")
            }
            None => url,
        };
        let without_fragment = without_origin
            .split_once('#')
            .map(|(before, _)| before)
            .unwrap_or(without_origin);

        match without_fragment.split_once('?') {
            Some((path, query)) => Self::new(path, Some(query)),
            None => Self::new(without_fragment, None),
        }
    }

    pub fn has_query(&self) -> bool {
        self.query.is_some()
    }

    /// `path?query`, or just `path`.
    pub fn full_url(&self) -> String {
        match &self.query {
            Some(q) => format!("{}?{}", self.path, q),
            None => self.path.clone(),
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.full_url())
    }
}

fn normalize_path(path: &str) -> String {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.len() > 1 && trimmed.ends_with('/') {
        trimmed.trim_end_matches('/').to_string()
    } else {
        trimmed.to_string()
    }
}

/// Document loading state, as `document.readyState` reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadyState {
    Loading,
    Interactive,
    Complete,
}

/// What the guide can learn about a matched element.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElementInfo {
    pub rect: Rect,
    pub disabled: bool,
    pub visible: bool,
}

impl ElementInfo {
    pub fn at(rect: Rect) -> Self {
        Self {
            rect,
            disabled: false,
            visible: true,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }
}

/// A tooltip ready to be drawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TooltipView {
    pub step: u32,
    pub feature_id: String,
    pub title: String,
    pub text: String,
    pub placement: Placement,
    pub size: Size,
}

/// Selectors of the nodes the guide itself renders.
pub mod guide_nodes {
    pub const TOOLTIP: &str = ".guide-tooltip";
    pub const HIGHLIGHT: &str = ".guide-highlight";
    pub const PANEL: &str = ".guide-panel";
    pub const PANEL_CONTENT: &str = ".guide-panel-content";

    pub const ALL: &[&str] = &[TOOLTIP, HIGHLIGHT, PANEL, PANEL_CONTENT];
}

/// Page capabilities consumed by the guide.
#[async_trait]
pub trait Host: Send + Sync {
    /// Where the page currently is.
    fn current_location(&self) -> Location;

    /// Route to `path`, with `query` when given.
    async fn navigate(&self, path: &str, query: Option<&str>);

    /// First element matching `selector`, if any is rendered.
    fn query_selector(&self, selector: &str) -> Option<ElementInfo>;

    fn ready_state(&self) -> ReadyState;

    fn viewport(&self) -> Size;

    /// Every location change, whoever caused it.
    fn subscribe_navigation(&self) -> broadcast::Receiver<Location>;

    /// Draw the tooltip and highlight its target. Replaces nothing by itself.
    fn render_tooltip(&self, view: &TooltipView);

    /// Start the exit animation of the current tooltip.
    fn begin_tooltip_exit(&self) {}

    /// Remove the current tooltip and highlight, if any.
    fn remove_tooltip(&self);
}
