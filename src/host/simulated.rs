//! In-memory host: a page model with routes, lazily rendered elements and a
//! tooltip layer. Drives the binary's headless mode and the test suite.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::debug;

use super::{ElementInfo, Host, Location, ReadyState, TooltipView, guide_nodes};
use crate::catalog::Catalog;
use crate::geometry::{Rect, Size};

const NAVIGATION_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
struct SimElement {
    selector: String,
    info: ElementInfo,
    /// Time after arriving on the page before the element exists.
    render_delay: Duration,
}

struct Inner {
    location: Location,
    arrived_at: Instant,
    viewport: Size,
    ready_delay: Duration,
    pages: HashMap<String, Vec<SimElement>>,
    /// Present on every page regardless of route.
    global: HashMap<String, ElementInfo>,
    navigations: Vec<Location>,
    rendered: Vec<TooltipView>,
    visible_tooltip: Option<TooltipView>,
    exits_started: usize,
}

/// A page model that answers [`Host`] calls from memory.
pub struct SimulatedHost {
    inner: Mutex<Inner>,
    nav_tx: broadcast::Sender<Location>,
}

impl SimulatedHost {
    /// A host sitting at `url` with a 1280×800 viewport and an immediately ready document.
    pub fn new(url: &str) -> Self {
        let (nav_tx, _rx) = broadcast::channel(NAVIGATION_CHANNEL_CAPACITY);
        Self {
            inner: Mutex::new(Inner {
                location: Location::parse(url),
                arrived_at: Instant::now(),
                viewport: Size::new(1280.0, 800.0),
                ready_delay: Duration::ZERO,
                pages: HashMap::new(),
                global: HashMap::new(),
                navigations: Vec::new(),
                rendered: Vec::new(),
                visible_tooltip: None,
                exits_started: 0,
            }),
            nav_tx,
        }
    }

    /// A host whose pages render every catalog feature target, laid out in a
    /// column down the left of the page.
    pub fn from_catalog(url: &str, catalog: &Catalog) -> Self {
        let host = Self::new(url);
        for step in catalog.steps() {
            for (i, feature) in step.features.iter().enumerate() {
                let location = step.feature_location(feature);
                let rect = Rect::new(40.0, 120.0 + 60.0 * i as f64, 160.0, 36.0);
                host.add_element(&location.path, &feature.selector, ElementInfo::at(rect));
            }
        }
        host
    }

    pub fn with_viewport(self, viewport: Size) -> Self {
        self.lock().viewport = viewport;
        self
    }

    /// The document reports `complete` only this long after each arrival.
    pub fn with_ready_delay(self, delay: Duration) -> Self {
        self.lock().ready_delay = delay;
        self
    }

    /// Render `selector` on `path` as soon as the page is entered.
    pub fn add_element(&self, path: &str, selector: &str, info: ElementInfo) {
        self.add_element_delayed(path, selector, info, Duration::ZERO);
    }

    /// Render `selector` on `path` only `delay` after the page is entered.
    pub fn add_element_delayed(&self, path: &str, selector: &str, info: ElementInfo, delay: Duration) {
        let path = Location::parse(path).path;
        let mut inner = self.lock();
        let elements = inner.pages.entry(path).or_default();
        elements.retain(|e| e.selector != selector);
        elements.push(SimElement {
            selector: selector.to_string(),
            info,
            render_delay: delay,
        });
    }

    /// Render `selector` on every page.
    pub fn add_global_element(&self, selector: &str, info: ElementInfo) {
        self.lock().global.insert(selector.to_string(), info);
    }

    /// The user navigates on their own; announced on the navigation channel.
    pub fn visit(&self, url: &str) {
        let location = Location::parse(url);
        self.arrive(location.clone());
        let _ = self.nav_tx.send(location);
    }

    /// The location changes without any announcement (e.g. a router that
    /// bypasses the navigation channel). Only a poll notices.
    pub fn set_location_silently(&self, url: &str) {
        self.arrive(Location::parse(url));
    }

    /// Navigations the guide asked for, in order.
    pub fn navigations(&self) -> Vec<Location> {
        self.lock().navigations.clone()
    }

    /// Every tooltip ever rendered, in order.
    pub fn rendered_tooltips(&self) -> Vec<TooltipView> {
        self.lock().rendered.clone()
    }

    /// The tooltip currently on screen.
    pub fn visible_tooltip(&self) -> Option<TooltipView> {
        self.lock().visible_tooltip.clone()
    }

    pub fn exits_started(&self) -> usize {
        self.lock().exits_started
    }

    fn arrive(&self, location: Location) {
        let mut inner = self.lock();
        inner.location = location;
        inner.arrived_at = Instant::now();
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Host for SimulatedHost {
    fn current_location(&self) -> Location {
        self.lock().location.clone()
    }

    async fn navigate(&self, path: &str, query: Option<&str>) {
        let location = Location::new(path, query);
        debug!(to = %location, "Simulated navigation");
        self.lock().navigations.push(location.clone());
        self.arrive(location.clone());
        let _ = self.nav_tx.send(location);
    }

    fn query_selector(&self, selector: &str) -> Option<ElementInfo> {
        let inner = self.lock();
        if let Some(info) = inner.global.get(selector) {
            return Some(*info);
        }
        if selector == guide_nodes::TOOLTIP || selector == guide_nodes::HIGHLIGHT {
            return inner
                .visible_tooltip
                .as_ref()
                .map(|view| ElementInfo::at(Rect::new(view.placement.left, view.placement.top, view.size.width, view.size.height)));
        }
        let elapsed = inner.arrived_at.elapsed();
        inner
            .pages
            .get(&inner.location.path)?
            .iter()
            .find(|e| e.selector == selector && elapsed >= e.render_delay)
            .map(|e| e.info)
    }

    fn ready_state(&self) -> ReadyState {
        let inner = self.lock();
        if inner.arrived_at.elapsed() >= inner.ready_delay {
            ReadyState::Complete
        } else {
            ReadyState::Loading
        }
    }

    fn viewport(&self) -> Size {
        self.lock().viewport
    }

    fn subscribe_navigation(&self) -> broadcast::Receiver<Location> {
        self.nav_tx.subscribe()
    }

    fn render_tooltip(&self, view: &TooltipView) {
        let mut inner = self.lock();
        inner.rendered.push(view.clone());
        inner.visible_tooltip = Some(view.clone());
    }

    fn begin_tooltip_exit(&self) {
        self.lock().exits_started += 1;
    }

    fn remove_tooltip(&self) {
        self.lock().visible_tooltip = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn delayed_elements_appear_after_arrival() {
        let host = SimulatedHost::new("/home");
        host.add_element_delayed(
            "/connections",
            "#new",
            ElementInfo::at(Rect::new(0.0, 0.0, 10.0, 10.0)),
            Duration::from_millis(300),
        );

        host.navigate("/connections", None).await;
        assert!(host.query_selector("#new").is_none());

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(host.query_selector("#new").is_some());

        host.navigate("/projects", None).await;
        assert!(host.query_selector("#new").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn ready_state_follows_delay() {
        let host = SimulatedHost::new("/").with_ready_delay(Duration::from_millis(500));
        host.visit("/projects");
        assert_eq!(host.ready_state(), ReadyState::Loading);
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(host.ready_state(), ReadyState::Complete);
    }

    #[tokio::test]
    async fn navigation_is_logged_and_announced() {
        let host = SimulatedHost::new("/");
        let mut rx = host.subscribe_navigation();

        host.navigate("/metrics", Some("tab=model")).await;
        host.visit("/accounts");

        assert_eq!(host.navigations(), vec![Location::new("/metrics", Some("tab=model"))]);
        assert_eq!(rx.recv().await.unwrap().full_url(), "/metrics?tab=model");
        assert_eq!(rx.recv().await.unwrap().path, "/accounts");
        assert_eq!(host.current_location().path, "/accounts");
    }

    #[test]
    fn from_catalog_places_feature_targets() {
        let catalog = crate::catalog::default_catalog().unwrap();
        let host = SimulatedHost::from_catalog("/connections", &catalog);
        assert!(host.query_selector("[data-testid=\"new-connection-btn\"]").is_some());
        assert!(host.query_selector("[data-testid=\"new-project-btn\"]").is_none());
    }
}
