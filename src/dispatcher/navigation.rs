//! Navigate-or-stay decision.

use crate::host::Location;

/// What the dispatcher should do before highlighting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationPlan {
    /// Already on the target page.
    Stay,
    /// Route to this location.
    Navigate(Location),
}

/// Decide whether reaching `target` from `current` needs a navigation.
///
/// A target carrying a query fragment is always re-asserted, even when the
/// page already shows that exact URL: the query usually selects a tab or mode
/// the user may have changed in place. Without a query, being on the same
/// path is enough.
pub fn plan_navigation(target: &Location, current: &Location) -> NavigationPlan {
    if target.has_query() {
        NavigationPlan::Navigate(target.clone())
    } else if current.path == target.path {
        NavigationPlan::Stay
    } else {
        NavigationPlan::Navigate(Location::new(&target.path, None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_path_without_query_stays() {
        let plan = plan_navigation(&Location::parse("/connections"), &Location::parse("/connections"));
        assert_eq!(plan, NavigationPlan::Stay);

        // Extra query on the current page does not matter for a bare route.
        let plan = plan_navigation(&Location::parse("/connections"), &Location::parse("/connections?page=2"));
        assert_eq!(plan, NavigationPlan::Stay);
    }

    #[test]
    fn different_path_navigates_to_bare_path() {
        let plan = plan_navigation(&Location::parse("/projects"), &Location::parse("/connections"));
        assert_eq!(plan, NavigationPlan::Navigate(Location::new("/projects", None)));
    }

    #[test]
    fn query_route_always_navigates() {
        let target = Location::parse("/a?b=c");
        for current in ["/a?b=c", "/a", "/elsewhere"] {
            let plan = plan_navigation(&target, &Location::parse(current));
            assert_eq!(plan, NavigationPlan::Navigate(Location::new("/a", Some("b=c"))), "from {current}");
        }
    }
}
