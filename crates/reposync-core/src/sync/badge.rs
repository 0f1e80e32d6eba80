//! "New repository" badge latch
//!
//! Remembers whether the repository view was visited. Leaving it after a
//! visit dismisses the badge category once.

use crate::nav::REPOS_TAB;
use crate::remote::NEW_REPO_CATEGORY;

/// Notification category to dismiss
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DismissCategory(pub String);

#[derive(Debug, Clone)]
pub struct BadgeTracker {
    tracked: String,
    category: String,
    visited: bool,
}

impl BadgeTracker {
    pub fn new(tracked: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            tracked: tracked.into(),
            category: category.into(),
            visited: false,
        }
    }

    /// Tracker for the top-level repository view
    pub fn for_repos_tab() -> Self {
        Self::new(REPOS_TAB, NEW_REPO_CATEGORY)
    }

    pub fn visited(&self) -> bool {
        self.visited
    }

    /// Observe a route change; returns the category to dismiss, if any
    ///
    /// Only the route root is compared, so nested views of the tracked tab
    /// count as being on it.
    pub fn on_navigate(&mut self, route: &[String]) -> Option<DismissCategory> {
        let on_tracked = route.first().map(String::as_str) == Some(self.tracked.as_str());

        if on_tracked {
            self.visited = true;
            None
        } else if self.visited {
            self.visited = false;
            Some(DismissCategory(self.category.clone()))
        } else {
            None
        }
    }
}
