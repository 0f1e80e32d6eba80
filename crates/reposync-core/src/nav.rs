//! Navigation targets
//!
//! Routes are plain lists of view names, root first. The core never manages
//! the navigation stack; it only asks for routes and observes route changes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Top-level repository view
pub const REPOS_TAB: &str = "tabs:repos";
/// Top-level settings view
pub const SETTINGS_TAB: &str = "tabs:settings";
/// Repository listing embedded in settings on compact layouts
pub const SETTINGS_REPOS_TAB: &str = "settings:repos";

/// Form factor of the client
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// Phone-sized layout; repositories live under settings
    Compact,
    #[default]
    Regular,
}

impl Layout {
    /// Route to the default repository listing for this layout
    pub fn repo_listing_route(self) -> Vec<String> {
        match self {
            Layout::Compact => vec![SETTINGS_TAB.to_string(), SETTINGS_REPOS_TAB.to_string()],
            Layout::Regular => vec![REPOS_TAB.to_string()],
        }
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Layout::Compact => f.write_str("compact"),
            Layout::Regular => f.write_str("regular"),
        }
    }
}

impl FromStr for Layout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "compact" | "mobile" => Ok(Layout::Compact),
            "regular" | "desktop" => Ok(Layout::Regular),
            other => Err(format!(
                "Unknown layout '{}'. Use 'compact' or 'regular'.",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_route_per_layout() {
        assert_eq!(Layout::Regular.repo_listing_route(), vec![REPOS_TAB]);
        assert_eq!(
            Layout::Compact.repo_listing_route(),
            vec![SETTINGS_TAB, SETTINGS_REPOS_TAB]
        );
    }

    #[test]
    fn test_layout_parse() {
        assert_eq!("compact".parse::<Layout>().unwrap(), Layout::Compact);
        assert_eq!("Desktop".parse::<Layout>().unwrap(), Layout::Regular);
        assert!("tablet".parse::<Layout>().is_err());
    }
}
