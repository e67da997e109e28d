//! Type definitions for package queries

use serde::{Deserialize, Serialize};

pub const RPM_INSTALLED_MSG: &str = "Expected RPM installed";
pub const RPM_NOT_FOUND_MSG: &str = "RPM not found";

/// Outcome of an installed-package check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpmPresence {
    pub installed: bool,
    pub message: String,
}

impl RpmPresence {
    #[must_use]
    pub fn found() -> Self {
        Self {
            installed: true,
            message: RPM_INSTALLED_MSG.to_string(),
        }
    }

    #[must_use]
    pub fn not_found() -> Self {
        Self {
            installed: false,
            message: RPM_NOT_FOUND_MSG.to_string(),
        }
    }

    /// Check whether any installed package name contains `expected`
    #[must_use]
    pub fn from_installed<S: AsRef<str>>(installed: &[S], expected: &str) -> Self {
        if installed.iter().any(|rpm| rpm.as_ref().contains(expected)) {
            Self::found()
        } else {
            Self::not_found()
        }
    }
}

/// Output of a filtered package listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RpmListing {
    /// Trimmed package names
    Packages(Vec<String>),
    /// Output that was not a list of text lines
    Raw(Vec<u8>),
}

impl RpmListing {
    /// True when the listing holds at least one package
    #[must_use]
    pub fn found(&self) -> bool {
        matches!(self, RpmListing::Packages(p) if !p.is_empty())
    }

    #[must_use]
    pub fn packages(&self) -> &[String] {
        match self {
            RpmListing::Packages(p) => p,
            RpmListing::Raw(_) => &[],
        }
    }
}

/// Leftovers of a previous deployment on a host
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineState {
    /// Packages matching the filter are installed
    pub rpm_installed: bool,
    /// The provisioner directory has entries
    pub provisioner_present: bool,
}

impl MachineState {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        !self.rpm_installed && !self.provisioner_present
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presence_substring_match() {
        let presence = RpmPresence::from_installed(&["foo-1.2-rpm"], "foo");

        assert!(presence.installed);
        assert_eq!(presence.message, RPM_INSTALLED_MSG);
    }

    #[test]
    fn test_presence_empty_list() {
        let presence = RpmPresence::from_installed::<&str>(&[], "foo");

        assert!(!presence.installed);
        assert_eq!(presence.message, "RPM not found");
    }

    #[test]
    fn test_presence_no_match() {
        let presence = RpmPresence::from_installed(&["bar-1.0", "baz-2.0"], "foo");

        assert!(!presence.installed);
    }

    #[test]
    fn test_listing_found() {
        assert!(RpmListing::Packages(vec!["a".into()]).found());
        assert!(!RpmListing::Packages(vec![]).found());
        assert!(!RpmListing::Raw(vec![0xff]).found());
    }

    #[test]
    fn test_machine_state_clean() {
        assert!(MachineState::default().is_clean());
        assert!(!MachineState {
            rpm_installed: false,
            provisioner_present: true,
        }
        .is_clean());
    }
}
