//! Module versions
//!
//! Installed module directories are named after their version, and
//! PowerShell versions do not always follow semver: `2.0` and `1.2.3.4`
//! are both common. [`ModuleVersion`] accepts one to four numeric parts,
//! keeps the first three as a [`semver::Version`] and the fourth as a
//! revision.

use semver::Version;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Version of an installed or requested module
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleVersion {
    version: Version,
    revision: u64,
}

/// Error returned for strings that are not module versions
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid module version '{0}'")]
pub struct InvalidModuleVersion(pub String);

impl ModuleVersion {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            version: Version::new(major, minor, patch),
            revision: 0,
        }
    }

    /// The semver part (`major.minor.patch`, plus any pre-release)
    pub fn semver(&self) -> &Version {
        &self.version
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Whether this is a pre-release build
    pub fn is_prerelease(&self) -> bool {
        !self.version.pre.is_empty()
    }
}

impl FromStr for ModuleVersion {
    type Err = InvalidModuleVersion;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidModuleVersion(input.to_string());
        let trimmed = input.trim().trim_start_matches(['v', 'V']);

        // Strict semver first so pre-release tags survive.
        if let Ok(version) = Version::parse(trimmed) {
            return Ok(Self {
                version,
                revision: 0,
            });
        }

        let parts: Vec<&str> = trimmed.split('.').collect();
        if parts.is_empty() || parts.len() > 4 {
            return Err(invalid());
        }
        let mut numbers = [0u64; 4];
        for (slot, part) in numbers.iter_mut().zip(&parts) {
            *slot = part.parse().map_err(|_| invalid())?;
        }

        Ok(Self {
            version: Version::new(numbers[0], numbers[1], numbers[2]),
            revision: numbers[3],
        })
    }
}

impl Ord for ModuleVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.version
            .cmp(&other.version)
            .then(self.revision.cmp(&other.revision))
    }
}

impl PartialOrd for ModuleVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ModuleVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.revision == 0 {
            write!(f, "{}", self.version)
        } else {
            write!(f, "{}.{}", self.version, self.revision)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> ModuleVersion {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_full_semver() {
        let version = v("1.2.3");
        assert_eq!(version, ModuleVersion::new(1, 2, 3));
        assert!(!version.is_prerelease());
    }

    #[test]
    fn test_parse_short_versions_are_padded() {
        assert_eq!(v("2"), ModuleVersion::new(2, 0, 0));
        assert_eq!(v("2.0"), ModuleVersion::new(2, 0, 0));
    }

    #[test]
    fn test_parse_four_part_version() {
        let version = v("1.2.3.4");
        assert_eq!(version.semver(), &Version::new(1, 2, 3));
        assert_eq!(version.revision(), 4);
        assert_eq!(version.to_string(), "1.2.3.4");
    }

    #[test]
    fn test_parse_prerelease() {
        let version = v("1.0.0-preview1");
        assert!(version.is_prerelease());
        assert!(version < v("1.0.0"));
    }

    #[test]
    fn test_parse_invalid() {
        assert!("latest".parse::<ModuleVersion>().is_err());
        assert!("1.2.3.4.5".parse::<ModuleVersion>().is_err());
        assert!("".parse::<ModuleVersion>().is_err());
    }

    #[test]
    fn test_ordering() {
        assert!(v("1.10.0") > v("1.9.0"));
        assert!(v("1.2.3.1") > v("1.2.3"));
        assert_eq!(v("2.0").cmp(&v("2.0.0")), Ordering::Equal);
    }
}
