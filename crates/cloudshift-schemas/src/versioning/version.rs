//! Semantic catalog versions and requirement ranges
//!
//! Copyright (c) 2025 CloudShift Team
//! Licensed under the Apache-2.0 license

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Version of a pattern catalog artifact
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CatalogVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub pre_release: Option<String>,
    pub build_metadata: Option<String>,
}

impl CatalogVersion {
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
            pre_release: None,
            build_metadata: None,
        }
    }

    /// Parse `X.Y.Z[-pre][+build]`, with an optional leading `v`
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let trimmed = input.trim();
        let text = trimmed.strip_prefix('v').unwrap_or(trimmed);

        let (text, build_metadata) = match text.split_once('+') {
            Some((head, build)) => (head, Some(build.to_string())),
            None => (text, None),
        };
        let (core, pre_release) = match text.split_once('-') {
            Some((head, pre)) => (head, Some(pre.to_string())),
            None => (text, None),
        };

        let numbers = core
            .split('.')
            .map(|part| {
                part.parse::<u32>().map_err(|_| {
                    VersionError::InvalidFormat(format!("'{}' is not a number in '{}'", part, input))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        match numbers.as_slice() {
            [major, minor, patch] => Ok(Self {
                major: *major,
                minor: *minor,
                patch: *patch,
                pre_release,
                build_metadata,
            }),
            _ => Err(VersionError::InvalidFormat(format!(
                "expected X.Y.Z, got '{}'",
                input
            ))),
        }
    }

    pub fn is_pre_release(&self) -> bool {
        self.pre_release.is_some()
    }

    /// Check this version against a requirement
    pub fn satisfies(&self, range: &VersionRange) -> bool {
        range.matches(self)
    }
}

impl fmt::Display for CatalogVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = &self.pre_release {
            write!(f, "-{}", pre)?;
        }
        if let Some(build) = &self.build_metadata {
            write!(f, "+{}", build)?;
        }
        Ok(())
    }
}

impl FromStr for CatalogVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl PartialOrd for CatalogVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CatalogVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| match (&self.pre_release, &other.pre_release) {
                (None, None) => Ordering::Equal,
                // A release outranks its pre-releases
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.cmp(b),
            })
    }
}

/// Requirement on a catalog version
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionRange {
    Exact(CatalogVersion),
    /// `^X.Y.Z`: same left-most non-zero component
    Caret(CatalogVersion),
    /// `~X.Y.Z`: same major and minor
    Tilde(CatalogVersion),
    GreaterOrEqual(CatalogVersion),
    LessThan(CatalogVersion),
    Any,
}

impl VersionRange {
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let text = input.trim();
        if text.is_empty() || text == "*" {
            return Ok(VersionRange::Any);
        }

        let parse = |v: &str| {
            CatalogVersion::parse(v)
                .map_err(|e| VersionError::InvalidRange(format!("'{}': {}", input, e)))
        };

        if let Some(rest) = text.strip_prefix(">=") {
            Ok(VersionRange::GreaterOrEqual(parse(rest)?))
        } else if let Some(rest) = text.strip_prefix('<') {
            Ok(VersionRange::LessThan(parse(rest)?))
        } else if let Some(rest) = text.strip_prefix('^') {
            Ok(VersionRange::Caret(parse(rest)?))
        } else if let Some(rest) = text.strip_prefix('~') {
            Ok(VersionRange::Tilde(parse(rest)?))
        } else if let Some(rest) = text.strip_prefix('=') {
            Ok(VersionRange::Exact(parse(rest)?))
        } else {
            Ok(VersionRange::Exact(parse(text)?))
        }
    }

    pub fn matches(&self, version: &CatalogVersion) -> bool {
        match self {
            VersionRange::Any => true,
            VersionRange::Exact(v) => version == v,
            VersionRange::Caret(v) => {
                if version < v {
                    return false;
                }
                match (v.major, v.minor) {
                    (0, 0) => version.major == 0 && version.minor == 0 && version.patch == v.patch,
                    (0, minor) => version.major == 0 && version.minor == minor,
                    (major, _) => version.major == major,
                }
            }
            VersionRange::Tilde(v) => {
                version >= v && version.major == v.major && version.minor == v.minor
            }
            VersionRange::GreaterOrEqual(v) => version >= v,
            VersionRange::LessThan(v) => version < v,
        }
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionRange::Any => write!(f, "*"),
            VersionRange::Exact(v) => write!(f, "{}", v),
            VersionRange::Caret(v) => write!(f, "^{}", v),
            VersionRange::Tilde(v) => write!(f, "~{}", v),
            VersionRange::GreaterOrEqual(v) => write!(f, ">={}", v),
            VersionRange::LessThan(v) => write!(f, "<{}", v),
        }
    }
}

impl FromStr for VersionRange {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Version parsing error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    #[error("Invalid version format: {0}")]
    InvalidFormat(String),
    #[error("Invalid version range: {0}")]
    InvalidRange(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_parsing() {
        let v = CatalogVersion::parse("1.4.0").unwrap();
        assert_eq!((v.major, v.minor, v.patch), (1, 4, 0));
        assert!(!v.is_pre_release());

        let v = CatalogVersion::parse("v2.0.0-rc.1+build.7").unwrap();
        assert_eq!(v.pre_release.as_deref(), Some("rc.1"));
        assert_eq!(v.build_metadata.as_deref(), Some("build.7"));
        assert_eq!(v.to_string(), "2.0.0-rc.1+build.7");

        assert!(CatalogVersion::parse("1.2").is_err());
        assert!(CatalogVersion::parse("1.x.0").is_err());
    }

    #[test]
    fn test_version_ordering() {
        let release = CatalogVersion::new(1, 2, 0);
        let pre = CatalogVersion::parse("1.2.0-beta").unwrap();
        assert!(pre < release);
        assert!(CatalogVersion::new(1, 1, 9) < release);
        assert!(release < CatalogVersion::new(2, 0, 0));
    }

    #[test]
    fn test_range_matching() {
        let caret = VersionRange::parse("^1.2.0").unwrap();
        assert!(caret.matches(&CatalogVersion::new(1, 2, 0)));
        assert!(caret.matches(&CatalogVersion::new(1, 9, 3)));
        assert!(!caret.matches(&CatalogVersion::new(2, 0, 0)));
        assert!(!caret.matches(&CatalogVersion::new(1, 1, 9)));

        let zero = VersionRange::parse("^0.3.1").unwrap();
        assert!(zero.matches(&CatalogVersion::new(0, 3, 4)));
        assert!(!zero.matches(&CatalogVersion::new(0, 4, 0)));

        let tilde = VersionRange::parse("~1.2.3").unwrap();
        assert!(tilde.matches(&CatalogVersion::new(1, 2, 7)));
        assert!(!tilde.matches(&CatalogVersion::new(1, 3, 0)));

        assert!(VersionRange::parse("*").unwrap().matches(&CatalogVersion::new(9, 9, 9)));
        assert!(VersionRange::parse(">=1.0.0").unwrap().matches(&CatalogVersion::new(1, 0, 0)));
        assert!(VersionRange::parse("<1.0.0").unwrap().matches(&CatalogVersion::new(0, 9, 0)));
        assert!(VersionRange::parse("^1.x").is_err());
    }
}
