//! Package version strings
//!
//! Versions are opaque release identifiers (`0.3.0`, `1.2-rc1`, `2024.01.15`).
//! They are never reordered or normalised: the string a descriptor declares
//! is the string embedded into the build.

use serde::{Deserialize, Serialize};
use spkg_errors::DescriptorError;
use std::fmt;
use std::str::FromStr;

const ARCHIVE_EXTENSIONS: &[&str] = &[
    ".tar.gz", ".tgz", ".tar.xz", ".txz", ".tar.bz2", ".tbz2", ".tar", ".zip",
];

/// A validated release version
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PackageVersion(String);

impl PackageVersion {
    /// Validate a version string
    ///
    /// # Errors
    /// Returns an error if the string is empty, does not start with an ASCII
    /// alphanumeric character, or contains characters outside `[A-Za-z0-9._+~-]`.
    pub fn new(value: impl Into<String>) -> Result<Self, DescriptorError> {
        let value = value.into();
        let Some(first) = value.chars().next() else {
            return Err(DescriptorError::invalid("version", "must not be empty"));
        };
        if !first.is_ascii_alphanumeric() {
            return Err(DescriptorError::invalid(
                "version",
                format!("{value:?} must start with a letter or digit"),
            ));
        }
        if let Some(bad) = value
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '+' | '~' | '-')))
        {
            return Err(DescriptorError::invalid(
                "version",
                format!("{value:?} contains {bad:?}"),
            ));
        }
        Ok(Self(value))
    }

    /// Derive the version from a source archive URL
    ///
    /// Takes the last path segment, drops the archive extension, then keeps
    /// everything from the first `-`/`_` separated token that starts with a
    /// digit (or `v` followed by a digit, with the `v` dropped).
    ///
    /// # Errors
    /// Returns `UnresolvableVersion` when no such token exists.
    pub fn from_url(url: &str) -> Result<Self, DescriptorError> {
        let unresolvable = || DescriptorError::UnresolvableVersion {
            url: url.to_string(),
        };

        let path = url.split(['?', '#']).next().unwrap_or(url);
        let segment = path
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(unresolvable)?;

        let lower = segment.to_ascii_lowercase();
        let stem = ARCHIVE_EXTENSIONS
            .iter()
            .find(|ext| lower.ends_with(*ext))
            .map_or(segment, |ext| &segment[..segment.len() - ext.len()]);

        let mut offset = 0;
        for token in stem.split(['-', '_']) {
            let mut chars = token.chars();
            let candidate = match (chars.next(), chars.next()) {
                (Some(c), _) if c.is_ascii_digit() => Some(offset),
                (Some('v' | 'V'), Some(d)) if d.is_ascii_digit() => Some(offset + 1),
                _ => None,
            };
            if let Some(start) = candidate {
                return Self::new(&stem[start..]).map_err(|_| unresolvable());
            }
            offset += token.len() + 1;
        }

        Err(unresolvable())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PackageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PackageVersion {
    type Err = DescriptorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for PackageVersion {
    type Error = DescriptorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PackageVersion> for String {
    fn from(version: PackageVersion) -> Self {
        version.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_github_tag_url() {
        let v = PackageVersion::from_url(
            "https://github.com/nickustinov/itsyhome-cli/archive/refs/tags/v0.3.0.tar.gz",
        )
        .unwrap();
        assert_eq!(v.as_str(), "0.3.0");
    }

    #[test]
    fn test_from_named_tarball() {
        let v = PackageVersion::from_url("https://example.com/dl/itsyhome-cli-0.3.0.tgz").unwrap();
        assert_eq!(v.as_str(), "0.3.0");

        let v = PackageVersion::from_url("https://example.com/foo_1.2-rc1.zip?raw=1").unwrap();
        assert_eq!(v.as_str(), "1.2-rc1");
    }

    #[test]
    fn test_unresolvable() {
        assert!(matches!(
            PackageVersion::from_url("https://example.com/archive/main.tar.gz"),
            Err(DescriptorError::UnresolvableVersion { .. })
        ));
        assert!(PackageVersion::from_url("https://example.com/").is_err());
    }

    #[test]
    fn test_validation() {
        assert!(PackageVersion::new("0.3.0").is_ok());
        assert!(PackageVersion::new("").is_err());
        assert!(PackageVersion::new("-1").is_err());
        assert!(PackageVersion::new("1 .0").is_err());
        assert!(PackageVersion::new("1.0\"; rm").is_err());
    }
}
