use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::version::error::UpdateError;

/// `[v]MAJOR[.MINOR[.PATCH]][-QUALIFIER[-BUILD]]`
static VERSION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[vV]?(\d+)(?:\.(\d+))?(?:\.(\d+))?(?:-([A-Za-z][A-Za-z0-9]*)(?:-(\d+))?)?$")
        .expect("version pattern is valid")
});

/// A parsed plugin version.
///
/// Ordering is numeric on `major.minor.patch`. A qualified build sorts below
/// the plain release with the same numbers, so `2.0.0-DEV-12 < 2.0.0`.
/// Qualified builds of the same numbers are ordered by qualifier and then
/// by build number.
#[derive(Debug, Clone)]
pub struct Version {
    raw: String,
    base: semver::Version,
    qualifier: Option<String>,
    build: Option<u64>,
}

impl Version {
    /// Parse a version string, padding partial versions with zeros.
    ///
    /// Examples:
    /// - "1" -> 1.0.0
    /// - "v1.2" -> 1.2.0
    /// - "2.0.0-DEV-142" -> 2.0.0, qualifier "DEV", build 142
    pub fn parse(version: &str) -> Result<Self, UpdateError> {
        let trimmed = version.trim();
        let captures = VERSION_PATTERN
            .captures(trimmed)
            .ok_or_else(|| UpdateError::MalformedVersion(version.to_string()))?;

        let number = |index: usize| -> Result<u64, UpdateError> {
            captures
                .get(index)
                .map_or(Ok(0), |m| m.as_str().parse::<u64>())
                .map_err(|_| UpdateError::MalformedVersion(version.to_string()))
        };

        let base = semver::Version::new(number(1)?, number(2)?, number(3)?);
        let qualifier = captures.get(4).map(|m| m.as_str().to_string());
        let build = captures
            .get(5)
            .map(|m| m.as_str().parse::<u64>())
            .transpose()
            .map_err(|_| UpdateError::MalformedVersion(version.to_string()))?;

        Ok(Self {
            raw: trimmed.to_string(),
            base,
            qualifier,
            build,
        })
    }

    /// The version string exactly as it was given (trimmed).
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn major(&self) -> u64 {
        self.base.major
    }

    pub fn minor(&self) -> u64 {
        self.base.minor
    }

    pub fn patch(&self) -> u64 {
        self.base.patch
    }

    pub fn qualifier(&self) -> Option<&str> {
        self.qualifier.as_deref()
    }

    pub fn build(&self) -> Option<u64> {
        self.build
    }

    /// True for any qualified (non-release) build.
    pub fn is_prerelease(&self) -> bool {
        self.qualifier.is_some()
    }

    /// True if the qualifier matches the development indicator.
    pub fn is_dev_build(&self, dev_indicator: &str) -> bool {
        self.qualifier
            .as_deref()
            .is_some_and(|q| q.eq_ignore_ascii_case(dev_indicator))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.base.cmp(&other.base).then_with(|| {
            match (&self.qualifier, &other.qualifier) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a
                    .to_ascii_lowercase()
                    .cmp(&b.to_ascii_lowercase())
                    .then_with(|| self.build.cmp(&other.build)),
            }
        })
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl FromStr for Version {
    type Err = UpdateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
