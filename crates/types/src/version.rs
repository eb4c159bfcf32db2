//! Semantic versions and version ranges for list documents.
//!
//! A [`Version`] identifies one frozen snapshot of a list. A [`VersionRange`]
//! is the constraint an extension list places on the version of its base.
//! Both are thin serde-facing shells over the `semver` crate: ordering is
//! semver precedence, and a range is evaluated as a single-comparator
//! [`semver::VersionReq`]. `build` metadata is carried for display but never
//! participates in ordering or equality.

use std::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
    str::FromStr,
};

use semver::{BuildMetadata, Comparator, Op, Prerelease, VersionReq};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised for malformed version or range fields.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    #[error("invalid version '{input}': {reason}")]
    InvalidVersion { input: String, reason: String },
}

impl VersionError {
    fn invalid(input: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidVersion {
            input: input.into(),
            reason: reason.to_string(),
        }
    }
}

/// Concrete version of a list document.
///
/// Pre-release and build identifiers are private so they are always
/// well-formed; read them through [`Version::pre_release`] and
/// [`Version::build`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "VersionFields", into = "VersionFields")]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pre: Prerelease,
    build: BuildMetadata,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct VersionFields {
    major: u64,
    minor: u64,
    patch: u64,
    #[serde(default, rename = "preRelease", skip_serializing_if = "Option::is_none")]
    pre_release: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    build: Option<String>,
}

impl TryFrom<VersionFields> for Version {
    type Error = VersionError;

    fn try_from(fields: VersionFields) -> Result<Self, Self::Error> {
        let mut version = Version::new(fields.major, fields.minor, fields.patch);
        if let Some(pre_release) = fields.pre_release {
            version = version.with_pre_release(pre_release)?;
        }
        if let Some(build) = fields.build {
            version = version.with_build(build)?;
        }
        Ok(version)
    }
}

impl From<Version> for VersionFields {
    fn from(version: Version) -> Self {
        Self {
            pre_release: version.pre_release().map(str::to_owned),
            build: version.build().map(str::to_owned),
            major: version.major,
            minor: version.minor,
            patch: version.patch,
        }
    }
}

impl Version {
    /// Creates a release version without pre-release or build metadata.
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            pre: Prerelease::EMPTY,
            build: BuildMetadata::EMPTY,
        }
    }

    /// Attaches pre-release identifiers, rejecting malformed ones.
    pub fn with_pre_release(mut self, pre_release: impl Into<String>) -> Result<Self, VersionError> {
        self.pre = parse_pre_release(&pre_release.into())?;
        Ok(self)
    }

    /// Attaches build metadata, rejecting malformed identifiers.
    pub fn with_build(mut self, build: impl Into<String>) -> Result<Self, VersionError> {
        let build = build.into();
        if build.is_empty() {
            return Err(VersionError::invalid(build, "empty build metadata"));
        }
        self.build = BuildMetadata::new(&build).map_err(|error| VersionError::invalid(&build, error))?;
        Ok(self)
    }

    /// Dot-separated pre-release identifiers, e.g. `beta.2`.
    pub fn pre_release(&self) -> Option<&str> {
        (!self.pre.is_empty()).then(|| self.pre.as_str())
    }

    pub fn build(&self) -> Option<&str> {
        (!self.build.is_empty()).then(|| self.build.as_str())
    }

    pub fn to_semver(&self) -> semver::Version {
        semver::Version {
            major: self.major,
            minor: self.minor,
            patch: self.patch,
            pre: self.pre.clone(),
            build: self.build.clone(),
        }
    }
}

impl From<semver::Version> for Version {
    fn from(version: semver::Version) -> Self {
        Self {
            major: version.major,
            minor: version.minor,
            patch: version.patch,
            pre: version.pre,
            build: version.build,
        }
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        compare(self, other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.major.hash(state);
        self.minor.hash(state);
        self.patch.hash(state);
        self.pre.hash(state);
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        compare(self, other)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.to_semver(), f)
    }
}

impl FromStr for Version {
    type Err = VersionError;

    /// Parses `MAJOR.MINOR.PATCH[-PRERELEASE][+BUILD]`.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        semver::Version::parse(input.trim())
            .map(Version::from)
            .map_err(|error| VersionError::invalid(input, error))
    }
}

/// How a [`VersionRange`] matches candidate versions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RangeMode {
    /// `^`: compatible with the given version.
    #[default]
    #[serde(rename = "^")]
    Caret,
    /// `=`: exactly the given version.
    #[serde(rename = "=")]
    Exact,
}

impl RangeMode {
    pub fn as_str(self) -> &'static str {
        match self {
            RangeMode::Caret => "^",
            RangeMode::Exact => "=",
        }
    }
}

/// Constraint an extension list places on its base list's version.
///
/// A pre-release may only be requested with [`RangeMode::Exact`]; this is
/// enforced by every constructor and by deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RangeFields", into = "RangeFields")]
pub struct VersionRange {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pre: Prerelease,
    mode: RangeMode,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RangeFields {
    major: u64,
    minor: u64,
    patch: u64,
    #[serde(default, rename = "preRelease", skip_serializing_if = "Option::is_none")]
    pre_release: Option<String>,
    #[serde(default)]
    mode: Option<RangeMode>,
}

impl TryFrom<RangeFields> for VersionRange {
    type Error = VersionError;

    fn try_from(fields: RangeFields) -> Result<Self, Self::Error> {
        let mode = fields.mode.unwrap_or_default();
        match (mode, fields.pre_release) {
            (RangeMode::Exact, Some(pre_release)) => VersionRange::exact_pre_release(fields.major, fields.minor, fields.patch, pre_release),
            (RangeMode::Caret, Some(pre_release)) => Err(VersionError::invalid(
                pre_release,
                "a pre-release may only be requested with mode '='",
            )),
            (RangeMode::Exact, None) => Ok(VersionRange::exact(fields.major, fields.minor, fields.patch)),
            (RangeMode::Caret, None) => Ok(VersionRange::caret(fields.major, fields.minor, fields.patch)),
        }
    }
}

impl From<VersionRange> for RangeFields {
    fn from(range: VersionRange) -> Self {
        Self {
            pre_release: range.pre_release().map(str::to_owned),
            major: range.major,
            minor: range.minor,
            patch: range.patch,
            mode: Some(range.mode),
        }
    }
}

impl VersionRange {
    /// `^major.minor.patch`
    pub fn caret(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            pre: Prerelease::EMPTY,
            mode: RangeMode::Caret,
        }
    }

    /// `=major.minor.patch`
    pub fn exact(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            mode: RangeMode::Exact,
            ..Self::caret(major, minor, patch)
        }
    }

    /// `=major.minor.patch-pre_release`
    pub fn exact_pre_release(major: u64, minor: u64, patch: u64, pre_release: impl Into<String>) -> Result<Self, VersionError> {
        Ok(Self {
            pre: parse_pre_release(&pre_release.into())?,
            ..Self::exact(major, minor, patch)
        })
    }

    pub fn mode(&self) -> RangeMode {
        self.mode
    }

    pub fn pre_release(&self) -> Option<&str> {
        (!self.pre.is_empty()).then(|| self.pre.as_str())
    }

    /// The range as a semver requirement.
    ///
    /// `^` on a `0.y.z` base is a tilde comparator: patch releases within the
    /// same minor are compatible, including `0.0.z` bases.
    pub fn requirement(&self) -> VersionReq {
        let op = match self.mode {
            RangeMode::Exact => Op::Exact,
            RangeMode::Caret if self.major == 0 => Op::Tilde,
            RangeMode::Caret => Op::Caret,
        };
        VersionReq {
            comparators: vec![Comparator {
                op,
                major: self.major,
                minor: Some(self.minor),
                patch: Some(self.patch),
                pre: self.pre.clone(),
            }],
        }
    }

    /// Returns true when `version` is acceptable under this range.
    pub fn matches(&self, version: &Version) -> bool {
        satisfies(version, self)
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}.{}.{}", self.mode.as_str(), self.major, self.minor, self.patch)?;
        if let Some(pre_release) = self.pre_release() {
            write!(f, "-{pre_release}")?;
        }
        Ok(())
    }
}

impl FromStr for VersionRange {
    type Err = VersionError;

    /// Parses `^1.2.3`, `=1.2.3`, `=1.2.3-rc.1` or a bare `1.2.3` (caret).
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        let (mode, rest) = if let Some(rest) = trimmed.strip_prefix('^') {
            (RangeMode::Caret, rest)
        } else if let Some(rest) = trimmed.strip_prefix('=') {
            (RangeMode::Exact, rest)
        } else {
            (RangeMode::Caret, trimmed)
        };
        if rest.contains('+') {
            return Err(VersionError::invalid(input, "ranges do not carry build metadata"));
        }
        let version: Version = rest.parse()?;
        match (mode, version.pre_release()) {
            (RangeMode::Exact, Some(pre_release)) => VersionRange::exact_pre_release(version.major, version.minor, version.patch, pre_release),
            (RangeMode::Caret, Some(_)) => Err(VersionError::invalid(
                input,
                "a pre-release may only be requested with mode '='",
            )),
            (RangeMode::Exact, None) => Ok(VersionRange::exact(version.major, version.minor, version.patch)),
            (RangeMode::Caret, None) => Ok(VersionRange::caret(version.major, version.minor, version.patch)),
        }
    }
}

/// Total order over versions by semver precedence.
///
/// A release sorts after any of its pre-releases and build metadata never
/// breaks a tie.
pub fn compare(a: &Version, b: &Version) -> Ordering {
    a.to_semver().cmp_precedence(&b.to_semver())
}

/// Returns true when `version` is acceptable under `range`.
///
/// A pre-release version is only accepted by an exact range naming that
/// same pre-release.
pub fn satisfies(version: &Version, range: &VersionRange) -> bool {
    range.requirement().matches(&version.to_semver())
}

fn parse_pre_release(pre_release: &str) -> Result<Prerelease, VersionError> {
    if pre_release.is_empty() {
        return Err(VersionError::invalid(pre_release, "empty pre-release"));
    }
    Prerelease::new(pre_release).map_err(|error| VersionError::invalid(pre_release, error))
}
