//! Release model and target selection.
//!
//! A [`Release`] is one published version of the managed tool. Given the
//! catalog's candidates, [`ReleaseSelector::select`] picks the single release
//! to install, or reports that there is nothing to do.
//!
//! # Version Labels
//!
//! Catalog labels follow the Python packaging scheme (`1.2`, `1.2.0a1`,
//! `1.2.0rc2`). They are mapped onto semantic versions so that ordering is
//! well defined, while the original label is kept as the release tag and used
//! verbatim in download URLs.
//!
//! # Examples
//!
//! ```rust
//! use selfup_cli::upgrade::{Release, ReleaseConstraint, ReleaseSelector, SelectionResult};
//! use semver::Version;
//!
//! let candidates: Vec<Release> =
//!     ["1.1.0", "1.2.0", "1.3.0a1"].iter().filter_map(|v| Release::parse(v)).collect();
//! let current = Version::new(1, 1, 0);
//! let constraint = ReleaseConstraint::at_least(&current);
//!
//! match ReleaseSelector::select(&candidates, &constraint, false, &current) {
//!     SelectionResult::Selected(release) => assert_eq!(release.tag(), "1.2.0"),
//!     other => panic!("unexpected {other:?}"),
//! }
//! ```

use regex::Regex;
use semver::{BuildMetadata, Comparator, Op, Prerelease, Version, VersionReq};
use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;

use crate::core::UpdateError;

static PYTHON_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^v?(?P<major>\d+)(?:\.(?P<minor>\d+))?(?:\.(?P<patch>\d+))?(?:[-_.]?(?P<kind>a|alpha|b|beta|rc|c|pre|preview|dev)[-_.]?(?P<num>\d+)?)?$",
    )
    .unwrap_or_else(|e| unreachable!("invalid version pattern: {e}"))
});

/// One published release of the managed tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    version: Version,
    tag: String,
    prerelease: bool,
}

impl Release {
    /// Release whose tag is the canonical rendering of `version`.
    #[must_use]
    pub fn new(version: Version) -> Self {
        let tag = version.to_string();
        Self::with_tag(version, tag)
    }

    /// Release with an explicit catalog label.
    pub fn with_tag(version: Version, tag: impl Into<String>) -> Self {
        let prerelease = !version.pre.is_empty();
        Self {
            version,
            tag: tag.into(),
            prerelease,
        }
    }

    /// Parse a catalog label leniently, keeping the label as the tag.
    ///
    /// Returns `None` for labels that are not recognizable versions.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        parse_release_version(label).map(|version| Self::with_tag(version, label.trim()))
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    /// Version label used in download URLs.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub const fn is_prerelease(&self) -> bool {
        self.prerelease
    }

    /// Base name shared by the archive and checksum files of this release.
    ///
    /// ```rust
    /// use selfup_cli::upgrade::Release;
    ///
    /// let release = Release::parse("1.2.0").unwrap();
    /// assert_eq!(release.archive_base_name("poetry", "linux"), "poetry-1.2.0-linux");
    /// ```
    #[must_use]
    pub fn archive_base_name(&self, tool: &str, platform: &str) -> String {
        format!("{tool}-{}-{platform}", self.tag)
    }
}

impl fmt::Display for Release {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tag)
    }
}

/// Map a Python-style version label onto a semantic version.
///
/// Strict semver labels parse as-is. Otherwise missing minor and patch
/// components default to zero and a pre-release suffix (`a1`, `b2`, `rc1`,
/// `.dev3`) becomes a semver pre-release of the form `alpha.1`, `beta.2`,
/// `rc.1`, `dev.3`.
///
/// ```rust
/// use selfup_cli::upgrade::parse_release_version;
///
/// assert_eq!(parse_release_version("1.2").unwrap().to_string(), "1.2.0");
/// assert_eq!(parse_release_version("1.2.0a1").unwrap().to_string(), "1.2.0-alpha.1");
/// assert!(parse_release_version("latest").is_none());
/// ```
#[must_use]
pub fn parse_release_version(label: &str) -> Option<Version> {
    let label = label.trim();
    let unprefixed = label.strip_prefix('v').unwrap_or(label);
    if let Ok(version) = Version::parse(unprefixed) {
        return Some(version);
    }

    let caps = PYTHON_VERSION.captures(label)?;
    let number = |name: &str| -> Option<u64> {
        caps.name(name).map_or(Some(0), |m| m.as_str().parse().ok())
    };
    let mut version = Version::new(number("major")?, number("minor")?, number("patch")?);

    if let Some(kind) = caps.name("kind") {
        let kind = match kind.as_str() {
            "a" | "alpha" => "alpha",
            "b" | "beta" => "beta",
            "rc" | "c" | "pre" | "preview" => "rc",
            _ => "dev",
        };
        let identifier = match caps.name("num") {
            Some(num) => format!("{kind}.{}", num.as_str()),
            None => kind.to_string(),
        };
        version.pre = Prerelease::new(&identifier).ok()?;
    }
    Some(version)
}

/// Which releases are acceptable as the update target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseConstraint {
    /// Every release
    Any,
    /// Exactly this version
    Exact(Version),
    /// A semver requirement such as `>=1.1.0` or `^1.2`
    Requirement(VersionReq),
}

impl ReleaseConstraint {
    /// Parse a user-supplied version argument.
    ///
    /// A bare version (optionally `v`-prefixed, Python-style labels allowed)
    /// means exactly that version; `*` means any; anything else must be a
    /// semver requirement.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::InvalidVersionConstraint`] when the argument is
    /// neither a version nor a requirement.
    pub fn parse(input: &str) -> Result<Self, UpdateError> {
        let trimmed = input.trim();
        if trimmed.is_empty() || trimmed == "*" {
            return Ok(Self::Any);
        }

        let starts_with_operator =
            trimmed.starts_with(|c: char| matches!(c, '=' | '>' | '<' | '~' | '^'));
        if !starts_with_operator && let Some(version) = parse_release_version(trimmed) {
            return Ok(Self::Exact(version));
        }

        VersionReq::parse(trimmed).map(Self::Requirement).map_err(|e| {
            UpdateError::InvalidVersionConstraint {
                constraint: trimmed.to_string(),
                reason: e.to_string(),
            }
        })
    }

    /// Constraint `>= version`, the default when no version is requested.
    #[must_use]
    pub fn at_least(version: &Version) -> Self {
        Self::Requirement(VersionReq {
            comparators: vec![Comparator {
                op: Op::GreaterEq,
                major: version.major,
                minor: Some(version.minor),
                patch: Some(version.patch),
                pre: version.pre.clone(),
            }],
        })
    }

    /// Whether `version` satisfies this constraint.
    ///
    /// Pre-release versions are compared by plain version ordering against
    /// each comparator, so `1.3.0-alpha` satisfies `>=1.1.0`. Whether a
    /// pre-release may actually be selected is decided by the selector.
    #[must_use]
    pub fn matches(&self, version: &Version) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(expected) => precedence(expected, version) == Ordering::Equal,
            Self::Requirement(req) => {
                req.matches(version)
                    || (!version.pre.is_empty()
                        && req.comparators.iter().all(|c| comparator_admits(c, version)))
            }
        }
    }
}

impl fmt::Display for ReleaseConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("*"),
            Self::Exact(version) => write!(f, "={version}"),
            Self::Requirement(req) => write!(f, "{req}"),
        }
    }
}

fn comparator_admits(comparator: &Comparator, version: &Version) -> bool {
    let fully_specified = comparator.minor.is_some() && comparator.patch.is_some();
    let bound = Version {
        major: comparator.major,
        minor: comparator.minor.unwrap_or(0),
        patch: comparator.patch.unwrap_or(0),
        pre: comparator.pre.clone(),
        build: BuildMetadata::EMPTY,
    };
    let ordering = precedence(version, &bound);

    match comparator.op {
        Op::GreaterEq => ordering != Ordering::Less,
        Op::Less => ordering == Ordering::Less,
        Op::Greater if fully_specified => ordering == Ordering::Greater,
        Op::LessEq if fully_specified => ordering != Ordering::Greater,
        Op::Exact if fully_specified => ordering == Ordering::Equal,
        // Partial, tilde, caret, and wildcard ranges: judge the release line
        _ => {
            let mut release = version.clone();
            release.pre = Prerelease::EMPTY;
            comparator.matches(&release)
        }
    }
}

/// Semantic-version precedence, ignoring build metadata.
fn precedence(a: &Version, b: &Version) -> Ordering {
    (a.major, a.minor, a.patch).cmp(&(b.major, b.minor, b.patch)).then_with(|| a.pre.cmp(&b.pre))
}

/// Why no release was selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoneFoundReason {
    /// No candidate satisfies the constraint
    NoMatchingRelease,
    /// Candidates exist but all of them are pre-releases
    NoStableRelease,
}

impl NoneFoundReason {
    pub const fn message(self) -> &'static str {
        match self {
            Self::NoMatchingRelease => "No release found for the specified version",
            Self::NoStableRelease => "No new release found",
        }
    }
}

/// Outcome of release selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionResult {
    NoneFound(NoneFoundReason),
    /// The best release is the running version
    AlreadyCurrent(Release),
    Selected(Release),
}

/// Picks the update target from a list of candidates.
pub struct ReleaseSelector;

impl ReleaseSelector {
    /// Select the highest release satisfying `constraint`.
    ///
    /// Candidates are ordered by descending version precedence with a stable
    /// sort, so equal versions keep catalog order. Pre-releases are skipped
    /// unless `allow_prereleases` is set.
    #[must_use]
    pub fn select(
        candidates: &[Release],
        constraint: &ReleaseConstraint,
        allow_prereleases: bool,
        current: &Version,
    ) -> SelectionResult {
        let mut matching: Vec<&Release> =
            candidates.iter().filter(|release| constraint.matches(release.version())).collect();
        if matching.is_empty() {
            tracing::debug!("No candidate satisfies {constraint}");
            return SelectionResult::NoneFound(NoneFoundReason::NoMatchingRelease);
        }

        matching.sort_by(|a, b| precedence(b.version(), a.version()));

        let Some(winner) =
            matching.into_iter().find(|release| allow_prereleases || !release.is_prerelease())
        else {
            tracing::debug!("Only pre-releases satisfy {constraint}");
            return SelectionResult::NoneFound(NoneFoundReason::NoStableRelease);
        };

        if winner.version() == current {
            SelectionResult::AlreadyCurrent(winner.clone())
        } else {
            SelectionResult::Selected(winner.clone())
        }
    }
}
