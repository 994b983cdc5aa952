//! Semantic version recommendation

use semver::Version;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::classify::Verdict;

/// Suggested semantic-version bump, ordered `None < Patch < Minor < Major`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionBump {
    None,
    Patch,
    Minor,
    Major,
}

impl VersionBump {
    /// The bump a single verdict calls for
    pub fn for_verdict(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Breaking => VersionBump::Major,
            Verdict::Additive => VersionBump::Minor,
            Verdict::Neutral => VersionBump::Patch,
        }
    }

    /// Apply this bump to a version. Pre-release and build metadata are dropped
    /// whenever the version actually moves.
    ///
    /// Returns `None` when the bumped component would overflow.
    pub fn apply(&self, version: &Version) -> Option<Version> {
        let next = match self {
            VersionBump::None => version.clone(),
            VersionBump::Patch => {
                Version::new(version.major, version.minor, version.patch.checked_add(1)?)
            }
            VersionBump::Minor => Version::new(version.major, version.minor.checked_add(1)?, 0),
            VersionBump::Major => Version::new(version.major.checked_add(1)?, 0, 0),
        };
        Some(next)
    }

    /// The bump observed between two versions, or `None` if `to` does not move forward
    pub fn observed(from: &Version, to: &Version) -> Self {
        if to.major > from.major {
            VersionBump::Major
        } else if to.major == from.major && to.minor > from.minor {
            VersionBump::Minor
        } else if to.major == from.major && to.minor == from.minor && to.patch > from.patch {
            VersionBump::Patch
        } else {
            VersionBump::None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VersionBump::None => "none",
            VersionBump::Patch => "patch",
            VersionBump::Minor => "minor",
            VersionBump::Major => "major",
        }
    }
}

impl fmt::Display for VersionBump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate verdicts into a bump: the maximum over all of them, `None` when empty
pub fn recommend(verdicts: &[Verdict]) -> VersionBump {
    verdicts
        .iter()
        .copied()
        .map(VersionBump::for_verdict)
        .max()
        .unwrap_or(VersionBump::None)
}

/// Parse a version string, tolerating a leading `v`
pub fn parse_version(version_str: &str) -> Result<Version, semver::Error> {
    let version_str = version_str.strip_prefix('v').unwrap_or(version_str);
    Version::parse(version_str)
}
