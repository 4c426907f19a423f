//! Channel and scope aware version comparison

use serde::Deserialize;

use crate::version::semver::Version;

/// Which builds are eligible as update candidates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Only plain releases
    #[default]
    Stable,
    /// Releases plus development and other pre-release builds
    Development,
}

/// How far a candidate may move away from the installed version
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateScope {
    #[default]
    Major,
    Minor,
    Patch,
}

/// Decides whether a remote version qualifies as an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionComparator {
    channel: Channel,
    scope: UpdateScope,
}

impl VersionComparator {
    pub fn new(channel: Channel, scope: UpdateScope) -> Self {
        Self { channel, scope }
    }

    /// Returns true if `candidate` is strictly newer than `current` and
    /// allowed by the channel and scope.
    pub fn is_newer(&self, current: &Version, candidate: &Version) -> bool {
        if candidate.is_prerelease() && self.channel == Channel::Stable {
            return false;
        }

        let in_scope = match self.scope {
            UpdateScope::Major => true,
            UpdateScope::Minor => candidate.major() == current.major(),
            UpdateScope::Patch => {
                candidate.major() == current.major() && candidate.minor() == current.minor()
            }
        };

        in_scope && candidate > current
    }

    /// Returns the greatest qualifying version out of `candidates`.
    ///
    /// On equal versions the earliest item wins.
    pub fn select_best<'a, T, F>(
        &self,
        current: &Version,
        candidates: impl IntoIterator<Item = &'a T>,
        version_of: F,
    ) -> Option<&'a T>
    where
        T: 'a,
        F: Fn(&T) -> &Version,
    {
        candidates
            .into_iter()
            .filter(|c| self.is_newer(current, version_of(*c)))
            .fold(None, |best: Option<&'a T>, c| match best {
                Some(b) if version_of(c) <= version_of(b) => Some(b),
                _ => Some(c),
            })
    }
}
