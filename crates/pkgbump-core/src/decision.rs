use pkgbump_schema::Version;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateDecision {
    /// Declared and upstream versions match; nothing to do.
    UpToDate,
    /// Versions match but the update was forced. Revision is left alone.
    ForcedUpdate,
    /// Upstream moved. Revision resets to 1.
    VersionChanged,
}

impl UpdateDecision {
    /// Compare the declared version against the normalized upstream version.
    ///
    /// Comparison is exact string equality; no ordering is inferred, so an
    /// upstream downgrade is still a change.
    pub fn decide(declared: &str, upstream: &Version, force: bool) -> Self {
        if declared != upstream.as_str() {
            Self::VersionChanged
        } else if force {
            Self::ForcedUpdate
        } else {
            Self::UpToDate
        }
    }

    pub fn needs_update(self) -> bool {
        self != Self::UpToDate
    }

    pub fn resets_revision(self) -> bool {
        self == Self::VersionChanged
    }
}

impl std::fmt::Display for UpdateDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::UpToDate => "up to date",
            Self::ForcedUpdate => "forced update",
            Self::VersionChanged => "version changed",
        })
    }
}
