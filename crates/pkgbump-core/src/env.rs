use pkgbump_registry::PublishConfig;
use pkgbump_upstream::UpstreamConfig;

/// Run configuration read from the process environment.
#[derive(Debug, Clone, Default)]
pub struct RunEnvironment {
    pub upstream: UpstreamConfig,
    pub publish: PublishConfig,
    pub skip_prereqs: bool,
    /// Replacement for `updpkgsums`.
    pub checksum_program: Option<String>,
    /// Replacement for `makepkg`.
    pub build_program: Option<String>,
}

impl RunEnvironment {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            upstream: UpstreamConfig::from_lookup(&lookup),
            publish: PublishConfig::from_lookup(&lookup),
            skip_prereqs: lookup("PKGBUMP_SKIP_PREREQS").is_some_and(|v| v.trim() == "1"),
            checksum_program: non_empty("PKGBUMP_UPDPKGSUMS"),
            build_program: non_empty("PKGBUMP_MAKEPKG"),
        }
    }

    /// Whether the build should run without prompts by default.
    pub fn automated(&self) -> bool {
        self.publish.automated
    }
}
