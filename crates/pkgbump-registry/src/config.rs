use pkgbump_schema::PackageName;
use serde::Serialize;
use std::fmt;

pub const DEFAULT_URL_TEMPLATE: &str = "ssh://aur@aur.archlinux.org/{name}.git";
pub const DEFAULT_BRANCH: &str = "master";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitIdentity {
    pub name: String,
    pub email: String,
}

impl Default for CommitIdentity {
    fn default() -> Self {
        Self {
            name: "pkgbump".to_owned(),
            email: "pkgbump@users.noreply.localhost".to_owned(),
        }
    }
}

/// True when `CI` or `GITHUB_ACTIONS` is set to `true` or `1`.
pub fn is_automated(lookup: impl Fn(&str) -> Option<String>) -> bool {
    ["CI", "GITHUB_ACTIONS"].iter().any(|key| {
        lookup(key).is_some_and(|v| {
            let v = v.trim();
            v == "1" || v.eq_ignore_ascii_case("true")
        })
    })
}

/// Where and how to publish.
#[derive(Clone, Serialize)]
pub struct PublishConfig {
    /// Registry clone URL with a `{name}` placeholder for the package name.
    pub url_template: String,
    pub branch: String,
    pub identity: CommitIdentity,
    /// Private key material. Never serialized or printed.
    #[serde(skip)]
    pub ssh_key: Option<String>,
    /// Pinned host keys in `known_hosts` format.
    pub known_hosts: Option<String>,
    pub automated: bool,
}

impl fmt::Debug for PublishConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublishConfig")
            .field("url_template", &self.url_template)
            .field("branch", &self.branch)
            .field("identity", &self.identity)
            .field("ssh_key", &self.ssh_key.as_ref().map(|_| "<redacted>"))
            .field("known_hosts", &self.known_hosts.is_some())
            .field("automated", &self.automated)
            .finish()
    }
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            url_template: DEFAULT_URL_TEMPLATE.to_owned(),
            branch: DEFAULT_BRANCH.to_owned(),
            identity: CommitIdentity::default(),
            ssh_key: None,
            known_hosts: None,
            automated: false,
        }
    }
}

impl PublishConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();
        Self {
            url_template: non_empty("PKGBUMP_REGISTRY_URL").unwrap_or(defaults.url_template),
            branch: non_empty("PKGBUMP_REGISTRY_BRANCH").unwrap_or(defaults.branch),
            identity: CommitIdentity {
                name: non_empty("PKGBUMP_GIT_NAME").unwrap_or(defaults.identity.name),
                email: non_empty("PKGBUMP_GIT_EMAIL").unwrap_or(defaults.identity.email),
            },
            ssh_key: non_empty("PKGBUMP_SSH_KEY"),
            known_hosts: non_empty("PKGBUMP_KNOWN_HOSTS"),
            automated: is_automated(&lookup),
        }
    }

    pub fn registry_url(&self, package: &PackageName) -> String {
        self.url_template.replace("{name}", package.as_str())
    }

    /// Both credential material and an automated environment are required
    /// for a real publish.
    pub fn can_publish(&self) -> bool {
        self.automated && self.ssh_key.is_some()
    }
}
