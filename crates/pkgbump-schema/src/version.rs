use crate::types::Version;
use crate::ValidationError;
use serde::{Deserialize, Serialize};

/// Where a release tag came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseOrigin {
    /// The upstream releases API.
    Api,
    /// A package-specific override command.
    Hook,
}

/// The normalized outcome of an upstream query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedRelease {
    pub raw_tag: String,
    pub normalized_version: Version,
    pub origin: ReleaseOrigin,
}

impl ResolvedRelease {
    pub fn from_tag(raw_tag: &str, origin: ReleaseOrigin) -> Result<Self, ValidationError> {
        Ok(Self {
            raw_tag: raw_tag.to_owned(),
            normalized_version: normalize_tag(raw_tag)?,
            origin,
        })
    }
}

/// Strip at most one leading `v` and validate what remains.
///
/// The `v` is only stripped when a digit follows it, so the result never
/// starts with a strippable `v` and normalizing twice is a no-op. Surrounding
/// whitespace is trimmed first; anything else outside the whitelist is an
/// error, never silently dropped.
pub fn normalize_tag(tag: &str) -> Result<Version, ValidationError> {
    let trimmed = tag.trim();
    let stripped = match trimmed.strip_prefix('v') {
        Some(rest) if rest.starts_with(|c: char| c.is_ascii_digit()) => rest,
        _ => trimmed,
    };
    Version::parse(stripped)
}
