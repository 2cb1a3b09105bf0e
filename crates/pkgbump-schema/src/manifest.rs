use crate::config::ManifestKeys;
use crate::ManifestError;
use serde::Serialize;
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Byte range of the value of `key` within `line`, if `line` assigns `key`.
///
/// Recognized forms, after optional leading whitespace:
/// - `key="value"` / `key='value'`: the text between the first pair of quotes
///   (or to end of line if the closing quote is missing)
/// - `key=value`: the text after `=`, minus a trailing ` # comment`
pub(crate) fn value_span(line: &str, key: &str) -> Option<Range<usize>> {
    let indent = line.len() - line.trim_start().len();
    let rest = line[indent..].strip_prefix(key)?.strip_prefix('=')?;
    let start = indent + key.len() + 1;
    let body = rest.trim_end_matches(['\n', '\r']);

    match body.chars().next() {
        Some(quote @ ('"' | '\'')) => {
            let inner = start + 1;
            let end = body[1..]
                .find(quote)
                .map_or(start + body.len(), |i| inner + i);
            Some(inner..end)
        }
        _ => {
            let cut = body
                .find(" #")
                .or_else(|| body.find("\t#"))
                .unwrap_or(body.len());
            Some(start..start + body[..cut].trim_end().len())
        }
    }
}

/// Extract the value of the first `key=...` assignment in `contents`.
///
/// Returns `None` when no line assigns `key` or the value is empty. Nothing is
/// evaluated: `pkgname=${_reponame}` yields the literal `${_reponame}`.
pub fn extract_field(contents: &str, key: &str) -> Option<String> {
    contents.lines().find_map(|line| {
        let span = value_span(line, key)?;
        let value = line[span].trim();
        Some(value.to_owned())
    })
    .filter(|v| !v.is_empty())
}

/// Files in `dir` that look like license texts and should travel with the
/// manifest to the registry.
pub fn find_license_files(dir: &Path) -> Result<Vec<String>, std::io::Error> {
    let mut found = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            continue;
        };
        let is_license = name == "LICENSE"
            || name == "COPYING"
            || name.starts_with("LICENSE.")
            || name.starts_with("LICENSE-");
        if is_license {
            found.push(name);
        }
    }
    found.sort();
    Ok(found)
}

/// A `$var` reference or an `(...)` array: shell text that is not a literal.
fn is_expression(value: &str) -> bool {
    value.contains('$') || value.starts_with('(')
}

/// Declared fields of one package's manifest, as read from disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageManifest {
    pub path: PathBuf,
    pub name: String,
    pub version: String,
    /// `None` if the revision line is missing or not a plain integer.
    pub revision: Option<u32>,
    pub upstream_owner: Option<String>,
    pub upstream_repo: Option<String>,
    pub install_file: Option<String>,
}

impl PackageManifest {
    /// Parse manifest `contents`. `dir_name` is the fallback package name when
    /// the name field is absent or is not a literal (e.g. a `$var` reference).
    /// Any other literal is kept verbatim, unsafe or not, for the caller's
    /// whitelist to judge.
    pub fn parse(
        contents: &str,
        keys: &ManifestKeys,
        path: &Path,
        dir_name: &str,
    ) -> Result<Self, ManifestError> {
        let name = match extract_field(contents, &keys.name_key) {
            Some(n) if !is_expression(&n) => n,
            other => {
                debug!(
                    "'{}' is {:?}; falling back to directory name '{dir_name}'",
                    keys.name_key, other
                );
                dir_name.to_owned()
            }
        };

        let version = extract_field(contents, &keys.version_key).ok_or_else(|| {
            ManifestError::MissingField {
                field: keys.version_key.clone(),
                path: path.to_path_buf(),
            }
        })?;

        let revision = extract_field(contents, &keys.revision_key).and_then(|r| r.parse().ok());

        Ok(Self {
            path: path.to_path_buf(),
            name,
            version,
            revision,
            upstream_owner: extract_field(contents, &keys.owner_key),
            upstream_repo: extract_field(contents, &keys.repo_key),
            install_file: extract_field(contents, &keys.install_key),
        })
    }

    /// Load the manifest named by `keys.file` from `package_dir`.
    pub fn load(package_dir: &Path, keys: &ManifestKeys) -> Result<Self, ManifestError> {
        let path = package_dir.join(&keys.file);
        if !path.is_file() {
            return Err(ManifestError::NotFound(path));
        }
        let contents = fs::read_to_string(&path)?;
        let dir_name = package_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::parse(&contents, keys, &path, &dir_name)
    }
}
