//! Validated string identifiers.
//!
//! Every value that ends up interpolated into a file, a commit message, a URL
//! or a child process argument goes through one of these newtypes first.

use crate::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

/// Returns true if `s` is non-empty and every character is in `[0-9a-zA-Z._+-]`.
pub fn is_safe_token(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '+' | '-'))
}

/// Reject anything that is not a plain file name in the package directory.
pub fn validate_file_name(name: &str) -> Result<(), ValidationError> {
    let plain = !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0');
    if plain {
        Ok(())
    } else {
        Err(ValidationError::UnsafeFileName(name.to_owned()))
    }
}

macro_rules! safe_newtype {
    ($(#[$meta:meta])* $name:ident, $err:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Validate `s` against the whitelist.
            pub fn parse(s: impl Into<String>) -> Result<Self, ValidationError> {
                let s = s.into();
                if is_safe_token(&s) {
                    Ok(Self(s))
                } else {
                    Err($err(s))
                }
            }

            /// Return the inner string as a slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume self and return the inner `String`.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl Deref for $name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;
            fn try_from(s: String) -> Result<Self, Self::Error> {
                Self::parse(s)
            }
        }

        impl From<$name> for String {
            fn from(v: $name) -> String {
                v.0
            }
        }
    };
}

safe_newtype!(
    /// A version string that passed the whitelist. Safe to write into the
    /// manifest and to pass to child processes.
    Version,
    ValidationError::UnsafeVersion
);

safe_newtype!(
    /// A package identifier (directory or `pkgname`) that passed the whitelist.
    PackageName,
    |value| ValidationError::UnsafeIdentifier {
        kind: "package name",
        value,
    }
);
