//! Package and dependency-pattern names.

use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};

use crate::Error;

/// A validated package name, e.g. `foo` or `foo-utils`.
///
/// Names must be non-empty and consist only of `[A-Za-z0-9_.+-]`, matching the character set
/// xbps accepts in `pkgname`.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Name(String);

impl Name {
    /// Validates and wraps a package name.
    pub fn new(name: impl Into<String>) -> Result<Self, Error> {
        let name = name.into();
        if name.is_empty() || !name.chars().all(is_name_char) {
            return Err(Error::InvalidName(name));
        }
        Ok(Self(name))
    }

    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Name {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Display for Name {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Name {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '+' | '-')
}
