//! Package records and their on-disk `pkg.meta` encoding.

use std::{
    fmt::{self, Display, Formatter},
    path::Path,
    str::FromStr,
};

use xbps_types::{DependencyPattern, Name, Version};

use crate::Error;

/// The lifecycle state of one entry in the package database.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PackageState {
    /// No record exists; the package is not installed.
    NotInstalled,
    /// Files have been extracted but the post-install step has not run.
    Unpacked,
    /// Fully installed and configured.
    Installed,
    /// A removal was interrupted after unlinking files but before the metadata was dropped.
    HalfRemoved,
}

impl Display for PackageState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            PackageState::NotInstalled => "not-installed",
            PackageState::Unpacked => "unpacked",
            PackageState::Installed => "installed",
            PackageState::HalfRemoved => "half-removed",
        };
        write!(f, "{s}")
    }
}

impl FromStr for PackageState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not-installed" => Ok(PackageState::NotInstalled),
            "unpacked" => Ok(PackageState::Unpacked),
            "installed" => Ok(PackageState::Installed),
            "half-removed" => Ok(PackageState::HalfRemoved),
            other => Err(format!("unknown package state {other:?}")),
        }
    }
}

/// An immutable-after-load description of one package, installed or known from a repository.
#[derive(Clone, Debug)]
pub struct PackageRecord {
    /// The package's name.
    pub name: Name,
    /// The package's version.
    pub version: Version,
    /// `"<name>-<version>"`, the canonical on-disk directory stem.
    pub pkgver: String,
    /// Run-time dependency patterns, in declaration order.
    pub run_depends: Vec<DependencyPattern>,
    /// Virtual packages this package provides.
    pub provides: Vec<DependencyPattern>,
    /// Packages this package replaces.
    pub replaces: Vec<DependencyPattern>,
    /// Packages this package conflicts with.
    pub conflicts: Vec<DependencyPattern>,
    /// The repository this record originated from; empty for installed-only records.
    pub repository: String,
    /// Whether the package was installed only to satisfy another package's dependency.
    pub automatic: bool,
    /// The record's current lifecycle state.
    pub state: PackageState,
}

impl PackageRecord {
    /// Returns whether this record advertises `pattern` as a virtual provision, honoring the
    /// requested version constraint exactly as `Repository::find_virtualpkg` does: an unversioned
    /// `provides` entry satisfies any requested version, a versioned one must itself satisfy
    /// `pattern`'s constraint.
    pub fn provides_pattern(&self, pattern: &DependencyPattern) -> bool {
        self.provides.iter().any(|p| {
            p.name() == pattern.name()
                && p.constraint()
                    .map(|(_, v)| pattern.matches(v))
                    .unwrap_or(true)
        })
    }

    /// Serializes this record to the `pkg.meta` key/value text format.
    pub fn to_meta(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("name={}\n", self.name));
        out.push_str(&format!("version={}\n", self.version));
        out.push_str(&format!("pkgver={}\n", self.pkgver));
        out.push_str(&format!("state={}\n", self.state));
        out.push_str(&format!("automatic={}\n", self.automatic));
        out.push_str(&format!("repository={}\n", self.repository));
        for pattern in &self.run_depends {
            out.push_str(&format!("run_depends={pattern}\n"));
        }
        for pattern in &self.provides {
            out.push_str(&format!("provides={pattern}\n"));
        }
        for pattern in &self.replaces {
            out.push_str(&format!("replaces={pattern}\n"));
        }
        for pattern in &self.conflicts {
            out.push_str(&format!("conflicts={pattern}\n"));
        }
        out
    }

    /// Parses a `pkg.meta` file's contents, reporting `path` on error.
    pub fn from_meta(contents: &str, path: &Path) -> Result<Self, Error> {
        let malformed = |reason: String| Error::MalformedEntry {
            path: path.to_path_buf(),
            reason,
        };

        let mut name = None;
        let mut version = None;
        let mut pkgver = None;
        let mut state = None;
        let mut automatic = None;
        let mut repository = String::new();
        let mut run_depends = Vec::new();
        let mut provides = Vec::new();
        let mut replaces = Vec::new();
        let mut conflicts = Vec::new();

        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (key, value) = line
                .split_once('=')
                .ok_or_else(|| malformed(format!("line without '=': {line:?}")))?;
            match key {
                "name" => name = Some(Name::from_str(value)?),
                "version" => version = Some(Version::from_str(value)?),
                "pkgver" => pkgver = Some(value.to_string()),
                "state" => {
                    state = Some(
                        PackageState::from_str(value)
                            .map_err(|reason| malformed(reason))?,
                    )
                }
                "automatic" => {
                    automatic = Some(
                        value
                            .parse::<bool>()
                            .map_err(|_| malformed(format!("invalid bool {value:?}")))?,
                    )
                }
                "repository" => repository = value.to_string(),
                "run_depends" => run_depends.push(DependencyPattern::from_str(value)?),
                "provides" => provides.push(DependencyPattern::from_str(value)?),
                "replaces" => replaces.push(DependencyPattern::from_str(value)?),
                "conflicts" => conflicts.push(DependencyPattern::from_str(value)?),
                other => return Err(malformed(format!("unknown key {other:?}"))),
            }
        }

        Ok(Self {
            name: name.ok_or_else(|| malformed("missing 'name'".to_string()))?,
            version: version.ok_or_else(|| malformed("missing 'version'".to_string()))?,
            pkgver: pkgver.ok_or_else(|| malformed("missing 'pkgver'".to_string()))?,
            run_depends,
            provides,
            replaces,
            conflicts,
            repository,
            automatic: automatic.ok_or_else(|| malformed("missing 'automatic'".to_string()))?,
            state: state.ok_or_else(|| malformed("missing 'state'".to_string()))?,
        })
    }
}
