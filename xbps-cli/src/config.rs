//! Run-time configuration: `rootdir`, `cachedir`, the conffile, and the flag bitmask (§6).

use std::{
    fs::{read_dir, read_to_string},
    path::{Path, PathBuf},
};

use crate::Error;

/// The flag bitmask described by the embedder API's `init(config)` (§6).
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Flags {
    /// Emit debug-level trace events, including dependency-chain depth (§7).
    pub debug: bool,
    /// Emit a `RemoveFile` event per file instead of only per package.
    pub verbose: bool,
    /// Force removal of files even where that would normally be refused.
    pub force_remove_files: bool,
    /// Never emit events through the system log, only through the registered callback.
    pub disable_syslog: bool,
    /// Proceed with a removal even if reverse dependencies exist.
    pub force_revdeps: bool,
}

/// Run-time configuration for one embedder [`crate::Handle`].
#[derive(Clone, Debug)]
pub struct Config {
    /// The alternate installation root; defaults to `/`.
    pub rootdir: PathBuf,
    /// The package cache directory, if any.
    pub cachedir: Option<PathBuf>,
    /// An explicit configuration file path, overriding `${rootdir}/etc/xbps.d/*.conf`.
    pub conffile: Option<PathBuf>,
    /// The parsed flag bitmask.
    pub flags: Flags,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rootdir: PathBuf::from("/"),
            cachedir: None,
            conffile: None,
            flags: Flags::default(),
        }
    }
}

impl Config {
    /// Directory under `rootdir` holding the installed-package database (§3a/§6).
    pub fn pkgdb_dir(&self) -> PathBuf {
        self.rootdir.join("var/db/xbps/pkgdb")
    }

    /// Directory under `rootdir` holding one subdirectory per configured repository.
    pub fn repodata_dir(&self) -> PathBuf {
        self.rootdir.join("var/db/xbps/repodata")
    }

    /// Merges `KEY=value` directives from the conffile into this configuration.
    ///
    /// Reads the explicit `conffile` path if set, otherwise every `*.conf` file (sorted by name,
    /// so later files win on conflicting keys) under `${rootdir}/etc/xbps.d/`. A missing default
    /// directory is not an error; an explicitly named missing file is.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigIo`] if an explicitly named file cannot be read, or
    /// [`Error::ConfigMalformed`] if a non-comment, non-blank line has no `=`.
    pub fn load_conffile(mut self) -> Result<Self, Error> {
        if let Some(path) = self.conffile.clone() {
            let contents = read_to_string(&path).map_err(|source| Error::ConfigIo {
                path: path.clone(),
                source,
            })?;
            self.apply(&contents, &path)?;
            return Ok(self);
        }

        let dir = self.rootdir.join("etc/xbps.d");
        let Ok(entries) = read_dir(&dir) else {
            return Ok(self);
        };
        let mut conf_files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "conf"))
            .collect();
        conf_files.sort();
        for path in conf_files {
            let contents = read_to_string(&path).map_err(|source| Error::ConfigIo {
                path: path.clone(),
                source,
            })?;
            self.apply(&contents, &path)?;
        }
        Ok(self)
    }

    fn apply(&mut self, contents: &str, path: &Path) -> Result<(), Error> {
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (key, value) = line.split_once('=').ok_or_else(|| Error::ConfigMalformed {
                path: path.to_path_buf(),
                line: line.to_string(),
            })?;
            let value = value.trim();
            match key.trim() {
                "rootdir" => self.rootdir = PathBuf::from(value),
                "cachedir" => self.cachedir = Some(PathBuf::from(value)),
                // Unknown directives are tolerated: this file also carries settings (e.g.
                // `syslog`, `repository`) outside this crate's scope.
                _ => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[test]
    fn missing_default_conf_dir_is_not_an_error() -> TestResult {
        let tmp = tempfile::tempdir()?;
        let config = Config {
            rootdir: tmp.path().to_path_buf(),
            ..Config::default()
        }
        .load_conffile()?;
        assert_eq!(config.cachedir, None);
        Ok(())
    }

    #[test]
    fn explicit_conffile_overrides_rootdir() -> TestResult {
        let tmp = tempfile::tempdir()?;
        let conf_path = tmp.path().join("xbps.conf");
        std::fs::write(&conf_path, "cachedir=/tmp/cache\n")?;
        let config = Config {
            conffile: Some(conf_path),
            ..Config::default()
        }
        .load_conffile()?;
        assert_eq!(config.cachedir, Some(PathBuf::from("/tmp/cache")));
        Ok(())
    }

    #[test]
    fn malformed_line_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let conf_path = tmp.path().join("xbps.conf");
        std::fs::write(&conf_path, "not-a-directive\n").unwrap();
        let err = Config {
            conffile: Some(conf_path),
            ..Config::default()
        }
        .load_conffile()
        .unwrap_err();
        assert!(matches!(err, Error::ConfigMalformed { .. }));
    }
}
