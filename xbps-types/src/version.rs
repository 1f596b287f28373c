//! Package version tokens and the xbps version comparator.
//!
//! A version token has the form `[epoch:]pkgver[-pkgrel]`. `epoch` is a non-negative integer used
//! to force a package to be considered newer than its own un-epoched history; `pkgver` is the
//! upstream version string; `pkgrel` is the package's own build revision.

use std::{
    cmp::Ordering,
    fmt::{self, Display, Formatter},
    str::FromStr,
};

use crate::Error;

/// A full package version: optional epoch, a pkgver, and an optional pkgrel.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Version {
    epoch: Option<u64>,
    pkgver: String,
    pkgrel: Option<String>,
}

impl Version {
    /// Creates a [`Version`] from its already-validated components.
    pub fn new(epoch: Option<u64>, pkgver: String, pkgrel: Option<String>) -> Result<Self, Error> {
        if pkgver.is_empty() || !pkgver.chars().all(is_pkgver_char) {
            return Err(Error::InvalidPkgver(pkgver));
        }
        if let Some(rel) = pkgrel.as_ref()
            && (rel.is_empty() || !rel.chars().all(is_pkgrel_char))
        {
            return Err(Error::InvalidPkgrel(rel.clone()));
        }
        Ok(Self {
            epoch,
            pkgver,
            pkgrel,
        })
    }

    /// Returns the epoch, if any.
    pub fn epoch(&self) -> Option<u64> {
        self.epoch
    }

    /// Returns the upstream version string.
    pub fn pkgver(&self) -> &str {
        &self.pkgver
    }

    /// Returns the package build revision, if any.
    pub fn pkgrel(&self) -> Option<&str> {
        self.pkgrel.as_deref()
    }

    /// Compares two versions using the xbps comparator.
    ///
    /// Reproduces `xbps_cmpver`: epoch compares numerically first (a missing epoch sorts lowest),
    /// then `pkgver` compares with [`compare_segments`], then `pkgrel` is the tiebreaker, compared
    /// the same way (a missing pkgrel sorts lowest).
    pub fn cmp_xbps(&self, other: &Self) -> Ordering {
        let epoch_ord = self.epoch.unwrap_or(0).cmp(&other.epoch.unwrap_or(0));
        if epoch_ord != Ordering::Equal {
            return epoch_ord;
        }
        let pkgver_ord = compare_segments(&self.pkgver, &other.pkgver);
        if pkgver_ord != Ordering::Equal {
            return pkgver_ord;
        }
        compare_segments(self.pkgrel.as_deref().unwrap_or(""), other.pkgrel.as_deref().unwrap_or(""))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cmp_xbps(other)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for Version {
    type Err = Error;

    /// Parses `[epoch:]pkgver[-pkgrel]`.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let (epoch, rest) = match input.split_once(':') {
            Some((epoch_str, rest)) => {
                let epoch = epoch_str
                    .parse::<u64>()
                    .map_err(|_| Error::InvalidEpoch(epoch_str.to_string()))?;
                (Some(epoch), rest)
            }
            None => (None, input),
        };
        let (pkgver, pkgrel) = match rest.rsplit_once('-') {
            Some((pkgver, pkgrel)) => (pkgver.to_string(), Some(pkgrel.to_string())),
            None => (rest.to_string(), None),
        };
        Self::new(epoch, pkgver, pkgrel)
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if let Some(epoch) = self.epoch {
            write!(f, "{epoch}:")?;
        }
        write!(f, "{}", self.pkgver)?;
        if let Some(rel) = &self.pkgrel {
            write!(f, "-{rel}")?;
        }
        Ok(())
    }
}

fn is_pkgver_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '+'
}

fn is_pkgrel_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

/// Classifies one run of a version string for [`compare_segments`].
#[derive(Clone, Copy, PartialEq, Eq)]
enum SegmentKind {
    Numeric,
    Alpha,
}

/// Splits a version string into alternating numeric/alphabetic runs, skipping any run of
/// non-alphanumeric separator characters (`.`, `_`, `+`, ...) in between.
fn segments(s: &str) -> Vec<(SegmentKind, &str)> {
    let mut out = Vec::new();
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        while i < bytes.len() && !bytes[i].is_ascii_alphanumeric() {
            i += 1;
        }
        if i >= bytes.len() {
            break;
        }
        let start = i;
        let kind = if bytes[i].is_ascii_digit() {
            SegmentKind::Numeric
        } else {
            SegmentKind::Alpha
        };
        while i < bytes.len()
            && bytes[i].is_ascii_alphanumeric()
            && matches!(
                (kind, bytes[i].is_ascii_digit()),
                (SegmentKind::Numeric, true) | (SegmentKind::Alpha, false)
            )
        {
            i += 1;
        }
        out.push((kind, &s[start..i]));
    }
    out
}

/// Component-wise numeric-then-alphabetic version comparison (the classic rpmvercmp /
/// Arch-vercmp / xbps_cmpver algorithm).
///
/// Segments are split at alphanumeric-class boundaries; separator runs (`.`, `_`, `+`, ...) are
/// not compared themselves. Numeric segments compare numerically (leading zeros stripped);
/// alphabetic segments compare lexically. A numeric segment always outranks an alphabetic one in
/// the same position. A longer sequence of segments outranks a shorter common prefix, unless the
/// extra segment is alphabetic, in which case it is outranked by the shorter, fully-numeric
/// string (an empty remainder is never beaten by a trailing alpha segment).
fn compare_segments(a: &str, b: &str) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }
    let a_segs = segments(a);
    let b_segs = segments(b);
    let mut i = 0;
    loop {
        match (a_segs.get(i), b_segs.get(i)) {
            (None, None) => return Ordering::Equal,
            (None, Some((kind, _))) => {
                return if *kind == SegmentKind::Numeric {
                    Ordering::Less
                } else {
                    Ordering::Greater
                };
            }
            (Some((kind, _)), None) => {
                return if *kind == SegmentKind::Numeric {
                    Ordering::Greater
                } else {
                    Ordering::Less
                };
            }
            (Some((a_kind, a_seg)), Some((b_kind, b_seg))) => {
                if a_kind != b_kind {
                    return if *a_kind == SegmentKind::Numeric {
                        Ordering::Greater
                    } else {
                        Ordering::Less
                    };
                }
                let ord = if *a_kind == SegmentKind::Numeric {
                    let a_trimmed = a_seg.trim_start_matches('0');
                    let b_trimmed = b_seg.trim_start_matches('0');
                    a_trimmed
                        .len()
                        .cmp(&b_trimmed.len())
                        .then_with(|| a_trimmed.cmp(b_trimmed))
                } else {
                    a_seg.cmp(b_seg)
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
        i += 1;
    }
}
