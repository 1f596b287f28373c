//! Dependency patterns: `name`, or `name[op]version` where `op` constrains a candidate version.

use std::{
    cmp::Ordering,
    fmt::{self, Display, Formatter},
    str::FromStr,
};

use crate::{Error, Name, Version};

/// A version comparison operator appearing in a dependency pattern.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ComparisonOp {
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `=`
    Eq,
    /// `>=`
    Ge,
    /// `>`
    Gt,
}

impl ComparisonOp {
    /// The comparator strings, tried longest-first so `<=`/`>=` are not mistaken for `<`/`>`.
    const ALL: &'static [(&'static str, ComparisonOp)] = &[
        ("<=", ComparisonOp::Le),
        (">=", ComparisonOp::Ge),
        ("<", ComparisonOp::Lt),
        (">", ComparisonOp::Gt),
        ("=", ComparisonOp::Eq),
    ];

    /// Returns whether `ord`, the result of comparing a candidate version against the pattern's
    /// version (`candidate.cmp(pattern)`), satisfies this operator.
    pub fn accepts(self, ord: Ordering) -> bool {
        match self {
            ComparisonOp::Lt => ord == Ordering::Less,
            ComparisonOp::Le => ord != Ordering::Greater,
            ComparisonOp::Eq => ord == Ordering::Equal,
            ComparisonOp::Ge => ord != Ordering::Less,
            ComparisonOp::Gt => ord == Ordering::Greater,
        }
    }
}

impl Display for ComparisonOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            ComparisonOp::Lt => "<",
            ComparisonOp::Le => "<=",
            ComparisonOp::Eq => "=",
            ComparisonOp::Ge => ">=",
            ComparisonOp::Gt => ">",
        };
        write!(f, "{s}")
    }
}

/// A dependency requirement: a package name, optionally constrained to a version range.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DependencyPattern {
    name: Name,
    constraint: Option<(ComparisonOp, Version)>,
}

impl DependencyPattern {
    /// The package name this pattern constrains.
    pub fn name(&self) -> &Name {
        &self.name
    }

    /// The version and comparison operator this pattern requires, if any.
    pub fn constraint(&self) -> Option<(ComparisonOp, &Version)> {
        self.constraint.as_ref().map(|(op, v)| (*op, v))
    }

    /// Returns whether `candidate` satisfies this pattern.
    pub fn matches(&self, candidate: &Version) -> bool {
        match &self.constraint {
            None => true,
            Some((op, required)) => op.accepts(candidate.cmp_xbps(required)),
        }
    }
}

impl FromStr for DependencyPattern {
    type Err = Error;

    /// Parses `name` or `name<op>version`, trying each comparator in [`ComparisonOp::ALL`] (two-
    /// character operators first) to find the split point between name and version.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        for (op_str, op) in ComparisonOp::ALL {
            if let Some((name, version)) = input.split_once(op_str) {
                if name.is_empty() || version.is_empty() {
                    return Err(Error::MalformedPattern(input.to_string()));
                }
                let name = Name::new(name)?;
                let version = version.parse()?;
                return Ok(Self {
                    name,
                    constraint: Some((*op, version)),
                });
            }
        }
        let name = Name::new(input)?;
        Ok(Self {
            name,
            constraint: None,
        })
    }
}

impl Display for DependencyPattern {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some((op, version)) = &self.constraint {
            write!(f, "{op}{version}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("foo", "foo", None)]
    #[case("foo>=1.0", "foo", Some((ComparisonOp::Ge, "1.0")))]
    #[case("foo<=1.0", "foo", Some((ComparisonOp::Le, "1.0")))]
    #[case("foo<1.0", "foo", Some((ComparisonOp::Lt, "1.0")))]
    #[case("foo>1.0", "foo", Some((ComparisonOp::Gt, "1.0")))]
    #[case("foo=1.0", "foo", Some((ComparisonOp::Eq, "1.0")))]
    fn parses(
        #[case] input: &str,
        #[case] name: &str,
        #[case] constraint: Option<(ComparisonOp, &str)>,
    ) {
        let pattern: DependencyPattern = input.parse().unwrap();
        assert_eq!(pattern.name().as_str(), name);
        match constraint {
            None => assert!(pattern.constraint().is_none()),
            Some((op, v)) => {
                let (got_op, got_v) = pattern.constraint().unwrap();
                assert_eq!(got_op, op);
                assert_eq!(got_v, &v.parse::<Version>().unwrap());
            }
        }
    }

    #[test]
    fn matches_respects_operator() {
        let pattern: DependencyPattern = "foo>=1.5".parse().unwrap();
        assert!(!pattern.matches(&"1.0".parse().unwrap()));
        assert!(pattern.matches(&"1.5".parse().unwrap()));
        assert!(pattern.matches(&"2.0".parse().unwrap()));
    }

    #[test]
    fn unconstrained_matches_anything() {
        let pattern: DependencyPattern = "foo".parse().unwrap();
        assert!(pattern.matches(&"0.0.1".parse().unwrap()));
    }

    #[test]
    fn rejects_dangling_operator() {
        assert!(matches!(
            "foo>=".parse::<DependencyPattern>(),
            Err(Error::MalformedPattern(_))
        ));
    }
}
