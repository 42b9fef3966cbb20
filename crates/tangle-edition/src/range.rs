//! Edition ranges

use crate::{Edition, EditionError, Rel};
use std::cmp::Ordering;
use std::fmt;

/// An operator paired with an edition. `Rel::Any` carries no edition.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Range {
    op: Rel,
    edition: Option<Edition>,
}

impl Range {
    /// The unversioned range, matching every edition
    pub fn any() -> Self {
        Self::default()
    }

    pub fn new(op: Rel, edition: Edition) -> Self {
        if op == Rel::Any {
            return Self::any();
        }
        Self {
            op,
            edition: Some(edition),
        }
    }

    /// Parse an operator and an edition, e.g. `(">=", "1.2-3")`
    pub fn parse(op: &str, edition: &str) -> Result<Self, EditionError> {
        let op: Rel = op.parse()?;
        if op == Rel::Any {
            return Err(EditionError::InvalidOperator(op.to_string()));
        }
        Ok(Self::new(op, Edition::parse(edition)?))
    }

    pub fn op(&self) -> Rel {
        self.op
    }

    pub fn edition(&self) -> Option<&Edition> {
        self.edition.as_ref()
    }

    pub fn is_any(&self) -> bool {
        self.edition.is_none()
    }

    /// Whether `edition` lies inside the range
    pub fn matches(&self, edition: &Edition) -> bool {
        match &self.edition {
            None => true,
            Some(own) => self.op.accepts(edition.compare(own)),
        }
    }

    /// Whether some edition could satisfy both ranges
    pub fn overlaps(&self, other: &Range) -> bool {
        let (Some(mine), Some(theirs)) = (&self.edition, &other.edition) else {
            return true;
        };

        let ordering = mine.compare(theirs);

        if self.op == Rel::Ne || other.op == Rel::Ne {
            // a hole only excludes the single point it names
            return match (self.op, other.op) {
                (Rel::Ne, Rel::Eq) | (Rel::Eq, Rel::Ne) => ordering != Ordering::Equal,
                _ => true,
            };
        }

        match ordering {
            Ordering::Equal => {
                (self.op.includes_equal() && other.op.includes_equal())
                    || (self.op.includes_less() && other.op.includes_less())
                    || (self.op.includes_greater() && other.op.includes_greater())
            }
            Ordering::Less => self.op.includes_greater() || other.op.includes_less(),
            Ordering::Greater => self.op.includes_less() || other.op.includes_greater(),
        }
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.edition {
            None => Ok(()),
            Some(edition) => write!(f, "{} {}", self.op, edition),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(op: &str, ed: &str) -> Range {
        Range::parse(op, ed).unwrap()
    }

    fn ed(s: &str) -> Edition {
        Edition::parse(s).unwrap()
    }

    #[test]
    fn test_any_matches_everything() {
        assert!(Range::any().matches(&ed("0.0.1")));
        assert!(Range::any().overlaps(&range("<", "1.0")));
        assert_eq!(Range::new(Rel::Any, ed("1.0")), Range::any());
    }

    #[test]
    fn test_matches() {
        assert!(range(">=", "1.2").matches(&ed("1.2-7")));
        assert!(range("=", "1.2").matches(&ed("1.2-7")));
        assert!(!range("=", "1.2-6").matches(&ed("1.2-7")));
        assert!(!range("<", "1.2").matches(&ed("1.2")));
        assert!(range("!=", "2.0").matches(&ed("1.0")));
    }

    #[test]
    fn test_overlaps() {
        assert!(range(">=", "1.0").overlaps(&range("<", "2.0")));
        assert!(!range(">", "2.0").overlaps(&range("<", "2.0")));
        assert!(range(">=", "2.0").overlaps(&range("<=", "2.0")));
        assert!(!range("<", "1.0").overlaps(&range("=", "1.5")));
        assert!(range("=", "1.5").overlaps(&range(">", "1.0")));
        assert!(!range("=", "1.5").overlaps(&range("!=", "1.5")));
        assert!(range("!=", "1.5").overlaps(&range(">", "1.0")));
    }

    #[test]
    fn test_parse_rejects_bare_operator() {
        assert!(Range::parse("", "1.0").is_err());
        assert!(Range::parse("~>", "1.0").is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(range(">=", "1:2.0-1").to_string(), ">= 1:2.0-1");
        assert_eq!(Range::any().to_string(), "");
    }
}
