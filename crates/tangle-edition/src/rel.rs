//! Relational operators used by ranges

use crate::EditionError;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Relation between a candidate edition and the edition of a range
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Rel {
    /// Any edition (unversioned)
    #[default]
    Any,
    /// Equal (=)
    Eq,
    /// Not equal (!=)
    Ne,
    /// Less than (<)
    Lt,
    /// Less than or equal (<=)
    Le,
    /// Greater than (>)
    Gt,
    /// Greater than or equal (>=)
    Ge,
}

const LESS: u8 = 1;
const EQUAL: u8 = 2;
const GREATER: u8 = 4;

impl Rel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rel::Any => "",
            Rel::Eq => "=",
            Rel::Ne => "!=",
            Rel::Lt => "<",
            Rel::Le => "<=",
            Rel::Gt => ">",
            Rel::Ge => ">=",
        }
    }

    /// Whether an ordering of `candidate` against the range edition satisfies the relation
    pub fn accepts(&self, ordering: Ordering) -> bool {
        match self {
            Rel::Any => true,
            Rel::Ne => ordering != Ordering::Equal,
            _ => {
                let bit = match ordering {
                    Ordering::Less => LESS,
                    Ordering::Equal => EQUAL,
                    Ordering::Greater => GREATER,
                };
                self.bits() & bit != 0
            }
        }
    }

    /// Direction bits of the relation
    pub(crate) fn bits(&self) -> u8 {
        match self {
            Rel::Any => LESS | EQUAL | GREATER,
            Rel::Eq => EQUAL,
            Rel::Ne => LESS | GREATER,
            Rel::Lt => LESS,
            Rel::Le => LESS | EQUAL,
            Rel::Gt => GREATER,
            Rel::Ge => GREATER | EQUAL,
        }
    }

    pub(crate) fn includes_less(&self) -> bool {
        self.bits() & LESS != 0
    }

    pub(crate) fn includes_equal(&self) -> bool {
        self.bits() & EQUAL != 0
    }

    pub(crate) fn includes_greater(&self) -> bool {
        self.bits() & GREATER != 0
    }
}

impl FromStr for Rel {
    type Err = EditionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Ok(Rel::Any),
            "=" | "==" => Ok(Rel::Eq),
            "!=" | "<>" => Ok(Rel::Ne),
            "<" => Ok(Rel::Lt),
            "<=" => Ok(Rel::Le),
            ">" => Ok(Rel::Gt),
            ">=" => Ok(Rel::Ge),
            _ => Err(EditionError::InvalidOperator(s.to_string())),
        }
    }
}

impl fmt::Display for Rel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
