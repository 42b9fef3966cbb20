//! Edition parsing and rpm-style ordering

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while parsing editions, operators or ranges
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditionError {
    #[error("Empty edition")]
    Empty,

    #[error("Invalid epoch in edition '{0}'")]
    InvalidEpoch(String),

    #[error("Missing version in edition '{0}'")]
    MissingVersion(String),

    #[error("Invalid operator: {0}")]
    InvalidOperator(String),

    #[error("Malformed expression: {0}")]
    Malformed(String),
}

/// An `[epoch:]version[-release]` edition.
///
/// Equality is structural. Ordering follows [`Edition::compare`] and falls
/// back to the literal strings so that `Ord` stays consistent with `Eq`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Edition {
    epoch: u32,
    version: String,
    release: Option<String>,
}

impl Edition {
    pub fn new(epoch: u32, version: impl Into<String>, release: Option<String>) -> Self {
        Self {
            epoch,
            version: version.into(),
            release,
        }
    }

    /// Parse `[epoch:]version[-release]`.
    ///
    /// The release is everything after the last `-`; an epoch is only
    /// recognised when the part before the first `:` is all digits.
    pub fn parse(input: &str) -> Result<Self, EditionError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(EditionError::Empty);
        }

        let (epoch, rest) = match input.split_once(':') {
            Some((epoch, rest)) => {
                if epoch.is_empty() || !epoch.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(EditionError::InvalidEpoch(input.to_string()));
                }
                let epoch = epoch
                    .parse::<u32>()
                    .map_err(|_| EditionError::InvalidEpoch(input.to_string()))?;
                (epoch, rest)
            }
            None => (0, input),
        };

        let (version, release) = match rest.rsplit_once('-') {
            Some((version, release)) if !release.is_empty() => (version, Some(release.to_string())),
            Some((version, _)) => (version, None),
            None => (rest, None),
        };

        if version.is_empty() {
            return Err(EditionError::MissingVersion(input.to_string()));
        }

        Ok(Self::new(epoch, version, release))
    }

    pub fn epoch(&self) -> u32 {
        self.epoch
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn release(&self) -> Option<&str> {
        self.release.as_deref()
    }

    /// Semantic comparison: epoch, then version, then release.
    ///
    /// A missing release on either side compares equal, so `1.0` matches
    /// `1.0-3` when used in a range.
    pub fn compare(&self, other: &Edition) -> Ordering {
        self.epoch
            .cmp(&other.epoch)
            .then_with(|| compare_segments(&self.version, &other.version))
            .then_with(|| match (&self.release, &other.release) {
                (Some(a), Some(b)) => compare_segments(a, b),
                _ => Ordering::Equal,
            })
    }
}

impl PartialOrd for Edition {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Edition {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
            .then_with(|| self.version.cmp(&other.version))
            .then_with(|| self.release.cmp(&other.release))
    }
}

impl FromStr for Edition {
    type Err = EditionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Edition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.epoch > 0 {
            write!(f, "{}:", self.epoch)?;
        }
        write!(f, "{}", self.version)?;
        if let Some(release) = &self.release {
            write!(f, "-{}", release)?;
        }
        Ok(())
    }
}

/// Compare two version or release strings segment by segment.
///
/// Runs of digits compare numerically and beat runs of letters. A `~`
/// sorts before everything, including the end of the string. Any other
/// non-alphanumeric character only separates segments.
pub fn compare_segments(a: &str, b: &str) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }

    let mut one = a.as_bytes();
    let mut two = b.as_bytes();

    loop {
        one = skip_separators(one);
        two = skip_separators(two);

        match (one.first() == Some(&b'~'), two.first() == Some(&b'~')) {
            (true, true) => {
                one = &one[1..];
                two = &two[1..];
                continue;
            }
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            (false, false) => {}
        }

        if one.is_empty() || two.is_empty() {
            break;
        }

        let numeric = one[0].is_ascii_digit();
        let (seg_one, rest_one) = split_segment(one, numeric);
        let (seg_two, rest_two) = split_segment(two, numeric);

        if seg_two.is_empty() {
            // segment types differ; numbers are newer than letters
            return if numeric {
                Ordering::Greater
            } else {
                Ordering::Less
            };
        }

        let ordering = if numeric {
            let seg_one = trim_leading_zeros(seg_one);
            let seg_two = trim_leading_zeros(seg_two);
            seg_one
                .len()
                .cmp(&seg_two.len())
                .then_with(|| seg_one.cmp(seg_two))
        } else {
            seg_one.cmp(seg_two)
        };

        if ordering != Ordering::Equal {
            return ordering;
        }

        one = rest_one;
        two = rest_two;
    }

    match (one.is_empty(), two.is_empty()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, _) => Ordering::Greater,
    }
}

fn skip_separators(s: &[u8]) -> &[u8] {
    let skip = s
        .iter()
        .take_while(|c| !c.is_ascii_alphanumeric() && **c != b'~')
        .count();
    &s[skip..]
}

fn split_segment(s: &[u8], numeric: bool) -> (&[u8], &[u8]) {
    let len = s
        .iter()
        .take_while(|c| {
            if numeric {
                c.is_ascii_digit()
            } else {
                c.is_ascii_alphabetic()
            }
        })
        .count();
    s.split_at(len)
}

fn trim_leading_zeros(s: &[u8]) -> &[u8] {
    let zeros = s.iter().take_while(|c| **c == b'0').count();
    &s[zeros..]
}
