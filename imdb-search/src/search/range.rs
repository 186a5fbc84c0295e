use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// An inclusive range filter over non-negative integers.
///
/// Either end of the range may be unbounded. A range with both ends
/// unbounded places no constraint on anything.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct RangeFilter {
    min: Option<u32>,
    max: Option<u32>,
}

impl RangeFilter {
    /// Create a new range from optional lower and upper inclusive bounds.
    pub fn new(min: Option<u32>, max: Option<u32>) -> RangeFilter {
        RangeFilter { min, max }
    }

    /// A range that places no constraint on anything.
    pub fn none() -> RangeFilter {
        RangeFilter { min: None, max: None }
    }

    /// A range containing exactly one value.
    pub fn exactly(n: u32) -> RangeFilter {
        RangeFilter { min: Some(n), max: Some(n) }
    }

    /// A range containing every value greater than or equal to `min`.
    pub fn at_least(min: u32) -> RangeFilter {
        RangeFilter { min: Some(min), max: None }
    }

    /// A range containing every value less than or equal to `max`.
    pub fn at_most(max: u32) -> RangeFilter {
        RangeFilter { min: None, max: Some(max) }
    }

    /// A range containing every value in `[min, max]`.
    pub fn between(min: u32, max: u32) -> RangeFilter {
        RangeFilter { min: Some(min), max: Some(max) }
    }

    /// The inclusive lower bound, if one exists.
    pub fn min(&self) -> Option<u32> {
        self.min
    }

    /// The inclusive upper bound, if one exists.
    pub fn max(&self) -> Option<u32> {
        self.max
    }

    /// Returns true if and only if this range places no constraint.
    pub fn is_none(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }
}

impl fmt::Display for RangeFilter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match (self.min, self.max) {
            (None, None) => write!(f, "-"),
            (Some(s), None) => write!(f, "{}-", s),
            (None, Some(e)) => write!(f, "-{}", e),
            (Some(s), Some(e)) if s == e => write!(f, "{}", s),
            (Some(s), Some(e)) => write!(f, "{}-{}", s, e),
        }
    }
}

impl FromStr for RangeFilter {
    type Err = Error;

    fn from_str(range: &str) -> Result<RangeFilter> {
        let range = range.trim();
        let (start, end) = match range.find('-') {
            None => {
                let n = range.parse::<u32>().map_err(Error::number)?;
                return Ok(RangeFilter::exactly(n));
            }
            Some(i) => {
                let (start, end) = range.split_at(i);
                (start.trim(), end[1..].trim())
            }
        };
        let bound = |s: &str| -> Result<Option<u32>> {
            if s.is_empty() {
                Ok(None)
            } else {
                s.parse::<u32>().map(Some).map_err(Error::number)
            }
        };
        Ok(RangeFilter { min: bound(start)?, max: bound(end)? })
    }
}
