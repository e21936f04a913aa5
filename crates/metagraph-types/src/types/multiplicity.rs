//! Attribute multiplicity (cardinality and uniqueness).

use crate::error::TypeError;
use rkyv::{Archive, Deserialize, Serialize};
use std::fmt;

/// Cardinality and uniqueness contract of an attribute.
///
/// `upper == None` means the attribute may hold an unbounded number of values.
/// `is_unique` only applies to multi-valued attributes and means the
/// collection behaves as a set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Archive, Serialize, Deserialize)]
pub struct Multiplicity {
    lower: u32,
    upper: Option<u32>,
    is_unique: bool,
}

impl Multiplicity {
    /// Exactly one value.
    pub const REQUIRED: Multiplicity = Multiplicity {
        lower: 1,
        upper: Some(1),
        is_unique: false,
    };

    /// Zero or one value.
    pub const OPTIONAL: Multiplicity = Multiplicity {
        lower: 0,
        upper: Some(1),
        is_unique: false,
    };

    /// Any number of values, duplicates allowed.
    pub const COLLECTION: Multiplicity = Multiplicity {
        lower: 0,
        upper: None,
        is_unique: false,
    };

    /// Any number of distinct values.
    pub const SET: Multiplicity = Multiplicity {
        lower: 0,
        upper: None,
        is_unique: true,
    };

    /// Create a multiplicity, checking that the bounds are consistent.
    pub fn new(lower: u32, upper: Option<u32>, is_unique: bool) -> Result<Self, TypeError> {
        let invalid = |reason: &'static str| TypeError::InvalidMultiplicity {
            lower,
            upper,
            is_unique,
            reason,
        };

        match upper {
            Some(0) => return Err(invalid("upper bound must be at least 1")),
            Some(upper) if lower > upper => {
                return Err(invalid("lower bound exceeds upper bound"));
            }
            Some(1) if is_unique => {
                return Err(invalid("uniqueness requires a multi-valued upper bound"));
            }
            _ => {}
        }

        Ok(Self {
            lower,
            upper,
            is_unique,
        })
    }

    /// Lower bound on the number of values.
    pub fn lower(&self) -> u32 {
        self.lower
    }

    /// Upper bound on the number of values, `None` when unbounded.
    pub fn upper(&self) -> Option<u32> {
        self.upper
    }

    /// Whether values of a multi-valued attribute must be distinct.
    pub fn is_unique(&self) -> bool {
        self.is_unique
    }

    /// Whether at least one value is required.
    pub fn is_required(&self) -> bool {
        self.lower > 0
    }

    /// Whether more than one value is allowed.
    pub fn is_many(&self) -> bool {
        self.upper.map_or(true, |upper| upper > 1)
    }

    /// Check whether `count` values satisfy the bounds.
    pub fn admits(&self, count: usize) -> bool {
        let above_lower = count >= self.lower as usize;
        let below_upper = self.upper.map_or(true, |upper| count <= upper as usize);
        above_lower && below_upper
    }
}

impl Default for Multiplicity {
    fn default() -> Self {
        Self::OPTIONAL
    }
}

impl fmt::Display for Multiplicity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upper {
            Some(upper) => write!(f, "[{}..{}]", self.lower, upper)?,
            None => write!(f, "[{}..*]", self.lower)?,
        }
        if self.is_unique {
            write!(f, " unique")?;
        }
        Ok(())
    }
}
