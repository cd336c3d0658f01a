//! Canadian postal codes.
//!
//! A postal code has the shape `A1A 1A1`. The first three characters form the
//! Forward Sortation Area (FSA), a coarse geographic bucket that is handy for
//! matching workers to clients without a full geocode.

use crate::{GeoError, Result};
use std::fmt;
use std::str::FromStr;

/// Letters Canada Post never uses anywhere in a code
const NEVER_USED: [char; 6] = ['D', 'F', 'I', 'O', 'Q', 'U'];

/// Letters not allowed as the first character
const NOT_FIRST: [char; 2] = ['W', 'Z'];

/// A validated Canadian postal code, stored in canonical `A1A 1A1` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PostalCode(String);

impl PostalCode {
    /// Parses a postal code.
    ///
    /// Accepts `A1A1A1`, `A1A 1A1` and `A1A-1A1`, in any letter case, with
    /// surrounding whitespace.
    ///
    /// ```
    /// use careline_geo::PostalCode;
    ///
    /// let code = PostalCode::parse(" m5v3l9 ").unwrap();
    /// assert_eq!(code.to_string(), "M5V 3L9");
    /// assert_eq!(code.fsa(), "M5V");
    /// ```
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = || GeoError::InvalidPostalCode(input.trim().to_string());

        let upper = input.trim().to_ascii_uppercase();
        if !upper.is_ascii() {
            return Err(invalid());
        }
        let compact: String = match upper.len() {
            6 => upper,
            7 => {
                let (fsa, rest) = upper.split_at(3);
                let ldu = rest.strip_prefix([' ', '-']).ok_or_else(invalid)?;
                format!("{fsa}{ldu}")
            }
            _ => return Err(invalid()),
        };

        let valid_shape = compact.chars().enumerate().all(|(i, c)| {
            if i % 2 == 0 {
                c.is_ascii_uppercase() && !NEVER_USED.contains(&c) && !(i == 0 && NOT_FIRST.contains(&c))
            } else {
                c.is_ascii_digit()
            }
        });

        if !valid_shape || compact.chars().count() != 6 {
            return Err(invalid());
        }

        Ok(Self(format!("{} {}", &compact[..3], &compact[3..])))
    }

    /// Returns true when `input` parses as a postal code.
    pub fn looks_like(input: &str) -> bool {
        Self::parse(input).is_ok()
    }

    /// Forward Sortation Area: the first three characters.
    pub fn fsa(&self) -> &str {
        &self.0[..3]
    }

    /// Local Delivery Unit: the last three characters.
    pub fn ldu(&self) -> &str {
        &self.0[4..]
    }

    /// Canonical `A1A 1A1` form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostalCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PostalCode {
    type Err = GeoError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
