use std::fmt::{self, Display, Formatter};
use std::num::NonZeroUsize;

use super::MatrixError;

/// Side length of every matrix in one request. Always `>= 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Dimension(NonZeroUsize);

impl Dimension {
    pub fn new(n: usize) -> Option<Self> {
        NonZeroUsize::new(n).map(Dimension)
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0.get()
    }
}

impl Display for Dimension {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parses a base-10, strictly positive dimension.
///
/// Any failure, including an empty string, a sign, a fraction or overflow,
/// collapses into `InvalidDimension` carrying the raw text.
pub fn validate(raw: &str) -> Result<Dimension, MatrixError> {
    let invalid = || MatrixError::InvalidDimension { raw: raw.to_string() };

    // `usize::from_str` accepts a leading '+', a negative sign is a parse error
    let n = raw.parse::<usize>().map_err(|_| invalid())?;
    Dimension::new(n).ok_or_else(invalid)
}
