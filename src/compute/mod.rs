//! Matrix computation engine and the random table generator.
//!
//! Everything here is pure, CPU-bound work. Randomness always comes in as an
//! explicit `&mut R: Rng` so callers own their generator and tests can seed it.

pub mod dimension;
pub mod matrix;
pub mod table;

use rand::Rng;
use thiserror::Error;

pub use dimension::{validate, Dimension};
pub use matrix::{generate, multiply, Matrix, Summary};
pub use table::{generate_table, parse_rows, TableRow};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatrixError {
    /// Missing, non-numeric or non-positive dimension text.
    #[error("Invalid dimension parameter. Please provide a positive integer.")]
    InvalidDimension { raw: String },

    #[error("Shape mismatch: expected {expected}x{expected}, found {found}x{found}")]
    ShapeMismatch { expected: usize, found: usize },
}

/// Generates `A` then `B` for `dimension` and returns `A × B`.
pub fn compute_product<R: Rng + ?Sized>(dimension: Dimension, rng: &mut R) -> Result<Matrix, MatrixError> {
    let a = generate(dimension, rng);
    let b = generate(dimension, rng);
    multiply(&a, &b)
}

/// Full pipeline: validate, generate two matrices, multiply, summarize.
///
/// Validation happens before the generator is touched, so an invalid input
/// consumes no entropy.
pub fn run<R: Rng + ?Sized>(raw_dimension: &str, rng: &mut R) -> Result<Summary, MatrixError> {
    let dimension = validate(raw_dimension)?;
    let product = compute_product(dimension, rng)?;
    Ok(Summary::of(&product))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{RngCore, SeedableRng};

    #[test]
    fn run_reports_dimension_and_corners() {
        let mut rng = StdRng::seed_from_u64(11);
        let summary = run("4", &mut rng).unwrap();

        let mut replay = StdRng::seed_from_u64(11);
        let product = compute_product(validate("4").unwrap(), &mut replay).unwrap();

        assert_eq!(summary.dimension, 4);
        assert_eq!(summary.first_element, product.get(0, 0));
        assert_eq!(summary.last_element, product.get(3, 3));
    }

    #[test]
    fn dimension_one_product_is_scalar_product() {
        let mut rng = StdRng::seed_from_u64(3);
        let dim = validate("1").unwrap();
        let a = generate(dim, &mut rng);
        let b = generate(dim, &mut rng);

        let mut replay = StdRng::seed_from_u64(3);
        let summary = run("1", &mut replay).unwrap();

        let expected = a.get(0, 0) * b.get(0, 0);
        assert_eq!(summary.first_element, expected);
        assert_eq!(summary.last_element, expected);
    }

    #[test]
    fn invalid_dimension_consumes_no_entropy() {
        let mut rng = StdRng::seed_from_u64(99);
        let err = run("-1", &mut rng).unwrap_err();
        assert!(matches!(err, MatrixError::InvalidDimension { .. }));

        let mut fresh = StdRng::seed_from_u64(99);
        assert_eq!(rng.next_u64(), fresh.next_u64());
    }

    #[test]
    fn invalid_dimension_message_is_user_facing() {
        let err = validate("abc").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid dimension parameter. Please provide a positive integer."
        );
    }
}
