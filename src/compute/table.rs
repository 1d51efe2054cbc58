use rand::Rng;
use serde::Serialize;
use thiserror::Error;

use super::matrix::CELL_UPPER_BOUND;

pub const DEFAULT_ROWS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    #[error("Invalid rows parameter '{0}'. Please provide a non-negative integer.")]
    InvalidRows(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TableRow {
    pub index: usize,
    pub value: i64,
}

/// Row count for the table endpoint.
///
/// An absent parameter falls back to [`DEFAULT_ROWS`]. A parameter that is
/// present but malformed is rejected instead of being silently replaced.
pub fn parse_rows(raw: Option<&str>) -> Result<usize, TableError> {
    match raw {
        None => Ok(DEFAULT_ROWS),
        Some(text) => text
            .parse::<usize>()
            .map_err(|_| TableError::InvalidRows(text.to_string())),
    }
}

/// `(index, value)` pairs for `index` in `1..=rows`, values drawn from `[0, 100)`.
pub fn generate_table<R: Rng + ?Sized>(rows: usize, rng: &mut R) -> Vec<TableRow> {
    (1..=rows)
        .map(|index| TableRow { index, value: rng.gen_range(0..CELL_UPPER_BOUND) })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn absent_rows_defaults_to_five() {
        assert_eq!(parse_rows(None), Ok(5));
    }

    #[test]
    fn present_rows_must_parse() {
        assert_eq!(parse_rows(Some("12")), Ok(12));
        assert_eq!(parse_rows(Some("0")), Ok(0));
        assert_eq!(parse_rows(Some("-1")), Err(TableError::InvalidRows("-1".into())));
        assert!(parse_rows(Some("")).is_err());
        assert!(parse_rows(Some("ten")).is_err());
    }

    #[test]
    fn table_is_one_indexed_and_bounded() {
        let mut rng = StdRng::seed_from_u64(8);
        let table = generate_table(25, &mut rng);

        assert_eq!(table.len(), 25);
        assert_eq!(table.first().map(|r| r.index), Some(1));
        assert_eq!(table.last().map(|r| r.index), Some(25));
        assert!(table.iter().all(|r| (0..100).contains(&r.value)));
    }

    #[test]
    fn zero_rows_is_empty() {
        assert!(generate_table(0, &mut StdRng::seed_from_u64(1)).is_empty());
    }
}
