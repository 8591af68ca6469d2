//! Distance matrix container and its condensed (upper-triangle) view.
//!
//! The statistics in this crate never look at the full square matrix directly.
//! They work on the condensed form: the strictly-upper triangle flattened row by
//! row, paired with [`TriangularIndices`] that record which `(row, col)` each
//! condensed entry came from.
//!
//! # Examples
//!
//! ```
//! use permanova_stats::distance::DistanceMatrix;
//!
//! let dm = DistanceMatrix::from_rows(
//!     ["a", "b", "c"],
//!     [
//!         vec![0.0, 1.0, 2.0],
//!         vec![1.0, 0.0, 3.0],
//!         vec![2.0, 3.0, 0.0],
//!     ],
//! )
//! .unwrap();
//!
//! assert_eq!(dm.shape(), (3, 3));
//! assert_eq!(dm.condensed_form(), vec![1.0, 2.0, 3.0]);
//! ```

use std::collections::HashMap;

/// Errors raised while building a [`DistanceMatrix`].
#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum DistanceMatrixError {
    #[display("distance matrix must contain at least one object")]
    Empty,
    #[display("number of IDs ({ids}) does not match number of rows ({rows})")]
    IdCountMismatch { ids: usize, rows: usize },
    #[display("row {row} has {len} values, expected {expected} (matrix must be square)")]
    NotSquare {
        row: usize,
        len: usize,
        expected: usize,
    },
    #[display("duplicate ID '{id}'")]
    DuplicateId { id: String },
    #[display("diagonal entry for '{id}' is {value}, expected 0 (matrix must be hollow)")]
    NonHollow { id: String, value: f64 },
    #[display("distance between '{a}' and '{b}' is not symmetric ({ab} vs {ba})")]
    Asymmetric {
        a: String,
        b: String,
        ab: f64,
        ba: f64,
    },
    #[display("distance between '{a}' and '{b}' is {value}, expected a finite non-negative value")]
    InvalidDistance { a: String, b: String, value: f64 },
}

/// A symmetric, hollow matrix of pairwise distances between labelled objects.
///
/// Construction validates every invariant the statistics rely on, so a value
/// of this type is always safe to hand to [`crate::permanova`].
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    ids: Vec<String>,
    /// Row-major `n * n` values.
    data: Vec<f64>,
}

impl DistanceMatrix {
    /// Builds a distance matrix from object IDs and square rows.
    ///
    /// # Arguments
    ///
    /// * `ids` - One identifier per object, in row order. Must be unique.
    /// * `rows` - `n` rows of `n` distances each.
    ///
    /// # Errors
    ///
    /// Returns a [`DistanceMatrixError`] if the matrix is empty, not square,
    /// has duplicate IDs, a non-zero diagonal, asymmetric entries, or any
    /// negative or non-finite distance.
    pub fn from_rows<I, S, R, V>(ids: I, rows: R) -> Result<Self, DistanceMatrixError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        R: IntoIterator<Item = V>,
        V: AsRef<[f64]>,
    {
        let ids = ids.into_iter().map(Into::into).collect::<Vec<String>>();
        let n = ids.len();
        if n == 0 {
            return Err(DistanceMatrixError::Empty);
        }

        let mut data = Vec::with_capacity(n * n);
        let mut num_rows = 0;
        for (row, values) in rows.into_iter().enumerate() {
            let values = values.as_ref();
            if values.len() != n {
                return Err(DistanceMatrixError::NotSquare {
                    row,
                    len: values.len(),
                    expected: n,
                });
            }
            data.extend_from_slice(values);
            num_rows += 1;
        }
        if num_rows != n {
            return Err(DistanceMatrixError::IdCountMismatch {
                ids: n,
                rows: num_rows,
            });
        }

        let mut seen = HashMap::with_capacity(n);
        for (i, id) in ids.iter().enumerate() {
            if seen.insert(id.as_str(), i).is_some() {
                return Err(DistanceMatrixError::DuplicateId { id: id.clone() });
            }
        }

        let this = Self { ids, data };
        this.validate()?;
        Ok(this)
    }

    fn validate(&self) -> Result<(), DistanceMatrixError> {
        let n = self.len();
        for i in 0..n {
            let diag = self.get(i, i);
            if diag != 0.0 {
                return Err(DistanceMatrixError::NonHollow {
                    id: self.ids[i].clone(),
                    value: diag,
                });
            }
            for j in (i + 1)..n {
                let ab = self.get(i, j);
                let ba = self.get(j, i);
                if !ab.is_finite() || ab < 0.0 {
                    return Err(self.invalid_distance(i, j, ab));
                }
                if !ba.is_finite() || ba < 0.0 {
                    return Err(self.invalid_distance(j, i, ba));
                }
                // exact comparison: the container promises a symmetric matrix
                if ab.to_bits() != ba.to_bits() {
                    return Err(DistanceMatrixError::Asymmetric {
                        a: self.ids[i].clone(),
                        b: self.ids[j].clone(),
                        ab,
                        ba,
                    });
                }
            }
        }
        Ok(())
    }

    fn invalid_distance(&self, i: usize, j: usize, value: f64) -> DistanceMatrixError {
        DistanceMatrixError::InvalidDistance {
            a: self.ids[i].clone(),
            b: self.ids[j].clone(),
            value,
        }
    }

    /// Returns the number of objects `N`.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Always `false`: an empty matrix cannot be constructed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Returns `(N, N)`.
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.len(), self.len())
    }

    /// Object identifiers in row order.
    #[must_use]
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Returns the position of `id`, if present.
    #[must_use]
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.ids.iter().position(|x| x == id)
    }

    /// Returns the distance between objects `i` and `j`.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of bounds.
    #[must_use]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        let n = self.len();
        assert!(i < n && j < n, "index ({i}, {j}) out of bounds for {n}x{n}");
        self.data[i * n + j]
    }

    /// Returns the strictly-upper triangle flattened row by row.
    ///
    /// The order matches [`TriangularIndices::new`] for the same `N`, so
    /// `condensed_form()[k] == get(rows[k], cols[k])`.
    #[must_use]
    pub fn condensed_form(&self) -> Vec<f64> {
        TriangularIndices::new(self.len())
            .iter()
            .map(|(i, j)| self.get(i, j))
            .collect()
    }
}

/// Row and column indices of the strictly-upper triangle of an `N x N` matrix.
///
/// Entries are ordered by increasing row, then increasing column, which is the
/// same order [`DistanceMatrix::condensed_form`] uses. `rows[k] < cols[k]`
/// holds for every `k`, and each unordered pair appears exactly once.
///
/// # Examples
///
/// ```
/// use permanova_stats::distance::TriangularIndices;
///
/// let idx = TriangularIndices::new(3);
/// assert_eq!(idx.rows(), &[0, 0, 1]);
/// assert_eq!(idx.cols(), &[1, 2, 2]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriangularIndices {
    rows: Vec<usize>,
    cols: Vec<usize>,
}

impl TriangularIndices {
    /// Enumerates the upper triangle (diagonal excluded) of an `n x n` matrix.
    #[must_use]
    pub fn new(n: usize) -> Self {
        let len = condensed_len(n);
        let mut rows = Vec::with_capacity(len);
        let mut cols = Vec::with_capacity(len);
        for i in 0..n {
            for j in (i + 1)..n {
                rows.push(i);
                cols.push(j);
            }
        }
        Self { rows, cols }
    }

    #[must_use]
    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    #[must_use]
    pub fn cols(&self) -> &[usize] {
        &self.cols
    }

    /// Number of pairs, `n * (n - 1) / 2`.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterates over `(row, col)` pairs in condensed order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (usize, usize)> + '_ {
        self.rows.iter().copied().zip(self.cols.iter().copied())
    }
}

/// Length of the condensed form of an `n x n` matrix.
#[must_use]
pub const fn condensed_len(n: usize) -> usize {
    n * n.saturating_sub(1) / 2
}
