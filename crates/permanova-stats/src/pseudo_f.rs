//! PERMANOVA pseudo-F statistic.
//!
//! For `N` objects in `a` groups with condensed distances `d`, the statistic
//! partitions the total sum of squares
//!
//! ```text
//! SS_T = Σ d² / N
//! SS_W = Σ_g ( Σ_{pairs within g} d² ) / n_g
//! SS_A = SS_T - SS_W
//! F    = (SS_A / (a - 1)) / (SS_W / (N - a))
//! ```
//!
//! `SS_T` depends only on the distances, so it is computed once by
//! [`PseudoFContext::new`] and reused for every relabelling.
//!
//! Two evaluation paths are provided. [`PseudoFContext::compute`] walks the
//! condensed pairs and compares the codes of both endpoints, allocating only
//! one accumulator per group. [`PseudoFContext::compute_with_matrix`] builds the
//! full [`GroupingMatrix`] first; it is O(N²) in memory and exists for
//! inspection and cross-checking.

use crate::distance::TriangularIndices;

/// Square matrix marking which object pairs share a group.
///
/// Cell `(i, j)` holds `Some(code)` when objects `i` and `j` are both in group
/// `code`, and `None` otherwise. The matrix is symmetric and every diagonal
/// cell holds the object's own code.
///
/// # Examples
///
/// ```
/// use permanova_stats::{distance::TriangularIndices, pseudo_f::GroupingMatrix};
///
/// let matrix = GroupingMatrix::new(&[0, 1, 0]);
/// assert_eq!(matrix.get(0, 2), Some(0));
/// assert_eq!(matrix.get(0, 1), None);
///
/// let tri = matrix.upper_triangle(&TriangularIndices::new(3));
/// assert_eq!(tri, vec![None, Some(0), None]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupingMatrix {
    n: usize,
    cells: Vec<Option<usize>>,
}

impl GroupingMatrix {
    /// Builds the grouping matrix for a coded grouping.
    #[must_use]
    pub fn new(grouping: &[usize]) -> Self {
        let n = grouping.len();
        let mut cells = vec![None; n * n];
        for (i, &gi) in grouping.iter().enumerate() {
            for (j, &gj) in grouping.iter().enumerate() {
                if gi == gj {
                    cells[i * n + j] = Some(gi);
                }
            }
        }
        Self { n, cells }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.n
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    #[must_use]
    pub fn get(&self, i: usize, j: usize) -> Option<usize> {
        self.cells[i * self.n + j]
    }

    /// Extracts the cells at `tri_idxs`, in the same order as the condensed
    /// distances.
    #[must_use]
    pub fn upper_triangle(&self, tri_idxs: &TriangularIndices) -> Vec<Option<usize>> {
        tri_idxs.iter().map(|(i, j)| self.get(i, j)).collect()
    }
}

/// Grouping-independent inputs of the pseudo-F statistic.
///
/// A context is built once per test and then evaluated against the observed
/// grouping and every permuted grouping. It only borrows the preprocessed
/// data, so it can be shared between worker threads.
///
/// # Examples
///
/// ```
/// use permanova_stats::{distance::TriangularIndices, pseudo_f::PseudoFContext};
///
/// // objects 0,1 in group 0 and 2,3 in group 1
/// let tri_idxs = TriangularIndices::new(4);
/// // pairs: (0,1) (0,2) (0,3) (1,2) (1,3) (2,3)
/// let distances = [1.0, 10.0, 10.0, 10.0, 10.0, 1.0];
/// let group_sizes = [2, 2];
///
/// let ctx = PseudoFContext::new(4, 2, &tri_idxs, &distances, &group_sizes);
/// let f = ctx.compute(&[0, 0, 1, 1]);
/// assert!(f > 1.0);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct PseudoFContext<'a> {
    sample_size: usize,
    num_groups: usize,
    tri_idxs: &'a TriangularIndices,
    distances: &'a [f64],
    group_sizes: &'a [usize],
    s_t: f64,
}

impl<'a> PseudoFContext<'a> {
    /// Creates a context and computes the total sum of squares.
    ///
    /// # Arguments
    ///
    /// * `sample_size` - Number of objects `N`
    /// * `num_groups` - Number of groups `a`; must satisfy `2 <= a < N`
    /// * `tri_idxs` - Upper-triangle indices aligned with `distances`
    /// * `distances` - Condensed distances
    /// * `group_sizes` - Number of objects per group code, all non-zero
    ///
    /// # Panics
    ///
    /// Panics if the shapes of the inputs disagree or `a` is out of range.
    #[must_use]
    pub fn new(
        sample_size: usize,
        num_groups: usize,
        tri_idxs: &'a TriangularIndices,
        distances: &'a [f64],
        group_sizes: &'a [usize],
    ) -> Self {
        assert_eq!(tri_idxs.len(), distances.len(), "tri_idxs/distances length mismatch");
        assert_eq!(group_sizes.len(), num_groups, "group_sizes length mismatch");
        assert!(
            num_groups >= 2 && num_groups < sample_size,
            "need 2 <= num_groups ({num_groups}) < sample_size ({sample_size})"
        );
        debug_assert_eq!(group_sizes.iter().sum::<usize>(), sample_size);

        Self {
            sample_size,
            num_groups,
            tri_idxs,
            distances,
            group_sizes,
            s_t: total_sum_of_squares(distances, sample_size),
        }
    }

    #[must_use]
    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    #[must_use]
    pub fn num_groups(&self) -> usize {
        self.num_groups
    }

    /// Total sum of squares `SS_T`.
    #[must_use]
    pub fn total_sum_of_squares(&self) -> f64 {
        self.s_t
    }

    /// Evaluates the pseudo-F statistic for `grouping`.
    ///
    /// `grouping` must hold one code per object and have the same group sizes
    /// as the context (true for the observed grouping and any permutation of
    /// it).
    #[must_use]
    pub fn compute(&self, grouping: &[usize]) -> f64 {
        debug_assert_eq!(grouping.len(), self.sample_size);
        let mut within = vec![0.0; self.num_groups];
        for ((i, j), d) in self.tri_idxs.iter().zip(self.distances) {
            let g = grouping[i];
            if g == grouping[j] {
                within[g] += d * d;
            }
        }
        self.f_from_within(&within)
    }

    /// Like [`Self::compute`], but extracts within-group pairs through a full
    /// [`GroupingMatrix`].
    #[must_use]
    pub fn compute_with_matrix(&self, grouping: &[usize]) -> f64 {
        let grouping_tri = GroupingMatrix::new(grouping).upper_triangle(self.tri_idxs);
        let mut within = vec![0.0; self.num_groups];
        for (code, d) in grouping_tri.iter().zip(self.distances) {
            if let Some(g) = *code {
                within[g] += d * d;
            }
        }
        self.f_from_within(&within)
    }

    #[expect(clippy::cast_precision_loss)]
    fn f_from_within(&self, within: &[f64]) -> f64 {
        let s_w = within
            .iter()
            .zip(self.group_sizes)
            .map(|(sum, &size)| sum / size as f64)
            .sum::<f64>();
        let s_a = self.s_t - s_w;
        let df_between = (self.num_groups - 1) as f64;
        let df_within = (self.sample_size - self.num_groups) as f64;
        (s_a / df_between) / (s_w / df_within)
    }
}

/// Total sum of squares, `Σ d² / N`.
#[expect(clippy::cast_precision_loss)]
#[must_use]
pub fn total_sum_of_squares(distances: &[f64], sample_size: usize) -> f64 {
    distances.iter().map(|d| d * d).sum::<f64>() / sample_size as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grouping::group_sizes;

    /// Condensed distances for `n` objects where same-group pairs are at
    /// `within` and cross-group pairs at `between`.
    fn block_distances(grouping: &[usize], within: f64, between: f64) -> Vec<f64> {
        TriangularIndices::new(grouping.len())
            .iter()
            .map(|(i, j)| if grouping[i] == grouping[j] { within } else { between })
            .collect()
    }

    /// Deterministic irregular distances.
    #[expect(clippy::cast_precision_loss)]
    fn irregular_distances(n: usize) -> Vec<f64> {
        TriangularIndices::new(n)
            .iter()
            .map(|(i, j)| ((i * 7 + j * 13) % 11) as f64 * 0.37 + 0.1)
            .collect()
    }

    #[test]
    fn test_four_objects_well_separated() {
        let grouping = [0, 0, 1, 1];
        let distances = block_distances(&grouping, 1.0, 10.0);
        let tri_idxs = TriangularIndices::new(4);
        let sizes = group_sizes(&grouping, 2);
        let ctx = PseudoFContext::new(4, 2, &tri_idxs, &distances, &sizes);

        // SS_T = (2*1 + 4*100) / 4 = 100.5, SS_W = 1/2 + 1/2 = 1
        assert!((ctx.total_sum_of_squares() - 100.5).abs() < 1e-12);
        let f = ctx.compute(&grouping);
        // (99.5 / 1) / (1 / 2) = 199
        assert!((f - 199.0).abs() < 1e-9, "F={f}");
    }

    #[test]
    fn test_unequal_group_sizes() {
        let grouping = [0, 0, 0, 1, 1];
        let distances = block_distances(&grouping, 2.0, 4.0);
        let tri_idxs = TriangularIndices::new(5);
        let sizes = group_sizes(&grouping, 2);
        let ctx = PseudoFContext::new(5, 2, &tri_idxs, &distances, &sizes);

        // 4 within pairs (3 + 1), 6 between pairs
        let s_t = (4.0 * 4.0 + 6.0 * 16.0) / 5.0;
        let s_w = 3.0 * 4.0 / 3.0 + 4.0 / 2.0;
        let expected = ((s_t - s_w) / 1.0) / (s_w / 3.0);
        assert!((ctx.compute(&grouping) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_matrix_and_direct_paths_agree() {
        let grouping = [2, 0, 1, 0, 2, 1, 1, 0, 2, 2];
        let n = grouping.len();
        let distances = irregular_distances(n);
        let tri_idxs = TriangularIndices::new(n);
        let sizes = group_sizes(&grouping, 3);
        let ctx = PseudoFContext::new(n, 3, &tri_idxs, &distances, &sizes);

        let direct = ctx.compute(&grouping);
        let via_matrix = ctx.compute_with_matrix(&grouping);
        assert!((direct - via_matrix).abs() <= 1e-12 * direct.abs().max(1.0));
    }

    #[test]
    fn test_compute_is_deterministic() {
        let grouping = [0, 1, 0, 1, 2, 2, 0];
        let n = grouping.len();
        let distances = irregular_distances(n);
        let tri_idxs = TriangularIndices::new(n);
        let sizes = group_sizes(&grouping, 3);
        let ctx = PseudoFContext::new(n, 3, &tri_idxs, &distances, &sizes);

        let first = ctx.compute(&grouping);
        for _ in 0..10 {
            assert_eq!(ctx.compute(&grouping).to_bits(), first.to_bits());
        }
    }

    #[test]
    fn test_uniform_distances_do_not_fail() {
        let grouping = [0, 0, 0, 1, 1, 1];
        let distances = vec![1.0; 15];
        let tri_idxs = TriangularIndices::new(6);
        let sizes = group_sizes(&grouping, 2);
        let ctx = PseudoFContext::new(6, 2, &tri_idxs, &distances, &sizes);
        // SS_T = 15 / 6, SS_W = 1 + 1, so both mean squares are 0.5
        let f = ctx.compute(&grouping);
        assert!((f - 1.0).abs() < 1e-12, "F={f}");
    }

    #[test]
    fn test_grouping_matrix_symmetric_with_diagonal() {
        let grouping = [1, 0, 1, 2, 0];
        let matrix = GroupingMatrix::new(&grouping);
        for i in 0..grouping.len() {
            assert_eq!(matrix.get(i, i), Some(grouping[i]));
            for j in 0..grouping.len() {
                assert_eq!(matrix.get(i, j), matrix.get(j, i));
            }
        }
    }

    #[test]
    fn test_grouping_triangle_counts_within_pairs_once() {
        let grouping = [1, 0, 1, 2, 0, 1, 1];
        let n = grouping.len();
        let tri_idxs = TriangularIndices::new(n);
        let tri = GroupingMatrix::new(&grouping).upper_triangle(&tri_idxs);
        let sizes = group_sizes(&grouping, 3);

        for (code, &size) in sizes.iter().enumerate() {
            let count = tri.iter().filter(|c| **c == Some(code)).count();
            assert_eq!(count, size * (size - 1) / 2, "group {code}");
        }
        for ((i, j), cell) in tri_idxs.iter().zip(&tri) {
            if grouping[i] != grouping[j] {
                assert_eq!(*cell, None, "cross-group pair ({i}, {j}) labelled");
            }
        }
    }
}
