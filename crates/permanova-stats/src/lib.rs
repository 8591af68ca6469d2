//! Permutational multivariate analysis of variance (PERMANOVA).
//!
//! Given pairwise distances between `N` objects and a categorical grouping of
//! those objects, PERMANOVA computes a pseudo-F statistic comparing the spread
//! between groups to the spread within groups, and assesses it with a
//! permutation test on the group labels. No distributional form is assumed.
//!
//! # Pipeline
//!
//! ```text
//! DistanceMatrix + Grouping
//!     ↓ preprocess
//! PreparedInput (codes, condensed distances, triangular indices)
//!     ↓ PseudoFContext::new (SS_T computed once)
//! observed pseudo-F
//!     ↓ PermutationTest::run (shuffled codes, re-evaluated)
//! p-value
//!     ↓
//! TestResults
//! ```
//!
//! # Modules
//!
//! - [`distance`]: Distance matrix container and condensed indexing
//! - [`grouping`]: Grouping inputs and the label-to-code mapping
//! - [`preprocess`]: Validation and encoding of inputs
//! - [`pseudo_f`]: The pseudo-F statistic
//! - [`permutation`]: Seeded, shardable, interruptible permutation test
//! - [`results`]: The result record
//!
//! # Examples
//!
//! ```
//! use permanova_stats::{
//!     DistanceMatrix, GroupingTable, Grouping, PermutationCount, PermutationSeed,
//!     PermutationTest, permanova,
//! };
//!
//! let dm = DistanceMatrix::from_rows(
//!     ["s1", "s2", "s3", "s4", "s5", "s6"],
//!     [
//!         vec![0.0, 0.5, 0.6, 4.0, 4.2, 3.9],
//!         vec![0.5, 0.0, 0.4, 4.1, 4.0, 4.3],
//!         vec![0.6, 0.4, 0.0, 3.8, 4.4, 4.0],
//!         vec![4.0, 4.1, 3.8, 0.0, 0.7, 0.5],
//!         vec![4.2, 4.0, 4.4, 0.7, 0.0, 0.6],
//!         vec![3.9, 4.3, 4.0, 0.5, 0.6, 0.0],
//!     ],
//! )
//! .unwrap();
//!
//! let mut table = GroupingTable::new(["Treatment"]).unwrap();
//! for (id, treatment) in [
//!     ("s1", "control"), ("s2", "control"), ("s3", "control"),
//!     ("s4", "fast"), ("s5", "fast"), ("s6", "fast"),
//! ] {
//!     table.push_row(id, [treatment]).unwrap();
//! }
//!
//! let test = PermutationTest::new(PermutationCount::new(199))
//!     .with_seed(PermutationSeed::from_u64(42));
//! let results =
//!     permanova(&dm, Grouping::from(&table), Some("Treatment"), &test).unwrap();
//!
//! assert_eq!(results.sample_size, 6);
//! assert!(results.test_statistic > 1.0);
//! assert!(results.p_value < 0.5);
//! ```

pub use self::{
    distance::{DistanceMatrix, DistanceMatrixError},
    grouping::{GroupCoding, GroupLabel, Grouping, GroupingTable, GroupingTableError},
    permanova::permanova,
    permutation::{Interrupt, PermutationCount, PermutationSeed, PermutationTest},
    results::TestResults,
};

pub mod distance;
pub mod grouping;
pub mod permanova;
pub mod permutation;
pub mod preprocess;
pub mod pseudo_f;
pub mod results;

/// Errors raised by the PERMANOVA pipeline.
///
/// Input and parameter errors are raised before any statistic is computed.
#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum PermanovaError {
    #[display("grouping vector size ({grouping}) must match the number of IDs in the distance matrix ({sample_size})")]
    GroupingLengthMismatch { grouping: usize, sample_size: usize },
    #[display("grouping table is missing {} distance matrix ID(s): {}", ids.len(), ids.join(", "))]
    MissingIds { ids: Vec<String> },
    #[display("column '{column}' is not in the grouping table")]
    MissingColumn { column: String },
    #[display("a column name ('{column}') can only be given with a grouping table")]
    ColumnWithVector { column: String },
    #[display("a column name must be given with a grouping table")]
    TableWithoutColumn,
    #[display("all values in the grouping vector are the same; at least 2 groups are required")]
    SingleGroup,
    #[display(
        "all values in the grouping vector are unique; there are no within-group distances"
    )]
    AllGroupsUnique,
    #[display("number of permutations must be greater than or equal to zero, got {permutations}")]
    InvalidPermutationCount { permutations: i64 },
    #[display("number of workers must be greater than zero")]
    ZeroWorkers,
    #[display("permutation test interrupted after {completed} of {requested} permutations")]
    Interrupted { completed: usize, requested: usize },
}
