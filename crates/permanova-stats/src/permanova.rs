//! The PERMANOVA entry point tying preprocessing, the pseudo-F statistic and
//! the permutation test together.

use crate::{
    PermanovaError,
    distance::DistanceMatrix,
    grouping::{Grouping, group_sizes},
    permutation::PermutationTest,
    preprocess::preprocess,
    pseudo_f::PseudoFContext,
    results::TestResults,
};

pub const METHOD_NAME: &str = "PERMANOVA";
pub const TEST_STATISTIC_NAME: &str = "pseudo-F";

/// Tests for significant differences between groups using PERMANOVA.
///
/// Computes the pseudo-F statistic of `grouping` over `distance_matrix` and
/// assesses it by permuting group assignments according to `test`.
///
/// # Arguments
///
/// * `distance_matrix` - Distances between the `N` objects
/// * `grouping` - Direct label vector in matrix order, or a table indexed by ID
/// * `column` - Column to use when `grouping` is a table; `None` otherwise
/// * `test` - Permutation count, seed, workers and interrupt
///
/// # Errors
///
/// Any input error from [`preprocess`], [`PermanovaError::ZeroWorkers`], or
/// [`PermanovaError::Interrupted`] if the run was stopped early.
///
/// # Examples
///
/// ```
/// use permanova_stats::{
///     DistanceMatrix, Grouping, PermutationCount, PermutationSeed, PermutationTest, permanova,
/// };
///
/// let dm = DistanceMatrix::from_rows(
///     ["s1", "s2", "s3", "s4"],
///     [
///         vec![0.0, 1.0, 10.0, 10.0],
///         vec![1.0, 0.0, 10.0, 10.0],
///         vec![10.0, 10.0, 0.0, 1.0],
///         vec![10.0, 10.0, 1.0, 0.0],
///     ],
/// )
/// .unwrap();
/// let test = PermutationTest::new(PermutationCount::new(99))
///     .with_seed(PermutationSeed::from_u64(0));
///
/// let results = permanova(&dm, Grouping::Vector(&["A", "A", "B", "B"]), None, &test).unwrap();
/// assert_eq!(results.method_name, "PERMANOVA");
/// assert_eq!(results.number_of_groups, 2);
/// assert!(results.test_statistic > 1.0);
/// ```
pub fn permanova<L>(
    distance_matrix: &DistanceMatrix,
    grouping: Grouping<'_, L>,
    column: Option<&str>,
    test: &PermutationTest,
) -> Result<TestResults, PermanovaError>
where
    L: Ord,
{
    test.validate()?;
    let input = preprocess(distance_matrix, grouping, column)?;

    let sizes = group_sizes(&input.grouping, input.num_groups);
    let ctx = PseudoFContext::new(
        input.sample_size,
        input.num_groups,
        &input.tri_idxs,
        &input.distances,
        &sizes,
    );
    let outcome = test.run(|g| ctx.compute(g), &input.grouping)?;

    tracing::info!(
        sample_size = input.sample_size,
        num_groups = input.num_groups,
        statistic = outcome.statistic,
        p_value = outcome.p_value,
        permutations = test.permutations().get(),
        "PERMANOVA finished"
    );

    Ok(TestResults::new(
        METHOD_NAME,
        TEST_STATISTIC_NAME,
        input.sample_size,
        input.num_groups,
        outcome.statistic,
        outcome.p_value,
        test.permutations().get(),
    ))
}
