//! The result record of a distance-based group test and its text rendering.

use std::fmt;

use serde::Serialize;

/// Outcome of a distance-based group test.
///
/// Field order matches the rows of the [`fmt::Display`] table. `p_value` is
/// `NaN` (serialized as `null`) when no permutations were run.
///
/// # Examples
///
/// ```
/// use permanova_stats::results::TestResults;
///
/// let results = TestResults::new("PERMANOVA", "pseudo-F", 10, 2, 12.5, 0.001, 999);
/// let text = results.to_string();
/// assert!(text.contains("method name"));
/// assert!(text.contains("PERMANOVA"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestResults {
    pub method_name: &'static str,
    pub test_statistic_name: &'static str,
    pub sample_size: usize,
    pub number_of_groups: usize,
    pub test_statistic: f64,
    pub p_value: f64,
    pub number_of_permutations: usize,
}

impl TestResults {
    /// Packages already-validated values into a result record.
    #[must_use]
    pub fn new(
        method_name: &'static str,
        test_statistic_name: &'static str,
        sample_size: usize,
        number_of_groups: usize,
        test_statistic: f64,
        p_value: f64,
        number_of_permutations: usize,
    ) -> Self {
        Self {
            method_name,
            test_statistic_name,
            sample_size,
            number_of_groups,
            test_statistic,
            p_value,
            number_of_permutations,
        }
    }

    /// Returns `true` when the significance test was skipped.
    #[must_use]
    pub fn is_p_value_skipped(&self) -> bool {
        self.p_value.is_nan()
    }
}

impl fmt::Display for TestResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows: [(&str, String); 7] = [
            ("method name", self.method_name.to_owned()),
            ("test statistic name", self.test_statistic_name.to_owned()),
            ("sample size", self.sample_size.to_string()),
            ("number of groups", self.number_of_groups.to_string()),
            ("test statistic", self.test_statistic.to_string()),
            ("p-value", self.p_value.to_string()),
            ("number of permutations", self.number_of_permutations.to_string()),
        ];
        let width = rows.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
        for (key, value) in rows {
            writeln!(f, "{key:<width$}    {value}")?;
        }
        Ok(())
    }
}
