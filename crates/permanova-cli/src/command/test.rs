use std::{path::PathBuf, time::Duration};

use anyhow::Context as _;
use clap::ArgGroup;
use permanova_stats::{
    Grouping, Interrupt, PermutationCount, PermutationSeed, PermutationTest, permanova,
};

use crate::{
    input,
    output::{OutputFormat, ResultSink},
};

#[derive(Default, Debug, Clone, clap::Args)]
#[command(group(ArgGroup::new("grouping_source").required(true).args(["grouping", "labels"])))]
pub(crate) struct TestArg {
    /// Tab-separated distance matrix file
    #[arg(long)]
    distance_matrix: PathBuf,
    /// Tab-separated grouping table file, indexed by object ID
    #[arg(long)]
    grouping: Option<PathBuf>,
    /// Grouping table column holding the group labels
    #[arg(long)]
    column: Option<String>,
    /// Comma-separated group labels, in distance matrix order
    #[arg(long, value_delimiter = ',')]
    labels: Vec<String>,
    /// Number of permutations; 0 skips the significance test
    #[arg(
        long,
        default_value_t = 999,
        env = "PERMANOVA_PERMUTATIONS",
        allow_negative_numbers = true
    )]
    permutations: i64,
    /// 128-bit hex seed for reproducible results
    #[arg(long, env = "PERMANOVA_SEED")]
    seed: Option<PermutationSeed>,
    /// Number of worker threads sharing the permutations
    #[arg(long, default_value_t = 1, env = "PERMANOVA_WORKERS")]
    workers: usize,
    /// Abort the permutation test after this many seconds
    #[arg(long)]
    timeout_secs: Option<u64>,
    /// Output format (text or json)
    #[arg(long, default_value = "text")]
    format: OutputFormat,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

impl TestArg {
    fn permutation_test(&self) -> anyhow::Result<PermutationTest> {
        let permutations = PermutationCount::try_from(self.permutations)?;
        let mut interrupt = Interrupt::default();
        if let Some(secs) = self.timeout_secs {
            interrupt = interrupt.with_timeout(Duration::from_secs(secs));
        }
        let mut test = PermutationTest::new(permutations)
            .with_workers(self.workers)
            .with_interrupt(interrupt);
        if let Some(seed) = self.seed {
            test = test.with_seed(seed);
        }
        Ok(test)
    }
}

pub(crate) fn run(arg: &TestArg) -> anyhow::Result<()> {
    let test = arg.permutation_test()?;
    let dm = input::read_distance_matrix_file(&arg.distance_matrix)?;

    let results = if let Some(path) = &arg.grouping {
        let table = input::read_grouping_table_file(path)?;
        permanova(&dm, Grouping::from(&table), arg.column.as_deref(), &test)
    } else {
        permanova(&dm, Grouping::Vector(&arg.labels), arg.column.as_deref(), &test)
    }
    .context("PERMANOVA failed")?;

    ResultSink::open(arg.output.clone())?.write_results(&results, arg.format)
}

#[cfg(test)]
mod tests {
    use clap::Parser as _;

    use super::*;
    use crate::command::CommandArgs;

    fn parse(args: &[&str]) -> Result<CommandArgs, clap::Error> {
        CommandArgs::try_parse_from(["permanova"].iter().chain(args))
    }

    #[test]
    fn test_permutation_test_from_args() {
        let arg = TestArg {
            permutations: 49,
            seed: Some(PermutationSeed::from_u64(3)),
            workers: 2,
            timeout_secs: Some(10),
            ..TestArg::default()
        };
        let test = arg.permutation_test().unwrap();
        assert_eq!(test.permutations().get(), 49);
        assert_eq!(test.seed(), Some(PermutationSeed::from_u64(3)));
        assert_eq!(test.workers(), 2);
    }

    #[test]
    fn test_negative_permutations_rejected() {
        let arg = TestArg {
            permutations: -1,
            ..TestArg::default()
        };
        assert!(arg.permutation_test().is_err());
    }

    #[test]
    fn test_grouping_source_required() {
        assert!(parse(&["test", "--distance-matrix", "dm.tsv"]).is_err());
        assert!(parse(&["test", "--distance-matrix", "dm.tsv", "--labels", "a,b"]).is_ok());
        assert!(
            parse(&[
                "test",
                "--distance-matrix",
                "dm.tsv",
                "--labels",
                "a,b",
                "--grouping",
                "g.tsv",
                "--column",
                "c"
            ])
            .is_err()
        );
    }

    #[test]
    fn test_column_checks_left_to_library() {
        assert!(parse(&["test", "--distance-matrix", "dm.tsv", "--grouping", "g.tsv"]).is_ok());
        assert!(
            parse(&["test", "--distance-matrix", "dm.tsv", "--labels", "a", "--column", "c"])
                .is_ok()
        );
    }
}
