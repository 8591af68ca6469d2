use std::io::Write as _;

use anyhow::Context as _;
use permanova_stats::PermutationSeed;
use rand::Rng as _;

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct GenSeedArg {
    /// Number of seeds to print
    #[arg(long, default_value_t = 1)]
    count: usize,
}

pub(crate) fn run(arg: &GenSeedArg) -> anyhow::Result<()> {
    let mut rng = rand::rng();
    let mut stdout = std::io::stdout().lock();
    for _ in 0..arg.count {
        let seed: PermutationSeed = rng.random();
        writeln!(stdout, "{seed}").context("Failed to write seed to stdout")?;
    }
    Ok(())
}
