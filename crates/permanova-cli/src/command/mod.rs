use clap::{Parser, Subcommand};

use self::{gen_seed::GenSeedArg, test::TestArg};

mod gen_seed;
mod test;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// What to run
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Run PERMANOVA on a distance matrix and a grouping
    Test(#[clap(flatten)] TestArg),
    /// Print a random permutation seed
    GenSeed(#[clap(flatten)] GenSeedArg),
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    match args.mode {
        Mode::Test(arg) => test::run(&arg)?,
        Mode::GenSeed(arg) => gen_seed::run(&arg)?,
    }
    Ok(())
}
