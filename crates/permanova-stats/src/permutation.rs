//! Permutation test driver.
//!
//! The null distribution of a statistic is approximated by shuffling the
//! group codes, re-evaluating the statistic, and counting how often the
//! permuted value is at least as large as the observed one (two `NaN`
//! values count as a tie):
//!
//! ```text
//! p = (#{permuted >= observed} + 1) / (permutations + 1)
//! ```
//!
//! The observed arrangement counts as one of the `permutations + 1` equally
//! likely arrangements, so `p` is never 0. Ties count toward the null.
//!
//! # Randomness
//!
//! Shuffles are driven by PCG32 streams derived from a [`PermutationSeed`].
//! Each worker gets its own stream, drawn in order from a master generator,
//! so results are reproducible for a fixed seed *and* worker count.
//!
//! # Interruption
//!
//! An [`Interrupt`] (deadline and/or shared flag) is polled between trials.
//! When it fires, [`PermutationTest::run`] fails with
//! [`PermanovaError::Interrupted`] instead of reporting a p-value computed
//! from fewer trials than requested.

use std::{
    fmt,
    num::ParseIntError,
    str::FromStr,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use rand::{
    Rng, SeedableRng as _,
    distr::{Distribution, StandardUniform},
    seq::SliceRandom as _,
};
use rand_pcg::Pcg32;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::PermanovaError;

/// Number of permutations to perform. Zero skips the significance test.
///
/// Built from a signed count with [`TryFrom`], which rejects negatives.
///
/// # Examples
///
/// ```
/// use permanova_stats::permutation::PermutationCount;
///
/// assert_eq!(PermutationCount::try_from(99_i64).unwrap().get(), 99);
/// assert!(PermutationCount::try_from(-1_i64).is_err());
/// assert_eq!(PermutationCount::default().get(), 999);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PermutationCount(usize);

impl PermutationCount {
    pub const DEFAULT: Self = Self(999);

    #[must_use]
    pub const fn new(permutations: usize) -> Self {
        Self(permutations)
    }

    #[must_use]
    pub const fn get(self) -> usize {
        self.0
    }
}

impl Default for PermutationCount {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<i64> for PermutationCount {
    type Error = PermanovaError;

    fn try_from(permutations: i64) -> Result<Self, Self::Error> {
        usize::try_from(permutations)
            .map(Self)
            .map_err(|_| PermanovaError::InvalidPermutationCount { permutations })
    }
}

/// Seed for deterministic permutation sequences.
///
/// A 128-bit seed for the PCG32 master generator. It is written and parsed as
/// 32 hexadecimal characters, and serialized the same way.
///
/// # Example
///
/// ```
/// use permanova_stats::permutation::PermutationSeed;
/// use rand::Rng as _;
///
/// let seed: PermutationSeed = rand::rng().random();
/// let parsed: PermutationSeed = seed.to_string().parse().unwrap();
/// assert_eq!(seed, parsed);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PermutationSeed([u8; 16]);

impl PermutationSeed {
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Expands a `u64` into a full seed, for tests and quick reproducible runs.
    #[must_use]
    pub const fn from_u64(value: u64) -> Self {
        Self((value as u128).to_be_bytes())
    }
}

impl fmt::Display for PermutationSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", u128::from_be_bytes(self.0))
    }
}

/// Errors raised when parsing a [`PermutationSeed`].
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum ParseSeedError {
    #[display("invalid seed: expected 32 hex characters, got {len}")]
    Length { len: usize },
    #[display("invalid seed: {_0}")]
    Digits(ParseIntError),
}

impl FromStr for PermutationSeed {
    type Err = ParseSeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 32 {
            return Err(ParseSeedError::Length { len: s.len() });
        }
        let num = u128::from_str_radix(s, 16).map_err(ParseSeedError::Digits)?;
        Ok(Self(num.to_be_bytes()))
    }
}

impl Serialize for PermutationSeed {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PermutationSeed {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let hex_str = String::deserialize(deserializer)?;
        hex_str.parse().map_err(serde::de::Error::custom)
    }
}

/// Allows generating random `PermutationSeed` values with `rng.random()`.
impl Distribution<PermutationSeed> for StandardUniform {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> PermutationSeed {
        let mut seed = [0; 16];
        rng.fill(&mut seed);
        PermutationSeed(seed)
    }
}

/// External stop condition for a running permutation test.
///
/// # Examples
///
/// ```
/// use std::sync::{Arc, atomic::{AtomicBool, Ordering}};
/// use permanova_stats::permutation::Interrupt;
///
/// let flag = Arc::new(AtomicBool::new(false));
/// let interrupt = Interrupt::default().with_flag(Arc::clone(&flag));
/// assert!(!interrupt.is_triggered());
///
/// flag.store(true, Ordering::Relaxed);
/// assert!(interrupt.is_triggered());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    deadline: Option<Instant>,
    flag: Option<Arc<AtomicBool>>,
}

impl Interrupt {
    /// Stops at `deadline`.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Stops `timeout` from now. A timeout too large to represent as an
    /// [`Instant`] sets no deadline.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self,
        }
    }

    /// Stops once `flag` is set.
    #[must_use]
    pub fn with_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.flag = Some(flag);
        self
    }

    #[must_use]
    pub fn is_triggered(&self) -> bool {
        self.flag
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
            || self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }
}

/// Observed statistic and its permutation p-value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PermutationOutcome {
    pub statistic: f64,
    /// `NaN` when no permutations were requested.
    pub p_value: f64,
}

/// Configuration of a permutation test.
///
/// # Examples
///
/// ```
/// use permanova_stats::permutation::{PermutationCount, PermutationSeed, PermutationTest};
///
/// let test = PermutationTest::new(PermutationCount::new(99))
///     .with_seed(PermutationSeed::from_u64(7));
///
/// // statistic: sum of the first two codes
/// let stat = |g: &[usize]| g[..2].iter().sum::<usize>() as f64;
/// let outcome = test.run(stat, &[1, 1, 0, 0]).unwrap();
///
/// assert_eq!(outcome.statistic, 2.0);
/// assert!(outcome.p_value >= 1.0 / 100.0 && outcome.p_value <= 1.0);
/// ```
#[derive(Debug, Clone)]
pub struct PermutationTest {
    permutations: PermutationCount,
    seed: Option<PermutationSeed>,
    workers: usize,
    interrupt: Interrupt,
}

impl Default for PermutationTest {
    fn default() -> Self {
        Self::new(PermutationCount::default())
    }
}

impl PermutationTest {
    /// Creates a single-worker test seeded from OS entropy.
    #[must_use]
    pub fn new(permutations: PermutationCount) -> Self {
        Self {
            permutations,
            seed: None,
            workers: 1,
            interrupt: Interrupt::default(),
        }
    }

    #[must_use]
    pub fn with_seed(mut self, seed: PermutationSeed) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets the number of worker threads the trials are split across.
    ///
    /// Zero is rejected by [`Self::run`].
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    #[must_use]
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    #[must_use]
    pub fn permutations(&self) -> PermutationCount {
        self.permutations
    }

    #[must_use]
    pub fn seed(&self) -> Option<PermutationSeed> {
        self.seed
    }

    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Checks parameters that do not depend on the data.
    pub fn validate(&self) -> Result<(), PermanovaError> {
        if self.workers == 0 {
            return Err(PermanovaError::ZeroWorkers);
        }
        Ok(())
    }

    /// Evaluates `statistic` on `grouping` and on random permutations of it.
    ///
    /// `grouping` is left untouched; every worker shuffles its own copy.
    ///
    /// # Errors
    ///
    /// * [`PermanovaError::ZeroWorkers`] if configured with zero workers
    /// * [`PermanovaError::Interrupted`] if the interrupt fires before all
    ///   trials complete
    #[expect(clippy::cast_precision_loss)]
    pub fn run<F>(&self, statistic: F, grouping: &[usize]) -> Result<PermutationOutcome, PermanovaError>
    where
        F: Fn(&[usize]) -> f64 + Sync,
    {
        self.validate()?;

        let observed = statistic(grouping);
        let requested = self.permutations.get();
        if requested == 0 {
            return Ok(PermutationOutcome {
                statistic: observed,
                p_value: f64::NAN,
            });
        }

        let seed = self.seed.unwrap_or_else(|| rand::rng().random());
        let mut master = Pcg32::from_seed(seed.0);
        let shards = shard_sizes(requested, self.workers)
            .into_iter()
            .map(|trials| (trials, Pcg32::from_rng(&mut master)))
            .collect::<Vec<_>>();
        tracing::debug!(
            permutations = requested,
            shards = shards.len(),
            %seed,
            "running permutation test"
        );

        let results = if let [(trials, rng)] = &shards[..] {
            vec![run_shard(&statistic, grouping, observed, *trials, rng.clone(), &self.interrupt)]
        } else {
            thread::scope(|s| {
                let handles = shards
                    .into_iter()
                    .map(|(trials, rng)| {
                        let statistic = &statistic;
                        let interrupt = &self.interrupt;
                        s.spawn(move || {
                            run_shard(statistic, grouping, observed, trials, rng, interrupt)
                        })
                    })
                    .collect::<Vec<_>>();
                handles
                    .into_iter()
                    .map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
                    .collect::<Vec<_>>()
            })
        };

        let completed = results.iter().map(|r| r.completed).sum::<usize>();
        if completed < requested {
            return Err(PermanovaError::Interrupted {
                completed,
                requested,
            });
        }
        let count = results.iter().map(|r| r.count).sum::<usize>();
        let p_value = (count + 1) as f64 / (requested + 1) as f64;

        Ok(PermutationOutcome {
            statistic: observed,
            p_value,
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct ShardResult {
    /// Trials with permuted statistic `>=` observed.
    count: usize,
    completed: usize,
}

fn run_shard<F>(
    statistic: &F,
    grouping: &[usize],
    observed: f64,
    trials: usize,
    mut rng: Pcg32,
    interrupt: &Interrupt,
) -> ShardResult
where
    F: Fn(&[usize]) -> f64,
{
    let mut permuted = grouping.to_vec();
    let mut result = ShardResult::default();
    for _ in 0..trials {
        if interrupt.is_triggered() {
            break;
        }
        permuted.shuffle(&mut rng);
        if reaches_observed(statistic(&permuted), observed) {
            result.count += 1;
        }
        result.completed += 1;
    }
    result
}

/// Whether a permuted statistic counts toward the null.
///
/// Two `NaN` values tie: a statistic that is undefined for every labelling
/// (all distances zero) gives no evidence against the null.
fn reaches_observed(permuted: f64, observed: f64) -> bool {
    permuted >= observed || (permuted.is_nan() && observed.is_nan())
}

/// Splits `total` trials into at most `workers` non-empty shards whose sizes
/// differ by at most one.
fn shard_sizes(total: usize, workers: usize) -> Vec<usize> {
    let shards = workers.min(total);
    let base = total / shards;
    let extra = total % shards;
    (0..shards).map(|i| base + usize::from(i < extra)).collect()
}
