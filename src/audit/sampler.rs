//! Key Sampling
//!
//! Chooses between drawing a random sample and walking every key, then
//! hands out keys one at a time.
//!
//! | Requested `N`       | Effective size    | Mode                        |
//! |---------------------|-------------------|-----------------------------|
//! | unset or 0          | `ceil(D / 10)`    | sample if smaller than `D`  |
//! | `N < D`             | `N`               | sample (`RANDOMKEY` x N)    |
//! | `N >= D`            | `D`               | exhaustive (every key once) |
//!
//! Random draws are independent, so a key may be drawn more than once.

use crate::metadata::{MetadataProvider, ProviderError};
use bytes::Bytes;
use std::collections::VecDeque;
use std::fmt;

/// Share of the database sampled when no size is requested, in percent
pub const DEFAULT_SAMPLE_PERCENT: u64 = 10;

/// Number of progress checkpoints per run
pub const PROGRESS_CHECKPOINTS: u64 = 10;

/// How keys are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleMode {
    /// `size` independent random draws
    Sample { size: u64 },
    /// Every key, each exactly once
    Exhaustive,
}

/// Resolved sampling decision for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplePlan {
    pub mode: SampleMode,
    /// Key count reported by the store when planning
    pub total_keys: u64,
}

impl SamplePlan {
    /// Resolves the requested sample size against the store's key count.
    pub fn new(requested: Option<u64>, total_keys: u64) -> Self {
        let size = match requested {
            Some(n) if n > 0 => n,
            _ => (total_keys * DEFAULT_SAMPLE_PERCENT).div_ceil(100),
        };

        let mode = if size < total_keys {
            SampleMode::Sample { size }
        } else {
            SampleMode::Exhaustive
        };

        Self { mode, total_keys }
    }

    /// Number of keys the run expects to examine.
    pub fn planned(&self) -> u64 {
        match self.mode {
            SampleMode::Sample { size } => size,
            SampleMode::Exhaustive => self.total_keys,
        }
    }

    pub fn is_exhaustive(&self) -> bool {
        matches!(self.mode, SampleMode::Exhaustive)
    }
}

impl fmt::Display for SamplePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mode {
            SampleMode::Sample { size } => {
                write!(f, "sampling {} of {} keys", size, self.total_keys)
            }
            SampleMode::Exhaustive => write!(f, "auditing all {} keys", self.total_keys),
        }
    }
}

/// Hands out the keys chosen by a [`SamplePlan`].
#[derive(Debug)]
pub struct Sampler {
    plan: SamplePlan,
    drawn: u64,
    /// Full key listing, loaded on first use in exhaustive mode
    listing: Option<VecDeque<Bytes>>,
}

impl Sampler {
    pub fn new(plan: SamplePlan) -> Self {
        Self {
            plan,
            drawn: 0,
            listing: None,
        }
    }

    /// Keys handed out so far.
    pub fn drawn(&self) -> u64 {
        self.drawn
    }

    /// Returns the next key to examine, or `None` when the plan is done.
    ///
    /// A sample also ends early if the store reports no random key, which
    /// only happens once it has become empty.
    pub async fn next_key<P>(&mut self, provider: &mut P) -> Result<Option<Bytes>, ProviderError>
    where
        P: MetadataProvider,
    {
        let key = match self.plan.mode {
            SampleMode::Sample { size } => {
                if self.drawn >= size {
                    return Ok(None);
                }
                provider.random_key().await?
            }
            SampleMode::Exhaustive => {
                if self.listing.is_none() {
                    self.listing = Some(provider.list_all_keys().await?.into());
                }
                self.listing.as_mut().and_then(VecDeque::pop_front)
            }
        };

        if key.is_some() {
            self.drawn += 1;
        }
        Ok(key)
    }
}

/// A progress checkpoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub completed: u64,
    pub planned: u64,
}

impl Progress {
    /// Completion in whole percent.
    pub fn percent(&self) -> u64 {
        if self.planned == 0 {
            100
        } else {
            ((self.completed as f64 / self.planned as f64) * 100.0).round() as u64
        }
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} keys sampled - {}% complete",
            self.completed,
            self.percent()
        )
    }
}

/// Emits a checkpoint every tenth of the planned work.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    planned: u64,
    /// Keys per checkpoint; zero disables reporting
    step: u64,
    completed: u64,
}

impl ProgressTracker {
    pub fn new(planned: u64) -> Self {
        Self {
            planned,
            step: planned / PROGRESS_CHECKPOINTS,
            completed: 0,
        }
    }

    /// Records one finished key and returns a checkpoint when one is due.
    pub fn advance(&mut self) -> Option<Progress> {
        self.completed += 1;
        if self.step > 0 && self.completed % self.step == 0 {
            Some(Progress {
                completed: self.completed,
                planned: self.planned,
            })
        } else {
            None
        }
    }

    pub fn completed(&self) -> u64 {
        self.completed
    }
}
