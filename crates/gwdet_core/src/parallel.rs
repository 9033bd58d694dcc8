//! Ordered batch dispatch over a worker pool.
//!
//! A batch is a fixed set of independent inputs evaluated through a pure
//! task function. Outputs are always aligned to input order regardless of
//! dispatch order; in parallel mode each task carries its original index and
//! results are reassembled by that tag.

use std::sync::atomic::{AtomicUsize, Ordering};
#[cfg(feature = "parallel")]
use std::time::Duration;

#[cfg(feature = "parallel")]
use rand::seq::SliceRandom;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// How often the dispatching thread reports outstanding task counts.
#[cfg(feature = "parallel")]
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Completed-task counter shared between the dispatching thread and the
/// worker pool. Informational only.
#[derive(Debug)]
pub struct BatchProgress {
    completed: AtomicUsize,
    total: usize,
}

impl BatchProgress {
    /// Create a new progress tracker
    #[must_use]
    pub fn new(total: usize) -> Self {
        Self {
            completed: AtomicUsize::new(0),
            total,
        }
    }

    /// Get the number of completed tasks
    #[must_use]
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    /// Get the number of tasks not yet completed
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.total - self.completed().min(self.total)
    }

    /// Get the total number of tasks
    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }

    /// Increment the completed counter
    pub fn increment(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }
}

/// Executes a task function over a fixed batch of independent inputs.
pub enum BatchEvaluator {
    /// In-process evaluation, one input after another.
    Sequential,
    /// A fixed-size worker pool, created once and reused for every batch
    /// dispatched through this evaluator.
    #[cfg(feature = "parallel")]
    Parallel {
        pool: rayon::ThreadPool,
        poll_interval: Duration,
    },
}

impl BatchEvaluator {
    /// In-process evaluator with no pool.
    #[must_use]
    pub fn sequential() -> Self {
        Self::Sequential
    }

    /// Evaluator backed by a worker pool sized to the available processing
    /// units.
    #[cfg(feature = "parallel")]
    pub fn parallel() -> Result<Self, rayon::ThreadPoolBuildError> {
        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()?;
        Ok(Self::Parallel {
            pool,
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    /// Override the progress-report interval. No effect on a sequential
    /// evaluator.
    #[cfg(feature = "parallel")]
    #[must_use]
    pub fn with_poll_interval(self, poll_interval: Duration) -> Self {
        match self {
            Self::Parallel { pool, .. } => Self::Parallel {
                pool,
                poll_interval,
            },
            other => other,
        }
    }

    /// Evaluate `task` over every input.
    ///
    /// Guarantees `outputs.len() == inputs.len()` and
    /// `outputs[i] == task(&inputs[i])` for all `i`, independent of dispatch
    /// order. The first task failure aborts the whole batch; there is no
    /// partial result.
    pub fn run<I, T, E, F>(&self, inputs: &[I], task: F) -> Result<Vec<T>, E>
    where
        I: Sync,
        T: Send,
        E: Send,
        F: Fn(&I) -> Result<T, E> + Sync,
    {
        match self {
            Self::Sequential => inputs.iter().map(|input| task(input)).collect(),
            #[cfg(feature = "parallel")]
            Self::Parallel {
                pool,
                poll_interval,
            } => run_parallel(pool, *poll_interval, inputs, &task),
        }
    }
}

#[cfg(feature = "parallel")]
fn run_parallel<I, T, E, F>(
    pool: &rayon::ThreadPool,
    poll_interval: Duration,
    inputs: &[I],
    task: &F,
) -> Result<Vec<T>, E>
where
    I: Sync,
    T: Send,
    E: Send,
    F: Fn(&I) -> Result<T, E> + Sync,
{
    // Dispatch in a random permutation so clusters of expensive inputs
    // spread across workers; the original index travels with each task.
    let mut order: Vec<usize> = (0..inputs.len()).collect();
    order.shuffle(&mut rand::rng());

    let progress = BatchProgress::new(inputs.len());

    let tagged = std::thread::scope(|scope| {
        let worker = scope.spawn(|| {
            pool.install(|| {
                order
                    .par_iter()
                    .map(|&index| {
                        let value = task(&inputs[index])?;
                        progress.increment();
                        Ok((index, value))
                    })
                    .collect::<Result<Vec<_>, E>>()
            })
        });

        while !worker.is_finished() {
            std::thread::sleep(poll_interval);
            let remaining = progress.remaining();
            if remaining > 0 {
                tracing::info!(remaining, total = progress.total(), "waiting for batch tasks");
            }
        }

        match worker.join() {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    });

    let mut tagged = tagged?;
    tagged.sort_unstable_by_key(|entry| entry.0);
    Ok(tagged.into_iter().map(|(_, value)| value).collect())
}
