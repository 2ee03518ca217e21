//! Execution strategies for fanning one query out over many instruments.
//!
//! Both dispatchers return results in task order and stop at the first
//! failure, so swapping one for the other never changes ranked output.

use std::any::Any;
use std::fmt::Display;
use std::panic::{self, AssertUnwindSafe};

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::SimError;

/// Default worker pool width.
pub const DEFAULT_WORKERS: usize = 20;

/// Runs one closure per task and gathers the results in task order.
///
/// `dispatch` is a barrier: it returns only after every task it started has
/// finished. A task that panics surfaces as [`SimError::WorkerFailure`].
pub trait Dispatcher: Send + Sync {
    fn dispatch<T, R, F>(&self, tasks: &[T], task: F) -> Result<Vec<R>, SimError>
    where
        T: Display + Sync,
        R: Send,
        F: Fn(&T) -> Result<R, SimError> + Sync;

    /// Number of tasks that may run at once.
    fn width(&self) -> usize;
}

/// Runs tasks one after another on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialDispatcher;

impl Dispatcher for SerialDispatcher {
    fn dispatch<T, R, F>(&self, tasks: &[T], task: F) -> Result<Vec<R>, SimError>
    where
        T: Display + Sync,
        R: Send,
        F: Fn(&T) -> Result<R, SimError> + Sync,
    {
        tasks.iter().map(|item| run_guarded(item, &task)).collect()
    }

    fn width(&self) -> usize {
        1
    }
}

/// Long-lived rayon pool reused across queries and snapshot steps.
#[derive(Debug)]
pub struct PooledDispatcher {
    pool: ThreadPool,
}

impl PooledDispatcher {
    pub fn new(workers: usize) -> Result<Self, SimError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .thread_name(|index| format!("simseg-worker-{index}"))
            .build()
            .map_err(|error| SimError::WorkerFailure {
                symbol: String::from("<pool>"),
                message: error.to_string(),
            })?;

        Ok(Self { pool })
    }
}

impl Dispatcher for PooledDispatcher {
    fn dispatch<T, R, F>(&self, tasks: &[T], task: F) -> Result<Vec<R>, SimError>
    where
        T: Display + Sync,
        R: Send,
        F: Fn(&T) -> Result<R, SimError> + Sync,
    {
        self.pool.install(|| {
            tasks
                .par_iter()
                .map(|item| run_guarded(item, &task))
                .collect::<Result<Vec<R>, SimError>>()
        })
    }

    fn width(&self) -> usize {
        self.pool.current_num_threads()
    }
}

fn run_guarded<T, R, F>(item: &T, task: &F) -> Result<R, SimError>
where
    T: Display,
    F: Fn(&T) -> Result<R, SimError>,
{
    match panic::catch_unwind(AssertUnwindSafe(|| task(item))) {
        Ok(result) => result,
        Err(payload) => Err(SimError::WorkerFailure {
            symbol: item.to_string(),
            message: panic_message(payload.as_ref()),
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        String::from("task panicked")
    }
}
