//! Workflow primitives: self-rescheduling tasks and per-session task sets.
//!
//! Every periodic behavior in Steadyhand (decision loop, rest enforcer,
//! humanizer, chat, hunger) is a [`ScheduledTask`]: a tokio task that sleeps
//! for a delay produced by an injected closure, runs its body, and asks the
//! body how long to wait next. Because the delay comes from a closure and the
//! sleep goes through `tokio::time`, tests drive the whole thing with a
//! paused clock.

pub mod delay;
pub mod weighted;

pub use delay::DelayRange;
pub use weighted::{WeightError, WeightedTable};

use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// What a task body wants to happen after it ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reschedule {
    /// Draw the next delay from the task's delay closure.
    UsualDelay,
    /// Run again after exactly this long.
    After(Duration),
}

/// A cancellable background task.
pub struct ScheduledTask {
    name: String,
    handle: JoinHandle<()>,
}

impl ScheduledTask {
    /// Spawn a task that waits `delay()`, runs `body`, and repeats forever.
    ///
    /// The body's [`Reschedule`] decides whether the next wait comes from
    /// `delay` again or is a fixed override.
    pub fn repeating<D, F, Fut>(name: impl Into<String>, mut delay: D, mut body: F) -> Self
    where
        D: FnMut() -> Duration + Send + 'static,
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Reschedule> + Send + 'static,
    {
        let name = name.into();
        let task_name = name.clone();

        let handle = tokio::spawn(async move {
            let mut wait = delay();
            loop {
                tokio::time::sleep(wait).await;
                wait = match body().await {
                    Reschedule::UsualDelay => delay(),
                    Reschedule::After(next) => next,
                };
                debug!(task = %task_name, next_ms = wait.as_millis() as u64, "Task rescheduled");
            }
        });

        debug!(task = %name, "Started repeating task");
        Self { name, handle }
    }

    /// Spawn a task that runs `body` every `period`.
    pub fn fixed_interval<F, Fut>(name: impl Into<String>, period: Duration, mut body: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self::repeating(
            name,
            move || period,
            move || {
                let run = body();
                async move {
                    run.await;
                    Reschedule::UsualDelay
                }
            },
        )
    }

    /// Spawn a task that runs `body` once after `after`.
    pub fn once<Fut>(name: impl Into<String>, after: Duration, body: Fut) -> Self
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        let name = name.into();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            body.await;
        });
        Self { name, handle }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stop the task. Safe to call any number of times.
    pub fn cancel(&self) {
        self.handle.abort();
    }

    /// Whether the task has stopped (completed, cancelled, or panicked).
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// All tasks belonging to one session.
///
/// Dropping the set cancels everything still in it.
#[derive(Default)]
pub struct TaskSet {
    tasks: Vec<ScheduledTask>,
}

impl TaskSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, task: ScheduledTask) {
        self.tasks.push(task);
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Names of the tasks currently held.
    pub fn names(&self) -> Vec<&str> {
        self.tasks.iter().map(ScheduledTask::name).collect()
    }

    /// Forget tasks that already stopped on their own.
    pub fn prune_finished(&mut self) {
        self.tasks.retain(|task| !task.is_finished());
    }

    /// Cancel and forget every task. Returns how many were cancelled; a second
    /// call returns zero.
    pub fn cancel_all(&mut self) -> usize {
        let count = self.tasks.len();
        for task in self.tasks.drain(..) {
            task.cancel();
            debug!(task = %task.name, "Cancelled task");
        }
        count
    }
}

impl Drop for TaskSet {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
