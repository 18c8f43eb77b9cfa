//! Cancelable task pipeline.
//!
//! A [`Task`] is a named asynchronous step that operates on a shared context.
//! A [`TaskPipeline`] runs tasks strictly in order, stops at the first
//! failure and can be canceled at any point through its
//! [`CancellationToken`]. Canceling drops the future of the task in flight,
//! which releases anything that task registered (event subscriptions,
//! timers), and prevents the remaining tasks from starting.

use crate::error::TaskError;
use async_trait::async_trait;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Result of running a task
pub type TaskResult = Result<(), TaskError>;

/// A named step operating on context `C`
#[async_trait]
pub trait Task<C: Send>: Send {
    /// Name used in logs and errors
    fn name(&self) -> &str;

    /// Run the step
    async fn run(&mut self, ctx: &mut C) -> TaskResult;
}

/// Tasks run one after another
pub struct TaskPipeline<C> {
    name: String,
    tasks: Vec<Box<dyn Task<C>>>,
    token: CancellationToken,
}

impl<C: Send + 'static> TaskPipeline<C> {
    /// Empty pipeline with its own cancellation token
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_token(name, CancellationToken::new())
    }

    /// Empty pipeline canceled through `token`
    pub fn with_token(name: impl Into<String>, token: CancellationToken) -> Self {
        Self {
            name: name.into(),
            tasks: Vec::new(),
            token,
        }
    }

    /// Append a task
    #[must_use]
    pub fn then(mut self, task: impl Task<C> + 'static) -> Self {
        self.tasks.push(Box::new(task));
        self
    }

    /// Append a boxed task
    pub fn push(&mut self, task: Box<dyn Task<C>>) {
        self.tasks.push(task);
    }

    /// Token that cancels this pipeline
    #[must_use]
    pub fn canceler(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Cancel the task in flight and everything after it
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Number of tasks
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether the pipeline has no tasks
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Task names in run order
    #[must_use]
    pub fn task_names(&self) -> Vec<&str> {
        self.tasks.iter().map(|t| t.name()).collect()
    }
}

#[async_trait]
impl<C: Send + 'static> Task<C> for TaskPipeline<C> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&mut self, ctx: &mut C) -> TaskResult {
        for task in &mut self.tasks {
            let name = task.name().to_string();
            if self.token.is_cancelled() {
                return Err(TaskError::Canceled { task: name });
            }

            debug!("[{}] running {}", self.name, name);
            tokio::select! {
                biased;
                () = self.token.cancelled() => {
                    debug!("[{}] canceled during {}", self.name, name);
                    return Err(TaskError::Canceled { task: name });
                }
                result = task.run(ctx) => {
                    if let Err(e) = result {
                        if !e.is_canceled() {
                            warn!("[{}] {}", self.name, e);
                        }
                        return Err(e);
                    }
                }
            }
        }
        Ok(())
    }
}

/// Fails a task that runs longer than a deadline
pub struct TimeoutTask<T> {
    inner: T,
    timeout: Duration,
}

impl<T> TimeoutTask<T> {
    /// Wrap `inner` with a deadline
    pub fn new(inner: T, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

#[async_trait]
impl<C: Send, T: Task<C>> Task<C> for TimeoutTask<T> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn run(&mut self, ctx: &mut C) -> TaskResult {
        match tokio::time::timeout(self.timeout, self.inner.run(ctx)).await {
            Ok(result) => result,
            Err(_) => Err(TaskError::TimedOut {
                task: self.inner.name().to_string(),
                after: self.timeout,
            }),
        }
    }
}
