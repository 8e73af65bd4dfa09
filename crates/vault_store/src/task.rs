//! Long-lived recurring background tasks.

use parking_lot::{Condvar, Mutex};
use std::fmt::Display;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// A long-lived background task that runs a job on a fixed interval.
///
/// Each engine owns one task: run a cycle, then sleep for `interval`. A
/// failing cycle is logged and followed by `error_backoff` instead of the
/// normal interval; the task itself never terminates on error.
///
/// Shutdown is cooperative: [`RecurringTask::stop`] wakes the sleeper, so a
/// stop request is honored between cycles - an in-flight cycle always runs
/// to completion, and `stop` blocks until it has.
#[derive(Debug)]
pub struct RecurringTask {
    shared: Arc<TaskShared>,
    handle: Option<JoinHandle<()>>,
}

#[derive(Debug, Default)]
struct TaskShared {
    stop: Mutex<bool>,
    wake: Condvar,
}

impl TaskShared {
    /// Waits for `timeout` or until stopped; returns true if stopped.
    fn wait(&self, timeout: Duration) -> bool {
        let mut stop = self.stop.lock();
        if *stop {
            return true;
        }
        self.wake.wait_for(&mut stop, timeout);
        *stop
    }

    fn stopped(&self) -> bool {
        *self.stop.lock()
    }
}

impl RecurringTask {
    /// Spawns the task and runs the first cycle immediately.
    pub fn spawn<F, E>(
        name: impl Into<String>,
        interval: Duration,
        error_backoff: Duration,
        mut job: F,
    ) -> Self
    where
        F: FnMut() -> Result<(), E> + Send + 'static,
        E: Display,
    {
        let name = name.into();
        let shared = Arc::new(TaskShared::default());
        let task = Arc::clone(&shared);

        let handle = std::thread::spawn(move || {
            tracing::info!(task = %name, "background task started");
            loop {
                if task.stopped() {
                    break;
                }
                let pause = match job() {
                    Ok(()) => interval,
                    Err(e) => {
                        tracing::error!(task = %name, error = %e, "background cycle failed");
                        error_backoff
                    }
                };
                if task.wait(pause) {
                    break;
                }
            }
            tracing::info!(task = %name, "background task stopped");
        });

        Self {
            shared,
            handle: Some(handle),
        }
    }

    /// Signals the task to stop and blocks until the current cycle finishes.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        *self.shared.stop.lock() = true;
        self.shared.wake.notify_all();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for RecurringTask {
    fn drop(&mut self) {
        self.shutdown();
    }
}
