use super::executor::core::ThreadPoolExecutor;

use std::thread;

/// Builder for configuring and creating a [`ThreadPoolExecutor`].
///
/// # Examples
///
/// ```rust,ignore
/// let pool = ThreadPoolBuilder::new()
///     .worker_threads(4)
///     .thread_name("io")
///     .build();
/// ```
pub struct ThreadPoolBuilder {
    /// Number of worker threads in the pool.
    worker_threads: usize,

    /// Prefix of worker thread names.
    thread_name: String,
}

impl ThreadPoolBuilder {
    /// Creates a new `ThreadPoolBuilder` with default configuration.
    ///
    /// By default, the number of worker threads is set to the number
    /// of available logical CPUs, falling back to `1` if unavailable,
    /// and threads are named `strand-worker-<n>`.
    pub fn new() -> Self {
        let worker_threads = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        Self {
            worker_threads,
            thread_name: "strand-worker".to_owned(),
        }
    }

    /// Sets the number of worker threads used by the pool.
    ///
    /// # Panics
    ///
    /// Panics if `n == 0`.
    pub fn worker_threads(mut self, n: usize) -> Self {
        assert!(n > 0, "worker_threads must be > 0");

        self.worker_threads = n;
        self
    }

    /// Sets the prefix of worker thread names. The pool's diagnostic label
    /// is the same string.
    pub fn thread_name(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name = prefix.into();
        self
    }

    /// Spawns the workers and returns the pool.
    pub fn build(self) -> ThreadPoolExecutor {
        ThreadPoolExecutor::start(self.thread_name, self.worker_threads)
    }
}

impl Default for ThreadPoolBuilder {
    fn default() -> Self {
        Self::new()
    }
}
