use crate::job::Job;

use parking_lot::Mutex;

use std::collections::VecDeque;

/// A per-worker job queue.
///
/// The owning worker pushes and pops at the back (LIFO, warm caches); other
/// workers steal from the front.
pub(crate) struct LocalQueue {
    inner: Mutex<VecDeque<Job>>,
}

impl LocalQueue {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(VecDeque::new()),
        }
    }

    pub(crate) fn push(&self, job: Job) {
        self.inner.lock().push_back(job);
    }

    pub(crate) fn pop(&self) -> Option<Job> {
        self.inner.lock().pop_back()
    }

    pub(crate) fn steal(&self) -> Option<Job> {
        self.inner.lock().pop_front()
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.lock().len()
    }
}
