// orbit-core/src/scheduler.rs

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::error::Error;
use std::fmt;

/// A deferred unit of work. Runs to completion; a failure surfaces from
/// [`TaskQueue::flush`].
pub type Task = Box<dyn FnOnce() -> Result<(), TaskError>>;

#[derive(Debug)]
pub struct TaskError(pub Box<dyn Error + 'static>);

impl TaskError {
    pub fn new(err: impl Error + 'static) -> Self {
        Self(Box::new(err))
    }
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl Error for TaskError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.0.source()
    }
}

/// "Run once, soon" deferral offered by the host.
pub trait Scheduler {
    fn defer(&self, task: Task);
}

/// FIFO task queue flushed explicitly by the host loop (or by tests).
#[derive(Default)]
pub struct TaskQueue {
    queue: RefCell<VecDeque<Task>>,
    flushing: Cell<bool>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Run queued tasks until the queue is empty, including tasks queued while flushing.
    /// Stops at the first failing task, leaving the rest queued. Returns the number of
    /// tasks run.
    pub fn flush(&self) -> Result<usize, TaskError> {
        // Re-entrant flushes are no-ops; the outer flush drains anything queued meanwhile.
        if self.flushing.replace(true) {
            return Ok(0);
        }

        let mut ran = 0;
        let result = loop {
            // Pop before running so the task may queue more work.
            let next = self.queue.borrow_mut().pop_front();
            let Some(task) = next else { break Ok(ran) };
            ran += 1;
            if let Err(err) = task() {
                break Err(err);
            }
        };

        self.flushing.set(false);
        result
    }
}

impl Scheduler for TaskQueue {
    fn defer(&self, task: Task) {
        self.queue.borrow_mut().push_back(task);
    }
}

impl fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskQueue")
            .field("pending", &self.pending())
            .field("flushing", &self.flushing.get())
            .finish()
    }
}
