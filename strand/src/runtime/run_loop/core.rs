use super::event::EventEntry;
use crate::error::{ContractViolation, fatal};
use crate::executor::{
    EventHandler, EventableExecutor, Executor, ExecutorEvent, MainExecutor, RunLoopExecutor,
    SerialExecutor, UnownedSerialExecutor, is_installed_main_executor,
};
use crate::job::Job;
use crate::runtime::context;
use crate::runtime::thread::{current_thread_label, is_main_thread};
use crate::runtime::timer::{TimerQueue, deadline_after};
use crate::time::{Clock, ClockInstant};
use crate::utils::Slab;

use parking_lot::{Condvar, Mutex};

use std::collections::VecDeque;
use std::fmt;
use std::mem;
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

/// How often `run_until` re-evaluates its condition while idle.
const UNTIL_POLL: Duration = Duration::from_millis(10);

enum Command {
    Run(Job),
    Fire(Arc<EventEntry>),
}

struct LoopState {
    /// Ready work in arrival order.
    commands: VecDeque<Command>,

    /// Delayed jobs.
    timers: TimerQueue,

    /// Set by `stop`, consumed by the innermost active run.
    stop_requested: bool,

    /// Thread driving the loop while `depth > 0`.
    owner: Option<ThreadId>,

    /// Number of nested active runs.
    depth: usize,
}

struct RunLoopShared {
    label: String,
    state: Mutex<LoopState>,
    condvar: Condvar,
    events: Mutex<Slab<Arc<EventEntry>>>,
}

/// How a single `pump` call decides to return.
enum Mode<'a> {
    /// Until stopped.
    Forever,

    /// Until stopped or the condition holds.
    Until(&'a mut dyn FnMut() -> bool),

    /// Until stopped or this many commands have been dispatched.
    Drain(usize),
}

/// A run loop executor driven by the thread that calls [`run`](RunLoop::run).
///
/// Jobs, timers and event handlers are dispatched one at a time on the
/// driving thread, which makes the loop a [`SerialExecutor`]. `run` may be
/// nested on the same thread (a job may run the loop again); driving one
/// loop from two threads at once terminates the process.
///
/// `RunLoop` is a cheap handle: clones drive the same loop and compare
/// equal.
///
/// # Examples
///
/// ```rust,ignore
/// let main = RunLoop::new();
///
/// let stopper = main.clone();
/// main.enqueue(Job::new(JobPriority::MEDIUM, move || stopper.stop()));
///
/// main.run();
/// ```
#[derive(Clone)]
pub struct RunLoop {
    shared: Arc<RunLoopShared>,
}

impl RunLoop {
    pub fn new() -> Self {
        Self::with_label("strand-main")
    }

    pub fn with_label(label: impl Into<String>) -> Self {
        Self {
            shared: Arc::new(RunLoopShared {
                label: label.into(),
                state: Mutex::new(LoopState {
                    commands: VecDeque::new(),
                    timers: TimerQueue::new(),
                    stop_requested: false,
                    owner: None,
                    depth: 0,
                }),
                condvar: Condvar::new(),
                events: Mutex::new(Slab::new(16)),
            }),
        }
    }

    /// Runs the jobs, due timers and pending events that are ready when it
    /// is called, then returns without waiting for more.
    ///
    /// Work posted while draining stays queued for the next time the loop
    /// is driven, so a job that re-posts itself cannot keep `drain` busy.
    pub fn drain(&self) {
        let ready = {
            let mut state = self.shared.state.lock();
            let due = state.timers.pop_due(Instant::now());
            state.commands.extend(due.into_iter().map(Command::Run));
            state.commands.len()
        };

        self.pump(Mode::Drain(ready));
    }

    /// Whether some thread is inside `run`, `run_until` or `drain`.
    pub fn is_running(&self) -> bool {
        self.shared.state.lock().depth > 0
    }

    /// Number of ready jobs and event firings waiting to be dispatched.
    pub fn pending_jobs(&self) -> usize {
        self.shared.state.lock().commands.len()
    }

    /// Number of delayed jobs that have not fired yet.
    pub fn pending_timers(&self) -> usize {
        self.shared.state.lock().timers.len()
    }

    /// Number of registered events.
    pub fn registered_events(&self) -> usize {
        self.shared.events.lock().len()
    }

    fn push(&self, command: Command) {
        self.shared.state.lock().commands.push_back(command);
        self.shared.condvar.notify_one();
    }

    fn schedule(&self, deadline: Instant, tolerance: Option<Duration>, job: Job) {
        self.shared.state.lock().timers.push(deadline, tolerance, job);
        self.shared.condvar.notify_one();
    }

    fn pump(&self, mut mode: Mode<'_>) {
        let _running = self.enter();
        let executor = self.as_unowned_serial_executor();

        context::enter_serial(executor, || {
            loop {
                if let Mode::Until(condition) = &mut mode {
                    if condition() {
                        break;
                    }
                }

                if let Mode::Drain(0) = mode {
                    break;
                }

                let mut state = self.shared.state.lock();

                if mem::take(&mut state.stop_requested) {
                    break;
                }

                let now = Instant::now();
                let due = state.timers.pop_due(now);
                state.commands.extend(due.into_iter().map(Command::Run));

                if let Some(command) = state.commands.pop_front() {
                    drop(state);

                    if let Mode::Drain(remaining) = &mut mode {
                        *remaining -= 1;
                    }

                    self.dispatch(command);
                    continue;
                }

                let wake = match mode {
                    Mode::Drain(_) => break,
                    Mode::Forever => state.timers.next_wake(),
                    Mode::Until(_) => {
                        let poll = now + UNTIL_POLL;
                        Some(state.timers.next_wake().map_or(poll, |wake| wake.min(poll)))
                    }
                };

                match wake {
                    Some(deadline) => {
                        self.shared.condvar.wait_until(&mut state, deadline);
                    }
                    None => self.shared.condvar.wait(&mut state),
                }
            }
        });
    }

    fn dispatch(&self, command: Command) {
        match command {
            Command::Run(job) => {
                tracing::trace!(run_loop = %self.shared.label, job = %job.id(), "run");
                job.run();
            }
            Command::Fire(entry) => entry.dispatch(),
        }
    }

    /// Claims the loop for the calling thread.
    fn enter(&self) -> Running<'_> {
        let current = thread::current().id();
        let mut state = self.shared.state.lock();

        if let Some(owner) = state.owner {
            if owner != current {
                drop(state);

                fatal(ContractViolation::ConcurrentRun {
                    executor: self.shared.label.clone(),
                    owner,
                });
            }
        }

        state.owner = Some(current);
        state.depth += 1;

        let depth = state.depth;
        drop(state);

        if depth == 1 {
            tracing::debug!(
                run_loop = %self.shared.label,
                thread = %current_thread_label(),
                "run loop entered"
            );

            if self.is_main_executor() && !is_main_thread() {
                tracing::warn!(
                    run_loop = %self.shared.label,
                    thread = %current_thread_label(),
                    "main executor is running off the primary thread"
                );
            }
        }

        Running { run_loop: self }
    }

    fn runs_on_current_thread(&self) -> bool {
        self.shared.state.lock().owner == Some(thread::current().id())
    }
}

/// Releases the loop when the outermost run returns.
struct Running<'a> {
    run_loop: &'a RunLoop,
}

impl Drop for Running<'_> {
    fn drop(&mut self) {
        let mut state = self.run_loop.shared.state.lock();
        state.depth -= 1;

        if state.depth == 0 {
            state.owner = None;
            state.stop_requested = false;

            tracing::debug!(run_loop = %self.run_loop.shared.label, "run loop exited");
        }
    }
}

impl Default for RunLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl Executor for RunLoop {
    /// Queues `job`. It runs the next time the loop is driven.
    fn enqueue(&self, job: Job) {
        tracing::trace!(run_loop = %self.shared.label, job = %job.id(), "enqueue");

        self.push(Command::Run(job));
    }

    fn is_main_executor(&self) -> bool {
        is_installed_main_executor(self)
    }

    fn supports_scheduling(&self) -> bool {
        true
    }

    fn enqueue_after(
        &self,
        job: Job,
        delay: Duration,
        tolerance: Option<Duration>,
        _clock: &dyn Clock,
    ) {
        self.schedule(deadline_after(delay), tolerance, job);
    }

    fn enqueue_at(
        &self,
        job: Job,
        instant: ClockInstant,
        tolerance: Option<Duration>,
        clock: &dyn Clock,
    ) {
        let remaining = clock.now().duration_to(instant);

        self.schedule(deadline_after(remaining), tolerance, job);
    }

    fn label(&self) -> String {
        self.shared.label.clone()
    }
}

impl SerialExecutor for RunLoop {
    fn as_unowned_serial_executor(&self) -> UnownedSerialExecutor {
        UnownedSerialExecutor::complex_equality(self)
    }

    fn is_same_exclusive_execution_context(&self, other: &Self) -> bool {
        self == other
    }

    /// Passes when the calling thread is driving this loop.
    fn check_isolated(&self) {
        if !self.runs_on_current_thread() {
            fatal(ContractViolation::UnexpectedIsolation {
                expected: self.shared.label.clone(),
            });
        }
    }

    fn is_isolating_current_context(&self) -> bool {
        self.runs_on_current_thread()
    }
}

impl RunLoopExecutor for RunLoop {
    fn run(&self) {
        self.pump(Mode::Forever);
    }

    fn run_until(&self, condition: &mut dyn FnMut() -> bool) {
        self.pump(Mode::Until(condition));
    }

    /// Ignored when the loop is not running.
    fn stop(&self) {
        let mut state = self.shared.state.lock();

        if state.depth == 0 {
            tracing::debug!(run_loop = %self.shared.label, "stop ignored, run loop is not running");
            return;
        }

        state.stop_requested = true;
        drop(state);

        self.shared.condvar.notify_one();
    }
}

impl EventableExecutor for RunLoop {
    fn register_event(&self, handler: EventHandler) -> ExecutorEvent {
        let key = self.shared.events.lock().insert(Arc::new(EventEntry::new(handler)));
        let event = ExecutorEvent::new(key);

        tracing::debug!(run_loop = %self.shared.label, ?event, "event registered");

        event
    }

    fn deregister(&self, event: ExecutorEvent) {
        let entry = self.shared.events.lock().remove(event.id());

        if let Some(entry) = entry {
            entry.deregister();

            tracing::debug!(run_loop = %self.shared.label, ?event, "event deregistered");
        }
    }

    fn notify(&self, event: ExecutorEvent) {
        let entry = self.shared.events.lock().get(event.id()).cloned();

        match entry {
            Some(entry) if entry.mark_pending() => self.push(Command::Fire(entry)),
            Some(_) => {}
            None => {
                tracing::trace!(run_loop = %self.shared.label, ?event, "notify for unknown event")
            }
        }
    }
}

impl MainExecutor for RunLoop {}

impl PartialEq for RunLoop {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl Eq for RunLoop {}

impl fmt::Debug for RunLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();

        f.debug_struct("RunLoop")
            .field("label", &self.shared.label)
            .field("depth", &state.depth)
            .field("pending_jobs", &state.commands.len())
            .field("pending_timers", &state.timers.len())
            .finish()
    }
}
