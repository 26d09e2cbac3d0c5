//! Cooperative single-threaded event loop.
//!
//! The home thread drains the loop; any thread may schedule work onto it.
//! Tasks run to completion, one after another, in the order they became
//! due. A task returning [`ControlFlow::Continue`] is queued again after
//! its original delay; [`ControlFlow::Break`] retires it.

use std::collections::VecDeque;
use std::ops::ControlFlow;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::config::LoopConfig;

/// A callback scheduled onto the loop.
pub type Task = Box<dyn FnMut() -> ControlFlow<()> + Send>;

/// Identifies a scheduled task for cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskToken(u64);

/// The loop contract the UI-safe refcount depends on.
pub trait EventLoop: Send + Sync {
    /// Process one pass of due work. When `blocking`, wait for work to
    /// become due first. Returns `true` if any task ran.
    fn run_one_iteration(&self, blocking: bool) -> bool;

    /// Like a blocking [`run_one_iteration`](Self::run_one_iteration), but
    /// never waits past `deadline`. Loops that cannot wait fall back to a
    /// non-blocking pass.
    fn run_one_iteration_until(&self, deadline: Instant) -> bool {
        let _ = deadline;
        self.run_one_iteration(false)
    }

    /// Queue `task` to run once on the loop thread after at least `delay`.
    fn schedule(&self, delay: Duration, task: Task) -> TaskToken;
}

struct Scheduled {
    token: TaskToken,
    due: Instant,
    interval: Duration,
    task: Task,
}

#[derive(Default)]
struct QueueState {
    tasks: VecDeque<Scheduled>,
    next_token: u64,
}

/// FIFO task queue drained by its owning thread.
///
/// Tasks run with the queue unlocked, so a task may schedule more work or
/// drive the loop itself.
pub struct TaskQueue {
    state: Mutex<QueueState>,
    wake: Condvar,
    config: LoopConfig,
}

impl TaskQueue {
    pub fn new(config: LoopConfig) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            wake: Condvar::new(),
            config,
        }
    }

    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    /// Number of tasks waiting to run.
    pub fn pending(&self) -> usize {
        self.state.lock().tasks.len()
    }

    /// Remove a task that has not started yet. Returns `false` if the task
    /// already ran, is running, or was never scheduled here.
    pub fn cancel(&self, token: TaskToken) -> bool {
        let mut state = self.state.lock();
        match state.tasks.iter().position(|s| s.token == token) {
            Some(pos) => {
                state.tasks.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Keep iterating until the queue is empty. Returns how many task
    /// invocations ran. Does not return while a task keeps rescheduling.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        while self.pending() > 0 {
            ran += self.dispatch(true, None);
        }
        ran
    }

    fn dispatch(&self, blocking: bool, limit: Option<Instant>) -> usize {
        let ready = {
            let mut state = self.state.lock();
            if blocking {
                self.wait_for_due(&mut state, limit);
            }
            let now = Instant::now();
            let (ready, waiting): (VecDeque<_>, VecDeque<_>) =
                state.tasks.drain(..).partition(|s| s.due <= now);
            state.tasks = waiting;
            ready
        };

        let ran = ready.len();
        for mut scheduled in ready {
            if (scheduled.task)().is_continue() {
                scheduled.due = Instant::now() + scheduled.interval;
                self.state.lock().tasks.push_back(scheduled);
            }
        }
        ran
    }

    /// Wait until a task is due, the idle wait runs out with nothing queued,
    /// or `limit` passes, whichever comes first.
    fn wait_for_due(
        &self,
        state: &mut parking_lot::MutexGuard<'_, QueueState>,
        limit: Option<Instant>,
    ) {
        let idle_deadline = Instant::now() + self.config.idle_wait;
        loop {
            let now = Instant::now();
            let mut deadline = match state.tasks.iter().map(|s| s.due).min() {
                Some(due) if due <= now => return,
                Some(due) => due,
                None if now >= idle_deadline => return,
                None => idle_deadline,
            };
            if let Some(limit) = limit {
                if now >= limit {
                    return;
                }
                deadline = deadline.min(limit);
            }
            self.wake.wait_until(state, deadline);
        }
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new(LoopConfig::default())
    }
}

impl EventLoop for TaskQueue {
    fn run_one_iteration(&self, blocking: bool) -> bool {
        self.dispatch(blocking, None) > 0
    }

    fn run_one_iteration_until(&self, deadline: Instant) -> bool {
        self.dispatch(true, Some(deadline)) > 0
    }

    fn schedule(&self, delay: Duration, task: Task) -> TaskToken {
        let mut state = self.state.lock();
        let token = TaskToken(state.next_token);
        state.next_token += 1;
        state.tasks.push_back(Scheduled {
            token,
            due: Instant::now() + delay,
            interval: delay,
            task,
        });
        drop(state);
        self.wake.notify_one();
        token
    }
}

impl Drop for TaskQueue {
    fn drop(&mut self) {
        let pending = self.state.get_mut().tasks.len();
        if pending > 0 {
            tracing::warn!("event loop dropped with {pending} task(s) that never ran");
        }
    }
}
