// Single-flight background work
// MonoTasker runs at most one unit of work per owner on a named thread. Launching
// cancels the current unit, chaining waits for it. Cancellation is cooperative.

use crate::cell::{StateCell, Subscription};
use parking_lot::{Condvar, Mutex};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

pub use tokio_util::sync::CancellationToken;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Sleep for `duration` in short slices, waking early on cancellation.
/// Returns `false` if `token` was cancelled before the time elapsed.
pub fn sleep_unless_cancelled(token: &CancellationToken, duration: Duration) -> bool {
    let deadline = Instant::now() + duration;
    loop {
        if token.is_cancelled() {
            return false;
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return true;
        }
        thread::sleep(remaining.min(Duration::from_millis(5)));
    }
}

/// How a unit of work ended
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome<T> {
    Completed(T),
    /// Never started: cancelled while waiting for its predecessor
    Cancelled,
    /// The work panicked; the panic was contained on the worker thread
    Panicked(String),
}

impl<T> TaskOutcome<T> {
    pub fn completed(self) -> Option<T> {
        match self {
            TaskOutcome::Completed(value) => Some(value),
            _ => None,
        }
    }
}

struct Completion<T> {
    outcome: Mutex<Option<TaskOutcome<T>>>,
    finished: AtomicBool,
    done: Condvar,
}

impl<T> Completion<T> {
    fn new() -> Self {
        Self {
            outcome: Mutex::new(None),
            finished: AtomicBool::new(false),
            done: Condvar::new(),
        }
    }

    fn finish(&self, outcome: TaskOutcome<T>) {
        let mut slot = self.outcome.lock();
        *slot = Some(outcome);
        self.finished.store(true, Ordering::Release);
        self.done.notify_all();
    }

    fn take(&self) -> TaskOutcome<T> {
        let mut slot = self.outcome.lock();
        while !self.finished.load(Ordering::Acquire) {
            self.done.wait(&mut slot);
        }
        slot.take().unwrap_or(TaskOutcome::Cancelled)
    }
}

/// Type-erased view of a completion, used to wait on whatever runs currently
trait Waitable: Send + Sync {
    fn wait(&self);
    fn wait_timeout(&self, timeout: Duration) -> bool;
    fn is_finished(&self) -> bool;
}

impl<T: Send> Waitable for Completion<T> {
    fn wait(&self) {
        let mut slot = self.outcome.lock();
        while !self.finished.load(Ordering::Acquire) {
            self.done.wait(&mut slot);
        }
    }

    fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut slot = self.outcome.lock();
        while !self.finished.load(Ordering::Acquire) {
            if self.done.wait_until(&mut slot, deadline).timed_out() {
                return self.finished.load(Ordering::Acquire);
            }
        }
        true
    }

    fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }
}

/// Handle to one launched unit of work
pub struct TaskHandle<T> {
    id: u64,
    token: CancellationToken,
    completion: Arc<Completion<T>>,
}

impl<T: Send> TaskHandle<T> {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Request cancellation; does not block
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.completion.is_finished()
    }

    /// Block until the work has ended, without consuming the handle
    pub fn wait(&self) {
        Waitable::wait(self.completion.as_ref());
    }

    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        self.completion.wait_timeout(timeout)
    }

    /// Block until the work has ended and return how it ended
    pub fn join(self) -> TaskOutcome<T> {
        self.completion.take()
    }
}

struct CurrentTask {
    id: u64,
    token: CancellationToken,
    done: Arc<dyn Waitable>,
}

struct TaskerShared {
    current: Mutex<Option<CurrentTask>>,
    running: StateCell<bool>,
}

impl TaskerShared {
    fn finish(&self, id: u64) {
        let mut current = self.current.lock();
        if current.as_ref().map(|task| task.id) == Some(id) {
            *current = None;
            self.running.set(false);
        }
    }
}

/// Runs at most one unit of background work at a time
pub struct MonoTasker {
    name: String,
    parent: CancellationToken,
    shared: Arc<TaskerShared>,
    next_id: AtomicU64,
    poll_interval: Duration,
}

impl MonoTasker {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_parent(name, &CancellationToken::new())
    }

    /// Every token handed to work is a child of `parent`,
    /// so cancelling `parent` cancels whatever runs here.
    pub fn with_parent(name: impl Into<String>, parent: &CancellationToken) -> Self {
        Self {
            name: name.into(),
            parent: parent.clone(),
            shared: Arc::new(TaskerShared {
                current: Mutex::new(None),
                running: StateCell::new(false),
            }),
            next_id: AtomicU64::new(1),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Cancel the current unit (if any) and start `work`
    pub fn launch<T, F>(&self, work: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce(&CancellationToken) -> T + Send + 'static,
    {
        let (handle, previous) = self.install::<T>();
        if let Some(previous) = previous {
            log::debug!("[tasker:{}] superseding task {}", self.name, previous.id);
            previous.token.cancel();
        }

        self.spawn(&handle, move |token| TaskOutcome::Completed(work(token)));
        handle
    }

    /// Start `work` once the current unit has ended, however it ends.
    ///
    /// Cancelling the chained unit while it waits also cancels its predecessor.
    pub fn launch_chained<T, F>(&self, work: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce(&CancellationToken) -> T + Send + 'static,
    {
        let (handle, previous) = self.install::<T>();
        let poll = self.poll_interval;

        self.spawn(&handle, move |token| {
            if let Some(previous) = previous {
                while !previous.done.wait_timeout(poll) {
                    if token.is_cancelled() {
                        previous.token.cancel();
                        return TaskOutcome::Cancelled;
                    }
                }
            }
            if token.is_cancelled() {
                return TaskOutcome::Cancelled;
            }
            TaskOutcome::Completed(work(token))
        });
        handle
    }

    /// Request cancellation of the current unit; does not block
    pub fn cancel(&self) {
        if let Some(task) = self.shared.current.lock().as_ref() {
            task.token.cancel();
        }
    }

    /// Block until the current unit has fully stopped
    pub fn join(&self) {
        let done = self
            .shared
            .current
            .lock()
            .as_ref()
            .map(|task| task.done.clone());
        if let Some(done) = done {
            done.wait();
        }
    }

    pub fn cancel_and_join(&self) {
        self.cancel();
        self.join();
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.get()
    }

    pub fn running_stream(&self) -> Subscription<bool> {
        self.shared.running.subscribe()
    }

    fn install<T: Send + 'static>(&self) -> (TaskHandle<T>, Option<CurrentTask>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let handle = TaskHandle {
            id,
            token: self.parent.child_token(),
            completion: Arc::new(Completion::new()),
        };

        let mut current = self.shared.current.lock();
        let previous = current.replace(CurrentTask {
            id,
            token: handle.token.clone(),
            done: handle.completion.clone(),
        });
        self.shared.running.set(true);
        (handle, previous)
    }

    fn spawn<T, F>(&self, handle: &TaskHandle<T>, body: F)
    where
        T: Send + 'static,
        F: FnOnce(&CancellationToken) -> TaskOutcome<T> + Send + 'static,
    {
        let id = handle.id;
        let token = handle.token.clone();
        let completion = handle.completion.clone();
        let shared = self.shared.clone();
        let name = self.name.clone();

        let spawned = thread::Builder::new()
            .name(format!("{}-task-{}", self.name, id))
            .spawn({
                let completion = completion.clone();
                let shared = shared.clone();
                move || {
                    let outcome = match panic::catch_unwind(AssertUnwindSafe(|| body(&token))) {
                        Ok(outcome) => outcome,
                        Err(payload) => {
                            let message = panic_message(payload.as_ref());
                            log::error!("[tasker:{}] task {} panicked: {}", name, id, message);
                            TaskOutcome::Panicked(message)
                        }
                    };
                    shared.finish(id);
                    completion.finish(outcome);
                }
            });

        if let Err(e) = spawned {
            log::error!("[tasker:{}] failed to spawn worker: {}", self.name, e);
            shared.finish(id);
            completion.finish(TaskOutcome::Panicked(format!("spawn failed: {}", e)));
        }
    }
}

impl Drop for MonoTasker {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_child_token_follows_parent() {
        let parent = CancellationToken::new();
        let child = parent.child_token();
        let grandchild = child.child_token();
        assert!(!grandchild.is_cancelled());

        parent.cancel();
        assert!(child.is_cancelled());
        assert!(grandchild.is_cancelled());
    }

    #[test]
    fn test_cancelling_child_leaves_parent() {
        let parent = CancellationToken::new();
        let child = parent.child_token();
        child.cancel();
        assert!(!parent.is_cancelled());
        assert!(!sleep_unless_cancelled(&child, Duration::from_millis(50)));
    }

    #[test]
    fn test_launch_reports_running_until_done() {
        let tasker = MonoTasker::new("test");
        let handle = tasker.launch(|_| {
            thread::sleep(Duration::from_millis(50));
            42
        });
        assert!(tasker.is_running());
        assert_eq!(handle.join(), TaskOutcome::Completed(42));
        assert!(!tasker.is_running());
    }

    #[test]
    fn test_launch_supersedes_previous() {
        let tasker = MonoTasker::new("test");
        let first = tasker.launch(|token| sleep_unless_cancelled(token, Duration::from_secs(5)));
        let second = tasker.launch(|_| "second");

        // The first unit saw cancellation and returned early
        assert_eq!(first.join(), TaskOutcome::Completed(false));
        assert_eq!(second.join(), TaskOutcome::Completed("second"));
        assert!(!tasker.is_running());
    }

    #[test]
    fn test_chained_runs_after_previous() {
        let tasker = MonoTasker::new("test");
        let order = Arc::new(Mutex::new(Vec::new()));

        let first = {
            let order = order.clone();
            tasker.launch(move |_| {
                thread::sleep(Duration::from_millis(50));
                order.lock().push(1);
            })
        };
        let second = {
            let order = order.clone();
            tasker.launch_chained(move |_| order.lock().push(2))
        };

        assert_eq!(second.join(), TaskOutcome::Completed(()));
        assert!(first.is_finished());
        assert!(!first.is_cancelled());
        assert_eq!(*order.lock(), vec![1, 2]);
    }

    #[test]
    fn test_cancelled_chain_cancels_predecessor() {
        let tasker = MonoTasker::new("test");
        let first = tasker.launch(|token| sleep_unless_cancelled(token, Duration::from_secs(5)));
        let ran = Arc::new(AtomicBool::new(false));
        let second = {
            let ran = ran.clone();
            tasker.launch_chained(move |_| ran.store(true, Ordering::SeqCst))
        };

        tasker.cancel();
        assert_eq!(second.join(), TaskOutcome::Cancelled);
        assert_eq!(first.join(), TaskOutcome::Completed(false));
        assert!(!ran.load(Ordering::SeqCst));
    }

    #[test]
    fn test_chained_runs_after_panicked_previous() {
        let tasker = MonoTasker::new("test");
        let first = tasker.launch(|_| -> u32 {
            thread::sleep(Duration::from_millis(20));
            panic!("decoder crashed")
        });
        let second = tasker.launch_chained(|_| 2u32);

        assert_eq!(second.join(), TaskOutcome::Completed(2));
        assert_eq!(
            first.join(),
            TaskOutcome::Panicked("decoder crashed".to_string())
        );
        assert!(!tasker.is_running());
    }

    #[test]
    fn test_chained_runs_after_cancelled_previous() {
        let tasker = MonoTasker::new("test");
        let first = tasker.launch(|token| sleep_unless_cancelled(token, Duration::from_secs(5)));
        let second = tasker.launch_chained(|_| 3u32);

        // Cancelling the predecessor alone does not cancel the chain
        first.cancel();
        assert_eq!(second.join(), TaskOutcome::Completed(3));
        assert_eq!(first.join(), TaskOutcome::Completed(false));
    }

    #[test]
    fn test_panicking_work_is_contained() {
        let tasker = MonoTasker::new("test");
        let handle = tasker.launch(|_| -> u32 { panic!("boom") });
        assert_eq!(handle.join(), TaskOutcome::Panicked("boom".to_string()));
        assert!(!tasker.is_running());

        let next = tasker.launch(|_| 1u32);
        assert_eq!(next.join(), TaskOutcome::Completed(1));
    }

    #[test]
    fn test_cancel_and_join_waits_for_unwind() {
        let tasker = MonoTasker::new("test");
        let finished = Arc::new(AtomicUsize::new(0));
        let _handle = {
            let finished = finished.clone();
            tasker.launch(move |token| {
                sleep_unless_cancelled(token, Duration::from_secs(5));
                finished.fetch_add(1, Ordering::SeqCst);
            })
        };
        tasker.cancel_and_join();
        assert_eq!(finished.load(Ordering::SeqCst), 1);
        assert!(!tasker.is_running());
    }

    #[test]
    fn test_parent_cancellation_reaches_work() {
        let root = CancellationToken::new();
        let tasker = MonoTasker::with_parent("test", &root);
        let handle = tasker.launch(|token| sleep_unless_cancelled(token, Duration::from_secs(5)));
        root.cancel();
        assert_eq!(handle.join(), TaskOutcome::Completed(false));
    }

    #[test]
    fn test_running_stream() {
        let tasker = MonoTasker::new("test");
        let stream = tasker.running_stream();
        assert_eq!(stream.try_recv(), Some(false));
        tasker.launch(|_| ()).join();
        assert_eq!(
            stream.wait_for(Duration::from_secs(1), |running| !*running),
            Some(false)
        );
    }
}
