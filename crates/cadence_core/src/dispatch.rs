//! Main-thread dispatch
//!
//! Every mutating scheduler entry point must run on the thread that owns
//! the animated targets. A `Dispatcher` answers whether the caller is on
//! that thread and, if not, queues work to run there later.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::{self, ThreadId};

/// Work posted to the home thread
pub type Action = Box<dyn FnOnce() + Send>;

/// Callback for waking the home thread's event loop after a post
pub type WakeCallback = Arc<dyn Fn() + Send + Sync>;

/// Thread-affinity capability consumed by the scheduler
pub trait Dispatcher: Send + Sync {
    /// True when the calling thread is not the home thread
    fn is_invoke_required(&self) -> bool;

    /// Run `action` on the home thread at its next opportunity
    fn begin_invoke_on_main_thread(&self, action: Action);

    /// False when posted actions run inline on the posting thread
    fn has_home_thread(&self) -> bool {
        true
    }
}

/// Runs everything inline on the calling thread
///
/// Suitable for single-threaded hosts and tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct ImmediateDispatcher;

impl Dispatcher for ImmediateDispatcher {
    fn is_invoke_required(&self) -> bool {
        false
    }

    fn begin_invoke_on_main_thread(&self, action: Action) {
        action();
    }

    fn has_home_thread(&self) -> bool {
        false
    }
}

/// Queue-backed dispatcher bound to the thread that created it
///
/// Other threads post actions; the home thread drains them with
/// [`MainThreadDispatcher::run_pending`], typically once per event loop
/// iteration.
pub struct MainThreadDispatcher {
    home: ThreadId,
    queue: Mutex<VecDeque<Action>>,
    wake_callback: Option<WakeCallback>,
}

impl MainThreadDispatcher {
    /// Create a dispatcher whose home is the calling thread
    pub fn new() -> Self {
        Self {
            home: thread::current().id(),
            queue: Mutex::new(VecDeque::new()),
            wake_callback: None,
        }
    }

    /// Set a callback invoked after every post
    ///
    /// Use this to wake an event loop that is blocked waiting for input.
    pub fn with_wake_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.wake_callback = Some(Arc::new(callback));
        self
    }

    /// The thread that owns this dispatcher
    pub fn home_thread(&self) -> ThreadId {
        self.home
    }

    /// Number of queued actions
    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    /// Run queued actions in FIFO order
    ///
    /// Must be called on the home thread; elsewhere it does nothing.
    /// Actions posted while draining are run in the same call.
    /// Returns the number of actions run.
    pub fn run_pending(&self) -> usize {
        if thread::current().id() != self.home {
            tracing::warn!("MainThreadDispatcher::run_pending called off the home thread");
            return 0;
        }

        let mut count = 0;
        loop {
            // Pop under the lock, run without it
            let next = self.queue.lock().pop_front();
            let Some(action) = next else {
                break;
            };
            action();
            count += 1;
        }
        count
    }
}

impl Default for MainThreadDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher for MainThreadDispatcher {
    fn is_invoke_required(&self) -> bool {
        thread::current().id() != self.home
    }

    fn begin_invoke_on_main_thread(&self, action: Action) {
        let depth = {
            let mut queue = self.queue.lock();
            queue.push_back(action);
            queue.len()
        };
        tracing::trace!("MainThreadDispatcher: queued action (pending={})", depth);

        if let Some(ref wake) = self.wake_callback {
            wake();
        }
    }
}
