//! Periodic clock
//!
//! The `Ticker` is the single timeline every running animation subscribes
//! to. It does not own a timer: a host calls [`Ticker::pulse`] (wall clock)
//! or [`Ticker::advance`] (explicit step) on the home thread, and every
//! subscriber receives the elapsed milliseconds since the previous tick.
//!
//! [`ClockDriver`] is the default timer source. It runs on a background
//! thread and posts pulses to the home thread through a [`Dispatcher`], so
//! subscriber callbacks never run off the home thread.

use cadence_core::Dispatcher;
use parking_lot::Mutex;
use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

new_key_type! {
    /// Handle to a ticker subscription
    pub struct TickId;
}

/// Subscriber callback: receives elapsed ms, returns false to unsubscribe
pub type TickCallback = Box<dyn FnMut(u64) -> bool + Send>;

struct TickerInner {
    /// `None` while the callback is out being invoked
    subscribers: SlotMap<TickId, Option<TickCallback>>,
    last_pulse: Option<Instant>,
    enabled: bool,
}

impl TickerInner {
    fn disable_if_idle(&mut self) {
        if self.enabled && self.subscribers.is_empty() {
            self.enabled = false;
            self.last_pulse = None;
            tracing::debug!("Ticker: disabled (no subscribers)");
        }
    }
}

/// Subscription-based tick source
pub struct Ticker {
    inner: Mutex<TickerInner>,
}

impl Ticker {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(TickerInner {
                subscribers: SlotMap::with_key(),
                last_pulse: None,
                enabled: false,
            }),
        }
    }

    /// Subscribe a tick callback
    ///
    /// The first subscriber enables the ticker. Subscribers added while a
    /// tick is being delivered receive their first tick on the next one.
    pub fn insert<F>(&self, callback: F) -> TickId
    where
        F: FnMut(u64) -> bool + Send + 'static,
    {
        let mut inner = self.inner.lock();
        let id = inner.subscribers.insert(Some(Box::new(callback)));
        if !inner.enabled {
            inner.enabled = true;
            // Fresh baseline so the first pulse doesn't see the idle gap
            inner.last_pulse = Some(Instant::now());
            tracing::debug!("Ticker: enabled");
        }
        id
    }

    /// Unsubscribe; returns false if `id` was not subscribed
    ///
    /// Safe to call from inside a tick callback, including for the
    /// subscription currently being ticked.
    pub fn remove(&self, id: TickId) -> bool {
        let removed = {
            let mut inner = self.inner.lock();
            let removed = inner.subscribers.remove(id);
            inner.disable_if_idle();
            removed
        };
        removed.is_some()
    }

    pub fn contains(&self, id: TickId) -> bool {
        self.inner.lock().subscribers.contains_key(id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().subscribers.len()
    }

    /// True while at least one subscriber exists
    pub fn is_enabled(&self) -> bool {
        self.inner.lock().enabled
    }

    /// Deliver one tick of `step_ms` to every current subscriber
    ///
    /// Callbacks run without the ticker lock held so they may subscribe or
    /// unsubscribe freely. Returns the number of callbacks invoked.
    pub fn advance(&self, step_ms: u64) -> usize {
        let ids: SmallVec<[TickId; 8]> = self.inner.lock().subscribers.keys().collect();

        let mut delivered = 0;
        for id in ids {
            let callback = self
                .inner
                .lock()
                .subscribers
                .get_mut(id)
                .and_then(Option::take);
            let Some(mut callback) = callback else {
                continue;
            };

            let keep = callback(step_ms);
            delivered += 1;

            let finished = {
                let mut inner = self.inner.lock();
                match inner.subscribers.get_mut(id) {
                    Some(slot) if keep => {
                        *slot = Some(callback);
                        None
                    }
                    Some(_) => {
                        inner.subscribers.remove(id);
                        inner.disable_if_idle();
                        Some(callback)
                    }
                    // Removed during its own tick
                    None => Some(callback),
                }
            };
            drop(finished);
        }

        tracing::trace!("Ticker: advanced {}ms ({} callbacks)", step_ms, delivered);
        delivered
    }

    /// Advance by the wall time elapsed since the previous pulse
    ///
    /// Only whole milliseconds are consumed; the remainder carries over to
    /// the next pulse. Returns the number of callbacks invoked.
    pub fn pulse(&self) -> usize {
        let step_ms = {
            let mut inner = self.inner.lock();
            if !inner.enabled {
                return 0;
            }
            let now = Instant::now();
            let last = inner.last_pulse.get_or_insert(now);
            let step_ms = now.saturating_duration_since(*last).as_millis() as u64;
            if step_ms == 0 {
                return 0;
            }
            *last += Duration::from_millis(step_ms);
            step_ms
        };
        self.advance(step_ms)
    }
}

impl Default for Ticker {
    fn default() -> Self {
        Self::new()
    }
}

/// Background timer that pulses a [`Ticker`] on the home thread
///
/// While the ticker is enabled, the driver posts a pulse through the
/// dispatcher every `interval`. At most one pulse is queued at a time, so a
/// busy home thread is never flooded.
pub struct ClockDriver {
    stop_flag: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
}

impl ClockDriver {
    /// Spawn the timer thread
    pub fn start(ticker: Arc<Ticker>, dispatcher: Arc<dyn Dispatcher>, interval: Duration) -> Self {
        let stop_flag = Arc::new(AtomicBool::new(false));
        let pulse_pending = Arc::new(AtomicBool::new(false));

        let thread_stop = Arc::clone(&stop_flag);
        let thread_handle = thread::spawn(move || {
            tracing::debug!("ClockDriver: started ({:?} interval)", interval);

            while !thread_stop.load(Ordering::Relaxed) {
                let start = Instant::now();

                if ticker.is_enabled() && !pulse_pending.swap(true, Ordering::AcqRel) {
                    let ticker = Arc::clone(&ticker);
                    let pending = Arc::clone(&pulse_pending);
                    dispatcher.begin_invoke_on_main_thread(Box::new(move || {
                        pending.store(false, Ordering::Release);
                        ticker.pulse();
                    }));
                }

                let elapsed = start.elapsed();
                if elapsed < interval {
                    thread::sleep(interval - elapsed);
                }
            }

            tracing::debug!("ClockDriver: stopped");
        });

        Self {
            stop_flag,
            thread_handle: Some(thread_handle),
        }
    }

    /// Stop and join the timer thread
    pub fn stop(&mut self) {
        self.stop_flag.store(true, Ordering::Relaxed);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }

    pub fn is_running(&self) -> bool {
        self.thread_handle.is_some()
    }
}

impl Drop for ClockDriver {
    fn drop(&mut self) {
        self.stop();
    }
}
