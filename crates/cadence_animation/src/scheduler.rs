//! Animation scheduler
//!
//! Owns the registry of running animations, keyed by `(owner, name)`, and
//! the shared [`Ticker`] that drives them. At most one tween and one fling
//! exist per key: starting a new one aborts the previous run first.
//!
//! Owners are held weakly. A tween whose owner has been dropped keeps
//! ticking silently until it finishes or is aborted, but never invokes a
//! user callback.
//!
//! All registry mutation happens on the dispatcher's home thread. Calls made
//! from other threads are marshaled through
//! [`Dispatcher::begin_invoke_on_main_thread`]. No lock is held while user
//! callbacks run, so callbacks may start, abort or query animations.

use crate::animation::Animation;
use crate::config::AnimationConfig;
use crate::easing::Easing;
use crate::interpolate::Interpolator;
use crate::kinetic::{KineticCallback, KineticOptions};
use crate::ticker::{ClockDriver, TickCallback, TickId, Ticker};
use crate::tween::{TweenDriver, TweenState};
use cadence_core::{
    Animatable, AnimationError, AnimationKey, Dispatcher, ImmediateDispatcher, Result,
};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::sync::{Arc, OnceLock, Weak};

// ============================================================================
// Global scheduler
// ============================================================================

static GLOBAL_SCHEDULER: OnceLock<AnimationScheduler> = OnceLock::new();

/// Install the process-wide scheduler
///
/// Fails with [`AnimationError::SchedulerAlreadySet`] on every call after
/// the first.
pub fn set_global_scheduler(scheduler: AnimationScheduler) -> Result<()> {
    GLOBAL_SCHEDULER
        .set(scheduler)
        .map_err(|_| AnimationError::SchedulerAlreadySet)?;
    tracing::debug!("AnimationScheduler: global scheduler installed");
    Ok(())
}

/// The process-wide scheduler, if one was installed
pub fn try_get_scheduler() -> Option<AnimationScheduler> {
    GLOBAL_SCHEDULER.get().cloned()
}

/// True once [`set_global_scheduler`] has succeeded
pub fn is_scheduler_initialized() -> bool {
    GLOBAL_SCHEDULER.get().is_some()
}

// ============================================================================
// Options
// ============================================================================

/// Completion callback: `(owner, final value, completed)`
pub type FinishedCallback<T, V> = Arc<dyn Fn(&T, V, bool) + Send + Sync>;

/// Repeat predicate, consulted each time a run reaches its end
pub type RepeatPredicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// Per-run options for a tween
///
/// Unset rate and length fall back to the scheduler's [`AnimationConfig`].
pub struct AnimationOptions<T, V = f64> {
    rate_ms: Option<u32>,
    length_ms: Option<u32>,
    easing: Easing,
    finished: Option<FinishedCallback<T, V>>,
    repeat: Option<RepeatPredicate<T>>,
}

impl<T, V> Default for AnimationOptions<T, V> {
    fn default() -> Self {
        Self {
            rate_ms: None,
            length_ms: None,
            easing: Easing::Linear,
            finished: None,
            repeat: None,
        }
    }
}

impl<T, V> AnimationOptions<T, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rate(mut self, ms: u32) -> Self {
        self.rate_ms = Some(ms);
        self
    }

    pub fn length(mut self, ms: u32) -> Self {
        self.length_ms = Some(ms);
        self
    }

    pub fn easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    /// Called with `true` each time the run reaches its end (repeating or
    /// not) and once with `false` if it is aborted
    pub fn on_finished<F>(mut self, callback: F) -> Self
    where
        F: Fn(&T, V, bool) + Send + Sync + 'static,
    {
        self.finished = Some(Arc::new(callback));
        self
    }

    /// Restart from zero whenever the predicate returns true at the end
    pub fn repeat<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.repeat = Some(Arc::new(predicate));
        self
    }
}

// ============================================================================
// Registry
// ============================================================================

// Callbacks bound to their owner at start time. Each upgrades the owner
// itself and does nothing once it is gone.
type BoundStep = Arc<dyn Fn(f64) + Send + Sync>;
type BoundFinished = Arc<dyn Fn(f64, bool) + Send + Sync>;
type BoundRepeat = Arc<dyn Fn() -> bool + Send + Sync>;

/// A tween bound to its owner, ready to be registered
struct BoundRun {
    owner: Weak<dyn Animatable>,
    step: BoundStep,
    finished: Option<BoundFinished>,
    repeat: Option<BoundRepeat>,
    easing: Easing,
    rate_ms: u32,
    length_ms: u32,
}

impl BoundRun {
    fn bind<T, V, X, F>(
        owner: &Arc<T>,
        transform: X,
        callback: F,
        options: AnimationOptions<T, V>,
        config: &AnimationConfig,
    ) -> Self
    where
        T: Animatable,
        V: 'static,
        X: Fn(&T, f64) -> V + Send + Sync + 'static,
        F: Fn(&T, V) + Send + Sync + 'static,
    {
        let weak = Arc::downgrade(owner);
        let transform = Arc::new(transform);

        let step: BoundStep = {
            let weak = weak.clone();
            let transform = Arc::clone(&transform);
            Arc::new(move |progress| {
                if let Some(target) = weak.upgrade() {
                    callback(&*target, transform(&*target, progress));
                }
            })
        };

        let finished = options.finished.map(|finished| {
            let weak = weak.clone();
            let transform = Arc::clone(&transform);
            Arc::new(move |progress, completed| {
                if let Some(target) = weak.upgrade() {
                    finished(&*target, transform(&*target, progress), completed);
                }
            }) as BoundFinished
        });

        let repeat = options.repeat.map(|repeat| {
            let weak = weak.clone();
            Arc::new(move || weak.upgrade().is_some_and(|target| repeat(&*target)))
                as BoundRepeat
        });

        let owner: Weak<dyn Animatable> = weak;
        Self {
            owner,
            step,
            finished,
            repeat,
            easing: options.easing,
            rate_ms: options.rate_ms.unwrap_or(config.rate_ms),
            length_ms: options.length_ms.unwrap_or(config.length_ms),
        }
    }
}

struct RunRecord {
    run_id: u64,
    driver: TweenDriver,
    owner: Weak<dyn Animatable>,
    step: BoundStep,
    finished: Option<BoundFinished>,
    repeat: Option<BoundRepeat>,
    easing: Easing,
    rate_ms: u32,
}

impl RunRecord {
    fn dispatch(&self) -> RunDispatch {
        RunDispatch {
            owner: self.owner.clone(),
            step: Arc::clone(&self.step),
            finished: self.finished.clone(),
            repeat: self.repeat.clone(),
            easing: self.easing,
        }
    }
}

/// Callbacks copied out of a record so they can run unlocked
struct RunDispatch {
    owner: Weak<dyn Animatable>,
    step: BoundStep,
    finished: Option<BoundFinished>,
    repeat: Option<BoundRepeat>,
    easing: Easing,
}

struct KineticRecord {
    run_id: u64,
    // Pins the owner's address so the key cannot be reused while registered
    _owner: Weak<dyn Animatable>,
    subscription: TickId,
}

#[derive(Default)]
struct Registry {
    runs: FxHashMap<AnimationKey, RunRecord>,
    kinetics: FxHashMap<AnimationKey, KineticRecord>,
    next_run_id: u64,
}

impl Registry {
    fn next_id(&mut self) -> u64 {
        self.next_run_id += 1;
        self.next_run_id
    }

    fn take_run(&mut self, key: &AnimationKey, run_id: u64) -> Option<RunRecord> {
        if self.runs.get(key).is_some_and(|r| r.run_id == run_id) {
            self.runs.remove(key)
        } else {
            None
        }
    }

    fn is_current(&self, key: &AnimationKey, run_id: u64) -> bool {
        self.runs.get(key).is_some_and(|r| r.run_id == run_id)
    }
}

/// Snapshot of a registered tween
#[derive(Clone, Debug, PartialEq)]
pub struct RunInfo {
    pub rate_ms: u32,
    pub length_ms: u32,
    /// Linear progress of the driver in `[0, 1]`
    pub progress: f64,
    pub state: TweenState,
}

// ============================================================================
// Scheduler
// ============================================================================

struct SchedulerShared {
    registry: Mutex<Registry>,
    ticker: Arc<Ticker>,
    dispatcher: Arc<dyn Dispatcher>,
    config: AnimationConfig,
}

/// Cloneable handle to a scheduler
///
/// Clones share the registry, ticker and dispatcher.
#[derive(Clone)]
pub struct AnimationScheduler {
    shared: Arc<SchedulerShared>,
}

impl Default for AnimationScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl AnimationScheduler {
    /// Scheduler that runs everything on the calling thread
    pub fn new() -> Self {
        Self::with_dispatcher(Arc::new(ImmediateDispatcher))
    }

    pub fn with_dispatcher(dispatcher: Arc<dyn Dispatcher>) -> Self {
        Self::from_parts(
            Arc::new(Ticker::new()),
            dispatcher,
            AnimationConfig::default(),
        )
    }

    /// Scheduler on the calling thread with custom defaults
    pub fn with_config(config: AnimationConfig) -> Self {
        Self::from_parts(Arc::new(Ticker::new()), Arc::new(ImmediateDispatcher), config)
    }

    pub fn from_parts(
        ticker: Arc<Ticker>,
        dispatcher: Arc<dyn Dispatcher>,
        config: AnimationConfig,
    ) -> Self {
        Self {
            shared: Arc::new(SchedulerShared {
                registry: Mutex::new(Registry::default()),
                ticker,
                dispatcher,
                config,
            }),
        }
    }

    pub fn ticker(&self) -> &Arc<Ticker> {
        &self.shared.ticker
    }

    pub fn dispatcher(&self) -> &Arc<dyn Dispatcher> {
        &self.shared.dispatcher
    }

    pub fn config(&self) -> &AnimationConfig {
        &self.shared.config
    }

    /// Spawn a wall-clock driver that pulses this scheduler's ticker
    ///
    /// Pulses are posted through the dispatcher at the configured interval.
    /// Fails when the dispatcher runs posts inline, since every tick would
    /// then run on the clock thread.
    pub fn start_clock(&self) -> Result<ClockDriver> {
        if !self.shared.dispatcher.has_home_thread() {
            tracing::warn!("AnimationScheduler: clock needs a dispatcher with a home thread");
            return Err(AnimationError::InvalidArgument(
                "clock driver requires a marshaling dispatcher".into(),
            ));
        }

        Ok(ClockDriver::start(
            Arc::clone(&self.shared.ticker),
            Arc::clone(&self.shared.dispatcher),
            self.shared.config.clock_interval(),
        ))
    }

    // ------------------------------------------------------------------------
    // Tweens
    // ------------------------------------------------------------------------

    /// Run an animation tree on `owner` under `name`
    pub fn commit<T: Animatable>(
        &self,
        owner: &Arc<T>,
        name: &str,
        animation: Animation<T>,
        options: AnimationOptions<T>,
    ) {
        let callback = animation.root_callback();
        self.animate(
            owner,
            name,
            move |target, progress| callback(target, progress),
            options,
        );
    }

    /// Run a tween that reports eased progress in `[0, 1]`
    pub fn animate<T, F>(
        &self,
        owner: &Arc<T>,
        name: &str,
        callback: F,
        options: AnimationOptions<T>,
    ) where
        T: Animatable,
        F: Fn(&T, f64) + Send + Sync + 'static,
    {
        self.animate_with(owner, name, |_, progress| progress, callback, options);
    }

    /// Run a tween that reports values interpolated from `start` to `end`
    pub fn animate_range<T, F>(
        &self,
        owner: &Arc<T>,
        name: &str,
        callback: F,
        start: f64,
        end: f64,
        options: AnimationOptions<T>,
    ) where
        T: Animatable,
        F: Fn(&T, f64) + Send + Sync + 'static,
    {
        let range = Interpolator::new(start, end);
        self.animate_with(owner, name, move |_, progress| range.at(progress), callback, options);
    }

    /// Run a tween over any value type
    ///
    /// `transform` maps eased progress to a `V` which is handed to
    /// `callback` and to the completion callback.
    pub fn animate_with<T, V, X, F>(
        &self,
        owner: &Arc<T>,
        name: &str,
        transform: X,
        callback: F,
        options: AnimationOptions<T, V>,
    ) where
        T: Animatable,
        V: 'static,
        X: Fn(&T, f64) -> V + Send + Sync + 'static,
        F: Fn(&T, V) + Send + Sync + 'static,
    {
        let key = AnimationKey::for_arc(owner, name);
        let owner = Arc::clone(owner);
        let shared = Arc::clone(&self.shared);

        self.run_on_home_thread(move || {
            let run = BoundRun::bind(&owner, transform, callback, options, &shared.config);
            shared.start_run(key, run);
        });
    }

    /// Abort the tween and fling registered under `(owner, name)`
    ///
    /// Returns whether anything was registered. The aborted tween's
    /// completion callback fires with `completed = false`.
    pub fn abort<T: ?Sized>(&self, owner: &Arc<T>, name: &str) -> bool {
        self.abort_key(AnimationKey::for_arc(owner, name))
    }

    /// [`abort`](Self::abort) by key, usable after the owner is gone
    pub fn abort_key(&self, key: AnimationKey) -> bool {
        if !self.shared.contains(&key) {
            return false;
        }

        let shared = Arc::clone(&self.shared);
        self.run_on_home_thread(move || {
            shared.abort_run(&key);
            shared.abort_kinetic(&key);
        });
        true
    }

    pub fn is_running<T: ?Sized>(&self, owner: &Arc<T>, name: &str) -> bool {
        self.is_key_running(&AnimationKey::for_arc(owner, name))
    }

    pub fn is_key_running(&self, key: &AnimationKey) -> bool {
        self.shared.registry.lock().runs.contains_key(key)
    }

    pub fn run_info<T: ?Sized>(&self, owner: &Arc<T>, name: &str) -> Option<RunInfo> {
        let key = AnimationKey::for_arc(owner, name);
        let registry = self.shared.registry.lock();
        registry.runs.get(&key).map(|record| RunInfo {
            rate_ms: record.rate_ms,
            length_ms: record.driver.length_ms(),
            progress: record.driver.value(),
            state: record.driver.state(),
        })
    }

    /// Number of registered tweens
    pub fn run_count(&self) -> usize {
        self.shared.registry.lock().runs.len()
    }

    // ------------------------------------------------------------------------
    // Kinetic
    // ------------------------------------------------------------------------

    /// Start a decelerating fling on `owner` under `name`
    ///
    /// `callback` receives `(delta, speed)` each tick and returns false to
    /// stop early. Invalid velocity or drag is rejected before anything is
    /// scheduled.
    pub fn animate_kinetic<T, F>(
        &self,
        owner: &Arc<T>,
        name: &str,
        callback: F,
        options: KineticOptions,
    ) -> Result<()>
    where
        T: Animatable,
        F: FnMut(f64, f64) -> bool + Send + 'static,
    {
        options.validate()?;

        let key = AnimationKey::for_arc(owner, name);
        let weak: Weak<dyn Animatable> = Arc::downgrade(owner) as Weak<T>;
        let shared = Arc::clone(&self.shared);
        self.run_on_home_thread(move || {
            shared.start_kinetic(key, weak, Box::new(callback), options);
        });
        Ok(())
    }

    /// Stop the fling under `(owner, name)` without firing its callback
    pub fn abort_kinetic<T: ?Sized>(&self, owner: &Arc<T>, name: &str) -> bool {
        let key = AnimationKey::for_arc(owner, name);
        if !self.shared.registry.lock().kinetics.contains_key(&key) {
            return false;
        }

        let shared = Arc::clone(&self.shared);
        self.run_on_home_thread(move || {
            shared.abort_kinetic(&key);
        });
        true
    }

    pub fn is_kinetic_running<T: ?Sized>(&self, owner: &Arc<T>, name: &str) -> bool {
        let key = AnimationKey::for_arc(owner, name);
        self.shared.registry.lock().kinetics.contains_key(&key)
    }

    /// Number of registered flings
    pub fn kinetic_count(&self) -> usize {
        self.shared.registry.lock().kinetics.len()
    }

    /// True while any tween or fling is registered
    pub fn has_active_animations(&self) -> bool {
        let registry = self.shared.registry.lock();
        !registry.runs.is_empty() || !registry.kinetics.is_empty()
    }

    fn run_on_home_thread<F>(&self, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.shared.dispatcher.is_invoke_required() {
            tracing::trace!("AnimationScheduler: marshaling to home thread");
            self.shared
                .dispatcher
                .begin_invoke_on_main_thread(Box::new(action));
        } else {
            action();
        }
    }
}

impl SchedulerShared {
    fn contains(&self, key: &AnimationKey) -> bool {
        let registry = self.registry.lock();
        registry.runs.contains_key(key) || registry.kinetics.contains_key(key)
    }

    fn start_run(self: &Arc<Self>, key: AnimationKey, run: BoundRun) {
        self.abort_run(&key);

        let step = Arc::clone(&run.step);
        let (run_id, displaced) = {
            let mut registry = self.registry.lock();
            let run_id = registry.next_id();
            let record = RunRecord {
                run_id,
                driver: TweenDriver::new(key.clone(), run.length_ms),
                owner: run.owner,
                step: run.step,
                finished: run.finished,
                repeat: run.repeat,
                easing: run.easing,
                rate_ms: run.rate_ms,
            };
            (run_id, registry.runs.insert(key.clone(), record))
        };
        // The aborted run's completion callback may have started its own
        if let Some(record) = displaced {
            self.cancel_run(&key, record);
        }

        tracing::debug!(
            "AnimationScheduler: started {} (run {}, {}ms)",
            key,
            run_id,
            run.length_ms
        );

        step(0.0);

        let mut registry = self.registry.lock();
        if let Some(record) = registry.runs.get_mut(&key).filter(|r| r.run_id == run_id) {
            let handle = record.driver.handle().clone();
            record
                .driver
                .start(&self.ticker, || self.tick_callback(handle, run_id));
        }
    }

    fn tick_callback(self: &Arc<Self>, key: AnimationKey, run_id: u64) -> TickCallback {
        let weak = Arc::downgrade(self);
        Box::new(move |step_ms| match weak.upgrade() {
            Some(shared) => shared.on_tick(&key, run_id, step_ms),
            None => false,
        })
    }

    fn on_tick(self: &Arc<Self>, key: &AnimationKey, run_id: u64, step_ms: u64) -> bool {
        let (tick, dispatch) = {
            let mut registry = self.registry.lock();
            let Some(record) = registry.runs.get_mut(key).filter(|r| r.run_id == run_id) else {
                return false;
            };
            let Some(tick) = record.driver.advance(step_ms) else {
                record.driver.detach();
                return false;
            };
            (tick, record.dispatch())
        };

        match dispatch.owner.upgrade() {
            Some(owner) => {
                tracing::trace!("AnimationScheduler: tick {} at {:.3}", key, tick.value);
                owner.batch_begin();
                (dispatch.step)(dispatch.easing.apply(tick.value));
                owner.batch_commit();
            }
            None => tracing::trace!("AnimationScheduler: owner of {} is gone, tick dropped", key),
        }

        if !tick.finished {
            return true;
        }
        self.on_run_finished(key, run_id, &dispatch, tick.value)
    }

    fn on_run_finished(
        self: &Arc<Self>,
        key: &AnimationKey,
        run_id: u64,
        dispatch: &RunDispatch,
        value: f64,
    ) -> bool {
        // Aborted from inside this tick's step
        if !self.registry.lock().is_current(key, run_id) {
            return false;
        }

        let owner = dispatch.owner.upgrade();
        let repeat = owner.is_some() && dispatch.repeat.as_ref().is_some_and(|repeat| repeat());

        if let Some(owner) = &owner {
            owner.batch_begin();
            (dispatch.step)(value);
        }

        // The final step may abort the run, which already reported it
        let current = if repeat {
            self.registry.lock().is_current(key, run_id)
        } else {
            let evicted = self.registry.lock().take_run(key, run_id);
            match evicted {
                Some(mut record) => {
                    record.driver.detach();
                    tracing::debug!("AnimationScheduler: finished {} (run {})", key, run_id);
                    true
                }
                None => false,
            }
        };

        if let Some(owner) = &owner {
            if let (true, Some(finished)) = (current, &dispatch.finished) {
                finished(value, true);
            }
            owner.batch_commit();
        }

        if !(repeat && current) {
            return false;
        }

        let mut registry = self.registry.lock();
        match registry.runs.get_mut(key).filter(|r| r.run_id == run_id) {
            Some(record) => {
                tracing::trace!("AnimationScheduler: repeating {}", key);
                let handle = record.driver.handle().clone();
                record
                    .driver
                    .start(&self.ticker, || self.tick_callback(handle, run_id));
                true
            }
            None => false,
        }
    }

    fn abort_run(&self, key: &AnimationKey) -> bool {
        let record = self.registry.lock().runs.remove(key);
        match record {
            Some(record) => {
                self.cancel_run(key, record);
                true
            }
            None => false,
        }
    }

    fn cancel_run(&self, key: &AnimationKey, mut record: RunRecord) {
        record.driver.stop(&self.ticker);
        tracing::debug!("AnimationScheduler: aborted {} (run {})", key, record.run_id);

        if let (Some(_owner), Some(finished)) = (record.owner.upgrade(), &record.finished) {
            finished(1.0, false);
        }
    }

    fn start_kinetic(
        self: &Arc<Self>,
        key: AnimationKey,
        owner: Weak<dyn Animatable>,
        mut callback: KineticCallback,
        options: KineticOptions,
    ) {
        self.abort_kinetic(&key);

        let run_id = self.registry.lock().next_id();
        let (mut decay, mut finished) = options.into_parts();
        let weak = Arc::downgrade(self);
        let tick_key = key.clone();

        let subscription = self.ticker.insert(move |step_ms| {
            let keep = match decay.step(step_ms) {
                Some((delta, speed)) => callback(delta, speed),
                None => false,
            };
            if !keep {
                if let Some(shared) = weak.upgrade() {
                    shared.evict_kinetic(&tick_key, run_id);
                }
                if let Some(finished) = finished.take() {
                    finished();
                }
            }
            keep
        });

        let displaced = self.registry.lock().kinetics.insert(
            key.clone(),
            KineticRecord {
                run_id,
                _owner: owner,
                subscription,
            },
        );
        if let Some(previous) = displaced {
            self.ticker.remove(previous.subscription);
        }

        tracing::debug!("AnimationScheduler: kinetic started {} (run {})", key, run_id);
    }

    fn evict_kinetic(&self, key: &AnimationKey, run_id: u64) {
        let mut registry = self.registry.lock();
        if registry.kinetics.get(key).is_some_and(|r| r.run_id == run_id) {
            registry.kinetics.remove(key);
            tracing::debug!("AnimationScheduler: kinetic finished {}", key);
        }
    }

    fn abort_kinetic(&self, key: &AnimationKey) -> bool {
        let record = self.registry.lock().kinetics.remove(key);
        match record {
            Some(record) => {
                self.ticker.remove(record.subscription);
                tracing::debug!("AnimationScheduler: kinetic aborted {}", key);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct View {
        values: Mutex<Vec<f64>>,
        batches: AtomicUsize,
        commits: AtomicUsize,
    }

    impl Animatable for View {
        fn batch_begin(&self) {
            self.batches.fetch_add(1, Ordering::SeqCst);
        }

        fn batch_commit(&self) {
            self.commits.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn record(view: &View, value: f64) {
        view.values.lock().push(value);
    }

    type Finishes = Arc<Mutex<Vec<(f64, bool)>>>;

    fn finish_log() -> (Finishes, impl Fn(&View, f64, bool) + Send + Sync + 'static) {
        let log: Finishes = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        (log, move |_: &View, value: f64, completed: bool| {
            sink.lock().push((value, completed))
        })
    }

    #[test]
    fn test_commit_steps_to_zero_immediately() {
        let scheduler = AnimationScheduler::new();
        let view = Arc::new(View::default());

        scheduler.animate(&view, "fade", record, AnimationOptions::new().length(100));

        assert_eq!(*view.values.lock(), vec![0.0]);
        assert!(scheduler.is_running(&view, "fade"));
        assert_eq!(scheduler.ticker().subscriber_count(), 1);
        // No batch around the initial step
        assert_eq!(view.batches.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_run_to_completion() {
        let scheduler = AnimationScheduler::new();
        let view = Arc::new(View::default());
        let (finishes, on_finished) = finish_log();

        scheduler.animate(
            &view,
            "fade",
            record,
            AnimationOptions::new().length(100).on_finished(on_finished),
        );

        for _ in 0..4 {
            scheduler.ticker().advance(25);
        }

        // Last tick steps once through the tick path and once at finish
        assert_eq!(*view.values.lock(), vec![0.0, 0.25, 0.5, 0.75, 1.0, 1.0]);
        assert_eq!(*finishes.lock(), vec![(1.0, true)]);
        assert!(!scheduler.is_running(&view, "fade"));
        assert_eq!(scheduler.ticker().subscriber_count(), 0);
        assert!(!scheduler.ticker().is_enabled());
    }

    #[test]
    fn test_defaults_from_config() {
        let config = AnimationConfig {
            rate_ms: 10,
            length_ms: 40,
            ..AnimationConfig::default()
        };
        let scheduler = AnimationScheduler::from_parts(
            Arc::new(Ticker::new()),
            Arc::new(ImmediateDispatcher),
            config,
        );
        let view = Arc::new(View::default());

        scheduler.animate(&view, "fade", record, AnimationOptions::new());
        let info = scheduler.run_info(&view, "fade").unwrap();
        assert_eq!(info.rate_ms, 10);
        assert_eq!(info.length_ms, 40);
        assert_eq!(info.state, TweenState::Running);

        scheduler.ticker().advance(20);
        assert_eq!(scheduler.run_info(&view, "fade").unwrap().progress, 0.5);
    }

    #[test]
    fn test_easing_applies_to_ticks_not_final_step() {
        let scheduler = AnimationScheduler::new();
        let view = Arc::new(View::default());

        scheduler.animate(
            &view,
            "grow",
            record,
            AnimationOptions::new().length(100).easing(Easing::EaseInQuad),
        );
        scheduler.ticker().advance(50);
        scheduler.ticker().advance(50);

        assert_eq!(*view.values.lock(), vec![0.0, 0.25, 1.0, 1.0]);
    }

    #[test]
    fn test_zero_length_finishes_on_first_tick() {
        let scheduler = AnimationScheduler::new();
        let view = Arc::new(View::default());
        let (finishes, on_finished) = finish_log();

        scheduler.animate(
            &view,
            "snap",
            record,
            AnimationOptions::new().length(0).on_finished(on_finished),
        );
        scheduler.ticker().advance(1);

        assert_eq!(*finishes.lock(), vec![(1.0, true)]);
        assert!(!scheduler.is_running(&view, "snap"));
    }

    #[test]
    fn test_restart_aborts_previous_run() {
        let scheduler = AnimationScheduler::new();
        let view = Arc::new(View::default());
        let (finishes, on_finished) = finish_log();

        scheduler.animate(
            &view,
            "fade",
            record,
            AnimationOptions::new().length(100).on_finished(on_finished),
        );
        scheduler.ticker().advance(50);
        scheduler.animate(&view, "fade", record, AnimationOptions::new().length(100));

        assert_eq!(*finishes.lock(), vec![(1.0, false)]);
        assert_eq!(scheduler.run_count(), 1);
        assert_eq!(scheduler.ticker().subscriber_count(), 1);
        assert_eq!(*view.values.lock(), vec![0.0, 0.5, 0.0]);
    }

    #[test]
    fn test_names_are_independent() {
        let scheduler = AnimationScheduler::new();
        let view = Arc::new(View::default());
        let other = Arc::new(View::default());

        scheduler.animate(&view, "x", record, AnimationOptions::new());
        scheduler.animate(&view, "y", record, AnimationOptions::new());
        scheduler.animate(&other, "x", record, AnimationOptions::new());

        assert_eq!(scheduler.run_count(), 3);
        assert!(scheduler.abort(&view, "x"));
        assert!(scheduler.is_running(&view, "y"));
        assert!(scheduler.is_running(&other, "x"));
    }

    #[test]
    fn test_abort_is_idempotent() {
        let scheduler = AnimationScheduler::new();
        let view = Arc::new(View::default());
        let (finishes, on_finished) = finish_log();

        assert!(!scheduler.abort(&view, "fade"));

        scheduler.animate(
            &view,
            "fade",
            record,
            AnimationOptions::new().on_finished(on_finished),
        );
        assert!(scheduler.abort(&view, "fade"));
        assert!(!scheduler.abort(&view, "fade"));

        assert_eq!(*finishes.lock(), vec![(1.0, false)]);
        assert_eq!(scheduler.ticker().subscriber_count(), 0);
    }

    #[test]
    fn test_batch_wraps_each_tick() {
        let scheduler = AnimationScheduler::new();
        let view = Arc::new(View::default());

        scheduler.animate(&view, "fade", record, AnimationOptions::new().length(100));
        scheduler.ticker().advance(30);
        scheduler.ticker().advance(30);
        assert_eq!(view.batches.load(Ordering::SeqCst), 2);
        assert_eq!(view.commits.load(Ordering::SeqCst), 2);

        // Final tick: one batch for the eased step, one around finish
        scheduler.ticker().advance(40);
        assert_eq!(view.batches.load(Ordering::SeqCst), 4);
        assert_eq!(view.commits.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_dead_owner_is_silent() {
        let scheduler = AnimationScheduler::new();
        let view = Arc::new(View::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        scheduler.animate(
            &view,
            "fade",
            move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
            },
            AnimationOptions::new().length(100),
        );
        let key = AnimationKey::for_arc(&view, "fade");
        drop(view);

        scheduler.ticker().advance(50);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(scheduler.is_key_running(&key));

        assert!(scheduler.abort_key(key.clone()));
        assert!(!scheduler.is_key_running(&key));
    }

    #[test]
    fn test_dead_owner_never_repeats() {
        let scheduler = AnimationScheduler::new();
        let view = Arc::new(View::default());

        scheduler.animate(
            &view,
            "spin",
            record,
            AnimationOptions::new().length(10).repeat(|_| true),
        );
        drop(view);

        scheduler.ticker().advance(10);
        assert_eq!(scheduler.run_count(), 0);
        assert_eq!(scheduler.ticker().subscriber_count(), 0);
    }

    #[test]
    fn test_repeat_until_predicate_fails() {
        let scheduler = AnimationScheduler::new();
        let view = Arc::new(View::default());
        let (finishes, on_finished) = finish_log();
        let remaining = Arc::new(AtomicUsize::new(2));
        let counter = Arc::clone(&remaining);

        scheduler.animate(
            &view,
            "pulse",
            record,
            AnimationOptions::new()
                .length(20)
                .on_finished(on_finished)
                .repeat(move |_| {
                    counter
                        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                        .is_ok()
                }),
        );

        for _ in 0..3 {
            scheduler.ticker().advance(10);
            assert!(scheduler.is_running(&view, "pulse"));
            scheduler.ticker().advance(10);
        }

        assert_eq!(
            *finishes.lock(),
            vec![(1.0, true), (1.0, true), (1.0, true)]
        );
        assert!(!scheduler.is_running(&view, "pulse"));
        // Each cycle restarts at zero
        let values = view.values.lock();
        assert_eq!(values.iter().filter(|&&v| v == 0.5).count(), 3);
    }

    #[test]
    fn test_finished_can_start_follow_up() {
        let scheduler = AnimationScheduler::new();
        let view = Arc::new(View::default());
        let handle = scheduler.clone();
        let target = Arc::downgrade(&view);

        scheduler.animate(
            &view,
            "move",
            record,
            AnimationOptions::new()
                .length(10)
                .on_finished(move |_: &View, _, completed| {
                    if let (true, Some(view)) = (completed, target.upgrade()) {
                        handle.animate_range(
                            &view,
                            "move",
                            record,
                            10.0,
                            20.0,
                            AnimationOptions::new().length(10),
                        );
                    }
                }),
        );

        scheduler.ticker().advance(10);
        assert!(scheduler.is_running(&view, "move"));
        assert_eq!(scheduler.ticker().subscriber_count(), 1);

        scheduler.ticker().advance(10);
        assert_eq!(view.values.lock().last(), Some(&20.0));
        assert!(!scheduler.is_running(&view, "move"));
    }

    #[test]
    fn test_step_can_abort_own_run() {
        let scheduler = AnimationScheduler::new();
        let view = Arc::new(View::default());
        let (finishes, on_finished) = finish_log();
        let handle = scheduler.clone();
        let target = Arc::downgrade(&view);

        scheduler.animate(
            &view,
            "fade",
            move |view: &View, progress| {
                record(view, progress);
                if progress >= 0.5 {
                    if let Some(view) = target.upgrade() {
                        handle.abort(&view, "fade");
                    }
                }
            },
            AnimationOptions::new().length(100).on_finished(on_finished),
        );

        scheduler.ticker().advance(50);
        scheduler.ticker().advance(50);

        assert_eq!(*finishes.lock(), vec![(1.0, false)]);
        assert_eq!(*view.values.lock(), vec![0.0, 0.5]);
    }

    #[test]
    fn test_abort_on_last_tick_skips_completion() {
        let scheduler = AnimationScheduler::new();
        let view = Arc::new(View::default());
        let (finishes, on_finished) = finish_log();
        let handle = scheduler.clone();
        let target = Arc::downgrade(&view);

        scheduler.animate(
            &view,
            "fade",
            move |view: &View, progress| {
                record(view, progress);
                if progress >= 1.0 {
                    if let Some(view) = target.upgrade() {
                        handle.abort(&view, "fade");
                    }
                }
            },
            AnimationOptions::new().length(50).on_finished(on_finished),
        );
        scheduler.ticker().advance(50);

        assert_eq!(*finishes.lock(), vec![(1.0, false)]);
        assert_eq!(*view.values.lock(), vec![0.0, 1.0]);
        assert_eq!(scheduler.ticker().subscriber_count(), 0);
    }

    #[test]
    fn test_animate_with_typed_values() {
        let scheduler = AnimationScheduler::new();
        let view = Arc::new(View::default());
        let labels = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&labels);
        let done = Arc::new(Mutex::new(None));
        let done_sink = Arc::clone(&done);

        scheduler.animate_with(
            &view,
            "label",
            |_, progress| format!("{:.0}%", progress * 100.0),
            move |_, label: String| sink.lock().push(label),
            AnimationOptions::new()
                .length(100)
                .on_finished(move |_: &View, label: String, _| *done_sink.lock() = Some(label)),
        );
        scheduler.ticker().advance(50);
        scheduler.ticker().advance(50);

        assert_eq!(*labels.lock(), vec!["0%", "50%", "100%", "100%"]);
        assert_eq!(done.lock().as_deref(), Some("100%"));
    }

    #[test]
    fn test_kinetic_runs_until_stopped() {
        let scheduler = AnimationScheduler::new();
        let view = Arc::new(View::default());
        let deltas = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&deltas);
        let finished = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&finished);

        scheduler
            .animate_kinetic(
                &view,
                "fling",
                move |delta, _speed| {
                    sink.lock().push(delta);
                    true
                },
                KineticOptions::new(-1.0, 0.25).on_finished(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();
        assert!(scheduler.is_kinetic_running(&view, "fling"));

        scheduler.ticker().advance(1);
        scheduler.ticker().advance(1);
        scheduler.ticker().advance(1);
        scheduler.ticker().advance(1);

        assert_eq!(*deltas.lock(), vec![-0.75, -0.5, -0.25]);
        assert_eq!(finished.load(Ordering::SeqCst), 1);
        assert!(!scheduler.is_kinetic_running(&view, "fling"));
        assert_eq!(scheduler.kinetic_count(), 0);
    }

    #[test]
    fn test_kinetic_abort_skips_finished() {
        let scheduler = AnimationScheduler::new();
        let view = Arc::new(View::default());
        let finished = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&finished);

        scheduler
            .animate_kinetic(
                &view,
                "fling",
                |_, _| true,
                KineticOptions::new(1.0, 0.0).on_finished(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();
        scheduler.ticker().advance(16);

        assert!(scheduler.abort_kinetic(&view, "fling"));
        assert!(!scheduler.abort_kinetic(&view, "fling"));
        scheduler.ticker().advance(16);

        assert_eq!(finished.load(Ordering::SeqCst), 0);
        assert_eq!(scheduler.ticker().subscriber_count(), 0);
    }

    #[test]
    fn test_kinetic_stops_when_callback_declines() {
        let scheduler = AnimationScheduler::new();
        let view = Arc::new(View::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let call_counter = Arc::clone(&calls);
        let finished = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&finished);

        scheduler
            .animate_kinetic(
                &view,
                "fling",
                move |_, _| call_counter.fetch_add(1, Ordering::SeqCst) == 0,
                KineticOptions::new(1.0, 0.001).on_finished(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();

        scheduler.ticker().advance(16);
        assert!(scheduler.is_kinetic_running(&view, "fling"));
        scheduler.ticker().advance(16);

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(finished.load(Ordering::SeqCst), 1);
        assert!(!scheduler.is_kinetic_running(&view, "fling"));
        assert_eq!(scheduler.ticker().subscriber_count(), 0);

        scheduler.ticker().advance(16);
        scheduler.ticker().advance(16);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_kinetic_of_dropped_owner_is_not_inherited() {
        let scheduler = AnimationScheduler::new();
        let view = Arc::new(View::default());
        let key = AnimationKey::for_arc(&view, "fling");

        scheduler
            .animate_kinetic(&view, "fling", |_, _| true, KineticOptions::new(1.0, 0.0))
            .unwrap();
        drop(view);

        // The registered fling keeps the old address out of circulation
        let others: Vec<Arc<View>> = (0..64).map(|_| Arc::new(View::default())).collect();
        for other in &others {
            assert_ne!(AnimationKey::for_arc(other, "fling"), key);
            assert!(!scheduler.is_kinetic_running(other, "fling"));
            assert!(!scheduler.abort(other, "fling"));
        }

        assert_eq!(scheduler.kinetic_count(), 1);
        assert!(scheduler.abort_key(key));
        assert_eq!(scheduler.kinetic_count(), 0);
    }

    #[test]
    fn test_clock_requires_marshaling_dispatcher() {
        let scheduler = AnimationScheduler::new();
        assert!(matches!(
            scheduler.start_clock(),
            Err(AnimationError::InvalidArgument(_))
        ));
        assert!(!scheduler.ticker().is_enabled());
    }

    #[test]
    fn test_kinetic_rejects_invalid_options() {
        let scheduler = AnimationScheduler::new();
        let view = Arc::new(View::default());

        let err = scheduler
            .animate_kinetic(&view, "fling", |_, _| true, KineticOptions::new(0.0, 0.1))
            .unwrap_err();
        assert!(matches!(err, AnimationError::InvalidArgument(_)));
        assert_eq!(scheduler.kinetic_count(), 0);
    }

    #[test]
    fn test_abort_covers_tween_and_kinetic() {
        let scheduler = AnimationScheduler::new();
        let view = Arc::new(View::default());

        scheduler.animate(&view, "scroll", record, AnimationOptions::new());
        scheduler
            .animate_kinetic(&view, "scroll", |_, _| true, KineticOptions::new(1.0, 0.01))
            .unwrap();
        assert_eq!(scheduler.ticker().subscriber_count(), 2);

        assert!(scheduler.abort(&view, "scroll"));
        assert!(!scheduler.has_active_animations());
        assert_eq!(scheduler.ticker().subscriber_count(), 0);
    }

    #[test]
    fn test_global_scheduler_set_once() {
        let scheduler = AnimationScheduler::new();
        assert!(set_global_scheduler(scheduler.clone()).is_ok());
        assert!(is_scheduler_initialized());
        assert!(try_get_scheduler().is_some());

        let err = set_global_scheduler(AnimationScheduler::new()).unwrap_err();
        assert_eq!(err, AnimationError::SchedulerAlreadySet);
    }
}
