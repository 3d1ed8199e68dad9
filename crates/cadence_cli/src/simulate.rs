//! Headless simulation
//!
//! Drives a real [`AnimationScheduler`] with a fixed step instead of the wall
//! clock and records what the target sees.

use anyhow::Result;
use cadence_animation::{
    Animatable, AnimationOptions, AnimationScheduler, Easing, KineticOptions,
};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Stand-in target; records the simulated time of each batch
#[derive(Default)]
struct Probe {
    clock_ms: AtomicU64,
    batches: AtomicU64,
}

impl Probe {
    fn now(&self) -> u64 {
        self.clock_ms.load(Ordering::SeqCst)
    }

    fn advance(&self, step_ms: u64) {
        self.clock_ms.fetch_add(step_ms, Ordering::SeqCst);
    }
}

impl Animatable for Probe {
    fn batch_commit(&self) {
        self.batches.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Clone, Debug)]
pub struct TweenParams {
    pub from: f64,
    pub to: f64,
    pub length_ms: Option<u32>,
    pub step_ms: Option<u64>,
    pub easing: Easing,
    pub easing_name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TweenFrame {
    pub time_ms: u64,
    pub value: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct TweenReport {
    pub easing: String,
    pub length_ms: u32,
    pub step_ms: u64,
    pub frames: Vec<TweenFrame>,
    pub completed: bool,
    pub batches: u64,
}

/// Run one tween to completion
pub fn simulate_tween(scheduler: &AnimationScheduler, params: &TweenParams) -> Result<TweenReport> {
    let length_ms = params.length_ms.unwrap_or(scheduler.config().length_ms);
    let step_ms = params
        .step_ms
        .unwrap_or(u64::from(scheduler.config().rate_ms))
        .max(1);

    let probe = Arc::new(Probe::default());
    let frames = Arc::new(Mutex::new(Vec::new()));
    let completed = Arc::new(Mutex::new(None));

    let sink = Arc::clone(&frames);
    let done = Arc::clone(&completed);
    scheduler.animate_range(
        &probe,
        "tween",
        move |probe: &Probe, value| {
            sink.lock().push(TweenFrame {
                time_ms: probe.now(),
                value,
            })
        },
        params.from,
        params.to,
        AnimationOptions::new()
            .length(length_ms)
            .easing(params.easing)
            .on_finished(move |_: &Probe, _, finished| *done.lock() = Some(finished)),
    );

    // One extra tick for the length-zero case
    let max_ticks = u64::from(length_ms) / step_ms + 2;
    for _ in 0..max_ticks {
        if !scheduler.is_running(&probe, "tween") {
            break;
        }
        probe.advance(step_ms);
        scheduler.ticker().advance(step_ms);
    }

    if scheduler.is_running(&probe, "tween") {
        anyhow::bail!("tween did not finish after {} ticks", max_ticks);
    }

    let frames = std::mem::take(&mut *frames.lock());
    let completed = completed.lock().unwrap_or(false);
    tracing::debug!("Simulated tween: {} frames", frames.len());

    Ok(TweenReport {
        easing: params.easing_name.clone(),
        length_ms,
        step_ms,
        frames,
        completed,
        batches: probe.batches.load(Ordering::SeqCst),
    })
}

#[derive(Clone, Debug)]
pub struct FlingParams {
    pub velocity: f64,
    pub drag: f64,
    pub step_ms: Option<u64>,
    pub max_ms: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FlingFrame {
    pub time_ms: u64,
    pub delta: f64,
    pub position: f64,
    pub speed: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct FlingReport {
    pub velocity: f64,
    pub drag: f64,
    pub step_ms: u64,
    pub frames: Vec<FlingFrame>,
    pub distance: f64,
    /// False when the fling was cut off at `max_ms`
    pub settled: bool,
}

/// Run one fling until it stops or `max_ms` of simulated time has passed
pub fn simulate_fling(scheduler: &AnimationScheduler, params: &FlingParams) -> Result<FlingReport> {
    let step_ms = params
        .step_ms
        .unwrap_or(u64::from(scheduler.config().rate_ms))
        .max(1);

    let probe = Arc::new(Probe::default());
    let frames = Arc::new(Mutex::new(Vec::new()));
    let settled = Arc::new(Mutex::new(false));

    let sink = Arc::clone(&frames);
    let clock = Arc::downgrade(&probe);
    let mut position = 0.0;
    let done = Arc::clone(&settled);
    scheduler.animate_kinetic(
        &probe,
        "fling",
        move |delta, speed| {
            position += delta;
            let time_ms = clock.upgrade().map_or(0, |probe| probe.now());
            sink.lock().push(FlingFrame {
                time_ms,
                delta,
                position,
                speed,
            });
            true
        },
        KineticOptions::new(params.velocity, params.drag).on_finished(move || *done.lock() = true),
    )?;

    while scheduler.is_kinetic_running(&probe, "fling") && probe.now() < params.max_ms {
        probe.advance(step_ms);
        scheduler.ticker().advance(step_ms);
    }

    if scheduler.abort_kinetic(&probe, "fling") {
        tracing::warn!("Fling still moving after {}ms, stopped", params.max_ms);
    }

    let frames = std::mem::take(&mut *frames.lock());
    let distance = frames.last().map_or(0.0, |frame| frame.position);
    let settled = *settled.lock();

    Ok(FlingReport {
        velocity: params.velocity,
        drag: params.drag,
        step_ms,
        frames,
        distance,
        settled,
    })
}
