//! Animation trees
//!
//! An [`Animation`] is a node with an optional step callback and a list of
//! children, each mapped onto a sub-range `[begin_at, finish_at]` of the
//! parent's progress. Children run concurrently and independently; ranges
//! may overlap or leave gaps, which allows staggered or simultaneous
//! multi-property choreography from a single driver.
//!
//! ```ignore
//! let fade = Animation::from_step(|v: &View, x| v.set_opacity(x), 0.0, 1.0, Easing::Linear);
//! let slide = Animation::from_step(|v: &View, x| v.set_x(x), -40.0, 0.0, Easing::SinOut);
//!
//! Animation::new()
//!     .insert(0.0, 0.5, fade)?
//!     .insert(0.25, 1.0, slide)?
//!     .commit(&scheduler, &view, "enter", AnimationOptions::new().length(400));
//! ```

use crate::easing::Easing;
use crate::interpolate::interpolate;
use crate::scheduler::{AnimationOptions, AnimationScheduler};
use cadence_core::{Animatable, AnimationError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Step callback: receives the target and the node's eased progress
pub type StepFn<T> = Box<dyn Fn(&T, f64) + Send + Sync>;

/// Local finished callback of a child node
pub type FinishedFn = Box<dyn Fn() + Send + Sync>;

/// Callback produced from a whole tree, ready to be driven with progress
pub type RootCallback<T> = Arc<dyn Fn(&T, f64) + Send + Sync>;

/// A child scheduled on a sub-range of its parent
struct Segment<T> {
    begin_at: f64,
    finish_at: f64,
    animation: Animation<T>,
}

/// A composable, time-sliced animation fragment
pub struct Animation<T> {
    step: Option<StepFn<T>>,
    easing: Easing,
    finished: Option<FinishedFn>,
    children: Vec<Segment<T>>,
}

impl<T: 'static> Animation<T> {
    /// Create an empty composition container
    pub fn new() -> Self {
        Self {
            step: None,
            easing: Easing::Linear,
            finished: None,
            children: Vec::new(),
        }
    }

    /// Create a leaf that drives `callback` across `[start, end]`
    pub fn from_step<F>(callback: F, start: f64, end: f64, easing: Easing) -> Self
    where
        F: Fn(&T, f64) + Send + Sync + 'static,
    {
        let transform = interpolate(start, end);
        Self {
            step: Some(Box::new(move |target, progress| {
                callback(target, transform(progress))
            })),
            easing,
            finished: None,
            children: Vec::new(),
        }
    }

    /// Set the easing applied to this node's own step
    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    /// Set a callback fired once when this node, as a child, completes its range
    pub fn on_finished<F>(mut self, callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.finished = Some(Box::new(callback));
        self
    }

    /// Number of direct children
    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// True when this node has a step callback of its own
    pub fn has_step(&self) -> bool {
        self.step.is_some()
    }

    /// Add a child over `[begin_at, finish_at]` of this node's progress
    ///
    /// Fails without modifying the tree if either bound is outside
    /// `[0, 1]` or `finish_at <= begin_at`.
    pub fn add(&mut self, begin_at: f64, finish_at: f64, child: Animation<T>) -> Result<()> {
        validate_range(begin_at, finish_at)?;
        self.children.push(Segment {
            begin_at,
            finish_at,
            animation: child,
        });
        Ok(())
    }

    /// Chaining form of [`Animation::add`]
    pub fn insert(mut self, begin_at: f64, finish_at: f64, child: Animation<T>) -> Result<Self> {
        self.add(begin_at, finish_at, child)?;
        Ok(self)
    }

    /// Run `child` over this node's whole span
    pub fn with_concurrent(mut self, child: Animation<T>) -> Self {
        self.children.push(Segment {
            begin_at: 0.0,
            finish_at: 1.0,
            animation: child,
        });
        self
    }

    /// Run `child` concurrently over a sub-range
    pub fn with_concurrent_range(
        self,
        child: Animation<T>,
        begin_at: f64,
        finish_at: f64,
    ) -> Result<Self> {
        self.insert(begin_at, finish_at, child)
    }

    /// Run an interpolated step over this node's whole span
    pub fn with_concurrent_step<F>(self, callback: F, start: f64, end: f64, easing: Easing) -> Self
    where
        F: Fn(&T, f64) + Send + Sync + 'static,
    {
        self.with_concurrent(Animation::from_step(callback, start, end, easing))
    }

    /// Flatten the tree into a single progress callback
    ///
    /// Each child's finished flag is edge-triggered for the lifetime of the
    /// returned callback: once a child reaches the end of its range it is
    /// never invoked again.
    pub fn root_callback(self) -> RootCallback<T> {
        let node = Node::from(self);
        Arc::new(move |target: &T, progress: f64| node.run(target, progress))
    }
}

impl<T: Animatable> Animation<T> {
    /// Start this tree on `owner` under `name`
    ///
    /// Shorthand for [`AnimationScheduler::commit`].
    pub fn commit(
        self,
        scheduler: &AnimationScheduler,
        owner: &Arc<T>,
        name: &str,
        options: AnimationOptions<T>,
    ) {
        scheduler.commit(owner, name, self, options);
    }
}

impl<T: 'static> Default for Animation<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_range(begin_at: f64, finish_at: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&begin_at) {
        return Err(AnimationError::Range {
            bound: "begin_at",
            value: begin_at,
        });
    }
    if !(0.0..=1.0).contains(&finish_at) {
        return Err(AnimationError::Range {
            bound: "finish_at",
            value: finish_at,
        });
    }
    if finish_at <= begin_at {
        return Err(AnimationError::InvertedRange {
            begin_at,
            finish_at,
        });
    }
    Ok(())
}

/// Running form of an [`Animation`]
struct Node<T> {
    step: Option<StepFn<T>>,
    easing: Easing,
    finished: Option<FinishedFn>,
    children: Vec<ChildNode<T>>,
}

struct ChildNode<T> {
    begin_at: f64,
    finish_at: f64,
    node: Node<T>,
    triggered: AtomicBool,
}

impl<T> From<Animation<T>> for Node<T> {
    fn from(animation: Animation<T>) -> Self {
        Self {
            step: animation.step,
            easing: animation.easing,
            finished: animation.finished,
            children: animation
                .children
                .into_iter()
                .map(|segment| ChildNode {
                    begin_at: segment.begin_at,
                    finish_at: segment.finish_at,
                    node: Node::from(segment.animation),
                    triggered: AtomicBool::new(false),
                })
                .collect(),
        }
    }
}

impl<T> Node<T> {
    fn run(&self, target: &T, progress: f64) {
        if let Some(ref step) = self.step {
            step(target, self.easing.apply(progress));
        }

        for child in &self.children {
            if child.triggered.load(Ordering::Acquire) {
                continue;
            }

            let local = ((progress - child.begin_at) / (child.finish_at - child.begin_at))
                .clamp(0.0, 1.0);

            // Not started yet; re-evaluated on every tick
            if local <= 0.0 {
                continue;
            }

            child.node.run(target, local);

            if local >= 1.0 && !child.triggered.swap(true, Ordering::AcqRel) {
                if let Some(ref finished) = child.node.finished {
                    finished();
                }
            }
        }
    }
}
