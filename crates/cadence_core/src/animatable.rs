//! Animatable targets and animation keys
//!
//! An animatable target is any long-lived object an animation writes to.
//! The scheduler only needs two things from it: a stable identity (the
//! address of its `Arc` allocation) and a pair of batching hooks so that
//! several property writes made during one tick can be coalesced into a
//! single visual update.

use std::fmt;
use std::sync::Arc;

/// A target that animations can drive
///
/// Both hooks default to no-ops. Implementors that render lazily can use
/// them to defer invalidation until `batch_commit`.
pub trait Animatable: Send + Sync + 'static {
    /// Called before the step callbacks of one tick mutate the target
    fn batch_begin(&self) {}

    /// Called after the step callbacks of one tick have run
    fn batch_commit(&self) {}
}

/// Identity of a running animation: (owner identity, name)
///
/// Owners are compared by address, never by value, so two equal-looking
/// targets still get independent animation slots.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct AnimationKey {
    owner: usize,
    name: Arc<str>,
}

impl AnimationKey {
    /// Build a key from an owner reference and an animation name
    ///
    /// The owner reference must point into the same allocation for every
    /// call (use `&*arc` for `Arc`-held targets).
    pub fn new<T: ?Sized>(owner: &T, name: &str) -> Self {
        Self {
            owner: owner as *const T as *const () as usize,
            name: Arc::from(name),
        }
    }

    /// Build a key for an `Arc`-held owner
    pub fn for_arc<T: ?Sized>(owner: &Arc<T>, name: &str) -> Self {
        Self::new(&**owner, name)
    }

    /// Opaque owner identity
    pub fn owner_id(&self) -> usize {
        self.owner
    }

    /// Animation name
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for AnimationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AnimationKey({:#x}, {:?})", self.owner, self.name)
    }
}

impl fmt::Display for AnimationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{:#x}", self.name, self.owner)
    }
}
