//! Linear interpolation from unit progress to a value range

/// Map unit progress onto `[start, end]`
///
/// Progress outside `[0, 1]` extrapolates, so overshooting easings carry
/// through to the produced value.
pub fn interpolate(start: f64, end: f64) -> impl Fn(f64) -> f64 + Copy + Send + Sync + 'static {
    move |progress| start + (end - start) * progress
}

/// A value range driven by unit progress
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Interpolator {
    pub start: f64,
    pub end: f64,
}

impl Interpolator {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Value at the given progress
    pub fn at(&self, progress: f64) -> f64 {
        self.start + (self.end - self.start) * progress
    }
}
