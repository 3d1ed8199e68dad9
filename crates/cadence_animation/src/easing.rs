//! Easing functions for animations
//!
//! Easings remap unit progress. They are pure and stateless, and they are
//! not clamped: spring and bounce curves legitimately leave `[0, 1]`.

use std::f64::consts::PI;

/// Easing function type
#[derive(Clone, Copy, Debug, Default)]
pub enum Easing {
    #[default]
    Linear,
    EaseIn,
    EaseOut,
    EaseInOut,
    EaseInQuad,
    EaseOutQuad,
    EaseInOutQuad,
    EaseInCubic,
    EaseOutCubic,
    EaseInOutCubic,
    EaseInQuart,
    EaseOutQuart,
    EaseInOutQuart,
    SinIn,
    SinOut,
    SinInOut,
    BounceIn,
    BounceOut,
    /// Anticipates by pulling back below 0 before accelerating
    SpringIn,
    /// Overshoots past 1 before settling
    SpringOut,
    CubicBezier(f64, f64, f64, f64),
    /// Caller-supplied curve
    Custom(fn(f64) -> f64),
}

/// Overshoot factor shared by the spring curves
const SPRING_OVERSHOOT: f64 = 1.70158;

impl Easing {
    /// Apply the easing function to a progress value (0.0 to 1.0)
    pub fn apply(&self, t: f64) -> f64 {
        match self {
            Easing::Linear => t,
            Easing::EaseIn => t * t * t,
            Easing::EaseOut => 1.0 - (1.0 - t).powi(3),
            Easing::EaseInOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
            Easing::EaseInQuad => t * t,
            Easing::EaseOutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            Easing::EaseInOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
            Easing::EaseInCubic => t * t * t,
            Easing::EaseOutCubic => (t - 1.0).powi(3) + 1.0,
            Easing::EaseInOutCubic => {
                if t < 0.5 {
                    (t * 2.0).powi(3) / 2.0
                } else {
                    ((t - 1.0) * 2.0).powi(3) / 2.0 + 1.0
                }
            }
            Easing::EaseInQuart => t * t * t * t,
            Easing::EaseOutQuart => 1.0 - (1.0 - t).powi(4),
            Easing::EaseInOutQuart => {
                if t < 0.5 {
                    8.0 * t * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(4) / 2.0
                }
            }
            Easing::SinIn => 1.0 - (t * PI * 0.5).cos(),
            Easing::SinOut => (t * PI * 0.5).sin(),
            Easing::SinInOut => -(PI * t).cos() / 2.0 + 0.5,
            Easing::BounceIn => 1.0 - bounce_out(1.0 - t),
            Easing::BounceOut => bounce_out(t),
            Easing::SpringIn => t * t * ((SPRING_OVERSHOOT + 1.0) * t - SPRING_OVERSHOOT),
            Easing::SpringOut => {
                let p = t - 1.0;
                p * p * ((SPRING_OVERSHOOT + 1.0) * p + SPRING_OVERSHOOT) + 1.0
            }
            Easing::CubicBezier(x1, y1, x2, y2) => cubic_bezier_ease(t, *x1, *y1, *x2, *y2),
            Easing::Custom(curve) => curve(t),
        }
    }
}

impl From<fn(f64) -> f64> for Easing {
    fn from(curve: fn(f64) -> f64) -> Self {
        Easing::Custom(curve)
    }
}

/// Piecewise parabolic bounce settling at 1.0
fn bounce_out(t: f64) -> f64 {
    const N: f64 = 7.5625;
    const D: f64 = 2.75;

    if t < 1.0 / D {
        N * t * t
    } else if t < 2.0 / D {
        let t = t - 1.5 / D;
        N * t * t + 0.75
    } else if t < 2.5 / D {
        let t = t - 2.25 / D;
        N * t * t + 0.9375
    } else {
        let t = t - 2.625 / D;
        N * t * t + 0.984375
    }
}

/// Cubic bezier easing calculation (matches CSS / browser implementations).
///
/// Uses Newton-Raphson with binary-search fallback for robustness.
fn cubic_bezier_ease(t: f64, x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    // Endpoints are always exact
    if t <= 0.0 {
        return 0.0;
    }
    if t >= 1.0 {
        return 1.0;
    }

    // Solve for parameter `p` where bezier_x(p) == t using Newton-Raphson,
    // falling back to binary search if the slope is too flat.
    let mut p = t;
    for _ in 0..8 {
        let err = bezier_sample(p, x1, x2) - t;
        if err.abs() < 1e-7 {
            return bezier_sample(p, y1, y2);
        }
        let slope = bezier_slope(p, x1, x2);
        if slope.abs() < 1e-7 {
            break;
        }
        p -= err / slope;
    }

    let mut lo = 0.0_f64;
    let mut hi = 1.0_f64;
    p = t;
    for _ in 0..20 {
        let val = bezier_sample(p, x1, x2);
        if (val - t).abs() < 1e-7 {
            break;
        }
        if val < t {
            lo = p;
        } else {
            hi = p;
        }
        p = (lo + hi) * 0.5;
    }

    bezier_sample(p, y1, y2)
}

/// Evaluate cubic bezier at parameter t: B(t) = 3(1-t)²t·p1 + 3(1-t)t²·p2 + t³
#[inline]
fn bezier_sample(t: f64, p1: f64, p2: f64) -> f64 {
    let a = 1.0 - 3.0 * p2 + 3.0 * p1;
    let b = 3.0 * p2 - 6.0 * p1;
    let c = 3.0 * p1;
    ((a * t + b) * t + c) * t
}

/// Derivative of cubic bezier: B'(t) = 3(1-t)²·p1 + 6(1-t)t·(p2-p1) + 3t²·(1-p2)
#[inline]
fn bezier_slope(t: f64, p1: f64, p2: f64) -> f64 {
    let a = 1.0 - 3.0 * p2 + 3.0 * p1;
    let b = 3.0 * p2 - 6.0 * p1;
    let c = 3.0 * p1;
    (3.0 * a * t + 2.0 * b) * t + c
}

/// Named easings, in the spelling accepted by [`Easing::from_name`]
pub const NAMED_EASINGS: &[(&str, Easing)] = &[
    ("linear", Easing::Linear),
    ("ease-in", Easing::EaseIn),
    ("ease-out", Easing::EaseOut),
    ("ease-in-out", Easing::EaseInOut),
    ("ease-in-quad", Easing::EaseInQuad),
    ("ease-out-quad", Easing::EaseOutQuad),
    ("ease-in-out-quad", Easing::EaseInOutQuad),
    ("ease-in-cubic", Easing::EaseInCubic),
    ("ease-out-cubic", Easing::EaseOutCubic),
    ("ease-in-out-cubic", Easing::EaseInOutCubic),
    ("ease-in-quart", Easing::EaseInQuart),
    ("ease-out-quart", Easing::EaseOutQuart),
    ("ease-in-out-quart", Easing::EaseInOutQuart),
    ("sin-in", Easing::SinIn),
    ("sin-out", Easing::SinOut),
    ("sin-in-out", Easing::SinInOut),
    ("bounce-in", Easing::BounceIn),
    ("bounce-out", Easing::BounceOut),
    ("spring-in", Easing::SpringIn),
    ("spring-out", Easing::SpringOut),
];

impl Easing {
    /// Look up a named easing, case-insensitively
    ///
    /// Accepts `-` or `_` as separator.
    pub fn from_name(name: &str) -> Option<Easing> {
        let name = name.trim().to_ascii_lowercase().replace('_', "-");
        NAMED_EASINGS
            .iter()
            .find(|(candidate, _)| *candidate == name)
            .map(|(_, easing)| *easing)
    }
}
