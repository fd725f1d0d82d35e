//! Pure easing functions for timeline interpolation. No dependency on the
//! renderer or the sequencer — just math on a normalized time value.

use std::f32::consts::PI;

/// Easing curve applied to a tween's normalized progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Easing {
    /// Constant velocity (no easing).
    #[default]
    Linear,
    /// Slow start.
    QuadIn,
    /// Slow end.
    QuadOut,
    /// Slow start and end.
    QuadInOut,
    /// Stronger slow start.
    CubicIn,
    /// Stronger slow end.
    CubicOut,
    /// Very strong slow start.
    QuartIn,
    /// Sine wave easing (smooth).
    SineInOut,
    /// Exponential ramp, dramatic finish.
    ExpoIn,
    /// Quantized steps; `Steps(1)` is a hard cut at the end of the duration.
    Steps(u8),
}

impl Easing {
    /// Apply the easing to `t` in [0, 1].
    #[inline]
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::QuadIn => t * t,
            Easing::QuadOut => 1.0 - (1.0 - t) * (1.0 - t),
            Easing::QuadInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
            Easing::CubicIn => t * t * t,
            Easing::CubicOut => 1.0 - (1.0 - t).powi(3),
            Easing::QuartIn => t * t * t * t,
            Easing::SineInOut => -((PI * t).cos() - 1.0) / 2.0,
            Easing::ExpoIn => {
                if t == 0.0 {
                    0.0
                } else {
                    2.0_f32.powf(10.0 * t - 10.0)
                }
            }
            Easing::Steps(n) => {
                let n = n.max(1) as f32;
                (t * n).floor().min(n - 1.0) / n + if t >= 1.0 { 1.0 / n } else { 0.0 }
            }
        }
    }
}

/// Linear interpolation after easing.
#[inline]
pub fn ease(from: f32, to: f32, t: f32, easing: Easing) -> f32 {
    let k = easing.apply(t);
    from + (to - from) * k
}

/// Component-wise eased interpolation for color cells.
#[inline]
pub fn ease_rgb(from: [f32; 3], to: [f32; 3], t: f32, easing: Easing) -> [f32; 3] {
    let k = easing.apply(t);
    [
        from[0] + (to[0] - from[0]) * k,
        from[1] + (to[1] - from[1]) * k,
        from[2] + (to[2] - from[2]) * k,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_is_identity() {
        assert_eq!(Easing::Linear.apply(0.25), 0.25);
        assert_eq!(Easing::Linear.apply(1.0), 1.0);
    }

    #[test]
    fn endpoints_hold_for_all_curves() {
        let curves = [
            Easing::Linear,
            Easing::QuadIn,
            Easing::QuadOut,
            Easing::QuadInOut,
            Easing::CubicIn,
            Easing::CubicOut,
            Easing::QuartIn,
            Easing::SineInOut,
            Easing::ExpoIn,
            Easing::Steps(1),
        ];
        for curve in curves {
            assert!(curve.apply(0.0).abs() < 1e-6, "{curve:?} at 0");
            assert!((curve.apply(1.0) - 1.0).abs() < 1e-6, "{curve:?} at 1");
        }
    }

    #[test]
    fn steps_one_is_a_hard_cut() {
        assert_eq!(Easing::Steps(1).apply(0.0), 0.0);
        assert_eq!(Easing::Steps(1).apply(0.99), 0.0);
        assert_eq!(Easing::Steps(1).apply(1.0), 1.0);
    }

    #[test]
    fn ease_clamps_out_of_range_time() {
        assert_eq!(ease(0.0, 10.0, 1.5, Easing::Linear), 10.0);
        assert_eq!(ease(0.0, 10.0, -0.5, Easing::Linear), 0.0);
    }
}
