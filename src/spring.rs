//! Damped spring smoothing for pointer input

use nalgebra::Point2;
use serde::Serialize;

/// Largest step integrated in one go; longer frames are sub-stepped
pub const MAX_SPRING_SUBSTEP: f64 = 1.0 / 60.0;

/// Frame gaps longer than this are integrated as if they were this long
pub const MAX_FRAME_GAP: f64 = 0.25;

/// Masses below this are clamped before dividing
pub const MIN_MASS: f64 = 1e-3;

/// Physical constants of the spring
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpringParams {
    pub mass: f64,
    pub stiffness: f64,
    pub damping: f64,
}

impl Default for SpringParams {
    fn default() -> Self {
        Self {
            mass: 1.0,
            stiffness: 120.0,
            damping: 20.0,
        }
    }
}

/// Position and velocity of one smoothed scalar channel
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SpringState {
    pub pos: f64,
    pub vel: f64,
}

impl SpringState {
    pub fn new(pos: f64) -> Self {
        Self { pos, vel: 0.0 }
    }

    /// Advance toward `target` by `dt` seconds (semi-implicit Euler)
    pub fn step(self, target: f64, params: &SpringParams, dt: f64) -> Self {
        if !(dt.is_finite() && dt > 0.0) {
            return self;
        }

        let dt = dt.min(MAX_FRAME_GAP);
        let substeps = (dt / MAX_SPRING_SUBSTEP).ceil().max(1.0) as u32;
        let h = dt / substeps as f64;
        let mass = params.mass.max(MIN_MASS);

        let mut state = self;
        for _ in 0..substeps {
            let force = -params.stiffness * (state.pos - target) - params.damping * state.vel;
            state.vel += force / mass * h;
            state.pos += state.vel * h;
        }
        state
    }
}

/// Two independent spring channels for the pointer's x and y
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PointerSpring {
    pub x: SpringState,
    pub y: SpringState,
}

impl PointerSpring {
    /// Start at rest on `position`
    pub fn at(position: Point2<f64>) -> Self {
        Self {
            x: SpringState::new(position.x),
            y: SpringState::new(position.y),
        }
    }

    pub fn update(self, target: Point2<f64>, params: &SpringParams, dt: f64) -> Self {
        Self {
            x: self.x.step(target.x, params, dt),
            y: self.y.step(target.y, params, dt),
        }
    }

    pub fn position(&self) -> Point2<f64> {
        Point2::new(self.x.pos, self.y.pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f64 = 1.0 / 60.0;

    #[test]
    fn test_spring_settles_critically_damped() {
        let params = SpringParams {
            mass: 1.0,
            stiffness: 100.0,
            damping: 20.0,
        };
        let mut state = SpringState::new(0.0);
        let mut tail = Vec::new();
        for i in 0..300 {
            state = state.step(100.0, &params, DT);
            if i >= 240 {
                tail.push(state.pos);
            }
        }
        assert!((state.pos - 100.0).abs() < 1.0, "pos {}", state.pos);
        // no sustained oscillation over the last second
        for p in tail {
            assert!((p - 100.0).abs() < 1.0);
        }
        assert!(state.vel.abs() < 0.5);
    }

    #[test]
    fn test_spring_bounded_across_parameter_range() {
        for &mass in &[0.5, 1.0, 3.0] {
            for &stiffness in &[50.0, 150.0, 300.0] {
                for &damping in &[10.0, 25.0, 40.0] {
                    let params = SpringParams {
                        mass,
                        stiffness,
                        damping,
                    };
                    let mut state = SpringState::new(0.0);
                    for _ in 0..600 {
                        state = state.step(500.0, &params, DT);
                        assert!(state.pos.is_finite());
                        assert!(state.pos.abs() < 2000.0);
                    }
                    assert!((state.pos - 500.0).abs() < 5.0);
                }
            }
        }
    }

    #[test]
    fn test_large_dt_is_substepped() {
        let params = SpringParams {
            mass: 0.5,
            stiffness: 300.0,
            damping: 10.0,
        };
        let mut state = SpringState::new(0.0);
        for _ in 0..100 {
            state = state.step(100.0, &params, 0.25);
            assert!(state.pos.is_finite());
            assert!(state.pos.abs() < 1000.0);
        }
        assert!((state.pos - 100.0).abs() < 1.0);
    }

    #[test]
    fn test_huge_dt_is_capped() {
        let params = SpringParams::default();
        let state = SpringState { pos: 0.0, vel: 40.0 };
        let capped = state.step(100.0, &params, MAX_FRAME_GAP);
        assert_eq!(state.step(100.0, &params, 1e12), capped);
        assert_eq!(state.step(100.0, &params, f64::MAX), capped);
        assert!(capped.pos.is_finite());
    }

    #[test]
    fn test_invalid_dt_is_noop() {
        let params = SpringParams::default();
        let state = SpringState { pos: 3.0, vel: 1.0 };
        assert_eq!(state.step(10.0, &params, 0.0), state);
        assert_eq!(state.step(10.0, &params, -1.0), state);
        assert_eq!(state.step(10.0, &params, f64::NAN), state);
    }

    #[test]
    fn test_zero_mass_stays_finite() {
        let params = SpringParams {
            mass: 0.0,
            ..SpringParams::default()
        };
        let state = SpringState::new(0.0).step(10.0, &params, DT);
        assert!(state.pos.is_finite());
        assert!(state.vel.is_finite());
    }

    #[test]
    fn test_pointer_spring_channels_independent() {
        let params = SpringParams::default();
        let mut spring = PointerSpring::at(Point2::new(0.0, 50.0));
        for _ in 0..10 {
            spring = spring.update(Point2::new(100.0, 50.0), &params, DT);
        }
        assert!(spring.x.pos > 0.0);
        assert_eq!(spring.y.pos, 50.0);
        assert_eq!(spring.y.vel, 0.0);
    }
}
