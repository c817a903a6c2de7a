//! Thrust-driven locomotion shared by server simulation and client prediction.
//!
//! One step is: accelerate along the control vector, decay with continuous
//! exponential drag, clamp to the top speed, then move. Drag uses
//! `exp(-rate * dt)` so the same wall-clock span decays velocity by the same
//! amount whatever the step size.

use crate::math::Vec3;

/// Tunables of the motion model. Server and client must agree on every field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionConfig {
    /// Acceleration in m/s² at full thrust.
    pub accel: f32,
    /// Acceleration in m/s² at full thrust while boosted.
    pub accel_fast: f32,
    /// Exponential drag rate in 1/s.
    pub drag: f32,
    /// Hard cap on speed in m/s.
    pub max_speed: f32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            accel: 2.0,
            accel_fast: 4.0,
            drag: 0.8,
            max_speed: 3.5,
        }
    }
}

impl MotionConfig {
    pub fn acceleration(&self, boosted: bool) -> f32 {
        if boosted {
            self.accel_fast
        } else {
            self.accel
        }
    }

    /// Returns the velocity after one step of `dt` seconds under `control`.
    pub fn integrate(&self, velocity: Vec3, control: Vec3, boosted: bool, dt: f32) -> Vec3 {
        let mut velocity = velocity + control * (self.acceleration(boosted) * dt);
        velocity *= (-self.drag * dt).exp();

        let speed = velocity.norm();
        if speed > self.max_speed {
            velocity *= self.max_speed / speed;
        }
        velocity
    }

    /// Returns the position after moving at `velocity` for `dt` seconds.
    pub fn advance(&self, position: Vec3, velocity: Vec3, dt: f32) -> Vec3 {
        position + velocity * dt
    }

    /// Integrates then advances `state` in place.
    pub fn step(&self, state: &mut MotionState, control: Vec3, boosted: bool, dt: f32) {
        state.velocity = self.integrate(state.velocity, control, boosted, dt);
        state.position = self.advance(state.position, state.velocity, dt);
    }
}

/// Position and velocity of one moving body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionState {
    pub position: Vec3,
    pub velocity: Vec3,
}

impl MotionState {
    pub fn at_rest(position: Vec3) -> Self {
        Self {
            position,
            velocity: Vec3::zeros(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_default_constants() {
        let config = MotionConfig::default();
        assert_eq!(config.accel, 2.0);
        assert_eq!(config.accel_fast, 4.0);
        assert_eq!(config.drag, 0.8);
        assert_eq!(config.max_speed, 3.5);
        assert_eq!(config.acceleration(true), 2.0 * config.acceleration(false));
    }

    #[test]
    fn test_single_step_matches_formula() {
        let config = MotionConfig::default();
        let dt = 1.0 / 60.0;
        let v = config.integrate(Vec3::zeros(), Vec3::new(1.0, 0.0, 0.0), false, dt);
        let expected = 2.0 * dt * (-0.8 * dt).exp();
        assert_approx_eq!(v.x, expected, 1e-7);
        assert_eq!(v.y, 0.0);
        assert_eq!(v.z, 0.0);

        let boosted = config.integrate(Vec3::zeros(), Vec3::new(1.0, 0.0, 0.0), true, dt);
        assert_approx_eq!(boosted.x, 2.0 * expected, 1e-7);
    }

    #[test]
    fn test_speed_never_exceeds_cap() {
        let config = MotionConfig::default();
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..50 {
            let mut state = MotionState::at_rest(Vec3::zeros());
            for _ in 0..500 {
                let control = Vec3::new(
                    rng.gen_range(-1.0..=1.0),
                    rng.gen_range(-1.0..=1.0),
                    rng.gen_range(-1.0..=1.0),
                );
                let dt = rng.gen_range(0.001..0.25);
                config.step(&mut state, control, rng.gen_bool(0.5), dt);
                assert!(state.velocity.norm() <= config.max_speed + 1e-4);
            }
        }
    }

    #[test]
    fn test_clamp_rescales_to_exact_cap() {
        let config = MotionConfig::default();
        let v = config.integrate(Vec3::new(10.0, 0.0, 0.0), Vec3::zeros(), false, 0.01);
        assert_approx_eq!(v.norm(), config.max_speed, 1e-5);
        assert!(v.x > 0.0);
    }

    #[test]
    fn test_zero_control_decays_monotonically() {
        let config = MotionConfig::default();
        let mut velocity = Vec3::new(-3.0, 0.0, 0.0);
        let mut previous = velocity.norm();

        for _ in 0..600 {
            velocity = config.integrate(velocity, Vec3::zeros(), false, 1.0 / 60.0);
            let speed = velocity.norm();
            assert!(speed < previous);
            assert!(velocity.x < 0.0);
            previous = speed;
        }
    }

    #[test]
    fn test_drag_independent_of_step_size() {
        let config = MotionConfig::default();
        let start = Vec3::new(2.0, 1.0, -1.0);

        let one_step = config.integrate(start, Vec3::zeros(), false, 0.5);
        let mut many_steps = start;
        for _ in 0..50 {
            many_steps = config.integrate(many_steps, Vec3::zeros(), false, 0.01);
        }

        assert_approx_eq!(one_step.x, many_steps.x, 1e-5);
        assert_approx_eq!(one_step.y, many_steps.y, 1e-5);
        assert_approx_eq!(one_step.z, many_steps.z, 1e-5);
    }

    #[test]
    fn test_zero_velocity_stays_put() {
        let config = MotionConfig::default();
        let mut state = MotionState::at_rest(Vec3::new(1.0, 2.0, 3.0));
        config.step(&mut state, Vec3::zeros(), true, 0.1);
        assert_eq!(state.velocity, Vec3::zeros());
        assert_eq!(state.position, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_advance_uses_new_velocity() {
        let config = MotionConfig::default();
        let mut state = MotionState::at_rest(Vec3::zeros());
        config.step(&mut state, Vec3::new(0.0, 0.0, -1.0), false, 0.5);
        assert_approx_eq!(state.position.z, state.velocity.z * 0.5, 1e-7);
        assert!(state.position.z < 0.0);
    }
}
