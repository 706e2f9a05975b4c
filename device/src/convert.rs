// polarplot/device/src/convert.rs
//
// Copyright © 2026 The Polarplot Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! World-space millimeters to stepper steps and back.
//!
//! The pen arm pivots at the canvas origin: a point's radial distance maps
//! to the amplitude stepper, its polar angle (0°–90° across the canvas) to
//! the angle stepper.

use polarplot_geometry::vector::{vec2d, Vector2D};

/// The fastest either stepper is driven, in steps per second.
pub const MAX_STEPPER_VELOCITY: i32 = 1500;

/// A target for both steppers, in calibrated machine steps.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StepperPosition {
    pub amplitude: i32,
    pub angle: i32,
}

impl StepperPosition {
    #[inline]
    pub fn new(amplitude: i32, angle: i32) -> StepperPosition {
        StepperPosition { amplitude, angle }
    }

    /// Euclidean distance to another stepper position, in step units.
    pub fn distance_to(self, other: StepperPosition) -> f64 {
        let amplitude = (other.amplitude - self.amplitude) as f64;
        let angle = (other.angle - self.angle) as f64;
        (amplitude * amplitude + angle * angle).sqrt()
    }
}

/// Converts a world position over the canvas to stepper steps.
///
/// Amplitude scales against the canvas width, angle against the 90° sweep;
/// both are clamped to their calibrated ranges.
pub fn to_stepper_position(
    canvas_size: Vector2D,
    position: Vector2D,
    max_amplitude_pos: i32,
    max_angle_pos: i32,
) -> StepperPosition {
    let amplitude_mm = position.length();
    let angle_deg = position.angle().to_degrees();

    let amplitude_steps = amplitude_mm * (max_amplitude_pos as f64 / canvas_size.x());
    let angle_steps = angle_deg * (max_angle_pos as f64 / 90.0);

    StepperPosition {
        amplitude: (amplitude_steps as i32).max(0).min(max_amplitude_pos),
        angle: (angle_steps as i32).max(0).min(max_angle_pos),
    }
}

/// The inverse of [`to_stepper_position`], up to truncation.
pub fn from_stepper_position(
    canvas_size: Vector2D,
    position: StepperPosition,
    max_amplitude_pos: i32,
    max_angle_pos: i32,
) -> Vector2D {
    let amplitude_mm = position.amplitude as f64 * (canvas_size.x() / max_amplitude_pos as f64);
    let angle_rad = (position.angle as f64 * (90.0 / max_angle_pos as f64)).to_radians();
    vec2d(angle_rad.cos(), angle_rad.sin()) * amplitude_mm
}

/// Couples the two stepper velocities so both axes finish a move together.
///
/// The axis with the smaller delta is slowed in proportion; when the angle
/// delta is zero the ratio falls back to 1 and both axes run flat out.
pub fn velocities(start: StepperPosition, end: StepperPosition) -> (i32, i32) {
    let amplitude_diff = (end.amplitude - start.amplitude).abs() as f64;
    let angle_diff = (end.angle - start.angle).abs() as f64;

    let diff_ratio = if angle_diff != 0.0 { amplitude_diff / angle_diff } else { 1.0 };
    let max = MAX_STEPPER_VELOCITY as f64;
    if diff_ratio < 1.0 {
        ((max * diff_ratio) as i32, MAX_STEPPER_VELOCITY)
    } else {
        (MAX_STEPPER_VELOCITY, (max * diff_ratio) as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::{
        from_stepper_position, to_stepper_position, velocities, StepperPosition,
        MAX_STEPPER_VELOCITY,
    };
    use polarplot_geometry::vector::vec2d;
    use quickcheck::quickcheck;

    const MAX_AMPLITUDE: i32 = 40637;
    const MAX_ANGLE: i32 = 14650;

    #[test]
    fn canvas_corners() {
        let canvas = vec2d(500.0, 500.0);
        let origin = to_stepper_position(canvas, vec2d(0.0, 0.0), MAX_AMPLITUDE, MAX_ANGLE);
        assert_eq!(origin, StepperPosition::new(0, 0));

        let right = to_stepper_position(canvas, vec2d(500.0, 0.0), MAX_AMPLITUDE, MAX_ANGLE);
        assert!((right.amplitude - MAX_AMPLITUDE).abs() <= 1);
        assert_eq!(right.angle, 0);

        let down = to_stepper_position(canvas, vec2d(0.0, 500.0), MAX_AMPLITUDE, MAX_ANGLE);
        assert!((down.amplitude - MAX_AMPLITUDE).abs() <= 1);
        assert!((down.angle - MAX_ANGLE).abs() <= 1);
    }

    #[test]
    fn out_of_range_positions_clamp() {
        let canvas = vec2d(500.0, 500.0);
        let far = to_stepper_position(canvas, vec2d(900.0, 900.0), MAX_AMPLITUDE, MAX_ANGLE);
        assert_eq!(far.amplitude, MAX_AMPLITUDE);
        let negative = to_stepper_position(canvas, vec2d(10.0, -10.0), MAX_AMPLITUDE, MAX_ANGLE);
        assert_eq!(negative.angle, 0);
    }

    quickcheck! {
        fn conversion_round_trips_within_one_step(x: u16, y: u16) -> bool {
            let canvas = vec2d(500.0, 500.0);
            let position = vec2d(f64::from(x % 500), f64::from(y % 500));
            let steps = to_stepper_position(canvas, position, MAX_AMPLITUDE, MAX_ANGLE);
            let world = from_stepper_position(canvas, steps, MAX_AMPLITUDE, MAX_ANGLE);
            let again = to_stepper_position(canvas, world, MAX_AMPLITUDE, MAX_ANGLE);
            (again.amplitude - steps.amplitude).abs() <= 1 && (again.angle - steps.angle).abs() <= 1
        }
    }

    #[test]
    fn smaller_axis_is_slowed() {
        let (amplitude, angle) =
            velocities(StepperPosition::new(0, 0), StepperPosition::new(500, 1000));
        assert_eq!(angle, MAX_STEPPER_VELOCITY);
        assert_eq!(amplitude, MAX_STEPPER_VELOCITY / 2);
    }

    #[test]
    fn velocities_equal_when_angle_static() {
        // A purely radial move keeps the unit ratio: both axes at maximum.
        let (amplitude, angle) =
            velocities(StepperPosition::new(0, 100), StepperPosition::new(4000, 100));
        assert_eq!((amplitude, angle), (MAX_STEPPER_VELOCITY, MAX_STEPPER_VELOCITY));
    }

    #[test]
    fn amplitude_dominant_move_keeps_source_scaling() {
        let (amplitude, angle) =
            velocities(StepperPosition::new(0, 0), StepperPosition::new(3000, 1000));
        assert_eq!(amplitude, MAX_STEPPER_VELOCITY);
        assert_eq!(angle, MAX_STEPPER_VELOCITY * 3);
    }
}
