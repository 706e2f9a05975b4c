// polarplot/job/src/firmware.rs
//
// Copyright © 2026 The Polarplot Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The consumer that drives the machine.
//!
//! Points arrive in canvas coordinates; the machine's angular origin sits
//! on the right-hand canvas edge, so x is mirrored before conversion.
//! Between paths the pen is lifted and the move is interpolated so the arm
//! doesn't sweep an arc across the drawing.

use crate::consumer::{Consumer, ConsumerError, ConsumerPoint};
use log::{debug, info};
use polarplot_device::convert::{self, StepperPosition};
use polarplot_device::link::DeviceLink;
use polarplot_device::protocol::{Calibration, DrawingPosition, Mode};
use polarplot_geometry::vector::{vec2d, Vector2D};
use polarplot_toolpath::generator::PointCommand;
use std::thread;
use std::time::Duration;

pub const PEN_UP: i32 = 0;
pub const PEN_DOWN: i32 = 30;

/// Interpolation density for pen-up travel moves, in points per step-space
/// distance unit.
const TRAVEL_POINTS_PER_UNIT: f64 = 0.1;

/// Poll period while waiting for the firmware's position ring to drain.
const DRAIN_POLL_DELAY: Duration = Duration::from_millis(100);

pub struct FirmwareConsumer {
    link: DeviceLink,
    calibration: Calibration,
    angle_correction: bool,
    /// First pen-down position of the path being drawn.
    first_point: Option<StepperPosition>,
    /// Last position sent to the device, if any.
    last_point: Option<StepperPosition>,
}

impl FirmwareConsumer {
    pub fn new(link: DeviceLink, calibration: Calibration, angle_correction: bool) -> FirmwareConsumer {
        FirmwareConsumer {
            link,
            calibration,
            angle_correction,
            first_point: None,
            last_point: None,
        }
    }

    fn to_stepper(&self, point: Vector2D, canvas_size: Vector2D) -> StepperPosition {
        let mirrored = vec2d(canvas_size.x() - point.x(), point.y());
        let status = self.link.status();
        convert::to_stepper_position(
            canvas_size,
            mirrored,
            status.max_amplitude_pos,
            status.max_angle_pos,
        )
    }

    /// Where the pen is now: the last position we queued, or the device's
    /// own report if we haven't queued any yet.
    fn current_position(&mut self) -> Result<StepperPosition, ConsumerError> {
        match self.last_point {
            Some(position) => Ok(position),
            None => {
                let status = self.link.update_status()?;
                Ok(StepperPosition::new(status.amplitude_pos, status.angle_pos))
            }
        }
    }

    fn push_position(&mut self, position: StepperPosition, pen: i32) -> Result<(), ConsumerError> {
        let start = self.current_position()?;
        let (amplitude_velocity, angle_velocity) = convert::velocities(start, position);
        self.link.add_position(&DrawingPosition {
            amplitude: position.amplitude,
            angle: position.angle,
            pen,
            amplitude_velocity,
            angle_velocity,
        })?;
        self.last_point = Some(position);
        Ok(())
    }

    /// Pen-up travel from the current position to the start of a new path.
    fn travel_to(&mut self, destination: StepperPosition) -> Result<(), ConsumerError> {
        let start = self.current_position()?;
        for position in intermediate_points(start, destination) {
            self.push_position(position, PEN_UP)?;
        }
        Ok(())
    }

    fn consume_point(
        &mut self,
        point: Vector2D,
        canvas_size: Vector2D,
    ) -> Result<(), ConsumerError> {
        let position = self.to_stepper(point, canvas_size);
        if self.first_point.is_none() {
            self.travel_to(position)?;
            self.first_point = Some(position);
        }
        self.push_position(position, PEN_DOWN)
    }
}

impl Consumer for FirmwareConsumer {
    fn init(&mut self) -> Result<(), ConsumerError> {
        self.link.set_mode(Mode::Home)?;
        self.link.wait_for_idle()?;
        let status = self.link.calibrate(&self.calibration)?;
        debug!("calibrated:\n{}", status);
        self.link.set_angle_correction(self.angle_correction)?;
        let status = self.link.set_mode(Mode::Draw)?;
        info!("entering draw mode: {:?}", status.mode);
        Ok(())
    }

    fn consume(&mut self, point: &ConsumerPoint) -> Result<(), ConsumerError> {
        match point.command {
            PointCommand::Point(world) => self.consume_point(world, point.canvas_size),
            PointCommand::ClosePath => match self.first_point {
                Some(first) => self.push_position(first, PEN_DOWN),
                None => Ok(()),
            },
            PointCommand::PathEnd => {
                self.first_point = None;
                Ok(())
            }
            PointCommand::DrawingEnd => Ok(()),
        }
    }

    fn shutdown(&mut self) -> Result<(), ConsumerError> {
        loop {
            let status = self.link.update_status()?;
            let drained = status.next_pos_to_place_idx == 0
                || status.next_pos_to_go_idx == status.next_pos_to_place_idx - 1;
            if drained {
                break;
            }
            thread::sleep(DRAIN_POLL_DELAY);
        }
        self.link.set_mode(Mode::Home)?;
        self.link.wait_for_idle()?;
        Ok(())
    }
}

/// Uniformly spaced stepper positions along the straight step-space line
/// from `start` to `end`, endpoints included.
fn intermediate_points(start: StepperPosition, end: StepperPosition) -> Vec<StepperPosition> {
    let distance = start.distance_to(end);
    let count = (distance * TRAVEL_POINTS_PER_UNIT) as usize;
    if count == 0 {
        return vec![];
    }
    (0..=count)
        .map(|index| {
            let ratio = index as f64 / count as f64;
            StepperPosition::new(
                start.amplitude + ((end.amplitude - start.amplitude) as f64 * ratio) as i32,
                start.angle + ((end.angle - start.angle) as f64 * ratio) as i32,
            )
        })
        .collect()
}
