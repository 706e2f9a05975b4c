// polarplot/device/src/protocol.rs
//
// Copyright © 2026 The Polarplot Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Wire format of the motion-control protocol.
//!
//! Host→device traffic is framed binary: `<<<`, a little-endian signed
//! 32-bit command id, a command-specific payload, `>>>`. Device→host
//! traffic is line-oriented ASCII; the reserved lines are listed below, and
//! anything else is device log output.

use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub const FRAME_HEADER: &[u8] = b"<<<";
pub const FRAME_FOOTER: &[u8] = b">>>";

pub const MSG_OK: &str = "OK";
pub const MSG_FAIL: &str = "FAIL";
pub const MSG_SETUP_DONE: &str = "SETUP DONE";
pub const MSG_STATUS_START: &str = "STATUS START";
pub const MSG_UNRECOGNIZED_COMMAND: &str = "DID NOT RECOGNIZE COMMAND TYPE";
pub const MSG_CHECKSUM_MISMATCH: &str = "CHECKSUM MISMATCH";

/// Number of decimal lines following `STATUS START`.
pub const STATUS_LINE_COUNT: usize = 23;

/// The modulus of the per-field position checksum.
pub const CHECKSUM_MODULUS: i32 = 123;

/// Errors arising from malformed device output or frames.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("unknown mode {0}")]
    UnknownMode(i32),
    #[error("unknown command id {0}")]
    UnknownCommand(i32),
    #[error("bad status field {field}: {value:?}")]
    BadStatusField { field: &'static str, value: String },
    #[error("status block has {0} lines instead of 23")]
    TruncatedStatus(usize),
    #[error("frame payload has {got} bytes, expected {expected}")]
    BadPayloadLength { got: usize, expected: usize },
}

/// Host→device command ids.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(i32)]
pub enum Command {
    None = 0,
    GetStatus = 1,
    SetMode = 2,
    Calibrate = 3,
    AddPosition = 4,
    SetAngleCorrection = 5,
}

impl Command {
    pub fn from_i32(value: i32) -> Result<Command, ProtocolError> {
        match value {
            0 => Ok(Command::None),
            1 => Ok(Command::GetStatus),
            2 => Ok(Command::SetMode),
            3 => Ok(Command::Calibrate),
            4 => Ok(Command::AddPosition),
            5 => Ok(Command::SetAngleCorrection),
            other => Err(ProtocolError::UnknownCommand(other)),
        }
    }

    /// The fixed payload size following the command id, in bytes.
    pub fn payload_len(self) -> usize {
        match self {
            Command::None | Command::GetStatus => 0,
            Command::SetMode | Command::SetAngleCorrection => 4,
            Command::Calibrate | Command::AddPosition => 24,
        }
    }
}

/// The firmware's operating modes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(i32)]
pub enum Mode {
    Idle = 0,
    Home = 1,
    AutoCalibrate = 2,
    Draw = 3,
}

impl Mode {
    pub fn from_i32(value: i32) -> Result<Mode, ProtocolError> {
        match value {
            0 => Ok(Mode::Idle),
            1 => Ok(Mode::Home),
            2 => Ok(Mode::AutoCalibrate),
            3 => Ok(Mode::Draw),
            other => Err(ProtocolError::UnknownMode(other)),
        }
    }
}

impl Default for Mode {
    fn default() -> Mode {
        Mode::Idle
    }
}

/// One pending pen position as it travels over the wire.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DrawingPosition {
    pub amplitude: i32,
    pub angle: i32,
    pub pen: i32,
    pub amplitude_velocity: i32,
    pub angle_velocity: i32,
}

impl DrawingPosition {
    /// The transmitted checksum: the sum of every field reduced mod 123.
    pub fn checksum(&self) -> i32 {
        self.amplitude % CHECKSUM_MODULUS
            + self.angle % CHECKSUM_MODULUS
            + self.pen % CHECKSUM_MODULUS
            + self.amplitude_velocity % CHECKSUM_MODULUS
            + self.angle_velocity % CHECKSUM_MODULUS
    }
}

/// Per-machine calibration constants, provided by the host.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct Calibration {
    pub travelable_distance_steps: i32,
    pub steps_per_mm: f32,
    pub min_amplitude: i32,
    pub max_amplitude: i32,
    pub max_angle: i32,
    pub max_encoder: i32,
}

impl Default for Calibration {
    fn default() -> Calibration {
        Calibration {
            travelable_distance_steps: 37713,
            steps_per_mm: 79.23,
            min_amplitude: 2923,
            max_amplitude: 40637,
            max_angle: 14650,
            max_encoder: 2433,
        }
    }
}

/// Everything the firmware reports about itself.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Status {
    pub mode: Mode,
    pub calibrated: bool,
    pub calibrating: bool,
    pub amplitude_pos: i32,
    pub amplitude_target_pos: i32,
    pub amplitude_speed: i32,
    pub angle_pos: i32,
    pub angle_target_pos: i32,
    pub angle_speed: i32,
    pub travelable_distance_steps: i32,
    pub steps_per_mm: f32,
    pub min_amplitude_pos: i32,
    pub max_amplitude_pos: i32,
    pub max_angle_pos: i32,
    pub encoder_count: i32,
    pub max_encoder_count: i32,
    pub next_pos_to_place_idx: i32,
    pub next_pos_to_go_idx: i32,
    pub min_amplitude_pressed: bool,
    pub max_amplitude_pressed: bool,
    pub min_angle_pressed: bool,
    pub max_angle_pressed: bool,
    pub angle_correction: bool,
}

impl Status {
    /// Parses the 23 decimal lines following `STATUS START`, in wire order.
    pub fn parse_lines(lines: &[String]) -> Result<Status, ProtocolError> {
        if lines.len() != STATUS_LINE_COUNT {
            return Err(ProtocolError::TruncatedStatus(lines.len()));
        }
        let int = |index: usize, field: &'static str| -> Result<i32, ProtocolError> {
            lines[index].trim().parse().map_err(|_| ProtocolError::BadStatusField {
                field,
                value: lines[index].clone(),
            })
        };
        let flag = |index: usize, field: &'static str| -> Result<bool, ProtocolError> {
            Ok(int(index, field)? != 0)
        };
        let steps_per_mm: f32 =
            lines[10].trim().parse().map_err(|_| ProtocolError::BadStatusField {
                field: "steps_per_mm",
                value: lines[10].clone(),
            })?;
        Ok(Status {
            mode: Mode::from_i32(int(0, "mode")?)?,
            calibrated: flag(1, "calibrated")?,
            calibrating: flag(2, "calibrating")?,
            amplitude_pos: int(3, "amplitude_pos")?,
            amplitude_target_pos: int(4, "amplitude_target_pos")?,
            amplitude_speed: int(5, "amplitude_speed")?,
            angle_pos: int(6, "angle_pos")?,
            angle_target_pos: int(7, "angle_target_pos")?,
            angle_speed: int(8, "angle_speed")?,
            travelable_distance_steps: int(9, "travelable_distance_steps")?,
            steps_per_mm,
            min_amplitude_pos: int(11, "min_amplitude_pos")?,
            max_amplitude_pos: int(12, "max_amplitude_pos")?,
            max_angle_pos: int(13, "max_angle_pos")?,
            encoder_count: int(14, "encoder_count")?,
            max_encoder_count: int(15, "max_encoder_count")?,
            next_pos_to_place_idx: int(16, "next_pos_to_place_idx")?,
            next_pos_to_go_idx: int(17, "next_pos_to_go_idx")?,
            min_amplitude_pressed: flag(18, "min_amplitude_pressed")?,
            max_amplitude_pressed: flag(19, "max_amplitude_pressed")?,
            min_angle_pressed: flag(20, "min_angle_pressed")?,
            max_angle_pressed: flag(21, "max_angle_pressed")?,
            angle_correction: flag(22, "angle_correction")?,
        })
    }

    /// Renders the status as the 23 wire lines, in wire order.
    pub fn to_lines(&self) -> Vec<String> {
        vec![
            (self.mode as i32).to_string(),
            (self.calibrated as i32).to_string(),
            (self.calibrating as i32).to_string(),
            self.amplitude_pos.to_string(),
            self.amplitude_target_pos.to_string(),
            self.amplitude_speed.to_string(),
            self.angle_pos.to_string(),
            self.angle_target_pos.to_string(),
            self.angle_speed.to_string(),
            self.travelable_distance_steps.to_string(),
            self.steps_per_mm.to_string(),
            self.min_amplitude_pos.to_string(),
            self.max_amplitude_pos.to_string(),
            self.max_angle_pos.to_string(),
            self.encoder_count.to_string(),
            self.max_encoder_count.to_string(),
            self.next_pos_to_place_idx.to_string(),
            self.next_pos_to_go_idx.to_string(),
            (self.min_amplitude_pressed as i32).to_string(),
            (self.max_amplitude_pressed as i32).to_string(),
            (self.min_angle_pressed as i32).to_string(),
            (self.max_angle_pressed as i32).to_string(),
            (self.angle_correction as i32).to_string(),
        ]
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Current Mode: {:?}", self.mode)?;
        writeln!(f, "Calibrated: {}", self.calibrated)?;
        writeln!(f, "Calibrating: {}", self.calibrating)?;
        writeln!(f, "Amplitude Pos: {}", self.amplitude_pos)?;
        writeln!(f, "Amplitude Target Pos: {}", self.amplitude_target_pos)?;
        writeln!(f, "Amplitude Speed: {}", self.amplitude_speed)?;
        writeln!(f, "Angle Pos: {}", self.angle_pos)?;
        writeln!(f, "Angle Target Pos: {}", self.angle_target_pos)?;
        writeln!(f, "Angle Speed: {}", self.angle_speed)?;
        writeln!(f, "Travelable Distance Steps: {}", self.travelable_distance_steps)?;
        writeln!(f, "Steps per mm: {}", self.steps_per_mm)?;
        writeln!(f, "Min Amplitude Pos: {}", self.min_amplitude_pos)?;
        writeln!(f, "Max Amplitude Pos: {}", self.max_amplitude_pos)?;
        writeln!(f, "Max Angle Pos: {}", self.max_angle_pos)?;
        writeln!(f, "Encoder Count: {}", self.encoder_count)?;
        writeln!(f, "Max Encoder Count: {}", self.max_encoder_count)?;
        writeln!(f, "Next Pos To Place Idx: {}", self.next_pos_to_place_idx)?;
        writeln!(f, "Next Pos To Go Idx: {}", self.next_pos_to_go_idx)?;
        writeln!(f, "Min Amplitude Pressed: {}", self.min_amplitude_pressed)?;
        writeln!(f, "Max Amplitude Pressed: {}", self.max_amplitude_pressed)?;
        writeln!(f, "Min Angle Pressed: {}", self.min_angle_pressed)?;
        writeln!(f, "Max Angle Pressed: {}", self.max_angle_pressed)?;
        write!(f, "Angle Correction: {}", self.angle_correction)
    }
}

fn begin_frame(command: Command) -> Vec<u8> {
    let mut frame = Vec::with_capacity(FRAME_HEADER.len() + 4 + command.payload_len() + FRAME_FOOTER.len());
    frame.extend_from_slice(FRAME_HEADER);
    push_i32(&mut frame, command as i32);
    frame
}

fn end_frame(mut frame: Vec<u8>) -> Vec<u8> {
    frame.extend_from_slice(FRAME_FOOTER);
    frame
}

fn push_i32(frame: &mut Vec<u8>, value: i32) {
    let mut bytes = [0; 4];
    LittleEndian::write_i32(&mut bytes, value);
    frame.extend_from_slice(&bytes);
}

fn push_f32(frame: &mut Vec<u8>, value: f32) {
    let mut bytes = [0; 4];
    LittleEndian::write_f32(&mut bytes, value);
    frame.extend_from_slice(&bytes);
}

pub fn get_status_frame() -> Vec<u8> {
    end_frame(begin_frame(Command::GetStatus))
}

pub fn set_mode_frame(mode: Mode) -> Vec<u8> {
    let mut frame = begin_frame(Command::SetMode);
    push_i32(&mut frame, mode as i32);
    end_frame(frame)
}

pub fn calibrate_frame(calibration: &Calibration) -> Vec<u8> {
    let mut frame = begin_frame(Command::Calibrate);
    push_i32(&mut frame, calibration.travelable_distance_steps);
    push_f32(&mut frame, calibration.steps_per_mm);
    push_i32(&mut frame, calibration.min_amplitude);
    push_i32(&mut frame, calibration.max_amplitude);
    push_i32(&mut frame, calibration.max_angle);
    push_i32(&mut frame, calibration.max_encoder);
    end_frame(frame)
}

pub fn add_position_frame(position: &DrawingPosition) -> Vec<u8> {
    let mut frame = begin_frame(Command::AddPosition);
    push_i32(&mut frame, position.amplitude);
    push_i32(&mut frame, position.angle);
    push_i32(&mut frame, position.pen);
    push_i32(&mut frame, position.amplitude_velocity);
    push_i32(&mut frame, position.angle_velocity);
    push_i32(&mut frame, position.checksum());
    end_frame(frame)
}

pub fn set_angle_correction_frame(enabled: bool) -> Vec<u8> {
    let mut frame = begin_frame(Command::SetAngleCorrection);
    push_i32(&mut frame, enabled as i32);
    end_frame(frame)
}

/// Decodes a `SetMode` payload.
pub fn parse_mode_payload(payload: &[u8]) -> Result<Mode, ProtocolError> {
    Mode::from_i32(read_i32(payload, 0)?)
}

/// Decodes a `SetAngleCorrection` payload.
pub fn parse_angle_correction_payload(payload: &[u8]) -> Result<bool, ProtocolError> {
    Ok(read_i32(payload, 0)? != 0)
}

/// Decodes a `Calibrate` payload.
pub fn parse_calibration_payload(payload: &[u8]) -> Result<Calibration, ProtocolError> {
    if payload.len() != Command::Calibrate.payload_len() {
        return Err(ProtocolError::BadPayloadLength {
            got: payload.len(),
            expected: Command::Calibrate.payload_len(),
        });
    }
    Ok(Calibration {
        travelable_distance_steps: read_i32(payload, 0)?,
        steps_per_mm: LittleEndian::read_f32(&payload[4..8]),
        min_amplitude: read_i32(payload, 8)?,
        max_amplitude: read_i32(payload, 12)?,
        max_angle: read_i32(payload, 16)?,
        max_encoder: read_i32(payload, 20)?,
    })
}

/// Decodes an `AddPosition` payload, returning the position and the
/// transmitted checksum.
pub fn parse_position_payload(payload: &[u8]) -> Result<(DrawingPosition, i32), ProtocolError> {
    if payload.len() != Command::AddPosition.payload_len() {
        return Err(ProtocolError::BadPayloadLength {
            got: payload.len(),
            expected: Command::AddPosition.payload_len(),
        });
    }
    let position = DrawingPosition {
        amplitude: read_i32(payload, 0)?,
        angle: read_i32(payload, 4)?,
        pen: read_i32(payload, 8)?,
        amplitude_velocity: read_i32(payload, 12)?,
        angle_velocity: read_i32(payload, 16)?,
    };
    Ok((position, read_i32(payload, 20)?))
}

fn read_i32(payload: &[u8], offset: usize) -> Result<i32, ProtocolError> {
    if payload.len() < offset + 4 {
        return Err(ProtocolError::BadPayloadLength { got: payload.len(), expected: offset + 4 });
    }
    Ok(LittleEndian::read_i32(&payload[offset..offset + 4]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::quickcheck;

    #[test]
    fn set_mode_frame_bytes() {
        assert_eq!(
            set_mode_frame(Mode::Draw),
            b"\x3c\x3c\x3c\x02\x00\x00\x00\x03\x00\x00\x00\x3e\x3e\x3e".to_vec()
        );
    }

    #[test]
    fn position_frame_round_trips() {
        let position = DrawingPosition {
            amplitude: 5000,
            angle: 5000,
            pen: 1,
            amplitude_velocity: 2500,
            angle_velocity: 1000,
        };
        let frame = add_position_frame(&position);
        assert!(frame.starts_with(FRAME_HEADER) && frame.ends_with(FRAME_FOOTER));
        let payload = &frame[7..frame.len() - 3];
        let (parsed, checksum) = parse_position_payload(payload).unwrap();
        assert_eq!(parsed, position);
        assert_eq!(checksum, position.checksum());
    }

    quickcheck! {
        fn checksum_is_sum_of_fields_mod_123(
            amplitude: i32, angle: i32, pen: i32, amp_vel: i32, angle_vel: i32
        ) -> bool {
            let position = DrawingPosition {
                amplitude,
                angle,
                pen,
                amplitude_velocity: amp_vel,
                angle_velocity: angle_vel,
            };
            let fields = [amplitude, angle, pen, amp_vel, angle_vel];
            position.checksum() == fields.iter().map(|f| f % 123).sum::<i32>()
        }
    }

    #[test]
    fn status_lines_round_trip() {
        let status = Status {
            mode: Mode::Draw,
            calibrated: true,
            amplitude_pos: 1234,
            angle_pos: -7,
            steps_per_mm: 79.23,
            next_pos_to_place_idx: 41,
            next_pos_to_go_idx: 40,
            angle_correction: true,
            ..Status::default()
        };
        let lines = status.to_lines();
        assert_eq!(lines.len(), STATUS_LINE_COUNT);
        assert_eq!(Status::parse_lines(&lines).unwrap(), status);
    }

    #[test]
    fn truncated_status_is_rejected() {
        let lines = vec!["0".to_string(); 10];
        assert!(Status::parse_lines(&lines).is_err());
    }
}
