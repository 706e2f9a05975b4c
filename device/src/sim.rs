// polarplot/device/src/sim.rs
//
// Copyright © 2026 The Polarplot Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A simulated firmware speaking the real wire protocol over in-memory
//! pipes.
//!
//! The simulator validates frames and checksums, keeps the bounded position
//! ring with its two indices, and can be scripted to fail commands, which
//! makes it the test bed for the link's retry and back-pressure behavior.
//! Homing completes on the first status poll after it, so `wait_for_idle`
//! sees one intermediate state.

use crate::protocol::{
    self, Command, DrawingPosition, Mode, ProtocolError, Status, MSG_CHECKSUM_MISMATCH, MSG_FAIL,
    MSG_OK, MSG_SETUP_DONE, MSG_STATUS_START, MSG_UNRECOGNIZED_COMMAND,
};
use byteorder::{ByteOrder, LittleEndian};
use crossbeam_channel::{unbounded, Receiver, Sender};
use log::debug;
use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex};
use std::thread;

/// Read half of an in-memory byte pipe. Blocks until bytes arrive; reports
/// end-of-stream once the write half is gone.
pub struct PipeReader {
    receiver: Receiver<Vec<u8>>,
    pending: Vec<u8>,
}

impl Read for PipeReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pending.is_empty() {
            match self.receiver.recv() {
                Ok(bytes) => self.pending = bytes,
                Err(_) => return Ok(0),
            }
        }
        let count = buf.len().min(self.pending.len());
        buf[..count].copy_from_slice(&self.pending[..count]);
        self.pending.drain(..count);
        Ok(count)
    }
}

/// Write half of an in-memory byte pipe.
pub struct PipeWriter {
    sender: Sender<Vec<u8>>,
}

impl Write for PipeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.sender
            .send(buf.to_vec())
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Builds one directed in-memory pipe.
pub fn pipe() -> (PipeWriter, PipeReader) {
    let (sender, receiver) = unbounded();
    (PipeWriter { sender }, PipeReader { receiver, pending: vec![] })
}

/// Observable state of the simulated device.
#[derive(Clone, Debug)]
pub struct SimulatorState {
    pub status: Status,
    /// Positions accepted into the ring, in arrival order.
    pub positions: Vec<DrawingPosition>,
    /// Raw frames as received, including framing bytes.
    pub frames: Vec<Vec<u8>>,
    /// How many upcoming `AddPosition` commands will be answered `FAIL`.
    pub forced_failures: u32,
    /// Ring slots available before the firmware pushes back.
    pub ring_capacity: i32,
}

impl SimulatorState {
    fn new() -> SimulatorState {
        SimulatorState {
            status: Status::default(),
            positions: vec![],
            frames: vec![],
            forced_failures: 0,
            ring_capacity: 32,
        }
    }
}

/// Handle to a spawned simulated device.
pub struct Simulator {
    state: Arc<Mutex<SimulatorState>>,
}

impl Simulator {
    /// Spawns the simulated device and returns the host-side transport
    /// ends: the stream to read device output from and the stream to write
    /// frames to.
    pub fn spawn() -> (Simulator, PipeReader, PipeWriter) {
        let (host_writer, device_reader) = pipe();
        let (device_writer, host_reader) = pipe();
        let state = Arc::new(Mutex::new(SimulatorState::new()));
        let device_state = Arc::clone(&state);
        thread::Builder::new()
            .name("plotter-sim".to_string())
            .spawn(move || device_loop(device_reader, device_writer, device_state))
            .expect("failed to spawn simulator thread");
        (Simulator { state }, host_reader, host_writer)
    }

    /// Snapshot of the device state.
    pub fn state(&self) -> SimulatorState {
        self.state.lock().unwrap().clone()
    }

    /// Scripts the next `count` position commands to be refused.
    pub fn fail_next_add_positions(&self, count: u32) {
        self.state.lock().unwrap().forced_failures = count;
    }

    /// Raw frames received so far that carry the given command id.
    pub fn frames_for(&self, command: Command) -> Vec<Vec<u8>> {
        self.state
            .lock()
            .unwrap()
            .frames
            .iter()
            .filter(|frame| LittleEndian::read_i32(&frame[3..7]) == command as i32)
            .cloned()
            .collect()
    }
}

enum Incoming {
    Frame(Vec<u8>),
    Unrecognized,
    Incomplete,
}

fn take_frame(received: &mut Vec<u8>) -> Incoming {
    let start = match find_subslice(received, protocol::FRAME_HEADER) {
        Some(start) => start,
        None => {
            // Drop garbage, keeping a possible partial header.
            let keep = received.len().min(protocol::FRAME_HEADER.len() - 1);
            received.drain(..received.len() - keep);
            return Incoming::Incomplete;
        }
    };
    if received.len() < start + 7 {
        return Incoming::Incomplete;
    }
    let command = match Command::from_i32(LittleEndian::read_i32(&received[start + 3..start + 7])) {
        Ok(command) => command,
        Err(ProtocolError::UnknownCommand(id)) => {
            debug!("simulator saw unknown command id {}", id);
            received.drain(..start + 3);
            return Incoming::Unrecognized;
        }
        Err(_) => unreachable!(),
    };
    let total = start + 7 + command.payload_len() + protocol::FRAME_FOOTER.len();
    if received.len() < total {
        return Incoming::Incomplete;
    }
    if &received[total - 3..total] != protocol::FRAME_FOOTER {
        received.drain(..start + 3);
        return Incoming::Unrecognized;
    }
    let frame = received[start..total].to_vec();
    received.drain(..total);
    Incoming::Frame(frame)
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

fn device_loop(mut reader: PipeReader, mut writer: PipeWriter, state: Arc<Mutex<SimulatorState>>) {
    if send_line(&mut writer, MSG_SETUP_DONE).is_err() {
        return;
    }

    let mut received = vec![];
    let mut chunk = [0; 256];
    loop {
        match reader.read(&mut chunk) {
            Ok(0) | Err(_) => return,
            Ok(read) => received.extend_from_slice(&chunk[..read]),
        }
        loop {
            match take_frame(&mut received) {
                Incoming::Incomplete => break,
                Incoming::Unrecognized => {
                    if send_line(&mut writer, MSG_UNRECOGNIZED_COMMAND).is_err() {
                        return;
                    }
                }
                Incoming::Frame(frame) => {
                    if handle_frame(&frame, &mut writer, &state).is_err() {
                        return;
                    }
                }
            }
        }
    }
}

fn send_line(writer: &mut PipeWriter, line: &str) -> io::Result<()> {
    writer.write_all(line.as_bytes())?;
    writer.write_all(b"\n")
}

fn handle_frame(
    frame: &[u8],
    writer: &mut PipeWriter,
    state: &Arc<Mutex<SimulatorState>>,
) -> io::Result<()> {
    let command = Command::from_i32(LittleEndian::read_i32(&frame[3..7])).expect("checked above");
    let payload = &frame[7..frame.len() - 3];

    let mut state = state.lock().unwrap();
    state.frames.push(frame.to_vec());

    match command {
        Command::None => send_line(writer, MSG_OK),
        Command::GetStatus => {
            let lines = state.status.to_lines();
            send_line(writer, MSG_STATUS_START)?;
            for line in lines {
                send_line(writer, &line)?;
            }
            // Homing finishes between polls.
            if state.status.mode == Mode::Home {
                state.status.mode = Mode::Idle;
                state.status.amplitude_pos = 0;
                state.status.angle_pos = 0;
            }
            send_line(writer, MSG_OK)
        }
        Command::SetMode => match protocol::parse_mode_payload(payload) {
            Ok(mode) => {
                state.status.mode = mode;
                send_line(writer, MSG_OK)
            }
            Err(_) => send_line(writer, MSG_FAIL),
        },
        Command::Calibrate => match protocol::parse_calibration_payload(payload) {
            Ok(calibration) => {
                state.status.travelable_distance_steps = calibration.travelable_distance_steps;
                state.status.steps_per_mm = calibration.steps_per_mm;
                state.status.min_amplitude_pos = calibration.min_amplitude;
                state.status.max_amplitude_pos = calibration.max_amplitude;
                state.status.max_angle_pos = calibration.max_angle;
                state.status.max_encoder_count = calibration.max_encoder;
                state.status.calibrated = true;
                send_line(writer, MSG_OK)
            }
            Err(_) => send_line(writer, MSG_FAIL),
        },
        Command::AddPosition => {
            let (position, checksum) = match protocol::parse_position_payload(payload) {
                Ok(parsed) => parsed,
                Err(_) => return send_line(writer, MSG_FAIL),
            };
            if checksum != position.checksum() {
                send_line(writer, MSG_CHECKSUM_MISMATCH)?;
                return send_line(writer, MSG_FAIL);
            }
            if state.forced_failures > 0 {
                state.forced_failures -= 1;
                return send_line(writer, MSG_FAIL);
            }
            let pending =
                state.status.next_pos_to_place_idx - state.status.next_pos_to_go_idx;
            if pending >= state.ring_capacity {
                return send_line(writer, MSG_FAIL);
            }
            state.positions.push(position);
            state.status.next_pos_to_place_idx += 1;
            state.status.amplitude_pos = position.amplitude;
            state.status.angle_pos = position.angle;
            if state.status.mode == Mode::Draw {
                // The motion loop keeps up with the producer: everything but
                // the freshest position has been executed.
                state.status.next_pos_to_go_idx = state.status.next_pos_to_place_idx - 1;
            }
            send_line(writer, MSG_OK)
        }
        Command::SetAngleCorrection => match protocol::parse_angle_correction_payload(payload) {
            Ok(enabled) => {
                state.status.angle_correction = enabled;
                send_line(writer, MSG_OK)
            }
            Err(_) => send_line(writer, MSG_FAIL),
        },
    }
}
