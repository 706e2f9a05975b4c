// polarplot/device/src/link.rs
//
// Copyright © 2026 The Polarplot Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The stateful host side of the firmware link.
//!
//! A background reader thread owns the receive half of the connection: it
//! assembles lines, parses status blocks, and signals command completion
//! over a rendezvous channel. The caller side serializes commands: a frame
//! is written, then the completion signal is awaited before anything else
//! goes out. A `FAIL` completion is the firmware's back-pressure; the frame
//! is re-sent after a short delay.

use crate::protocol::{
    self, Calibration, DrawingPosition, Mode, Status, MSG_CHECKSUM_MISMATCH, MSG_FAIL, MSG_OK,
    MSG_SETUP_DONE, MSG_STATUS_START, MSG_UNRECOGNIZED_COMMAND, STATUS_LINE_COUNT,
};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use log::{debug, info, warn};
use std::io::{ErrorKind, Read, Write};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Default serial baud rate.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// How long to wait for a completion signal before logging and waiting
/// again.
const COMMAND_TIMEOUT: Duration = Duration::from_secs(1);

/// Back-off before re-sending a frame the firmware failed.
const RETRY_DELAY: Duration = Duration::from_millis(100);

/// Poll period for `wait_for_idle`.
const IDLE_POLL_DELAY: Duration = Duration::from_millis(100);

/// How long the device gets to finish its boot banner after the DTR reset.
const SETUP_TIMEOUT: Duration = Duration::from_secs(10);

const MAX_SIGNALS_IN_FLIGHT: usize = 64;

/// Errors surfaced by the link.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("device never finished setup")]
    SetupTimeout,
    #[error("reader thread is gone")]
    Disconnected,
}

/// The firmware's verdict on one command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Completion {
    Ok,
    NeedsRetry,
}

/// A connection to the firmware.
pub struct DeviceLink {
    writer: Box<dyn Write + Send>,
    completions: Receiver<Completion>,
    status: Arc<Mutex<Status>>,
}

impl DeviceLink {
    /// Opens the given serial port, resets the device by toggling DTR, and
    /// waits for its setup banner.
    pub fn open(port_name: &str, baud_rate: u32) -> Result<DeviceLink, LinkError> {
        info!("opening plotter on {} at {} baud", port_name, baud_rate);
        let mut port = serialport::new(port_name, baud_rate)
            .timeout(Duration::from_secs(1))
            .open()?;
        port.write_data_terminal_ready(false)?;
        thread::sleep(Duration::from_millis(100));
        port.write_data_terminal_ready(true)?;
        let reader = port.try_clone()?;
        DeviceLink::from_parts(reader, port)
    }

    /// Builds a link over an arbitrary byte transport. The device on the
    /// other end is expected to announce itself with `SETUP DONE`.
    pub fn from_parts<R, W>(reader: R, writer: W) -> Result<DeviceLink, LinkError>
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        let (completion_sender, completion_receiver) = bounded(MAX_SIGNALS_IN_FLIGHT);
        let (setup_sender, setup_receiver) = bounded(1);
        let status = Arc::new(Mutex::new(Status::default()));

        let reader_status = Arc::clone(&status);
        thread::Builder::new()
            .name("plotter-reader".to_string())
            .spawn(move || reader_thread(reader, completion_sender, setup_sender, reader_status))?;

        match setup_receiver.recv_timeout(SETUP_TIMEOUT) {
            Ok(()) => {}
            Err(_) => return Err(LinkError::SetupTimeout),
        }

        Ok(DeviceLink {
            writer: Box::new(writer),
            completions: completion_receiver,
            status,
        })
    }

    /// The most recent status snapshot published by the reader.
    pub fn status(&self) -> Status {
        *self.status.lock().unwrap()
    }

    /// Writes one frame and waits for the firmware's verdict, retrying
    /// after a short back-off for as long as it answers `FAIL`.
    fn send_command(&mut self, frame: &[u8]) -> Result<(), LinkError> {
        loop {
            self.writer.write_all(frame)?;
            self.writer.flush()?;
            match self.await_completion(frame)? {
                Completion::Ok => return Ok(()),
                Completion::NeedsRetry => {
                    debug!("firmware busy; re-sending frame after back-off");
                    thread::sleep(RETRY_DELAY);
                }
            }
        }
    }

    fn await_completion(&self, frame: &[u8]) -> Result<Completion, LinkError> {
        loop {
            match self.completions.recv_timeout(COMMAND_TIMEOUT) {
                Ok(completion) => return Ok(completion),
                Err(RecvTimeoutError::Timeout) => {
                    warn!("still waiting for command completion; last frame: {:02x?}", frame);
                }
                Err(RecvTimeoutError::Disconnected) => return Err(LinkError::Disconnected),
            }
        }
    }

    /// Fetches a fresh status from the device.
    pub fn update_status(&mut self) -> Result<Status, LinkError> {
        self.send_command(&protocol::get_status_frame())?;
        Ok(self.status())
    }

    /// Switches the firmware's mode and returns the status it settles on.
    pub fn set_mode(&mut self, mode: Mode) -> Result<Status, LinkError> {
        self.send_command(&protocol::set_mode_frame(mode))?;
        self.update_status()
    }

    /// Uploads the calibration table.
    pub fn calibrate(&mut self, calibration: &Calibration) -> Result<Status, LinkError> {
        self.send_command(&protocol::calibrate_frame(calibration))?;
        self.update_status()
    }

    /// Replays the angle-correction flag. Its semantics live entirely in
    /// the firmware.
    pub fn set_angle_correction(&mut self, enabled: bool) -> Result<Status, LinkError> {
        self.send_command(&protocol::set_angle_correction_frame(enabled))?;
        self.update_status()
    }

    /// Queues one pen position. Blocks while the firmware's position ring
    /// is full; `FAIL` responses are the only back-pressure signal.
    pub fn add_position(&mut self, position: &DrawingPosition) -> Result<(), LinkError> {
        self.send_command(&protocol::add_position_frame(position))
    }

    /// Polls the status until the firmware reports `Idle`.
    pub fn wait_for_idle(&mut self) -> Result<Status, LinkError> {
        loop {
            let status = self.update_status()?;
            if status.mode == Mode::Idle {
                return Ok(status);
            }
            thread::sleep(IDLE_POLL_DELAY);
        }
    }
}

/// What the reader is doing with incoming lines.
enum ReadState {
    Lines,
    /// Collecting the fixed-size block after `STATUS START`.
    StatusBlock(Vec<String>),
}

fn reader_thread<R: Read>(
    mut reader: R,
    completions: Sender<Completion>,
    setup: Sender<()>,
    status: Arc<Mutex<Status>>,
) {
    let mut received: Vec<u8> = vec![];
    let mut chunk = [0; 256];
    let mut state = ReadState::Lines;

    loop {
        let read = match reader.read(&mut chunk) {
            Ok(0) => {
                debug!("device stream closed");
                return;
            }
            Ok(read) => read,
            Err(ref error)
                if error.kind() == ErrorKind::TimedOut
                    || error.kind() == ErrorKind::WouldBlock
                    || error.kind() == ErrorKind::Interrupted =>
            {
                continue;
            }
            Err(error) => {
                debug!("stopped reading from device: {}", error);
                return;
            }
        };
        received.extend_from_slice(&chunk[..read]);

        while let Some(newline) = received.iter().position(|&byte| byte == b'\n') {
            let raw: Vec<u8> = received.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&raw).trim_end().to_string();
            if !handle_line(line, &mut state, &completions, &setup, &status) {
                return;
            }
        }
    }
}

/// Dispatches one device line. Returns false when the host side hung up.
fn handle_line(
    line: String,
    state: &mut ReadState,
    completions: &Sender<Completion>,
    setup: &Sender<()>,
    status: &Arc<Mutex<Status>>,
) -> bool {
    if let ReadState::StatusBlock(ref mut lines) = *state {
        lines.push(line);
        if lines.len() == STATUS_LINE_COUNT {
            match Status::parse_lines(lines) {
                Ok(parsed) => *status.lock().unwrap() = parsed,
                Err(error) => warn!("discarding malformed status block: {}", error),
            }
            *state = ReadState::Lines;
        }
        return true;
    }

    match line.as_str() {
        MSG_OK => completions.send(Completion::Ok).is_ok(),
        MSG_FAIL => completions.send(Completion::NeedsRetry).is_ok(),
        MSG_STATUS_START => {
            *state = ReadState::StatusBlock(Vec::with_capacity(STATUS_LINE_COUNT));
            true
        }
        MSG_SETUP_DONE => {
            info!("device setup done");
            let _ = setup.send(());
            true
        }
        MSG_UNRECOGNIZED_COMMAND => {
            // The device lost frame sync; there is no resync handshake yet,
            // so all we can do is say so.
            warn!("device did not recognize the last command");
            true
        }
        MSG_CHECKSUM_MISMATCH => {
            warn!("device reported a checksum mismatch");
            true
        }
        other => {
            info!("device: {}", other);
            true
        }
    }
}
