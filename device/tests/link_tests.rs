// polarplot/device/tests/link_tests.rs
//
// Copyright © 2026 The Polarplot Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! End-to-end exercises of the link against the simulated firmware.

use polarplot_device::link::DeviceLink;
use polarplot_device::protocol::{Calibration, Command, DrawingPosition, Mode};
use polarplot_device::sim::Simulator;
use std::time::Instant;

fn connect() -> (Simulator, DeviceLink) {
    let _ = env_logger::builder().is_test(true).try_init();
    let (simulator, host_reader, host_writer) = Simulator::spawn();
    let link = DeviceLink::from_parts(host_reader, host_writer).expect("device never came up");
    (simulator, link)
}

#[test]
fn set_mode_sends_exact_frame_and_fetches_status() {
    let (simulator, mut link) = connect();

    let status = link.set_mode(Mode::Draw).expect("set_mode failed");
    assert_eq!(status.mode, Mode::Draw);

    // The SET_MODE frame goes out byte-for-byte, followed by a GET_STATUS.
    let mode_frames = simulator.frames_for(Command::SetMode);
    assert_eq!(mode_frames.len(), 1);
    assert_eq!(
        mode_frames[0],
        b"\x3c\x3c\x3c\x02\x00\x00\x00\x03\x00\x00\x00\x3e\x3e\x3e".to_vec()
    );
    assert_eq!(simulator.frames_for(Command::GetStatus).len(), 1);
}

#[test]
fn calibrate_uploads_the_table() {
    let (simulator, mut link) = connect();

    let calibration = Calibration::default();
    let status = link.calibrate(&calibration).expect("calibrate failed");
    assert!(status.calibrated);
    assert_eq!(status.max_amplitude_pos, calibration.max_amplitude);
    assert_eq!(status.max_angle_pos, calibration.max_angle);
    assert!((status.steps_per_mm - calibration.steps_per_mm).abs() < 1e-6);
    assert_eq!(simulator.frames_for(Command::Calibrate).len(), 1);
}

#[test]
fn failed_add_position_is_resent_unchanged() {
    let (simulator, mut link) = connect();
    simulator.fail_next_add_positions(2);

    let position = DrawingPosition {
        amplitude: 5000,
        angle: 4000,
        pen: 30,
        amplitude_velocity: 1500,
        angle_velocity: 1200,
    };
    let started = Instant::now();
    link.add_position(&position).expect("add_position failed");

    // Two FAILs then an OK: three identical frames, spaced by the back-off,
    // with nothing in between.
    let frames = simulator.frames_for(Command::AddPosition);
    assert_eq!(frames.len(), 3);
    assert_eq!(frames[0], frames[1]);
    assert_eq!(frames[1], frames[2]);
    assert_eq!(simulator.state().frames.len(), 3);
    assert!(started.elapsed().as_millis() >= 200);
}

#[test]
fn retried_position_is_not_double_counted() {
    let (simulator, mut link) = connect();
    link.set_mode(Mode::Draw).unwrap();
    simulator.fail_next_add_positions(2);

    let position = DrawingPosition {
        amplitude: 123,
        angle: 456,
        pen: 30,
        amplitude_velocity: 1500,
        angle_velocity: 1500,
    };
    link.add_position(&position).unwrap();

    let accepted = simulator.state().positions;
    assert_eq!(accepted, vec![position]);
}

#[test]
fn wait_for_idle_polls_through_homing() {
    let (simulator, mut link) = connect();

    let status = link.set_mode(Mode::Home).unwrap();
    assert_eq!(status.mode, Mode::Home);
    let status = link.wait_for_idle().unwrap();
    assert_eq!(status.mode, Mode::Idle);
    assert!(simulator.frames_for(Command::GetStatus).len() >= 2);
}

#[test]
fn angle_correction_flag_is_replayed_verbatim() {
    let (simulator, mut link) = connect();

    let status = link.set_angle_correction(true).unwrap();
    assert!(status.angle_correction);
    let status = link.set_angle_correction(false).unwrap();
    assert!(!status.angle_correction);
    assert_eq!(simulator.frames_for(Command::SetAngleCorrection).len(), 2);
}

#[test]
fn ring_indices_reflect_accepted_positions() {
    let (_simulator, mut link) = connect();
    link.set_mode(Mode::Draw).unwrap();

    for index in 0..5 {
        link.add_position(&DrawingPosition {
            amplitude: index * 100,
            angle: index * 50,
            pen: 30,
            amplitude_velocity: 1500,
            angle_velocity: 1500,
        })
        .unwrap();
    }
    let status = link.update_status().unwrap();
    assert_eq!(status.next_pos_to_place_idx, 5);
    assert_eq!(status.next_pos_to_go_idx, status.next_pos_to_place_idx - 1);
}
