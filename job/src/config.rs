// polarplot/job/src/config.rs
//
// Copyright © 2026 The Polarplot Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Per-machine configuration: canvas geometry and the calibration table.

use polarplot_device::link::DEFAULT_BAUD_RATE;
use polarplot_device::protocol::Calibration;
use polarplot_geometry::vector::{vec2d, Vector2D};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Everything the host needs to know about the machine it drives.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct MachineConfig {
    /// Drawable canvas, in mm.
    pub canvas_size: [f64; 2],
    /// Full reachable area, in mm.
    pub full_canvas_size: [f64; 2],
    /// Footprint of the plotter base in the upper-right corner, in mm.
    pub plotter_base_size: [f64; 2],
    /// Serial port override; autodiscovered when absent.
    pub serial_port: Option<String>,
    pub baud_rate: u32,
    pub calibration: Calibration,
}

impl Default for MachineConfig {
    fn default() -> MachineConfig {
        MachineConfig {
            canvas_size: [500.0, 500.0],
            full_canvas_size: [600.0, 600.0],
            plotter_base_size: [120.0, 80.0],
            serial_port: None,
            baud_rate: DEFAULT_BAUD_RATE,
            calibration: Calibration::default(),
        }
    }
}

impl MachineConfig {
    /// Loads a TOML config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<MachineConfig, ConfigError> {
        Ok(toml::from_str(&fs::read_to_string(path)?)?)
    }

    #[inline]
    pub fn canvas_size(&self) -> Vector2D {
        vec2d(self.canvas_size[0], self.canvas_size[1])
    }

    #[inline]
    pub fn full_canvas_size(&self) -> Vector2D {
        vec2d(self.full_canvas_size[0], self.full_canvas_size[1])
    }

    #[inline]
    pub fn plotter_base_size(&self) -> Vector2D {
        vec2d(self.plotter_base_size[0], self.plotter_base_size[1])
    }
}

#[cfg(test)]
mod tests {
    use super::MachineConfig;

    #[test]
    fn partial_config_keeps_defaults() {
        let config: MachineConfig = toml::from_str(
            r#"
            canvas_size = [400.0, 300.0]

            [calibration]
            travelable_distance_steps = 1000
            steps_per_mm = 80.0
            min_amplitude = 10
            max_amplitude = 2000
            max_angle = 900
            max_encoder = 100
            "#,
        )
        .unwrap();
        assert_eq!(config.canvas_size, [400.0, 300.0]);
        assert_eq!(config.baud_rate, 115_200);
        assert_eq!(config.calibration.max_amplitude, 2000);
    }

    #[test]
    fn default_calibration_matches_the_machine_table() {
        let config = MachineConfig::default();
        assert_eq!(config.calibration.travelable_distance_steps, 37713);
        assert!((config.calibration.steps_per_mm - 79.23).abs() < 1e-6);
    }
}
