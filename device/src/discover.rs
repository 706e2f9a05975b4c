// polarplot/device/src/discover.rs
//
// Copyright © 2026 The Polarplot Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Serial-port autodiscovery.

use log::debug;

/// The port used when discovery finds nothing.
pub const DEFAULT_PORT: &str = "/dev/cu.usbserial-0001";

const PORT_PREFIXES: &[&str] = &["ttyACM", "ttyUSB", "ttyS", "cu.usbserial"];

/// Picks the first enumerated port that looks like a USB serial adapter,
/// falling back to [`DEFAULT_PORT`].
pub fn find_serial_port() -> String {
    let ports = match serialport::available_ports() {
        Ok(ports) => ports,
        Err(error) => {
            debug!("serial port enumeration failed: {}", error);
            return DEFAULT_PORT.to_string();
        }
    };
    for port in ports {
        let name = port.port_name;
        let basename = name.rsplit('/').next().unwrap_or(&name);
        if PORT_PREFIXES.iter().any(|prefix| basename.starts_with(prefix)) {
            return name;
        }
    }
    DEFAULT_PORT.to_string()
}
