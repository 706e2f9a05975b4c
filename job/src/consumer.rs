// polarplot/job/src/consumer.rs
//
// Copyright © 2026 The Polarplot Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The sink interface a drawing job feeds.

use polarplot_device::link::LinkError;
use polarplot_geometry::vector::Vector2D;
use polarplot_toolpath::generator::PointCommand;
use thiserror::Error;

/// One stream element together with the canvas it is relative to.
#[derive(Clone, Copy, Debug)]
pub struct ConsumerPoint {
    pub command: PointCommand,
    pub canvas_size: Vector2D,
}

/// Errors a consumer can surface to the job worker.
#[derive(Debug, Error)]
pub enum ConsumerError {
    #[error("firmware link: {0}")]
    Link(#[from] LinkError),
}

/// A sink for the job's point stream.
///
/// `init` runs before the first point, `shutdown` after the last one (or
/// after a stop request); both happen on the job worker thread, in the
/// order consumers were registered.
pub trait Consumer: Send {
    fn init(&mut self) -> Result<(), ConsumerError>;
    fn consume(&mut self, point: &ConsumerPoint) -> Result<(), ConsumerError>;
    fn shutdown(&mut self) -> Result<(), ConsumerError>;
}
