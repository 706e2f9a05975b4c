// polarplot/job/src/manager.rs
//
// Copyright © 2026 The Polarplot Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! At most one drawing job at a time.

use crate::broadcast::{BroadcastConsumer, ObserverSink};
use crate::config::MachineConfig;
use crate::consumer::Consumer;
use crate::firmware::FirmwareConsumer;
use crate::job::DrawingJob;
use crossbeam_channel::Receiver;
use log::info;
use polarplot_device::discover;
use polarplot_device::link::{DeviceLink, LinkError};
use polarplot_geometry::vector::vec2d;
use polarplot_toolpath::generator::{PathGenerator, PathsortConfig, ToolpathConfig};
use serde::Deserialize;
use uuid::Uuid;

/// The job-description fields the pipeline itself understands. Artwork
/// extraction (`svg`, `image`, processor arguments) is the request layer's
/// business; it turns those into paths before handing the generator over.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct JobConfig {
    #[serde(default)]
    pub position: [f64; 2],
    #[serde(default)]
    pub size: [f64; 2],
    /// Degrees.
    #[serde(default)]
    pub rotation: f64,
    #[serde(default)]
    pub toolpath_config: ToolpathConfig,
    #[serde(default)]
    pub pathsort_config: PathsortConfig,
    #[serde(default)]
    pub dryrun: bool,
    #[serde(default)]
    pub angle_correction: bool,
}

impl JobConfig {
    /// Applies the transform-related fields to a generator.
    pub fn configure(&self, generator: &mut PathGenerator) {
        generator.set_offset(vec2d(self.position[0], self.position[1]));
        generator.set_render_size(vec2d(self.size[0], self.size[1]));
        generator.set_rotation(self.rotation);
        generator.set_toolpath_config(self.toolpath_config);
        generator.set_pathsort_config(self.pathsort_config);
    }
}

/// Owns the live job, if any, and the broadcast consumer observers attach
/// to.
pub struct DrawingJobManager {
    machine: MachineConfig,
    current_job: Option<DrawingJob>,
    broadcast: Option<BroadcastConsumer>,
}

impl DrawingJobManager {
    pub fn new(machine: MachineConfig) -> DrawingJobManager {
        DrawingJobManager { machine, current_job: None, broadcast: None }
    }

    #[inline]
    pub fn machine(&self) -> &MachineConfig {
        &self.machine
    }

    pub fn job_id(&self) -> Option<Uuid> {
        self.current_job.as_ref().map(DrawingJob::id)
    }

    /// Stops the live job, if any, and waits for its shutdown.
    pub fn stop(&mut self) {
        if let Some(mut job) = self.current_job.take() {
            info!("stopping drawing job {}", job.id());
            job.stop(true);
        }
    }

    /// Starts a job over the given generator. A live job is stopped first.
    /// Unless this is a dry run, the firmware link is opened here so a
    /// missing machine fails the request instead of a background thread.
    pub fn start_drawing_job(
        &mut self,
        generator: PathGenerator,
        dryrun: bool,
        angle_correction: bool,
    ) -> Result<Uuid, LinkError> {
        self.stop();

        let mut consumers: Vec<Box<dyn Consumer>> = vec![];
        if !dryrun {
            let port = self
                .machine
                .serial_port
                .clone()
                .unwrap_or_else(discover::find_serial_port);
            let link = DeviceLink::open(&port, self.machine.baud_rate)?;
            consumers.push(Box::new(FirmwareConsumer::new(
                link,
                self.machine.calibration,
                angle_correction,
            )));
        }

        let broadcast = BroadcastConsumer::new();
        consumers.push(Box::new(broadcast.clone()));
        self.broadcast = Some(broadcast);

        let id = Uuid::new_v4();
        self.current_job = Some(DrawingJob::spawn(id, generator, consumers));
        info!("started drawing job {} (dryrun: {})", id, dryrun);
        Ok(id)
    }

    /// Subscribes an observer to the live job's broadcast. Returns the
    /// done-signal the caller can park on until the job closes the
    /// observer, or `None` when no job has run yet.
    pub fn add_ws_client(&self, sink: Box<dyn ObserverSink>) -> Option<Receiver<()>> {
        self.broadcast.as_ref().map(|broadcast| broadcast.add_client(sink))
    }
}

impl Drop for DrawingJobManager {
    fn drop(&mut self) {
        self.stop();
    }
}
