// polarplot/job/src/job.rs
//
// Copyright © 2026 The Polarplot Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! One drawing job: a worker thread that pulls the point stream and fans
//! it out.

use crate::consumer::{Consumer, ConsumerPoint};
use log::{error, info};
use polarplot_toolpath::generator::PathGenerator;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use uuid::Uuid;

/// Breathing room for the caller to hand the job id back before the first
/// consumer side-effects happen.
const WARMUP_DELAY: Duration = Duration::from_millis(50);

pub struct DrawingJob {
    id: Uuid,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl DrawingJob {
    /// Starts the worker thread. Consumers are initialized (and later shut
    /// down) in the order given.
    pub fn spawn(
        id: Uuid,
        generator: PathGenerator,
        consumers: Vec<Box<dyn Consumer>>,
    ) -> DrawingJob {
        let stop = Arc::new(AtomicBool::new(false));
        let worker_stop = Arc::clone(&stop);
        let worker = thread::Builder::new()
            .name(format!("drawing-job-{}", id))
            .spawn(move || run(generator, consumers, worker_stop))
            .expect("failed to spawn job worker");
        DrawingJob { id, stop, worker: Some(worker) }
    }

    #[inline]
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_finished(&self) -> bool {
        self.worker.as_ref().map_or(true, |worker| worker.is_finished())
    }

    /// Requests the worker to stop after the point in flight, optionally
    /// waiting for the shutdown sequence to complete.
    pub fn stop(&mut self, wait: bool) {
        self.stop.store(true, Ordering::Relaxed);
        if wait {
            if let Some(worker) = self.worker.take() {
                let _ = worker.join();
            }
        }
    }

    /// Blocks until the job has run to completion.
    pub fn join(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn run(generator: PathGenerator, mut consumers: Vec<Box<dyn Consumer>>, stop: Arc<AtomicBool>) {
    thread::sleep(WARMUP_DELAY);

    for (index, consumer) in consumers.iter_mut().enumerate() {
        if let Err(err) = consumer.init() {
            error!("consumer {} failed to initialize, aborting job: {}", index, err);
            shutdown(&mut consumers[..index + 1]);
            return;
        }
    }

    let canvas_size = generator.canvas_size();
    for command in generator.generate_points() {
        if stop.load(Ordering::Relaxed) {
            info!("drawing job stopped");
            break;
        }
        let point = ConsumerPoint { command, canvas_size };
        for consumer in consumers.iter_mut() {
            if let Err(err) = consumer.consume(&point) {
                error!("consumer error: {}", err);
            }
        }
    }

    shutdown(&mut consumers);
}

fn shutdown(consumers: &mut [Box<dyn Consumer>]) {
    for consumer in consumers.iter_mut() {
        if let Err(err) = consumer.shutdown() {
            error!("consumer failed to shut down: {}", err);
        }
    }
}
