// polarplot/job/src/broadcast.rs
//
// Copyright © 2026 The Polarplot Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The consumer that keeps observers in the picture.
//!
//! Every completed path is snapshotted and the full list-of-paths-to-date
//! is pushed to all subscribed observers as JSON. Observers can join
//! mid-job (they immediately receive the current snapshot), and a failing
//! observer is dropped without disturbing the rest.

use crate::consumer::{Consumer, ConsumerError, ConsumerPoint};
use crossbeam_channel::{bounded, Receiver, Sender};
use fxhash::FxHashMap;
use log::warn;
use polarplot_toolpath::generator::PointCommand;
use serde::Serialize;
use std::io;
use std::net::TcpStream;
use std::sync::{Arc, Mutex};
use tungstenite::{Message, WebSocket};

/// Where broadcast messages go. The production implementation is a
/// WebSocket; tests plug in their own.
pub trait ObserverSink: Send {
    fn send_text(&mut self, message: &str) -> io::Result<()>;
    fn shutdown(&mut self);
}

impl ObserverSink for WebSocket<TcpStream> {
    fn send_text(&mut self, message: &str) -> io::Result<()> {
        self.send(Message::Text(message.to_string()))
            .map_err(|error| io::Error::new(io::ErrorKind::Other, error))
    }

    fn shutdown(&mut self) {
        let _ = self.close(None);
        let _ = self.flush();
    }
}

#[derive(Serialize)]
struct UpdateMessage<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    payload: &'a [Vec<(f64, f64)>],
}

struct ObserverConnection {
    sink: Box<dyn ObserverSink>,
    done: Sender<()>,
}

impl ObserverConnection {
    fn close(&mut self) {
        let _ = self.done.send(());
        self.sink.shutdown();
    }
}

struct BroadcastState {
    drawn_paths: Vec<Vec<(f64, f64)>>,
    current_path: Vec<(f64, f64)>,
    observers: FxHashMap<u64, ObserverConnection>,
    next_observer_id: u64,
}

impl BroadcastState {
    fn update_message(&self) -> String {
        serde_json::to_string(&UpdateMessage { kind: "update", payload: &self.drawn_paths })
            .expect("update message serialization cannot fail")
    }

    fn broadcast(&mut self, message: &str) {
        let mut failed = vec![];
        for (&id, connection) in self.observers.iter_mut() {
            if let Err(error) = connection.sink.send_text(message) {
                warn!("dropping observer {}: {}", id, error);
                failed.push(id);
            }
        }
        for id in failed {
            if let Some(mut connection) = self.observers.remove(&id) {
                connection.close();
            }
        }
    }
}

/// The observer-broadcast consumer. Clones share the same state, so the
/// manager can keep a handle for late subscriptions while the job owns the
/// consumer slot.
#[derive(Clone)]
pub struct BroadcastConsumer {
    shared: Arc<Mutex<BroadcastState>>,
}

impl BroadcastConsumer {
    pub fn new() -> BroadcastConsumer {
        BroadcastConsumer {
            shared: Arc::new(Mutex::new(BroadcastState {
                drawn_paths: vec![],
                current_path: vec![],
                observers: FxHashMap::default(),
                next_observer_id: 0,
            })),
        }
    }

    /// Subscribes an observer. It immediately receives the current
    /// snapshot; the returned channel fires when the observer is closed at
    /// job end (or dropped on failure).
    pub fn add_client(&self, sink: Box<dyn ObserverSink>) -> Receiver<()> {
        let (done_sender, done_receiver) = bounded(1);
        let mut state = self.shared.lock().unwrap();
        let message = state.update_message();
        let mut connection = ObserverConnection { sink, done: done_sender };
        match connection.sink.send_text(&message) {
            Ok(()) => {
                let id = state.next_observer_id;
                state.next_observer_id += 1;
                state.observers.insert(id, connection);
            }
            Err(error) => {
                warn!("observer refused its first snapshot: {}", error);
                connection.close();
            }
        }
        done_receiver
    }

    /// The paths completed so far, in world millimeters.
    pub fn drawn_paths(&self) -> Vec<Vec<(f64, f64)>> {
        self.shared.lock().unwrap().drawn_paths.clone()
    }

    pub fn observer_count(&self) -> usize {
        self.shared.lock().unwrap().observers.len()
    }
}

impl Default for BroadcastConsumer {
    fn default() -> BroadcastConsumer {
        BroadcastConsumer::new()
    }
}

impl Consumer for BroadcastConsumer {
    fn init(&mut self) -> Result<(), ConsumerError> {
        Ok(())
    }

    fn consume(&mut self, point: &ConsumerPoint) -> Result<(), ConsumerError> {
        let mut state = self.shared.lock().unwrap();
        match point.command {
            PointCommand::Point(world) => state.current_path.push((world.x(), world.y())),
            // Closing the pen path is the firmware's business; observers
            // already hold the full polyline.
            PointCommand::ClosePath => {}
            PointCommand::PathEnd => {
                let finished = std::mem::replace(&mut state.current_path, vec![]);
                state.drawn_paths.push(finished);
                let message = state.update_message();
                state.broadcast(&message);
            }
            PointCommand::DrawingEnd => {}
        }
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), ConsumerError> {
        let mut state = self.shared.lock().unwrap();
        let message = state.update_message();
        state.broadcast(&message);
        let observers: Vec<u64> = state.observers.keys().cloned().collect();
        for id in observers {
            if let Some(mut connection) = state.observers.remove(&id) {
                connection.close();
            }
        }
        Ok(())
    }
}
