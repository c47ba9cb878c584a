//! Mock serial line shared by the integration tests

#![allow(dead_code)]

use rtulink_core::config::LinkConfig;
use rtulink_core::protocol::{crc, DirectionControl, RtuMaster, SerialLine};
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Something observable on the line, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Transmit(bool),
    Write(Vec<u8>),
}

type Responder = Box<dyn FnMut(&[u8]) -> Vec<u8> + Send>;

#[derive(Default)]
pub struct LineState {
    /// Bytes already received and waiting to be read
    pub rx: VecDeque<u8>,
    /// Bytes that become readable at a given instant
    pub delayed: VecDeque<(Instant, Vec<u8>)>,
    /// Simulated slave: reply for each written frame
    pub responder: Option<Responder>,
    pub events: Vec<Event>,
    pub fail_write: bool,
}

impl LineState {
    fn release_due(&mut self) {
        let now = Instant::now();
        while let Some((at, _)) = self.delayed.front() {
            if *at > now {
                break;
            }
            if let Some((_, bytes)) = self.delayed.pop_front() {
                self.rx.extend(bytes);
            }
        }
    }

    pub fn written(&self) -> Vec<Vec<u8>> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Write(bytes) => Some(bytes.clone()),
                _ => None,
            })
            .collect()
    }
}

pub struct MockLine {
    state: Arc<Mutex<LineState>>,
    baud: u32,
}

impl SerialLine for MockLine {
    fn bytes_available(&mut self) -> io::Result<usize> {
        let mut state = self.state.lock().unwrap();
        state.release_due();
        Ok(state.rx.len())
    }

    fn read_byte(&mut self) -> io::Result<u8> {
        let mut state = self.state.lock().unwrap();
        state
            .rx
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no data"))
    }

    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_write {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "Serial write failed"));
        }
        state.events.push(Event::Write(bytes.to_vec()));
        if let Some(responder) = state.responder.as_mut() {
            let reply = responder(bytes);
            state.rx.extend(reply);
        }
        Ok(())
    }

    fn baud_rate(&self) -> u32 {
        self.baud
    }
}

pub struct MockDirection {
    state: Arc<Mutex<LineState>>,
}

impl DirectionControl for MockDirection {
    fn set_transmit(&mut self, transmit: bool) -> io::Result<()> {
        self.state
            .lock()
            .unwrap()
            .events
            .push(Event::Transmit(transmit));
        Ok(())
    }
}

/// Short timeouts so failing receives finish quickly
pub fn fast_config() -> LinkConfig {
    LinkConfig {
        port_name: "mock".to_string(),
        first_byte_timeout_ms: 50,
        inter_byte_timeout_ms: 20,
        poll_interval_ms: 1,
        guard_interval_ms: Some(0),
        ..LinkConfig::default()
    }
}

pub fn mock_master(config: LinkConfig) -> (RtuMaster, Arc<Mutex<LineState>>) {
    let state = Arc::new(Mutex::new(LineState::default()));
    let line = MockLine {
        state: Arc::clone(&state),
        baud: config.baud_rate,
    };
    let direction = MockDirection {
        state: Arc::clone(&state),
    };
    (
        RtuMaster::new(Box::new(line), Box::new(direction), config),
        state,
    )
}

/// A read response with a correct CRC
pub fn response(station: u8, function: u8, data: &[u8]) -> Vec<u8> {
    let mut frame = vec![station, function, data.len() as u8];
    frame.extend_from_slice(data);
    crc::append(&mut frame);
    frame
}

pub fn push_rx(state: &Arc<Mutex<LineState>>, bytes: &[u8]) {
    state.lock().unwrap().rx.extend(bytes.iter().copied());
}

pub fn push_delayed(state: &Arc<Mutex<LineState>>, after: Duration, bytes: &[u8]) {
    state
        .lock()
        .unwrap()
        .delayed
        .push_back((Instant::now() + after, bytes.to_vec()));
}

pub fn set_responder(
    state: &Arc<Mutex<LineState>>,
    responder: impl FnMut(&[u8]) -> Vec<u8> + Send + 'static,
) {
    state.lock().unwrap().responder = Some(Box::new(responder));
}
