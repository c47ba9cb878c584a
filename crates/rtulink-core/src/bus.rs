//! Shared access to one RTU line
//!
//! A half-duplex bus carries one transaction at a time. `SharedBus` lets
//! several threads poll different stations through the same master while
//! holding the lock for a whole request/response cycle.

use std::sync::{Arc, Mutex};

use crate::protocol::{FrameError, ProtocolError, ReadRequest, RtuMaster, Value, ValueKind};

/// Clonable handle to a master guarded by a mutex
#[derive(Clone)]
pub struct SharedBus {
    master: Arc<Mutex<RtuMaster>>,
}

impl SharedBus {
    /// Take ownership of `master`
    pub fn new(master: RtuMaster) -> Self {
        Self {
            master: Arc::new(Mutex::new(master)),
        }
    }

    /// Run `f` with exclusive use of the line
    pub fn transact<T>(&self, f: impl FnOnce(&mut RtuMaster) -> T) -> Result<T, ProtocolError> {
        let mut master = self.master.lock().map_err(|_| ProtocolError::BusPoisoned)?;
        Ok(f(&mut master))
    }

    /// Send `request` and return the reply's data region
    pub fn read(&self, request: &ReadRequest) -> Result<Vec<u8>, ProtocolError> {
        self.transact(|m| m.read(request))?
            .map_err(ProtocolError::from)
    }

    /// Send `request` and decode the reply as `kind`
    pub fn query(&self, request: &ReadRequest, kind: ValueKind) -> Result<Value, ProtocolError> {
        self.transact(|m| m.query(request, kind))?
            .map_err(ProtocolError::from)
    }

    /// Error recorded by the most recent transaction on this bus
    pub fn last_error(&self) -> Result<Option<FrameError>, ProtocolError> {
        self.transact(|m| m.last_error().cloned())
    }
}
