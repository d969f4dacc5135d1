//! In-memory duplex channel standing in for the host/surface boundary.
//!
//! Only serialized strings cross it, so neither side can hand the other a
//! live object. Both ends live on the same event-loop thread. Dropping a
//! port discards its unread inbox; what it already posted stays readable.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::message::{ProtocolError, ProtocolResult};

#[derive(Default)]
struct Shared {
    to_surface: VecDeque<String>,
    to_host: VecDeque<String>,
    host_open: bool,
    surface_open: bool,
}

/// Create a connected pair of ports.
pub fn channel() -> (HostPort, SurfacePort) {
    let shared = Rc::new(RefCell::new(Shared {
        host_open: true,
        surface_open: true,
        ..Default::default()
    }));
    (
        HostPort {
            shared: Rc::clone(&shared),
        },
        SurfacePort { shared },
    )
}

/// Controller end of the channel.
pub struct HostPort {
    shared: Rc<RefCell<Shared>>,
}

impl HostPort {
    pub fn post(&self, payload: String) -> ProtocolResult<()> {
        let mut shared = self.shared.borrow_mut();
        if !shared.surface_open {
            return Err(ProtocolError::Disconnected);
        }
        shared.to_surface.push_back(payload);
        Ok(())
    }

    pub fn try_recv(&self) -> Option<String> {
        self.shared.borrow_mut().to_host.pop_front()
    }

    pub fn is_connected(&self) -> bool {
        self.shared.borrow().surface_open
    }
}

impl Drop for HostPort {
    fn drop(&mut self) {
        let mut shared = self.shared.borrow_mut();
        shared.host_open = false;
        shared.to_host.clear();
    }
}

/// Render surface end of the channel.
pub struct SurfacePort {
    shared: Rc<RefCell<Shared>>,
}

impl SurfacePort {
    pub fn post(&self, payload: String) -> ProtocolResult<()> {
        let mut shared = self.shared.borrow_mut();
        if !shared.host_open {
            return Err(ProtocolError::Disconnected);
        }
        shared.to_host.push_back(payload);
        Ok(())
    }

    pub fn try_recv(&self) -> Option<String> {
        self.shared.borrow_mut().to_surface.pop_front()
    }

    pub fn is_connected(&self) -> bool {
        self.shared.borrow().host_open
    }
}

impl Drop for SurfacePort {
    fn drop(&mut self) {
        let mut shared = self.shared.borrow_mut();
        shared.surface_open = false;
        shared.to_surface.clear();
    }
}
