//! Bridge endpoints with the ready handshake.
//!
//! The surface signals `Ready` once its setup is done. The host side holds
//! back every render message until that signal arrives, then flushes them
//! in send order.

use std::collections::VecDeque;

use crate::message::{
    ProtocolError, ProtocolResult, RenderMessage, SurfaceMessage, PROTOCOL_VERSION,
};
use crate::port::{HostPort, SurfacePort};

type ReadyCallback = Box<dyn FnOnce()>;
type MessageHandler = Box<dyn FnMut(RenderMessage)>;

/// Controller side of the bridge.
pub struct HostBridge {
    port: HostPort,
    ready: bool,
    backlog: VecDeque<RenderMessage>,
    ready_callbacks: Vec<ReadyCallback>,
}

impl HostBridge {
    pub fn new(port: HostPort) -> Self {
        Self {
            port,
            ready: false,
            backlog: VecDeque::new(),
            ready_callbacks: Vec::new(),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Messages waiting for the ready signal.
    pub fn pending(&self) -> usize {
        self.backlog.len()
    }

    /// Fire-and-forget. Before the handshake the message is queued.
    /// Messages that could not be posted stay queued, in order.
    pub fn send(&mut self, message: RenderMessage) -> ProtocolResult<()> {
        self.backlog.push_back(message);
        if !self.ready {
            log::debug!("Render surface not ready, queueing message");
            return Ok(());
        }
        self.flush()
    }

    /// Run `callback` once the surface is ready (immediately if it already is).
    pub fn on_ready(&mut self, callback: impl FnOnce() + 'static) {
        if self.ready {
            callback();
        } else {
            self.ready_callbacks.push(Box::new(callback));
        }
    }

    /// Process everything the surface has posted. Returns the number of
    /// messages handled; malformed payloads are logged and skipped.
    pub fn pump(&mut self) -> ProtocolResult<usize> {
        let mut handled = 0;
        while let Some(payload) = self.port.try_recv() {
            match SurfaceMessage::decode(&payload) {
                Ok(SurfaceMessage::Ready { version }) => {
                    handled += 1;
                    self.handle_ready(version)?;
                }
                Err(e) => log::error!("Rejected surface message: {}", e),
            }
        }
        Ok(handled)
    }

    fn handle_ready(&mut self, version: u32) -> ProtocolResult<()> {
        if version != PROTOCOL_VERSION {
            log::error!(
                "Render surface reported protocol {}, expected {}",
                version,
                PROTOCOL_VERSION
            );
            return Err(ProtocolError::VersionMismatch {
                expected: PROTOCOL_VERSION,
                found: version,
            });
        }
        if self.ready {
            log::warn!("Duplicate ready signal ignored");
            return Ok(());
        }

        self.ready = true;
        log::info!("Render surface ready (protocol {})", version);

        let flushed = self.flush();
        for callback in self.ready_callbacks.drain(..) {
            callback();
        }
        flushed
    }

    /// Post the backlog in order, stopping at the first failed post.
    fn flush(&mut self) -> ProtocolResult<()> {
        while let Some(message) = self.backlog.pop_front() {
            let payload = match message.encode() {
                Ok(payload) => payload,
                Err(e) => {
                    log::error!("Dropping unencodable render message: {}", e);
                    continue;
                }
            };
            if let Err(e) = self.port.post(payload) {
                self.backlog.push_front(message);
                return Err(e);
            }
        }
        Ok(())
    }
}

/// Render surface side of the bridge.
pub struct SurfaceBridge {
    port: SurfacePort,
    ready_sent: bool,
    handler: Option<MessageHandler>,
}

impl SurfaceBridge {
    pub fn new(port: SurfacePort) -> Self {
        Self {
            port,
            ready_sent: false,
            handler: None,
        }
    }

    /// Announce that setup finished. Only the first call posts anything.
    pub fn signal_ready(&mut self) -> ProtocolResult<()> {
        if self.ready_sent {
            return Ok(());
        }
        self.port.post(SurfaceMessage::ready().encode()?)?;
        self.ready_sent = true;
        Ok(())
    }

    pub fn on_message(&mut self, handler: impl FnMut(RenderMessage) + 'static) {
        self.handler = Some(Box::new(handler));
    }

    /// Deliver queued messages to the handler. Without a handler nothing is
    /// consumed. Invalid payloads are logged and dropped.
    pub fn pump(&mut self) -> usize {
        let Some(handler) = self.handler.as_mut() else {
            return 0;
        };

        let mut delivered = 0;
        while let Some(payload) = self.port.try_recv() {
            match RenderMessage::decode(&payload) {
                Ok(message) => {
                    handler(message);
                    delivered += 1;
                }
                Err(e) => log::error!("Rejected render message: {}", e),
            }
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::channel;
    use blockview_core::{Element, Face, FaceDir, Model};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    fn model(texture: &str) -> Model {
        Model::new(vec![
            Element::new([0.0; 3], [1.0; 3]).with_face(FaceDir::Up, Face::new(texture)),
        ])
    }

    fn collect(surface: &mut SurfaceBridge) -> Rc<RefCell<Vec<RenderMessage>>> {
        let received = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&received);
        surface.on_message(move |message| sink.borrow_mut().push(message));
        received
    }

    #[test]
    fn test_send_before_ready_is_queued_then_flushed() {
        let (host_port, surface_port) = channel();
        let mut host = HostBridge::new(host_port);
        let mut surface = SurfaceBridge::new(surface_port);
        let received = collect(&mut surface);

        host.send(RenderMessage::render_model(model("a"))).unwrap();
        host.send(RenderMessage::render_model(model("b"))).unwrap();
        assert_eq!(host.pending(), 2);
        assert_eq!(surface.pump(), 0);

        surface.signal_ready().unwrap();
        assert_eq!(host.pump().unwrap(), 1);
        assert!(host.is_ready());
        assert_eq!(host.pending(), 0);

        assert_eq!(surface.pump(), 2);
        let received = received.borrow();
        assert_eq!(received[0], RenderMessage::render_model(model("a")));
        assert_eq!(received[1], RenderMessage::render_model(model("b")));
    }

    #[test]
    fn test_on_ready_fires_once() {
        let (host_port, surface_port) = channel();
        let mut host = HostBridge::new(host_port);
        let mut surface = SurfaceBridge::new(surface_port);

        let fired = Rc::new(Cell::new(0));
        let counter = Rc::clone(&fired);
        host.on_ready(move || counter.set(counter.get() + 1));

        surface.signal_ready().unwrap();
        surface.signal_ready().unwrap();
        host.pump().unwrap();
        host.pump().unwrap();
        assert_eq!(fired.get(), 1);

        // Registered after the handshake: runs immediately
        let late = Rc::clone(&fired);
        host.on_ready(move || late.set(late.get() + 10));
        assert_eq!(fired.get(), 11);
    }

    #[test]
    fn test_version_mismatch_keeps_host_waiting() {
        let (host_port, surface_port) = channel();
        let mut host = HostBridge::new(host_port);
        surface_port.post(r#"{"Ready":{"version":99}}"#.into()).unwrap();

        let result = host.pump();
        assert!(matches!(
            result,
            Err(ProtocolError::VersionMismatch { expected: 1, found: 99 })
        ));
        assert!(!host.is_ready());
    }

    #[test]
    fn test_surface_skips_malformed_payload() {
        let (host_port, surface_port) = channel();
        let mut host = HostBridge::new(host_port);
        let mut surface = SurfaceBridge::new(surface_port);
        let received = collect(&mut surface);

        surface.signal_ready().unwrap();
        host.pump().unwrap();

        host.port.post(r#"{"RenderModel":{"model":42}}"#.into()).unwrap();
        host.send(RenderMessage::render_model(model("ok"))).unwrap();

        assert_eq!(surface.pump(), 1);
        assert_eq!(received.borrow().len(), 1);
    }

    #[test]
    fn test_host_skips_malformed_payload() {
        let (host_port, surface_port) = channel();
        let mut host = HostBridge::new(host_port);
        surface_port.post("garbage".into()).unwrap();

        assert_eq!(host.pump().unwrap(), 0);
        assert!(!host.is_ready());
    }

    #[test]
    fn test_send_after_surface_closed() {
        let (host_port, surface_port) = channel();
        let mut host = HostBridge::new(host_port);
        let mut surface = SurfaceBridge::new(surface_port);
        surface.signal_ready().unwrap();
        host.pump().unwrap();
        drop(surface);

        let result = host.send(RenderMessage::render_model(model("a")));
        assert!(matches!(result, Err(ProtocolError::Disconnected)));
        assert_eq!(host.pending(), 1);
    }

    #[test]
    fn test_failed_flush_keeps_backlog_and_runs_callbacks() {
        let (host_port, surface_port) = channel();
        let mut host = HostBridge::new(host_port);
        let mut surface = SurfaceBridge::new(surface_port);

        let fired = Rc::new(Cell::new(false));
        let flag = Rc::clone(&fired);
        host.on_ready(move || flag.set(true));
        host.send(RenderMessage::render_model(model("a"))).unwrap();
        host.send(RenderMessage::render_model(model("b"))).unwrap();

        surface.signal_ready().unwrap();
        drop(surface);

        assert!(matches!(host.pump(), Err(ProtocolError::Disconnected)));
        assert!(host.is_ready());
        assert!(fired.get());
        assert_eq!(host.pending(), 2);
    }
}
