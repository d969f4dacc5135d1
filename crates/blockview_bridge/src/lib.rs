//! Blockview Bridge - message passing between the preview controller and
//! the sandboxed render surface.
//!
//! The two sides never share objects. The controller owns a [`HostBridge`],
//! the surface owns a [`SurfaceBridge`], and only JSON strings travel between
//! them over the port pair returned by [`channel`].
//!
//! # Example
//!
//! ```ignore
//! let (host_port, surface_port) = blockview_bridge::channel();
//! let mut host = HostBridge::new(host_port);
//! let mut surface = SurfaceBridge::new(surface_port);
//!
//! surface.on_message(|message| println!("{:?}", message));
//! surface.signal_ready()?;
//! host.pump()?;
//! host.send(RenderMessage::render_model(model))?;
//! surface.pump();
//! ```

pub mod endpoint;
pub mod message;
pub mod port;

pub use endpoint::{HostBridge, SurfaceBridge};
pub use message::{ProtocolError, ProtocolResult, RenderMessage, SurfaceMessage, PROTOCOL_VERSION};
pub use port::{channel, HostPort, SurfacePort};
