//! Preview controller: drives backend requests and feeds render surfaces.
//!
//! Per panel the controller keeps the bridge to that panel's surface, the
//! id of the most recent backend request and the user-visible status. Only
//! the response to the most recent request is ever rendered; responses for
//! superseded requests or closed panels are dropped when they arrive.

use std::collections::HashMap;
use std::fmt;

use blockview_bridge::{HostBridge, HostPort, ProtocolError, RenderMessage};
use blockview_core::{resolve_model, Model};

use crate::backend::{CanonicalModelParams, ModelBackend, RequestId};
use crate::registry::{PanelId, SessionRegistry};

/// What a panel is currently showing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PreviewStatus {
    /// A model is resolved but the surface has not finished setup.
    Waiting,
    /// A backend request is in flight.
    Loading,
    Showing,
    Unavailable(String),
}

impl fmt::Display for PreviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreviewStatus::Waiting => f.write_str("waiting for renderer"),
            PreviewStatus::Loading => f.write_str("loading"),
            PreviewStatus::Showing => f.write_str("showing"),
            PreviewStatus::Unavailable(reason) => write!(f, "preview unavailable: {}", reason),
        }
    }
}

/// Controller-side state of one preview panel.
pub struct PreviewSession {
    bridge: HostBridge,
    document: Option<String>,
    latest_request: Option<RequestId>,
    pending_model: Option<Model>,
    status: PreviewStatus,
    /// Set once the surface can never render; pins the status to `Unavailable`.
    surface_error: Option<String>,
}

impl PreviewSession {
    fn new(port: HostPort) -> Self {
        Self {
            bridge: HostBridge::new(port),
            document: None,
            latest_request: None,
            pending_model: None,
            status: PreviewStatus::Loading,
            surface_error: None,
        }
    }

    pub fn document(&self) -> Option<&str> {
        self.document.as_deref()
    }

    pub fn status(&self) -> &PreviewStatus {
        &self.status
    }

    /// Update the status unless the surface has failed for good.
    fn set_status(&mut self, status: PreviewStatus) {
        if self.surface_error.is_none() {
            self.status = status;
        }
    }

    fn fail_surface(&mut self, reason: String) {
        self.status = PreviewStatus::Unavailable(reason.clone());
        self.surface_error = Some(reason);
        self.pending_model = None;
    }

    /// Send the held model if the surface is ready.
    fn flush(&mut self, panel: PanelId) -> bool {
        if !self.bridge.is_ready() || self.surface_error.is_some() {
            return false;
        }
        let Some(model) = self.pending_model.take() else {
            return false;
        };
        match self.bridge.send(RenderMessage::render_model(model)) {
            Ok(()) => {
                self.status = PreviewStatus::Showing;
                true
            }
            Err(e) => {
                log::error!("{}: failed to send model: {}", panel, e);
                self.status = PreviewStatus::Unavailable(e.to_string());
                false
            }
        }
    }
}

pub struct PreviewController<B: ModelBackend> {
    backend: B,
    resource_root: String,
    sessions: SessionRegistry<PreviewSession>,
    in_flight: HashMap<RequestId, PanelId>,
    next_request: RequestId,
}

impl<B: ModelBackend> PreviewController<B> {
    /// `resource_root` is the directory that holds `assets/`.
    pub fn new(backend: B, resource_root: impl Into<String>) -> Self {
        Self {
            backend,
            resource_root: resource_root.into(),
            sessions: SessionRegistry::new(),
            in_flight: HashMap::new(),
            next_request: 1,
        }
    }

    #[cfg(test)]
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Create the preview for `panel` (connecting with `connect`) or reveal
    /// the existing one, then render `uri` in it.
    pub fn open_preview(
        &mut self,
        panel: PanelId,
        connect: impl FnOnce() -> HostPort,
        uri: &str,
    ) -> RequestId {
        let (_, created) = self
            .sessions
            .open_or_reveal(panel, || PreviewSession::new(connect()));
        if created {
            log::info!("Opened preview {}", panel);
        }
        self.request(panel, uri)
    }

    /// Re-render an open preview with the model of `uri`. Ignored for
    /// panels without a session.
    pub fn document_changed(&mut self, panel: PanelId, uri: &str) -> Option<RequestId> {
        if self.sessions.get(panel).is_none() {
            log::debug!("No preview open for {}, ignoring document change", panel);
            return None;
        }
        Some(self.request(panel, uri))
    }

    /// Dispose the panel's session. Its in-flight requests are forgotten.
    pub fn close_panel(&mut self, panel: PanelId) -> bool {
        self.in_flight.retain(|_, owner| *owner != panel);
        let closed = self.sessions.dispose(panel).is_some();
        if closed {
            log::info!("Closed preview {}", panel);
        }
        closed
    }

    /// The panel's render surface cannot render (e.g. its setup failed).
    /// The panel stays `Unavailable` until it is closed.
    pub fn surface_failed(&mut self, panel: PanelId, reason: impl Into<String>) {
        if let Some(session) = self.sessions.get_mut(panel) {
            let reason = reason.into();
            log::warn!("{}: render surface unavailable: {}", panel, reason);
            session.fail_surface(reason);
        }
    }

    pub fn status(&self, panel: PanelId) -> Option<&PreviewStatus> {
        self.sessions.get(panel).map(PreviewSession::status)
    }

    pub fn session(&self, panel: PanelId) -> Option<&PreviewSession> {
        self.sessions.get(panel)
    }

    /// Process surface handshakes and backend responses. Returns the number
    /// of models sent to surfaces.
    pub fn pump(&mut self) -> usize {
        let mut sent = 0;

        for (panel, session) in self.sessions.iter_mut() {
            match session.bridge.pump() {
                Ok(_) => {}
                Err(ProtocolError::VersionMismatch { expected, found }) => {
                    session.fail_surface(format!(
                        "renderer protocol {} (expected {})",
                        found, expected
                    ));
                }
                Err(e) => log::error!("{}: bridge error: {}", panel, e),
            }
            if session.flush(panel) {
                sent += 1;
            }
        }

        while let Some(response) = self.backend.poll_response() {
            let Some(panel) = self.in_flight.remove(&response.id) else {
                log::debug!("Discarding response #{}: superseded or preview closed", response.id);
                continue;
            };
            let Some(session) = self.sessions.get_mut(panel) else {
                continue;
            };
            if session.latest_request != Some(response.id) {
                log::debug!("{}: discarding stale response #{}", panel, response.id);
                continue;
            }
            session.latest_request = None;

            match response.result {
                Ok(canonical) => {
                    let resolved = resolve_model(&canonical.model, &self.resource_root);
                    if resolved.dropped > 0 {
                        log::debug!("{}: dropped {} unresolvable faces", panel, resolved.dropped);
                    }
                    if session.surface_error.is_some() {
                        log::debug!(
                            "{}: surface unavailable, not holding response #{}",
                            panel,
                            response.id
                        );
                        continue;
                    }
                    session.pending_model = Some(resolved.model);
                    session.set_status(PreviewStatus::Waiting);
                    if session.flush(panel) {
                        sent += 1;
                    }
                }
                Err(e) => {
                    log::warn!("{}: model request failed: {}", panel, e);
                    session.pending_model = None;
                    session.set_status(PreviewStatus::Unavailable(e.to_string()));
                }
            }
        }

        sent
    }

    fn request(&mut self, panel: PanelId, uri: &str) -> RequestId {
        let id = self.next_request;
        self.next_request += 1;

        if let Some(session) = self.sessions.get_mut(panel) {
            if let Some(previous) = session.latest_request.replace(id) {
                self.in_flight.remove(&previous);
            }
            session.document = Some(uri.to_string());
            session.set_status(PreviewStatus::Loading);
        }
        self.in_flight.insert(id, panel);

        self.backend.request(id, CanonicalModelParams { uri: uri.to_string() });
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendError, BackendResponse, CanonicalModelResponse};
    use blockview_bridge::{channel, SurfaceBridge};
    use blockview_core::{Element, Face, FaceDir};
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    /// Backend whose responses are released by the test, in any order.
    #[derive(Default)]
    struct ManualBackend {
        requests: Vec<(RequestId, String)>,
        ready: VecDeque<BackendResponse>,
    }

    impl ManualBackend {
        fn complete(&mut self, id: RequestId, texture: &str) {
            let model = Model::new(vec![
                Element::new([0.0; 3], [1.0; 3]).with_face(FaceDir::Up, Face::new(texture)),
            ]);
            self.ready.push_back(BackendResponse {
                id,
                result: Ok(CanonicalModelResponse { model }),
            });
        }

        fn fail(&mut self, id: RequestId) {
            self.ready.push_back(BackendResponse {
                id,
                result: Err(BackendError::Failed("timed out".into())),
            });
        }
    }

    impl ModelBackend for ManualBackend {
        fn request(&mut self, id: RequestId, params: CanonicalModelParams) {
            self.requests.push((id, params.uri));
        }

        fn poll_response(&mut self) -> Option<BackendResponse> {
            self.ready.pop_front()
        }
    }

    struct Surface {
        bridge: SurfaceBridge,
        received: Rc<RefCell<Vec<RenderMessage>>>,
    }

    impl Surface {
        fn textures(&self) -> Vec<String> {
            self.received
                .borrow()
                .iter()
                .map(|message| match message {
                    RenderMessage::RenderModel { model } => {
                        model.elements[0].faces.up.as_ref().unwrap().texture.clone()
                    }
                    _ => unreachable!(),
                })
                .collect()
        }
    }

    fn open(
        controller: &mut PreviewController<ManualBackend>,
        panel: PanelId,
        uri: &str,
    ) -> (RequestId, Surface) {
        let (host_port, surface_port) = channel();
        let id = controller.open_preview(panel, || host_port, uri);

        let mut bridge = SurfaceBridge::new(surface_port);
        let received = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&received);
        bridge.on_message(move |message| sink.borrow_mut().push(message));
        (id, Surface { bridge, received })
    }

    const STONE: &str = "/pack/assets/minecraft/textures/block/stone.png";

    #[test]
    fn test_resolves_and_sends_after_ready() {
        let mut controller = PreviewController::new(ManualBackend::default(), "/pack");
        let panel = PanelId(1);
        let (id, mut surface) = open(&mut controller, panel, "stone.json");
        assert_eq!(controller.status(panel), Some(&PreviewStatus::Loading));

        controller.backend_mut().complete(id, "block/stone");
        assert_eq!(controller.pump(), 0);
        assert_eq!(controller.status(panel), Some(&PreviewStatus::Waiting));

        surface.bridge.signal_ready().unwrap();
        assert_eq!(controller.pump(), 1);
        assert_eq!(controller.status(panel), Some(&PreviewStatus::Showing));

        surface.bridge.pump();
        assert_eq!(surface.textures(), vec![STONE.to_string()]);
    }

    #[test]
    fn test_out_of_order_responses_keep_latest() {
        let mut controller = PreviewController::new(ManualBackend::default(), "/pack");
        let panel = PanelId(1);
        let (first, mut surface) = open(&mut controller, panel, "a.json");
        surface.bridge.signal_ready().unwrap();
        controller.pump();

        let second = controller.document_changed(panel, "b.json").unwrap();
        controller.backend_mut().complete(second, "block/b");
        controller.backend_mut().complete(first, "block/a");
        assert_eq!(controller.pump(), 1);

        surface.bridge.pump();
        assert_eq!(
            surface.textures(),
            vec!["/pack/assets/minecraft/textures/block/b.png".to_string()]
        );
        assert_eq!(controller.session(panel).unwrap().document(), Some("b.json"));
    }

    #[test]
    fn test_superseded_response_discarded_even_if_first() {
        let mut controller = PreviewController::new(ManualBackend::default(), "/pack");
        let panel = PanelId(1);
        let (first, mut surface) = open(&mut controller, panel, "a.json");
        surface.bridge.signal_ready().unwrap();
        let second = controller.document_changed(panel, "b.json").unwrap();

        controller.backend_mut().complete(first, "block/a");
        assert_eq!(controller.pump(), 0);
        assert_eq!(controller.status(panel), Some(&PreviewStatus::Loading));

        controller.backend_mut().complete(second, "block/b");
        assert_eq!(controller.pump(), 1);
        surface.bridge.pump();
        assert_eq!(surface.textures().len(), 1);
    }

    #[test]
    fn test_backend_failure_marks_unavailable() {
        let mut controller = PreviewController::new(ManualBackend::default(), "/pack");
        let panel = PanelId(1);
        let (id, mut surface) = open(&mut controller, panel, "broken.json");
        surface.bridge.signal_ready().unwrap();

        controller.backend_mut().fail(id);
        assert_eq!(controller.pump(), 0);
        assert!(matches!(controller.status(panel), Some(PreviewStatus::Unavailable(_))));

        surface.bridge.pump();
        assert!(surface.textures().is_empty());
    }

    #[test]
    fn test_close_discards_in_flight_response() {
        let mut controller = PreviewController::new(ManualBackend::default(), "/pack");
        let panel = PanelId(1);
        let (id, _surface) = open(&mut controller, panel, "a.json");

        assert!(controller.close_panel(panel));
        assert!(!controller.close_panel(panel));

        controller.backend_mut().complete(id, "block/a");
        assert_eq!(controller.pump(), 0);
        assert_eq!(controller.status(panel), None);
        assert_eq!(controller.session_count(), 0);
    }

    #[test]
    fn test_reveal_reuses_session() {
        let mut controller = PreviewController::new(ManualBackend::default(), "/pack");
        let panel = PanelId(1);
        let (_, _surface) = open(&mut controller, panel, "a.json");

        let mut connected_again = false;
        controller.open_preview(
            panel,
            || {
                connected_again = true;
                channel().0
            },
            "b.json",
        );

        assert!(!connected_again);
        assert_eq!(controller.session_count(), 1);
        assert_eq!(controller.backend_mut().requests.len(), 2);
    }

    #[test]
    fn test_document_change_without_session_ignored() {
        let mut controller = PreviewController::new(ManualBackend::default(), "/pack");
        assert_eq!(controller.document_changed(PanelId(9), "a.json"), None);
        assert!(controller.backend_mut().requests.is_empty());
    }

    #[test]
    fn test_version_mismatch_marks_unavailable() {
        let mut controller = PreviewController::new(ManualBackend::default(), "/pack");
        let panel = PanelId(1);
        let (host_port, surface_port) = channel();
        controller.open_preview(panel, || host_port, "a.json");

        surface_port.post(r#"{"Ready":{"version":2}}"#.into()).unwrap();
        controller.pump();
        assert!(matches!(controller.status(panel), Some(PreviewStatus::Unavailable(_))));
    }

    #[test]
    fn test_version_mismatch_survives_answered_request() {
        let mut controller = PreviewController::new(ManualBackend::default(), "/pack");
        let panel = PanelId(1);
        let (host_port, surface_port) = channel();
        let id = controller.open_preview(panel, || host_port, "a.json");

        controller.backend_mut().complete(id, "block/a");
        surface_port.post(r#"{"Ready":{"version":2}}"#.into()).unwrap();
        assert_eq!(controller.pump(), 0);
        assert!(matches!(controller.status(panel), Some(PreviewStatus::Unavailable(_))));

        let next = controller.document_changed(panel, "b.json").unwrap();
        controller.backend_mut().complete(next, "block/b");
        controller.pump();
        assert!(matches!(controller.status(panel), Some(PreviewStatus::Unavailable(_))));
        assert!(surface_port.try_recv().is_none());
    }

    #[test]
    fn test_surface_failure_marks_unavailable() {
        let mut controller = PreviewController::new(ManualBackend::default(), "/pack");
        let panel = PanelId(1);
        let (id, _surface) = open(&mut controller, panel, "a.json");

        controller.surface_failed(panel, "vertex shader failed to compile");
        controller.backend_mut().complete(id, "block/a");
        assert_eq!(controller.pump(), 0);
        assert_eq!(
            controller.status(panel),
            Some(&PreviewStatus::Unavailable("vertex shader failed to compile".into()))
        );

        controller.surface_failed(PanelId(7), "ignored");
        assert_eq!(controller.status(PanelId(7)), None);
    }

    #[test]
    fn test_dropped_faces_never_sent() {
        let mut controller = PreviewController::new(ManualBackend::default(), "/pack");
        let panel = PanelId(1);
        let (id, mut surface) = open(&mut controller, panel, "a.json");
        surface.bridge.signal_ready().unwrap();

        let model = Model::new(vec![Element::new([0.0; 3], [1.0; 3])
            .with_face(FaceDir::Up, Face::new("block/top"))
            .with_face(FaceDir::Down, Face::new("foo:"))]);
        controller.backend_mut().ready.push_back(BackendResponse {
            id,
            result: Ok(CanonicalModelResponse { model }),
        });
        controller.pump();
        surface.bridge.pump();

        let received = surface.received.borrow();
        let RenderMessage::RenderModel { model } = &received[0] else {
            unreachable!()
        };
        assert!(model.elements[0].faces.down.is_none());
        assert!(model.elements[0].faces.up.is_some());
    }
}
