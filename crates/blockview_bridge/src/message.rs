//! Wire messages exchanged between the controller and the render surface.
//!
//! Both directions are externally tagged JSON objects, e.g.
//! `{"RenderModel":{"model":{...}}}` and `{"Ready":{"version":1}}`.
//! Decoding validates the payload; nothing malformed reaches the renderer.

use blockview_core::{Model, ModelError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Version the surface announces in its ready signal.
pub const PROTOCOL_VERSION: u32 = 1;

/// Errors raised by the bridge.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("invalid model: {0}")]
    InvalidModel(#[from] ModelError),

    #[error("render surface speaks protocol version {found}, expected {expected}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("the other end of the bridge is closed")]
    Disconnected,
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Controller → surface.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum RenderMessage {
    /// Draw `model`. Every face texture is already a resolved URI.
    RenderModel { model: Model },
}

impl RenderMessage {
    pub fn render_model(model: Model) -> Self {
        RenderMessage::RenderModel { model }
    }

    pub fn encode(&self) -> ProtocolResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse and validate a payload received from the controller.
    pub fn decode(payload: &str) -> ProtocolResult<Self> {
        let message: RenderMessage = serde_json::from_str(payload)?;
        match &message {
            RenderMessage::RenderModel { model } => model.validate()?,
        }
        Ok(message)
    }
}

/// Surface → controller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum SurfaceMessage {
    /// One-time setup finished; the surface accepts render messages.
    Ready { version: u32 },
}

impl SurfaceMessage {
    pub fn ready() -> Self {
        SurfaceMessage::Ready {
            version: PROTOCOL_VERSION,
        }
    }

    pub fn encode(&self) -> ProtocolResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(payload: &str) -> ProtocolResult<Self> {
        Ok(serde_json::from_str(payload)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockview_core::{Element, Face, FaceDir};

    fn stone() -> Model {
        Model::new(vec![Element::new([0.0; 3], [1.0; 3])
            .with_face(FaceDir::Up, Face::new("/root/assets/minecraft/textures/blocks/stone.png"))])
    }

    #[test]
    fn test_render_model_wire_shape() {
        let json = RenderMessage::render_model(stone()).encode().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        let model = &value["RenderModel"]["model"];
        assert!(model["elements"].is_array());
        assert_eq!(
            model["elements"][0]["faces"]["up"]["texture"],
            "/root/assets/minecraft/textures/blocks/stone.png"
        );
    }

    #[test]
    fn test_decode_round_trip() {
        let message = RenderMessage::render_model(stone());
        let decoded = RenderMessage::decode(&message.encode().unwrap()).unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn test_decode_rejects_unknown_variant() {
        let result = RenderMessage::decode(r#"{"SetCamera":{"yaw":1.0}}"#);
        assert!(matches!(result, Err(ProtocolError::Malformed(_))));
    }

    #[test]
    fn test_decode_rejects_missing_fields() {
        let json = r#"{"RenderModel":{"model":{"elements":[{"from":[0,0,0]}]}}}"#;
        let result = RenderMessage::decode(json);
        assert!(matches!(result, Err(ProtocolError::Malformed(_))));

        let result = RenderMessage::decode("not json");
        assert!(matches!(result, Err(ProtocolError::Malformed(_))));
    }

    #[test]
    fn test_ready_wire_shape() {
        assert_eq!(SurfaceMessage::ready().encode().unwrap(), r#"{"Ready":{"version":1}}"#);
        assert_eq!(
            SurfaceMessage::decode(r#"{"Ready":{"version":7}}"#).unwrap(),
            SurfaceMessage::Ready { version: 7 }
        );
    }
}
