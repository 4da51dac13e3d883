//! Translation between typed messages and wire text.

use serde_json::Value;
use tracing::trace;

use crate::frame::{FrameError, frame};
use crate::message::{Request, Response, ResponseKind};

/// Errors produced by a [`Codec`].
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CodecError {
    /// The request could not be serialized.
    #[error("failed to encode request: {0}")]
    Encode(String),

    /// The payload is not a well-formed response.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The encoded request does not fit in a frame.
    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// Converts requests to wire text and inbound payloads to responses.
///
/// `encode` produces the complete outbound text, framing included.
/// `decode` receives a payload with the frame header already stripped and
/// returns `Ok(None)` for payloads it does not recognise.
pub trait Codec: Send + Sync {
    /// Serializes `request` for sending.
    fn encode(&self, request: &Request) -> Result<String, CodecError>;

    /// Parses one inbound payload.
    fn decode(&self, payload: &str) -> Result<Option<Response>, CodecError>;
}

/// JSON codec: each message is a JSON object tagged by its `type` field.
#[derive(Debug, Clone, Copy, Default)]
#[non_exhaustive]
pub struct JsonCodec;

impl JsonCodec {
    /// Creates the codec.
    pub const fn new() -> Self {
        Self
    }
}

impl Codec for JsonCodec {
    fn encode(&self, request: &Request) -> Result<String, CodecError> {
        let json = serde_json::to_string(request).map_err(|e| CodecError::Encode(e.to_string()))?;
        trace!(request = request.name(), json_len = json.len(), "encoding request");
        Ok(frame(&json)?)
    }

    fn decode(&self, payload: &str) -> Result<Option<Response>, CodecError> {
        let value: Value =
            serde_json::from_str(payload).map_err(|e| CodecError::Decode(e.to_string()))?;
        let known = value
            .get("type")
            .and_then(Value::as_str)
            .and_then(ResponseKind::from_tag)
            .is_some();
        if !known {
            return Ok(None);
        }
        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| CodecError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{
        ClientListResponse, CloudLogonResponse, GetPasswordResponse, ResponseVariant,
        SlaveRequest, TransactionRequest, TransactionResponse,
    };
    use crate::{HEADER_LEN, START};

    #[test]
    fn encode_emits_framed_json() {
        let req = Request::Slave(SlaveRequest {
            raw_command: "*FW".into(),
        });
        let wire = JsonCodec.encode(&req).unwrap();

        assert_eq!(wire.as_bytes()[0], START);
        let len: usize = wire[1..HEADER_LEN].parse().unwrap();
        assert_eq!(len, wire.len());
        assert_eq!(&wire[HEADER_LEN..], r#"{"type":"slave","raw_command":"*FW"}"#);
    }

    #[test]
    fn encode_rejects_requests_too_large_to_frame() {
        let req = Request::Transaction(TransactionRequest {
            txn_ref: "x".repeat(10_000),
            ..TransactionRequest::default()
        });
        assert!(matches!(JsonCodec.encode(&req), Err(CodecError::Frame(_))));
    }

    #[test]
    fn decode_transaction() {
        let payload = r#"{"type":"transaction","success":true,"response_code":"00","amt_purchase":1250}"#;
        let resp = JsonCodec.decode(payload).unwrap().unwrap();
        match resp {
            Response::Transaction(TransactionResponse {
                success,
                response_code,
                amt_purchase,
                ..
            }) => {
                assert!(success);
                assert_eq!(response_code, "00");
                assert_eq!(amt_purchase, 1250);
            }
            other => panic!("expected Transaction, got {other:?}"),
        }
    }

    #[test]
    fn decode_host_side_responses() {
        let list = JsonCodec
            .decode(r#"{"type":"client_list","clients":[{"name":"POS1","ip_address":"10.0.0.9","port":2011,"state":"connected"}]}"#)
            .unwrap()
            .unwrap();
        let list = ClientListResponse::from_response(list).unwrap();
        assert_eq!(list.clients.len(), 1);
        assert_eq!(list.clients[0].name, "POS1");
        assert_eq!(list.clients[0].port, 2011);

        let password = JsonCodec
            .decode(r#"{"type":"get_password","success":true,"password":"1234"}"#)
            .unwrap()
            .unwrap();
        assert_eq!(GetPasswordResponse::from_response(password).unwrap().password, "1234");

        let cloud = JsonCodec
            .decode(r#"{"type":"cloud_logon","success":false,"response_code":"X1"}"#)
            .unwrap()
            .unwrap();
        let cloud = CloudLogonResponse::from_response(cloud).unwrap();
        assert!(!cloud.success);
        assert_eq!(cloud.response_code, "X1");
    }

    #[test]
    fn unknown_tag_is_unrecognised() {
        assert!(JsonCodec.decode(r#"{"type":"loyalty_points"}"#).unwrap().is_none());
        assert!(JsonCodec.decode(r#"{"lines":[]}"#).unwrap().is_none());
    }

    #[test]
    fn malformed_payload_is_an_error() {
        assert!(matches!(JsonCodec.decode("not json"), Err(CodecError::Decode(_))));
        assert!(matches!(
            JsonCodec.decode(r#"{"type":"receipt","lines":7}"#),
            Err(CodecError::Decode(_))
        ));
    }
}
