//! Settings surface message protocol.
//!
//! Requests are JSON objects discriminated by `action`:
//!
//! ```text
//! {"action":"setSpeed","speed":2.5}  ->  {"success":true}
//! {"action":"getSpeed"}              ->  {"speed":2.5}
//! anything else                      ->  {"success":false,"error":"..."}
//! ```

use serde::{Deserialize, Serialize};

use crate::errors::ProtocolError;

/// Request from the settings surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum Request {
    /// Replace the target speed.
    #[serde(rename = "setSpeed")]
    SetSpeed { speed: f64 },

    /// Report the current target speed.
    #[serde(rename = "getSpeed")]
    GetSpeed,
}

impl Request {
    /// Decode a JSON request.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Malformed`] for invalid JSON, unknown actions,
    /// or missing fields.
    pub fn from_json(json: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(json).map_err(|e| ProtocolError::Malformed(e.to_string()))
    }

    /// Action name, used as a metric label.
    #[must_use]
    pub fn action(&self) -> &'static str {
        match self {
            Request::SetSpeed { .. } => "setSpeed",
            Request::GetSpeed => "getSpeed",
        }
    }
}

/// Reply to the settings surface.
///
/// Untagged: the wire shape alone identifies the variant. `Rejected` is
/// listed first so its `error` field is not swallowed by `Ack` on decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Rejected { success: bool, error: String },
    Ack { success: bool },
    Speed { speed: f64 },
}

impl Response {
    #[must_use]
    pub fn ack() -> Self {
        Response::Ack { success: true }
    }

    #[must_use]
    pub fn speed(speed: f64) -> Self {
        Response::Speed { speed }
    }

    #[must_use]
    pub fn rejected(error: &ProtocolError) -> Self {
        Response::Rejected {
            success: false,
            error: error.to_string(),
        }
    }

    /// Encode for the transport. Serializing these variants cannot fail, but
    /// the fallback keeps the reply well-formed regardless.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|_| r#"{"success":false,"error":"encode failed"}"#.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_set_speed() {
        let req = Request::from_json(r#"{"action":"setSpeed","speed":2.5}"#).unwrap();
        assert_eq!(req, Request::SetSpeed { speed: 2.5 });
        assert_eq!(req.action(), "setSpeed");
    }

    #[test]
    fn test_decode_get_speed() {
        let req = Request::from_json(r#"{"action":"getSpeed"}"#).unwrap();
        assert_eq!(req, Request::GetSpeed);
    }

    #[test]
    fn test_decode_ignores_extra_fields() {
        let req = Request::from_json(r#"{"action":"getSpeed","tabId":7}"#).unwrap();
        assert_eq!(req, Request::GetSpeed);
    }

    #[test]
    fn test_decode_rejects_unknown_and_malformed() {
        assert!(matches!(
            Request::from_json(r#"{"action":"reset"}"#),
            Err(ProtocolError::Malformed(_))
        ));
        assert!(Request::from_json(r#"{"action":"setSpeed"}"#).is_err());
        assert!(Request::from_json(r#"{"action":"setSpeed","speed":"fast"}"#).is_err());
        assert!(Request::from_json("not json").is_err());
    }

    #[test]
    fn test_response_wire_shapes() {
        assert_eq!(Response::ack().to_json(), r#"{"success":true}"#);
        assert_eq!(Response::speed(1.75).to_json(), r#"{"speed":1.75}"#);

        let rejected = Response::rejected(&ProtocolError::InvalidSpeed(0.0));
        let value: serde_json::Value = serde_json::from_str(&rejected.to_json()).unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["error"], "Invalid speed: 0");
    }

    #[test]
    fn test_response_decode_picks_variant() {
        let ack: Response = serde_json::from_str(r#"{"success":true}"#).unwrap();
        assert_eq!(ack, Response::ack());

        let rejected: Response =
            serde_json::from_str(r#"{"success":false,"error":"bad"}"#).unwrap();
        assert!(matches!(rejected, Response::Rejected { .. }));

        let speed: Response = serde_json::from_str(r#"{"speed":3.0}"#).unwrap();
        assert_eq!(speed, Response::speed(3.0));
    }
}
