//! The `{status, message, data}` envelope every endpoint responds with.

use actix_web::{http::StatusCode, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const STATUS_OK: &str = "ok";
pub const STATUS_ERROR: &str = "error";
pub const MSG_SUCCESSFULLY: &str = "successfully";

#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T = Value> {
    pub status: String,
    pub message: String,
    pub data: Option<T>,
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            status: STATUS_OK.to_string(),
            message: MSG_SUCCESSFULLY.to_string(),
            data: Some(data),
        }
    }
}

impl Envelope<Value> {
    pub fn ok_empty() -> Self {
        Self {
            status: STATUS_OK.to_string(),
            message: MSG_SUCCESSFULLY.to_string(),
            data: None,
        }
    }

    pub fn error(message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            status: STATUS_ERROR.to_string(),
            message: message.into(),
            data,
        }
    }
}

/// Successful JSON response with `data` wrapped in the envelope.
pub fn respond<T: Serialize>(status: StatusCode, data: T) -> HttpResponse {
    HttpResponse::build(status).json(Envelope::ok(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_shapes() {
        let ok = serde_json::to_value(Envelope::ok(json!({"id": 1}))).unwrap();
        assert_eq!(
            ok,
            json!({"status": "ok", "message": "successfully", "data": {"id": 1}})
        );

        let empty = serde_json::to_value(Envelope::ok_empty()).unwrap();
        assert_eq!(
            empty,
            json!({"status": "ok", "message": "successfully", "data": null})
        );

        let err = serde_json::to_value(Envelope::error("unauthorized", None)).unwrap();
        assert_eq!(
            err,
            json!({"status": "error", "message": "unauthorized", "data": null})
        );
    }

    #[test]
    fn test_respond_sets_status() {
        let resp = respond(StatusCode::CREATED, json!({"id": 1}));
        assert_eq!(resp.status(), StatusCode::CREATED);
    }
}
