//! Response envelope wrapping every reply.
//!
//! Wire form: `{"success":true,"data":...}` or `{"success":false,"error":"..."}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const MALFORMED_BODY: &str = "Malformed request body.";
pub const VALIDATION_FAILED: &str = "Request body failed validation.";
pub const RESPONSE_VALIDATION_FAILED: &str = "Response failed validation.";
pub const INTERNAL_ERROR: &str = "Internal server error.";

/// Outcome of a call as seen on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WireEnvelope", into = "WireEnvelope")]
pub enum Envelope {
    Success(Value),
    Failure(String),
}

#[derive(Serialize, Deserialize)]
struct WireEnvelope {
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl From<Envelope> for WireEnvelope {
    fn from(envelope: Envelope) -> Self {
        match envelope {
            Envelope::Success(data) => Self {
                success: true,
                data: Some(data),
                error: None,
            },
            Envelope::Failure(error) => Self {
                success: false,
                data: None,
                error: Some(error),
            },
        }
    }
}

impl TryFrom<WireEnvelope> for Envelope {
    type Error = String;

    fn try_from(wire: WireEnvelope) -> Result<Self, Self::Error> {
        if wire.success {
            return Ok(Envelope::Success(wire.data.unwrap_or(Value::Null)));
        }

        wire.error
            .map(Envelope::Failure)
            .ok_or_else(|| "failure envelope is missing `error`".to_string())
    }
}

/// Status code plus envelope: the single write a request produces.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    status: StatusCode,
    envelope: Envelope,
}

impl Reply {
    pub fn success(data: Value) -> Self {
        Self {
            status: StatusCode::OK,
            envelope: Envelope::Success(data),
        }
    }

    pub fn failure(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            envelope: Envelope::Failure(message.into()),
        }
    }

    pub fn malformed() -> Self {
        Self::failure(StatusCode::BAD_REQUEST, MALFORMED_BODY)
    }

    pub fn invalid() -> Self {
        Self::failure(StatusCode::BAD_REQUEST, VALIDATION_FAILED)
    }

    pub fn internal_error() -> Self {
        Self::failure(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        (self.status, Json(self.envelope)).into_response()
    }
}
