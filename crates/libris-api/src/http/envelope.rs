//! Response envelope and error mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use libris_server::rpc::{Code, Status};

/// The gateway's uniform response body.
#[derive(Debug, Serialize)]
pub struct HttpResponse {
    pub success: bool,
    pub code: u16,
    pub message: String,
    pub data: Vec<serde_json::Value>,
}

impl HttpResponse {
    pub fn ok(message: impl Into<String>, data: Vec<serde_json::Value>) -> Self {
        Self {
            success: true,
            code: StatusCode::OK.as_u16(),
            message: message.into(),
            data,
        }
    }

    pub fn failure(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            success: false,
            code: code.as_u16(),
            message: message.into(),
            data: Vec::new(),
        }
    }
}

/// A failed request, rendered as the failure envelope.
#[derive(Debug)]
pub struct ApiFailure {
    pub http: StatusCode,
    pub message: String,
}

impl ApiFailure {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            http: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<Status> for ApiFailure {
    fn from(status: Status) -> Self {
        let http = match status.code {
            Code::NotFound => StatusCode::NOT_FOUND,
            Code::AlreadyExists => StatusCode::CONFLICT,
            Code::FailedPrecondition => StatusCode::PRECONDITION_FAILED,
            Code::Aborted | Code::Internal | Code::Unavailable => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            http,
            message: status.message,
        }
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let body = HttpResponse::failure(self.http, self.message);
        (self.http, Json(body)).into_response()
    }
}
