//! Common error type shared by the engine and the adapters.

use axum::{Json, http::StatusCode, response::IntoResponse};

pub type ClResult<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
	/// Input was rejected before any action was taken
	ValidationError(String),
	/// A durable collaborator (audit trail, session store) is unreachable
	ServiceUnavailable(String),
}

impl std::fmt::Display for Error {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		match self {
			Error::ValidationError(msg) => write!(f, "validation error: {}", msg),
			Error::ServiceUnavailable(msg) => write!(f, "service unavailable: {}", msg),
		}
	}
}

impl std::error::Error for Error {}

impl IntoResponse for Error {
	fn into_response(self) -> axum::response::Response {
		match self {
			Error::ValidationError(msg) => {
				let body = serde_json::json!({
					"error": { "code": "E-VALIDATION", "message": msg }
				});
				(StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response()
			}
			// Backend detail stays out of the response body
			Error::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE.into_response(),
		}
	}
}


// vim: ts=4
