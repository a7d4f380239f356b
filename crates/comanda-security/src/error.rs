//! Rate Limiting Error Types
//!
//! Structured rejections surfaced to the client when a security check
//! denies an action. Policy violations are decisions, not failures: the
//! caller enforces the denial, and no internal detail leaks to the client.

use std::time::Duration;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Rate limit error types
#[derive(Debug)]
pub enum RateLimitError {
	/// Request rate limited for a specific key space
	RateLimited {
		/// Which key space triggered the limit ("connection" or an action name)
		scope: &'static str,
		/// Time until the window resets
		retry_after: Duration,
	},
	/// Address is on the blocked list
	Blocked,
}

impl std::fmt::Display for RateLimitError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			RateLimitError::RateLimited { scope, retry_after } => {
				write!(f, "Rate limited ({}), retry after {:?}", scope, retry_after)
			}
			RateLimitError::Blocked => write!(f, "Address blocked"),
		}
	}
}

impl std::error::Error for RateLimitError {}

impl IntoResponse for RateLimitError {
	fn into_response(self) -> Response {
		match self {
			RateLimitError::RateLimited { scope, retry_after } => {
				let retry_secs = retry_after.as_secs();
				let body = serde_json::json!({
					"error": {
						"code": "E-RATE-LIMITED",
						"message": "Too many requests. Please slow down.",
						"details": {
							"scope": scope,
							"retryAfter": retry_secs
						}
					}
				});

				let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();

				// Standard rate limit header
				if let Ok(val) = retry_secs.to_string().parse() {
					response.headers_mut().insert("Retry-After", val);
				}

				response
			}
			RateLimitError::Blocked => {
				let body = serde_json::json!({
					"error": {
						"code": "E-ADDR-BLOCKED",
						"message": "Access blocked due to repeated violations."
					}
				});
				(StatusCode::FORBIDDEN, Json(body)).into_response()
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_rate_limited_response() {
		let err = RateLimitError::RateLimited {
			scope: "login",
			retry_after: Duration::from_secs(900),
		};
		let response = err.into_response();
		assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
		assert_eq!(response.headers().get("Retry-After").unwrap(), "900");
	}

	#[test]
	fn test_blocked_response() {
		let response = RateLimitError::Blocked.into_response();
		assert_eq!(response.status(), StatusCode::FORBIDDEN);
	}
}

// vim: ts=4
