use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IntakeError {
	#[error("Invalid job: {0}")]
	InvalidJob(String),
	#[error("Service is not ready. Please try again in a moment.")]
	NotReady,
	#[error("Queue error: {0}")]
	QueueError(String),
	#[error("Audio preparation failed: {0}")]
	PrepareError(String),
	#[error("Inference backend error: {0}")]
	BackendError(String),
	#[error("Internal error: {0}")]
	InternalError(String),
	#[error("Redis error: {0}")]
	RedisError(#[from] redis::RedisError),
	#[error("JSON error: {0}")]
	JsonError(#[from] serde_json::Error),
	#[error("HTTP error: {0}")]
	HttpError(#[from] reqwest::Error),
	#[error("Base64 decode error: {0}")]
	DecodeError(#[from] base64::DecodeError),
	#[error("I/O error: {0}")]
	IoError(#[from] std::io::Error),
}

/// Error body returned to HTTP callers.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
	pub error: String,
	pub error_type: &'static str,
}

impl IntakeError {
	const fn status_code(&self) -> StatusCode {
		match self {
			Self::InvalidJob(_) | Self::DecodeError(_) => StatusCode::BAD_REQUEST,
			Self::NotReady => StatusCode::SERVICE_UNAVAILABLE,
			Self::QueueError(_)
			| Self::PrepareError(_)
			| Self::BackendError(_)
			| Self::InternalError(_)
			| Self::RedisError(_)
			| Self::JsonError(_)
			| Self::HttpError(_)
			| Self::IoError(_) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	const fn error_type(&self) -> &'static str {
		match self {
			Self::InvalidJob(_) => "InvalidJob",
			Self::NotReady => "NotReady",
			Self::QueueError(_) => "QueueError",
			Self::PrepareError(_) => "PrepareError",
			Self::BackendError(_) => "BackendError",
			Self::InternalError(_) => "InternalError",
			Self::RedisError(_) => "RedisError",
			Self::JsonError(_) => "JsonError",
			Self::HttpError(_) => "HttpError",
			Self::DecodeError(_) => "DecodeError",
			Self::IoError(_) => "IoError",
		}
	}
}

impl IntoResponse for IntakeError {
	fn into_response(self) -> Response {
		let body = ErrorResponse {
			error: self.to_string(),
			error_type: self.error_type(),
		};
		(self.status_code(), Json(body)).into_response()
	}
}
