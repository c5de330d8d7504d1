//! Unified error taxonomy shared across the gRPC and HTTP transports.

use serde::{Deserialize, Serialize};

/// Domain error classes. Each variant knows how to render itself as both a
/// gRPC status and an HTTP status code so handlers never hand-roll the
/// mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    InvalidArgument,
    Unauthenticated,
    NotFound,
    PolicyRejected,
    Timeout,
    Internal,
}

impl ErrorCode {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidArgument => 200, // domain errors stay 200, wrapped in the ok/error envelope
            Self::Unauthenticated => 200,
            Self::NotFound => 200,
            Self::PolicyRejected => 200,
            Self::Timeout => 200,
            Self::Internal => 200,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::NotFound => "NOT_FOUND",
            Self::PolicyRejected => "POLICY_REJECTED",
            Self::Timeout => "TIMEOUT",
            Self::Internal => "INTERNAL",
        }
    }

    /// Convert this error code into a [`tonic::Status`] with the given message.
    pub fn to_grpc_status(&self, message: impl Into<String>) -> tonic::Status {
        let code = match self {
            Self::InvalidArgument => tonic::Code::InvalidArgument,
            Self::Unauthenticated => tonic::Code::Unauthenticated,
            Self::NotFound => tonic::Code::NotFound,
            Self::PolicyRejected => tonic::Code::FailedPrecondition,
            Self::Timeout => tonic::Code::DeadlineExceeded,
            Self::Internal => tonic::Code::Internal,
        };
        tonic::Status::new(code, message)
    }
}

/// Domain error carrying both a [`ErrorCode`] and a human-readable reason.
/// This is what subsystem functions return; transports translate it at
/// the boundary rather than subsystems depending on `tonic`/`axum` types.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{code:?}: {message}")]
pub struct DomainError {
    pub code: ErrorCode,
    pub message: String,
}

impl DomainError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidArgument, message)
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthenticated, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn policy_rejected(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::PolicyRejected, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Timeout, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, message)
    }
}

impl From<DomainError> for tonic::Status {
    fn from(e: DomainError) -> Self {
        e.code.to_grpc_status(e.message)
    }
}

/// Envelope for HTTP responses carrying a domain error: status stays
/// 200, the error surfaces in the JSON body. 4xx/5xx are reserved for
/// malformed requests axum rejects before a handler ever runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub ok: bool,
    pub error: String,
}

impl axum::response::IntoResponse for DomainError {
    fn into_response(self) -> axum::response::Response {
        let body = ErrorEnvelope { ok: false, error: format!("{}: {}", self.code.as_str(), self.message) };
        (axum::http::StatusCode::OK, axum::Json(body)).into_response()
    }
}
