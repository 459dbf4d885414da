//! Structured error responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::{error, warn};

use crate::error::Error;

/// Body of every error response
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub detail: String,
}

/// An [`Error`] on its way to the client
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, detail: impl Into<String>) -> Self {
        Self {
            status,
            code,
            detail: detail.into(),
        }
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "validation_error", detail)
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", detail)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = match &err {
            Error::InvalidElements(_) => StatusCode::UNPROCESSABLE_ENTITY,
            e if e.is_client_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.code(), err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(code = self.code, "{}", self.detail);
        } else {
            warn!(code = self.code, "{}", self.detail);
        }
        let body = Json(ErrorBody {
            code: self.code,
            detail: self.detail,
        });
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pages::RangeError;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::from(Error::WrongPassword).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::from(Error::InvalidRange(RangeError::BelowLowerBound { page: 0, max_pages: 3 })).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(Error::Conversion("pdftoppm missing".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        let json_err = serde_json::from_str::<Vec<u8>>("{").unwrap_err();
        assert_eq!(
            ApiError::from(Error::InvalidElements(json_err)).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }
}
