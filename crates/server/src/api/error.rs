//! Mapping of core errors to HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::warn;

use runninghub_core::task::FetchError;
use runninghub_core::workflow::SelectionError;
use runninghub_core::ClientError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Application code from the remote service, when it rejected the call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<&'static str>,
}

/// Error returned by API handlers.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    /// Outputs requested before the task succeeded.
    Conflict(String),
    Client(ClientError),
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Client(ClientError::InvalidRequest(_)) => StatusCode::BAD_REQUEST,
            ApiError::Client(ClientError::Io(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Client(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ClientError> for ApiError {
    fn from(e: ClientError) -> Self {
        ApiError::Client(e)
    }
}

impl From<FetchError> for ApiError {
    fn from(e: FetchError) -> Self {
        match e {
            e @ FetchError::NotSucceeded { .. } => ApiError::Conflict(e.to_string()),
            FetchError::Outputs(client) => ApiError::Client(client),
            FetchError::Io(io) => ApiError::Internal(format!("Failed to prepare output directory: {}", io)),
        }
    }
}

impl From<SelectionError> for ApiError {
    fn from(e: SelectionError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::Client(e) => {
                warn!(error = %e, "Remote call failed");
                let kind = e.rejection_kind();
                ErrorResponse {
                    error: e.to_string(),
                    code: match e {
                        ClientError::Rejected { code, .. } => Some(*code),
                        _ => None,
                    },
                    hint: kind.and_then(|k| k.hint()),
                }
            }
            ApiError::BadRequest(message)
            | ApiError::Conflict(message)
            | ApiError::Internal(message) => ErrorResponse {
                error: message.clone(),
                code: None,
                hint: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use runninghub_core::TaskStatus;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::from(ClientError::Transport("reset".into())).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError::from(ClientError::rejected(380, "no such workflow")).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError::from(ClientError::InvalidRequest("empty".into())).status(),
            StatusCode::BAD_REQUEST
        );
        let not_done = FetchError::NotSucceeded {
            task_id: "T1".into(),
            status: TaskStatus::Running,
        };
        assert_eq!(ApiError::from(not_done).status(), StatusCode::CONFLICT);
    }
}
