use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use campus_forum::ForumError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Forum(#[from] ForumError),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Not signed in: {0}")]
    Unauthenticated(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    fn status(&self) -> StatusCode {
        match self {
            ServerError::Forum(e) => match e {
                ForumError::Validation(_) => StatusCode::BAD_REQUEST,
                ForumError::NotFound(_) => StatusCode::NOT_FOUND,
                ForumError::Authorization(_) | ForumError::ForumBlocked { .. } => {
                    StatusCode::FORBIDDEN
                }
                ForumError::ForumLocked | ForumError::QueryLocked => StatusCode::LOCKED,
                ForumError::Conflict => StatusCode::CONFLICT,
                ForumError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ServerError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "Request failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = serde_json::json!({
            "error": message,
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forum_errors_map_to_statuses() {
        let cases = [
            (ForumError::Validation("empty".into()), StatusCode::BAD_REQUEST),
            (ForumError::NotFound("query"), StatusCode::NOT_FOUND),
            (ForumError::Authorization("no".into()), StatusCode::FORBIDDEN),
            (
                ForumError::ForumBlocked {
                    blocked_by: "Dean".into(),
                },
                StatusCode::FORBIDDEN,
            ),
            (ForumError::ForumLocked, StatusCode::LOCKED),
            (ForumError::QueryLocked, StatusCode::LOCKED),
            (ForumError::Conflict, StatusCode::CONFLICT),
        ];
        for (err, status) in cases {
            assert_eq!(ServerError::from(err).into_response().status(), status);
        }
    }

    #[test]
    fn forum_reason_is_passed_through() {
        let err = ServerError::from(ForumError::ForumBlocked {
            blocked_by: "Dean".into(),
        });
        assert_eq!(err.to_string(), "You have been blocked from the forum by Dean");
    }
}
