use axum::{
    Json,
    http::{StatusCode, header::LOCATION},
    response::{IntoResponse, Response},
};
use feedboard_feed::FeedError;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::auth::AuthError;
use crate::config::ConfigError;

/// Request-level failures
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Login required")]
    Unauthorized,

    #[error("Not found")]
    NotFound,

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Unauthorized | AppError::Feed(FeedError::Unauthorized) => login_redirect(),
            AppError::NotFound | AppError::Feed(FeedError::UnknownFeed(_)) => {
                (StatusCode::NOT_FOUND, self.to_string()).into_response()
            }
            AppError::Feed(FeedError::ReadOnly(_)) => {
                (StatusCode::METHOD_NOT_ALLOWED, self.to_string()).into_response()
            }
            AppError::Auth(err) => {
                let status = match err {
                    AuthError::MissingFields | AuthError::UsernameTaken => StatusCode::BAD_REQUEST,
                    AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                    AuthError::Hash(ref reason) => {
                        error!(reason = %reason, "Password hashing failed");
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                let body = json!({ "success": false, "message": err.to_string() });
                (status, Json(body)).into_response()
            }
            AppError::Feed(err) => {
                warn!(error = %err, "Feed request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
            }
            AppError::Internal(reason) => {
                error!(reason = %reason, "Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
            }
        }
    }
}

/// 302 to the login page
pub fn login_redirect() -> Response {
    (StatusCode::FOUND, [(LOCATION, "/login")]).into_response()
}

/// Startup and shutdown failures of the server itself
#[derive(Error, Debug)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to start feeds: {0}")]
    Feed(#[from] FeedError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_redirects() {
        for err in [AppError::Unauthorized, AppError::Feed(FeedError::Unauthorized)] {
            let response = err.into_response();
            assert_eq!(response.status(), StatusCode::FOUND);
            assert_eq!(response.headers()[LOCATION], "/login");
        }
    }

    #[test]
    fn test_auth_statuses() {
        let cases = [
            (AuthError::MissingFields, StatusCode::BAD_REQUEST),
            (AuthError::UsernameTaken, StatusCode::BAD_REQUEST),
            (AuthError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (AuthError::Hash("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).into_response().status(), status);
        }
    }

    #[test]
    fn test_unknown_feed_is_not_found() {
        let response = AppError::from(FeedError::UnknownFeed("pie".into())).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
