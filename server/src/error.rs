use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use loyalty::card::CardError;
use thiserror::Error;

/// Everything a request can fail with. All of these are surfaced to the
/// acting user and recovered by trying again; none are fatal to the process.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Malformed payload")]
    MalformedPayload,

    #[error("Invalid PIN")]
    InvalidPin,

    #[error("Worker authentication required")]
    NotAuthenticated,

    #[error("Client not found")]
    ClientNotFound,

    #[error(transparent)]
    Card(#[from] CardError),

    #[error("Store error: {0}")]
    Store(#[from] redis::RedisError),

    #[error("Internal error: {0}")]
    Internal(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::MalformedPayload => StatusCode::BAD_REQUEST,
            AppError::InvalidPin | AppError::NotAuthenticated => StatusCode::UNAUTHORIZED,
            AppError::ClientNotFound => StatusCode::NOT_FOUND,
            AppError::Card(CardError::InvalidRewardIndex(_)) => StatusCode::NOT_FOUND,
            AppError::Card(_) => StatusCode::CONFLICT,
            AppError::Store(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_errors_map_to_conflict() {
        let response = AppError::Card(CardError::InsufficientPoints).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = AppError::Card(CardError::CooldownActive { hours: 3 }).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_auth_errors_map_to_unauthorized() {
        assert_eq!(
            AppError::InvalidPin.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::NotAuthenticated.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_missing_things_map_to_not_found() {
        assert_eq!(
            AppError::ClientNotFound.into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Card(CardError::InvalidRewardIndex(7))
                .into_response()
                .status(),
            StatusCode::NOT_FOUND
        );
    }
}
