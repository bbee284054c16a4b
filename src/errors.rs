use axum::{http::StatusCode, response::IntoResponse, Json};

use crate::JsonResponse;

#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unauthenticated(&'static str),
    #[error("Forbidden")]
    Forbidden,
    #[error("{0}")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(&'static str),
    #[error("Database error: {0}")]
    Storage(sqlx::Error),
    #[error("Internal Server Error")]
    ServerError,
}

#[derive(serde::Serialize, serde::Deserialize, Debug)]
pub struct RequestErrorJsonWrapper {
    pub errors: RequestErrorJson,
}

#[derive(serde::Serialize, serde::Deserialize, Debug)]
pub struct RequestErrorJson {
    pub kind: String,
    pub body: Vec<String>,
}

impl RequestErrorJsonWrapper {
    pub fn new(kind: &str, error: &str) -> RequestErrorJsonWrapper {
        RequestErrorJsonWrapper {
            errors: RequestErrorJson {
                kind: kind.to_string(),
                body: vec![error.to_string()],
            },
        }
    }
}

impl From<sqlx::Error> for RequestError {
    fn from(value: sqlx::Error) -> Self {
        if let sqlx::Error::Database(e) = &value {
            let message = e.message();
            if message.contains("UNIQUE constraint failed") {
                return Self::Conflict("Resource already exists");
            }
            if message.contains("database is locked") {
                return Self::Conflict("Resource is busy");
            }
        }
        Self::Storage(value)
    }
}

impl From<validator::ValidationErrors> for RequestError {
    fn from(value: validator::ValidationErrors) -> Self {
        Self::Validation(value.to_string())
    }
}

impl IntoResponse for RequestError {
    fn into_response(self) -> axum::response::Response {
        self.to_json_response().into_response()
    }
}

impl RequestError {
    pub fn kind(&self) -> &'static str {
        match self {
            RequestError::Validation(_) => "validation_error",
            RequestError::Unauthenticated(_) => "unauthenticated",
            RequestError::Forbidden => "forbidden",
            RequestError::NotFound(_) => "not_found",
            RequestError::Conflict(_) => "conflict",
            RequestError::Storage(_) => "storage_error",
            RequestError::ServerError => "server_error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            RequestError::Validation(_) => StatusCode::BAD_REQUEST,
            RequestError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            RequestError::Forbidden => StatusCode::FORBIDDEN,
            RequestError::NotFound(_) => StatusCode::NOT_FOUND,
            RequestError::Conflict(_) => StatusCode::CONFLICT,
            RequestError::Storage(_) | RequestError::ServerError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn to_json_response(&self) -> JsonResponse<RequestErrorJsonWrapper> {
        let message = match self {
            RequestError::Storage(e) => {
                tracing::error!(error = %e, "database error");
                "Internal Server Error".to_string()
            }
            other => other.to_string(),
        };
        (
            self.status_code(),
            Json(RequestErrorJsonWrapper::new(self.kind(), &message)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_error_kind() {
        assert_eq!(
            RequestError::Validation("bad".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            RequestError::Unauthenticated("no").status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            RequestError::NotFound("gone").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            RequestError::Conflict("dup").status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            RequestError::Storage(sqlx::Error::RowNotFound).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn storage_errors_do_not_leak_details() {
        let (status, Json(body)) =
            RequestError::Storage(sqlx::Error::PoolTimedOut).to_json_response();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.errors.kind, "storage_error");
        assert_eq!(body.errors.body, vec!["Internal Server Error".to_string()]);
    }

    #[test]
    fn server_errors_have_their_own_kind() {
        let (status, Json(body)) = RequestError::ServerError.to_json_response();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.errors.kind, "server_error");
        assert_eq!(RequestError::Storage(sqlx::Error::RowNotFound).kind(), "storage_error");
    }
}
