use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Serialize, Serializer};
use serde_json::json;
use thiserror::Error;

use crate::locale::{th, Msg};

#[derive(Error, Debug)]
pub enum DeskError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Duplicate entry: {0}")]
    Duplicate(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DeskError {
    /// Maps a unique-constraint violation to the friendly duplicate message,
    /// anything else passes through as a database error.
    pub fn from_db_write(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_unique_violation() {
                return DeskError::Duplicate(th(Msg::DuplicateEntry).to_string());
            }
        }
        DeskError::Database(e)
    }
}

impl Serialize for DeskError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.to_string().as_ref())
    }
}

pub type DeskResult<T> = Result<T, DeskError>;

impl IntoResponse for DeskError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            DeskError::Database(ref e) => {
                tracing::error!("Database Error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    th(Msg::DbError).to_string(),
                )
            }
            DeskError::Auth(msg) => (StatusCode::UNAUTHORIZED, msg),
            DeskError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            DeskError::Duplicate(msg) => (StatusCode::CONFLICT, msg),
            DeskError::Internal(msg) => {
                tracing::error!("Internal Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    th(Msg::InternalError).to_string(),
                )
            }
            DeskError::Io(e) => {
                tracing::error!("IO Error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    th(Msg::FileReadError).to_string(),
                )
            }
            DeskError::Spreadsheet(e) => {
                tracing::error!("Spreadsheet Error: {:?}", e);
                (StatusCode::BAD_REQUEST, th(Msg::FileReadError).to_string())
            }
            _ => {
                tracing::error!("Unhandled Error: {:?}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    th(Msg::InternalError).to_string(),
                )
            }
        };

        let body = Json(json!({
            "success": false,
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
