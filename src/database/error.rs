use std::fmt::{self, Display};

use serde_json::json;
use thiserror::Error;
use warp::{
    http::StatusCode,
    reply::{self, Response},
    Reply,
};

#[derive(Debug)]
pub struct QueryError {
    info: String,
}

impl QueryError {
    pub fn new(info: String) -> Self {
        Self { info }
    }
}

impl From<sqlx::Error> for QueryError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::Database(e) => match e.code() {
                Some(code) => Self::new(format!("{e} ({code})")),
                None => Self::new(format!("{e}")),
            },
            sqlx::Error::RowNotFound => Self::new(format!("RowNotFound")),
            sqlx::Error::ColumnNotFound(e) => Self::new(format!("Column not found: {e}")),
            sqlx::Error::ColumnDecode { index, source } => {
                Self::new(format!("Column decode {index} ({source})"))
            }
            sqlx::Error::PoolTimedOut => Self::new(format!("Pool timed out")),
            sqlx::Error::PoolClosed => Self::new(format!("Pool closed")),
            e => Self::new(format!("{e}")),
        }
    }
}

impl Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.info)
    }
}

impl std::error::Error for QueryError {}

/// Kind of integrity constraint a failed statement ran into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    Unique,
    ForeignKey,
    Check,
}

pub fn violated_constraint(error: &sqlx::Error) -> Option<Constraint> {
    let error = error.as_database_error()?;

    if error.is_unique_violation() {
        Some(Constraint::Unique)
    } else if error.is_foreign_key_violation() {
        Some(Constraint::ForeignKey)
    } else if error.is_check_violation() {
        Some(Constraint::Check)
    } else {
        None
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("{0}")]
    DuplicateRelation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("You don't have permission to perform this action")]
    PermissionDenied,

    #[error("Authentication credentials were not provided or are invalid")]
    Unauthorized,

    #[error("Query failed: {0}")]
    Query(#[from] QueryError),
}

impl ServiceError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::Validation { .. } => StatusCode::BAD_REQUEST,
            ServiceError::DuplicateRelation(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::PermissionDenied => StatusCode::FORBIDDEN,
            ServiceError::Unauthorized => StatusCode::UNAUTHORIZED,
            ServiceError::Query(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn body(&self) -> serde_json::Value {
        match self {
            ServiceError::Validation { field, message } => {
                let mut body = serde_json::Map::new();
                body.insert(field.to_string(), json!([message]));
                serde_json::Value::Object(body)
            }
            ServiceError::Query(_) => json!({ "detail": "Internal server error" }),
            e => json!({ "detail": e.to_string() }),
        }
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(value: sqlx::Error) -> Self {
        Self::Query(QueryError::from(value))
    }
}

impl From<ServiceError> for potion::Error {
    fn from(value: ServiceError) -> Self {
        let code = match &value {
            ServiceError::Validation { .. } | ServiceError::DuplicateRelation(_) => 400,
            ServiceError::NotFound(_) => 404,
            ServiceError::PermissionDenied => 403,
            ServiceError::Unauthorized => 401,
            ServiceError::Query(_) => 500,
        };

        potion::Error {
            code,
            info: Some(value.to_string()),
            redirect: None,
        }
    }
}

impl Reply for ServiceError {
    fn into_response(self) -> Response {
        if let ServiceError::Query(e) = &self {
            log::error!("> Query failed: {e}");
        }

        reply::with_status(reply::json(&self.body()), self.status()).into_response()
    }
}
