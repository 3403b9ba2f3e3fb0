use actix_web::http::StatusCode;
use actix_web::{error::ResponseError, HttpResponse};
use derive_more::Display;
use diesel::result::{DatabaseErrorKind, Error as DBError};
use std::convert::From;

#[derive(Debug, Display, PartialEq)]
pub enum ServiceError {
    #[display(fmt = "Internal Server Error")]
    InternalServerError,

    #[display(fmt = "BadRequest: {}", _0)]
    BadRequest(String),

    #[display(fmt = "Conflict: {}", _0)]
    Conflict(String),

    #[display(fmt = "Unauthorized")]
    Unauthorized,

    #[display(fmt = "Forbidden: {}", _0)]
    Forbidden(String),

    #[display(fmt = "Not Found: {}", _0)]
    NotFound(String),
}

// impl ResponseError trait allows to convert our errors into http responses with appropriate data
impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServiceError::Conflict(_) => StatusCode::CONFLICT,
            ServiceError::Unauthorized => StatusCode::UNAUTHORIZED,
            ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            ServiceError::InternalServerError => {
                HttpResponse::InternalServerError().json("Internal Server Error, Please try later")
            }
            ServiceError::BadRequest(ref message) => HttpResponse::BadRequest().json(message),
            ServiceError::Conflict(ref message) => HttpResponse::Conflict().json(message),
            ServiceError::Unauthorized => HttpResponse::Unauthorized().json("Unauthorized"),
            ServiceError::Forbidden(ref message) => HttpResponse::Forbidden().json(message),
            ServiceError::NotFound(ref message) => HttpResponse::NotFound().json(message),
        }
    }
}

impl From<DBError> for ServiceError {
    fn from(error: DBError) -> ServiceError {
        match error {
            DBError::NotFound => ServiceError::NotFound("resource not found".to_string()),
            DBError::DatabaseError(kind, info) => {
                let message = info.details().unwrap_or_else(|| info.message()).to_string();
                match kind {
                    DatabaseErrorKind::UniqueViolation => ServiceError::Conflict(message),
                    DatabaseErrorKind::ForeignKeyViolation => ServiceError::BadRequest(message),
                    _ => {
                        error!("db error: {}", message);
                        ServiceError::InternalServerError
                    }
                }
            }
            _ => {
                error!("db error: {}", error);
                ServiceError::InternalServerError
            }
        }
    }
}

impl From<r2d2::Error> for ServiceError {
    fn from(error: r2d2::Error) -> ServiceError {
        error!("r2d2 connection pool error: {}", error);
        ServiceError::InternalServerError
    }
}

impl From<actix_threadpool::BlockingError<ServiceError>> for ServiceError {
    fn from(error: actix_threadpool::BlockingError<ServiceError>) -> ServiceError {
        match error {
            actix_threadpool::BlockingError::Error(error) => error,
            actix_threadpool::BlockingError::Canceled => {
                error!("actix threadpool task was canceled");
                ServiceError::InternalServerError
            }
        }
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(error: serde_json::Error) -> ServiceError {
        error!("json serialization error: {}", error);
        ServiceError::InternalServerError
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_rows_are_not_found() {
        let error = ServiceError::from(DBError::NotFound);

        assert_eq!(error.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn rolled_back_transactions_are_internal_errors() {
        let error = ServiceError::from(DBError::RollbackTransaction);

        assert_eq!(error, ServiceError::InternalServerError);
    }

    #[test]
    fn blocking_errors_keep_the_original_error() {
        let error = ServiceError::from(actix_threadpool::BlockingError::Error(
            ServiceError::Conflict("already registered".to_string()),
        ));

        assert_eq!(error.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            ServiceError::from(actix_threadpool::BlockingError::Canceled),
            ServiceError::InternalServerError
        );
    }

    #[test]
    fn internal_errors_do_not_leak_details() {
        let response = ServiceError::InternalServerError.error_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
