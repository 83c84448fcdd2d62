use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use pickup_engine::{CartApiError, CheckoutError, ErrorKind, MatchingError, PickupFlowError, RatingError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(String),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Invalid request. {0}")]
    InvalidRequest(String),
    #[error("{0}")]
    Unprocessable(String),
    #[error("The cart cache is unavailable. Try again shortly. {0}")]
    CacheUnavailable(String),
}

impl ServerError {
    /// Maps an engine error classification onto the matching server error.
    pub fn from_kind<S: ToString>(kind: ErrorKind, message: S) -> Self {
        let message = message.to_string();
        match kind {
            ErrorKind::NotFound | ErrorKind::ItemNotFound => Self::NoRecordFound(message),
            ErrorKind::Conflict => Self::Conflict(message),
            ErrorKind::Validation => Self::InvalidRequest(message),
            ErrorKind::Forbidden => Self::InsufficientPermissions(message),
            ErrorKind::CacheUnavailable => Self::CacheUnavailable(message),
            ErrorKind::EmptyCart | ErrorKind::NoValidItems => Self::Unprocessable(message),
            ErrorKind::CorruptData | ErrorKind::Backend => Self::BackendError(message),
        }
    }
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::AuthenticationError(_) => StatusCode::UNAUTHORIZED,
            Self::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::CacheUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

macro_rules! from_engine_error {
    ($($error:ty),+) => {
        $(
            impl From<$error> for ServerError {
                fn from(e: $error) -> Self {
                    Self::from_kind(e.kind(), e)
                }
            }
        )+
    };
}

from_engine_error!(CartApiError, CheckoutError, PickupFlowError, MatchingError, RatingError);
