use axum::http::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Email already exists")]
    EmailAlreadyExists,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Either email format is invalid or password is empty")]
    InvalidEmailOrPassword,
    #[error("Uploaded file has no rows")]
    EmptyUpload,
    #[error("Malformed CSV: {0}")]
    MalformedCsv(String),
    #[error("Uploaded table has no numeric columns")]
    NoNumericFeatures,
    #[error("Feature mismatch: model expects {expected:?}, upload has {found:?}")]
    FeatureMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },
    #[error("Feature matrix has {found} columns but {expected} feature names")]
    RaggedFeatures { expected: usize, found: usize },
    #[error("Training data has a single class")]
    SingleClass,
    #[error("Column not found: {0}")]
    ColumnNotFound(String),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::EmailAlreadyExists => StatusCode::CONFLICT,
            Error::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Error::InvalidEmailOrPassword => StatusCode::BAD_REQUEST,
            Error::EmptyUpload => StatusCode::BAD_REQUEST,
            Error::MalformedCsv(_) => StatusCode::BAD_REQUEST,
            Error::NoNumericFeatures => StatusCode::UNPROCESSABLE_ENTITY,
            Error::FeatureMismatch { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Error::RaggedFeatures { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::SingleClass => StatusCode::BAD_REQUEST,
            Error::ColumnNotFound(_) => StatusCode::BAD_REQUEST,
        }
    }

    pub fn into_response_tuple(self) -> (StatusCode, String) {
        (self.status_code(), self.to_string())
    }
}
