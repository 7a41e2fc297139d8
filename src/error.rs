use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    UnsupportedChangeType,
    PatternNotFound,
    InvalidRequest,
    InvalidResponse,
    BackendError,
    FileNotFound,
    IoError,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedChangeType => write!(f, "UNSUPPORTED_CHANGE_TYPE"),
            Self::PatternNotFound => write!(f, "PATTERN_NOT_FOUND"),
            Self::InvalidRequest => write!(f, "INVALID_REQUEST"),
            Self::InvalidResponse => write!(f, "INVALID_RESPONSE"),
            Self::BackendError => write!(f, "BACKEND_ERROR"),
            Self::FileNotFound => write!(f, "FILE_NOT_FOUND"),
            Self::IoError => write!(f, "IO_ERROR"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodestepError {
    pub code: ErrorCode,
    pub message: String,
}

impl fmt::Display for CodestepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for CodestepError {}

impl CodestepError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn file_not_found(path: &str) -> Self {
        Self::new(ErrorCode::FileNotFound, format!("File not found: {path}"))
    }

    pub fn unsupported_change_type(change_type: &str, file: &str) -> Self {
        Self::new(
            ErrorCode::UnsupportedChangeType,
            format!("Unsupported change type \"{change_type}\" for file: {file}"),
        )
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }
}
