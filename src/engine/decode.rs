//! Normalisation of generator-service replies before they reach the patch engine.
//!
//! The service sometimes returns JSON encoded twice (a JSON string holding
//! JSON) and reports failures in a loose `{ error, message }` shape. Both are
//! smoothed out here so the engine only sees typed directives.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{CodestepError, ErrorCode};
use crate::models::directive::ChangeDirective;
use crate::models::file::FileSet;

/// Default error label when a failed reply carries none.
pub const DEFAULT_FAILURE: &str = "Request failed";

/// A generator reply after normalisation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BackendReply {
    Success {
        data: Value,
    },
    Failure {
        status: u16,
        error: String,
        message: String,
        /// Structured validation detail from the reply's `detail` field
        #[serde(skip_serializing_if = "Option::is_none")]
        details: Option<Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        raw: Option<String>,
    },
}

impl BackendReply {
    /// Convert into the decoded payload, or a typed error for failures.
    pub fn into_result(self) -> Result<Value, CodestepError> {
        match self {
            Self::Success { data } => Ok(data),
            Self::Failure {
                status,
                error,
                message,
                raw,
                ..
            } => {
                let code = if raw.is_some() {
                    ErrorCode::InvalidResponse
                } else {
                    ErrorCode::BackendError
                };
                Err(CodestepError::new(
                    code,
                    format!("{error} (status {status}): {message}"),
                ))
            }
        }
    }
}

/// Parse JSON, unwrapping one level of string encoding when possible.
///
/// If the inner string is not itself JSON, the first parse result is kept.
pub fn parse_lenient(text: &str) -> Option<Value> {
    let first: Value = serde_json::from_str(text).ok()?;
    if let Value::String(inner) = &first
        && let Ok(second) = serde_json::from_str::<Value>(inner)
    {
        debug!("unwrapped double-encoded JSON reply");
        return Some(second);
    }
    Some(first)
}

/// Error label for failed replies whose body is not JSON.
pub const UNKNOWN_ERROR: &str = "Unknown error";

/// Normalise a raw reply given its HTTP status and body text.
///
/// For failed replies `fallback_error` labels a JSON body without an `error`
/// field. A body that is not JSON at all is labelled [`UNKNOWN_ERROR`] and
/// becomes the message verbatim.
pub fn normalize_response(status: u16, body: &str, fallback_error: &str) -> BackendReply {
    if !(200..300).contains(&status) {
        warn!(status, "generator reported failure");
        let Ok(parsed) = serde_json::from_str::<Value>(body) else {
            return BackendReply::Failure {
                status,
                error: UNKNOWN_ERROR.to_string(),
                message: body.to_string(),
                details: None,
                raw: None,
            };
        };
        let field = |key: &str| -> Option<String> {
            match parsed.get(key)? {
                Value::Null => None,
                Value::String(s) if s.is_empty() => None,
                Value::String(s) => Some(s.clone()),
                other => Some(other.to_string()),
            }
        };
        return BackendReply::Failure {
            status,
            error: field("error").unwrap_or_else(|| fallback_error.to_string()),
            message: field("message").unwrap_or_else(|| body.to_string()),
            details: parsed.get("detail").filter(|d| !d.is_null()).cloned(),
            raw: None,
        };
    }

    match parse_lenient(body) {
        Some(data) => BackendReply::Success { data },
        None => {
            warn!(status, bytes = body.len(), "generator reply is not valid JSON");
            BackendReply::Failure {
                status: 500,
                error: "Invalid response format".to_string(),
                message: "Reply body is not valid JSON".to_string(),
                details: None,
                raw: Some(body.to_string()),
            }
        }
    }
}

/// A directive that could not be taken at face value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodeIssue {
    pub index: usize,
    pub code: ErrorCode,
    pub message: String,
}

/// Directives decoded from a generator reply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DirectiveBatch {
    pub directives: Vec<ChangeDirective>,
    /// Malformed entries (dropped) and unsupported change types (kept, the engine rejects them)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<DecodeIssue>,
}

/// Decode directives from either a bare array or an object with a `changes` array.
pub fn directives_from_value(value: &Value) -> Result<DirectiveBatch, CodestepError> {
    let items = match value {
        Value::Null => return Ok(DirectiveBatch::default()),
        Value::Array(items) => items,
        Value::Object(obj) => match obj.get("changes") {
            Some(Value::Array(items)) => items,
            Some(Value::Null) | None => return Ok(DirectiveBatch::default()),
            Some(_) => {
                return Err(CodestepError::invalid_request(
                    "\"changes\" must be an array of directives",
                ));
            }
        },
        _ => {
            return Err(CodestepError::invalid_request(
                "Expected an array of directives or an object with \"changes\"",
            ));
        }
    };

    let mut batch = DirectiveBatch::default();
    for (index, item) in items.iter().enumerate() {
        match serde_json::from_value::<ChangeDirective>(item.clone()) {
            Ok(directive) => {
                if !directive.change_type.is_supported() {
                    warn!(
                        index,
                        change_type = directive.change_type.as_str(),
                        "directive has unsupported change type"
                    );
                    batch.issues.push(DecodeIssue {
                        index,
                        code: ErrorCode::UnsupportedChangeType,
                        message: format!(
                            "Unsupported change type \"{}\" for file: {}",
                            directive.change_type, directive.file
                        ),
                    });
                }
                batch.directives.push(directive);
            }
            Err(e) => {
                warn!(index, error = %e, "dropping malformed directive");
                batch.issues.push(DecodeIssue {
                    index,
                    code: ErrorCode::InvalidRequest,
                    message: format!("Malformed directive: {e}"),
                });
            }
        }
    }
    Ok(batch)
}

/// Decode a file set from a bare name -> content map or a `[{ name, content }]` list.
///
/// Every key of the map is a file name, `files` included.
pub fn files_from_value(value: &Value) -> Result<FileSet, CodestepError> {
    if value.is_null() {
        return Ok(FileSet::new());
    }
    serde_json::from_value(value.clone())
        .map_err(|e| CodestepError::invalid_request(format!("Invalid file set: {e}")))
}
