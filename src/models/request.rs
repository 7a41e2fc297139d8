use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::metadata::ChangeMetadata;

/// A request to the codestep engine (session mode).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodestepRequest {
    pub command: Command,
    /// Current file set (for apply command)
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub files: Value,
    /// Directive list or generator reply holding one (for apply command)
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub changes: Value,
    /// Patched file content (for highlight/stats commands)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Change metadata of the file (for highlight/stats commands)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ChangeMetadata>,
    /// HTTP status of the generator reply (decode, or apply with `body`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Raw generator reply body; with apply, its directives replace `changes`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Command {
    Apply,
    Highlight,
    Stats,
    Decode,
    Doctor,
}

/// Body of a patch request file (`codestep apply --path`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatchRequest {
    #[serde(default)]
    pub files: Value,
    #[serde(default)]
    pub changes: Value,
}

/// Body of a highlight/stats request file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotateRequest {
    pub content: String,
    pub metadata: ChangeMetadata,
}
