use anyhow::{Context, Result, bail};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::Path;
use tracing::debug;

use crate::config::Config;
use crate::engine::decode::{self, BackendReply};
use crate::engine::{highlight, patch, stats};
use crate::error::{CodestepError, ErrorCode};
use crate::models::directive::ChangeDirective;
use crate::models::file::FileSet;
use crate::models::metadata::{ChangeMetadata, DiffStats};
use crate::models::request::PatchRequest;
use crate::models::response::{FileChangeReport, HighlightReport, PatchReport};

// ---------------------------------------------------------------------------
// AppService: unified core logic for CLI / Session / MCP
// ---------------------------------------------------------------------------

pub struct AppService {
    max_input_size: usize,
}

impl Default for AppService {
    fn default() -> Self {
        Self::new()
    }
}

impl AppService {
    /// Create a service without an input size limit.
    pub fn new() -> Self {
        Self { max_input_size: 0 }
    }

    /// Create a service that refuses inputs larger than `max_input_size` bytes (0 = unlimited).
    pub fn bounded(max_input_size: usize) -> Self {
        Self { max_input_size }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::bounded(config.max_input_size)
    }

    pub fn max_input_size(&self) -> usize {
        self.max_input_size
    }

    // -----------------------------------------------------------------------
    // Validation helpers
    // -----------------------------------------------------------------------

    fn validate_input_size(&self, size: usize) -> Result<()> {
        if self.max_input_size > 0 && size > self.max_input_size {
            bail!(CodestepError::invalid_request(format!(
                "Input exceeds maximum size ({} bytes > {} bytes)",
                size, self.max_input_size
            )));
        }
        Ok(())
    }

    /// Read a request file, JSON or YAML by extension.
    pub fn load_request<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let p = Path::new(path);
        if !p.is_file() {
            bail!(CodestepError::file_not_found(path));
        }
        let text = std::fs::read_to_string(p)
            .with_context(|| format!("Failed to read request file: {path}"))?;
        let yaml = matches!(
            p.extension().and_then(|e| e.to_str()),
            Some("yaml" | "yml")
        );
        self.parse_request(&text, yaml)
            .with_context(|| format!("Invalid request file: {path}"))
    }

    /// Parse request text as JSON, or YAML when `yaml` is set.
    pub fn parse_request<T: DeserializeOwned>(&self, text: &str, yaml: bool) -> Result<T> {
        self.validate_input_size(text.len())?;
        let parsed = if yaml {
            serde_yaml::from_str(text).map_err(|e| {
                CodestepError::invalid_request(format!("Invalid YAML request: {e}"))
            })?
        } else {
            serde_json::from_str(text).map_err(|e| {
                CodestepError::invalid_request(format!("Invalid JSON request: {e}"))
            })?
        };
        Ok(parsed)
    }

    // -----------------------------------------------------------------------
    // Core operations
    // -----------------------------------------------------------------------

    /// Apply a decoded request: current files plus a directive list (or a reply holding one).
    pub fn apply(&self, files: &Value, changes: &Value) -> Result<PatchReport> {
        let files = decode::files_from_value(files)?;
        let batch = decode::directives_from_value(changes)?;
        debug!(
            files = files.len(),
            directives = batch.directives.len(),
            issues = batch.issues.len(),
            "apply called"
        );
        self.validate_input_size(input_size(&files, &batch.directives))?;

        let outcome = patch::apply_changes(&files, &batch.directives);

        let changes: Vec<FileChangeReport> = outcome
            .files
            .iter()
            .filter_map(|entry| {
                let meta = outcome.metadata.get(&entry.name)?;
                Some(FileChangeReport {
                    file: entry.name.clone(),
                    hash: entry.hash(),
                    highlight: highlight::highlight_range(&entry.content, meta),
                    stats: stats::stats_for(&entry.content, meta),
                })
            })
            .collect();
        let totals: DiffStats = changes.iter().map(|c| c.stats).sum();

        debug!(
            changed = changes.len(),
            added = totals.added,
            removed = totals.removed,
            first_created = ?outcome.first_created,
            "apply completed"
        );
        Ok(PatchReport {
            files: outcome.files,
            metadata: outcome.metadata,
            first_created: outcome.first_created,
            changes,
            totals,
            rejected: outcome.rejected,
            warnings: outcome.warnings,
            issues: batch.issues,
        })
    }

    pub fn apply_request(&self, req: &PatchRequest) -> Result<PatchReport> {
        self.apply(&req.files, &req.changes)
    }

    /// Highlight range for a patched file.
    pub fn highlight(&self, content: &str, meta: &ChangeMetadata) -> Result<HighlightReport> {
        self.validate_input_size(content.len())?;
        let range = highlight::highlight_range(content, meta);
        debug!(change_type = meta.change_type.as_str(), range = ?range, "highlight computed");
        Ok(HighlightReport { highlight: range })
    }

    /// Diff counters for a patched file.
    pub fn stats(&self, content: &str, meta: &ChangeMetadata) -> Result<DiffStats> {
        self.validate_input_size(content.len())?;
        Ok(stats::stats_for(content, meta))
    }

    /// Normalise a raw generator reply.
    pub fn decode(&self, status: u16, body: &str) -> Result<BackendReply> {
        debug!(status, bytes = body.len(), "decode called");
        self.validate_input_size(body.len())?;
        Ok(decode::normalize_response(
            status,
            body,
            decode::DEFAULT_FAILURE,
        ))
    }

    /// Normalise a generator reply and apply the directives it carries.
    ///
    /// Failed or unparseable replies become `BACKEND_ERROR`/`INVALID_RESPONSE` errors.
    pub fn apply_reply(&self, files: &Value, status: u16, body: &str) -> Result<PatchReport> {
        let data = self.decode(status, body)?.into_result()?;
        self.apply(files, &data)
    }
}

fn input_size(files: &FileSet, directives: &[ChangeDirective]) -> usize {
    let file_bytes: usize = files.iter().map(|f| f.content.len()).sum();
    let directive_bytes: usize = directives.iter().map(|d| d.content.len()).sum();
    file_bytes + directive_bytes
}

/// Map an error to its wire code and message.
pub fn classify_error(e: &anyhow::Error) -> (ErrorCode, String) {
    match e.downcast_ref::<CodestepError>() {
        Some(ce) => (ce.code, ce.message.clone()),
        None => (ErrorCode::IoError, format!("{e:#}")),
    }
}
