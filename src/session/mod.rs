use anyhow::Result;
use std::io::{self, BufRead, Write};

use crate::error::ErrorCode;
use crate::models::request::CodestepRequest;
use crate::service::classify_error;

fn error_value(code: ErrorCode, message: impl Into<String>) -> serde_json::Value {
    serde_json::json!({
        "error": { "code": code, "message": message.into() }
    })
}

/// Run an NDJSON streaming session: read requests from stdin, process, write responses to stdout.
///
/// Lines longer than `max_line_size` bytes (0 = unlimited) are answered with an error.
pub fn run_session(
    max_line_size: usize,
    handler: impl Fn(CodestepRequest) -> Result<serde_json::Value>,
) -> Result<()> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());
    serve(stdin.lock(), &mut out, max_line_size, handler)
}

/// Session loop over arbitrary reader/writer pairs.
pub fn serve<R: BufRead, W: Write>(
    input: R,
    out: &mut W,
    max_line_size: usize,
    handler: impl Fn(CodestepRequest) -> Result<serde_json::Value>,
) -> Result<()> {
    for line in input.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let value = if max_line_size > 0 && trimmed.len() > max_line_size {
            error_value(
                ErrorCode::InvalidRequest,
                format!(
                    "Input line exceeds maximum size ({} bytes > {} bytes)",
                    trimmed.len(),
                    max_line_size
                ),
            )
        } else {
            match serde_json::from_str::<CodestepRequest>(trimmed) {
                Ok(req) => match handler(req) {
                    Ok(value) => value,
                    Err(e) => {
                        let (code, message) = classify_error(&e);
                        error_value(code, message)
                    }
                },
                Err(e) => error_value(
                    ErrorCode::InvalidRequest,
                    format!("Invalid JSON request: {e}"),
                ),
            }
        };

        serde_json::to_writer(&mut *out, &value)?;
        out.write_all(b"\n")?;
        out.flush()?;
    }

    Ok(())
}
