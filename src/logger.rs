//! File logging for `--debug` runs.
//!
//! Events go to `<log dir>/<prefix>.YYYY-MM-DD` through a non-blocking writer;
//! stdout is left to the JSON protocol. Files past the retention window are
//! pruned before the appender opens.

use anyhow::{Context, Result};
use logroller::{LogRollerBuilder, Rotation, RotationAge, TimeZone};
use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};
use time::macros::format_description;
use tracing::debug;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::fmt::time::OffsetTime;
use tracing_subscriber::prelude::*;

use crate::config::Config;

/// Environment variable holding a full `EnvFilter` directive string.
pub const LOG_ENV: &str = "CODESTEP_LOG";

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Install the global subscriber. Pending events are flushed when the guard drops.
pub fn init(config: &Config) -> Result<WorkerGuard> {
    let dir = config.log_dir();
    let settings = &config.log;
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;

    let max_age = DAY * u32::from(settings.retention_days);
    let pruned = prune_logs(&dir, &settings.prefix, max_age, SystemTime::now())?;

    let appender = LogRollerBuilder::new(dir.as_path(), Path::new(&settings.prefix))
        .rotation(Rotation::AgeBased(RotationAge::Daily))
        .time_zone(TimeZone::Local)
        .max_keep_files(settings.retention_days.into())
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to create log roller: {}", e))?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let time_format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let local_offset = time::UtcOffset::current_local_offset().unwrap_or(time::UtcOffset::UTC);

    tracing_subscriber::registry()
        .with(filter(&settings.level)?)
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_timer(OffsetTime::new(local_offset, time_format)),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to set global subscriber: {}", e))?;

    debug!(
        dir = %dir.display(),
        prefix = %settings.prefix,
        retention_days = settings.retention_days,
        pruned,
        "logging started"
    );
    Ok(guard)
}

/// `CODESTEP_LOG` when set, otherwise `codestep=<level>`.
fn filter(level: &str) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_env(LOG_ENV) {
        return Ok(filter);
    }
    EnvFilter::try_new(format!("codestep={level}"))
        .with_context(|| format!("Invalid log level: {level:?}"))
}

/// Delete `<prefix>` and `<prefix>.*` files in `dir` last modified more than `max_age` before `now`.
///
/// Returns how many files were removed. A missing directory counts as empty.
pub fn prune_logs(dir: &Path, prefix: &str, max_age: Duration, now: SystemTime) -> Result<usize> {
    if !dir.is_dir() {
        return Ok(0);
    }
    let Some(cutoff) = now.checked_sub(max_age) else {
        return Ok(0);
    };
    let dotted = format!("{prefix}.");

    let mut removed = 0;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if !file_type.is_file() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if name != prefix && !name.starts_with(&dotted) {
            continue;
        }

        let modified = entry.metadata().and_then(|m| m.modified());
        if matches!(modified, Ok(m) if m < cutoff) && fs::remove_file(entry.path()).is_ok() {
            removed += 1;
        }
    }
    Ok(removed)
}
