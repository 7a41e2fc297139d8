use serde::Serialize;
use std::path::PathBuf;

use crate::config::ConfigService;
use crate::models::directive::ChangeType;

#[derive(Debug, Serialize)]
pub struct DoctorReport {
    pub version: String,
    pub change_types: Vec<String>,
    pub config_path: PathBuf,
    pub config_exists: bool,
}

/// Report the version, the recognised change types and where configuration is read from.
pub fn run_doctor() -> DoctorReport {
    let config_path = ConfigService::default_path();
    DoctorReport {
        version: env!("CARGO_PKG_VERSION").to_string(),
        change_types: ChangeType::SUPPORTED
            .iter()
            .map(|t| t.as_str().to_string())
            .collect(),
        config_exists: config_path.is_file(),
        config_path,
    }
}
