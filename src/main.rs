use anyhow::Result;
use clap::Parser;
use rayon::prelude::*;
use std::io::Read;

use codestep::cli::{Cli, Commands};
use codestep::config::ConfigService;
use codestep::doctor;
use codestep::error::CodestepError;
use codestep::models::request::{AnnotateRequest, CodestepRequest, PatchRequest};
use codestep::models::response::PatchReport;
use codestep::service::{AppService, classify_error};
use codestep::session;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        println!("{}", make_error_line(&e));
        std::process::exit(1);
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn serialize_output(value: &impl serde::Serialize, pretty: bool) -> Result<String> {
    if pretty {
        Ok(serde_json::to_string_pretty(value)?)
    } else {
        Ok(serde_json::to_string(value)?)
    }
}

fn make_error_line(e: &anyhow::Error) -> String {
    let (code, message) = classify_error(e);
    serde_json::json!({ "error": { "code": code, "message": message } }).to_string()
}

fn read_stdin() -> Result<String> {
    let mut buf = String::new();
    std::io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn read_body_file(path: &str) -> Result<String> {
    Ok(std::fs::read_to_string(path).map_err(|_| CodestepError::file_not_found(path))?)
}

enum PathInput {
    Stdin,
    Single(String),
    Batch(Vec<String>),
}

fn resolve_paths(
    path: Option<&str>,
    paths: Option<&str>,
    paths_file: Option<&str>,
) -> Result<PathInput> {
    if let Some(p) = path {
        Ok(PathInput::Single(p.to_string()))
    } else if let Some(ps) = paths {
        let list: Vec<String> = ps
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        Ok(PathInput::Batch(list))
    } else if let Some(pf) = paths_file {
        let content = std::fs::read_to_string(pf)
            .map_err(|_| CodestepError::file_not_found(pf))?;
        let list: Vec<String> = content
            .lines()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        Ok(PathInput::Batch(list))
    } else {
        Ok(PathInput::Stdin)
    }
}

fn load_or_stdin<T: serde::de::DeserializeOwned>(
    service: &AppService,
    path: Option<&str>,
    yaml: bool,
) -> Result<T> {
    match path {
        Some(p) => service.load_request(p),
        None => service.parse_request(&read_stdin()?, yaml),
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

fn run(cli: Cli) -> Result<()> {
    let pretty = cli.pretty;

    // Load configuration
    let config = ConfigService::load(cli.config.as_deref())?;

    // Held until `run` returns so buffered log lines are flushed
    let _log_guard = if cli.debug || config.debug {
        Some(codestep::logger::init(&config)?)
    } else {
        None
    };

    let service = AppService::from_config(&config);

    match cli.command {
        Commands::Apply {
            path,
            paths,
            paths_file,
            yaml,
            reply_file,
            status,
        } => {
            let reply = reply_file
                .map(|rf| read_body_file(&rf).map(|body| (status, body)))
                .transpose()?;
            match resolve_paths(path.as_deref(), paths.as_deref(), paths_file.as_deref())? {
                PathInput::Stdin => {
                    let req: PatchRequest = service.parse_request(&read_stdin()?, yaml)?;
                    print_json(&apply_single(&service, &req, reply.as_ref())?, pretty)
                }
                PathInput::Single(p) => {
                    let req: PatchRequest = service.load_request(&p)?;
                    print_json(&apply_single(&service, &req, reply.as_ref())?, pretty)
                }
                PathInput::Batch(ps) => batch_apply(&service, &ps),
            }
        }
        Commands::Highlight { path } => {
            let req: AnnotateRequest = load_or_stdin(&service, path.as_deref(), false)?;
            print_json(&service.highlight(&req.content, &req.metadata)?, pretty)
        }
        Commands::Stats { path } => {
            let req: AnnotateRequest = load_or_stdin(&service, path.as_deref(), false)?;
            print_json(&service.stats(&req.content, &req.metadata)?, pretty)
        }
        Commands::Decode {
            status,
            body,
            body_file,
        } => {
            let body = if let Some(b) = body {
                b
            } else if let Some(bf) = body_file {
                read_body_file(&bf)?
            } else {
                read_stdin()?
            };
            print_json(&service.decode(status, &body)?, pretty)
        }
        Commands::Doctor => print_json(&doctor::run_doctor(), pretty),
        Commands::Session => cmd_session(&service),
        Commands::Mcp => cmd_mcp(service),
        Commands::Init { path, force } => {
            let config_path = path.unwrap_or_else(ConfigService::default_path);
            ConfigService::write_template(&config_path, force)?;
            eprintln!("Configuration file created at: {}", config_path.display());
            Ok(())
        }
    }
}

/// Apply one request, taking directives from a raw generator reply when one is given.
fn apply_single(
    service: &AppService,
    req: &PatchRequest,
    reply: Option<&(u16, String)>,
) -> Result<PatchReport> {
    match reply {
        Some((status, body)) => service.apply_reply(&req.files, *status, body),
        None => service.apply_request(req),
    }
}

fn print_json(value: &impl serde::Serialize, pretty: bool) -> Result<()> {
    let output = serialize_output(value, pretty)?;
    println!("{output}");
    Ok(())
}

fn cmd_session(service: &AppService) -> Result<()> {
    session::run_session(service.max_input_size(), |req| {
        handle_request(service, req)
    })
}

fn cmd_mcp(service: AppService) -> Result<()> {
    use rmcp::ServiceExt;
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let server = codestep::mcp::CodestepServer::new(service);
        let transport = rmcp::transport::io::stdio();
        let running = server
            .serve(transport)
            .await
            .map_err(|e| anyhow::anyhow!("MCP server initialization failed: {e}"))?;
        running
            .waiting()
            .await
            .map_err(|e| anyhow::anyhow!("MCP server error: {e}"))?;
        Ok(())
    })
}

// ---------------------------------------------------------------------------
// Batch processing (NDJSON output, rayon parallel)
// ---------------------------------------------------------------------------

fn batch_apply(service: &AppService, paths: &[String]) -> Result<()> {
    let results: Vec<String> = paths
        .par_iter()
        .map(|p| {
            let report = service
                .load_request::<PatchRequest>(p)
                .and_then(|req| service.apply_request(&req));
            match report {
                Ok(r) => serde_json::to_string(&r).unwrap_or_else(|e| make_error_line(&e.into())),
                Err(e) => make_error_line(&e),
            }
        })
        .collect();

    for line in &results {
        println!("{line}");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Session handler
// ---------------------------------------------------------------------------

fn handle_request(service: &AppService, req: CodestepRequest) -> Result<serde_json::Value> {
    use codestep::models::request::Command;

    match req.command {
        Command::Apply => {
            let report = match req.body.as_deref() {
                Some(body) => service.apply_reply(&req.files, req.status.unwrap_or(200), body)?,
                None => service.apply(&req.files, &req.changes)?,
            };
            Ok(serde_json::to_value(report)?)
        }
        Command::Highlight | Command::Stats => {
            let (Some(content), Some(metadata)) = (req.content.as_deref(), req.metadata.as_ref())
            else {
                anyhow::bail!(CodestepError::invalid_request(
                    "\"content\" and \"metadata\" are required"
                ));
            };
            if req.command == Command::Highlight {
                Ok(serde_json::to_value(service.highlight(content, metadata)?)?)
            } else {
                Ok(serde_json::to_value(service.stats(content, metadata)?)?)
            }
        }
        Command::Decode => {
            let body = req.body.as_deref().unwrap_or("");
            let reply = service.decode(req.status.unwrap_or(200), body)?;
            Ok(serde_json::to_value(reply)?)
        }
        Command::Doctor => Ok(serde_json::to_value(doctor::run_doctor())?),
    }
}
