use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "codestep",
    version,
    about = "Incremental file-patch engine for guided code generation"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Pretty-print JSON output (default: compact)
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Path to configuration file
    #[arg(long, global = true)]
    pub config: Option<std::path::PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply change directives to a file set
    Apply {
        /// Path to a request file with `files` and `changes` (single mode; stdin if omitted)
        #[arg(short, long)]
        path: Option<String>,

        /// Comma-separated request files (batch mode, NDJSON output)
        #[arg(long, conflicts_with = "path")]
        paths: Option<String>,

        /// File containing request paths, one per line (batch mode)
        #[arg(long, conflicts_with_all = ["path", "paths"])]
        paths_file: Option<String>,

        /// Treat stdin as YAML instead of JSON
        #[arg(long)]
        yaml: bool,

        /// Raw generator reply to take directives from (the request supplies only `files`)
        #[arg(long, conflicts_with_all = ["paths", "paths_file"])]
        reply_file: Option<String>,

        /// HTTP status of the reply given with --reply-file
        #[arg(long, default_value = "200", requires = "reply_file")]
        status: u16,
    },

    /// Compute the highlight range for a patched file
    Highlight {
        /// Request file with `content` and `metadata` (stdin if omitted)
        #[arg(short, long)]
        path: Option<String>,
    },

    /// Compute +added/-removed counters for a patched file
    Stats {
        /// Request file with `content` and `metadata` (stdin if omitted)
        #[arg(short, long)]
        path: Option<String>,
    },

    /// Normalise a raw generator reply (double-encoded JSON, error shapes)
    Decode {
        /// HTTP status of the reply
        #[arg(short, long, default_value = "200")]
        status: u16,

        /// Inline reply body
        #[arg(long)]
        body: Option<String>,

        /// Path to a file holding the reply body
        #[arg(long, conflicts_with = "body")]
        body_file: Option<String>,
    },

    /// Report version, supported change types and config location
    Doctor,

    /// NDJSON streaming session (stdin → stdout)
    Session,

    /// Start MCP (Model Context Protocol) server over stdio
    Mcp,

    /// Generate default configuration file
    Init {
        /// Path to write the configuration file (default: ~/.config/codestep/config.toml)
        #[arg(short, long)]
        path: Option<std::path::PathBuf>,

        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },
}
