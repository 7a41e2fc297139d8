use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::*;
use rmcp::schemars;
use rmcp::{ErrorData as McpError, ServerHandler, tool, tool_handler, tool_router};

use schemars::JsonSchema;
use serde::Deserialize;

use crate::doctor;
use crate::models::metadata::ChangeMetadata;
use crate::service::AppService;

// ---------------------------------------------------------------------------
// Tool parameter structs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ApplyChangesParams {
    /// Current files: object of name -> content (or {content, purpose})
    #[serde(default)]
    pub files: serde_json::Value,
    /// Change directives: array of {file, change_type, content, line_number?, insert_after?, insert_before?}
    #[serde(default)]
    pub changes: serde_json::Value,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AnnotateParams {
    /// Patched file content
    pub content: String,
    /// Change metadata returned by apply_changes for this file
    pub metadata: serde_json::Value,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DecodeResponseParams {
    /// HTTP status of the generator reply (default: 200)
    #[serde(default = "default_status")]
    pub status: u16,
    /// Raw reply body
    pub body: String,
}

fn default_status() -> u16 {
    200
}

// ---------------------------------------------------------------------------
// MCP Server
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct CodestepServer {
    tool_router: ToolRouter<Self>,
    service: std::sync::Arc<AppService>,
}

impl Default for CodestepServer {
    fn default() -> Self {
        Self::new(AppService::bounded(crate::config::DEFAULT_MAX_INPUT_SIZE))
    }
}

#[tool_router]
impl CodestepServer {
    pub fn new(service: AppService) -> Self {
        Self {
            tool_router: Self::tool_router(),
            service: std::sync::Arc::new(service),
        }
    }

    #[tool(
        name = "apply_changes",
        description = "Apply replace/append/insert/insert_after/insert_before directives to an in-memory file set"
    )]
    async fn apply_changes(
        &self,
        params: Parameters<ApplyChangesParams>,
    ) -> Result<CallToolResult, McpError> {
        let p = params.0;
        Self::to_tool_result(self.service.apply(&p.files, &p.changes))
    }

    #[tool(
        name = "highlight_range",
        description = "Compute the line range produced by the last change to a patched file"
    )]
    async fn highlight_range(
        &self,
        params: Parameters<AnnotateParams>,
    ) -> Result<CallToolResult, McpError> {
        let p = params.0;
        let meta = Self::parse_metadata(p.metadata)?;
        Self::to_tool_result(self.service.highlight(&p.content, &meta))
    }

    #[tool(
        name = "diff_stats",
        description = "Compute +added/-removed line counters for a patched file"
    )]
    async fn diff_stats(
        &self,
        params: Parameters<AnnotateParams>,
    ) -> Result<CallToolResult, McpError> {
        let p = params.0;
        let meta = Self::parse_metadata(p.metadata)?;
        Self::to_tool_result(self.service.stats(&p.content, &meta))
    }

    #[tool(
        name = "decode_response",
        description = "Normalise a raw generator reply: unwrap double-encoded JSON and map error bodies"
    )]
    async fn decode_response(
        &self,
        params: Parameters<DecodeResponseParams>,
    ) -> Result<CallToolResult, McpError> {
        let p = params.0;
        Self::to_tool_result(self.service.decode(p.status, &p.body))
    }

    #[tool(
        name = "doctor",
        description = "Report version and supported change types"
    )]
    async fn doctor_tool(&self) -> Result<CallToolResult, McpError> {
        let report = doctor::run_doctor();
        let json = serde_json::to_string(&report)
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }
}

// ---------------------------------------------------------------------------
// Helper
// ---------------------------------------------------------------------------

impl CodestepServer {
    fn to_tool_result<T: serde::Serialize>(
        result: anyhow::Result<T>,
    ) -> Result<CallToolResult, McpError> {
        match result {
            Ok(value) => {
                let json = serde_json::to_string(&value)
                    .map_err(|e| McpError::internal_error(e.to_string(), None))?;
                Ok(CallToolResult::success(vec![Content::text(json)]))
            }
            Err(e) => Err(McpError::internal_error(e.to_string(), None)),
        }
    }

    fn parse_metadata(value: serde_json::Value) -> Result<ChangeMetadata, McpError> {
        serde_json::from_value(value)
            .map_err(|e| McpError::invalid_params(format!("Invalid metadata: {e}"), None))
    }
}

// ---------------------------------------------------------------------------
// ServerHandler implementation
// ---------------------------------------------------------------------------

#[tool_handler]
impl ServerHandler for CodestepServer {
    fn get_info(&self) -> ServerInfo {
        let mut capabilities = ServerCapabilities::default();
        capabilities.tools = Some(ToolsCapability::default());
        let mut server_info = Implementation::default();
        server_info.name = "codestep".into();
        server_info.version = env!("CARGO_PKG_VERSION").into();
        let mut info = ServerInfo::default();
        info.protocol_version = ProtocolVersion::V_2024_11_05;
        info.capabilities = capabilities;
        info.server_info = server_info;
        info
    }
}
