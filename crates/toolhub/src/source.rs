//! Tool sources: the seam between the hub and vendor servers.
//!
//! Every vendor integration (DockerHub, Notion, QuickBooks, ...) is an MCP server reached either as
//! a child process over stdio or over streamable HTTP. The pipeline only sees [`ToolSource`].

use crate::config::LaunchSpec;
use crate::error::{HubError, Result};
use crate::normalizer::ToolDescriptor;
use async_trait::async_trait;
use rmcp::{
    RoleClient, ServiceExt as _,
    model::{CallToolRequestParam, CallToolResult},
    service::RunningService,
    transport::{
        ConfigureCommandExt as _, StreamableHttpClientTransport, TokioChildProcess,
        streamable_http_client::StreamableHttpClientTransportConfig,
    },
};
use serde_json::{Map, Value, json};

/// A live handle to one server.
#[async_trait]
pub trait ToolSource: Send + Sync {
    /// Server name as configured.
    fn name(&self) -> &str;

    /// List the server's tools in the order the server reports them.
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>>;

    /// Invoke a tool. `arguments` carries `server_credentials` alongside the tool's own arguments.
    async fn call_tool(&self, name: &str, arguments: Map<String, Value>) -> Result<CallToolResult>;
}

/// An MCP server connected through rmcp.
pub struct McpServer {
    name: String,
    client: RunningService<RoleClient, ()>,
}

impl McpServer {
    /// Launch (stdio) or connect to (streamable HTTP) a server and complete the MCP handshake.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Startup`] if the process cannot be spawned or initialization fails.
    pub async fn connect(name: &str, launch: &LaunchSpec) -> Result<Self> {
        let client = match launch {
            LaunchSpec::Stdio {
                command,
                args,
                env,
                cwd,
            } => {
                let transport = TokioChildProcess::new(
                    tokio::process::Command::new(command).configure(|cmd| {
                        cmd.args(args)
                            .envs(env.iter())
                            .stderr(std::process::Stdio::inherit())
                            .kill_on_drop(true);
                        if let Some(dir) = cwd {
                            cmd.current_dir(dir);
                        }
                    }),
                )
                .map_err(|e| HubError::Startup(format!("spawn '{name}' ({command}): {e}")))?;

                ().serve(transport).await.map_err(|e| {
                    HubError::Startup(format!("initialize stdio server '{name}': {e}"))
                })?
            }
            LaunchSpec::StreamableHttp { url, auth_header } => {
                let mut cfg = StreamableHttpClientTransportConfig::with_uri(url.as_str());
                cfg.auth_header.clone_from(auth_header);
                let transport = StreamableHttpClientTransport::from_config(cfg);

                ().serve(transport).await.map_err(|e| {
                    HubError::Startup(format!("initialize http server '{name}' ({url}): {e}"))
                })?
            }
        };

        tracing::info!(server = %name, "connected to server");
        Ok(Self {
            name: name.to_string(),
            client,
        })
    }
}

#[async_trait]
impl ToolSource for McpServer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
        let tools = self
            .client
            .peer()
            .list_all_tools()
            .await
            .map_err(|e| HubError::Upstream(format!("tools/list: {e}")))?;

        let mut out = Vec::with_capacity(tools.len());
        for tool in tools {
            let raw = serde_json::to_value(&tool)?;
            match ToolDescriptor::from_json(raw) {
                Ok(descriptor) => out.push(descriptor),
                Err(e) => {
                    tracing::warn!(server = %self.name, error = %e, "skipping unusable tool");
                }
            }
        }
        Ok(out)
    }

    async fn call_tool(&self, name: &str, arguments: Map<String, Value>) -> Result<CallToolResult> {
        let params: CallToolRequestParam =
            serde_json::from_value(json!({ "name": name, "arguments": arguments }))?;

        self.client
            .peer()
            .call_tool(params)
            .await
            .map_err(|e| HubError::Upstream(format!("tools/call '{name}': {e}")))
    }
}
