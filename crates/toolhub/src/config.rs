//! Hub configuration: recognized clients, launchable servers and timeouts.
//!
//! The file is YAML (a JSON file parses too). It is loaded once at startup and never mutated.

use crate::error::{HubError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HubConfig {
    #[serde(default)]
    pub hub: HubSettings,

    /// Recognized downstream client identifiers (e.g. `MCP_CLIENT_OPENAI`).
    #[serde(default)]
    pub clients: Vec<String>,

    /// Recognized servers keyed by server name.
    #[serde(default)]
    pub servers: HashMap<String, ServerConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HubSettings {
    /// Upper bound for a single server's `tools/list` round trip.
    #[serde(default = "default_list_tools_timeout_ms")]
    pub list_tools_timeout_ms: u64,

    /// Upper bound for a whole validation call (all gates + fan-out).
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Upper bound for launching a server and completing the MCP handshake.
    #[serde(default = "default_startup_timeout_ms")]
    pub startup_timeout_ms: u64,

    /// Upper bound for a single `tools/call` forwarded through `/call`.
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,
}

fn default_list_tools_timeout_ms() -> u64 {
    30_000
}

fn default_request_timeout_ms() -> u64 {
    60_000
}

fn default_startup_timeout_ms() -> u64 {
    30_000
}

fn default_call_timeout_ms() -> u64 {
    60_000
}

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            list_tools_timeout_ms: default_list_tools_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            startup_timeout_ms: default_startup_timeout_ms(),
            call_timeout_ms: default_call_timeout_ms(),
        }
    }
}

impl HubSettings {
    #[must_use]
    pub fn list_tools_timeout(&self) -> Duration {
        Duration::from_millis(self.list_tools_timeout_ms)
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    #[must_use]
    pub fn startup_timeout(&self) -> Duration {
        Duration::from_millis(self.startup_timeout_ms)
    }

    #[must_use]
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

/// One configured server: how to reach it plus optional credential requirements.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    #[serde(flatten)]
    pub launch: LaunchSpec,

    /// Keys that must be present in this server's credential blob. Empty means "presence of the
    /// blob is enough".
    #[serde(default)]
    pub required_credentials: Vec<String>,
}

/// How a server process is reached.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum LaunchSpec {
    /// Spawn a child process and speak MCP over its stdio.
    Stdio {
        command: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        env: HashMap<String, String>,
        #[serde(default)]
        cwd: Option<PathBuf>,
    },
    /// Connect to an already running server over MCP streamable HTTP.
    #[serde(rename_all = "camelCase")]
    StreamableHttp {
        url: String,
        #[serde(default)]
        auth_header: Option<String>,
    },
}

impl HubConfig {
    /// Load and validate a config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, does not parse, or fails validation.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&raw)
            .map_err(|e| HubError::Config(format!("{}: {e}", path.display())))
    }

    /// Parse and validate config text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text does not parse or fails validation.
    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        let cfg: HubConfig = serde_yaml::from_str(raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check structural constraints that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Config`] describing the first violation.
    pub fn validate(&self) -> Result<()> {
        if self.clients.is_empty() {
            return Err(HubError::Config(
                "at least one client identifier is required".to_string(),
            ));
        }
        if self.clients.iter().any(|c| c.trim().is_empty()) {
            return Err(HubError::Config(
                "client identifiers must not be empty".to_string(),
            ));
        }
        if self.hub.list_tools_timeout_ms == 0
            || self.hub.request_timeout_ms == 0
            || self.hub.startup_timeout_ms == 0
            || self.hub.call_timeout_ms == 0
        {
            return Err(HubError::Config("timeouts must be positive".to_string()));
        }

        for (name, server) in &self.servers {
            if name.trim().is_empty() {
                return Err(HubError::Config("server names must not be empty".to_string()));
            }
            match &server.launch {
                LaunchSpec::Stdio { command, .. } if command.trim().is_empty() => {
                    return Err(HubError::Config(format!(
                        "server '{name}': stdio command must not be empty"
                    )));
                }
                LaunchSpec::StreamableHttp { url, .. } if url.trim().is_empty() => {
                    return Err(HubError::Config(format!(
                        "server '{name}': url must not be empty"
                    )));
                }
                _ => {}
            }
            if server.required_credentials.iter().any(|k| k.is_empty()) {
                return Err(HubError::Config(format!(
                    "server '{name}': requiredCredentials entries must not be empty"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
hub:
  listToolsTimeoutMs: 5000
  startupTimeoutMs: 2000
clients: [MCP_CLIENT_AZURE_AI, MCP_CLIENT_OPENAI, MCP_CLIENT_GEMINI]
servers:
  DOCKERHUB:
    type: stdio
    command: uv
    args: ["--directory", "../servers/DOCKERHUB/mcp-dockerhub", "run", "mcp-dockerhub"]
    requiredCredentials: [username, token]
  NOTION:
    type: streamableHttp
    url: http://127.0.0.1:9000/mcp
    authHeader: secret
"#;

    #[test]
    fn parses_both_launch_kinds() {
        let cfg = HubConfig::from_yaml_str(SAMPLE).expect("parse sample");
        assert_eq!(cfg.clients.len(), 3);
        assert_eq!(cfg.hub.list_tools_timeout_ms, 5000);
        assert_eq!(cfg.hub.request_timeout_ms, 60_000);
        assert_eq!(cfg.hub.startup_timeout(), Duration::from_secs(2));
        assert_eq!(cfg.hub.call_timeout_ms, 60_000);

        let docker = cfg.servers.get("DOCKERHUB").expect("DOCKERHUB");
        assert_eq!(docker.required_credentials, vec!["username", "token"]);
        match &docker.launch {
            LaunchSpec::Stdio { command, args, .. } => {
                assert_eq!(command, "uv");
                assert_eq!(args.len(), 4);
            }
            other => panic!("unexpected launch spec: {other:?}"),
        }

        let notion = cfg.servers.get("NOTION").expect("NOTION");
        assert!(notion.required_credentials.is_empty());
        match &notion.launch {
            LaunchSpec::StreamableHttp { url, auth_header } => {
                assert_eq!(url, "http://127.0.0.1:9000/mcp");
                assert_eq!(auth_header.as_deref(), Some("secret"));
            }
            other => panic!("unexpected launch spec: {other:?}"),
        }
    }

    #[test]
    fn json_config_is_accepted() {
        let cfg = HubConfig::from_yaml_str(
            r#"{"clients": ["MCP_CLIENT_OPENAI"], "servers": {"CUSTOM": {"type": "stdio", "command": "mcp-custom"}}}"#,
        )
        .expect("parse json");
        assert!(cfg.servers.contains_key("CUSTOM"));
    }

    #[test]
    fn rejects_missing_clients() {
        let err = HubConfig::from_yaml_str("servers: {}").expect_err("no clients");
        assert!(matches!(err, HubError::Config(_)));
    }

    #[test]
    fn rejects_empty_stdio_command() {
        let err = HubConfig::from_yaml_str(
            r#"
clients: [A]
servers:
  S:
    type: stdio
    command: ""
"#,
        )
        .expect_err("empty command");
        assert!(err.to_string().contains("stdio command must not be empty"));
    }

    #[test]
    fn rejects_zero_startup_timeout() {
        let err = HubConfig::from_yaml_str("hub: {startupTimeoutMs: 0}\nclients: [A]")
            .expect_err("zero timeout");
        assert!(err.to_string().contains("timeouts must be positive"));
    }

    #[test]
    fn rejects_unknown_launch_type() {
        let err = HubConfig::from_yaml_str(
            r#"
clients: [A]
servers:
  S:
    type: carrier-pigeon
"#,
        )
        .expect_err("unknown type");
        assert!(matches!(err, HubError::Yaml(_)));
    }
}
