//! Request validation and tool aggregation.
//!
//! A call walks a fixed gate sequence (presence → servers → client → credentials), then fans out
//! `tools/list` to every selected server concurrently and assembles one ordered, normalized tool
//! catalog. Every outcome, including upstream faults, timeouts and cancellation, ends in one of the
//! two [`ValidationResult`] shapes.

use crate::config::HubSettings;
use crate::error::{InvokeError, ValidationError};
use crate::normalizer::{CREDENTIALS_FIELD, NormalizedTool, normalize};
use crate::registry::{ClientRegistry, ServerRegistry};
use futures::future::try_join_all;
use rmcp::model::CallToolResult;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Inbound request. Every field is optional on the wire so that a missing field is reported as
/// "Invalid Request Payload" rather than as a decoding error.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ValidationRequest {
    #[serde(default)]
    pub selected_client: Option<String>,
    #[serde(default)]
    pub selected_servers: Option<Vec<String>>,
    #[serde(default)]
    pub selected_server_credentials: Option<Map<String, Value>>,
    #[serde(default)]
    pub client_details: Option<Map<String, Value>>,
}

impl ValidationRequest {
    /// Decode a request from arbitrary JSON.
    ///
    /// # Errors
    ///
    /// Any shape mismatch (non-object body, wrong field types) is [`ValidationError::InvalidRequest`].
    pub fn from_json(value: Value) -> Result<Self, ValidationError> {
        serde_json::from_value(value).map_err(|e| {
            tracing::debug!(error = %e, "request body does not decode");
            ValidationError::InvalidRequest
        })
    }
}

/// A request that passed the presence gate.
#[derive(Debug, Clone)]
struct PresentRequest {
    selected_client: String,
    selected_servers: Vec<String>,
    selected_server_credentials: Map<String, Value>,
    client_details: Map<String, Value>,
}

impl TryFrom<ValidationRequest> for PresentRequest {
    type Error = ValidationError;

    fn try_from(req: ValidationRequest) -> Result<Self, Self::Error> {
        match req {
            ValidationRequest {
                selected_client: Some(selected_client),
                selected_servers: Some(selected_servers),
                selected_server_credentials: Some(selected_server_credentials),
                client_details: Some(client_details),
            } if !selected_client.is_empty()
                && !selected_servers.is_empty()
                && !selected_server_credentials.is_empty()
                && !client_details.is_empty() =>
            {
                Ok(Self {
                    selected_client,
                    selected_servers,
                    selected_server_credentials,
                    client_details,
                })
            }
            _ => Err(ValidationError::InvalidRequest),
        }
    }
}

/// Payload handed to the downstream model client. `client_details.tools` holds the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalPayload {
    pub selected_client: String,
    pub selected_servers: Vec<String>,
    pub selected_server_credentials: Map<String, Value>,
    pub client_details: Map<String, Value>,
}

/// Either `{payload, error: null, status: true}` or `{payload: null, error, status: false}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub payload: Option<FinalPayload>,
    pub error: Option<String>,
    pub status: bool,
}

impl ValidationResult {
    #[must_use]
    pub fn success(payload: FinalPayload) -> Self {
        Self {
            payload: Some(payload),
            error: None,
            status: true,
        }
    }

    #[must_use]
    pub fn failure(error: &ValidationError) -> Self {
        Self {
            payload: None,
            error: Some(error.to_string()),
            status: false,
        }
    }
}

impl From<Result<FinalPayload, ValidationError>> for ValidationResult {
    fn from(outcome: Result<FinalPayload, ValidationError>) -> Self {
        match outcome {
            Ok(payload) => Self::success(payload),
            Err(e) => Self::failure(&e),
        }
    }
}

/// The validation and aggregation pipeline. Cheap to clone; holds only read-only registries.
#[derive(Clone)]
pub struct Pipeline {
    servers: Arc<ServerRegistry>,
    clients: Arc<ClientRegistry>,
    list_tools_timeout: Duration,
    request_timeout: Duration,
    call_timeout: Duration,
}

impl Pipeline {
    #[must_use]
    pub fn new(servers: Arc<ServerRegistry>, clients: Arc<ClientRegistry>) -> Self {
        Self::with_settings(servers, clients, &HubSettings::default())
    }

    #[must_use]
    pub fn with_settings(
        servers: Arc<ServerRegistry>,
        clients: Arc<ClientRegistry>,
        settings: &HubSettings,
    ) -> Self {
        Self {
            servers,
            clients,
            list_tools_timeout: settings.list_tools_timeout(),
            request_timeout: settings.request_timeout(),
            call_timeout: settings.call_timeout(),
        }
    }

    #[must_use]
    pub fn servers(&self) -> &ServerRegistry {
        &self.servers
    }

    #[must_use]
    pub fn clients(&self) -> &ClientRegistry {
        &self.clients
    }

    /// Validate a request and build the downstream payload.
    ///
    /// Never fails: all errors, timeouts and cancellation are folded into the failure shape, and
    /// no partial catalog is ever returned.
    pub async fn validate_and_aggregate(
        &self,
        request: ValidationRequest,
        cancel: &CancellationToken,
    ) -> ValidationResult {
        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(ValidationError::Cancelled),
            res = tokio::time::timeout(self.request_timeout, self.run(request)) => {
                res.unwrap_or(Err(ValidationError::Timeout))
            }
        };

        match &outcome {
            Ok(payload) => tracing::debug!(
                client = %payload.selected_client,
                servers = payload.selected_servers.len(),
                "validation succeeded"
            ),
            Err(e) => tracing::debug!(error = %e, "validation failed"),
        }
        outcome.into()
    }

    async fn run(&self, request: ValidationRequest) -> Result<FinalPayload, ValidationError> {
        let request = PresentRequest::try_from(request)?;

        if let Some(unknown) = request
            .selected_servers
            .iter()
            .find(|name| !self.servers.contains(name))
        {
            return Err(ValidationError::UnknownServer(unknown.clone()));
        }

        if !self.clients.is_known(&request.selected_client) {
            return Err(ValidationError::UnknownClient(
                request.selected_client.clone(),
            ));
        }

        self.check_credentials(&request)?;

        let tools = self.aggregate_tools(&request.selected_servers).await?;

        let PresentRequest {
            selected_client,
            selected_servers,
            selected_server_credentials,
            mut client_details,
        } = request;
        let tools = serde_json::to_value(tools).map_err(|e| ValidationError::Upstream {
            server: selected_servers.join(","),
            message: format!("serialize tools: {e}"),
        })?;
        client_details.insert("tools".to_string(), tools);

        Ok(FinalPayload {
            selected_client,
            selected_servers,
            selected_server_credentials,
            client_details,
        })
    }

    /// Only servers configured with `requiredCredentials` are checked.
    fn check_credentials(&self, request: &PresentRequest) -> Result<(), ValidationError> {
        for server in &request.selected_servers {
            let Some(entry) = self.servers.resolve(server) else {
                return Err(ValidationError::UnknownServer(server.clone()));
            };
            if entry.required_credentials.is_empty() {
                continue;
            }

            let blob = request
                .selected_server_credentials
                .get(server)
                .and_then(Value::as_object);
            let missing = entry.required_credentials.iter().find(|field| {
                blob.and_then(|b| b.get(field.as_str()))
                    .is_none_or(Value::is_null)
            });
            if let Some(field) = missing {
                return Err(ValidationError::MissingCredentials {
                    server: server.clone(),
                    field: field.clone(),
                });
            }
        }
        Ok(())
    }

    /// Concurrent fan-out; output keeps caller server order, then server tool order.
    async fn aggregate_tools(
        &self,
        servers: &[String],
    ) -> Result<Vec<NormalizedTool>, ValidationError> {
        let per_server = try_join_all(servers.iter().map(|name| self.server_tools(name))).await?;
        Ok(per_server.into_iter().flatten().collect())
    }

    async fn server_tools(&self, name: &str) -> Result<Vec<NormalizedTool>, ValidationError> {
        let entry = self
            .servers
            .resolve(name)
            .ok_or_else(|| ValidationError::UnknownServer(name.to_string()))?;

        let descriptors =
            match tokio::time::timeout(self.list_tools_timeout, entry.source.list_tools()).await {
                Ok(Ok(descriptors)) => descriptors,
                Ok(Err(e)) => {
                    tracing::warn!(server = %name, error = %e, "tools/list failed");
                    return Err(ValidationError::Upstream {
                        server: name.to_string(),
                        message: e.to_string(),
                    });
                }
                Err(_) => {
                    tracing::warn!(server = %name, "tools/list timed out");
                    return Err(ValidationError::ListToolsTimeout {
                        server: name.to_string(),
                        timeout_ms: self.list_tools_timeout.as_millis(),
                    });
                }
            };

        tracing::debug!(server = %name, tools = descriptors.len(), "listed tools");
        Ok(descriptors.iter().map(normalize).collect())
    }

    /// Forward a tool call to a registered server.
    ///
    /// The arguments must carry `server_credentials`; that is what every normalized schema
    /// promises the downstream client will send.
    ///
    /// # Errors
    ///
    /// Returns [`InvokeError`] for unknown servers and missing credentials. Upstream failures and
    /// calls that outlast the call timeout are [`InvokeError::Upstream`].
    pub async fn invoke_tool(
        &self,
        server: &str,
        tool: &str,
        arguments: Map<String, Value>,
    ) -> Result<CallToolResult, InvokeError> {
        let entry = self
            .servers
            .resolve(server)
            .ok_or_else(|| InvokeError::UnknownServer(server.to_string()))?;

        if !arguments.contains_key(CREDENTIALS_FIELD) {
            return Err(InvokeError::MissingCredentials);
        }

        match tokio::time::timeout(self.call_timeout, entry.source.call_tool(tool, arguments)).await
        {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(e)) => {
                tracing::warn!(server = %server, tool = %tool, error = %e, "tools/call failed");
                Err(InvokeError::Upstream(e.to_string()))
            }
            Err(_) => {
                tracing::warn!(server = %server, tool = %tool, "tools/call timed out");
                Err(InvokeError::Upstream(format!(
                    "server '{server}' timed out calling '{tool}' after {}ms",
                    self.call_timeout.as_millis()
                )))
            }
        }
    }
}
