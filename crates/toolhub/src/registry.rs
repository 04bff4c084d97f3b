//! Static server and client registries.
//!
//! Both are built once at startup and only read afterwards, so they are shared as plain `Arc`s
//! without locks.

use crate::config::{HubConfig, ServerConfig};
use crate::error::HubError;
use crate::source::{McpServer, ToolSource};
use futures::future::join_all;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

/// A registered server: its live handle plus the credential keys it insists on.
#[derive(Clone)]
pub struct ServerEntry {
    pub source: Arc<dyn ToolSource>,
    pub required_credentials: Vec<String>,
}

#[derive(Clone, Default)]
pub struct ServerRegistry {
    servers: HashMap<String, ServerEntry>,
}

impl ServerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a live handle under its own name. A later registration with the same name wins.
    pub fn insert(&mut self, source: Arc<dyn ToolSource>, required_credentials: Vec<String>) {
        let name = source.name().to_string();
        if self
            .servers
            .insert(
                name.clone(),
                ServerEntry {
                    source,
                    required_credentials,
                },
            )
            .is_some()
        {
            tracing::warn!(server = %name, "server registered twice; keeping the latest");
        }
    }

    /// Connect every configured server concurrently.
    ///
    /// Servers that fail to start, or do not finish the handshake within `startup_timeout`, are
    /// logged and left out, so requests naming them fail the membership gate.
    pub async fn connect(
        servers: &HashMap<String, ServerConfig>,
        startup_timeout: Duration,
    ) -> Self {
        let attempts = servers.iter().map(|(name, cfg)| async move {
            let result =
                match tokio::time::timeout(startup_timeout, McpServer::connect(name, &cfg.launch))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(HubError::Startup(format!(
                        "server '{name}' did not finish initialization within {}ms",
                        startup_timeout.as_millis()
                    ))),
                };
            (name, cfg, result)
        });

        let mut registry = Self::new();
        for (name, cfg, result) in join_all(attempts).await {
            match result {
                Ok(server) => {
                    registry.insert(Arc::new(server), cfg.required_credentials.clone());
                }
                Err(e) => {
                    tracing::error!(server = %name, error = %e, "server failed to start; not registered");
                }
            }
        }
        registry
    }

    /// Look up a server by name. No I/O happens here.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<&ServerEntry> {
        self.servers.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.servers.contains_key(name)
    }

    #[must_use]
    pub fn list_known_names(&self) -> BTreeSet<String> {
        self.servers.keys().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.servers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ClientRegistry {
    clients: HashSet<String>,
}

impl ClientRegistry {
    pub fn new<I, S>(clients: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            clients: clients.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn from_config(cfg: &HubConfig) -> Self {
        Self::new(cfg.clients.iter().cloned())
    }

    #[must_use]
    pub fn is_known(&self, identifier: &str) -> bool {
        self.clients.contains(identifier)
    }

    #[must_use]
    pub fn list_known(&self) -> BTreeSet<String> {
        self.clients.iter().cloned().collect()
    }
}
