#![allow(dead_code)]

use anyhow::Context as _;
use std::net::TcpListener;
use std::process::{Child, Command};
use std::time::{Duration, Instant};

/// Kills the spawned hub when a test ends, pass or fail.
pub struct KillOnDrop(pub Child);

impl Drop for KillOnDrop {
    fn drop(&mut self) {
        let _ = self.0.kill();
        let _ = self.0.wait();
    }
}

/// Ask the OS for a free localhost port. The port is not reserved.
pub fn pick_unused_port() -> anyhow::Result<u16> {
    let listener = TcpListener::bind("127.0.0.1:0").context("bind ephemeral port")?;
    Ok(listener.local_addr()?.port())
}

/// Write a hub config whose servers all run the stdio test server with the given profiles.
pub fn write_hub_config(
    servers: &[(&str, &str)],
    extra_server_yaml: &str,
) -> anyhow::Result<tempfile::NamedTempFile> {
    let bin = env!("CARGO_BIN_EXE_mcp-toolhub-stdio-test-server");

    let mut cfg = String::from(
        "hub:\n  listToolsTimeoutMs: 5000\nclients: [MCP_CLIENT_AZURE_AI, MCP_CLIENT_OPENAI, MCP_CLIENT_GEMINI]\nservers:\n",
    );
    for (name, profile) in servers {
        cfg.push_str(&format!(
            "  {name}:\n    type: stdio\n    command: \"{bin}\"\n    args: [\"--profile\", \"{profile}\"]\n"
        ));
    }
    cfg.push_str(extra_server_yaml);

    let file = tempfile::NamedTempFile::new().context("create temp config")?;
    std::fs::write(file.path(), cfg).context("write temp config")?;
    Ok(file)
}

pub struct Hub {
    pub base_url: String,
    _child: KillOnDrop,
}

/// Start the hub binary and wait until `/health` answers.
pub async fn start_hub(config_path: &std::path::Path) -> anyhow::Result<Hub> {
    let port = pick_unused_port()?;
    let child = Command::new(env!("CARGO_BIN_EXE_mcp-toolhub"))
        .arg("--config")
        .arg(config_path)
        .arg("--bind")
        .arg(format!("127.0.0.1:{port}"))
        .arg("--log-level")
        .arg("info")
        .spawn()
        .context("spawn mcp-toolhub")?;
    let child = KillOnDrop(child);

    let base_url = format!("http://127.0.0.1:{port}");
    wait_http_ok(&format!("{base_url}/health"), Duration::from_secs(20)).await?;
    Ok(Hub {
        base_url,
        _child: child,
    })
}

pub async fn wait_http_ok(url: &str, timeout_dur: Duration) -> anyhow::Result<()> {
    let client = reqwest::Client::new();
    let start = Instant::now();
    loop {
        if start.elapsed() > timeout_dur {
            anyhow::bail!("timed out waiting for {url}");
        }
        match client.get(url).send().await {
            Ok(resp) if resp.status().is_success() => return Ok(()),
            _ => tokio::time::sleep(Duration::from_millis(200)).await,
        }
    }
}

pub async fn post_json(
    url: &str,
    body: &serde_json::Value,
) -> anyhow::Result<(reqwest::StatusCode, serde_json::Value)> {
    let resp = reqwest::Client::new()
        .post(url)
        .json(body)
        .send()
        .await
        .with_context(|| format!("POST {url}"))?;
    let status = resp.status();
    let text = resp.text().await.context("read response body")?;
    let value = serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text));
    Ok((status, value))
}
