//! Minimal MCP stdio server used only for hub integration tests.
//!
//! It speaks line-delimited JSON-RPC directly and does not share code with the hub. The
//! `--profile` flag picks which tool list it advertises.

use clap::{Parser, ValueEnum};
use serde_json::{Value, json};
use std::io::{BufRead as _, Write};

#[derive(Debug, Parser)]
struct Args {
    #[arg(long, value_enum, default_value_t = Profile::Dockerhub)]
    profile: Profile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Profile {
    /// DockerHub-shaped tools.
    Dockerhub,
    /// Notion-shaped tools.
    Notion,
    /// Advertises no tools.
    Empty,
    /// `tools/list` answers with a JSON-RPC error.
    Broken,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout().lock();

    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        if let Some(resp) = handle_line(args.profile, &line) {
            write_json_line(&mut stdout, &resp)?;
        }
    }

    Ok(())
}

fn handle_line(profile: Profile, line: &str) -> Option<Value> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let msg: Value = serde_json::from_str(line).ok()?;
    let method = msg.get("method").and_then(Value::as_str)?;

    // Notifications carry no id and get no answer.
    let id = msg.get("id")?.clone();

    match method {
        "initialize" => Some(jsonrpc_ok(&id, &initialize_result(&msg))),
        "tools/list" => match profile {
            Profile::Broken => Some(jsonrpc_err(
                &id,
                &json!({ "code": -32603, "message": "upstream API unreachable" }),
            )),
            Profile::Empty => Some(jsonrpc_ok(&id, &json!({ "tools": [] }))),
            Profile::Dockerhub => Some(jsonrpc_ok(&id, &dockerhub_tools())),
            Profile::Notion => Some(jsonrpc_ok(&id, &notion_tools())),
        },
        "tools/call" => Some(jsonrpc_ok(&id, &tools_call_result(&msg))),
        "ping" => Some(jsonrpc_ok(&id, &json!({}))),
        _ => Some(jsonrpc_err(
            &id,
            &json!({ "code": -32601, "message": "method not found" }),
        )),
    }
}

fn initialize_result(msg: &Value) -> Value {
    let protocol_version = msg
        .get("params")
        .and_then(|p| p.get("protocolVersion"))
        .and_then(Value::as_str)
        .unwrap_or("2024-11-05");

    json!({
        "protocolVersion": protocol_version,
        "capabilities": { "tools": {} },
        "serverInfo": { "name": "mcp-toolhub-stdio-test-server", "version": "0" }
    })
}

fn dockerhub_tools() -> Value {
    json!({
        "tools": [
            {
                "name": "list_repositories",
                "inputSchema": { "type": "object", "properties": {}, "required": [] }
            },
            {
                "name": "list_tags",
                "description": "List tags of a repository.",
                "inputSchema": {
                    "type": "object",
                    "properties": { "repo": { "type": "string" } },
                    "required": ["repo"]
                }
            },
            {
                "name": "get_manifest",
                "description": "Fetch the manifest of a tag.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "repo": { "type": "string" },
                        "tag": { "type": "string" }
                    },
                    "required": ["repo", "tag"]
                }
            }
        ]
    })
}

fn notion_tools() -> Value {
    json!({
        "tools": [
            {
                "name": "create_page",
                "description": "Create a page under a parent page.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "parent_id": { "type": "string" },
                        "title": { "type": "string" }
                    },
                    "required": ["parent_id", "title"]
                }
            },
            {
                "name": "query_database",
                "inputSchema": {
                    "type": "object",
                    "properties": { "database_id": { "type": "string" } },
                    "required": ["database_id"]
                }
            }
        ]
    })
}

fn tools_call_result(msg: &Value) -> Value {
    let params = msg.get("params");
    let name = params
        .and_then(|p| p.get("name"))
        .and_then(Value::as_str)
        .unwrap_or("");
    let has_credentials = params
        .and_then(|p| p.get("arguments"))
        .and_then(|a| a.get("server_credentials"))
        .is_some();

    let body = json!({ "tool": name, "receivedCredentials": has_credentials });
    json!({ "content": [{ "type": "text", "text": body.to_string() }] })
}

fn jsonrpc_ok(id: &Value, result: &Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "result": result })
}

fn jsonrpc_err(id: &Value, error: &Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "error": error })
}

fn write_json_line(stdout: &mut dyn Write, v: &Value) -> anyhow::Result<()> {
    writeln!(stdout, "{}", serde_json::to_string(v)?)?;
    stdout.flush()?;
    Ok(())
}
