mod common;

use anyhow::Context as _;
use common::{post_json, start_hub, write_hub_config};
use serde_json::json;

fn dockerhub_request(servers: &[&str]) -> serde_json::Value {
    let credentials: serde_json::Map<String, serde_json::Value> = servers
        .iter()
        .map(|s| ((*s).to_string(), json!({ "username": "u", "token": "t" })))
        .collect();
    json!({
        "selected_client": "MCP_CLIENT_OPENAI",
        "selected_servers": servers,
        "selected_server_credentials": credentials,
        "client_details": { "model": "gpt-4" }
    })
}

fn tool_names(body: &serde_json::Value) -> Vec<&str> {
    body["payload"]["client_details"]["tools"]
        .as_array()
        .map(|tools| {
            tools
                .iter()
                .filter_map(|t| t["function"]["name"].as_str())
                .collect()
        })
        .unwrap_or_default()
}

#[tokio::test]
async fn validate_aggregates_tools_from_stdio_server() -> anyhow::Result<()> {
    let config = write_hub_config(&[("DOCKERHUB", "dockerhub")], "")?;
    let hub = start_hub(config.path()).await?;

    let (status, body) = post_json(
        &format!("{}/validate", hub.base_url),
        &dockerhub_request(&["DOCKERHUB"]),
    )
    .await?;
    anyhow::ensure!(status.is_success(), "POST /validate returned {status}");
    assert_eq!(body["status"], json!(true), "{body}");
    assert_eq!(body["error"], serde_json::Value::Null);

    let tools = body["payload"]["client_details"]["tools"]
        .as_array()
        .context("payload.client_details.tools")?;
    let names: Vec<&str> = tools
        .iter()
        .filter_map(|t| t["function"]["name"].as_str())
        .collect();
    assert_eq!(names, vec!["list_repositories", "list_tags", "get_manifest"]);

    assert_eq!(
        tools[0],
        json!({
            "type": "function",
            "function": {
                "name": "list_repositories",
                "description": "Tool for list_repositories",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "server_credentials": {
                            "type": "object",
                            "description": "Server credentials (automatically provided)"
                        }
                    },
                    "required": ["server_credentials"]
                }
            }
        })
    );
    assert_eq!(
        tools[1]["function"]["parameters"]["required"],
        json!(["repo", "server_credentials"])
    );
    assert_eq!(body["payload"]["client_details"]["model"], json!("gpt-4"));
    assert_eq!(
        body["payload"]["selected_server_credentials"]["DOCKERHUB"]["token"],
        json!("t")
    );

    Ok(())
}

#[tokio::test]
async fn validate_keeps_caller_server_order() -> anyhow::Result<()> {
    let config = write_hub_config(&[("DOCKERHUB", "dockerhub"), ("NOTION", "notion")], "")?;
    let hub = start_hub(config.path()).await?;
    let url = format!("{}/validate", hub.base_url);

    let (_, body) = post_json(&url, &dockerhub_request(&["NOTION", "DOCKERHUB"])).await?;
    assert_eq!(body["status"], json!(true), "{body}");
    assert_eq!(body["payload"]["selected_servers"], json!(["NOTION", "DOCKERHUB"]));
    assert_eq!(
        tool_names(&body),
        vec![
            "create_page",
            "query_database",
            "list_repositories",
            "list_tags",
            "get_manifest"
        ]
    );

    let (_, body) = post_json(&url, &dockerhub_request(&["DOCKERHUB", "NOTION"])).await?;
    assert_eq!(body["status"], json!(true), "{body}");
    assert_eq!(
        tool_names(&body),
        vec![
            "list_repositories",
            "list_tags",
            "get_manifest",
            "create_page",
            "query_database"
        ]
    );
    Ok(())
}

#[tokio::test]
async fn server_without_tools_adds_nothing() -> anyhow::Result<()> {
    let config = write_hub_config(&[("DOCKERHUB", "dockerhub"), ("CUSTOM", "empty")], "")?;
    let hub = start_hub(config.path()).await?;

    let (_, body) = post_json(
        &format!("{}/validate", hub.base_url),
        &dockerhub_request(&["CUSTOM", "DOCKERHUB"]),
    )
    .await?;
    assert_eq!(body["status"], json!(true), "{body}");
    assert_eq!(
        tool_names(&body),
        vec!["list_repositories", "list_tags", "get_manifest"]
    );
    Ok(())
}

#[tokio::test]
async fn validate_gates_report_contract_errors() -> anyhow::Result<()> {
    let config = write_hub_config(&[("DOCKERHUB", "dockerhub")], "")?;
    let hub = start_hub(config.path()).await?;
    let url = format!("{}/validate", hub.base_url);

    let mut empty_servers = dockerhub_request(&["DOCKERHUB"]);
    empty_servers["selected_servers"] = json!([]);
    let (_, body) = post_json(&url, &empty_servers).await?;
    assert_eq!(
        body,
        json!({ "payload": null, "error": "Invalid Request Payload", "status": false })
    );

    let (_, body) = post_json(&url, &dockerhub_request(&["DOCKERHUB", "MCP-GSUITE"])).await?;
    assert_eq!(body["error"], json!("Invalid Server"));
    assert_eq!(body["payload"], serde_json::Value::Null);

    let mut bad_client = dockerhub_request(&["DOCKERHUB"]);
    bad_client["selected_client"] = json!("MCP_CLIENT_UNKNOWN");
    let (_, body) = post_json(&url, &bad_client).await?;
    assert_eq!(body["error"], json!("Invalid Client"));
    assert_eq!(body["status"], json!(false));

    Ok(())
}

#[tokio::test]
async fn upstream_fault_fails_whole_request() -> anyhow::Result<()> {
    let config = write_hub_config(&[("DOCKERHUB", "dockerhub"), ("DATAROBOT", "broken")], "")?;
    let hub = start_hub(config.path()).await?;

    let (_, body) = post_json(
        &format!("{}/validate", hub.base_url),
        &dockerhub_request(&["DOCKERHUB", "DATAROBOT"]),
    )
    .await?;
    assert_eq!(body["status"], json!(false), "{body}");
    assert_eq!(body["payload"], serde_json::Value::Null);
    let error = body["error"].as_str().context("error string")?;
    assert!(error.contains("DATAROBOT"), "{error}");
    Ok(())
}

#[tokio::test]
async fn servers_that_fail_to_start_are_unknown() -> anyhow::Result<()> {
    let config = write_hub_config(
        &[("DOCKERHUB", "dockerhub")],
        "  GHOST:\n    type: stdio\n    command: /nonexistent/mcp-ghost-server\n",
    )?;
    let hub = start_hub(config.path()).await?;

    let registry: serde_json::Value = reqwest::get(format!("{}/registry", hub.base_url))
        .await
        .context("GET /registry")?
        .error_for_status()?
        .json()
        .await
        .context("GET /registry json")?;
    assert_eq!(registry["servers"], json!(["DOCKERHUB"]));
    assert_eq!(
        registry["clients"],
        json!(["MCP_CLIENT_AZURE_AI", "MCP_CLIENT_GEMINI", "MCP_CLIENT_OPENAI"])
    );

    let (_, body) = post_json(
        &format!("{}/validate", hub.base_url),
        &dockerhub_request(&["GHOST"]),
    )
    .await?;
    assert_eq!(body["error"], json!("Invalid Server"));
    Ok(())
}
