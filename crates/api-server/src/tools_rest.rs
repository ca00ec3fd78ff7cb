//! Tool discovery and invocation endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

use crate::rest::{error_response, AppState, ErrorResponse};

#[derive(Serialize, ToSchema)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    /// JSON Schema of the tool arguments.
    #[schema(value_type = Object)]
    pub parameters: Value,
}

/// GET /v1/tools: List registered tools with their argument schemas.
#[utoipa::path(
    get,
    path = "/v1/tools",
    tag = "Tools",
    responses((status = 200, description = "Registered tools", body = [ToolInfo]))
)]
pub async fn handle_list_tools(State(state): State<AppState>) -> Json<Vec<ToolInfo>> {
    let tools = state
        .tools
        .descriptors()
        .into_iter()
        .map(|d| ToolInfo {
            name: d.name,
            description: d.description,
            parameters: d.parameters,
        })
        .collect();
    Json(tools)
}

/// POST /v1/tools/{name}: Invoke a registered tool with JSON arguments.
#[utoipa::path(
    post,
    path = "/v1/tools/{name}",
    tag = "Tools",
    params(("name" = String, Path, description = "Registered tool name")),
    responses(
        (status = 200, description = "Tool output"),
        (status = 400, description = "Invalid arguments", body = ErrorResponse),
        (status = 404, description = "Unknown tool", body = ErrorResponse),
    )
)]
pub async fn handle_invoke_tool(
    State(state): State<AppState>,
    Path(name): Path<String>,
    arguments: Option<Json<Value>>,
) -> Result<Json<Value>, (StatusCode, Json<ErrorResponse>)> {
    let arguments = arguments.map(|Json(v)| v).unwrap_or(Value::Null);
    metrics::counter!("api.tool_invocations", "tool" => name.clone()).increment(1);

    state
        .tools
        .invoke(&name, arguments)
        .await
        .map(Json)
        .map_err(|e| error_response(e, "tool_invocation_failed"))
}
