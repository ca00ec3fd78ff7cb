//! OpenAPI specification and Swagger UI configuration.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Audience Planner API",
        version = "0.1.0",
        description = "Splits a client base into a few high-coverage audience segments for campaign targeting.",
        license(name = "MIT"),
    ),
    tags(
        (name = "Segmentation", description = "Coverage-maximizing segment strategies"),
        (name = "Tools", description = "Registered tools and their invocation"),
        (name = "Operations", description = "Health, readiness, and liveness probes"),
    ),
    paths(
        // Segmentation
        crate::rest::handle_strategy,
        // Tools
        crate::tools_rest::handle_list_tools,
        crate::tools_rest::handle_invoke_tool,
        // Operations
        crate::rest::health_check,
        crate::rest::readiness,
        crate::rest::liveness,
    ),
    components(schemas(
        // Request / result types
        audience_core::types::SegmentationRequest,
        audience_core::types::FilterInput,
        audience_core::types::MatchInput,
        audience_core::types::StrategyResult,
        audience_core::types::SegmentGroup,
        // REST types
        crate::rest::ErrorResponse,
        crate::rest::HealthResponse,
        crate::tools_rest::ToolInfo,
    ))
)]
pub struct ApiDoc;
