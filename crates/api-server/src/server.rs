//! API server: REST routes for segmentation and tools, plus the metrics exporter.

use crate::rest::{self, AppState};
use crate::swagger::ApiDoc;
use crate::tools_rest;
use axum::routing::{get, post};
use axum::Router;
use audience_core::config::AppConfig;
use audience_segmentation::{SegmentationEngine, ToolRegistry};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub struct ApiServer {
    config: AppConfig,
    engine: Arc<SegmentationEngine>,
    tools: Arc<ToolRegistry>,
}

impl ApiServer {
    pub fn new(config: AppConfig, engine: Arc<SegmentationEngine>, tools: Arc<ToolRegistry>) -> Self {
        Self {
            config,
            engine,
            tools,
        }
    }

    /// Build the HTTP router with all routes and middleware.
    pub fn router(&self) -> Router {
        let state = AppState {
            engine: self.engine.clone(),
            tools: self.tools.clone(),
            node_id: self.config.node_id.clone(),
            start_time: Instant::now(),
        };

        Router::new()
            // Segmentation
            .route("/v1/segments/strategy", post(rest::handle_strategy))
            // Tools
            .route("/v1/tools", get(tools_rest::handle_list_tools))
            .route("/v1/tools/:name", post(tools_rest::handle_invoke_tool))
            // Operational endpoints
            .route("/health", get(rest::health_check))
            .route("/ready", get(rest::readiness))
            .route("/live", get(rest::liveness))
            .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
            // Middleware
            .layer(CompressionLayer::new())
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Start the HTTP REST server.
    pub async fn start_http(&self) -> anyhow::Result<()> {
        let app = self.router();

        let addr = SocketAddr::new(self.config.api.host.parse()?, self.config.api.http_port);

        info!(addr = %addr, "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }

    /// Start the metrics server on a separate port.
    pub async fn start_metrics(&self) -> anyhow::Result<()> {
        if !self.config.metrics.enabled {
            info!("Metrics exporter disabled");
            return Ok(());
        }

        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(SocketAddr::new(
                self.config.api.host.parse()?,
                self.config.metrics.port,
            ))
            .install()?;

        info!(port = self.config.metrics.port, "Metrics exporter started");
        Ok(())
    }
}
