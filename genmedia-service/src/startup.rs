//! Application startup and lifecycle management.

use crate::config::{GenmediaConfig, ProviderKind};
use crate::handlers;
use crate::middleware::ApiKey;
use crate::services::metrics;
use crate::services::providers::gemini::{GeminiConfig, GeminiGatewayFactory};
use crate::services::providers::mock::{MockGatewayFactory, MockScript};
use crate::services::providers::{GatewayFactory, ProviderError, ProviderGateway};
use crate::services::{ArtifactStore, GenerationOrchestrator, LocalImageScanner, PollPolicy};
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use service_core::error::AppError;
use service_core::middleware::request_id::{request_id_middleware, RequestId};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Public URL prefix of generated artifacts.
pub const GENERATED_PREFIX: &str = "storage/generated";

/// Public URL prefix of uploaded images.
pub const UPLOADS_PREFIX: &str = "storage/uploads";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: GenmediaConfig,
    pub gateways: Arc<dyn GatewayFactory>,
    pub generated: ArtifactStore,
    pub uploads: ArtifactStore,
    /// Cancelled on shutdown; every generation runs on a child token.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(config: GenmediaConfig, gateways: Arc<dyn GatewayFactory>) -> Self {
        Self {
            generated: ArtifactStore::new(&config.storage.generated_dir, GENERATED_PREFIX),
            uploads: ArtifactStore::new(&config.storage.upload_dir, UPLOADS_PREFIX),
            config,
            gateways,
            shutdown: CancellationToken::new(),
        }
    }

    /// Gateway bound to the caller's key, or to the configured one.
    pub fn gateway(&self, api_key: &ApiKey) -> Result<Arc<dyn ProviderGateway>, ProviderError> {
        self.gateways.gateway(api_key.as_deref())
    }

    pub fn orchestrator(&self, gateway: Arc<dyn ProviderGateway>) -> GenerationOrchestrator {
        GenerationOrchestrator::new(
            gateway,
            self.generated.clone(),
            PollPolicy {
                interval: self.config.polling.interval(),
                ceiling: self.config.polling.ceiling(),
            },
        )
    }

    pub fn local_images(&self) -> LocalImageScanner {
        let storage = &self.config.storage;
        LocalImageScanner::new(&storage.project_root)
            .skipping([&storage.generated_dir, &storage.upload_dir])
    }
}

/// Gateway factory selected by configuration.
pub fn gateway_factory(config: &GenmediaConfig) -> Result<Arc<dyn GatewayFactory>, AppError> {
    match config.provider.kind {
        ProviderKind::Gemini => {
            let client = reqwest::Client::builder()
                .connect_timeout(Duration::from_secs(10))
                .build()
                .map_err(|e| {
                    AppError::ConfigError(anyhow::anyhow!("Failed to build HTTP client: {}", e))
                })?;
            let template = GeminiConfig {
                api_key: config.provider.api_key.clone().unwrap_or_default(),
                api_base: config.provider.api_base.clone(),
                text_model: config.models.text_model.clone(),
                video_model: config.models.video_model.clone(),
                image_model: config.models.image_model.clone(),
            };
            if template.api_key.is_empty() {
                tracing::warn!("GOOGLE_API_KEY not set; requests must supply X-API-Key");
            }
            tracing::info!(
                video_model = %template.video_model,
                text_model = %template.text_model,
                image_model = %template.image_model,
                "Initialized Gemini gateway factory"
            );
            Ok(Arc::new(GeminiGatewayFactory::new(template, client)))
        }
        ProviderKind::Mock => {
            tracing::warn!("Using the mock provider; no real media will be generated");
            Ok(Arc::new(MockGatewayFactory::scripted(MockScript::default())))
        }
    }
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/video-generation", post(handlers::generate_video))
        .route(
            "/video-generation/from-image",
            post(handlers::generate_video_from_image),
        )
        .route(
            "/video-generation/from-local-image",
            post(handlers::generate_video_from_local_image),
        )
        .route("/video-generation/local-images", get(handlers::list_local_images))
        .route("/video-generation/options", get(handlers::video_options))
        .route("/video-generation/test", get(handlers::test_connection))
        .route("/image-qa", post(handlers::image_qa));

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_handler))
        .nest("/api", api)
        .nest_service(
            "/storage/generated",
            ServeDir::new(&state.config.storage.generated_dir),
        )
        .nest_service("/storage/uploads", ServeDir::new(&state.config.storage.upload_dir))
        .layer(DefaultBodyLimit::max(state.config.storage.max_upload_bytes))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .extensions()
                    .get::<RequestId>()
                    .map(|id| id.0.as_str())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        // Outside the trace layer so the span sees the id.
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
    state: AppState,
}

impl Application {
    /// Build the application with the provider selected by configuration.
    pub async fn build(config: GenmediaConfig) -> Result<Self, AppError> {
        let gateways = gateway_factory(&config)?;
        Self::build_with_gateways(config, gateways).await
    }

    /// Build the application around an explicit gateway factory.
    pub async fn build_with_gateways(
        config: GenmediaConfig,
        gateways: Arc<dyn GatewayFactory>,
    ) -> Result<Self, AppError> {
        metrics::init_metrics();

        for dir in [&config.storage.generated_dir, &config.storage.upload_dir] {
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                tracing::error!("Failed to create storage directory {}: {}", dir.display(), e);
                AppError::StorageError(anyhow::Error::new(e))
            })?;
        }

        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(
            port,
            poll_interval_secs = config.polling.interval_secs,
            poll_ceiling_secs = config.polling.ceiling_secs,
            "Listening on {}",
            port
        );

        let state = AppState::new(config, gateways);
        let router = router(state.clone());

        Ok(Self {
            port,
            listener,
            router,
            state,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Cancelling this token stops in-flight generations and the server.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.state.shutdown.clone()
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let shutdown = self.state.shutdown.clone();
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown.cancelled().await;
                tracing::info!("Shutting down, waiting for in-flight requests");
            })
            .await
    }
}
