#![allow(dead_code)]

use genmedia_service::config::{
    GenmediaConfig, ModelConfig, PollingConfig, ProviderConfig, ProviderKind, StorageConfig,
};
use genmedia_service::services::providers::mock::{MockGateway, MockGatewayFactory, MockScript};
use genmedia_service::services::providers::GatewayFactory;
use genmedia_service::startup::{gateway_factory, Application};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use service_core::config::Config as CoreConfig;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub client: reqwest::Client,
    /// Present when the app runs on the mock provider.
    pub gateway: Option<Arc<MockGateway>>,
    pub project_root: PathBuf,
    pub shutdown: CancellationToken,
    _root: TempDir,
}

/// Configuration rooted in a fresh temporary directory, polling every second.
pub fn test_config(root: &TempDir, kind: ProviderKind) -> GenmediaConfig {
    let base = root.path();
    GenmediaConfig {
        common: CoreConfig {
            port: 0,
            log_level: "debug".to_string(),
            otlp_endpoint: None,
        },
        provider: ProviderConfig {
            kind,
            api_key: None,
            api_base: "http://127.0.0.1:9".to_string(),
        },
        models: ModelConfig {
            text_model: "gemini-2.0-flash".to_string(),
            video_model: "veo-2.0-generate-001".to_string(),
            image_model: "imagen-3.0-generate-002".to_string(),
        },
        storage: StorageConfig {
            generated_dir: base.join("storage/generated"),
            upload_dir: base.join("storage/uploads"),
            project_root: base.to_path_buf(),
            max_upload_bytes: 4 * 1024 * 1024,
        },
        polling: PollingConfig {
            interval_secs: 1,
            ceiling_secs: 2,
        },
    }
}

impl TestApp {
    /// App backed by a mock provider following `script`.
    pub async fn spawn(script: MockScript) -> Self {
        let root = tempfile::tempdir().expect("Failed to create temp dir");
        let config = test_config(&root, ProviderKind::Mock);
        let gateway = Arc::new(MockGateway::new(script));
        let factory: Arc<dyn GatewayFactory> = Arc::new(MockGatewayFactory::new(gateway.clone()));

        Self::start(root, config, factory, Some(gateway)).await
    }

    /// App talking to a Gemini-compatible API at `api_base`.
    pub async fn spawn_gemini(api_base: &str, api_key: Option<&str>) -> Self {
        let root = tempfile::tempdir().expect("Failed to create temp dir");
        let mut config = test_config(&root, ProviderKind::Gemini);
        config.provider.api_base = api_base.to_string();
        config.provider.api_key = api_key.map(str::to_string);
        let factory = gateway_factory(&config).expect("Failed to build gateway factory");

        Self::start(root, config, factory, None).await
    }

    async fn start(
        root: TempDir,
        config: GenmediaConfig,
        factory: Arc<dyn GatewayFactory>,
        gateway: Option<Arc<MockGateway>>,
    ) -> Self {
        let project_root = config.storage.project_root.clone();
        let app = Application::build_with_gateways(config, factory)
            .await
            .expect("Failed to build application");
        let port = app.port();
        let shutdown = app.shutdown_token();

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        let client = reqwest::Client::new();
        let address = format!("http://127.0.0.1:{}", port);
        for _ in 0..50 {
            if client.get(format!("{}/health", address)).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            port,
            client,
            gateway,
            project_root,
            shutdown,
            _root: root,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub fn mock(&self) -> &MockGateway {
        self.gateway.as_deref().expect("App is not running on the mock provider")
    }

    pub async fn post_json(&self, path: &str, body: serde_json::Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to execute request")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// A small valid PNG.
pub fn png_bytes() -> Vec<u8> {
    let img = RgbImage::from_fn(16, 16, |x, _| if x < 8 { Rgb([0, 120, 255]) } else { Rgb([255, 255, 255]) });
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .expect("Failed to encode PNG");
    bytes
}
