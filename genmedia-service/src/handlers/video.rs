use crate::dtos::video::{image_generation_request, SUPPORTED_FEATURES};
use crate::dtos::{
    ApiError, ConnectionTestResponse, GenerateVideoRequest, GenerationResponse, JsonOrForm,
    LocalImageVideoRequest, LocalImagesResponse, VideoOptionsResponse,
};
use crate::middleware::ApiKey;
use crate::models::{
    ArtifactKind, GenerationError, GenerationRequest, SourceImage, VideoOptions,
    MAX_DURATION_SECS,
};
use crate::services::{media, ArtifactStore};
use crate::startup::AppState;
use axum::{
    extract::{Multipart, State},
    response::{IntoResponse, Response},
    Json,
};
use service_core::error::AppError;
use validator::Validate;

async fn run_generation(
    state: &AppState,
    api_key: &ApiKey,
    request: GenerationRequest,
) -> Result<Response, ApiError> {
    let gateway = state.gateway(api_key)?;
    let cancel = state.shutdown.child_token();
    let result = state.orchestrator(gateway).generate(request, &cancel).await;
    Ok(GenerationResponse(result).into_response())
}

/// Text-to-video. Accepts JSON or an urlencoded form.
pub async fn generate_video(
    State(state): State<AppState>,
    api_key: ApiKey,
    JsonOrForm(body): JsonOrForm<GenerateVideoRequest>,
) -> Result<Response, ApiError> {
    body.validate()?;
    let request = body.into_generation_request()?;

    run_generation(&state, &api_key, request).await
}

/// Image-to-video from a multipart upload (`image`, `prompt`, `duration`, `aspect_ratio`).
pub async fn generate_video_from_image(
    State(state): State<AppState>,
    api_key: ApiKey,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let mut image: Option<(Option<String>, Vec<u8>)> = None;
    let mut prompt = String::new();
    let mut duration = MAX_DURATION_SECS;
    let mut aspect_ratio: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => {
                let file_name = field.file_name().map(str::to_string);
                image = Some((file_name, field.bytes().await?.to_vec()));
            }
            "prompt" => prompt = field.text().await?,
            "duration" => duration = parse_duration(&field.text().await?)?,
            "aspect_ratio" => aspect_ratio = Some(field.text().await?),
            _ => {}
        }
    }

    let (file_name, bytes) = image
        .filter(|(_, bytes)| !bytes.is_empty())
        .ok_or_else(|| GenerationError::validation("Please upload an image file"))?;
    check_extension(file_name.as_deref())?;

    let request = image_generation_request(&prompt, duration, aspect_ratio.as_deref())?;
    // Resolve the credential before touching storage.
    let gateway = state.gateway(&api_key)?;

    let mime = media::check_decodable(&bytes)
        .map_err(|e| GenerationError::validation(format!("Invalid image: {}", e)))?;
    let ext = mime.trim_start_matches("image/").replace("jpeg", "jpg");
    let upload = state
        .uploads
        .persist(
            &bytes,
            &ArtifactStore::unique_name("upload", &ext),
            ArtifactKind::Image,
            &request.source_prompt,
        )
        .await
        .map_err(|e| AppError::StorageError(anyhow::Error::new(e)))?;

    let request = request.with_source_image(SourceImage {
        bytes,
        origin: upload.public_path,
    });
    let cancel = state.shutdown.child_token();
    let result = state.orchestrator(gateway).generate(request, &cancel).await;
    Ok(GenerationResponse(result).into_response())
}

/// Image-to-video from an image already inside the project tree.
pub async fn generate_video_from_local_image(
    State(state): State<AppState>,
    api_key: ApiKey,
    JsonOrForm(body): JsonOrForm<LocalImageVideoRequest>,
) -> Result<Response, ApiError> {
    body.validate()?;
    let path = state.local_images().resolve(&body.image_path)?;
    let bytes = tokio::fs::read(&path).await.map_err(|e| {
        AppError::InternalError(anyhow::anyhow!("Failed to read {}: {}", body.image_path, e))
    })?;
    tracing::info!(image_path = %body.image_path, size = bytes.len(), "Using local image");

    let request = image_generation_request(&body.prompt, body.duration, body.aspect_ratio.as_deref())?
        .with_source_image(SourceImage {
            bytes,
            origin: body.image_path.clone(),
        });

    run_generation(&state, &api_key, request).await
}

pub async fn list_local_images(State(state): State<AppState>) -> Result<Response, ApiError> {
    let scanner = state.local_images();
    let images = tokio::task::spawn_blocking(move || scanner.scan())
        .await
        .map_err(|e| AppError::InternalError(anyhow::anyhow!("Image scan failed: {}", e)))?;

    Ok(Json(LocalImagesResponse::from(images)).into_response())
}

pub async fn video_options() -> impl IntoResponse {
    Json(VideoOptionsResponse {
        success: true,
        options: VideoOptions::catalog(),
    })
}

/// Verifies the credential against the provider.
pub async fn test_connection(
    State(state): State<AppState>,
    api_key: ApiKey,
) -> Result<Response, ApiError> {
    let gateway = state.gateway(&api_key)?;
    gateway.health_check().await?;

    Ok(Json(ConnectionTestResponse {
        success: true,
        message: "Video generation service is reachable".to_string(),
        model: gateway.video_model().to_string(),
        supported_features: SUPPORTED_FEATURES.to_vec(),
    })
    .into_response())
}

fn parse_duration(raw: &str) -> Result<u32, GenerationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(MAX_DURATION_SECS);
    }
    raw.parse()
        .map_err(|_| GenerationError::validation(format!("Invalid duration: {}", raw)))
}

pub(crate) fn check_extension(file_name: Option<&str>) -> Result<(), GenerationError> {
    let Some(name) = file_name else {
        return Ok(());
    };
    let supported = std::path::Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(media::is_supported_extension);
    if supported {
        Ok(())
    } else {
        Err(GenerationError::validation(format!("Invalid file type: {}", name)))
    }
}
