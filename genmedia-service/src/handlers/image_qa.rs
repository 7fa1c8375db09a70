use super::video::check_extension;
use crate::dtos::{ApiError, ImageQaJsonRequest, ImageQaResponse};
use crate::middleware::ApiKey;
use crate::models::GenerationError;
use crate::services::image_qa::decode_image_data;
use crate::services::{ImageQaService, ImageQuestion};
use crate::startup::AppState;
use axum::{
    extract::{FromRequest, Multipart, Request, State},
    http::header::CONTENT_TYPE,
    response::{IntoResponse, Response},
    Json,
};
use service_core::error::AppError;
use validator::Validate;

/// Question about an image, sent as multipart (`file`, `question`, `model`)
/// or as JSON with base64 `image_data`.
pub async fn image_qa(
    State(state): State<AppState>,
    api_key: ApiKey,
    request: Request,
) -> Result<Response, ApiError> {
    let is_multipart = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"));

    let question = if is_multipart {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|e| AppError::BadRequest(anyhow::anyhow!(e.body_text())))?;
        from_multipart(multipart).await?
    } else {
        let Json(body) = Json::<ImageQaJsonRequest>::from_request(request, &state)
            .await
            .map_err(|e| AppError::BadRequest(anyhow::anyhow!(e.body_text())))?;
        body.validate()?;
        ImageQuestion {
            image: decode_image_data(&body.image_data)?,
            question: body.question,
            model: body.model.filter(|m| !m.trim().is_empty()),
        }
    };

    let gateway = state.gateway(&api_key)?;
    let answer = ImageQaService::new(gateway, state.uploads.clone())
        .ask(question)
        .await?;

    Ok(Json(ImageQaResponse::new(answer, &state.config.models.text_model)).into_response())
}

async fn from_multipart(mut multipart: Multipart) -> Result<ImageQuestion, ApiError> {
    let mut image = None;
    let mut question = String::new();
    let mut model = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                check_extension(field.file_name())?;
                image = Some(field.bytes().await?.to_vec());
            }
            "question" => question = field.text().await?,
            "model" => model = Some(field.text().await?).filter(|m| !m.trim().is_empty()),
            _ => {}
        }
    }

    let image = image
        .filter(|bytes| !bytes.is_empty())
        .ok_or_else(|| GenerationError::validation("No image file selected"))?;

    Ok(ImageQuestion {
        image,
        question,
        model,
    })
}
