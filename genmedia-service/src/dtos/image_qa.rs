use crate::services::ImageAnswer;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// JSON variant of the image Q&A request, with the image inline.
#[derive(Debug, Deserialize, Validate)]
pub struct ImageQaJsonRequest {
    /// Base64 data, optionally as a `data:image/...;base64,` URL.
    #[serde(default)]
    #[validate(length(min = 1, message = "image_data is required"))]
    pub image_data: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 2000, message = "Question must be 1 to 2000 characters"))]
    pub question: String,
    pub model: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ImageQaResponse {
    pub success: bool,
    pub answer: String,
    pub image_path: String,
    pub question: String,
    pub model_used: String,
}

impl ImageQaResponse {
    pub fn new(answer: ImageAnswer, default_model: &str) -> Self {
        Self {
            success: true,
            answer: answer.answer,
            image_path: answer.image.public_path,
            question: answer.question,
            model_used: answer.model.unwrap_or_else(|| default_model.to_string()),
        }
    }
}
