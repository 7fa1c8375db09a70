use super::artifact_store::{ArtifactStore, PersistenceError};
use super::media::{self, MediaError};
use super::metrics;
use super::providers::{ProviderError, ProviderGateway};
use crate::models::{ArtifactKind, ErrorKind, GeneratedArtifact};
use base64::Engine;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImageQaError {
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Storage(#[from] PersistenceError),
}

impl ImageQaError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ImageQaError::Validation(_) => ErrorKind::ValidationError,
            ImageQaError::Provider(e) => e.kind(),
            ImageQaError::Storage(_) => ErrorKind::PersistenceError,
        }
    }
}

impl From<MediaError> for ImageQaError {
    fn from(e: MediaError) -> Self {
        ImageQaError::Validation(e.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct ImageQuestion {
    pub image: Vec<u8>,
    pub question: String,
    /// Text model to ask; the gateway's default when `None`.
    pub model: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ImageAnswer {
    pub answer: String,
    pub question: String,
    pub image: GeneratedArtifact,
    pub model: Option<String>,
}

/// Answers free-form questions about an image.
pub struct ImageQaService {
    gateway: Arc<dyn ProviderGateway>,
    uploads: ArtifactStore,
}

impl ImageQaService {
    pub fn new(gateway: Arc<dyn ProviderGateway>, uploads: ArtifactStore) -> Self {
        Self { gateway, uploads }
    }

    #[tracing::instrument(skip(self, request), fields(image_bytes = request.image.len(), model = ?request.model))]
    pub async fn ask(&self, request: ImageQuestion) -> Result<ImageAnswer, ImageQaError> {
        let result = self.answer(request).await;
        metrics::record_image_qa(match &result {
            Ok(_) => "success",
            Err(e) => e.kind().as_str(),
        });
        result
    }

    async fn answer(&self, request: ImageQuestion) -> Result<ImageAnswer, ImageQaError> {
        let question = request.question.trim();
        if question.is_empty() {
            return Err(ImageQaError::Validation("Question must not be empty".to_string()));
        }
        let inline = media::inline_as_is(request.image)?;
        let ext = inline.mime_type.trim_start_matches("image/").replace("jpeg", "jpg");

        let file_name = ArtifactStore::unique_name("upload", &ext);
        let image = self
            .uploads
            .persist(&inline.bytes, &file_name, ArtifactKind::Image, question)
            .await?;

        let prompt = format!("Answer the following question about this image: {}", question);
        let answer = self
            .gateway
            .answer_about_image(&prompt, &inline, request.model.as_deref())
            .await?;

        Ok(ImageAnswer {
            answer: answer.trim().to_string(),
            question: question.to_string(),
            image,
            model: request.model,
        })
    }
}

/// Decode base64 image data, with or without a `data:...;base64,` prefix.
pub fn decode_image_data(data: &str) -> Result<Vec<u8>, ImageQaError> {
    let payload = match data.split_once("base64,") {
        Some((_, payload)) => payload,
        None => data,
    };
    let payload: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    if payload.is_empty() {
        return Err(ImageQaError::Validation("Image data is empty".to_string()));
    }
    base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| ImageQaError::Validation(format!("Image data is not valid base64: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::media::tests::transparent_png;
    use crate::services::providers::mock::{MockGateway, MockScript};

    fn service(script: MockScript, dir: &std::path::Path) -> (ImageQaService, Arc<MockGateway>) {
        let gateway = Arc::new(MockGateway::new(script));
        let uploads = ArtifactStore::new(dir, "storage/uploads");
        (ImageQaService::new(gateway.clone(), uploads), gateway)
    }

    #[tokio::test]
    async fn stores_upload_and_returns_answer() {
        let dir = tempfile::tempdir().unwrap();
        let (service, gateway) = service(
            MockScript {
                text_response: Some("  A red square on white.  ".into()),
                ..Default::default()
            },
            dir.path(),
        );

        let answer = service
            .ask(ImageQuestion {
                image: transparent_png(),
                question: " What is in the picture? ".into(),
                model: Some("gemini-1.5-pro".into()),
            })
            .await
            .unwrap();

        assert_eq!(answer.answer, "A red square on white.");
        assert_eq!(answer.question, "What is in the picture?");
        assert!(answer.image.public_path.starts_with("storage/uploads/upload_"));
        assert!(answer.image.file_name.ends_with(".png"));
        assert!(answer.image.local_path.exists());
        assert!(gateway.calls().questions[0].ends_with("What is in the picture?"));
    }

    #[tokio::test]
    async fn blank_question_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (service, gateway) = service(MockScript::default(), dir.path());

        let err = service
            .ask(ImageQuestion {
                image: transparent_png(),
                question: "   ".into(),
                model: None,
            })
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ValidationError);
        assert!(gateway.calls().questions.is_empty());
    }

    #[tokio::test]
    async fn provider_errors_keep_their_kind() {
        let dir = tempfile::tempdir().unwrap();
        let (service, _) = service(
            MockScript {
                text_error: Some(ProviderError::InvalidCredentials("API key not valid".into())),
                ..Default::default()
            },
            dir.path(),
        );

        let err = service
            .ask(ImageQuestion {
                image: transparent_png(),
                question: "Describe it".into(),
                model: None,
            })
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::CredentialError);
    }

    #[test]
    fn decodes_plain_and_data_url_base64() {
        let encoded = base64::engine::general_purpose::STANDARD.encode(b"abc");

        assert_eq!(decode_image_data(&encoded).unwrap(), b"abc");
        assert_eq!(
            decode_image_data(&format!("data:image/png;base64,{}", encoded)).unwrap(),
            b"abc"
        );
        assert!(decode_image_data("data:image/png;base64,").is_err());
        assert!(decode_image_data("!!!").is_err());
    }
}
