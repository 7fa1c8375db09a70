//! Scripted in-process provider for tests and offline development.

use super::{
    GatewayFactory, ImageConstraints, InlineImage, OperationHandle, OperationOutcome,
    OperationStatus, OutputRef, ProviderError, ProviderGateway, VideoConstraints,
};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};

/// How a [`MockGateway`] behaves.
#[derive(Debug, Clone)]
pub struct MockScript {
    /// Poll count after which the operation reports done; `None` never finishes.
    pub polls_until_done: Option<u32>,
    /// Report done with no generated videos.
    pub empty_result: bool,
    pub video_bytes: Vec<u8>,
    pub image_bytes: Vec<u8>,
    /// Fixed text answer; by default the prompt is echoed back.
    pub text_response: Option<String>,
    pub submit_error: Option<ProviderError>,
    pub poll_error: Option<ProviderError>,
    pub operation_error: Option<ProviderError>,
    pub download_error: Option<ProviderError>,
    pub text_error: Option<ProviderError>,
    pub image_error: Option<ProviderError>,
}

impl Default for MockScript {
    fn default() -> Self {
        Self {
            polls_until_done: Some(1),
            empty_result: false,
            video_bytes: vec![0u8; 4096],
            image_bytes: vec![0u8; 1024],
            text_response: None,
            submit_error: None,
            poll_error: None,
            operation_error: None,
            download_error: None,
            text_error: None,
            image_error: None,
        }
    }
}

/// What the mock has been asked to do.
#[derive(Debug, Clone, Default)]
pub struct MockCalls {
    pub submits: u32,
    pub polls: u32,
    pub downloads: u32,
    pub text_prompts: Vec<String>,
    pub image_prompts: Vec<String>,
    pub questions: Vec<String>,
    pub last_submission: Option<Submission>,
}

#[derive(Debug, Clone)]
pub struct Submission {
    pub prompt: String,
    pub constraints: VideoConstraints,
    pub media: Option<InlineImage>,
}

/// Mock gateway for testing.
pub struct MockGateway {
    script: MockScript,
    calls: Mutex<MockCalls>,
}

const MOCK_OUTPUT_URI: &str = "mock://videos/0";

impl MockGateway {
    pub fn new(script: MockScript) -> Self {
        Self {
            script,
            calls: Mutex::new(MockCalls::default()),
        }
    }

    /// Snapshot of the calls made so far.
    pub fn calls(&self) -> MockCalls {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, MockCalls> {
        // A panicking test thread must not hide the record from the others.
        self.calls.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn fail_with(error: &Option<ProviderError>) -> Result<(), ProviderError> {
        match error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ProviderGateway for MockGateway {
    fn video_provider(&self) -> &str {
        "mock"
    }

    fn image_provider(&self) -> &str {
        "mock"
    }

    fn video_model(&self) -> &str {
        "mock-video"
    }

    async fn submit(
        &self,
        prompt: &str,
        media: Option<&InlineImage>,
        constraints: &VideoConstraints,
    ) -> Result<OperationHandle, ProviderError> {
        {
            let mut calls = self.lock();
            calls.submits += 1;
            calls.last_submission = Some(Submission {
                prompt: prompt.to_string(),
                constraints: constraints.clone(),
                media: media.cloned(),
            });
        }
        Self::fail_with(&self.script.submit_error)?;

        Ok(OperationHandle::pending("operations/mock-0"))
    }

    async fn poll(&self, handle: &OperationHandle) -> Result<OperationHandle, ProviderError> {
        let polls = {
            let mut calls = self.lock();
            calls.polls += 1;
            calls.polls
        };
        Self::fail_with(&self.script.poll_error)?;

        let done = matches!(self.script.polls_until_done, Some(limit) if polls >= limit);
        if !done {
            return Ok(OperationHandle::pending(handle.name.clone()));
        }

        let outcome = match (&self.script.operation_error, self.script.empty_result) {
            (Some(err), _) => OperationOutcome::Failed(err.clone()),
            (None, true) => OperationOutcome::Outputs(Vec::new()),
            (None, false) => OperationOutcome::Outputs(vec![OutputRef {
                uri: MOCK_OUTPUT_URI.to_string(),
                mime_type: Some("video/mp4".to_string()),
            }]),
        };

        Ok(OperationHandle {
            name: handle.name.clone(),
            status: OperationStatus::Done(outcome),
        })
    }

    async fn download(&self, _output: &OutputRef) -> Result<Vec<u8>, ProviderError> {
        self.lock().downloads += 1;
        Self::fail_with(&self.script.download_error)?;

        Ok(self.script.video_bytes.clone())
    }

    async fn generate_text(&self, prompt: &str) -> Result<String, ProviderError> {
        self.lock().text_prompts.push(prompt.to_string());
        Self::fail_with(&self.script.text_error)?;

        Ok(self
            .script
            .text_response
            .clone()
            .unwrap_or_else(|| format!("Mock response for: {}", prompt)))
    }

    async fn generate_image(
        &self,
        prompt: &str,
        constraints: &ImageConstraints,
    ) -> Result<Vec<Vec<u8>>, ProviderError> {
        self.lock().image_prompts.push(prompt.to_string());
        Self::fail_with(&self.script.image_error)?;

        Ok(vec![
            self.script.image_bytes.clone();
            constraints.number_of_images as usize
        ])
    }

    async fn answer_about_image(
        &self,
        question: &str,
        _image: &InlineImage,
        _model: Option<&str>,
    ) -> Result<String, ProviderError> {
        self.lock().questions.push(question.to_string());
        Self::fail_with(&self.script.text_error)?;

        Ok(self
            .script
            .text_response
            .clone()
            .unwrap_or_else(|| format!("Mock answer to: {}", question)))
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        Self::fail_with(&self.script.submit_error)
    }
}

/// Hands out mock gateways, ignoring credentials.
pub struct MockGatewayFactory {
    source: MockSource,
}

enum MockSource {
    /// One gateway whose recorded calls the caller inspects.
    Shared(Arc<MockGateway>),
    /// A fresh gateway per request, so recorded calls do not accumulate.
    Scripted(MockScript),
}

impl MockGatewayFactory {
    pub fn new(gateway: Arc<MockGateway>) -> Self {
        Self {
            source: MockSource::Shared(gateway),
        }
    }

    pub fn scripted(script: MockScript) -> Self {
        Self {
            source: MockSource::Scripted(script),
        }
    }
}

impl GatewayFactory for MockGatewayFactory {
    fn gateway(&self, _api_key: Option<&str>) -> Result<Arc<dyn ProviderGateway>, ProviderError> {
        Ok(match &self.source {
            MockSource::Shared(gateway) => gateway.clone(),
            MockSource::Scripted(script) => Arc::new(MockGateway::new(script.clone())),
        })
    }
}
