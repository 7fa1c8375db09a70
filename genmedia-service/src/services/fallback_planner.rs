use super::artifact_store::ArtifactStore;
use super::providers::{ImageConstraints, ProviderError, ProviderGateway};
use crate::models::{
    ArtifactKind, AspectRatio, FallbackPlan, FallbackReason, GeneratedArtifact, RequestEcho,
    VideoStyle,
};
use std::sync::Arc;

/// Produces the alternative deliverable when no video can be rendered: a
/// production plan and a still preview of the scene.
pub struct FallbackPlanner {
    gateway: Arc<dyn ProviderGateway>,
    store: ArtifactStore,
}

impl FallbackPlanner {
    pub fn new(gateway: Arc<dyn ProviderGateway>, store: ArtifactStore) -> Self {
        Self { gateway, store }
    }

    /// Fails only when the plan text cannot be generated.
    pub async fn build_plan(
        &self,
        optimized_prompt: &str,
        request: RequestEcho,
        reason: FallbackReason,
    ) -> Result<FallbackPlan, ProviderError> {
        let text_plan = self
            .gateway
            .generate_text(&plan_prompt(
                optimized_prompt,
                request.duration_seconds,
                request.style,
                request.aspect_ratio,
            ))
            .await?;

        if text_plan.trim().is_empty() {
            return Err(ProviderError::InvalidResponse(
                "empty production plan".to_string(),
            ));
        }

        let preview_image = self.preview_image(optimized_prompt, request.style).await;

        Ok(FallbackPlan {
            text_plan,
            preview_image,
            optimized_prompt: optimized_prompt.to_string(),
            request,
            reason,
        })
    }

    /// Best effort; failures are logged and yield `None`.
    pub async fn preview_image(&self, prompt: &str, style: VideoStyle) -> Option<GeneratedArtifact> {
        let preview_prompt = format!(
            "A single frame preview of: {}, {} style, high quality, detailed",
            prompt, style
        );
        let constraints = ImageConstraints {
            aspect_ratio: AspectRatio::Landscape,
            number_of_images: 1,
        };

        let images = match self.gateway.generate_image(&preview_prompt, &constraints).await {
            Ok(images) => images,
            Err(e) => {
                tracing::warn!(error = %e, "Preview image generation failed");
                return None;
            }
        };
        let Some(bytes) = images.into_iter().find(|b| !b.is_empty()) else {
            tracing::warn!("Preview image generation returned no images");
            return None;
        };

        let file_name = ArtifactStore::unique_name(
            &format!("{}_{}", self.gateway.image_provider(), ArtifactKind::Image.as_str()),
            "png",
        );
        match self
            .store
            .persist(&bytes, &file_name, ArtifactKind::Image, &preview_prompt)
            .await
        {
            Ok(artifact) => Some(artifact),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to store preview image");
                None
            }
        }
    }
}

fn plan_prompt(prompt: &str, duration: u32, style: VideoStyle, aspect_ratio: AspectRatio) -> String {
    format!(
        "As a professional video production consultant, draw up a detailed production plan for this video:\n\n\
         Description: {prompt}\n\
         Duration: {duration} seconds\n\
         Style: {style}\n\
         Aspect ratio: {aspect_ratio}\n\n\
         Cover the following:\n\
         1. Shot list (what is on screen each second)\n\
         2. Camera technique (movement, angles, composition)\n\
         3. Lighting and colour scheme\n\
         4. Post-production\n\
         5. Recommended equipment and software\n\
         6. Budget estimate\n\
         7. Production schedule\n\
         8. Likely risks and how to handle them\n\n\
         Organise the plan in a professional, practical way."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GenerationRequest;
    use crate::services::providers::mock::{MockGateway, MockScript};
    use std::time::Duration;

    fn planner(script: MockScript, dir: &std::path::Path) -> (FallbackPlanner, Arc<MockGateway>) {
        let gateway = Arc::new(MockGateway::new(script));
        let store = ArtifactStore::new(dir, "storage/generated");
        (FallbackPlanner::new(gateway.clone(), store), gateway)
    }

    fn timeout() -> FallbackReason {
        FallbackReason::Timeout {
            waited: Duration::from_secs(600),
            polls: 30,
        }
    }

    #[tokio::test]
    async fn plan_covers_all_sections_and_stores_preview() {
        let dir = tempfile::tempdir().unwrap();
        let (planner, gateway) = planner(MockScript::default(), dir.path());
        let echo = GenerationRequest::new("a lighthouse in a storm")
            .with_style(VideoStyle::Cinematic)
            .with_duration(6)
            .echo();

        let plan = planner
            .build_plan("A lighthouse battered by waves", echo, timeout())
            .await
            .unwrap();

        assert!(!plan.text_plan.is_empty());
        assert_eq!(plan.optimized_prompt, "A lighthouse battered by waves");
        assert_eq!(plan.request.prompt, "a lighthouse in a storm");

        let calls = gateway.calls();
        let prompt = &calls.text_prompts[0];
        for section in ["Shot list", "Camera technique", "Lighting", "Post-production", "equipment", "Budget", "schedule", "risks"] {
            assert!(prompt.contains(section), "missing {section}");
        }
        assert!(prompt.contains("Duration: 6 seconds"));
        assert!(prompt.contains("Style: cinematic"));
        assert_eq!(
            calls.image_prompts,
            vec!["A single frame preview of: A lighthouse battered by waves, cinematic style, high quality, detailed"]
        );

        let preview = plan.preview_image.unwrap();
        assert_eq!(preview.kind, ArtifactKind::Image);
        assert!(preview.file_name.starts_with("mock_image_"));
        assert!(preview.file_name.ends_with(".png"));
        assert!(preview.local_path.exists());
    }

    #[tokio::test]
    async fn preview_failure_is_omitted_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let (planner, _) = planner(
            MockScript {
                image_error: Some(ProviderError::RateLimited("RESOURCE_EXHAUSTED".into())),
                ..Default::default()
            },
            dir.path(),
        );

        let plan = planner
            .build_plan("prompt", GenerationRequest::new("prompt").echo(), timeout())
            .await
            .unwrap();

        assert!(plan.preview_image.is_none());
        assert!(!plan.text_plan.is_empty());
    }

    #[tokio::test]
    async fn plan_text_failure_is_returned() {
        let dir = tempfile::tempdir().unwrap();
        let (planner, _) = planner(
            MockScript {
                text_error: Some(ProviderError::InvalidCredentials("API key not valid".into())),
                ..Default::default()
            },
            dir.path(),
        );

        let err = planner
            .build_plan("prompt", GenerationRequest::new("prompt").echo(), timeout())
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::InvalidCredentials(_)));
    }
}
