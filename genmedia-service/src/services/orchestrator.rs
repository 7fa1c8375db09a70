//! Long-running video generation: submit, poll, store, or degrade to a plan.
//!
//! One call to [`GenerationOrchestrator::generate`] drives a single request
//! end to end and always yields a [`GenerationResult`]:
//!
//! - the provider finishes with a video: `Success`, with the file stored
//!   locally when possible;
//! - the provider rejects the request for a reason retrying cannot fix
//!   (bad key, quota, invalid input, empty result): `Error`;
//! - the provider is unreachable or the job outlives the poll ceiling:
//!   `PlanFallback`, a textual production plan plus a preview still.

use super::artifact_store::ArtifactStore;
use super::fallback_planner::FallbackPlanner;
use super::media;
use super::metrics;
use super::prompt_optimizer::PromptOptimizer;
use super::providers::{
    OperationOutcome, OperationStatus, OutputRef, PersonGeneration, ProviderError,
    ProviderGateway, VideoConstraints,
};
use crate::models::{
    ArtifactKind, ErrorKind, FallbackReason, GenerationError, GenerationRequest, GenerationResult,
    GenerationSuccess, GenerationTiming, OptimizedPrompt, RequestEcho, VideoOutput,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Fixed-cadence polling bounded by a ceiling on total waiting time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub ceiling: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(20),
            ceiling: Duration::from_secs(600),
        }
    }
}

impl PollPolicy {
    /// Status checks made before a job that never finishes hits the ceiling.
    pub fn max_polls(&self) -> u32 {
        if self.interval.is_zero() {
            return 0;
        }
        let full = self.ceiling.as_nanos() / self.interval.as_nanos();
        let partial = u128::from(self.ceiling.as_nanos() % self.interval.as_nanos() != 0);
        (full + partial) as u32
    }
}

pub struct GenerationOrchestrator {
    gateway: Arc<dyn ProviderGateway>,
    optimizer: PromptOptimizer,
    planner: FallbackPlanner,
    store: ArtifactStore,
    policy: PollPolicy,
}

/// Where the flow stands once a provider call has failed.
struct Context<'a> {
    optimized: &'a OptimizedPrompt,
    echo: RequestEcho,
}

impl GenerationOrchestrator {
    pub fn new(gateway: Arc<dyn ProviderGateway>, store: ArtifactStore, policy: PollPolicy) -> Self {
        Self {
            optimizer: PromptOptimizer::new(gateway.clone()),
            planner: FallbackPlanner::new(gateway.clone(), store.clone()),
            gateway,
            store,
            policy,
        }
    }

    #[tracing::instrument(
        skip(self, request, cancel),
        fields(
            style = %request.style,
            aspect_ratio = %request.aspect_ratio,
            duration = request.effective_duration(),
            image_conditioned = request.is_image_conditioned(),
        )
    )]
    pub async fn generate(
        &self,
        request: GenerationRequest,
        cancel: &CancellationToken,
    ) -> GenerationResult {
        let started = Instant::now();
        let mode = if request.is_image_conditioned() { "image" } else { "text" };

        let result = self.run(request, cancel, started).await;

        let error_type = match &result {
            GenerationResult::Error(e) => e.kind.as_str(),
            _ => "",
        };
        metrics::record_generation(
            mode,
            result.outcome_label(),
            error_type,
            started.elapsed().as_secs_f64(),
        );
        tracing::info!(
            outcome = result.outcome_label(),
            error_type,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Video generation finished"
        );

        result
    }

    async fn run(
        &self,
        request: GenerationRequest,
        cancel: &CancellationToken,
        started: Instant,
    ) -> GenerationResult {
        if request.source_prompt.trim().is_empty() {
            return GenerationResult::Error(GenerationError::validation("Prompt must not be empty"));
        }
        let media = match &request.source_image {
            Some(image) => match media::prepare_for_video(&image.bytes) {
                Ok(inline) => Some(inline),
                Err(e) => {
                    tracing::warn!(origin = %image.origin, error = %e, "Rejected source image");
                    return GenerationResult::Error(GenerationError::validation(format!(
                        "Invalid source image: {}",
                        e
                    )));
                }
            },
            None => None,
        };

        if cancel.is_cancelled() {
            return cancelled();
        }
        let optimized = if request.optimize_prompt {
            self.optimizer.optimize(&request.source_prompt).await
        } else {
            OptimizedPrompt::identity(&request.source_prompt)
        };
        let ctx = Context {
            optimized: &optimized,
            echo: request.echo(),
        };

        let constraints = VideoConstraints {
            aspect_ratio: request.aspect_ratio,
            number_of_videos: 1,
            duration_seconds: request.effective_duration(),
            negative_prompt: request.composed_negative_prompt(),
            person_generation: PersonGeneration::Disallow,
        };

        let mut handle = match self
            .gateway
            .submit(&optimized.optimized, media.as_ref(), &constraints)
            .await
        {
            Ok(handle) => handle,
            Err(e) => return self.on_provider_error("submit", e, ctx).await,
        };
        tracing::info!(
            operation = %handle.name,
            max_polls = self.policy.max_polls(),
            "Video generation submitted"
        );

        let mut waited = Duration::ZERO;
        let mut polls = 0u32;
        while !handle.is_done() && waited < self.policy.ceiling {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!(operation = %handle.name, polls, "Video generation cancelled");
                    return cancelled();
                }
                _ = tokio::time::sleep(self.policy.interval) => {}
            }
            waited += self.policy.interval;
            polls += 1;
            metrics::record_poll(self.gateway.video_provider());

            handle = match self.gateway.poll(&handle).await {
                Ok(handle) => handle,
                Err(e) => return self.on_provider_error("poll", e, ctx).await,
            };
            tracing::debug!(
                operation = %handle.name,
                polls,
                waited_secs = waited.as_secs(),
                done = handle.is_done(),
                "Operation polled"
            );
        }

        let outputs = match handle.status {
            OperationStatus::Pending => {
                tracing::warn!(
                    operation = %handle.name,
                    polls,
                    waited_secs = waited.as_secs(),
                    "Video generation exceeded the poll ceiling"
                );
                return self
                    .fallback(ctx, FallbackReason::Timeout { waited, polls })
                    .await;
            }
            OperationStatus::Done(OperationOutcome::Failed(e)) => {
                self.note_error("operation", &e);
                return GenerationResult::Error(GenerationError::new(e.kind(), e.to_string()));
            }
            OperationStatus::Done(OperationOutcome::Outputs(outputs)) => outputs,
        };

        let Some(first) = outputs.into_iter().next() else {
            return GenerationResult::Error(GenerationError::new(
                ErrorKind::UnknownError,
                "The provider finished without generating a video",
            ));
        };

        let output = self.store_video(&first, &request.source_prompt).await;
        let preview_image = self
            .planner
            .preview_image(&optimized.optimized, request.style)
            .await;

        GenerationResult::Success(Box::new(GenerationSuccess {
            request: ctx.echo,
            optimized: optimized.clone(),
            output,
            preview_image,
            timing: GenerationTiming {
                elapsed: started.elapsed(),
                waited,
                polls,
            },
            model: self.gateway.video_model().to_string(),
        }))
    }

    /// Terminal errors surface as-is; anything else degrades to a plan.
    async fn on_provider_error(
        &self,
        operation: &str,
        error: ProviderError,
        ctx: Context<'_>,
    ) -> GenerationResult {
        self.note_error(operation, &error);
        match error.terminal_kind() {
            Some(kind) => GenerationResult::Error(GenerationError::new(kind, error.to_string())),
            None => {
                self.fallback(ctx, FallbackReason::ProviderUnavailable(error.to_string()))
                    .await
            }
        }
    }

    async fn fallback(&self, ctx: Context<'_>, reason: FallbackReason) -> GenerationResult {
        match self
            .planner
            .build_plan(&ctx.optimized.optimized, ctx.echo, reason)
            .await
        {
            Ok(plan) => GenerationResult::PlanFallback(Box::new(plan)),
            Err(e) => {
                self.note_error("plan", &e);
                GenerationResult::Error(GenerationError::new(
                    e.kind(),
                    format!("Production plan could not be generated: {}", e),
                ))
            }
        }
    }

    async fn store_video(&self, output: &OutputRef, source_prompt: &str) -> VideoOutput {
        let bytes = match self.gateway.download(output).await {
            Ok(bytes) => bytes,
            Err(e) => {
                self.note_error("download", &e);
                return VideoOutput::NotStored {
                    remote_uri: Some(output.uri.clone()),
                    error: e.to_string(),
                };
            }
        };

        let file_name = ArtifactStore::unique_name(
            &format!(
                "{}_{}",
                self.gateway.video_provider(),
                ArtifactKind::Video.as_str()
            ),
            "mp4",
        );
        match self
            .store
            .persist(&bytes, &file_name, ArtifactKind::Video, source_prompt)
            .await
        {
            Ok(artifact) => {
                metrics::record_artifact_stored(ArtifactKind::Video.as_str());
                VideoOutput::Stored(artifact)
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to store generated video");
                VideoOutput::NotStored {
                    remote_uri: Some(output.uri.clone()),
                    error: e.to_string(),
                }
            }
        }
    }

    fn note_error(&self, operation: &str, error: &ProviderError) {
        tracing::warn!(operation, error = %error, "Provider call failed");
        metrics::record_provider_error(self.gateway.video_provider(), operation, error.label());
    }
}

fn cancelled() -> GenerationResult {
    GenerationResult::Error(GenerationError::new(
        ErrorKind::Cancelled,
        "Video generation was cancelled",
    ))
}
