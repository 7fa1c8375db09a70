//! Veo long-running video operation wire types.
//!
//! A job is started with `models/{model}:predictLongRunning` and tracked by
//! fetching the returned operation name until `done` is set.

use super::gemini::GoogleStatus;
use super::{
    InlineImage, OperationHandle, OperationOutcome, OperationStatus, OutputRef, ProviderError,
    VideoConstraints,
};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub(super) struct PredictLongRunningRequest<'a> {
    instances: Vec<VideoInstance<'a>>,
    parameters: VideoParameters<'a>,
}

#[derive(Debug, Serialize)]
struct VideoInstance<'a> {
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<EncodedImage>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EncodedImage {
    bytes_base64_encoded: String,
    mime_type: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VideoParameters<'a> {
    aspect_ratio: &'a str,
    person_generation: &'a str,
    sample_count: u32,
    duration_seconds: u32,
    negative_prompt: &'a str,
}

impl<'a> PredictLongRunningRequest<'a> {
    pub(super) fn new(
        prompt: &'a str,
        media: Option<&InlineImage>,
        constraints: &'a VideoConstraints,
    ) -> Self {
        Self {
            instances: vec![VideoInstance {
                prompt,
                image: media.map(|image| EncodedImage {
                    bytes_base64_encoded: BASE64.encode(&image.bytes),
                    mime_type: image.mime_type.clone(),
                }),
            }],
            parameters: VideoParameters {
                aspect_ratio: constraints.aspect_ratio.as_str(),
                person_generation: constraints.person_generation.as_str(),
                sample_count: constraints.number_of_videos,
                duration_seconds: constraints.duration_seconds,
                negative_prompt: &constraints.negative_prompt,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct Operation {
    name: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<GoogleStatus>,
    #[serde(default)]
    response: Option<OperationResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OperationResponse {
    #[serde(default)]
    generate_video_response: Option<GenerateVideoResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateVideoResponse {
    #[serde(default)]
    generated_samples: Vec<GeneratedSample>,
    #[serde(default)]
    rai_media_filtered_reasons: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct GeneratedSample {
    #[serde(default)]
    video: Option<VideoRef>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoRef {
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    mime_type: Option<String>,
}

impl Operation {
    pub(super) fn into_handle(self) -> OperationHandle {
        if !self.done {
            return OperationHandle::pending(self.name);
        }

        let outcome = match (self.error, self.response) {
            (Some(error), _) => OperationOutcome::Failed(error.into_provider_error(None)),
            (None, response) => {
                let video_response = response.and_then(|r| r.generate_video_response);
                match video_response {
                    Some(video) => {
                        let outputs: Vec<OutputRef> = video
                            .generated_samples
                            .into_iter()
                            .filter_map(|sample| sample.video)
                            .filter_map(|v| {
                                v.uri.map(|uri| OutputRef {
                                    uri,
                                    mime_type: v.mime_type,
                                })
                            })
                            .collect();

                        if outputs.is_empty() && !video.rai_media_filtered_reasons.is_empty() {
                            OperationOutcome::Failed(ProviderError::ContentFiltered(
                                video.rai_media_filtered_reasons.join("; "),
                            ))
                        } else {
                            OperationOutcome::Outputs(outputs)
                        }
                    }
                    None => OperationOutcome::Outputs(Vec::new()),
                }
            }
        };

        OperationHandle {
            name: self.name,
            status: OperationStatus::Done(outcome),
        }
    }
}
