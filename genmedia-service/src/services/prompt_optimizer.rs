use super::providers::ProviderGateway;
use crate::models::OptimizedPrompt;
use std::sync::Arc;

/// Rewrites free-form prompts into video-model-friendly English.
pub struct PromptOptimizer {
    gateway: Arc<dyn ProviderGateway>,
}

impl PromptOptimizer {
    pub fn new(gateway: Arc<dyn ProviderGateway>) -> Self {
        Self { gateway }
    }

    /// Never fails: any provider error or empty answer yields the identity mapping.
    pub async fn optimize(&self, prompt: &str) -> OptimizedPrompt {
        match self.gateway.generate_text(&instruction(prompt)).await {
            Ok(text) => {
                let optimized = strip_enclosing_quotes(text.trim()).trim();
                if optimized.is_empty() {
                    tracing::warn!("Prompt optimizer returned an empty answer, using original prompt");
                    return OptimizedPrompt::identity(prompt);
                }
                tracing::debug!(original_len = prompt.len(), optimized_len = optimized.len(), "Prompt optimized");
                OptimizedPrompt {
                    original: prompt.to_string(),
                    optimized: optimized.to_string(),
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Prompt optimization failed, using original prompt");
                OptimizedPrompt::identity(prompt)
            }
        }
    }
}

fn instruction(prompt: &str) -> String {
    format!(
        "Rewrite the following video generation prompt so it works well with a text-to-video model.\n\
         Requirements:\n\
         1. Add concrete visual detail.\n\
         2. Describe camera angles and movement (dolly shot, tracking shot, aerial view, ...).\n\
         3. Specify the visual style and colour tone.\n\
         4. Suggest pacing for a short clip.\n\
         5. Keep the description clear, specific and creative.\n\
         6. Preserve the original intent.\n\
         7. Answer in English.\n\n\
         Original prompt: {}\n\n\
         Return only the rewritten prompt:",
        prompt
    )
}

/// Removes one pair of matching quotes around the whole text.
fn strip_enclosing_quotes(text: &str) -> &str {
    const PAIRS: [(char, char); 3] = [('"', '"'), ('\'', '\''), ('\u{201C}', '\u{201D}')];

    for (open, close) in PAIRS {
        if let Some(inner) = text
            .strip_prefix(open)
            .and_then(|rest| rest.strip_suffix(close))
        {
            return inner;
        }
    }
    text
}
