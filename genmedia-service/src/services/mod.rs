pub mod artifact_store;
pub mod fallback_planner;
pub mod image_qa;
pub mod local_images;
pub mod media;
pub mod metrics;
pub mod orchestrator;
pub mod prompt_optimizer;
pub mod providers;

pub use artifact_store::{ArtifactStore, PersistenceError};
pub use fallback_planner::FallbackPlanner;
pub use image_qa::{ImageAnswer, ImageQaError, ImageQaService, ImageQuestion};
pub use local_images::{LocalImage, LocalImageError, LocalImageScanner};
pub use orchestrator::{GenerationOrchestrator, PollPolicy};
pub use prompt_optimizer::PromptOptimizer;
