pub mod error;
pub mod extract;
pub mod generation;
pub mod image_qa;
pub mod video;

pub use error::{status_for, ApiError};
pub use extract::JsonOrForm;
pub use generation::GenerationResponse;
pub use image_qa::{ImageQaJsonRequest, ImageQaResponse};
pub use video::{
    ConnectionTestResponse, GenerateVideoRequest, LocalImageVideoRequest, LocalImagesResponse,
    VideoOptionsResponse,
};
