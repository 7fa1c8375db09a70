//! HTTP handlers for the genmedia service.

pub mod health;
pub mod image_qa;
pub mod video;

pub use health::{health_check, metrics_handler, readiness_check};
pub use image_qa::image_qa;
pub use video::{
    generate_video, generate_video_from_image, generate_video_from_local_image,
    list_local_images, test_connection, video_options,
};
