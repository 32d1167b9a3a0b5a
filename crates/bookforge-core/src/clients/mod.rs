//! Client modules for the external generation services

pub mod openai_image;
pub mod openai_text;

pub use openai_image::OpenAiImageClient;
pub use openai_text::OpenAiTextClient;
