//! Boundaries to the external generation services
//!
//! The pipeline only talks to these traits, so tests can script failures
//! and production code can swap providers.

use async_trait::async_trait;
use bookforge_types::{GenerationRequest, Outline};
use std::sync::Arc;

use crate::error::Result;

/// Text-generation service: turns a request into a raw book outline
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate_outline(&self, request: &GenerationRequest) -> Result<Outline>;
}

/// Image-generation service: turns a prompt into an image reference.
///
/// An empty string is a legal return value; the pipeline treats it the same
/// as an error.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate_image(&self, prompt: &str, style: &str) -> Result<String>;
}

#[async_trait]
impl<T: TextGenerator + ?Sized> TextGenerator for Arc<T> {
    async fn generate_outline(&self, request: &GenerationRequest) -> Result<Outline> {
        (**self).generate_outline(request).await
    }
}

#[async_trait]
impl<T: ImageGenerator + ?Sized> ImageGenerator for Arc<T> {
    async fn generate_image(&self, prompt: &str, style: &str) -> Result<String> {
        (**self).generate_image(prompt, style).await
    }
}
