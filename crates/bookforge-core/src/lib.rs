//! Bookforge Core Library
//!
//! Turns a content request into an assembled, illustrated book project by
//! coordinating an external text-generation service and an external
//! image-generation service. Enforces tier quotas, reports monotonic
//! progress, and absorbs per-page illustration failures.

pub mod clients;
pub mod config;
pub mod constants;
pub mod error;
pub mod pipeline;

// Re-export main types for easy access
pub use config::BookforgeConfig;
pub use error::{BookforgeError, Result};

pub use clients::{OpenAiImageClient, OpenAiTextClient};

pub use pipeline::{
    check_quota,
    FileQuotaLedger,
    GenerationOrchestrator,
    ImageGenerator,
    InMemoryQuotaLedger,
    NoopObserver,
    ProgressObserver,
    QuotaDecision,
    QuotaLedger,
    TextGenerator,
};
