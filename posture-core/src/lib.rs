pub mod alert;
pub mod detection;
pub mod geometry;
pub mod overlay;
pub mod pipeline;
pub mod posture;
pub mod runtime;
pub mod settings;
pub mod video;

// Re-export the top-level error type so callers only need `posture_core::Error`
pub use anyhow::Error;
pub use anyhow::Result;
