//! mediatree processing library
//!
//! Providers turn submitted media content into variant outputs; the
//! [`VariantPipeline`] walks a context's variant tree and stores what the
//! provider produces.

pub mod html;
#[cfg(feature = "image")]
pub mod image;
pub mod pipeline;
pub mod provider;
pub mod providers;
pub mod registry;
pub mod support;

// Re-export commonly used types
pub use pipeline::{PipelineReport, VariantPipeline};
pub use provider::{ProcessedFile, Provider};
#[cfg(feature = "image")]
pub use providers::ImageProvider;
pub use providers::{FileProvider, VimeoProvider, YoutubeProvider};
pub use registry::{ProviderFactory, ProviderRegistry};
pub use support::ProviderSupport;
