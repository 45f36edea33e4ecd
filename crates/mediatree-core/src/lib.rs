//! mediatree core library
//!
//! Domain model shared by all mediatree crates: media items, variants, the
//! variant dependency tree, contexts, configuration and the error type.

pub mod config;
pub mod constants;
pub mod context;
pub mod error;
pub mod models;
pub mod storage_types;
pub mod telemetry;
pub mod tree;
pub mod variant;

// Re-export commonly used types
pub use config::{
    ContextConfig, EnvSettings, FilesystemConfig, MediaTreeConfig, NamingStrategyConfig,
    VariantDefinition, VariantDefinitions,
};
pub use context::Context;
pub use error::{ErrorMetadata, LogLevel, MediaTreeError, Result};
pub use models::{ContentType, Media, MediaContent, VariantRecord, VariantStatus};
pub use storage_types::StorageBackend;
pub use tree::{Traverse, VariantTree};
pub use variant::{Variant, VariantId, VariantMode};
