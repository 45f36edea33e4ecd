//! mediatree storage library
//!
//! Byte storage abstraction plus the two name-based lookups the processing
//! pipeline depends on: [`FilesystemMap`] (filesystem name to storage handle)
//! and [`NamingStrategyRegistry`] (strategy name to key generator).
//!
//! # Storage key format
//!
//! Keys are relative, `/`-separated paths produced by a naming strategy. They
//! must not be empty, contain `..` or start with `/`; validation lives in the
//! `keys` module so all backends agree.

pub mod factory;
pub mod filesystem;
pub(crate) mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
pub mod memory;
pub mod naming;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use filesystem::FilesystemMap;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use mediatree_core::StorageBackend;
pub use memory::MemoryStorage;
pub use naming::{HashedNamingStrategy, NamingStrategy, NamingStrategyRegistry, SlugNamingStrategy};
pub use traits::{Storage, StorageError, StorageResult};
