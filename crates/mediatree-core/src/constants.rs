/// Variant name used when a context does not declare its default variant
pub const DEFAULT_VARIANT_NAME: &str = "default";

/// Prefix of environment variables read by [`EnvSettings`](crate::config::EnvSettings)
pub const ENV_PREFIX: &str = "MEDIATREE_";

/// Default tracing filter when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "mediatree=info";
