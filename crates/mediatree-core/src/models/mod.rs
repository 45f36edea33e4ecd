pub mod media;

pub use media::{ContentType, Media, MediaContent, VariantRecord, VariantStatus};
