use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// How a provider interprets the raw content of a media
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    /// An uploaded file
    File,
    /// A numeric external id (e.g. vimeo)
    Int,
    /// A string external id (e.g. youtube)
    String,
}

impl Display for ContentType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ContentType::File => write!(f, "file"),
            ContentType::Int => write!(f, "int"),
            ContentType::String => write!(f, "string"),
        }
    }
}

/// Raw content submitted for a media
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum MediaContent {
    File(PathBuf),
    Int(i64),
    String(String),
}

impl MediaContent {
    pub fn content_type(&self) -> ContentType {
        match self {
            MediaContent::File(_) => ContentType::File,
            MediaContent::Int(_) => ContentType::Int,
            MediaContent::String(_) => ContentType::String,
        }
    }

    pub fn as_path(&self) -> Option<&Path> {
        match self {
            MediaContent::File(path) => Some(path),
            _ => None,
        }
    }
}

/// Outcome of processing one variant for a media
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariantStatus {
    /// Output was produced and written to storage
    Ready,
    /// The provider produced no output for this variant
    Skipped,
}

/// Per-variant data recorded on a media after processing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantRecord {
    pub status: VariantStatus,
    pub storage_key: Option<String>,
    pub url: Option<String>,
    pub content_type: Option<String>,
}

impl VariantRecord {
    pub fn skipped() -> Self {
        Self {
            status: VariantStatus::Skipped,
            storage_key: None,
            url: None,
            content_type: None,
        }
    }
}

/// A media item owned by the calling application.
///
/// `content` holds newly submitted raw content (cleared by the caller once saved);
/// `metadata` accumulates provider-specific facts set during `prepare`.
/// `id` is assigned once and keeps storage keys of same-named media apart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Media {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub name: String,
    pub context: String,
    pub content: Option<MediaContent>,
    #[serde(default)]
    pub metadata: Map<String, JsonValue>,
    #[serde(default)]
    pub variants: BTreeMap<String, VariantRecord>,
}

impl Default for Media {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            name: String::new(),
            context: String::new(),
            content: None,
            metadata: Map::new(),
            variants: BTreeMap::new(),
        }
    }
}

impl Media {
    pub fn new(context: impl Into<String>, content: MediaContent) -> Self {
        Self {
            context: context.into(),
            content: Some(content),
            ..Default::default()
        }
    }

    /// Reuse a known id, e.g. when reloading a stored media
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn metadata_value(&self, key: &str) -> Option<&JsonValue> {
        self.metadata.get(key)
    }

    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<JsonValue>) {
        self.metadata.insert(key.into(), value.into());
    }

    pub fn variant(&self, name: &str) -> Option<&VariantRecord> {
        self.variants.get(name)
    }
}
