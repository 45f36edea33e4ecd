//! Variant nodes of a [`VariantTree`](crate::tree::VariantTree).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// How a provider maps its source onto the variant's target box
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariantMode {
    /// Fit inside the target box, keeping aspect ratio, never upscaling
    #[default]
    Resize,
    /// Fill the target box and cut off what overflows (centered)
    Crop,
    /// Fit inside the target box and pad the remainder with a background
    Pad,
    /// Pass the source through untouched
    Copy,
}

impl FromStr for VariantMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "resize" => Ok(VariantMode::Resize),
            "crop" => Ok(VariantMode::Crop),
            "pad" => Ok(VariantMode::Pad),
            "copy" => Ok(VariantMode::Copy),
            _ => Err(anyhow::anyhow!("Invalid variant mode: {}", s)),
        }
    }
}

impl Display for VariantMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            VariantMode::Resize => write!(f, "resize"),
            VariantMode::Crop => write!(f, "crop"),
            VariantMode::Pad => write!(f, "pad"),
            VariantMode::Copy => write!(f, "copy"),
        }
    }
}

/// Index of a node inside its owning tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariantId(pub(crate) usize);

impl VariantId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// One named transformation target.
///
/// Parent and children are indices into the owning tree; a variant that has not
/// been added to a tree yet has neither.
#[derive(Debug, Clone, PartialEq)]
pub struct Variant {
    name: String,
    mode: VariantMode,
    options: Map<String, JsonValue>,
    pub(crate) parent: Option<VariantId>,
    pub(crate) children: Vec<VariantId>,
}

impl Variant {
    pub fn new(name: impl Into<String>, mode: VariantMode, options: Map<String, JsonValue>) -> Self {
        Self {
            name: name.into(),
            mode,
            options,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> VariantMode {
        self.mode
    }

    /// Processing options, passed verbatim to the provider
    pub fn options(&self) -> &Map<String, JsonValue> {
        &self.options
    }

    pub fn option(&self, key: &str) -> Option<&JsonValue> {
        self.options.get(key)
    }

    pub fn option_u32(&self, key: &str) -> Option<u32> {
        self.options
            .get(key)
            .and_then(JsonValue::as_u64)
            .and_then(|v| u32::try_from(v).ok())
    }

    pub fn option_str(&self, key: &str) -> Option<&str> {
        self.options.get(key).and_then(JsonValue::as_str)
    }

    pub fn parent_id(&self) -> Option<VariantId> {
        self.parent
    }

    /// Children in configuration order
    pub fn child_ids(&self) -> &[VariantId] {
        &self.children
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}
