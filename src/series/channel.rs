//! Named scalar channels

use serde::{Deserialize, Serialize};

use crate::types::SampleField;

/// A named scalar source tracked by the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    /// Unique name; the key looked up in each ingested value map
    pub name: String,
    /// Sample field feeding this channel, if it comes from telemetry
    #[serde(default)]
    pub field: Option<SampleField>,
    /// Hidden channels keep their points but do not affect the Y range
    #[serde(default = "default_true")]
    pub visible: bool,
}

fn default_true() -> bool {
    true
}

impl Channel {
    /// Create a visible channel not bound to a sample field
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field: None,
            visible: true,
        }
    }

    /// Create a visible channel named after a sample field
    pub fn for_field(field: SampleField) -> Self {
        Self {
            name: field.name().to_string(),
            field: Some(field),
            visible: true,
        }
    }

    /// Set the visibility flag
    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// One visible channel per sample field, in wire order
    pub fn all_fields() -> Vec<Channel> {
        SampleField::ALL.into_iter().map(Channel::for_field).collect()
    }
}
