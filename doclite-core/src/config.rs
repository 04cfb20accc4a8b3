// src/config.rs
// Client configuration

use serde::Deserialize;

use crate::error::Result;

/// How `_id` values are generated for documents inserted without one
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdGeneration {
    /// Random 32 hex character object id
    #[default]
    ObjectId,
    /// Per-collection counter starting at 1
    AutoIncrement,
}

/// Options for a [`Client`](crate::Client)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub id_generation: IdGeneration,
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a JSON string; missing keys take their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_id_generation(mut self, id_generation: IdGeneration) -> Self {
        self.id_generation = id_generation;
        self
    }
}
