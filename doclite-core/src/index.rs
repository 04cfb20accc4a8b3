// src/index.rs
// Index bookkeeping (metadata only - queries always scan)

use crate::document::{Document, ID_FIELD};
use crate::error::{DocLiteError, Result};
use crate::find_options::SortDirection;
use crate::value::Value;

/// Name of the default identifier index
pub const ID_INDEX_NAME: &str = "_id_";

const INDEX_VERSION: i64 = 1;

/// Description of one single-field index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexInfo {
    pub name: String,
    pub field: String,
    pub direction: SortDirection,
    /// `<database>.<collection>`
    pub namespace: String,
}

impl IndexInfo {
    /// Rendered as `{"v": 1, "key": {<field>: <dir>}, "name": ..., "ns": ...}`
    pub fn to_document(&self) -> Document {
        let key = Document::new().with(self.field.clone(), Value::Int(i64::from(self.direction.as_i32())));
        Document::new()
            .with("v", INDEX_VERSION)
            .with("key", key)
            .with("name", self.name.clone())
            .with("ns", self.namespace.clone())
    }
}

/// `<field>_1` or `<field>_-1`
pub fn index_name(field: &str, direction: SortDirection) -> String {
    format!("{}_{}", field, direction.as_i32())
}

/// Per-collection index registry; `_id_` is always first
#[derive(Debug, Clone)]
pub struct IndexManager {
    namespace: String,
    indexes: Vec<IndexInfo>,
}

impl IndexManager {
    pub fn new(namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        let id_index = IndexInfo {
            name: ID_INDEX_NAME.to_string(),
            field: ID_FIELD.to_string(),
            direction: SortDirection::Ascending,
            namespace: namespace.clone(),
        };
        IndexManager {
            namespace,
            indexes: vec![id_index],
        }
    }

    /// Create an index; an existing one with the same key is left as is
    pub fn create_index(&mut self, field: &str, direction: SortDirection) -> Result<String> {
        if field.is_empty() {
            return Err(DocLiteError::invalid("index field name cannot be empty"));
        }
        if field == ID_FIELD && direction == SortDirection::Ascending {
            return Ok(ID_INDEX_NAME.to_string());
        }

        let name = index_name(field, direction);
        if self.indexes.iter().any(|idx| idx.name == name) {
            log::debug!("index {} on {} already exists", name, self.namespace);
            return Ok(name);
        }

        self.indexes.push(IndexInfo {
            name: name.clone(),
            field: field.to_string(),
            direction,
            namespace: self.namespace.clone(),
        });
        log::debug!("created index {} on {}", name, self.namespace);
        Ok(name)
    }

    /// Drop an index by name
    pub fn drop_index(&mut self, name: &str) -> Result<()> {
        if name == ID_INDEX_NAME {
            return Err(DocLiteError::invalid("cannot drop _id index"));
        }
        let position = self
            .indexes
            .iter()
            .position(|idx| idx.name == name)
            .ok_or_else(|| DocLiteError::IndexNotFound(name.to_string()))?;
        self.indexes.remove(position);
        log::debug!("dropped index {} on {}", name, self.namespace);
        Ok(())
    }

    /// Remove every index except `_id_`
    pub fn reset(&mut self) {
        self.indexes.truncate(1);
    }

    pub fn list_indexes(&self) -> &[IndexInfo] {
        &self.indexes
    }

    pub fn index_names(&self) -> Vec<String> {
        self.indexes.iter().map(|idx| idx.name.clone()).collect()
    }
}
