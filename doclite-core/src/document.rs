// src/document.rs
use std::fmt;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use uuid::Uuid;

use crate::error::{DocLiteError, Result};
use crate::value::Value;

/// Name of the identifier field
pub const ID_FIELD: &str = "_id";

/// Schema-less document: ordered field name -> value mapping
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(into = "serde_json::Value", try_from = "serde_json::Value")]
pub struct Document {
    fields: IndexMap<String, Value>,
}

/// Document identifier types
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DocumentId {
    Int(i64),
    String(String),
    ObjectId(String),
}

impl DocumentId {
    /// Next auto-increment id
    pub fn new_auto(last_id: u64) -> Self {
        DocumentId::Int(last_id as i64 + 1)
    }

    /// Fresh ObjectId (UUID v4 based)
    pub fn new_object_id() -> Self {
        DocumentId::ObjectId(Uuid::new_v4().simple().to_string())
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentId::Int(i) => write!(f, "{}", i),
            DocumentId::String(s) => write!(f, "\"{}\"", s),
            DocumentId::ObjectId(oid) => write!(f, "ObjectId(\"{}\")", oid),
        }
    }
}

impl From<DocumentId> for Value {
    fn from(id: DocumentId) -> Self {
        match id {
            DocumentId::Int(i) => Value::Int(i),
            DocumentId::String(s) => Value::String(s),
            DocumentId::ObjectId(oid) => Value::ObjectId(oid),
        }
    }
}

impl TryFrom<&Value> for DocumentId {
    type Error = DocLiteError;

    fn try_from(value: &Value) -> Result<Self> {
        match value {
            Value::Int(i) => Ok(DocumentId::Int(*i)),
            Value::String(s) => Ok(DocumentId::String(s.clone())),
            Value::ObjectId(oid) => Ok(DocumentId::ObjectId(oid.clone())),
            other => Err(DocLiteError::invalid(format!(
                "unsupported _id type: {}",
                other.type_name()
            ))),
        }
    }
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a document from a JSON object
    pub fn from_json(json: &Json) -> Result<Self> {
        match json {
            Json::Object(map) => Ok(Self::from_json_map(map)),
            other => Err(DocLiteError::invalid(format!(
                "expected a JSON object for a document, got {}",
                other
            ))),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let parsed: Json = serde_json::from_str(json)?;
        Self::from_json(&parsed)
    }

    pub(crate) fn from_json_map(map: &serde_json::Map<String, Json>) -> Self {
        Document {
            fields: map.iter().map(|(k, v)| (k.clone(), Value::from(v))).collect(),
        }
    }

    /// Extended JSON rendering
    pub fn to_json(&self) -> Json {
        Json::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_json())?)
    }

    /// Identifier, if the document carries a supported one
    pub fn id(&self) -> Option<DocumentId> {
        self.fields
            .get(ID_FIELD)
            .and_then(|v| DocumentId::try_from(v).ok())
    }

    /// Set the identifier, keeping `_id` as the first field
    pub fn set_id(&mut self, id: DocumentId) {
        self.fields.shift_remove(ID_FIELD);
        self.fields.shift_insert(0, ID_FIELD.to_string(), id.into());
    }

    /// Field lookup; dotted paths walk into nested documents
    pub fn get(&self, path: &str) -> Option<&Value> {
        if let Some(value) = self.fields.get(path) {
            return Some(value);
        }
        let (head, rest) = path.split_once('.')?;
        self.fields.get(head)?.as_document()?.get(rest)
    }

    /// Set a top-level field, returning the previous value
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(field.into(), value.into())
    }

    /// Builder-style `set`
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    /// Set a possibly dotted path, creating intermediate documents
    pub fn set_path(&mut self, path: &str, value: Value) -> Result<()> {
        match path.split_once('.') {
            None => {
                self.fields.insert(path.to_string(), value);
                Ok(())
            }
            Some((head, rest)) => {
                let slot = self
                    .fields
                    .entry(head.to_string())
                    .or_insert_with(|| Value::Document(Document::new()));
                match slot.as_document_mut() {
                    Some(inner) => inner.set_path(rest, value),
                    None => Err(DocLiteError::invalid(format!(
                        "cannot create field '{}' in element {{{}: {}}}",
                        rest,
                        head,
                        slot.type_name()
                    ))),
                }
            }
        }
    }

    /// Remove a top-level field
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.shift_remove(field)
    }

    /// Remove a possibly dotted path
    pub fn remove_path(&mut self, path: &str) -> Option<Value> {
        if self.fields.contains_key(path) {
            return self.fields.shift_remove(path);
        }
        let (head, rest) = path.split_once('.')?;
        self.fields.get_mut(head)?.as_document_mut()?.remove_path(rest)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    // ========== TYPED GETTERS ==========

    fn typed<'a, T>(
        &'a self,
        path: &str,
        expected: &'static str,
        extract: impl FnOnce(&'a Value) -> Option<T>,
    ) -> Result<T> {
        let value = self
            .get(path)
            .ok_or_else(|| DocLiteError::FieldNotFound(path.to_string()))?;
        extract(value).ok_or_else(|| DocLiteError::TypeMismatch {
            field: path.to_string(),
            expected,
            found: value.type_name(),
        })
    }

    pub fn get_i64(&self, path: &str) -> Result<i64> {
        self.typed(path, "int", Value::as_i64)
    }

    /// Accepts both int and float fields
    pub fn get_f64(&self, path: &str) -> Result<f64> {
        self.typed(path, "number", Value::as_f64)
    }

    pub fn get_str(&self, path: &str) -> Result<&str> {
        self.typed(path, "string", Value::as_str)
    }

    pub fn get_bool(&self, path: &str) -> Result<bool> {
        self.typed(path, "bool", Value::as_bool)
    }

    pub fn get_timestamp(&self, path: &str) -> Result<DateTime<Utc>> {
        self.typed(path, "timestamp", |v| v.as_timestamp().copied())
    }

    pub fn get_document(&self, path: &str) -> Result<&Document> {
        self.typed(path, "document", Value::as_document)
    }

    pub fn get_array(&self, path: &str) -> Result<&[Value]> {
        self.typed(path, "array", Value::as_array)
    }
}

/// Equal when both hold the same fields in the same order
impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.fields.len() == other.fields.len() && self.fields.iter().eq(other.fields.iter())
    }
}

impl AsRef<Document> for Document {
    fn as_ref(&self) -> &Document {
        self
    }
}

impl From<Document> for Json {
    fn from(doc: Document) -> Self {
        doc.to_json()
    }
}

impl TryFrom<Json> for Document {
    type Error = DocLiteError;

    fn try_from(json: Json) -> Result<Self> {
        Document::from_json(&json)
    }
}

impl FromIterator<(String, Value)> for Document {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Document {
            fields: iter.into_iter().collect(),
        }
    }
}
