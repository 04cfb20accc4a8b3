// src/update.rs
// Update specifications: full replacement or operator document

use serde_json::Value as Json;

use crate::document::{Document, DocumentId, ID_FIELD};
use crate::error::{DocLiteError, Result};
use crate::query::{is_operator_map, Query};
use crate::value::Value;

/// A single update operator with its field assignments
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOperator {
    Set(Vec<(String, Value)>),   // $set
    Unset(Vec<String>),          // $unset
    Inc(Vec<(String, Value)>),   // $inc
}

/// Parsed update, decided once from the top-level keys
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateSpec {
    /// Replace the whole document (the `_id` is kept)
    Replace(Document),
    /// Merge the named fields, leave the rest untouched
    Operators(Vec<UpdateOperator>),
}

impl UpdateSpec {
    pub fn from_json(json: &Json) -> Result<Self> {
        let map = match json {
            Json::Object(map) => map,
            other => {
                return Err(DocLiteError::invalid(format!(
                    "update must be an object, got {}",
                    other
                )))
            }
        };

        if is_operator_map(map) {
            let operators = map
                .iter()
                .map(|(op, fields)| Self::parse_operator(op, fields))
                .collect::<Result<Vec<_>>>()?;
            return Ok(UpdateSpec::Operators(operators));
        }

        if let Some(key) = map.keys().find(|k| k.starts_with('$')) {
            return Err(DocLiteError::invalid(format!(
                "cannot mix update operator '{}' with replacement fields",
                key
            )));
        }

        Ok(UpdateSpec::Replace(Document::from_json(json)?))
    }

    fn parse_operator(op: &str, fields: &Json) -> Result<UpdateOperator> {
        let Json::Object(field_values) = fields else {
            return Err(DocLiteError::invalid(format!(
                "{} requires a document of fields, got {}",
                op, fields
            )));
        };

        for path in field_values.keys() {
            if path == ID_FIELD || path.starts_with("_id.") {
                return Err(DocLiteError::invalid(format!(
                    "performing {} on the path '{}' would modify the immutable field '_id'",
                    op, path
                )));
            }
        }

        let assignments = || {
            field_values
                .iter()
                .map(|(k, v)| (k.clone(), Value::from(v)))
                .collect::<Vec<_>>()
        };

        match op {
            "$set" => Ok(UpdateOperator::Set(assignments())),
            "$unset" => Ok(UpdateOperator::Unset(field_values.keys().cloned().collect())),
            "$inc" => {
                let increments = assignments();
                if let Some((field, value)) = increments.iter().find(|(_, v)| v.as_f64().is_none()) {
                    return Err(DocLiteError::invalid(format!(
                        "cannot increment '{}' with non-numeric {}",
                        field,
                        value.type_name()
                    )));
                }
                Ok(UpdateOperator::Inc(increments))
            }
            _ => Err(DocLiteError::invalid(format!("unsupported update operator: {}", op))),
        }
    }

    pub fn is_replacement(&self) -> bool {
        matches!(self, UpdateSpec::Replace(_))
    }

    /// Compute the updated version of `original`; the original is not touched
    pub fn apply(&self, original: &Document) -> Result<Document> {
        match self {
            UpdateSpec::Replace(replacement) => {
                let original_id = original.id();
                if let (Some(new_id), Some(old_id)) = (replacement.id(), original_id.as_ref()) {
                    if &new_id != old_id {
                        return Err(DocLiteError::invalid(format!(
                            "the _id field cannot be changed from {} to {}",
                            old_id, new_id
                        )));
                    }
                }

                let mut updated = Document::new();
                if let Some(id) = original_id {
                    updated.set_id(id);
                }
                for (field, value) in replacement.iter().filter(|(k, _)| *k != ID_FIELD) {
                    updated.set(field, value.clone());
                }
                Ok(updated)
            }
            UpdateSpec::Operators(operators) => {
                let mut updated = original.clone();
                for operator in operators {
                    apply_operator(&mut updated, operator)?;
                }
                Ok(updated)
            }
        }
    }

    /// Document created by an upsert that matched nothing.
    ///
    /// A replacement is stored as given and takes an `_id` equality from the
    /// filter if it has none of its own. Operators are applied to a document
    /// seeded with the filter's equality clauses.
    pub fn upsert_document(&self, query: &Query) -> Result<Document> {
        let equalities = query.equality_fields();
        match self {
            UpdateSpec::Replace(replacement) => {
                let mut doc = replacement.clone();
                if doc.id().is_none() {
                    let filter_id = equalities
                        .iter()
                        .find(|(field, _)| field == ID_FIELD)
                        .and_then(|(_, value)| DocumentId::try_from(value).ok());
                    if let Some(id) = filter_id {
                        doc.set_id(id);
                    }
                }
                Ok(doc)
            }
            UpdateSpec::Operators(operators) => {
                let mut doc = Document::new();
                for (path, value) in equalities {
                    doc.set_path(&path, value)?;
                }
                for operator in operators {
                    apply_operator(&mut doc, operator)?;
                }
                Ok(doc)
            }
        }
    }
}

fn apply_operator(doc: &mut Document, operator: &UpdateOperator) -> Result<()> {
    match operator {
        UpdateOperator::Set(assignments) => {
            for (path, value) in assignments {
                doc.set_path(path, value.clone())?;
            }
        }
        UpdateOperator::Unset(paths) => {
            for path in paths {
                doc.remove_path(path);
            }
        }
        UpdateOperator::Inc(increments) => {
            for (path, delta) in increments {
                let next = match doc.get(path) {
                    None => delta.clone(),
                    Some(Value::Int(current)) => match delta {
                        Value::Int(d) => current
                            .checked_add(*d)
                            .map(Value::Int)
                            .unwrap_or(Value::Float(*current as f64 + *d as f64)),
                        other => Value::Float(*current as f64 + other.as_f64().unwrap_or(0.0)),
                    },
                    Some(Value::Float(current)) => Value::Float(current + delta.as_f64().unwrap_or(0.0)),
                    Some(other) => {
                        return Err(DocLiteError::invalid(format!(
                            "cannot apply $inc to '{}' of non-numeric type {}",
                            path,
                            other.type_name()
                        )))
                    }
                };
                doc.set_path(path, next)?;
            }
        }
    }
    Ok(())
}
