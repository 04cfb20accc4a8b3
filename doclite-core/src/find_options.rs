// doclite-core/src/find_options.rs
// Find query options: projection, sort, limit, skip

use std::cmp::Ordering;

use serde_json::Value as Json;

use crate::document::{Document, ID_FIELD};
use crate::error::{DocLiteError, Result};
use crate::value::Value;

/// Sort direction for cursor ordering and index keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    /// `1` / `-1` as used in index names and sort specs
    pub fn as_i32(self) -> i32 {
        match self {
            SortDirection::Ascending => 1,
            SortDirection::Descending => -1,
        }
    }

    pub fn from_i32(direction: i32) -> Result<Self> {
        match direction {
            1 => Ok(SortDirection::Ascending),
            -1 => Ok(SortDirection::Descending),
            other => Err(DocLiteError::invalid(format!(
                "sort direction must be 1 or -1, got {}",
                other
            ))),
        }
    }
}

/// Field selection applied to returned documents
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    fields: Vec<(String, bool)>,
}

impl Projection {
    /// Parse `{"field": true|false|1|0}`. `null` and `{}` mean no projection.
    pub fn from_json(json: &Json) -> Result<Option<Self>> {
        let map = match json {
            Json::Null => return Ok(None),
            Json::Object(map) if map.is_empty() => return Ok(None),
            Json::Object(map) => map,
            other => {
                return Err(DocLiteError::invalid(format!(
                    "projection must be an object, got {}",
                    other
                )))
            }
        };

        let mut fields = Vec::with_capacity(map.len());
        for (field, flag) in map {
            let include = match flag {
                Json::Bool(b) => *b,
                Json::Number(n) => n.as_f64() != Some(0.0),
                other => {
                    return Err(DocLiteError::invalid(format!(
                        "projection flag for '{}' must be a bool or number, got {}",
                        field, other
                    )))
                }
            };
            fields.push((field.clone(), include));
        }

        // `a` and `a.b` address overlapping data
        for (i, (a, _)) in fields.iter().enumerate() {
            for (b, _) in &fields[i + 1..] {
                let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
                if long.starts_with(short.as_str()) && long[short.len()..].starts_with('.') {
                    return Err(DocLiteError::invalid(format!(
                        "projection path collision between '{}' and '{}'",
                        a, b
                    )));
                }
            }
        }

        let projection = Projection { fields };
        let mixes = projection.fields.iter().any(|(f, inc)| *inc && f != ID_FIELD)
            && projection.fields.iter().any(|(f, inc)| !*inc && f != ID_FIELD);
        if mixes {
            return Err(DocLiteError::invalid(
                "projection cannot mix inclusion and exclusion",
            ));
        }
        Ok(Some(projection))
    }

    fn flag(&self, field: &str) -> Option<bool> {
        self.fields.iter().find(|(f, _)| f == field).map(|(_, inc)| *inc)
    }

    fn include_mode(&self) -> bool {
        self.fields.iter().any(|(f, inc)| *inc && f != ID_FIELD)
            || self.fields.iter().all(|(_, inc)| *inc)
    }

    /// Apply to one document
    pub fn apply(&self, doc: &Document) -> Document {
        let mut result = Document::new();

        if self.include_mode() {
            // _id first unless explicitly excluded
            if self.flag(ID_FIELD) != Some(false) {
                if let Some(id) = doc.get(ID_FIELD) {
                    result.set(ID_FIELD, id.clone());
                }
            }
            for (field, include) in &self.fields {
                if *include && field != ID_FIELD {
                    if let Some(value) = doc.get(field) {
                        if let Err(err) = result.set_path(field, value.clone()) {
                            log::warn!("skipping projected field '{}': {}", field, err);
                        }
                    }
                }
            }
        } else {
            for (key, value) in doc.iter() {
                if self.flag(key) != Some(false) {
                    result.set(key, value.clone());
                }
            }
            for (field, _) in self.fields.iter().filter(|(f, _)| f.contains('.')) {
                result.remove_path(field);
            }
        }

        result
    }
}

/// Cursor state: projection, sort, limit, skip
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    pub projection: Option<Projection>,

    /// Sort keys in priority order
    pub sort: Vec<(String, SortDirection)>,

    /// Maximum number of documents to return; 0 means no limit
    pub limit: usize,

    /// Number of documents to skip
    pub skip: usize,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_projection(mut self, projection: Projection) -> Self {
        self.projection = Some(projection);
        self
    }

    pub fn with_sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.sort.push((field.into(), direction));
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }
}

/// Stable sort; ties keep their incoming (insertion) order
pub fn apply_sort<D: AsRef<Document>>(docs: &mut [D], sort: &[(String, SortDirection)]) {
    if sort.is_empty() {
        return;
    }

    docs.sort_by(|a, b| {
        for (field, direction) in sort {
            let cmp = compare_fields(a.as_ref().get(field), b.as_ref().get(field));
            if cmp != Ordering::Equal {
                return match direction {
                    SortDirection::Ascending => cmp,
                    SortDirection::Descending => cmp.reverse(),
                };
            }
        }
        Ordering::Equal
    });
}

/// Missing fields sort like null
fn compare_fields(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let null = Value::Null;
    a.unwrap_or(&null).sort_cmp(b.unwrap_or(&null))
}

/// Drop `skip` documents from the front, keep at most `limit` (0 = all)
pub fn apply_limit_skip<T>(docs: Vec<T>, limit: usize, skip: usize) -> Vec<T> {
    let iter = docs.into_iter().skip(skip);
    if limit == 0 {
        iter.collect()
    } else {
        iter.take(limit).collect()
    }
}
