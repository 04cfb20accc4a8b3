// src/collection.rs
// In-memory collection: documents, id registry and index metadata behind one lock

use std::sync::Arc;

use ahash::AHashSet;
use parking_lot::RwLock;
use serde_json::Value as Json;

use crate::config::IdGeneration;
use crate::cursor::Cursor;
use crate::document::{Document, DocumentId, ID_FIELD};
use crate::error::{DocLiteError, Result};
use crate::find_options::{FindOptions, Projection, SortDirection};
use crate::index::{index_name, IndexInfo, IndexManager, ID_INDEX_NAME};
use crate::query::Query;
use crate::update::UpdateSpec;
use crate::value::Value;
use crate::write_result::WriteResult;

#[derive(Debug)]
struct CollectionState {
    /// Insertion order; updates swap the Arc in place
    docs: Vec<Arc<Document>>,
    ids: AHashSet<DocumentId>,
    indexes: IndexManager,
    last_id: u64,
}

impl CollectionState {
    /// Give `doc` an id if it has none and check it against stored and `pending` ids
    fn assign_id(
        &mut self,
        doc: &mut Document,
        strategy: IdGeneration,
        pending: &AHashSet<DocumentId>,
    ) -> Result<DocumentId> {
        let id = match doc.id() {
            Some(id) => id,
            None if doc.contains(ID_FIELD) => {
                let found = doc.get(ID_FIELD).map_or("null", Value::type_name);
                return Err(DocLiteError::invalid(format!(
                    "_id must be an integer, string or object id, got {}",
                    found
                )));
            }
            None => {
                let id = self.generate_id(strategy, pending);
                doc.set_id(id.clone());
                id
            }
        };

        if self.ids.contains(&id) || pending.contains(&id) {
            return Err(DocLiteError::DuplicateKey(id));
        }
        Ok(id)
    }

    fn generate_id(&mut self, strategy: IdGeneration, pending: &AHashSet<DocumentId>) -> DocumentId {
        match strategy {
            IdGeneration::ObjectId => DocumentId::new_object_id(),
            IdGeneration::AutoIncrement => loop {
                let id = DocumentId::new_auto(self.last_id);
                self.last_id += 1;
                // skip integers a caller already stored explicitly
                if !self.ids.contains(&id) && !pending.contains(&id) {
                    break id;
                }
            },
        }
    }

    fn push(&mut self, id: DocumentId, doc: Document) {
        self.ids.insert(id);
        self.docs.push(Arc::new(doc));
    }

    fn matching<'a>(&'a self, query: &'a Query) -> impl Iterator<Item = (usize, &'a Arc<Document>)> + 'a {
        self.docs
            .iter()
            .enumerate()
            .filter(move |(_, doc)| query.matches(doc))
    }
}

/// Handle to a named collection.
///
/// Clones share the same underlying documents. Reads take the collection's
/// read lock, mutations take the write lock for their whole
/// read-match-write sequence, so every call is atomic.
#[derive(Debug, Clone)]
pub struct Collection {
    name: String,
    namespace: String,
    id_generation: IdGeneration,
    state: Arc<RwLock<CollectionState>>,
}

impl Collection {
    pub(crate) fn new(database: &str, name: &str, id_generation: IdGeneration) -> Self {
        let namespace = format!("{}.{}", database, name);
        let state = CollectionState {
            docs: Vec::new(),
            ids: AHashSet::new(),
            indexes: IndexManager::new(namespace.clone()),
            last_id: 0,
        };
        Collection {
            name: name.to_string(),
            namespace,
            id_generation,
            state: Arc::new(RwLock::new(state)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `<database>.<collection>`
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Insert one document, generating an `_id` if it has none
    pub fn insert(&self, mut doc: Document) -> Result<DocumentId> {
        let mut state = self.state.write();
        let id = state.assign_id(&mut doc, self.id_generation, &AHashSet::new())?;
        state.push(id.clone(), doc);
        log::debug!("inserted {} into {}", id, self.namespace);
        Ok(id)
    }

    /// Insert several documents; either all of them are stored or none
    pub fn insert_many(&self, docs: impl IntoIterator<Item = Document>) -> Result<Vec<DocumentId>> {
        let mut state = self.state.write();
        let last_id = state.last_id;

        let mut pending = AHashSet::new();
        let mut staged = Vec::new();
        for mut doc in docs {
            match state.assign_id(&mut doc, self.id_generation, &pending) {
                Ok(id) => {
                    pending.insert(id.clone());
                    staged.push((id, doc));
                }
                Err(e) => {
                    state.last_id = last_id;
                    return Err(e);
                }
            }
        }

        let ids: Vec<DocumentId> = staged.iter().map(|(id, _)| id.clone()).collect();
        for (id, doc) in staged {
            state.push(id, doc);
        }
        log::debug!("inserted {} documents into {}", ids.len(), self.namespace);
        Ok(ids)
    }

    /// Cursor over the documents matching `filter` (`{}` or `null` for all)
    pub fn find(&self, filter: &Json) -> Result<Cursor> {
        self.find_with_options(filter, FindOptions::new())
    }

    /// Like [`find`](Self::find), yielding only the projected fields
    pub fn find_with_projection(&self, filter: &Json, projection: &Json) -> Result<Cursor> {
        let mut options = FindOptions::new();
        options.projection = Projection::from_json(projection)?;
        self.find_with_options(filter, options)
    }

    pub fn find_with_options(&self, filter: &Json, options: FindOptions) -> Result<Cursor> {
        let query = Query::from_json(filter)?;
        let snapshot: Vec<Arc<Document>> = {
            let state = self.state.read();
            state.matching(&query).map(|(_, doc)| Arc::clone(doc)).collect()
        };
        log::debug!("find on {} matched {} documents", self.namespace, snapshot.len());
        Ok(Cursor::new(snapshot, options))
    }

    /// First match in insertion order
    pub fn find_one(&self, filter: &Json) -> Result<Option<Document>> {
        let query = Query::from_json(filter)?;
        let state = self.state.read();
        let found = state.matching(&query).next().map(|(_, doc)| Document::clone(doc));
        Ok(found)
    }

    pub fn count(&self, filter: &Json) -> Result<u64> {
        let query = Query::from_json(filter)?;
        let state = self.state.read();
        Ok(state.matching(&query).count() as u64)
    }

    /// Unique values of `field` among matches, in first-seen order.
    /// Array values contribute their elements.
    pub fn distinct(&self, field: &str, filter: &Json) -> Result<Vec<Value>> {
        let query = Query::from_json(filter)?;
        let state = self.state.read();

        let mut seen = AHashSet::new();
        let mut values = Vec::new();
        for (_, doc) in state.matching(&query) {
            let candidates = match doc.get(field) {
                None => continue,
                Some(Value::Array(items)) => items.clone(),
                Some(value) => vec![value.clone()],
            };
            for value in candidates {
                if seen.insert(value.to_json().to_string()) {
                    values.push(value);
                }
            }
        }
        Ok(values)
    }

    /// Update matching documents.
    ///
    /// `update` is either a replacement document or an operator document
    /// (`$set`, `$unset`, `$inc`). Without `multi` only the first match is
    /// touched. With `upsert`, a miss inserts one new document.
    pub fn update(&self, filter: &Json, update: &Json, upsert: bool, multi: bool) -> Result<WriteResult> {
        let query = Query::from_json(filter)?;
        let spec = UpdateSpec::from_json(update)?;
        if multi && spec.is_replacement() {
            return Err(DocLiteError::invalid(
                "multi update only works with update operators",
            ));
        }

        let mut state = self.state.write();
        let limit = if multi { usize::MAX } else { 1 };

        // compute every new version before touching the collection
        let updated = state
            .matching(&query)
            .take(limit)
            .map(|(pos, doc)| spec.apply(doc).map(|new_doc| (pos, new_doc)))
            .collect::<Result<Vec<_>>>()?;

        if updated.is_empty() {
            if !upsert {
                return Ok(WriteResult::updated(0, 0));
            }
            let mut doc = spec.upsert_document(&query)?;
            let id = state.assign_id(&mut doc, self.id_generation, &AHashSet::new())?;
            state.push(id.clone(), doc);
            log::debug!("upserted {} into {}", id, self.namespace);
            return Ok(WriteResult::upserted(id));
        }

        let matched = updated.len() as u64;
        let mut modified = 0;
        for (pos, new_doc) in updated {
            if *state.docs[pos] != new_doc {
                state.docs[pos] = Arc::new(new_doc);
                modified += 1;
            }
        }
        log::debug!(
            "update on {} matched {} modified {}",
            self.namespace,
            matched,
            modified
        );
        Ok(WriteResult::updated(matched, modified))
    }

    /// Remove every matching document
    pub fn remove(&self, filter: &Json) -> Result<WriteResult> {
        let query = Query::from_json(filter)?;
        let mut state = self.state.write();
        let CollectionState { docs, ids, .. } = &mut *state;

        let before = docs.len();
        docs.retain(|doc| {
            if !query.matches(doc) {
                return true;
            }
            if let Some(id) = doc.id() {
                ids.remove(&id);
            }
            false
        });
        let removed = (before - docs.len()) as u64;
        log::debug!("removed {} documents from {}", removed, self.namespace);
        Ok(WriteResult::removed(removed))
    }

    /// Register an index on `field`; returns its name
    pub fn create_index(&self, field: &str, direction: SortDirection) -> Result<String> {
        self.state.write().indexes.create_index(field, direction)
    }

    /// Drop the index on `field` with the given direction
    pub fn drop_index(&self, field: &str, direction: SortDirection) -> Result<()> {
        let name = if field == ID_FIELD && direction == SortDirection::Ascending {
            ID_INDEX_NAME.to_string()
        } else {
            index_name(field, direction)
        };
        self.drop_index_by_name(&name)
    }

    pub fn drop_index_by_name(&self, name: &str) -> Result<()> {
        self.state.write().indexes.drop_index(name)
    }

    /// All indexes, `_id_` first then in creation order
    pub fn index_information(&self) -> Vec<IndexInfo> {
        self.state.read().indexes.list_indexes().to_vec()
    }

    /// Remove all documents and every index but `_id_`
    pub fn drop(&self) {
        let mut state = self.state.write();
        state.docs.clear();
        state.ids.clear();
        state.indexes.reset();
        state.last_id = 0;
        log::info!("dropped collection {}", self.namespace);
    }
}
