// src/database.rs
// Named group of collections

use std::sync::Arc;

use dashmap::DashMap;

use crate::collection::Collection;
use crate::config::IdGeneration;

/// Handle to a database; clones share the same collections
#[derive(Debug, Clone)]
pub struct Database {
    name: String,
    id_generation: IdGeneration,
    collections: Arc<DashMap<String, Collection>>,
}

impl Database {
    pub(crate) fn new(name: &str, id_generation: IdGeneration) -> Self {
        Database {
            name: name.to_string(),
            id_generation,
            collections: Arc::new(DashMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get a collection, creating it on first reference
    pub fn collection(&self, name: &str) -> Collection {
        self.collections
            .entry(name.to_string())
            .or_insert_with(|| {
                log::debug!("creating collection {}.{}", self.name, name);
                Collection::new(&self.name, name, self.id_generation)
            })
            .clone()
    }

    /// Collection names in sorted order
    pub fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.iter().map(|entry| entry.key().clone()).collect();
        names.sort();
        names
    }

    /// Drop and unregister a collection. Returns false if it never existed.
    ///
    /// Handles obtained earlier see an empty collection; the next
    /// [`collection`](Self::collection) call creates a fresh one.
    pub fn drop_collection(&self, name: &str) -> bool {
        match self.collections.remove(name) {
            Some((_, collection)) => {
                collection.drop();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use serde_json::json;

    #[test]
    fn test_collection_created_once() {
        let db = Database::new("test", IdGeneration::ObjectId);
        let a = db.collection("persons");
        let b = db.collection("persons");
        a.insert(Document::new().with("name", "x")).unwrap();
        assert_eq!(b.count(&json!({})).unwrap(), 1);
        assert_eq!(b.namespace(), "test.persons");
    }

    #[test]
    fn test_collection_names_sorted() {
        let db = Database::new("test", IdGeneration::ObjectId);
        db.collection("zoo");
        db.collection("alpha");
        db.collection("middle");
        assert_eq!(db.collection_names(), vec!["alpha", "middle", "zoo"]);
    }

    #[test]
    fn test_drop_collection() {
        let db = Database::new("test", IdGeneration::ObjectId);
        let persons = db.collection("persons");
        persons.insert(Document::new().with("name", "x")).unwrap();

        assert!(db.drop_collection("persons"));
        assert!(!db.drop_collection("persons"));
        assert!(db.collection_names().is_empty());
        assert_eq!(persons.count(&json!({})).unwrap(), 0);
    }
}
