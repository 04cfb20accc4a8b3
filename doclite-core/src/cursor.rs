// src/cursor.rs
// Lazy, forward-only cursor over a find() snapshot

use std::sync::Arc;

use crate::document::Document;
use crate::find_options::{apply_limit_skip, apply_sort, FindOptions, SortDirection};

/// Result sequence of a `find`.
///
/// The cursor holds the documents that matched when `find` ran. Sort, skip
/// and limit are applied when the first document is pulled; projection is
/// applied per yielded document. Once exhausted or closed it stays empty.
#[derive(Debug)]
pub struct Cursor {
    snapshot: Vec<Arc<Document>>,
    options: FindOptions,
    window: Option<std::vec::IntoIter<Arc<Document>>>,
    closed: bool,
}

impl Cursor {
    pub(crate) fn new(snapshot: Vec<Arc<Document>>, options: FindOptions) -> Self {
        Cursor {
            snapshot,
            options,
            window: None,
            closed: false,
        }
    }

    fn started(&self) -> bool {
        if self.window.is_some() {
            log::warn!("cursor already iterated, ignoring modifier");
            return true;
        }
        false
    }

    /// Add a sort key; later calls break ties of earlier ones
    pub fn sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        if !self.started() {
            self.options.sort.push((field.into(), direction));
        }
        self
    }

    /// Skip the first `n` documents; 0 means no skip
    pub fn skip(mut self, n: usize) -> Self {
        if !self.started() {
            self.options.skip = n;
        }
        self
    }

    /// Return at most `n` documents; 0 means no limit
    pub fn limit(mut self, n: usize) -> Self {
        if !self.started() {
            self.options.limit = n;
        }
        self
    }

    fn window(&mut self) -> &mut std::vec::IntoIter<Arc<Document>> {
        let snapshot = &self.snapshot;
        let options = &self.options;
        self.window.get_or_insert_with(|| {
            let mut docs = snapshot.clone();
            apply_sort(&mut docs, &options.sort);
            apply_limit_skip(docs, options.limit, options.skip).into_iter()
        })
    }

    /// Whether another document is available; never advances the cursor
    pub fn has_next(&mut self) -> bool {
        !self.closed && !self.window().as_slice().is_empty()
    }

    /// Number of matching documents, ignoring skip and limit.
    /// `Iterator::count` instead drains the cursor.
    pub fn total_count(&self) -> usize {
        self.snapshot.len()
    }

    /// Number of documents this cursor yields in total, honoring skip and limit
    pub fn size(&self) -> usize {
        let remaining = self.snapshot.len().saturating_sub(self.options.skip);
        match self.options.limit {
            0 => remaining,
            limit => remaining.min(limit),
        }
    }

    /// Release the snapshot. Safe to call any number of times.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.snapshot = Vec::new();
        self.window = Some(Vec::new().into_iter());
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Iterator for Cursor {
    type Item = Document;

    fn next(&mut self) -> Option<Document> {
        if self.closed {
            return None;
        }
        let doc = self.window().next()?;
        Some(match &self.options.projection {
            Some(projection) => projection.apply(&doc),
            None => Arc::try_unwrap(doc).unwrap_or_else(|shared| (*shared).clone()),
        })
    }
}
