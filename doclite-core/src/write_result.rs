// src/write_result.rs
use crate::document::DocumentId;

/// Outcome of an update or remove.
///
/// `n` counts the documents the call claimed: matched for updates (1 for an
/// upsert that inserted), removed for removes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteResult {
    pub n: u64,
    /// Documents whose content actually changed
    pub modified_count: u64,
    /// True when an update hit at least one existing document
    pub updated_existing: bool,
    /// Set when an upsert created a document
    pub upserted_id: Option<DocumentId>,
}

impl WriteResult {
    pub(crate) fn updated(matched: u64, modified: u64) -> Self {
        WriteResult {
            n: matched,
            modified_count: modified,
            updated_existing: matched > 0,
            upserted_id: None,
        }
    }

    pub(crate) fn upserted(id: DocumentId) -> Self {
        WriteResult {
            n: 1,
            modified_count: 0,
            updated_existing: false,
            upserted_id: Some(id),
        }
    }

    pub(crate) fn removed(count: u64) -> Self {
        WriteResult {
            n: count,
            ..Default::default()
        }
    }

    pub fn matched_count(&self) -> u64 {
        self.n
    }

    pub fn removed_count(&self) -> u64 {
        self.n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_updated() {
        let result = WriteResult::updated(2, 1);
        assert_eq!(result.matched_count(), 2);
        assert_eq!(result.modified_count, 1);
        assert!(result.updated_existing);
        assert!(result.upserted_id.is_none());

        assert!(!WriteResult::updated(0, 0).updated_existing);
    }

    #[test]
    fn test_upserted() {
        let result = WriteResult::upserted(DocumentId::Int(1));
        assert_eq!(result.n, 1);
        assert!(!result.updated_existing);
        assert_eq!(result.upserted_id, Some(DocumentId::Int(1)));
    }

    #[test]
    fn test_removed() {
        let result = WriteResult::removed(3);
        assert_eq!(result.removed_count(), 3);
        assert_eq!(result.modified_count, 0);
    }
}
