//! In-memory document store.
//!
//! Maps a document identifier to its extracted text and an optional derived
//! summary. Iteration follows insertion order, which is also the order in
//! which documents are concatenated into a context prompt.
//!
//! The store is owned by the [`App`](crate::app::App) controller and mutated
//! through `&mut` only; a multi-threaded host would need to wrap it in a lock.

use std::path::Path;

use crate::error::{Error, Result};
use crate::models::Document;

/// Derive the store identifier for an uploaded file: its final path component.
pub fn document_id(file_name: &str) -> String {
    Path::new(file_name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(file_name)
        .to_string()
}

#[derive(Debug, Default, Clone)]
pub struct DocumentStore {
    documents: Vec<Document>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert extracted text under a new identifier.
    ///
    /// Fails with [`Error::DuplicateDocument`] if the identifier is taken; the
    /// existing text and summary are left untouched.
    pub fn put(&mut self, id: impl Into<String>, text: impl Into<String>) -> Result<()> {
        let id = id.into();
        if self.contains(&id) {
            return Err(Error::DuplicateDocument(id));
        }
        self.documents.push(Document {
            id,
            text: text.into(),
            summary: None,
        });
        Ok(())
    }

    /// Attach or replace the summary of an existing document.
    ///
    /// Returns `false` if the document is unknown (e.g. deleted while the
    /// summary was being generated).
    pub fn put_summary(&mut self, id: &str, summary: impl Into<String>) -> bool {
        match self.documents.iter_mut().find(|d| d.id == id) {
            Some(doc) => {
                doc.summary = Some(summary.into());
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.document(id).map(|d| d.text.as_str())
    }

    pub fn summary(&self, id: &str) -> Option<&str> {
        self.document(id).and_then(|d| d.summary.as_deref())
    }

    pub fn document(&self, id: &str) -> Option<&Document> {
        self.documents.iter().find(|d| d.id == id)
    }

    /// Remove a document's text and summary together.
    pub fn delete(&mut self, id: &str) -> Option<Document> {
        let pos = self.documents.iter().position(|d| d.id == id)?;
        Some(self.documents.remove(pos))
    }

    /// `(identifier, text)` pairs in insertion order. Summaries are derived
    /// metadata and never appear here.
    pub fn all_entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.documents
            .iter()
            .map(|d| (d.id.as_str(), d.text.as_str()))
    }

    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.documents.iter().map(|d| d.id.as_str())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.document(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
