use std::collections::HashSet;

use chrono::Utc;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::model::{ContentBlock, Note, NoteStats};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NoteError {
    #[error("Note not found: {0}")]
    NotFound(String),

    #[error("Invalid block index {index} for note {id}")]
    InvalidBlockIndex { id: String, index: usize },

    #[error("Duplicate note id: {0}")]
    DuplicateId(String),
}

pub type NoteResult<T> = Result<T, NoteError>;

/// Partial update of a note
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotePatch {
    pub content: Option<Vec<ContentBlock>>,
}

/// Storage for notes, passed explicitly to whoever needs it
#[async_trait::async_trait]
pub trait NoteRepository: Send + Sync {
    /// All notes, most recently updated first
    async fn list(&self) -> NoteResult<Vec<Note>>;

    async fn get(&self, id: &str) -> NoteResult<Option<Note>>;

    /// Create a note; without content it starts with one empty text block
    async fn create(&self, content: Option<Vec<ContentBlock>>) -> NoteResult<Note>;

    async fn update(&self, id: &str, patch: NotePatch) -> NoteResult<Note>;

    async fn delete(&self, id: &str) -> NoteResult<()>;

    async fn append_block(&self, id: &str, block: ContentBlock) -> NoteResult<Note>;

    async fn replace_block_at(&self, id: &str, index: usize, block: ContentBlock)
        -> NoteResult<Note>;

    async fn remove_block_at(&self, id: &str, index: usize) -> NoteResult<Note>;

    /// Notes whose text blocks contain `query` (case-insensitive)
    async fn search(&self, query: &str) -> NoteResult<Vec<Note>>;

    async fn stats(&self) -> NoteResult<NoteStats>;
}

/// Process-local note store
#[derive(Debug, Default)]
pub struct InMemoryNoteRepository {
    notes: RwLock<Vec<Note>>,
}

impl InMemoryNoteRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the repository; ids must be unique
    pub fn with_notes(notes: Vec<Note>) -> NoteResult<Self> {
        let mut seen = HashSet::new();
        for note in &notes {
            if !seen.insert(note.id.as_str()) {
                return Err(NoteError::DuplicateId(note.id.clone()));
            }
        }

        Ok(Self {
            notes: RwLock::new(notes),
        })
    }

    fn sorted(mut notes: Vec<Note>) -> Vec<Note> {
        notes.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        notes
    }

    async fn modify<F>(&self, id: &str, f: F) -> NoteResult<Note>
    where
        F: FnOnce(&mut Note) -> NoteResult<()> + Send,
    {
        let mut notes = self.notes.write().await;
        let note = notes
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| NoteError::NotFound(id.to_string()))?;

        f(note)?;
        note.updated_at = Utc::now();
        Ok(note.clone())
    }
}

fn check_index(note: &Note, index: usize) -> NoteResult<()> {
    if index < note.content.len() {
        Ok(())
    } else {
        Err(NoteError::InvalidBlockIndex {
            id: note.id.clone(),
            index,
        })
    }
}

#[async_trait::async_trait]
impl NoteRepository for InMemoryNoteRepository {
    async fn list(&self) -> NoteResult<Vec<Note>> {
        let notes = self.notes.read().await.clone();
        Ok(Self::sorted(notes))
    }

    async fn get(&self, id: &str) -> NoteResult<Option<Note>> {
        let notes = self.notes.read().await;
        Ok(notes.iter().find(|n| n.id == id).cloned())
    }

    async fn create(&self, content: Option<Vec<ContentBlock>>) -> NoteResult<Note> {
        let note = Note {
            id: uuid::Uuid::new_v4().to_string(),
            updated_at: Utc::now(),
            content: content.unwrap_or_else(|| vec![ContentBlock::text("")]),
        };

        self.notes.write().await.insert(0, note.clone());
        info!(id = %note.id, blocks = note.content.len(), "note created");
        Ok(note)
    }

    async fn update(&self, id: &str, patch: NotePatch) -> NoteResult<Note> {
        self.modify(id, |note| {
            if let Some(content) = patch.content {
                note.content = content;
            }
            Ok(())
        })
        .await
    }

    async fn delete(&self, id: &str) -> NoteResult<()> {
        let mut notes = self.notes.write().await;
        let before = notes.len();
        notes.retain(|n| n.id != id);
        if notes.len() == before {
            return Err(NoteError::NotFound(id.to_string()));
        }

        info!(id, "note deleted");
        Ok(())
    }

    async fn append_block(&self, id: &str, block: ContentBlock) -> NoteResult<Note> {
        self.modify(id, |note| {
            note.content.push(block);
            Ok(())
        })
        .await
    }

    async fn replace_block_at(
        &self,
        id: &str,
        index: usize,
        block: ContentBlock,
    ) -> NoteResult<Note> {
        self.modify(id, |note| {
            check_index(note, index)?;
            note.content[index] = block;
            Ok(())
        })
        .await
    }

    async fn remove_block_at(&self, id: &str, index: usize) -> NoteResult<Note> {
        self.modify(id, |note| {
            check_index(note, index)?;
            note.content.remove(index);
            Ok(())
        })
        .await
    }

    async fn search(&self, query: &str) -> NoteResult<Vec<Note>> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return self.list().await;
        }

        let matches: Vec<Note> = self
            .notes
            .read()
            .await
            .iter()
            .filter(|note| note.content.iter().any(|b| b.matches_text(&query)))
            .cloned()
            .collect();

        debug!(query = %query, found = matches.len(), "note search");
        Ok(Self::sorted(matches))
    }

    async fn stats(&self) -> NoteResult<NoteStats> {
        let notes = self.notes.read().await;
        let mut stats = NoteStats::default();
        for note in notes.iter() {
            stats.record(note);
        }
        Ok(stats)
    }
}
