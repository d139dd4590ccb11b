//! Notes made of text, image and audio blocks

mod model;
mod repository;

pub use model::{format_duration, BlockKind, ContentBlock, Note, NoteStats};
pub use repository::{InMemoryNoteRepository, NoteError, NotePatch, NoteRepository, NoteResult};
