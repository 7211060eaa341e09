use async_trait::async_trait;

use crate::models::note::{NewNote, Note};

#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// All notes, newest `created_at` first, ties broken by id descending.
    async fn list_notes(&self) -> Result<Vec<Note>, sqlx::Error>;
    async fn find_note(&self, id: i64) -> Result<Option<Note>, sqlx::Error>;
    async fn create_note(&self, note: &NewNote) -> Result<i64, sqlx::Error>;
    /// Returns the updated note, or `None` if no note has that id.
    async fn update_note(&self, id: i64, note: &NewNote) -> Result<Option<Note>, sqlx::Error>;
    async fn delete_note(&self, id: i64) -> Result<bool, sqlx::Error>;
}
