use async_trait::async_trait;
use sqlx::PgPool;

use crate::{
    db::note_repository::NoteRepository,
    models::note::{NewNote, Note},
};

pub struct PostgresNoteRepository {
    pub pool: PgPool,
}

#[async_trait]
impl NoteRepository for PostgresNoteRepository {
    async fn list_notes(&self) -> Result<Vec<Note>, sqlx::Error> {
        sqlx::query_as::<_, Note>(
            r#"
            SELECT id, title, description, category, priority, created_at
            FROM notes
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn find_note(&self, id: i64) -> Result<Option<Note>, sqlx::Error> {
        sqlx::query_as::<_, Note>(
            "SELECT id, title, description, category, priority, created_at FROM notes WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn create_note(&self, note: &NewNote) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            INSERT INTO notes (title, description, category, priority, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(&note.title)
        .bind(&note.description)
        .bind(&note.category)
        .bind(&note.priority)
        .bind(note.created_at)
        .fetch_one(&self.pool)
        .await
    }

    async fn update_note(&self, id: i64, note: &NewNote) -> Result<Option<Note>, sqlx::Error> {
        sqlx::query_as::<_, Note>(
            r#"
            UPDATE notes
            SET title = $1,
                description = $2,
                category = $3,
                priority = $4,
                created_at = $5
            WHERE id = $6
            RETURNING id, title, description, category, priority, created_at
            "#,
        )
        .bind(&note.title)
        .bind(&note.description)
        .bind(&note.category)
        .bind(&note.priority)
        .bind(note.created_at)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_note(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM notes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
