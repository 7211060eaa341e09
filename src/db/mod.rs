pub mod mock_db;
pub mod note_repository;
pub mod postgres_note_repository;
pub mod postgres_user_repository;
pub mod user_repository;
