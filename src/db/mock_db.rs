use std::collections::{BTreeMap, HashMap};
use std::error::Error as StdError;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use sqlx::error::{DatabaseError, ErrorKind};
use time::OffsetDateTime;
use uuid::Uuid;

use super::{note_repository::NoteRepository, user_repository::UserRepository};
use crate::models::{
    note::{NewNote, Note},
    signup::SignupPayload,
    token::TokenPurpose,
    user::{PublicUser, User},
};

/// In-memory stand-in for Postgres. Every operation takes the table lock
/// once, so the conditional updates are as atomic as their SQL versions.
#[derive(Default)]
pub struct MockDb {
    pub users: Mutex<HashMap<Uuid, User>>,
    pub notes: Mutex<BTreeMap<i64, Note>>,
    pub should_fail: bool,
    /// Makes `is_email_taken` always answer `false`, as if another signup
    /// for the same address landed between the check and the insert.
    pub stale_email_check: bool,
    /// Number of token lookups served, for asserting that none happened.
    pub token_lookups: AtomicUsize,
}

impl MockDb {
    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Default::default()
        }
    }

    pub fn with_user(user: User) -> Self {
        let db = Self::default();
        db.insert_user(user);
        db
    }

    pub fn insert_user(&self, user: User) {
        self.users.lock().unwrap().insert(user.id, user);
    }

    pub fn user(&self, id: Uuid) -> Option<User> {
        self.users.lock().unwrap().get(&id).cloned()
    }

    pub fn user_by_email(&self, email: &str) -> Option<User> {
        self.users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.email == email)
            .cloned()
    }

    fn check(&self) -> Result<(), sqlx::Error> {
        if self.should_fail {
            return Err(sqlx::Error::Protocol("Mock DB failure".into()));
        }
        Ok(())
    }
}

/// What Postgres reports when an insert hits a unique index.
#[derive(Debug)]
pub struct UniqueViolation(pub &'static str);

impl fmt::Display for UniqueViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "duplicate key value violates unique constraint \"{}\"", self.0)
    }
}

impl StdError for UniqueViolation {}

impl DatabaseError for UniqueViolation {
    fn message(&self) -> &str {
        "duplicate key value violates unique constraint"
    }

    fn constraint(&self) -> Option<&str> {
        Some(self.0)
    }

    fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self
    }

    fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
        self
    }

    fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
        self
    }

    fn kind(&self) -> ErrorKind {
        ErrorKind::UniqueViolation
    }
}

/// Builds an unverified user with no tokens.
pub fn test_user(email: &str, password_hash: &str) -> User {
    User {
        id: Uuid::new_v4(),
        username: "tester".into(),
        email: email.into(),
        password_hash: password_hash.into(),
        is_verified: false,
        verify_token: None,
        verify_token_expiry: None,
        verified_token: None,
        forgot_password_token: None,
        forgot_password_token_expiry: None,
        created_at: OffsetDateTime::now_utc(),
    }
}

#[async_trait]
impl UserRepository for MockDb {
    async fn is_email_taken(&self, email: &str) -> Result<bool, sqlx::Error> {
        self.check()?;
        Ok(!self.stale_email_check && self.user_by_email(email).is_some())
    }

    async fn create_user(
        &self,
        payload: &SignupPayload,
        password_hash: &str,
    ) -> Result<Uuid, sqlx::Error> {
        self.check()?;
        let mut users = self.users.lock().unwrap();
        let email = payload.email.trim();
        if users.values().any(|u| u.email == email) {
            return Err(sqlx::Error::Database(Box::new(UniqueViolation("users_email_key"))));
        }
        let mut user = test_user(email, password_hash);
        user.username = payload.username.trim().to_string();
        let id = user.id;
        users.insert(id, user);
        Ok(id)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        self.check()?;
        Ok(self.user_by_email(email))
    }

    async fn find_public_user_by_id(
        &self,
        user_id: Uuid,
    ) -> Result<Option<PublicUser>, sqlx::Error> {
        self.check()?;
        Ok(self.user(user_id).as_ref().map(PublicUser::from))
    }

    async fn store_token(
        &self,
        user_id: Uuid,
        purpose: TokenPurpose,
        token_hash: &str,
        expires_at: OffsetDateTime,
    ) -> Result<(), sqlx::Error> {
        self.check()?;
        let mut users = self.users.lock().unwrap();
        let user = users.get_mut(&user_id).ok_or(sqlx::Error::RowNotFound)?;
        match purpose {
            TokenPurpose::EmailVerification => {
                user.verify_token = Some(token_hash.to_string());
                user.verify_token_expiry = Some(expires_at);
            }
            TokenPurpose::PasswordReset => {
                user.forgot_password_token = Some(token_hash.to_string());
                user.forgot_password_token_expiry = Some(expires_at);
            }
        }
        Ok(())
    }

    async fn find_user_by_verify_token(
        &self,
        token_hash: &str,
        now: OffsetDateTime,
    ) -> Result<Option<User>, sqlx::Error> {
        self.token_lookups.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|u| {
                u.verify_token.as_deref() == Some(token_hash)
                    && u.verify_token_expiry.is_some_and(|exp| exp > now)
            })
            .cloned())
    }

    async fn find_user_by_verified_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        self.token_lookups.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.verified_token.as_deref() == Some(token_hash))
            .cloned())
    }

    async fn complete_email_verification(
        &self,
        user_id: Uuid,
        token_hash: &str,
        now: OffsetDateTime,
    ) -> Result<bool, sqlx::Error> {
        self.check()?;
        let mut users = self.users.lock().unwrap();
        let Some(user) = users.get_mut(&user_id) else {
            return Ok(false);
        };
        let pending = user.verify_token.as_deref() == Some(token_hash)
            && user.verify_token_expiry.is_some_and(|exp| exp > now)
            && !user.is_verified;
        if !pending {
            return Ok(false);
        }
        user.is_verified = true;
        user.verify_token = None;
        user.verify_token_expiry = None;
        user.verified_token = Some(token_hash.to_string());
        Ok(true)
    }

    async fn reset_password_with_token(
        &self,
        token_hash: &str,
        password_hash: &str,
        now: OffsetDateTime,
    ) -> Result<Option<Uuid>, sqlx::Error> {
        self.check()?;
        let mut users = self.users.lock().unwrap();
        let user = users.values_mut().find(|u| {
            u.forgot_password_token.as_deref() == Some(token_hash)
                && u.forgot_password_token_expiry.is_some_and(|exp| exp > now)
        });
        Ok(user.map(|user| {
            user.password_hash = password_hash.to_string();
            user.forgot_password_token = None;
            user.forgot_password_token_expiry = None;
            user.id
        }))
    }

    async fn ping(&self) -> Result<(), sqlx::Error> {
        self.check()
    }
}

#[async_trait]
impl NoteRepository for MockDb {
    async fn list_notes(&self) -> Result<Vec<Note>, sqlx::Error> {
        self.check()?;
        let mut notes: Vec<Note> = self.notes.lock().unwrap().values().cloned().collect();
        notes.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(notes)
    }

    async fn find_note(&self, id: i64) -> Result<Option<Note>, sqlx::Error> {
        self.check()?;
        Ok(self.notes.lock().unwrap().get(&id).cloned())
    }

    async fn create_note(&self, note: &NewNote) -> Result<i64, sqlx::Error> {
        self.check()?;
        let mut notes = self.notes.lock().unwrap();
        let id = notes.keys().next_back().copied().unwrap_or(0) + 1;
        notes.insert(
            id,
            Note {
                id,
                title: note.title.clone(),
                description: note.description.clone(),
                category: note.category.clone(),
                priority: note.priority.clone(),
                created_at: note.created_at,
            },
        );
        Ok(id)
    }

    async fn update_note(&self, id: i64, note: &NewNote) -> Result<Option<Note>, sqlx::Error> {
        self.check()?;
        let mut notes = self.notes.lock().unwrap();
        Ok(notes.get_mut(&id).map(|existing| {
            existing.title = note.title.clone();
            existing.description = note.description.clone();
            existing.category = note.category.clone();
            existing.priority = note.priority.clone();
            existing.created_at = note.created_at;
            existing.clone()
        }))
    }

    async fn delete_note(&self, id: i64) -> Result<bool, sqlx::Error> {
        self.check()?;
        Ok(self.notes.lock().unwrap().remove(&id).is_some())
    }
}
