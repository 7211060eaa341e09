use thiserror::Error;
use time::OffsetDateTime;

use crate::db::user_repository::UserRepository;
use crate::services::tokens::hash_token;

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("Invalid or missing token")]
    InvalidInput,
    #[error("Invalid or expired token")]
    InvalidOrExpiredToken,
    #[error("Email already verified")]
    AlreadyVerified,
    #[error("No verification token found")]
    NoPendingToken,
    #[error("storage unavailable: {0}")]
    Storage(#[from] sqlx::Error),
}

/// Consumes an email-verification token.
///
/// The final write is a single conditional update, so two requests racing
/// on the same token cannot both succeed; the loser is told the address is
/// already verified.
pub async fn verify_email_token(
    repo: &dyn UserRepository,
    presented: &str,
    now: OffsetDateTime,
) -> Result<(), VerifyError> {
    let presented = presented.trim();
    if presented.is_empty() {
        return Err(VerifyError::InvalidInput);
    }
    let token_hash = hash_token(presented);

    let Some(user) = repo.find_user_by_verify_token(&token_hash, now).await? else {
        return Err(consumed_or_invalid(repo, &token_hash).await?);
    };

    if user.is_verified {
        return Err(VerifyError::AlreadyVerified);
    }
    if !user.has_pending_verification() {
        return Err(VerifyError::NoPendingToken);
    }

    if !repo
        .complete_email_verification(user.id, &token_hash, now)
        .await?
    {
        tracing::info!(user_id = %user.id, "verification lost a race on the same token");
        return Err(consumed_or_invalid(repo, &token_hash).await?);
    }

    tracing::info!(user_id = %user.id, "email verified");
    Ok(())
}

async fn consumed_or_invalid(
    repo: &dyn UserRepository,
    token_hash: &str,
) -> Result<VerifyError, sqlx::Error> {
    Ok(match repo.find_user_by_verified_token(token_hash).await? {
        Some(_) => VerifyError::AlreadyVerified,
        None => VerifyError::InvalidOrExpiredToken,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    use time::Duration;
    use uuid::Uuid;

    use super::*;
    use crate::db::mock_db::{test_user, MockDb};
    use crate::models::token::TokenPurpose;
    use crate::services::tokens::issue_token;

    async fn db_with_token(now: OffsetDateTime) -> (MockDb, Uuid, String) {
        let user = test_user("verify@example.com", "hash");
        let user_id = user.id;
        let db = MockDb::with_user(user);
        let token = issue_token(&db, user_id, TokenPurpose::EmailVerification, now)
            .await
            .unwrap();
        (db, user_id, token)
    }

    #[tokio::test]
    async fn verifies_once_then_reports_already_verified() {
        let t0 = OffsetDateTime::now_utc();
        let (db, user_id, token) = db_with_token(t0).await;

        verify_email_token(&db, &token, t0 + Duration::seconds(10))
            .await
            .expect("first verification should succeed");

        let user = db.user(user_id).unwrap();
        assert!(user.is_verified);
        assert!(user.verify_token.is_none());
        assert!(user.verify_token_expiry.is_none());

        let second = verify_email_token(&db, &token, t0 + Duration::seconds(20)).await;
        assert!(matches!(second, Err(VerifyError::AlreadyVerified)));
    }

    #[tokio::test]
    async fn expired_token_is_rejected_even_when_value_matches() {
        let t0 = OffsetDateTime::now_utc();
        let (db, user_id, token) = db_with_token(t0).await;

        let result = verify_email_token(&db, &token, t0 + Duration::seconds(3601)).await;
        assert!(matches!(result, Err(VerifyError::InvalidOrExpiredToken)));
        assert!(!db.user(user_id).unwrap().is_verified);
    }

    #[tokio::test]
    async fn token_is_dead_at_exact_expiry() {
        let t0 = OffsetDateTime::now_utc();
        let (db, _, token) = db_with_token(t0).await;

        let result = verify_email_token(&db, &token, t0 + Duration::seconds(3600)).await;
        assert!(matches!(result, Err(VerifyError::InvalidOrExpiredToken)));
    }

    #[tokio::test]
    async fn unknown_token_is_rejected() {
        let t0 = OffsetDateTime::now_utc();
        let (db, _, _) = db_with_token(t0).await;

        let result = verify_email_token(&db, "not-a-real-token", t0).await;
        assert!(matches!(result, Err(VerifyError::InvalidOrExpiredToken)));
    }

    #[tokio::test]
    async fn empty_token_fails_before_any_lookup() {
        let db = MockDb::default();

        for token in ["", "   "] {
            let result = verify_email_token(&db, token, OffsetDateTime::now_utc()).await;
            assert!(matches!(result, Err(VerifyError::InvalidInput)));
        }
        assert_eq!(db.token_lookups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn reissued_token_invalidates_the_previous_one() {
        let t0 = OffsetDateTime::now_utc();
        let (db, user_id, old_token) = db_with_token(t0).await;
        let new_token = issue_token(&db, user_id, TokenPurpose::EmailVerification, t0)
            .await
            .unwrap();

        let old = verify_email_token(&db, &old_token, t0).await;
        assert!(matches!(old, Err(VerifyError::InvalidOrExpiredToken)));

        verify_email_token(&db, &new_token, t0).await.unwrap();
        assert!(db.user(user_id).unwrap().is_verified);
    }

    #[tokio::test]
    async fn inconsistent_verified_record_reports_already_verified() {
        let t0 = OffsetDateTime::now_utc();
        let mut user = test_user("odd@example.com", "hash");
        user.is_verified = true;
        user.verify_token = Some(hash_token("stale"));
        user.verify_token_expiry = Some(t0 + Duration::hours(1));
        let db = MockDb::with_user(user);

        let result = verify_email_token(&db, "stale", t0).await;
        assert!(matches!(result, Err(VerifyError::AlreadyVerified)));
    }

    #[tokio::test]
    async fn storage_failure_is_surfaced() {
        let db = MockDb::failing();
        let result = verify_email_token(&db, "token", OffsetDateTime::now_utc()).await;
        assert!(matches!(result, Err(VerifyError::Storage(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_verifications_succeed_exactly_once() {
        let t0 = OffsetDateTime::now_utc();
        let (db, user_id, token) = db_with_token(t0).await;
        let db = Arc::new(db);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let db = db.clone();
                let token = token.clone();
                tokio::spawn(async move { verify_email_token(&*db, &token, t0).await })
            })
            .collect();

        let mut successes = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(()) => successes += 1,
                Err(VerifyError::AlreadyVerified) => {}
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }

        assert_eq!(successes, 1);
        assert!(db.user(user_id).unwrap().is_verified);
    }
}
