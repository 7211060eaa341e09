use crate::{
    db::user_repository::UserRepository,
    models::{
        signup::SignupPayload,
        token::TokenPurpose,
        user::{PublicUser, User},
    },
};
use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

const USER_COLUMNS: &str = r#"
    id,
    username,
    email,
    password_hash,
    is_verified,
    verify_token,
    verify_token_expiry,
    verified_token,
    forgot_password_token,
    forgot_password_token_expiry,
    created_at
"#;

pub struct PostgresUserRepository {
    pub pool: PgPool,
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn is_email_taken(&self, email: &str) -> Result<bool, sqlx::Error> {
        let res: Option<i32> = sqlx::query_scalar("SELECT 1 FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(res.is_some())
    }

    async fn create_user(
        &self,
        payload: &SignupPayload,
        password_hash: &str,
    ) -> Result<Uuid, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            INSERT INTO users (id, username, email, password_hash, is_verified, created_at)
            VALUES ($1, $2, $3, $4, false, $5)
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(payload.username.trim())
        .bind(payload.email.trim())
        .bind(password_hash)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(&self.pool)
        .await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
    }

    async fn find_public_user_by_id(
        &self,
        user_id: Uuid,
    ) -> Result<Option<PublicUser>, sqlx::Error> {
        sqlx::query_as::<_, PublicUser>(
            r#"
            SELECT id,
                   username,
                   email,
                   is_verified,
                   created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn store_token(
        &self,
        user_id: Uuid,
        purpose: TokenPurpose,
        token_hash: &str,
        expires_at: OffsetDateTime,
    ) -> Result<(), sqlx::Error> {
        let sql = match purpose {
            TokenPurpose::EmailVerification => {
                "UPDATE users SET verify_token = $1, verify_token_expiry = $2 WHERE id = $3"
            }
            TokenPurpose::PasswordReset => {
                "UPDATE users SET forgot_password_token = $1, forgot_password_token_expiry = $2 WHERE id = $3"
            }
        };

        let result = sqlx::query(sql)
            .bind(token_hash)
            .bind(expires_at)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }
        Ok(())
    }

    async fn find_user_by_verify_token(
        &self,
        token_hash: &str,
        now: OffsetDateTime,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE verify_token = $1 AND verify_token_expiry > $2"
        ))
        .bind(token_hash)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
    }

    async fn find_user_by_verified_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE verified_token = $1"
        ))
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
    }

    async fn complete_email_verification(
        &self,
        user_id: Uuid,
        token_hash: &str,
        now: OffsetDateTime,
    ) -> Result<bool, sqlx::Error> {
        let rec: Option<Uuid> = sqlx::query_scalar(
            r#"
            UPDATE users
            SET is_verified = true,
                verify_token = NULL,
                verify_token_expiry = NULL,
                verified_token = $2
            WHERE id = $1
              AND verify_token = $2
              AND verify_token_expiry > $3
              AND is_verified = false
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(token_hash)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(rec.is_some())
    }

    async fn reset_password_with_token(
        &self,
        token_hash: &str,
        password_hash: &str,
        now: OffsetDateTime,
    ) -> Result<Option<Uuid>, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            UPDATE users
            SET password_hash = $1,
                forgot_password_token = NULL,
                forgot_password_token_expiry = NULL
            WHERE forgot_password_token = $2
              AND forgot_password_token_expiry > $3
            RETURNING id
            "#,
        )
        .bind(password_hash)
        .bind(token_hash)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
    }

    async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
