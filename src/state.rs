use crate::config::Config;
use crate::db::{note_repository::NoteRepository, user_repository::UserRepository};
use crate::services::smtp_mailer::Mailer;
use crate::utils::jwt::{SessionKeys, SessionKeysProvider};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn UserRepository>,
    pub note_repo: Arc<dyn NoteRepository>,
    pub mailer: Arc<dyn Mailer>,
    pub config: Arc<Config>,
    pub session_keys: Arc<SessionKeys>,
}

impl SessionKeysProvider for AppState {
    fn session_keys(&self) -> &SessionKeys {
        &self.session_keys
    }
}

#[cfg(test)]
pub fn test_config() -> Arc<Config> {
    use crate::config::{LogFormat, SmtpSettings};

    Arc::new(Config {
        database_url: String::new(),
        frontend_origin: "http://localhost".into(),
        base_url: "http://localhost".into(),
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        auth_cookie_secure: true,
        jwt_issuer: "test-issuer".into(),
        jwt_audience: "test-audience".into(),
        smtp: SmtpSettings {
            host: "localhost".into(),
            port: 2525,
            username: None,
            password: None,
            from: "noreply@example.com".into(),
            tls_disabled: true,
        },
        log_format: LogFormat::Text,
        rate_limit_auth_seconds: 1,
        rate_limit_auth_burst: 10,
    })
}

#[cfg(test)]
pub fn test_session_keys(config: &Config) -> Arc<SessionKeys> {
    Arc::new(
        SessionKeys::new(
            "0123456789abcdef0123456789abcdef",
            &config.jwt_issuer,
            &config.jwt_audience,
        )
        .expect("test JWT secret should be valid"),
    )
}

#[cfg(test)]
pub fn test_state(
    db: Arc<crate::db::mock_db::MockDb>,
    mailer: Arc<crate::services::smtp_mailer::MockMailer>,
) -> AppState {
    let config = test_config();
    AppState {
        db: db.clone(),
        note_repo: db,
        mailer,
        session_keys: test_session_keys(&config),
        config,
    }
}
