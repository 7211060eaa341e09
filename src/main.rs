use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::response::IntoResponse;
use sqlx::PgPool;
use tokio::{net::TcpListener, signal};
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use todo_notes_backend::{
    build_router,
    config::{Config, LogFormat},
    cors_layer,
    db::{
        note_repository::NoteRepository, postgres_note_repository::PostgresNoteRepository,
        postgres_user_repository::PostgresUserRepository, user_repository::UserRepository,
    },
    responses::JsonResponse,
    routes,
    services::smtp_mailer::{Mailer, SmtpMailer},
    utils::jwt::SessionKeys,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("invalid configuration")?;
    init_logging(config.log_format);

    let session_keys = SessionKeys::from_env(&config.jwt_issuer, &config.jwt_audience)
        .context("invalid JWT_SECRET")?;

    let pool = establish_connection(&config.database_url).await?;
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("failed to run migrations")?;

    let mailer = SmtpMailer::new(&config.smtp, &config.base_url)
        .map_err(|e| anyhow::anyhow!("failed to initialize mailer: {e}"))?;

    let state = AppState {
        db: Arc::new(PostgresUserRepository { pool: pool.clone() }) as Arc<dyn UserRepository>,
        note_repo: Arc::new(PostgresNoteRepository { pool: pool.clone() })
            as Arc<dyn NoteRepository>,
        mailer: Arc::new(mailer) as Arc<dyn Mailer>,
        config: Arc::new(config.clone()),
        session_keys: Arc::new(session_keys),
    };

    // Stricter limiter for the account endpoints
    let auth_governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(config.rate_limit_auth_seconds)
            .burst_size(config.rate_limit_auth_burst)
            .use_headers()
            .error_handler(|_err| {
                JsonResponse::too_many_requests(
                    "Too many requests. Please wait a moment and try again.",
                )
                .into_response()
            })
            .finish()
            .context("invalid rate limiter settings")?,
    );

    let governor_limiter = auth_governor_conf.limiter().clone();
    std::thread::spawn(move || loop {
        std::thread::sleep(Duration::from_secs(60));
        governor_limiter.retain_recent();
    });

    let cors = cors_layer(&config.frontend_origin).context("invalid FRONTEND_ORIGIN")?;

    let users = routes::users::router().layer(GovernorLayer {
        config: auth_governor_conf,
    });
    let app = build_router(state, users).layer(cors);

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    pool.close().await;
    info!("shutdown complete");
    Ok(())
}

fn init_logging(format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().flatten_event(true).with_current_span(false))
            .init(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer())
            .init(),
    }
}

/// Connects to the database and verifies the connection.
async fn establish_connection(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPool::connect(database_url)
        .await
        .context("failed to connect to the database")?;

    sqlx::query("SELECT 1")
        .execute(&pool)
        .await
        .context("failed to verify database connection")?;

    info!("connected to the database");
    Ok(pool)
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
