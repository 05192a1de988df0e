use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use std::io;

use auth_service::{
    config::Config,
    db::{create_pool, otp_repo, run_migrations},
    handlers, metrics,
    services::{
        auth::AuthService, email::EmailService, oauth::GoogleOauth, otp_issuer::OtpIssuer,
        tokens::TokenService,
    },
    telemetry, AppState,
};

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenvy::dotenv().ok();

    telemetry::init_tracing();

    let config = Config::from_env().expect("Failed to load configuration");

    tracing::info!("Starting auth-service v{}", env!("CARGO_PKG_VERSION"));

    metrics::init_metrics();

    // Database pool
    let db_pool = create_pool(&config.database.url, config.database.max_connections)
        .await
        .expect("Failed to create database pool");

    tracing::info!(
        "Database pool created with {} max connections",
        config.database.max_connections
    );

    // Run migrations unless explicitly skipped
    let run_migrations_env = std::env::var("RUN_MIGRATIONS").unwrap_or_else(|_| "true".into());
    if run_migrations_env != "false" {
        run_migrations(&db_pool)
            .await
            .expect("Failed to run database migrations");
        tracing::info!("Database migrations completed");
    } else {
        tracing::info!("Skipping database migrations (RUN_MIGRATIONS=false)");
    }

    // Redis connection manager
    let redis_client =
        redis::Client::open(config.redis.url.as_str()).expect("Failed to create Redis client");
    let redis_manager = redis_client
        .get_connection_manager()
        .await
        .expect("Failed to create Redis connection manager");

    tracing::info!("Redis connection established");

    // Email service (no-op mode when SMTP is unconfigured)
    let email_service = EmailService::new(&config.email).expect("Failed to initialize email service");
    if email_service.is_enabled() {
        tracing::info!("Email service initialized with SMTP");
    } else {
        tracing::info!("Email service running in no-op mode (SMTP not configured)");
    }

    // Google OAuth (optional)
    let google_oauth = GoogleOauth::from_config(&config.oauth, redis_manager.clone());
    if google_oauth.is_some() {
        tracing::info!("Google OAuth sign-in enabled");
    } else {
        tracing::info!("Google OAuth not configured; sign-in endpoints answer 503");
    }

    let otp_issuer = OtpIssuer::new(db_pool.clone(), redis_manager.clone(), config.otp.clone());
    let token_service = TokenService::new(db_pool.clone(), config.jwt.clone());
    let auth = AuthService::new(
        db_pool.clone(),
        otp_issuer,
        token_service,
        email_service,
        google_oauth,
    );

    let state = AppState {
        db: db_pool.clone(),
        redis: redis_manager,
        auth,
    };

    // Background: sweep expired verification and reset codes
    {
        let pool = db_pool.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_secs(300));
            loop {
                interval.tick().await;
                match otp_repo::delete_expired(&pool).await {
                    Ok(removed) if removed > 0 => {
                        tracing::info!("expired otp cleanup removed: {}", removed);
                    }
                    Ok(_) => {}
                    Err(e) => tracing::warn!("expired otp cleanup failed: {}", e),
                }
            }
        });
    }

    let server_config = config.server.clone();
    let bind_address = format!("{}:{}", config.server.host, config.server.port);

    tracing::info!("Starting HTTP server at {}", bind_address);

    HttpServer::new(move || {
        let mut cors = Cors::default();
        for origin in server_config.cors_allowed_origins.split(',') {
            let origin = origin.trim();
            if origin == "*" {
                cors = cors.allow_any_origin();
            } else {
                cors = cors.allowed_origin(origin);
            }
        }
        cors = cors.allow_any_method().allow_any_header().max_age(3600);

        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(cors)
            .wrap(Logger::default())
            .route("/health", web::get().to(handlers::health_check))
            .route("/health/ready", web::get().to(handlers::readiness_check))
            .route("/metrics", web::get().to(metrics::metrics_handler))
            .service(
                web::scope("/api/v1/auth")
                    .route("/register", web::post().to(handlers::register))
                    .route("/verification", web::post().to(handlers::verify_email))
                    .route(
                        "/verification/resend",
                        web::post().to(handlers::resend_verification),
                    )
                    .route("/token", web::post().to(handlers::login))
                    .route("/token/refresh", web::post().to(handlers::refresh_token))
                    .route("/me", web::get().to(handlers::me))
                    .route("/logout", web::post().to(handlers::logout))
                    .route("/logout/all", web::post().to(handlers::logout_all))
                    .route(
                        "/passwords/reset",
                        web::post().to(handlers::request_password_reset),
                    )
                    .route(
                        "/passwords/reset/verify",
                        web::post().to(handlers::verify_password_reset),
                    )
                    .route(
                        "/passwords/reset/complete",
                        web::post().to(handlers::complete_password_reset),
                    )
                    .route(
                        "/passwords/change",
                        web::post().to(handlers::change_password),
                    )
                    .route("/google", web::get().to(handlers::google_login))
                    .route("/google/callback", web::get().to(handlers::google_callback)),
            )
    })
    .bind(&bind_address)?
    .workers(4)
    .run()
    .await
}
