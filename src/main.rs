use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use bazaar_auth_server::auth::handlers::{
    forgot_password, logged_in_seller, logged_in_user, login_seller, login_user, refresh_token,
    reset_password, seller_registration, user_registration, verify_forgot_password, verify_seller,
    verify_user,
};
use bazaar_auth_server::{health_check, AppError, AppState, Settings};
use dotenv::dotenv;
use std::net::TcpListener;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[actix_web::main]
async fn main() -> bazaar_auth_server::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();

    // Load configuration
    let config = Settings::new()?;
    info!("Configuration loaded successfully");

    info!(
        "Starting auth service at {}:{}",
        config.server.host, config.server.port
    );

    // Initialize application state
    let state = AppState::new(config.clone()).await?;
    let state = web::Data::new(state);

    // Create and bind TCP listener
    let listener = TcpListener::bind(format!("{}:{}", config.server.host, config.server.port))?;

    // Start HTTP server
    HttpServer::new(move || {
        let cors = if config.cors.enabled {
            let cors_config = Cors::default();

            // Apply specific CORS rules based on configuration
            let cors_config = if config.cors.allow_any_origin {
                cors_config
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .expose_any_header()
            } else {
                // More restrictive CORS for production use
                cors_config
                    .allowed_origin("http://localhost:3000")
                    .allowed_origin("http://localhost:3001")
                    .allowed_methods(vec!["GET", "POST"])
                    .allowed_headers(vec!["Authorization", "Content-Type"])
                    .supports_credentials()
            };

            // Set max age
            cors_config.max_age(config.cors.max_age as usize)
        } else {
            // CORS disabled - use most restrictive settings
            Cors::default()
        };

        App::new()
            .wrap(cors)
            .app_data(state.clone())
            .route("/health", web::get().to(health_check))
            .service(
                web::scope("/api")
                    .route("/user-registration", web::post().to(user_registration))
                    .route("/verify-user", web::post().to(verify_user))
                    .route("/login-user", web::post().to(login_user))
                    .route("/refresh-token", web::post().to(refresh_token))
                    .route("/logged-in-user", web::get().to(logged_in_user))
                    .route("/forgot-password-user", web::post().to(forgot_password))
                    .route(
                        "/verify-forgot-password-user",
                        web::post().to(verify_forgot_password),
                    )
                    .route("/reset-password-user", web::post().to(reset_password))
                    .route("/seller-registration", web::post().to(seller_registration))
                    .route("/verify-seller", web::post().to(verify_seller))
                    .route("/login-seller", web::post().to(login_seller))
                    .route("/logged-in-seller", web::get().to(logged_in_seller)),
            )
    })
    .listen(listener)?
    .workers(config.server.workers as usize)
    .run()
    .await
    .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(())
}
