use actix_cors::Cors;
use actix_web::{App, HttpServer, web};
use backend::config::AppConfig;
use backend::recognition::{OAuthCredentialProvider, ReqwestTransport};
use backend::routes::configure_routes;
use std::env;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    if let Ok(current_dir) = env::current_dir() {
        log::info!("Current working directory: {}", current_dir.display());
    } else {
        log::error!("Failed to get the current working directory.");
    }

    let config = AppConfig::from_env().map_err(|e| {
        log::error!("Invalid configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    if config.has_credentials() {
        log::info!("Classifier credentials detected");
    } else {
        log::warn!(
            "BAIDU_AI_API_KEY / BAIDU_AI_SECRET_KEY not set; recognition requests will fail until configured."
        );
    }

    let recognizer = config.build_recognizer().map_err(|e| {
        log::error!("Failed to build recognition pipeline: {}", e);
        std::io::Error::other(e.to_string())
    })?;
    let recognizer = web::Data::new(recognizer);

    let bind_address = config.bind_address();
    log::info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::AUTHORIZATION,
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .max_age(3600),
            )
            .app_data(recognizer.clone())
            .configure(
                configure_routes::<ReqwestTransport, OAuthCredentialProvider<ReqwestTransport>>,
            )
    })
    .bind(&bind_address)?
    .run()
    .await
}
