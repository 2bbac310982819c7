use actix_cors::Cors;
use actix_web::{http::header, middleware, web, App, HttpServer};
use std::sync::Arc;

use todo_api::{
    config::Config,
    mail::mailer_from_config,
    routes,
    state::{AppState, Settings},
    store::PgStore,
};

fn cors(origins: &[String]) -> Cors {
    origins
        .iter()
        .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
        .allowed_methods(vec!["GET", "POST", "PUT", "DELETE"])
        .allowed_headers(vec![
            header::AUTHORIZATION,
            header::ACCEPT,
            header::CONTENT_TYPE,
        ])
        .supports_credentials()
        .max_age(3600)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let store = match PgStore::connect(&config.database_url, config.db_max_connections).await {
        Ok(store) => store,
        Err(e) => {
            log::error!("Failed to connect to database: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = store.migrate().await {
        log::error!("Failed to run migrations: {}", e);
        std::process::exit(1);
    }

    let mailer = match mailer_from_config(&config.mail) {
        Ok(mailer) => mailer,
        Err(e) => {
            log::error!("Failed to set up mail delivery: {}", e);
            std::process::exit(1);
        }
    };

    let store = Arc::new(store);
    let state = web::Data::new(AppState::new(
        store.clone(),
        store,
        Arc::from(mailer),
        Settings::from_config(&config),
    ));

    log::info!("Starting To-Do API at {}", config.server_url());
    let origins = config.cors_origins.clone();
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(middleware::NormalizePath::trim())
            .wrap(cors(&origins))
            .wrap(middleware::Logger::default())
            .configure(routes::config)
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .run()
    .await
}
