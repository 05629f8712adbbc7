mod config;
mod error;
mod inference;
mod render;
mod routes;
mod storage;
#[cfg(test)]
mod test_support;

use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{App, HttpServer, web};
use config::AppConfig;
use inference::{Predictor, Preprocessor, load_classifier};
use routes::{UploadLimit, configure_routes};
use std::env;
use storage::{ImageStore, ReportStore};

fn startup_error(context: &str, err: impl std::fmt::Display) -> std::io::Error {
    log::error!("{}: {}", context, err);
    std::io::Error::other(format!("{}: {}", context, err))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    if let Ok(current_dir) = env::current_dir() {
        log::info!("Current working directory: {}", current_dir.display());
    } else {
        log::error!("Failed to get the current working directory.");
    }

    let config = AppConfig::load().map_err(|e| startup_error("Invalid configuration", e))?;

    let images = ImageStore::open(config.images_dir())
        .map_err(|e| startup_error("Failed to open image directory", e))?;
    let reports = ReportStore::open(config.reports_dir())
        .map_err(|e| startup_error("Failed to open report directory", e))?;
    log::info!(
        "Data directory {} ({} images indexed)",
        config.storage.data_dir.display(),
        images.len()
    );

    let predictor = Predictor::new(
        load_classifier(&config.model),
        Preprocessor::from(&config.image),
    );
    if !predictor.is_loaded() {
        log::warn!("Starting without a model; /predict will answer 503");
    }

    let images = web::Data::new(images);
    let reports = web::Data::new(reports);
    let predictor = web::Data::new(predictor);
    let upload_limit = web::Data::new(UploadLimit(config.body_limit_bytes()));

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
            .wrap(Logger::default())
            .app_data(images.clone())
            .app_data(reports.clone())
            .app_data(predictor.clone())
            .app_data(upload_limit.clone())
            .configure(configure_routes)
    })
    .bind(&bind_address)?
    .run()
    .await
}
