mod application;
mod data;
mod domain;
mod infrastructure;
mod presentation;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::middleware::{DefaultHeaders, Logger};
use actix_web::{App, HttpServer, web};

use crate::application::feed_service::FeedService;
use crate::data::feed_store::FsFeedStore;
use crate::infrastructure::classifier::HttpImageClassifier;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::logging::init_logging;
use crate::presentation::handlers;
use crate::presentation::middleware::RequestTraceMiddleware;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    init_logging();

    let config = AppConfig::from_env().expect("invalid configuration");
    let store = FsFeedStore::open(config.upload_dir.clone())
        .expect("failed to prepare upload directory");
    let classifier = HttpImageClassifier::new(config.classifier_url.clone());

    let feed_service = FeedService::new(Arc::new(store), Arc::new(classifier));

    let config_data = config.clone();

    HttpServer::new(move || {
        let cors = build_cors(&config_data);
        App::new()
            .wrap(Logger::default())
            .wrap(RequestTraceMiddleware)
            .wrap(
                DefaultHeaders::new()
                    .add(("X-Content-Type-Options", "nosniff"))
                    .add(("Referrer-Policy", "no-referrer")),
            )
            .wrap(cors)
            .app_data(web::Data::new(feed_service.clone()))
            .service(handlers::feed::scope())
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}

fn build_cors(config: &AppConfig) -> Cors {
    let mut cors = Cors::default()
        .allowed_methods(vec!["GET", "POST"])
        .allowed_headers(vec![actix_web::http::header::CONTENT_TYPE])
        .max_age(3600);

    for origin in &config.cors_origins {
        if origin == "*" {
            cors = cors.allow_any_origin();
        } else {
            cors = cors.allowed_origin(origin);
        }
    }

    cors
}
