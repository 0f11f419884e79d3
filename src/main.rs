mod db;
mod middleware;
mod models;
mod routes;
mod utils;

use actix_cors::Cors;
use actix_web::{http, web, App, HttpServer};
use std::env;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let db = db::establish_connection()
        .await
        .expect("Failed to connect to database");
    info!("Database connected");

    let addr = env::var("SERVER_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
    info!("Starting server on http://{}", addr);

    HttpServer::new(move || {
        // Origines du frontend React autorisées, cookies de session compris
        let cors = Cors::default()
            .allowed_origin("http://localhost:3000")
            .allowed_origin("http://localhost:5173")
            .allowed_origin("http://127.0.0.1:3000")
            .allowed_origin("http://127.0.0.1:5173")
            .allowed_methods(vec!["GET", "POST", "PATCH", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                http::header::ACCEPT,
                http::header::AUTHORIZATION,
                http::header::CONTENT_TYPE,
            ])
            .allowed_header("X-CSRF-Token")
            .supports_credentials();

        App::new()
            .wrap(cors)
            .app_data(web::Data::new(db.clone()))
            .configure(routes::configure_routes)
    })
    .bind(addr)?
    .run()
    .await
}
