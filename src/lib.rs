pub mod application;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;
pub mod schema;

use actix_web::{middleware::Logger, web, App, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use application::{DynOrderService, OrderService};
use domain::OrderRepository;
use handlers::ApiDoc;
use infrastructure::DieselOrderRepository;

pub use config::Config;
pub use db::{create_pool, DbPool};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub type MigrationError = Box<dyn std::error::Error + Send + Sync>;

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) -> Result<(), MigrationError> {
    let mut conn = pool.get()?;
    conn.run_pending_migrations(MIGRATIONS)?;
    Ok(())
}

/// Registers the HTTP routes. The `DynOrderService` must already be
/// available as app data.
pub fn configure(cfg: &mut web::ServiceConfig) {
    handlers::orders::routes(cfg);
}

/// Build and return an actix-web `Server` bound to the configured address,
/// backed by the Postgres store behind `pool`.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server.
pub fn build_server(pool: DbPool, config: &Config) -> std::io::Result<actix_web::dev::Server> {
    let repo: Box<dyn OrderRepository> = Box::new(DieselOrderRepository::new(pool));
    let service: DynOrderService = OrderService::new(repo);
    let service = web::Data::new(service);
    let cors = config.cors.clone();

    Ok(HttpServer::new(move || {
        App::new()
            .app_data(service.clone())
            .wrap(cors.middleware())
            .wrap(Logger::default())
            .configure(configure)
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", ApiDoc::openapi()),
            )
    })
    .bind((config.host.clone(), config.port))?
    .run())
}
