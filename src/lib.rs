pub mod application;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;
pub mod schema;
pub mod session;
pub mod views;

use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

use application::account_service::AccountService;
use application::cart_service::CartService;
use application::catalog_service::CatalogService;
use application::checkout_service::{CheckoutService, CheckoutSettings};
use application::favourite_service::FavouriteService;
use domain::errors::DomainError;
use domain::ports::PaymentGateway;
use infrastructure::account_repo::DieselAccountRepository;
use infrastructure::cart_repo::DieselCartRepository;
use infrastructure::catalog_repo::DieselCatalogRepository;
use infrastructure::favourite_repo::DieselFavouriteRepository;
use infrastructure::memory::InMemoryStore;
use session::SessionSettings;

pub use db::{create_pool, DbPool};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) -> Result<(), DomainError> {
    let mut conn = pool.get()?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| DomainError::Internal(format!("migrations failed: {e}")))?;
    Ok(())
}

/// Every application service the handlers reach, shared across workers.
#[derive(Clone)]
pub struct Services {
    pub catalog: CatalogService,
    pub accounts: AccountService,
    pub favourites: FavouriteService,
    pub cart: CartService,
    pub checkout: CheckoutService,
}

impl Services {
    /// Services backed by PostgreSQL.
    pub fn postgres(
        pool: DbPool,
        gateway: Arc<dyn PaymentGateway>,
        settings: CheckoutSettings,
    ) -> Self {
        let catalog = Arc::new(DieselCatalogRepository::new(pool.clone()));
        let favourites = Arc::new(DieselFavouriteRepository::new(pool.clone()));
        let accounts = Arc::new(DieselAccountRepository::new(pool.clone()));
        let carts = Arc::new(DieselCartRepository::new(pool));

        let cart = CartService::new(carts);
        Self {
            catalog: CatalogService::new(catalog.clone(), favourites.clone()),
            accounts: AccountService::new(accounts),
            favourites: FavouriteService::new(favourites, catalog),
            checkout: CheckoutService::new(cart.clone(), gateway, settings),
            cart,
        }
    }

    /// Services backed by one shared in-memory store.
    pub fn in_memory(
        store: Arc<InMemoryStore>,
        gateway: Arc<dyn PaymentGateway>,
        settings: CheckoutSettings,
    ) -> Self {
        let cart = CartService::new(store.clone());
        Self {
            catalog: CatalogService::new(store.clone(), store.clone()),
            accounts: AccountService::new(store.clone()),
            favourites: FavouriteService::new(store.clone(), store),
            checkout: CheckoutService::new(cart.clone(), gateway, settings),
            cart,
        }
    }
}

/// Registers every storefront route.
pub fn configure_app(cfg: &mut web::ServiceConfig) {
    use handlers::{auth, cart, catalog, checkout, favourites};

    cfg.route("/", web::get().to(catalog::home))
        .route("/category/{slug}", web::get().to(catalog::category))
        .route("/product/{slug}", web::get().to(catalog::product_detail))
        .route("/review/{product_id}", web::post().to(catalog::save_review))
        .route("/login_registration", web::get().to(auth::login_registration))
        .route("/login", web::post().to(auth::login))
        .route("/register", web::post().to(auth::register))
        .route("/logout", web::get().to(auth::logout))
        .route("/favourite/{slug}", web::get().to(favourites::toggle_favourite))
        .route("/favourites", web::get().to(favourites::favourites))
        .route("/cart", web::get().to(cart::cart))
        .route("/to_cart/{product_id}/{action}", web::get().to(cart::to_cart))
        .route("/checkout", web::get().to(checkout::checkout))
        .route("/checkout/session", web::post().to(checkout::create_checkout_session))
        .route("/payment/success", web::get().to(checkout::payment_success))
        .route("/api-docs/openapi.json", web::get().to(handlers::openapi_json));
}

/// Build and return an actix-web `Server` bound to `host:port`.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server.
pub fn build_server(
    services: Services,
    sessions: SessionSettings,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    let services = web::Data::new(services);
    let sessions = web::Data::new(sessions);
    Ok(HttpServer::new(move || {
        App::new()
            .app_data(services.clone())
            .app_data(sessions.clone())
            .wrap(sessions.flash_framework())
            .wrap(sessions.session_middleware())
            .wrap(Logger::default())
            .configure(configure_app)
    })
    .bind((host.to_string(), port))?
    .run())
}
