use std::io;
use std::sync::Arc;

use storefront::application::checkout_service::CheckoutSettings;
use storefront::config::Config;
use storefront::infrastructure::stripe::StripeGateway;
use storefront::session::SessionSettings;
use storefront::{build_server, create_pool, run_migrations, Services};

#[actix_web::main]
async fn main() -> io::Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env().map_err(io::Error::other)?;

    let pool = create_pool(&config.database_url).map_err(io::Error::other)?;
    run_migrations(&pool).map_err(io::Error::other)?;

    let gateway = StripeGateway::new(&config.stripe).map_err(io::Error::other)?;
    let settings = CheckoutSettings {
        public_base_url: config.public_base_url.clone(),
        item_name: config.checkout_item_name.clone(),
    };
    let services = Services::postgres(pool, Arc::new(gateway), settings);

    let secure = config.public_base_url.starts_with("https://");
    let sessions = SessionSettings::new(
        config.session_secret.as_deref(),
        secure,
        config.session_ttl_secs,
    )
        .map_err(|e| io::Error::other(e.to_string()))?;

    log::info!("Starting server at http://{}:{}", config.host, config.port);

    build_server(services, sessions, &config.host, config.port)?.await
}
