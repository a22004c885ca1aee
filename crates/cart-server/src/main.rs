//! # cart-sync-dev
//!
//! Development storefront for the cart-sync engine.
//!
//! ## Usage
//!
//! ```bash
//! # Optional environment variables
//! export HOST=127.0.0.1
//! export PORT=8080
//! export CATALOG_PATH=config/catalog.toml
//!
//! # Run the server
//! cart-sync-dev
//! ```

use cart_server::{routes, AppConfig, AppState};
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    print_banner();

    let config = AppConfig::from_env();
    let addr = config.socket_addr()?;
    let state = AppState::new(config)?;
    let is_prod = state.config.is_production();

    info!("Environment: {}", state.config.environment);
    info!("Products loaded: {}", state.catalog.products.len());

    let app = routes::create_router(state);

    info!("Storefront starting on http://{}", addr);

    if !is_prod {
        info!("Health: http://{}/health", addr);
        info!("Cart: http://{}/api/v1/cart", addr);
        info!("Payment hook: POST http://{}/api/v1/payments/{{id}}/status", addr);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
  cart-sync dev storefront
  ━━━━━━━━━━━━━━━━━━━━━━━━
  Version: {}

"#,
        env!("CARGO_PKG_VERSION")
    );
}
