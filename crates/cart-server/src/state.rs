//! # Application State
//!
//! Shared state for the Axum application.
//! Contains configuration, the catalog and the in-memory storefront backend.

use crate::store::MemoryStore;
use cart_core::{DiscountKind, Product, ProductCatalog};
use serde::Deserialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Environment (development, staging, production)
    pub environment: String,
    /// Explicit catalog file; the default locations are searched when unset
    pub catalog_path: Option<String>,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source, falling back to defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            host: lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            environment: lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
            catalog_path: lookup("CATALOG_PATH"),
        }
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid socket address {}:{}: {}", self.host, self.port, e))
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// A discount code the storefront accepts
#[derive(Debug, Clone, Deserialize)]
pub struct DiscountRule {
    pub code: String,
    #[serde(default)]
    pub kind: DiscountKind,
    /// Minor units for fixed amounts, whole percent for percentages
    pub amount: i64,
    #[serde(default = "default_true")]
    pub active: bool,
    /// Rejection message once the code is inactive
    #[serde(default)]
    pub message: Option<String>,
}

fn default_true() -> bool {
    true
}

/// Contents of `catalog.toml`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub discounts: Vec<DiscountRule>,
}

impl CatalogFile {
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Discount table keyed by upper-cased code
    pub fn discount_table(&self) -> HashMap<String, DiscountRule> {
        self.discounts
            .iter()
            .map(|rule| (rule.code.to_uppercase(), rule.clone()))
            .collect()
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Product catalog
    pub catalog: Arc<ProductCatalog>,
    /// Carts, orders and payments
    pub store: Arc<MemoryStore>,
    /// Application config
    pub config: AppConfig,
}

impl AppState {
    /// Build state from config, loading the catalog from disk
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        let file = load_catalog(config.catalog_path.as_deref())?;
        Ok(Self::with_catalog(config, file))
    }

    /// Build state around an already-parsed catalog
    pub fn with_catalog(config: AppConfig, file: CatalogFile) -> Self {
        let discounts = file.discount_table();
        let catalog = Arc::new(ProductCatalog {
            products: file.products,
        });
        let store = Arc::new(MemoryStore::new(catalog.clone(), discounts));

        Self {
            catalog,
            store,
            config,
        }
    }
}

/// Load the catalog from an explicit path or the default config locations
fn load_catalog(explicit: Option<&str>) -> anyhow::Result<CatalogFile> {
    if let Some(path) = explicit {
        return read_catalog(Path::new(path));
    }

    let config_paths = [
        "config/catalog.toml",
        "../config/catalog.toml",
        "../../config/catalog.toml",
    ];

    for path in config_paths {
        let path = Path::new(path);
        if path.exists() {
            return read_catalog(path);
        }
    }

    // Return empty catalog if no config found
    tracing::warn!("No catalog found, using empty catalog");
    Ok(CatalogFile::default())
}

fn read_catalog(path: &Path) -> anyhow::Result<CatalogFile> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
    let file = CatalogFile::from_toml(&content)
        .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path.display(), e))?;
    tracing::info!(
        "Loaded {} products and {} discount codes from {}",
        file.products.len(),
        file.discounts.len(),
        path.display()
    );
    Ok(file)
}
