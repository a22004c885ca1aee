//! # Storefront HTTP Client
//!
//! `reqwest` implementation of the cart, order and payment service traits
//! against the storefront REST API.
//!
//! Error bodies (`{ error, code, details? }`) are mapped onto
//! [`CommerceError`]:
//!
//! | Status | Error |
//! |--------|-------|
//! | 402 | `PaymentDeclined` |
//! | 404 | `ProductNotFound` / `ItemNotInCart` |
//! | 409 | `TotalsMismatch` |
//! | other 4xx | `Rejected` |
//! | 408, 504 | `Timeout` |
//! | 5xx | `ServiceError` |

use crate::config::ClientConfig;
use async_trait::async_trait;
use cart_core::{
    Cart, CartService, CommerceError, CommerceResult, DiscountValidation, OperationId,
    OrderReceipt, OrderRequest, OrderService, OrderStatus, PaymentService, PaymentVerification,
};
use reqwest::{Client, IntoUrl, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument};

const SERVICE_NAME: &str = "storefront";

/// What a 404 means for the call that received it
#[derive(Clone, Copy)]
enum NotFound<'a> {
    Product(&'a str),
    CartItem(&'a str),
    Resource,
}

/// HTTP client for the storefront API
#[derive(Clone)]
pub struct HttpCommerceClient {
    config: ClientConfig,
    client: Client,
}

impl HttpCommerceClient {
    /// Create a client from explicit configuration
    pub fn new(config: ClientConfig) -> CommerceResult<Self> {
        config.validate()?;
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                CommerceError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { config, client })
    }

    /// Create from environment variables
    pub fn from_env() -> CommerceResult<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.authorized(method, self.config.endpoint(path))
    }

    /// Request for `path` followed by `segments`; ids are never spliced
    /// into the path unencoded
    fn resource(&self, method: Method, path: &str, segments: &[&str]) -> CommerceResult<RequestBuilder> {
        Ok(self.authorized(method, self.config.resource_url(path, segments)?))
    }

    fn authorized(&self, method: Method, url: impl IntoUrl) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.config.api_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn mutation(&self, method: Method, path: &str, op: &OperationId) -> RequestBuilder {
        self.request(method, path)
            .header("Idempotency-Key", op.as_str())
    }

    /// Send a request and return the raw body of a successful response
    async fn execute(&self, request: RequestBuilder, not_found: NotFound<'_>) -> CommerceResult<String> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                CommerceError::Timeout(e.to_string())
            } else {
                CommerceError::NetworkError(e.to_string())
            }
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CommerceError::NetworkError(e.to_string()))?;

        if !status.is_success() {
            error!("Storefront API error: status={}, body={}", status, body);
            return Err(map_error(status, &body, not_found));
        }
        Ok(body)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        not_found: NotFound<'_>,
    ) -> CommerceResult<T> {
        let body = self.execute(request, not_found).await?;
        serde_json::from_str(&body).map_err(|e| {
            CommerceError::Serialization(format!("Failed to parse storefront response: {}", e))
        })
    }
}

/// Error body returned by the storefront API
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: String,
    #[serde(default)]
    details: Option<String>,
}

fn map_error(status: StatusCode, body: &str, not_found: NotFound<'_>) -> CommerceError {
    let message = match serde_json::from_str::<ApiErrorResponse>(body) {
        Ok(response) => {
            if let Some(details) = &response.details {
                debug!("Error details: {}", details);
            }
            response.error
        }
        Err(_) => format!("HTTP {}: {}", status, body),
    };

    match status {
        StatusCode::PAYMENT_REQUIRED => CommerceError::PaymentDeclined { reason: message },
        StatusCode::CONFLICT => CommerceError::TotalsMismatch { message },
        StatusCode::NOT_FOUND => match not_found {
            NotFound::Product(id) => CommerceError::ProductNotFound {
                product_id: id.to_string(),
            },
            NotFound::CartItem(id) => CommerceError::ItemNotInCart {
                product_id: id.to_string(),
            },
            NotFound::Resource => CommerceError::Rejected { message },
        },
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => CommerceError::Timeout(message),
        s if s.is_client_error() => CommerceError::Rejected { message },
        s => CommerceError::ServiceError {
            service: SERVICE_NAME.to_string(),
            status: s.as_u16(),
            message,
        },
    }
}

// =============================================================================
// Request Bodies
// =============================================================================

#[derive(Debug, Serialize)]
struct AddItemBody<'a> {
    product_id: &'a str,
    quantity: u32,
}

#[derive(Debug, Serialize)]
struct UpdateItemBody {
    quantity: u32,
}

#[derive(Debug, Serialize)]
struct DiscountBody<'a> {
    code: &'a str,
}

#[derive(Debug, Serialize)]
struct StatusBody<T> {
    status: T,
}

// =============================================================================
// Service Implementations
// =============================================================================

#[async_trait]
impl CartService for HttpCommerceClient {
    #[instrument(skip(self))]
    async fn get_cart(&self) -> CommerceResult<Cart> {
        self.send_json(self.request(Method::GET, "/cart"), NotFound::Resource)
            .await
    }

    #[instrument(skip(self, op), fields(op = %op))]
    async fn add_item(
        &self,
        op: &OperationId,
        product_id: &str,
        quantity: u32,
    ) -> CommerceResult<Cart> {
        let request = self
            .mutation(Method::POST, "/cart/items", op)
            .json(&AddItemBody {
                product_id,
                quantity,
            });
        self.send_json(request, NotFound::Product(product_id)).await
    }

    #[instrument(skip(self, op), fields(op = %op))]
    async fn update_item(
        &self,
        op: &OperationId,
        product_id: &str,
        quantity: u32,
    ) -> CommerceResult<Cart> {
        let request = self
            .resource(Method::PATCH, "/cart/items", &[product_id])?
            .header("Idempotency-Key", op.as_str())
            .json(&UpdateItemBody { quantity });
        self.send_json(request, NotFound::CartItem(product_id)).await
    }

    #[instrument(skip(self, op), fields(op = %op))]
    async fn remove_item(&self, op: &OperationId, product_id: &str) -> CommerceResult<Cart> {
        let request = self
            .resource(Method::DELETE, "/cart/items", &[product_id])?
            .header("Idempotency-Key", op.as_str());
        self.send_json(request, NotFound::CartItem(product_id)).await
    }

    #[instrument(skip(self, op), fields(op = %op))]
    async fn clear(&self, op: &OperationId) -> CommerceResult<()> {
        self.execute(self.mutation(Method::DELETE, "/cart", op), NotFound::Resource)
            .await?;
        Ok(())
    }

    #[instrument(skip(self, op), fields(op = %op))]
    async fn apply_discount(
        &self,
        op: &OperationId,
        code: &str,
    ) -> CommerceResult<DiscountValidation> {
        let request = self
            .mutation(Method::POST, "/cart/discount", op)
            .json(&DiscountBody { code });
        self.send_json(request, NotFound::Resource).await
    }
}

#[async_trait]
impl OrderService for HttpCommerceClient {
    #[instrument(skip(self, request), fields(op = %request.idempotency_key, items = request.items.len()))]
    async fn create_order(&self, request: &OrderRequest) -> CommerceResult<OrderReceipt> {
        let http = self
            .request(Method::POST, "/orders")
            .header("Idempotency-Key", &request.idempotency_key)
            .json(request);
        let receipt: OrderReceipt = self.send_json(http, NotFound::Resource).await?;

        info!(
            "Created order: id={}, payment={}",
            receipt.id,
            receipt.payment_id.as_deref().unwrap_or("none")
        );
        Ok(receipt)
    }

    #[instrument(skip(self))]
    async fn update_status(&self, order_id: &str, status: OrderStatus) -> CommerceResult<()> {
        let request = self
            .resource(Method::PATCH, "/orders", &[order_id, "status"])?
            .json(&StatusBody { status });
        self.execute(request, NotFound::Resource).await?;
        Ok(())
    }
}

#[async_trait]
impl PaymentService for HttpCommerceClient {
    #[instrument(skip(self))]
    async fn verify_payment(&self, payment_id: &str) -> CommerceResult<PaymentVerification> {
        let request = self.resource(Method::GET, "/payments", &[payment_id])?;
        self.send_json(request, NotFound::Resource).await
    }
}
