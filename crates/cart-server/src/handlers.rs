//! # Request Handlers
//!
//! Axum request handlers for the storefront API.
//! The shopper's cart is selected by the bearer token; requests without one
//! share the `anonymous` cart.

use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use cart_core::{
    Cart, CommerceError, DiscountValidation, OrderReceipt, OrderRequest, OrderStatus,
    PaymentStatus, PaymentVerification,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

/// Cart owner used when no bearer token is sent
pub const ANONYMOUS_OWNER: &str = "anonymous";

// =============================================================================
// Request/Response Types
// =============================================================================

/// Add item request
#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

/// Update item request
#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: u32,
}

/// Apply discount request
#[derive(Debug, Deserialize)]
pub struct DiscountRequest {
    pub code: String,
}

/// Order or payment status change
#[derive(Debug, Deserialize)]
pub struct StatusRequest<T> {
    pub status: T,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: u16) -> Self {
        Self {
            error: error.into(),
            code,
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn commerce_error_to_response(err: CommerceError) -> ApiError {
    let code = err.status_code();
    let response = ErrorResponse::new(err.user_message(), code).with_details(err.to_string());
    (
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(response),
    )
}

fn not_found(what: &str, id: &str) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse::new(format!("{} not found: {}", what, id), 404)),
    )
}

/// Cart owner from `Authorization: Bearer <token>`
fn cart_owner(headers: &HeaderMap) -> String {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .unwrap_or(ANONYMOUS_OWNER)
        .to_string()
}

fn idempotency_key(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("idempotency-key")
        .and_then(|v| v.to_str().ok())
        .filter(|key| !key.is_empty())
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "cart-sync",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// List active products
pub async fn list_products(State(state): State<AppState>) -> impl IntoResponse {
    let products: Vec<_> = state.catalog.active_products().collect();
    Json(serde_json::json!({
        "products": products,
        "count": products.len()
    }))
}

/// Get single active product
pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state
        .catalog
        .get(&product_id)
        .filter(|p| p.active)
        .ok_or_else(|| not_found("Product", &product_id))?;

    Ok(Json(product.clone()))
}

/// Get the caller's cart
pub async fn get_cart(State(state): State<AppState>, headers: HeaderMap) -> Json<Cart> {
    Json(state.store.cart(&cart_owner(&headers)))
}

/// Add units of a product
#[instrument(skip(state, headers, request), fields(product_id = %request.product_id, quantity = request.quantity))]
pub async fn add_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<AddItemRequest>,
) -> Result<Json<Cart>, ApiError> {
    let owner = cart_owner(&headers);
    state
        .store
        .add_item(
            &owner,
            idempotency_key(&headers),
            &request.product_id,
            request.quantity,
        )
        .map(Json)
        .map_err(commerce_error_to_response)
}

/// Set a line's quantity
#[instrument(skip(state, headers, request), fields(quantity = request.quantity))]
pub async fn update_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(product_id): Path<String>,
    Json(request): Json<UpdateItemRequest>,
) -> Result<Json<Cart>, ApiError> {
    state
        .store
        .update_item(&cart_owner(&headers), &product_id, request.quantity)
        .map(Json)
        .map_err(commerce_error_to_response)
}

/// Remove a line
pub async fn remove_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(product_id): Path<String>,
) -> Json<Cart> {
    Json(state.store.remove_item(&cart_owner(&headers), &product_id))
}

/// Empty the caller's cart
pub async fn clear_cart(State(state): State<AppState>, headers: HeaderMap) -> StatusCode {
    state.store.clear(&cart_owner(&headers));
    StatusCode::NO_CONTENT
}

/// Validate a discount code; a rejected code is a 200 with `valid: false`
pub async fn apply_discount(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<DiscountRequest>,
) -> Json<DiscountValidation> {
    Json(state.store.apply_discount(&cart_owner(&headers), &request.code))
}

/// Submit an order
#[instrument(skip(state, headers, request), fields(op = %request.idempotency_key, items = request.items.len()))]
pub async fn create_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<OrderRequest>,
) -> Result<Json<OrderReceipt>, ApiError> {
    let receipt = state
        .store
        .create_order(&cart_owner(&headers), &request)
        .map_err(|e| {
            error!("Failed to create order: {}", e);
            commerce_error_to_response(e)
        })?;

    info!("Created order: {}", receipt.id);
    Ok(Json(receipt))
}

/// Record an order status reported by the payment tracker
pub async fn update_order_status(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    Json(request): Json<StatusRequest<OrderStatus>>,
) -> Result<StatusCode, ApiError> {
    if state.store.update_order_status(&order_id, request.status) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("Order", &order_id))
    }
}

/// Current payment status
pub async fn get_payment(
    State(state): State<AppState>,
    Path(payment_id): Path<String>,
) -> Result<Json<PaymentVerification>, ApiError> {
    state
        .store
        .verify_payment(&payment_id)
        .map(Json)
        .ok_or_else(|| not_found("Payment", &payment_id))
}

/// Development hook standing in for the payment gateway's callback
pub async fn set_payment_status(
    State(state): State<AppState>,
    Path(payment_id): Path<String>,
    Json(request): Json<StatusRequest<PaymentStatus>>,
) -> Result<Json<PaymentVerification>, ApiError> {
    if state.config.is_production() {
        return Err((
            StatusCode::FORBIDDEN,
            Json(ErrorResponse::new(
                "Payment status hook is disabled in production",
                403,
            )),
        ));
    }

    state
        .store
        .set_payment_status(&payment_id, request.status)
        .map(Json)
        .ok_or_else(|| not_found("Payment", &payment_id))
}
