//! HTTP client for the storefront backend API.

use async_trait::async_trait;
use log::debug;
use serde::de::DeserializeOwned;

use chipper_core::cart::{CartSyncApi, CartSyncError, RemoteLineAck};
use chipper_core::orders::{NewOrder, Order};
use chipper_core::products::{Category, CategoryPayload, Product, ProductPayload};
use chipper_core::reviews::{Review, ReviewPayload};

use crate::error::{ApiError, Result};
use crate::types::{
    AddCartLineRequest, ApiErrorBody, CartResponse, LoginRequest, RegisterRequest,
    RemoteCartLine, SetQuantityRequest, SetStatusRequest, TokenResponse,
};

const MAX_LOG_BODY_CHARS: usize = 512;

/// Client for the storefront REST API.
///
/// No request timeout is configured: interactive calls are awaited by flows
/// that can show progress, cart sync calls are fire-and-forget, and the
/// transport default applies to both.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The base URL of the backend (e.g., "http://localhost:5000")
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn log_response(status: reqwest::StatusCode, body: &str) {
        if status.is_success() {
            debug!("API response status: {}", status);
            return;
        }

        let mut preview = body.chars().take(MAX_LOG_BODY_CHARS).collect::<String>();
        if body.chars().count() > MAX_LOG_BODY_CHARS {
            preview.push_str("...");
        }
        debug!("API response error ({}): {}", status, preview);
    }

    /// Parse a JSON response body, mapping non-2xx statuses to [`ApiError::Api`].
    async fn parse_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        let body = response.text().await?;
        Self::log_response(status, &body);

        if !status.is_success() {
            return Err(Self::error_from_body(status.as_u16(), &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            log::error!("Failed to deserialize response. Body: {}, Error: {}", body, e);
            ApiError::api(status.as_u16(), format!("Failed to parse response: {}", e))
        })
    }

    /// Check a response for success, discarding any body.
    async fn expect_success(response: reqwest::Response) -> Result<()> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await?;
        Self::log_response(status, &body);
        Err(Self::error_from_body(status.as_u16(), &body))
    }

    fn error_from_body(status: u16, body: &str) -> ApiError {
        if let Ok(parsed) = serde_json::from_str::<ApiErrorBody>(body) {
            if let Some(message) = parsed.into_message() {
                return ApiError::api(status, message);
            }
        }
        ApiError::api(status, format!("Request failed: {}", body))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Auth
    // ─────────────────────────────────────────────────────────────────────

    /// POST /api/auth/login
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenResponse> {
        let response = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&LoginRequest { username, password })
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// POST /api/auth/register
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<TokenResponse> {
        let response = self
            .client
            .post(self.url("/api/auth/register"))
            .json(&RegisterRequest {
                name,
                email,
                password,
            })
            .send()
            .await?;
        Self::parse_response(response).await
    }

    // ─────────────────────────────────────────────────────────────────────
    // Products
    // ─────────────────────────────────────────────────────────────────────

    /// GET /api/products, optionally filtered by category and/or a free-text
    /// search term.
    pub async fn products(
        &self,
        category_id: Option<i64>,
        search: Option<&str>,
    ) -> Result<Vec<Product>> {
        let request = self
            .client
            .get(self.url("/api/products"))
            .query(&product_query(category_id, search));
        Self::parse_response(request.send().await?).await
    }

    /// GET /api/products/:id
    pub async fn product(&self, id: i64) -> Result<Product> {
        let response = self
            .client
            .get(self.url(&format!("/api/products/{id}")))
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// POST /api/products (admin)
    pub async fn create_product(&self, token: &str, payload: &ProductPayload) -> Result<Product> {
        let response = self
            .client
            .post(self.url("/api/products"))
            .bearer_auth(token)
            .json(payload)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// PUT /api/products/:id (admin)
    pub async fn update_product(
        &self,
        token: &str,
        id: i64,
        payload: &ProductPayload,
    ) -> Result<Product> {
        let response = self
            .client
            .put(self.url(&format!("/api/products/{id}")))
            .bearer_auth(token)
            .json(payload)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// DELETE /api/products/:id (admin)
    pub async fn delete_product(&self, token: &str, id: i64) -> Result<()> {
        let response = self
            .client
            .delete(self.url(&format!("/api/products/{id}")))
            .bearer_auth(token)
            .send()
            .await?;
        Self::expect_success(response).await
    }

    // ─────────────────────────────────────────────────────────────────────
    // Categories
    // ─────────────────────────────────────────────────────────────────────

    /// GET /api/categories
    pub async fn categories(&self) -> Result<Vec<Category>> {
        let response = self.client.get(self.url("/api/categories")).send().await?;
        Self::parse_response(response).await
    }

    /// POST /api/categories (admin)
    pub async fn create_category(
        &self,
        token: &str,
        payload: &CategoryPayload,
    ) -> Result<Category> {
        let response = self
            .client
            .post(self.url("/api/categories"))
            .bearer_auth(token)
            .json(payload)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// PUT /api/categories/:id (admin)
    pub async fn update_category(
        &self,
        token: &str,
        id: i64,
        payload: &CategoryPayload,
    ) -> Result<Category> {
        let response = self
            .client
            .put(self.url(&format!("/api/categories/{id}")))
            .bearer_auth(token)
            .json(payload)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// DELETE /api/categories/:id (admin)
    pub async fn delete_category(&self, token: &str, id: i64) -> Result<()> {
        let response = self
            .client
            .delete(self.url(&format!("/api/categories/{id}")))
            .bearer_auth(token)
            .send()
            .await?;
        Self::expect_success(response).await
    }

    // ─────────────────────────────────────────────────────────────────────
    // Reviews
    // ─────────────────────────────────────────────────────────────────────

    /// GET /api/reviews/:productId. The bearer token is optional; reviews are
    /// public reads.
    pub async fn reviews(&self, product_id: i64, token: Option<&str>) -> Result<Vec<Review>> {
        let mut request = self
            .client
            .get(self.url(&format!("/api/reviews/{product_id}")));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        Self::parse_response(request.send().await?).await
    }

    /// POST /api/reviews/:productId
    pub async fn add_review(
        &self,
        token: &str,
        product_id: i64,
        payload: &ReviewPayload,
    ) -> Result<Review> {
        let response = self
            .client
            .post(self.url(&format!("/api/reviews/{product_id}")))
            .bearer_auth(token)
            .json(payload)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// DELETE /api/reviews/:id
    pub async fn delete_review(&self, token: &str, review_id: i64) -> Result<()> {
        let response = self
            .client
            .delete(self.url(&format!("/api/reviews/{review_id}")))
            .bearer_auth(token)
            .send()
            .await?;
        Self::expect_success(response).await
    }

    // ─────────────────────────────────────────────────────────────────────
    // Orders
    // ─────────────────────────────────────────────────────────────────────

    /// GET /api/orders
    pub async fn orders(&self, token: &str) -> Result<Vec<Order>> {
        let response = self
            .client
            .get(self.url("/api/orders"))
            .bearer_auth(token)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// GET /api/orders/:id
    pub async fn order(&self, token: &str, id: i64) -> Result<Order> {
        let response = self
            .client
            .get(self.url(&format!("/api/orders/{id}")))
            .bearer_auth(token)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// POST /api/orders
    pub async fn create_order(&self, token: &str, order: &NewOrder) -> Result<Order> {
        let response = self
            .client
            .post(self.url("/api/orders"))
            .bearer_auth(token)
            .json(order)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// PUT /api/orders/:id/status (admin)
    pub async fn set_order_status(
        &self,
        token: &str,
        id: i64,
        status: chipper_core::orders::OrderStatus,
    ) -> Result<Order> {
        let response = self
            .client
            .put(self.url(&format!("/api/orders/{id}/status")))
            .bearer_auth(token)
            .json(&SetStatusRequest { status })
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// DELETE /api/orders/:id (admin)
    pub async fn delete_order(&self, token: &str, id: i64) -> Result<()> {
        let response = self
            .client
            .delete(self.url(&format!("/api/orders/{id}")))
            .bearer_auth(token)
            .send()
            .await?;
        Self::expect_success(response).await
    }

    // ─────────────────────────────────────────────────────────────────────
    // Cart lines
    // ─────────────────────────────────────────────────────────────────────

    /// GET /api/cart
    pub async fn cart(&self, token: &str) -> Result<CartResponse> {
        let response = self
            .client
            .get(self.url("/api/cart"))
            .bearer_auth(token)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// POST /api/cart
    pub async fn add_cart_line(
        &self,
        token: &str,
        product_id: i64,
        quantity: u32,
    ) -> Result<RemoteCartLine> {
        let response = self
            .client
            .post(self.url("/api/cart"))
            .bearer_auth(token)
            .json(&AddCartLineRequest {
                product_id,
                quantity,
            })
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// PUT /api/cart/:id
    pub async fn set_cart_line_quantity(
        &self,
        token: &str,
        id: i64,
        quantity: u32,
    ) -> Result<RemoteCartLine> {
        let response = self
            .client
            .put(self.url(&format!("/api/cart/{id}")))
            .bearer_auth(token)
            .json(&SetQuantityRequest { quantity })
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// DELETE /api/cart/:id
    pub async fn remove_cart_line(&self, token: &str, id: i64) -> Result<()> {
        let response = self
            .client
            .delete(self.url(&format!("/api/cart/{id}")))
            .bearer_auth(token)
            .send()
            .await?;
        Self::expect_success(response).await
    }

    /// DELETE /api/cart/clear
    pub async fn clear_cart(&self, token: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.url("/api/cart/clear"))
            .bearer_auth(token)
            .send()
            .await?;
        Self::expect_success(response).await
    }
}

/// Query pairs for the product list endpoint.
fn product_query(category_id: Option<i64>, search: Option<&str>) -> Vec<(&'static str, String)> {
    let mut query = Vec::new();
    if let Some(category_id) = category_id {
        query.push(("categoryId", category_id.to_string()));
    }
    if let Some(search) = search {
        query.push(("search", search.to_string()));
    }
    query
}

/// Adapter onto the cart manager's sync seam: one attempt per call, errors
/// flattened to a message the manager logs.
#[async_trait]
impl CartSyncApi for ApiClient {
    async fn add_line(
        &self,
        token: &str,
        product_id: i64,
        quantity: u32,
    ) -> std::result::Result<RemoteLineAck, CartSyncError> {
        let line = self
            .add_cart_line(token, product_id, quantity)
            .await
            .map_err(|e| CartSyncError::new(e.to_string()))?;
        Ok(RemoteLineAck {
            remote_id: line.id,
        })
    }

    async fn set_line_quantity(
        &self,
        token: &str,
        remote_id: i64,
        quantity: u32,
    ) -> std::result::Result<(), CartSyncError> {
        self.set_cart_line_quantity(token, remote_id, quantity)
            .await
            .map(|_| ())
            .map_err(|e| CartSyncError::new(e.to_string()))
    }

    async fn remove_line(
        &self,
        token: &str,
        remote_id: i64,
    ) -> std::result::Result<(), CartSyncError> {
        self.remove_cart_line(token, remote_id)
            .await
            .map_err(|e| CartSyncError::new(e.to_string()))
    }

    async fn clear_lines(&self, token: &str) -> std::result::Result<(), CartSyncError> {
        self.clear_cart(token)
            .await
            .map_err(|e| CartSyncError::new(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalized() {
        let client = ApiClient::new("http://localhost:5000/");
        assert_eq!(client.url("/api/products"), "http://localhost:5000/api/products");
    }

    #[test]
    fn product_query_carries_category_and_search() {
        assert!(product_query(None, None).is_empty());
        assert_eq!(
            product_query(Some(2), None),
            vec![("categoryId", "2".to_string())]
        );
        assert_eq!(
            product_query(None, Some("mug")),
            vec![("search", "mug".to_string())]
        );
        assert_eq!(
            product_query(Some(2), Some("travel mug")),
            vec![
                ("categoryId", "2".to_string()),
                ("search", "travel mug".to_string()),
            ]
        );
    }

    #[test]
    fn error_body_message_is_extracted() {
        let err = ApiClient::error_from_body(400, r#"{"message":"Invalid credentials"}"#);
        assert_eq!(err.status_code(), Some(400));
        assert_eq!(
            err.to_string(),
            "API error (400): Invalid credentials"
        );
    }

    #[test]
    fn unparseable_error_body_is_kept_verbatim() {
        let err = ApiClient::error_from_body(502, "Bad Gateway");
        assert_eq!(err.to_string(), "API error (502): Request failed: Bad Gateway");
    }
}
