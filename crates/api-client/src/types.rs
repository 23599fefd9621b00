//! Request and response DTOs for the storefront API.

use chipper_core::products::Product;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct RegisterRequest<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

/// Token envelope returned by the auth endpoints.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Cart line as the backend stores it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCartLine {
    pub id: i64,
    pub product_id: i64,
    pub quantity: u32,
    #[serde(default)]
    pub product: Option<Product>,
}

/// Server-side cart contents.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartResponse {
    #[serde(default)]
    pub items: Vec<RemoteCartLine>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AddCartLineRequest {
    pub product_id: i64,
    pub quantity: u32,
}

#[derive(Debug, Serialize)]
pub(crate) struct SetQuantityRequest {
    pub quantity: u32,
}

#[derive(Debug, Serialize)]
pub(crate) struct SetStatusRequest {
    pub status: chipper_core::orders::OrderStatus,
}

/// Error body the backend sends with non-2xx responses. Older endpoints use
/// `error`, newer ones `message`; accept either.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl ApiErrorBody {
    pub fn into_message(self) -> Option<String> {
        self.message.or(self.error).filter(|m| !m.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn remote_cart_line_parses_with_and_without_product() {
        let bare: RemoteCartLine =
            serde_json::from_str(r#"{"id":11,"productId":3,"quantity":2}"#).unwrap();
        assert_eq!(bare.id, 11);
        assert!(bare.product.is_none());

        let full: RemoteCartLine = serde_json::from_str(
            r#"{"id":11,"productId":3,"quantity":2,
                "product":{"id":3,"name":"Mug","price":4.5}}"#,
        )
        .unwrap();
        assert_eq!(full.product.unwrap().price, dec!(4.5));
    }

    #[test]
    fn error_body_prefers_message_over_error() {
        let both: ApiErrorBody =
            serde_json::from_str(r#"{"message":"nope","error":"other"}"#).unwrap();
        assert_eq!(both.into_message().as_deref(), Some("nope"));

        let legacy: ApiErrorBody = serde_json::from_str(r#"{"error":"bad input"}"#).unwrap();
        assert_eq!(legacy.into_message().as_deref(), Some("bad input"));

        let empty: ApiErrorBody = serde_json::from_str(r#"{}"#).unwrap();
        assert!(empty.into_message().is_none());
    }

    #[test]
    fn add_request_uses_backend_field_names() {
        let json = serde_json::to_string(&AddCartLineRequest {
            product_id: 9,
            quantity: 2,
        })
        .unwrap();
        assert_eq!(json, r#"{"productId":9,"quantity":2}"#);
    }
}
