//! Push events emitted by the storefront backend.

use serde::Deserialize;

use chipper_core::orders::Order;
use chipper_core::products::{Category, Product};

/// Envelope for incoming feed messages, tagged by event name. Admin mutations
/// are mirrored so storefront views stay current.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum StoreEvent {
    #[serde(rename = "new-order")]
    NewOrder(Order),
    #[serde(rename = "stock-update")]
    StockUpdate(StockUpdate),
    #[serde(rename = "new-product")]
    NewProduct(Product),
    #[serde(rename = "update-product")]
    UpdateProduct(Product),
    #[serde(rename = "delete-product")]
    DeleteProduct(DeletedId),
    #[serde(rename = "new-category")]
    NewCategory(Category),
    #[serde(rename = "update-category")]
    UpdateCategory(Category),
    #[serde(rename = "delete-category")]
    DeleteCategory(DeletedId),
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockUpdate {
    pub product_id: i64,
    pub stock: i32,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct DeletedId {
    pub id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_new_order_event() {
        let json = r#"{"event":"new-order",
            "data":{"id":5,"productId":2,"quantity":1,"status":"Pending"}}"#;
        let event: StoreEvent = serde_json::from_str(json).unwrap();
        match event {
            StoreEvent::NewOrder(order) => assert_eq!(order.id, 5),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn decodes_stock_update_event() {
        let json = r#"{"event":"stock-update","data":{"productId":2,"stock":7}}"#;
        let event: StoreEvent = serde_json::from_str(json).unwrap();
        match event {
            StoreEvent::StockUpdate(update) => {
                assert_eq!(update.product_id, 2);
                assert_eq!(update.stock, 7);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn decodes_catalog_mutation_events() {
        let deleted: StoreEvent =
            serde_json::from_str(r#"{"event":"delete-product","data":{"id":9}}"#).unwrap();
        assert!(matches!(
            deleted,
            StoreEvent::DeleteProduct(DeletedId { id: 9 })
        ));

        let category: StoreEvent = serde_json::from_str(
            r#"{"event":"update-category","data":{"id":1,"name":"Drinkware"}}"#,
        )
        .unwrap();
        assert!(matches!(category, StoreEvent::UpdateCategory(_)));
    }

    #[test]
    fn unknown_event_name_fails_to_decode() {
        let result =
            serde_json::from_str::<StoreEvent>(r#"{"event":"price-drop","data":{"id":1}}"#);
        assert!(result.is_err());
    }
}
