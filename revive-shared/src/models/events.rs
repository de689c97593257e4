use uuid::Uuid;

/// Domain events broadcast after a state change has been committed.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MarketEvent {
    BundlePurchased {
        order_id: Uuid,
        bundle_id: Uuid,
        supplier_id: Uuid,
        reseller_id: Uuid,
        amount_cents: i64,
        timestamp: i64,
    },
    WarehouseItemListed {
        item_id: Uuid,
        bundle_id: Uuid,
        reseller_id: Uuid,
        timestamp: i64,
    },
    CheckoutCompleted {
        user_id: Uuid,
        listing_ids: Vec<Uuid>,
        total_cents: i64,
        timestamp: i64,
    },
    OrderDelivered {
        order_id: Uuid,
        timestamp: i64,
    },
    SupplierTrustUpdated {
        supplier_id: Uuid,
        trust_score: f64,
        is_blacklisted: bool,
        timestamp: i64,
    },
}
