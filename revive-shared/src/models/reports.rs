use serde::{Deserialize, Serialize};

use super::bundle::Bundle;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PerformanceMetrics {
    pub total_bundles_listed: usize,
    pub active_count: usize,
    pub sold_count: usize,
}

/// Supplier dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardMetrics {
    pub total_sales_cents: i64,
    /// Newest first.
    pub active_bundles: Vec<Bundle>,
    pub performance: PerformanceMetrics,
    pub rating: f64,
    pub best_selling_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResellerMetrics {
    pub total_bought_bundles: usize,
    pub total_items_sold: usize,
    pub rating: f64,
    pub best_selling_cents: i64,
    pub bought_bundles: Vec<Bundle>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdminMetrics {
    pub total_bundles: i64,
    pub total_users: i64,
    pub total_sales_cents: i64,
    pub revenue_from_fees_cents: i64,
    pub skipped_items: i64,
}
