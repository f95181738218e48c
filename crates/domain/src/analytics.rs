//! Order analytics types.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use common::UserId;
use serde::{Deserialize, Serialize};

use crate::order::{Money, OrderStatus};

/// Inclusive creation-time window. Either bound may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        Self { start, end }
    }

    /// The unbounded range.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start.is_none_or(|start| at >= start) && self.end.is_none_or(|end| at <= end)
    }
}

/// Filters for an analytics request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnalyticsQuery {
    pub seller_id: Option<UserId>,
    pub range: DateRange,
}

/// Revenue and order counts.
///
/// Revenue covers delivered orders only. When scoped to a seller it is the
/// sum of that seller's line totals, not whole order totals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAnalytics {
    pub seller_id: Option<UserId>,
    pub total_revenue: Money,
    pub total_orders: u64,
    pub orders_by_status: BTreeMap<OrderStatus, u64>,
}

impl OrderAnalytics {
    /// Number of orders in `status`, zero when absent.
    pub fn count(&self, status: OrderStatus) -> u64 {
        self.orders_by_status.get(&status).copied().unwrap_or(0)
    }
}
