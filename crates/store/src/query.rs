use common::UserId;
use domain::{DateRange, Order, OrderStatus, Page};

/// Builder for constructing order queries.
///
/// Allows filtering orders by customer, seller, status and creation time.
/// Results are always ordered newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderQuery {
    /// Filter by the customer who placed the order.
    pub customer_id: Option<UserId>,

    /// Filter to orders with at least one line from this seller.
    pub seller_id: Option<UserId>,

    /// Filter by current status.
    pub status: Option<OrderStatus>,

    /// Filter by creation time (inclusive bounds).
    pub range: DateRange,

    /// Maximum number of orders to return.
    pub limit: Option<u32>,

    /// Number of orders to skip.
    pub offset: Option<u32>,
}

impl OrderQuery {
    /// Creates a new empty query.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn customer(mut self, customer_id: UserId) -> Self {
        self.customer_id = Some(customer_id);
        self
    }

    pub fn seller(mut self, seller_id: UserId) -> Self {
        self.seller_id = Some(seller_id);
        self
    }

    /// Applies a seller filter only when one is given.
    pub fn maybe_seller(mut self, seller_id: Option<UserId>) -> Self {
        self.seller_id = seller_id;
        self
    }

    pub fn status(mut self, status: OrderStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn range(mut self, range: DateRange) -> Self {
        self.range = range;
        self
    }

    /// Limits the number of results.
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skips the first N results.
    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Applies limit and offset from a page.
    pub fn page(self, page: Page) -> Self {
        self.limit(page.limit).offset(page.offset)
    }

    /// Returns true if `order` passes every filter (pagination aside).
    pub fn matches(&self, order: &Order) -> bool {
        self.customer_id.is_none_or(|id| order.customer_id == id)
            && self.seller_id.is_none_or(|id| order.has_seller(id))
            && self.status.is_none_or(|status| order.status == status)
            && self.range.contains(order.created_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_filters() {
        let query = OrderQuery::new()
            .customer(UserId::new(1))
            .seller(UserId::new(2))
            .status(OrderStatus::Shipped)
            .limit(10)
            .offset(5);

        assert_eq!(query.customer_id, Some(UserId::new(1)));
        assert_eq!(query.seller_id, Some(UserId::new(2)));
        assert_eq!(query.status, Some(OrderStatus::Shipped));
        assert_eq!(query.limit, Some(10));
        assert_eq!(query.offset, Some(5));
    }

    #[test]
    fn page_sets_limit_and_offset() {
        let query = OrderQuery::new().page(Page::numbered(2, 25));
        assert_eq!(query.limit, Some(25));
        assert_eq!(query.offset, Some(25));
    }

    #[test]
    fn maybe_seller_clears_filter() {
        let query = OrderQuery::new().seller(UserId::new(3)).maybe_seller(None);
        assert_eq!(query.seller_id, None);
    }
}
