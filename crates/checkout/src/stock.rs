//! Best-effort stock bookkeeping.
//!
//! Placing and cancelling an order adjust stock one line at a time after the
//! order itself has been written. Those adjustments never fail the
//! operation; each one is recorded here instead.

use common::ProductId;
use serde::{Deserialize, Serialize};

/// What happened to a single stock adjustment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AdjustmentOutcome {
    /// The counter moved; `stock` is its new value.
    Applied { stock: u32 },
    /// The counter would have gone negative and was left alone.
    Refused,
    /// The store call itself failed.
    Failed { reason: String },
}

/// One line's stock change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAdjustment {
    pub product_id: ProductId,
    /// Signed change: negative on placement, positive on cancellation.
    pub delta: i64,
    #[serde(flatten)]
    pub outcome: AdjustmentOutcome,
}

impl StockAdjustment {
    pub fn is_applied(&self) -> bool {
        matches!(self.outcome, AdjustmentOutcome::Applied { .. })
    }
}

/// Per-line record of the stock side effects of an operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockReport {
    pub adjustments: Vec<StockAdjustment>,
}

impl StockReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, adjustment: StockAdjustment) {
        self.adjustments.push(adjustment);
    }

    /// True when every adjustment applied.
    pub fn is_complete(&self) -> bool {
        self.adjustments.iter().all(StockAdjustment::is_applied)
    }

    /// Adjustments that didn't apply.
    pub fn failures(&self) -> impl Iterator<Item = &StockAdjustment> {
        self.adjustments.iter().filter(|a| !a.is_applied())
    }

    pub fn len(&self) -> usize {
        self.adjustments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adjustments.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adjustment(id: i64, outcome: AdjustmentOutcome) -> StockAdjustment {
        StockAdjustment {
            product_id: ProductId::new(id),
            delta: -1,
            outcome,
        }
    }

    #[test]
    fn test_empty_report_is_complete() {
        assert!(StockReport::new().is_complete());
    }

    #[test]
    fn test_failures_lists_unapplied_lines() {
        let mut report = StockReport::new();
        report.push(adjustment(1, AdjustmentOutcome::Applied { stock: 4 }));
        report.push(adjustment(2, AdjustmentOutcome::Refused));
        report.push(adjustment(
            3,
            AdjustmentOutcome::Failed {
                reason: "connection reset".into(),
            },
        ));

        assert!(!report.is_complete());
        let failed: Vec<_> = report.failures().map(|a| a.product_id).collect();
        assert_eq!(failed, vec![ProductId::new(2), ProductId::new(3)]);
    }

    #[test]
    fn test_serializes_flat() {
        let json = serde_json::to_value(adjustment(1, AdjustmentOutcome::Applied { stock: 4 }))
            .unwrap();
        assert_eq!(json["outcome"], "applied");
        assert_eq!(json["stock"], 4);
        assert_eq!(json["product_id"], 1);
    }
}
