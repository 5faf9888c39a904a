use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::filter_policy::FilterPolicy;

/// One item's market state at one location: lowest ask and highest bid.
/// Zero prices from the wire are decoded as `None` (no live orders).
#[derive(Debug, Clone, PartialEq)]
pub struct ItemPriceRecord {
    pub item_id: String,
    pub display_name: String,
    pub enchantment: u8,
    pub quality: u8, // 1 Normal .. 5 Masterpiece
    pub sell_min: Option<Decimal>,
    pub buy_max: Option<Decimal>,
}

impl ItemPriceRecord {
    /// Canonical join key. The `@N` enchantment suffix is already part of
    /// `item_id` on the wire, so the key pairs the raw id with the level
    /// to stay correct for sources that strip the suffix.
    pub fn item_key(&self) -> (String, u8) {
        (self.item_id.clone(), self.enchantment)
    }
}

/// All price records for one location at one retrieval instant.
/// Immutable after construction; derived views never mutate it.
#[derive(Debug, Clone)]
pub struct MarketSnapshot {
    pub location: String,
    pub retrieved_at: DateTime<Utc>,
    pub records: Vec<ItemPriceRecord>,
}

impl MarketSnapshot {
    pub fn new(location: impl Into<String>, records: Vec<ItemPriceRecord>) -> Self {
        MarketSnapshot {
            location: location.into(),
            retrieved_at: Utc::now(),
            records,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Collapses qualities into one record per item key, keeping the lowest
    /// ask and the highest bid among records accepted by the policy.
    pub fn best_prices(&self, policy: &FilterPolicy) -> HashMap<(String, u8), ItemPriceRecord> {
        let mut best: HashMap<(String, u8), ItemPriceRecord> = HashMap::new();
        for record in self.records.iter().filter(|r| policy.matches_record(r)) {
            match best.get_mut(&record.item_key()) {
                None => {
                    best.insert(record.item_key(), record.clone());
                }
                Some(entry) => {
                    entry.sell_min = match (entry.sell_min, record.sell_min) {
                        (Some(a), Some(b)) => Some(a.min(b)),
                        (a, b) => a.or(b),
                    };
                    entry.buy_max = match (entry.buy_max, record.buy_max) {
                        (Some(a), Some(b)) => Some(a.max(b)),
                        (a, b) => a.or(b),
                    };
                }
            }
        }
        best
    }
}

/// One item correlated across the reference location ("rl") and the
/// black market ("bm"). Ratio and desired fields are `None` whenever an
/// operand is missing; the engine never divides by absent or zero data.
#[derive(Debug, Clone, PartialEq)]
pub struct ArbitrageOpportunity {
    pub item_id: String,
    pub display_name: String,
    pub enchantment: u8,
    pub sell_min_rl: Option<Decimal>,
    pub buy_max_bm: Option<Decimal>,
    pub sell_min_bm: Option<Decimal>,
    pub diff_quick_sell: Option<Decimal>,
    pub quick_sell_desired: Option<Decimal>,
    pub diff_sell_order: Option<Decimal>,
    pub sell_order_desired: Option<Decimal>,
}

/// Which ratio qualifies an opportunity for a given output list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpportunityKind {
    QuickSell,
    SellOrder,
}

impl ArbitrageOpportunity {
    pub fn ratio(&self, kind: OpportunityKind) -> Option<Decimal> {
        match kind {
            OpportunityKind::QuickSell => self.diff_quick_sell,
            OpportunityKind::SellOrder => self.diff_sell_order,
        }
    }
}

/// Both opportunity lists produced by one comparison. Either or both may
/// be empty without the comparison having failed.
#[derive(Debug, Default)]
pub struct Comparison {
    pub quick_sell: Vec<ArbitrageOpportunity>,
    pub sell_order: Vec<ArbitrageOpportunity>,
}

/// Uniform response shape for every consumer-facing operation, so callers
/// can render success and failure the same way.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<T> {
    pub success: bool,
    pub message: String,
    pub data: Option<T>,
}

impl<T> Outcome<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Outcome {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Outcome {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}
