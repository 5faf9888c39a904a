use rust_decimal::Decimal;
use std::cmp::Ordering;

use crate::filter_policy::FilterPolicy;
use crate::shared_types::{ArbitrageOpportunity, ItemPriceRecord, OpportunityKind};

/// Display sentinel for an absent optional value.
pub const NOT_AVAILABLE: &str = "N/A";

/// Last-sorted column and direction for one displayed view. Each view owns
/// its own state; nothing here is shared or ambient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortState {
    pub column: Option<usize>,
    pub ascending: bool,
}

impl Default for SortState {
    fn default() -> Self {
        SortState {
            column: None,
            ascending: true,
        }
    }
}

/// Heterogeneous tabular result set: rendered cells, one row per record.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ResultTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn parse_numeric(cell: &str) -> Option<Decimal> {
    let cleaned = cell.trim().replace(',', "");
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<Decimal>().ok()
}

/// Ascending three-way cell comparison: numeric when both cells parse as
/// numbers (grouping commas stripped), then the "N/A" sentinel after all
/// other values, then case-sensitive string order. Descending order is the
/// exact reverse, which places "N/A" first.
pub fn compare_cells(a: &str, b: &str) -> Ordering {
    if let (Some(x), Some(y)) = (parse_numeric(a), parse_numeric(b)) {
        return x.cmp(&y);
    }
    match (a.trim() == NOT_AVAILABLE, b.trim() == NOT_AVAILABLE) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.cmp(b),
    }
}

/// Stable sort of the table by `column_index`, toggling direction when the
/// same column is requested twice in a row and resetting to ascending on a
/// new column. Returns the updated state; the input state is not mutated.
pub fn sort_table(table: &mut ResultTable, column_index: usize, state: &SortState) -> SortState {
    let updated = SortState {
        column: Some(column_index),
        ascending: if state.column == Some(column_index) {
            !state.ascending
        } else {
            true
        },
    };

    // Short rows compare as "N/A" rather than panicking on a bad index.
    let cell = |row: &Vec<String>| -> String {
        row.get(column_index)
            .cloned()
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    };

    table.rows.sort_by(|a, b| {
        let ord = compare_cells(&cell(a), &cell(b));
        if updated.ascending {
            ord
        } else {
            ord.reverse()
        }
    });

    updated
}

/// Order-preserving policy filter over raw listings. Idempotent.
pub fn filter_records(records: &[ItemPriceRecord], policy: &FilterPolicy) -> Vec<ItemPriceRecord> {
    records
        .iter()
        .filter(|r| policy.matches_record(r))
        .cloned()
        .collect()
}

/// Order-preserving policy filter over opportunities for one list kind.
/// Idempotent, and monotone in the policy threshold.
pub fn filter_opportunities(
    records: &[ArbitrageOpportunity],
    policy: &FilterPolicy,
    kind: OpportunityKind,
) -> Vec<ArbitrageOpportunity> {
    records
        .iter()
        .filter(|o| policy.matches_opportunity(o, kind))
        .cloned()
        .collect()
}

/// Formats a price with comma grouping ("12,500"); ratios keep two decimals.
pub fn format_price(value: Decimal) -> String {
    let normalized = value.normalize();
    let text = normalized.to_string();
    let (sign, digits) = match text.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", text.as_str()),
    };
    let (int_part, frac_part) = match digits.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (digits, None),
    };

    let mut grouped = String::new();
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    match frac_part {
        Some(f) => format!("{}{}.{}", sign, grouped, f),
        None => format!("{}{}", sign, grouped),
    }
}

pub fn format_ratio(value: Decimal) -> String {
    value.round_dp(2).to_string()
}

fn opt_price(value: Option<Decimal>) -> String {
    value.map(format_price).unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

fn opt_ratio(value: Option<Decimal>) -> String {
    value.map(format_ratio).unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Single-location listing view, one row per item/quality record.
pub fn listing_table(records: &[ItemPriceRecord]) -> ResultTable {
    ResultTable {
        headers: ["Item", "Name", "Enchant", "Quality", "Sell Min", "Buy Max"]
            .iter()
            .map(|h| h.to_string())
            .collect(),
        rows: records
            .iter()
            .map(|r| {
                vec![
                    r.item_id.clone(),
                    r.display_name.clone(),
                    r.enchantment.to_string(),
                    r.quality.to_string(),
                    opt_price(r.sell_min),
                    opt_price(r.buy_max),
                ]
            })
            .collect(),
    }
}

/// Opportunity view for one list kind, mirroring the comparison columns.
pub fn opportunity_table(records: &[ArbitrageOpportunity], kind: OpportunityKind) -> ResultTable {
    let (bm_header, diff_header, desired_header) = match kind {
        OpportunityKind::QuickSell => ("Buy Max (BM)", "Diff Quick Sell", "Quick Sell Desired"),
        OpportunityKind::SellOrder => ("Sell Min (BM)", "Diff Sell Order", "Sell Order Desired"),
    };
    ResultTable {
        headers: ["Name", "Enchant", "Sell Min (RL)", bm_header, diff_header, desired_header]
            .iter()
            .map(|h| h.to_string())
            .collect(),
        rows: records
            .iter()
            .map(|o| {
                let (bm_price, diff, desired) = match kind {
                    OpportunityKind::QuickSell => {
                        (o.buy_max_bm, o.diff_quick_sell, o.quick_sell_desired)
                    }
                    OpportunityKind::SellOrder => {
                        (o.sell_min_bm, o.diff_sell_order, o.sell_order_desired)
                    }
                };
                vec![
                    o.display_name.clone(),
                    o.enchantment.to_string(),
                    opt_price(o.sell_min_rl),
                    opt_price(bm_price),
                    opt_ratio(diff),
                    opt_price(desired),
                ]
            })
            .collect(),
    }
}
