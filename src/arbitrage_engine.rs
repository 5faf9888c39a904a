use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::debug;

use crate::error::MarketError;
use crate::filter_policy::FilterPolicy;
use crate::shared_types::{ArbitrageOpportunity, Comparison, MarketSnapshot, OpportunityKind};

/// Transaction costs applied to black-market proceeds.
///
/// A quick sell into an existing buy order only pays the market tax; a
/// listed sell order additionally pays the setup fee.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeeSchedule {
    pub market_tax: Decimal,
    pub setup_fee: Decimal,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        FeeSchedule {
            market_tax: dec!(0.04),
            setup_fee: dec!(0.025),
        }
    }
}

impl FeeSchedule {
    /// Zero-fee schedule, useful when raw price ratios are wanted.
    pub fn none() -> Self {
        FeeSchedule {
            market_tax: Decimal::ZERO,
            setup_fee: Decimal::ZERO,
        }
    }

    fn quick_sell_multiplier(&self) -> Decimal {
        Decimal::ONE - self.market_tax
    }

    fn sell_order_multiplier(&self) -> Decimal {
        Decimal::ONE - self.market_tax - self.setup_fee
    }
}

/// After-fee proceeds of realizing `price` at the black market, or `None`
/// when there is no order on that side.
fn proceeds(price: Option<Decimal>, multiplier: Decimal) -> Option<Decimal> {
    price.map(|p| p * multiplier)
}

/// Profit ratio of black-market proceeds over the reference ask. Absent
/// or non-positive denominators yield `None`; the division is never
/// attempted against missing data.
fn profit_ratio(proceeds: Option<Decimal>, sell_min_rl: Option<Decimal>) -> Option<Decimal> {
    let p = proceeds?;
    let cost = sell_min_rl?;
    if cost <= Decimal::ZERO {
        return None;
    }
    Some(p / cost)
}

/// Break-even reference price at the current threshold: buying below this
/// price keeps the ratio at or above `min_diff`. `None` when the proceeds
/// are unknown or the threshold is zero.
fn desired_price(proceeds: Option<Decimal>, min_diff: Decimal) -> Option<Decimal> {
    let p = proceeds?;
    if min_diff <= Decimal::ZERO {
        return None;
    }
    Some(p / min_diff)
}

/// Correlates every item present in both snapshots and derives the quick-sell
/// and sell-order opportunity lists, each filtered independently against the
/// policy threshold. One-sided items are skipped, never an error; empty
/// output lists are a valid outcome.
pub fn compare(
    reference: &MarketSnapshot,
    black_market: &MarketSnapshot,
    policy: &FilterPolicy,
    fees: &FeeSchedule,
) -> Result<Comparison, MarketError> {
    if reference.location == black_market.location {
        return Err(MarketError::SameLocation(reference.location.clone()));
    }

    let rl_best = reference.best_prices(policy);
    let bm_best = black_market.best_prices(policy);

    // Deterministic output order regardless of map iteration.
    let mut keys: Vec<_> = rl_best.keys().cloned().collect();
    keys.sort();

    let mut comparison = Comparison::default();
    let mut skipped = 0usize;

    for key in keys {
        let rl = &rl_best[&key];
        let bm = match bm_best.get(&key) {
            Some(bm) => bm,
            None => {
                skipped += 1;
                continue;
            }
        };

        let quick_sell_proceeds = proceeds(bm.buy_max, fees.quick_sell_multiplier());
        let sell_order_proceeds = proceeds(bm.sell_min, fees.sell_order_multiplier());

        let opp = ArbitrageOpportunity {
            item_id: rl.item_id.clone(),
            display_name: rl.display_name.clone(),
            enchantment: rl.enchantment,
            sell_min_rl: rl.sell_min,
            buy_max_bm: bm.buy_max,
            sell_min_bm: bm.sell_min,
            diff_quick_sell: profit_ratio(quick_sell_proceeds, rl.sell_min),
            quick_sell_desired: desired_price(quick_sell_proceeds, policy.min_diff()),
            diff_sell_order: profit_ratio(sell_order_proceeds, rl.sell_min),
            sell_order_desired: desired_price(sell_order_proceeds, policy.min_diff()),
        };

        if policy.matches_opportunity(&opp, OpportunityKind::QuickSell) {
            comparison.quick_sell.push(opp.clone());
        }
        if policy.matches_opportunity(&opp, OpportunityKind::SellOrder) {
            comparison.sell_order.push(opp);
        }
    }

    debug!(
        reference = %reference.location,
        black_market = %black_market.location,
        quick_sell = comparison.quick_sell.len(),
        sell_order = comparison.sell_order.len(),
        skipped_one_sided = skipped,
        "comparison complete"
    );

    Ok(comparison)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared_types::ItemPriceRecord;
    use rstest::rstest;

    fn record(
        item_id: &str,
        sell_min: Option<Decimal>,
        buy_max: Option<Decimal>,
    ) -> ItemPriceRecord {
        ItemPriceRecord {
            item_id: item_id.to_string(),
            display_name: item_id.to_string(),
            enchantment: 0,
            quality: 1,
            sell_min,
            buy_max,
        }
    }

    fn snapshot(location: &str, records: Vec<ItemPriceRecord>) -> MarketSnapshot {
        MarketSnapshot::new(location, records)
    }

    #[test]
    fn test_quick_sell_ratio_without_fees() {
        let rl = snapshot("Lymhurst", vec![record("T4_SWORD", Some(dec!(100)), None)]);
        let bm = snapshot("BlackMarket", vec![record("T4_SWORD", None, Some(dec!(250)))]);
        let policy = FilterPolicy::default();

        let result = compare(&rl, &bm, &policy, &FeeSchedule::none()).unwrap();
        assert_eq!(result.quick_sell.len(), 1);
        assert_eq!(result.quick_sell[0].diff_quick_sell, Some(dec!(2.5)));
        // No ask on the black-market side, so no sell-order opportunity.
        assert!(result.sell_order.is_empty());
    }

    #[test]
    fn test_quick_sell_ratio_with_default_fees() {
        let rl = snapshot("Lymhurst", vec![record("T4_SWORD", Some(dec!(100)), None)]);
        let bm = snapshot("BlackMarket", vec![record("T4_SWORD", None, Some(dec!(250)))]);
        let policy = FilterPolicy::default();

        let result = compare(&rl, &bm, &policy, &FeeSchedule::default()).unwrap();
        // 250 * (1 - 0.04) / 100
        assert_eq!(result.quick_sell[0].diff_quick_sell, Some(dec!(2.4)));
    }

    #[test]
    fn test_threshold_empties_quick_sell_list() {
        let rl = snapshot("Lymhurst", vec![record("T4_SWORD", Some(dec!(100)), None)]);
        let bm = snapshot("BlackMarket", vec![record("T4_SWORD", None, Some(dec!(250)))]);
        let mut policy = FilterPolicy::default();
        policy.set_min_diff(dec!(3)).unwrap();

        let result = compare(&rl, &bm, &policy, &FeeSchedule::none()).unwrap();
        assert!(result.quick_sell.is_empty());
        assert!(result.sell_order.is_empty());
    }

    #[rstest]
    #[case(None, Some(dec!(250)))]
    #[case(Some(dec!(100)), None)]
    #[case(None, None)]
    fn test_absent_operand_yields_absent_ratio(
        #[case] sell_min_rl: Option<Decimal>,
        #[case] buy_max_bm: Option<Decimal>,
    ) {
        let rl = snapshot("Lymhurst", vec![record("T4_SWORD", sell_min_rl, None)]);
        let bm = snapshot("BlackMarket", vec![record("T4_SWORD", None, buy_max_bm)]);
        let policy = FilterPolicy::default();

        let result = compare(&rl, &bm, &policy, &FeeSchedule::none()).unwrap();
        assert!(result.quick_sell.is_empty());
        for opp in &result.sell_order {
            assert_eq!(opp.diff_quick_sell, None);
        }
    }

    #[test]
    fn test_one_sided_items_are_skipped() {
        let rl = snapshot(
            "Lymhurst",
            vec![
                record("T4_SWORD", Some(dec!(100)), None),
                record("T5_BOW", Some(dec!(300)), None),
            ],
        );
        let bm = snapshot("BlackMarket", vec![record("T4_SWORD", None, Some(dec!(250)))]);
        let policy = FilterPolicy::default();

        let result = compare(&rl, &bm, &policy, &FeeSchedule::none()).unwrap();
        assert_eq!(result.quick_sell.len(), 1);
        assert_eq!(result.quick_sell[0].item_id, "T4_SWORD");
    }

    #[test]
    fn test_same_location_rejected() {
        let a = snapshot("BlackMarket", vec![]);
        let b = snapshot("BlackMarket", vec![]);
        let err = compare(&a, &b, &FilterPolicy::default(), &FeeSchedule::none()).unwrap_err();
        assert!(matches!(err, MarketError::SameLocation(_)));
    }

    #[test]
    fn test_both_lists_can_hold_the_same_item() {
        let rl = snapshot("Lymhurst", vec![record("T4_SWORD", Some(dec!(100)), None)]);
        let bm = snapshot(
            "BlackMarket",
            vec![record("T4_SWORD", Some(dec!(400)), Some(dec!(250)))],
        );
        let policy = FilterPolicy::default();

        let result = compare(&rl, &bm, &policy, &FeeSchedule::none()).unwrap();
        assert_eq!(result.quick_sell.len(), 1);
        assert_eq!(result.sell_order.len(), 1);
        assert_eq!(result.sell_order[0].diff_sell_order, Some(dec!(4)));
    }

    #[test]
    fn test_desired_price_is_break_even_at_threshold() {
        let rl = snapshot("Lymhurst", vec![record("T4_SWORD", Some(dec!(100)), None)]);
        let bm = snapshot("BlackMarket", vec![record("T4_SWORD", None, Some(dec!(250)))]);
        let mut policy = FilterPolicy::default();
        policy.set_min_diff(dec!(2)).unwrap();

        let result = compare(&rl, &bm, &policy, &FeeSchedule::none()).unwrap();
        let opp = &result.quick_sell[0];
        let desired = opp.quick_sell_desired.unwrap();
        assert_eq!(desired, dec!(125));
        // Buying at or below the desired price keeps the ratio >= min_diff.
        assert!(opp.sell_min_rl.unwrap() <= desired);
        assert!(opp.diff_quick_sell.unwrap() >= policy.min_diff());
    }

    #[test]
    fn test_threshold_monotonicity() {
        let rl = snapshot(
            "Lymhurst",
            vec![
                record("T4_SWORD", Some(dec!(100)), None),
                record("T5_BOW", Some(dec!(100)), None),
                record("T6_STAFF", Some(dec!(100)), None),
            ],
        );
        let bm = snapshot(
            "BlackMarket",
            vec![
                record("T4_SWORD", None, Some(dec!(120))),
                record("T5_BOW", None, Some(dec!(180))),
                record("T6_STAFF", None, Some(dec!(300))),
            ],
        );

        let mut previous = usize::MAX;
        for threshold in [dec!(0), dec!(1.1), dec!(1.5), dec!(2.5), dec!(10)] {
            let mut policy = FilterPolicy::default();
            policy.set_min_diff(threshold).unwrap();
            let result = compare(&rl, &bm, &policy, &FeeSchedule::none()).unwrap();
            assert!(result.quick_sell.len() <= previous);
            previous = result.quick_sell.len();
        }
    }

    #[test]
    fn test_quality_collapse_uses_best_prices() {
        let mut cheap = record("T4_SWORD", Some(dec!(90)), None);
        cheap.quality = 2;
        let rl = snapshot(
            "Lymhurst",
            vec![record("T4_SWORD", Some(dec!(100)), None), cheap],
        );
        let bm = snapshot("BlackMarket", vec![record("T4_SWORD", None, Some(dec!(250)))]);
        let policy = FilterPolicy::default();

        let result = compare(&rl, &bm, &policy, &FeeSchedule::none()).unwrap();
        assert_eq!(result.quick_sell[0].sell_min_rl, Some(dec!(90)));
    }

    #[test]
    fn test_zero_price_never_divides() {
        let rl = snapshot("Lymhurst", vec![record("T4_SWORD", Some(dec!(0)), None)]);
        let bm = snapshot("BlackMarket", vec![record("T4_SWORD", None, Some(dec!(250)))]);
        let policy = FilterPolicy::default();

        let result = compare(&rl, &bm, &policy, &FeeSchedule::none()).unwrap();
        assert!(result.quick_sell.is_empty());
    }
}
