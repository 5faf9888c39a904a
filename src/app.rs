use rust_decimal::Decimal;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::arbitrage_engine::{compare, FeeSchedule};
use crate::csv_export;
use crate::error::MarketError;
use crate::filter_policy::FilterPolicy;
use crate::locations;
use crate::market_fetcher::SnapshotProvider;
use crate::result_set::{filter_records, listing_table, opportunity_table, sort_table, ResultTable, SortState};
use crate::shared_types::{OpportunityKind, Outcome};

/// Identifies one displayed result set. Sort state is keyed by this value,
/// so every view toggles independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewId {
    Listing,
    QuickSell,
    SellOrder,
}

impl ViewId {
    pub fn label(&self) -> &'static str {
        match self {
            ViewId::Listing => "listing",
            ViewId::QuickSell => "quick sell",
            ViewId::SellOrder => "sell order",
        }
    }
}

#[derive(Debug)]
struct View {
    table: ResultTable,
    state: SortState,
}

/// Rendered tables for one comparison.
#[derive(Debug)]
pub struct ComparisonTables {
    pub quick_sell: ResultTable,
    pub sell_order: ResultTable,
}

/// One user session: the active filter policy, the fee schedule, and the
/// last result table per view. Every operation reports through `Outcome`
/// so callers render success and failure the same way.
pub struct MarketApp<P: SnapshotProvider> {
    provider: P,
    policy: FilterPolicy,
    fees: FeeSchedule,
    views: HashMap<ViewId, View>,
}

impl<P: SnapshotProvider> MarketApp<P> {
    pub fn new(provider: P, policy: FilterPolicy) -> Self {
        MarketApp {
            provider,
            policy,
            fees: FeeSchedule::default(),
            views: HashMap::new(),
        }
    }

    pub fn with_fees(mut self, fees: FeeSchedule) -> Self {
        self.fees = fees;
        self
    }

    pub fn set_tier_filter(&mut self, value: &str) -> Outcome<()> {
        self.policy.set_tier(value);
        match self.policy.tier() {
            Some(tier) => Outcome::ok(format!("Tier filter set to {}", tier), ()),
            None => Outcome::ok("Tier filter cleared", ()),
        }
    }

    /// Accepts "1".."5" or an empty string to clear. Anything else is
    /// rejected and the previous filter stays active.
    pub fn set_quality_filter(&mut self, value: &str) -> Outcome<()> {
        let trimmed = value.trim();
        let parsed = if trimmed.is_empty() {
            None
        } else {
            match trimmed.parse::<u8>() {
                Ok(q) => Some(q),
                Err(_) => return Outcome::err(MarketError::InvalidQuality.to_string()),
            }
        };
        match self.policy.set_quality(parsed) {
            Ok(()) => match parsed {
                Some(q) => Outcome::ok(format!("Quality filter set to {}", q), ()),
                None => Outcome::ok("Quality filter cleared", ()),
            },
            Err(e) => Outcome::err(e.to_string()),
        }
    }

    pub fn set_min_diff_filter(&mut self, value: &str) -> Outcome<()> {
        let parsed = match value.trim().parse::<Decimal>() {
            Ok(v) => v,
            Err(_) => return Outcome::err(MarketError::InvalidThreshold.to_string()),
        };
        match self.policy.set_min_diff(parsed) {
            Ok(()) => Outcome::ok(format!("Minimum diff set to {}", parsed), ()),
            Err(e) => Outcome::err(e.to_string()),
        }
    }

    pub fn current_filters(&self) -> Outcome<FilterPolicy> {
        let policy = self.policy.current();
        Outcome::ok(policy.to_string(), policy)
    }

    /// Fetches and filters the raw listing for one location. The listing
    /// view's sort state resets with the fresh data.
    pub async fn get_listing(&mut self, location: &str) -> Outcome<ResultTable> {
        let location = locations::resolve(location);
        let snapshot = match self.provider.fetch_snapshot(&location).await {
            Ok(s) => s,
            Err(e) => return Outcome::err(e.to_string()),
        };
        let records = filter_records(&snapshot.records, &self.policy);
        if records.is_empty() {
            return Outcome::err(format!("No data found for {}", location));
        }
        let table = listing_table(&records);
        self.install_view(ViewId::Listing, table.clone());
        Outcome::ok(format!("{} records for {}", table.rows.len(), location), table)
    }

    /// Compares a reference location against the black market and installs
    /// both opportunity views. Empty lists are a success, not a failure.
    pub async fn compare(&mut self, reference: &str, black_market: &str) -> Outcome<ComparisonTables> {
        let reference = locations::resolve(reference);
        let black_market = locations::resolve(black_market);
        if reference == black_market {
            return Outcome::err(MarketError::SameLocation(reference).to_string());
        }

        let rl = match self.provider.fetch_snapshot(&reference).await {
            Ok(s) => s,
            Err(e) => return Outcome::err(e.to_string()),
        };
        let bm = match self.provider.fetch_snapshot(&black_market).await {
            Ok(s) => s,
            Err(e) => return Outcome::err(e.to_string()),
        };

        let comparison = match compare(&rl, &bm, &self.policy, &self.fees) {
            Ok(c) => c,
            Err(e) => return Outcome::err(e.to_string()),
        };

        let tables = ComparisonTables {
            quick_sell: opportunity_table(&comparison.quick_sell, OpportunityKind::QuickSell),
            sell_order: opportunity_table(&comparison.sell_order, OpportunityKind::SellOrder),
        };
        self.install_view(ViewId::QuickSell, tables.quick_sell.clone());
        self.install_view(ViewId::SellOrder, tables.sell_order.clone());

        Outcome::ok(
            format!(
                "{}: {} quick sell, {} sell order opportunities",
                reference,
                tables.quick_sell.rows.len(),
                tables.sell_order.rows.len()
            ),
            tables,
        )
    }

    /// Re-orders the named view by `column_index`, toggling direction on a
    /// repeated column and resetting to ascending on a new one.
    pub fn sort(&mut self, view_id: ViewId, column_index: usize) -> Outcome<ResultTable> {
        let view = match self.views.get_mut(&view_id) {
            Some(v) => v,
            None => return Outcome::err(format!("No {} data to sort", view_id.label())),
        };
        let header = match view.table.headers.get(column_index) {
            Some(h) => h.clone(),
            None => {
                return Outcome::err(format!(
                    "No column {} in the {} view",
                    column_index,
                    view_id.label()
                ))
            }
        };
        view.state = sort_table(&mut view.table, column_index, &view.state);
        let direction = if view.state.ascending { "ascending" } else { "descending" };
        Outcome::ok(
            format!("Sorted by {} {}", header, direction),
            view.table.clone(),
        )
    }

    /// Writes the named view to `<dir>/<name>.csv` as currently ordered.
    pub fn export_view(&self, view_id: ViewId, dir: &Path, name: &str) -> Outcome<PathBuf> {
        let view = match self.views.get(&view_id) {
            Some(v) => v,
            None => return Outcome::err(format!("No {} data to export", view_id.label())),
        };
        match csv_export::export(&view.table, dir, name) {
            Ok(path) => Outcome::ok(format!("Data exported to {}", path.display()), path),
            Err(e) => Outcome::err(e.to_string()),
        }
    }

    fn install_view(&mut self, view_id: ViewId, table: ResultTable) {
        self.views.insert(
            view_id,
            View {
                table,
                state: SortState::default(),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared_types::{ItemPriceRecord, MarketSnapshot};
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    struct FixedProvider {
        snapshots: HashMap<String, MarketSnapshot>,
    }

    #[async_trait]
    impl SnapshotProvider for FixedProvider {
        async fn fetch_snapshot(&self, location: &str) -> Result<MarketSnapshot, MarketError> {
            self.snapshots
                .get(location)
                .cloned()
                .ok_or_else(|| MarketError::LocationUnavailable(location.to_string()))
        }
    }

    fn record(item_id: &str, sell_min: Option<Decimal>, buy_max: Option<Decimal>) -> ItemPriceRecord {
        ItemPriceRecord {
            item_id: item_id.to_string(),
            display_name: item_id.to_string(),
            enchantment: 0,
            quality: 1,
            sell_min,
            buy_max,
        }
    }

    fn app() -> MarketApp<FixedProvider> {
        let mut snapshots = HashMap::new();
        snapshots.insert(
            "Lymhurst".to_string(),
            MarketSnapshot::new(
                "Lymhurst",
                vec![
                    record("T4_SWORD", Some(dec!(100)), None),
                    record("T5_BOW", Some(dec!(300)), Some(dec!(200))),
                ],
            ),
        );
        snapshots.insert(
            "BlackMarket".to_string(),
            MarketSnapshot::new(
                "BlackMarket",
                vec![
                    record("T4_SWORD", Some(dec!(400)), Some(dec!(250))),
                    record("T5_BOW", None, Some(dec!(330))),
                ],
            ),
        );
        MarketApp::new(FixedProvider { snapshots }, FilterPolicy::default())
            .with_fees(FeeSchedule::none())
    }

    #[tokio::test]
    async fn test_get_listing_resolves_short_codes() {
        let mut app = app();
        let outcome = app.get_listing("lh").await;
        assert!(outcome.success);
        assert_eq!(outcome.data.unwrap().rows.len(), 2);
    }

    #[tokio::test]
    async fn test_get_listing_unknown_location_fails() {
        let mut app = app();
        let outcome = app.get_listing("Atlantis").await;
        assert!(!outcome.success);
        assert!(outcome.message.contains("LocationUnavailable"));
    }

    #[tokio::test]
    async fn test_compare_rejects_same_location() {
        let mut app = app();
        let outcome = app.compare("bm", "BlackMarket").await;
        assert!(!outcome.success);
        assert!(outcome.message.contains("SameLocationError"));
    }

    #[tokio::test]
    async fn test_compare_installs_both_views() {
        let mut app = app();
        let outcome = app.compare("lh", "bm").await;
        assert!(outcome.success);
        let tables = outcome.data.unwrap();
        assert_eq!(tables.quick_sell.rows.len(), 2);
        assert_eq!(tables.sell_order.rows.len(), 1);

        let sorted = app.sort(ViewId::QuickSell, 0);
        assert!(sorted.success);
        assert!(sorted.message.contains("ascending"));
    }

    #[tokio::test]
    async fn test_sort_state_is_independent_per_view() {
        let mut app = app();
        app.compare("lh", "bm").await;

        // Two sorts on quick sell leave it descending.
        app.sort(ViewId::QuickSell, 0);
        let qs = app.sort(ViewId::QuickSell, 0);
        assert!(qs.message.contains("descending"));

        // The sell-order view starts fresh at ascending.
        let so = app.sort(ViewId::SellOrder, 0);
        assert!(so.message.contains("ascending"));
    }

    #[tokio::test]
    async fn test_sort_without_data_reports_cleanly() {
        let mut app = app();
        let outcome = app.sort(ViewId::Listing, 0);
        assert!(!outcome.success);
        assert!(outcome.message.contains("No listing data"));
    }

    #[test]
    fn test_invalid_quality_leaves_prior_filter() {
        let mut app = app();
        assert!(app.set_quality_filter("2").success);
        let outcome = app.set_quality_filter("7");
        assert!(!outcome.success);
        assert!(outcome.message.contains("InvalidQuality"));
        let current = app.current_filters().data.unwrap();
        assert_eq!(current.quality(), Some(2));
    }

    #[test]
    fn test_invalid_threshold_reports_kind() {
        let mut app = app();
        assert!(!app.set_min_diff_filter("not-a-number").success);
        assert!(app
            .set_min_diff_filter("-1")
            .message
            .contains("InvalidThreshold"));
        assert!(app.set_min_diff_filter("1.3").success);
    }

    #[test]
    fn test_tier_filter_always_succeeds() {
        let mut app = app();
        assert!(app.set_tier_filter("4.0 5.1").success);
        assert!(app.set_tier_filter("none").success);
        assert_eq!(app.current_filters().data.unwrap().tier(), None);
    }
}
