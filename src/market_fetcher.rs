use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;
use tracing::info;
use url::Url;

use crate::error::MarketError;
use crate::locations;
use crate::shared_types::{ItemPriceRecord, MarketSnapshot};

const DEFAULT_BASE_URL: &str = "https://www.albion-online-data.com";

// Fallback watchlist when neither ITEM_IDS nor ITEMS_CSV is configured.
const DEFAULT_ITEMS: &[&str] = &[
    "T4_BAG",
    "T4_CAPE",
    "T4_MAIN_SWORD",
    "T5_MAIN_SWORD",
    "T4_2H_BOW",
    "T5_2H_BOW",
    "T4_HEAD_PLATE_SET1",
    "T4_ARMOR_PLATE_SET1",
    "T4_SHOES_PLATE_SET1",
];

/// Acquisition seam for the engine: anything that can produce a
/// read-only snapshot for one location.
#[async_trait]
pub trait SnapshotProvider {
    async fn fetch_snapshot(&self, location: &str) -> Result<MarketSnapshot, MarketError>;
}

/// Price row as served by the Albion Online Data Project REST API.
/// Zero prices mean no live order on that side.
#[derive(Deserialize, Debug)]
struct ApiPrice {
    item_id: String,
    city: String,
    #[serde(default)]
    quality: u8,
    #[serde(default)]
    sell_price_min: Decimal,
    #[serde(default)]
    buy_price_max: Decimal,
}

fn positive(price: Decimal) -> Option<Decimal> {
    if price > Decimal::ZERO {
        Some(price)
    } else {
        None
    }
}

fn enchantment_of(item_id: &str) -> u8 {
    item_id
        .split_once('@')
        .and_then(|(_, level)| level.parse().ok())
        .unwrap_or(0)
}

fn records_from_api(
    prices: Vec<ApiPrice>,
    location: &str,
    names: &HashMap<String, String>,
) -> Vec<ItemPriceRecord> {
    prices
        .into_iter()
        .filter(|p| p.city == location)
        .map(|p| {
            let display_name = names.get(&p.item_id).cloned().unwrap_or_else(|| p.item_id.clone());
            ItemPriceRecord {
                enchantment: enchantment_of(&p.item_id),
                display_name,
                quality: if p.quality == 0 { 1 } else { p.quality },
                sell_min: positive(p.sell_price_min),
                buy_max: positive(p.buy_price_max),
                item_id: p.item_id,
            }
        })
        .collect()
}

/// Loads the `id,name` item catalog. Lines that do not split cleanly are
/// ignored, as is a leading header row.
pub fn load_item_names(path: &Path) -> HashMap<String, String> {
    let mut names = HashMap::new();
    let Ok(contents) = fs::read_to_string(path) else {
        return names;
    };
    for line in contents.lines() {
        if let Some((id, name)) = line.split_once(',') {
            let id = id.trim();
            if id.is_empty() || id.eq_ignore_ascii_case("id") {
                continue;
            }
            names.insert(id.to_string(), name.trim().to_string());
        }
    }
    names
}

/// Snapshot provider backed by the public Albion Online Data Project API.
pub struct AlbionDataApi {
    client: reqwest::Client,
    base_url: Url,
    items: Vec<String>,
    names: HashMap<String, String>,
}

impl AlbionDataApi {
    pub fn new(base_url: &str, items: Vec<String>, names: HashMap<String, String>) -> Result<Self, MarketError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| MarketError::Config(format!("bad base url {}: {}", base_url, e)))?;
        Ok(AlbionDataApi {
            client: reqwest::Client::new(),
            base_url,
            items,
            names,
        })
    }

    /// Configuration from the environment: `AODP_BASE_URL`, `ITEM_IDS`
    /// (comma-separated) or `ITEMS_CSV` (id,name catalog file).
    pub fn from_env() -> Result<Self, MarketError> {
        let base_url = env::var("AODP_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        let names = env::var("ITEMS_CSV")
            .map(|p| load_item_names(Path::new(&p)))
            .unwrap_or_default();

        let items: Vec<String> = match env::var("ITEM_IDS") {
            Ok(ids) => ids
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            Err(_) if !names.is_empty() => names.keys().cloned().collect(),
            Err(_) => DEFAULT_ITEMS.iter().map(|s| s.to_string()).collect(),
        };

        AlbionDataApi::new(&base_url, items, names)
    }

    fn prices_url(&self, location: &str) -> Result<Url, MarketError> {
        let mut url = self
            .base_url
            .join(&format!("api/v2/stats/prices/{}", self.items.join(",")))
            .map_err(|e| MarketError::Config(format!("bad prices url for {}: {}", location, e)))?;
        url.query_pairs_mut().append_pair("locations", location);
        Ok(url)
    }
}

#[async_trait]
impl SnapshotProvider for AlbionDataApi {
    async fn fetch_snapshot(&self, location: &str) -> Result<MarketSnapshot, MarketError> {
        let location = locations::resolve(location);
        if !locations::is_known(&location) {
            return Err(MarketError::LocationUnavailable(location));
        }

        let url = self.prices_url(&location)?;
        let prices: Vec<ApiPrice> = self
            .client
            .get(url)
            .header("User-Agent", "albion-market-bot/0.1")
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let records = records_from_api(prices, &location, &self.names);
        info!(location = %location, records = records.len(), "snapshot fetched");
        if records.is_empty() {
            return Err(MarketError::SnapshotEmpty(location));
        }
        Ok(MarketSnapshot::new(location, records))
    }
}
