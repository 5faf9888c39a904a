use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;
use std::env;
use std::fmt;

use crate::error::MarketError;
use crate::shared_types::{ArbitrageOpportunity, ItemPriceRecord, OpportunityKind};

lazy_static! {
    // One token of a tier expression: "4.0" is tier 4, enchantment 0.
    static ref RE_TIER_TOKEN: Regex = Regex::new(r"^(\d+)(?:\.(\d))?$").unwrap();
}

/// Compiled tier matcher over `item_id`.
///
/// Tier expressions use the collector's notation: `"4.0 5.1"` selects plain
/// tier-4 items and tier-5 items at enchantment 1. Anything that does not
/// parse as an expression is kept as a literal prefix match (`"T4"`).
#[derive(Debug, Clone)]
enum TierFilter {
    Expression { raw: String, pattern: Regex },
    Prefix(String),
}

impl TierFilter {
    fn compile(raw: &str) -> TierFilter {
        match expression_pattern(raw) {
            Some(pattern) => TierFilter::Expression {
                raw: raw.to_string(),
                pattern,
            },
            None => TierFilter::Prefix(raw.to_uppercase()),
        }
    }

    fn matches(&self, item_id: &str) -> bool {
        match self {
            TierFilter::Expression { pattern, .. } => pattern.is_match(item_id),
            TierFilter::Prefix(prefix) => item_id.starts_with(prefix.as_str()),
        }
    }

    fn describe(&self) -> &str {
        match self {
            TierFilter::Expression { raw, .. } => raw,
            TierFilter::Prefix(prefix) => prefix,
        }
    }
}

/// Builds one alternation branch per tier. Enchantment 0 items carry no
/// `@N` suffix, so a selection containing `.0` makes the suffix optional.
fn expression_pattern(raw: &str) -> Option<Regex> {
    let mut by_tier: BTreeMap<String, Vec<char>> = BTreeMap::new();
    for token in raw.split_whitespace() {
        let caps = RE_TIER_TOKEN.captures(token)?;
        let tier = caps.get(1)?.as_str().to_string();
        let levels = by_tier.entry(tier).or_default();
        match caps.get(2) {
            Some(level) => levels.push(level.as_str().chars().next()?),
            // Bare tier selects every enchantment level.
            None => levels.extend(['0', '1', '2', '3', '4']),
        }
    }
    if by_tier.is_empty() {
        return None;
    }

    let mut branches = Vec::new();
    for (tier, mut levels) in by_tier {
        levels.sort_unstable();
        levels.dedup();
        let had_zero = levels.contains(&'0');
        levels.retain(|l| *l != '0');
        let suffix = if levels.is_empty() {
            String::new()
        } else {
            let set: String = levels.into_iter().collect();
            format!("(@[{}]){}", set, if had_zero { "?" } else { "" })
        };
        branches.push(format!("(^T{}[^@]+{}$)", tier, suffix));
    }
    Regex::new(&branches.join("|")).ok()
}

/// The three active filters read by the arbitrage and result-set engines.
/// Mutated only through the setters; `current()` hands out a display copy.
#[derive(Debug, Clone)]
pub struct FilterPolicy {
    tier: Option<TierFilter>,
    quality: Option<u8>,
    min_diff: Decimal,
}

impl Default for FilterPolicy {
    fn default() -> Self {
        FilterPolicy {
            tier: None,
            quality: None,
            min_diff: Decimal::ZERO,
        }
    }
}

impl FilterPolicy {
    /// Session defaults from the environment (`.env` supported):
    /// `SET_FILTER_TIER`, `SET_FILTER_QUALITY`, `LEAST_DIFF_SHOW`.
    pub fn from_env() -> Self {
        let mut policy = FilterPolicy::default();
        if let Ok(tier) = env::var("SET_FILTER_TIER") {
            policy.set_tier(&tier);
        }
        if let Ok(quality) = env::var("SET_FILTER_QUALITY") {
            if let Ok(q) = quality.trim().parse::<u8>() {
                let _ = policy.set_quality(Some(q));
            }
        }
        let min_diff = env::var("LEAST_DIFF_SHOW")
            .ok()
            .and_then(|v| v.trim().parse::<Decimal>().ok())
            .unwrap_or(dec!(1.3));
        if policy.set_min_diff(min_diff).is_err() {
            policy.min_diff = dec!(1.3);
        }
        policy
    }

    /// Stores a tier expression, trimmed. Empty or "none" clears the filter.
    pub fn set_tier(&mut self, value: &str) {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
            self.tier = None;
        } else {
            self.tier = Some(TierFilter::compile(trimmed));
        }
    }

    /// Sets the exact quality filter (1-5) or clears it with `None`.
    /// Out-of-range values leave the previous filter unchanged.
    pub fn set_quality(&mut self, value: Option<u8>) -> Result<(), MarketError> {
        match value {
            Some(q) if !(1..=5).contains(&q) => Err(MarketError::InvalidQuality),
            other => {
                self.quality = other;
                Ok(())
            }
        }
    }

    /// Sets the minimum acceptable profit ratio. Negative values leave the
    /// previous threshold unchanged.
    pub fn set_min_diff(&mut self, value: Decimal) -> Result<(), MarketError> {
        if value.is_sign_negative() {
            return Err(MarketError::InvalidThreshold);
        }
        self.min_diff = value;
        Ok(())
    }

    pub fn tier(&self) -> Option<&str> {
        self.tier.as_ref().map(|t| t.describe())
    }

    pub fn quality(&self) -> Option<u8> {
        self.quality
    }

    pub fn min_diff(&self) -> Decimal {
        self.min_diff
    }

    /// Live snapshot for display.
    pub fn current(&self) -> FilterPolicy {
        self.clone()
    }

    /// Listing inclusion: tier and quality must pass; absent filters pass.
    pub fn matches_record(&self, record: &ItemPriceRecord) -> bool {
        if let Some(tier) = &self.tier {
            if !tier.matches(&record.item_id) {
                return false;
            }
        }
        if let Some(quality) = self.quality {
            if record.quality != quality {
                return false;
            }
        }
        true
    }

    /// Opportunity inclusion: tier must pass, quality never applies
    /// (opportunities are quality-collapsed), and the ratio for `kind`
    /// must be present and at least `min_diff`.
    pub fn matches_opportunity(&self, opp: &ArbitrageOpportunity, kind: OpportunityKind) -> bool {
        if let Some(tier) = &self.tier {
            if !tier.matches(&opp.item_id) {
                return false;
            }
        }
        match opp.ratio(kind) {
            Some(ratio) => ratio >= self.min_diff,
            None => false,
        }
    }
}

impl fmt::Display for FilterPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tier={} quality={} min_diff={}",
            self.tier().unwrap_or("any"),
            self.quality
                .map(|q| q.to_string())
                .unwrap_or_else(|| "any".to_string()),
            self.min_diff
        )
    }
}
