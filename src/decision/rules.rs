//! Per-channel rule thresholds
//!
//! Each rule is a conjunction of fixed comparisons. A count or amount the
//! record does not carry fails its comparison.

use super::TokenMetrics;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

/// Thresholds for every rule class
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RuleConfig {
    pub new_pool: NewPoolRule,
    pub fdv_surge: FdvSurgeRule,
    pub heavy_bought: HeavyBoughtRule,
    pub kol_buy: KolBuyRule,
}

/// Freshly created pools
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NewPoolRule {
    /// Initial liquidity share must exceed this fraction
    pub min_initial_lp: Decimal,
    /// Top-10 holder share must stay below this fraction
    pub max_top10: Decimal,
}

impl Default for NewPoolRule {
    fn default() -> Self {
        Self {
            min_initial_lp: dec!(0.2),
            max_top10: dec!(0.4),
        }
    }
}

impl NewPoolRule {
    pub fn check(&self, m: &TokenMetrics) -> bool {
        m.renounced && m.initial_lp > self.min_initial_lp && m.top10 < self.max_top10
    }
}

/// Market-cap surge alerts
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FdvSurgeRule {
    pub min_pump_5m: Decimal,
    pub max_top10: Decimal,
}

impl Default for FdvSurgeRule {
    fn default() -> Self {
        Self {
            min_pump_5m: dec!(2),
            max_top10: dec!(0.3),
        }
    }
}

impl FdvSurgeRule {
    pub fn check(&self, m: &TokenMetrics) -> bool {
        m.pump_5m > self.min_pump_5m && m.top10 < self.max_top10 && m.is_safe()
    }
}

/// Smart-money heavy buys
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HeavyBoughtRule {
    pub min_pump_5m: Decimal,
    pub max_top10: Decimal,
    /// Required liquidity burn fraction (exact)
    pub lp_burn: Decimal,
    pub min_holders: u64,
    pub min_txs: u64,
    /// Minimum single buy in SOL (inclusive)
    pub min_heavy_bought: Decimal,
    pub min_tx_volume: Decimal,
    pub min_market_cap: Decimal,
}

impl Default for HeavyBoughtRule {
    fn default() -> Self {
        Self {
            min_pump_5m: dec!(1),
            max_top10: dec!(0.3),
            lp_burn: dec!(1),
            min_holders: 50,
            min_txs: 100,
            min_heavy_bought: dec!(10),
            min_tx_volume: dec!(10000),
            min_market_cap: dec!(50000),
        }
    }
}

impl HeavyBoughtRule {
    pub fn check(&self, m: &TokenMetrics) -> bool {
        m.pump_5m > self.min_pump_5m
            && m.top10 < self.max_top10
            && m.lp_burn == self.lp_burn
            && m.holders.is_some_and(|h| h > self.min_holders)
            && m.txs.is_some_and(|t| t > self.min_txs)
            && m.heavy_bought.is_some_and(|b| b >= self.min_heavy_bought)
            && m.tx_volume > self.min_tx_volume
            && m.market_cap > self.min_market_cap
            && m.is_safe()
    }
}

/// KOL accumulation
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KolBuyRule {
    pub min_pump_5m: Decimal,
    pub max_top10: Decimal,
    pub min_holders: u64,
    pub min_txs: u64,
    pub min_tx_volume: Decimal,
    pub min_market_cap: Decimal,
    /// Net KOL inflow in SOL
    pub min_kol_inflow: Decimal,
}

impl Default for KolBuyRule {
    fn default() -> Self {
        Self {
            min_pump_5m: dec!(1),
            max_top10: dec!(0.3),
            min_holders: 100,
            min_txs: 200,
            min_tx_volume: dec!(100000),
            min_market_cap: dec!(100000),
            min_kol_inflow: dec!(2),
        }
    }
}

impl KolBuyRule {
    pub fn check(&self, m: &TokenMetrics) -> bool {
        m.pump_5m > self.min_pump_5m
            && m.top10 < self.max_top10
            && m.holders.is_some_and(|h| h > self.min_holders)
            && m.txs.is_some_and(|t| t > self.min_txs)
            && m.tx_volume > self.min_tx_volume
            && m.market_cap > self.min_market_cap
            && m.kol_inflow.is_some_and(|k| k > self.min_kol_inflow)
    }
}
