//! Channel rule engine
//!
//! Picks a rule class from the `(channel, child)` tags of a message and
//! evaluates it against the typed view of a merged [`TokenRecord`].

pub mod rules;

#[cfg(test)]
mod tests;

pub use rules::{FdvSurgeRule, HeavyBoughtRule, KolBuyRule, NewPoolRule, RuleConfig};

use crate::parser::numeric::{parse_amount, parse_count, parse_price};
use crate::parser::{currency_to_number, percent_to_decimal};
use crate::types::{keys, TokenRecord};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The rule classes known to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// New liquidity pool channel (any child)
    NewPool,
    /// Market-cap surge channel (any child)
    FdvSurge,
    /// Signal channel, heavy-bought topic
    HeavyBought,
    /// Signal channel, KOL-buy topic
    KolBuy,
}

impl ChannelKind {
    pub fn label(&self) -> &'static str {
        match self {
            ChannelKind::NewPool => "new_pool",
            ChannelKind::FdvSurge => "fdv_surge",
            ChannelKind::HeavyBought => "heavy_bought",
            ChannelKind::KolBuy => "kol_buy",
        }
    }
}

/// Tags producers put in the `channel` / `child` envelope fields
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Channel tag of the new-pool feed
    pub new_pool: String,
    /// Channel tag of the market-cap surge feed
    pub fdv_surge: String,
    /// Channel tag of the smart-money signal feed
    pub signal: String,
    /// Child tag of the heavy-bought topic inside the signal feed
    pub heavy_bought: String,
    /// Child tag of the KOL-buy topic inside the signal feed
    pub kol_buy: String,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            new_pool: "new_pool".to_string(),
            fdv_surge: "fdv_surge".to_string(),
            signal: "signal".to_string(),
            heavy_bought: "heavy_bought".to_string(),
            kol_buy: "kol_buy".to_string(),
        }
    }
}

impl ChannelConfig {
    /// Resolve the rule class for a pair of tags
    pub fn classify(&self, channel: &str, child: &str) -> Option<ChannelKind> {
        if channel == self.new_pool {
            Some(ChannelKind::NewPool)
        } else if channel == self.fdv_surge {
            Some(ChannelKind::FdvSurge)
        } else if channel == self.signal && child == self.heavy_bought {
            Some(ChannelKind::HeavyBought)
        } else if channel == self.signal && child == self.kol_buy {
            Some(ChannelKind::KolBuy)
        } else {
            None
        }
    }
}

/// Typed view of a token record, coerced once per merge.
///
/// Fractions come from percentage strings (`"21.53%"` -> 0.2153) and default
/// to zero; amounts come from currency strings (`"$26.4K"` -> 26400) and
/// default to zero; counts stay `None` when absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenMetrics {
    pub renounced: bool,
    pub no_mint: bool,
    pub blacklist: bool,
    pub burnt: bool,
    pub initial_lp: Decimal,
    pub top10: Decimal,
    pub pump_5m: Decimal,
    pub lp_burn: Decimal,
    pub holders: Option<u64>,
    pub txs: Option<u64>,
    pub tx_volume: Decimal,
    pub market_cap: Decimal,
    pub heavy_bought: Option<Decimal>,
    pub kol_inflow: Option<Decimal>,
    pub price: Option<Decimal>,
}

impl TokenMetrics {
    pub fn from_record(record: &TokenRecord) -> Self {
        let flag = |key: &str| record.get(key).is_some_and(|v| v.eq_ignore_ascii_case("true"));

        Self {
            renounced: flag(keys::RENOUNCED),
            no_mint: flag(keys::NO_MINT),
            blacklist: flag(keys::BLACKLIST),
            burnt: flag(keys::BURNT),
            initial_lp: percent_to_decimal(record.get(keys::INITIAL_LP)),
            top10: percent_to_decimal(record.get(keys::TOP10)),
            pump_5m: percent_to_decimal(record.get(keys::PUMP_5M)),
            lp_burn: percent_to_decimal(record.get(keys::LP_BURN)),
            holders: record.get(keys::HOLDER).and_then(parse_count),
            txs: record.get(keys::TXS).and_then(parse_count),
            tx_volume: currency_to_number(record.get(keys::TX_VOL)),
            market_cap: currency_to_number(record.get(keys::MCP)),
            heavy_bought: record.get(keys::HEAVY_BOUGHT).and_then(parse_amount),
            kol_inflow: record.get(keys::KOL_INFLOW).and_then(parse_amount),
            price: record.get(keys::PRICE).and_then(parse_price),
        }
    }

    /// Mint disabled, blacklist disabled and liquidity burnt
    pub fn is_safe(&self) -> bool {
        self.no_mint && self.blacklist && self.burnt
    }
}

/// Verdict of one evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub kind: Option<ChannelKind>,
    pub actionable: bool,
}

/// Rule engine: channel lookup plus thresholds
#[derive(Debug, Clone, Default)]
pub struct DecisionEngine {
    channels: ChannelConfig,
    rules: RuleConfig,
}

impl DecisionEngine {
    pub fn new(channels: ChannelConfig, rules: RuleConfig) -> Self {
        Self { channels, rules }
    }

    pub fn channels(&self) -> &ChannelConfig {
        &self.channels
    }

    /// Evaluate the rule selected by `(channel, child)`.
    /// Unknown pairs are never actionable.
    pub fn evaluate(&self, channel: &str, child: &str, metrics: &TokenMetrics) -> bool {
        self.decide(channel, child, metrics).actionable
    }

    /// Like [`evaluate`](Self::evaluate) but also reports the rule class used
    pub fn decide(&self, channel: &str, child: &str, metrics: &TokenMetrics) -> Decision {
        let kind = self.channels.classify(channel, child);
        let actionable = kind.is_some_and(|k| self.check(k, metrics));
        Decision { kind, actionable }
    }

    pub fn check(&self, kind: ChannelKind, metrics: &TokenMetrics) -> bool {
        match kind {
            ChannelKind::NewPool => self.rules.new_pool.check(metrics),
            ChannelKind::FdvSurge => self.rules.fdv_surge.check(metrics),
            ChannelKind::HeavyBought => self.rules.heavy_bought.check(metrics),
            ChannelKind::KolBuy => self.rules.kol_buy.check(metrics),
        }
    }
}
