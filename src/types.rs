//! Core data types shared by the extractor, the cache and the rules

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Well-known field names.
///
/// The extractor may produce any other key as well; unknown keys are carried
/// through the merge and the cache untouched.
pub mod keys {
    pub const CA: &str = "ca";
    pub const LP: &str = "lp";
    pub const SYMBOL: &str = "symbol";
    pub const NAME: &str = "name";
    pub const PRICE: &str = "price";
    pub const MCP: &str = "mcp";
    pub const LIQ: &str = "liq";
    pub const LP_BURN: &str = "lpburn";
    pub const INITIAL_LP: &str = "initiallp";
    pub const HOLDER: &str = "holder";
    pub const TOP10: &str = "top10";
    pub const PUMP_5M: &str = "pump5m";
    pub const PUMP_1H: &str = "pump1h";
    pub const PUMP_6H: &str = "pump6h";
    pub const TXS: &str = "txs";
    pub const TX_VOL: &str = "txvol";
    pub const RENOUNCED: &str = "renounced";
    pub const NO_MINT: &str = "nomint";
    pub const BLACKLIST: &str = "blacklist";
    pub const BURNT: &str = "burnt";
    pub const HEAVY_BOUGHT: &str = "heavybought";
    pub const KOL_INFLOW: &str = "kolinflow";
    pub const KOL_BUY_SELL: &str = "kolbuysell";
    pub const OPEN: &str = "open";
    pub const DEV: &str = "dev";
    pub const ALERT: &str = "alert";
}

/// Output of the field extractor: normalized lowercase key -> string value.
///
/// Booleans are stored as `"true"` / `"false"`, numbers and percentages in
/// their original textual form. Coercion happens once, in
/// [`crate::decision::TokenMetrics`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldMap(BTreeMap<String, String>);

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn insert_bool(&mut self, key: impl Into<String>, value: bool) {
        self.insert(key, if value { "true" } else { "false" });
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Contract address, if the text carried one
    pub fn ca(&self) -> Option<&str> {
        self.get(keys::CA)
    }
}

impl FromIterator<(String, String)> for FieldMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// Records written by older producers may hold JSON booleans or numbers;
// scalars are stringified and nulls dropped.
impl<'de> Deserialize<'de> for FieldMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, serde_json::Value>::deserialize(deserializer)?;
        Ok(raw
            .into_iter()
            .filter_map(|(key, value)| {
                let value = match value {
                    serde_json::Value::String(s) => s,
                    serde_json::Value::Bool(b) => b.to_string(),
                    serde_json::Value::Number(n) => n.to_string(),
                    _ => return None,
                };
                Some((key, value))
            })
            .collect())
    }
}

/// Last-known merged state of a token, keyed by contract address.
///
/// Serialized as one flat JSON object:
/// `{"ca": "...", "alert": 2, "symbol": "...", ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub ca: String,
    /// Number of positive verdicts seen for this token
    #[serde(default)]
    pub alert: u32,
    #[serde(flatten)]
    pub fields: FieldMap,
}

impl TokenRecord {
    /// Start a record from the first field map seen for a token.
    /// Returns `None` when the map has no contract address.
    pub fn from_fields(fields: &FieldMap) -> Option<Self> {
        let ca = fields.ca()?.to_string();
        let mut record = Self {
            ca,
            alert: 0,
            fields: FieldMap::new(),
        };
        record.merge(fields);
        Some(record)
    }

    /// Fold incoming fields onto this record.
    ///
    /// Present non-empty fields overwrite, absent fields leave the cached
    /// value alone. `ca` and `alert` are never taken from incoming text.
    pub fn merge(&mut self, incoming: &FieldMap) {
        for (key, value) in incoming.iter() {
            if key == keys::CA || key == keys::ALERT || value.is_empty() {
                continue;
            }
            self.fields.insert(key, value);
        }
    }

    /// Record a positive verdict
    pub fn bump_alert(&mut self) -> u32 {
        self.alert = self.alert.saturating_add(1);
        self.alert
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key)
    }

    pub fn symbol(&self) -> &str {
        self.get(keys::SYMBOL).unwrap_or("?")
    }
}
