//! Alert text extraction
//!
//! Turns the semi-structured alert posts of the signal channels into a
//! [`FieldMap`]. Processing is line by line; each line is tried against a
//! fixed list of shapes and the first one that matches wins:
//!
//! 1. `$SYM(Name)` symbol line
//! 2. a backtick-quoted base58 address
//! 3. a marker glyph line with its own pattern (inflow, KOL buy/sell,
//!    price change, tx volume, burn flags, liquidity)
//! 4. a generic `key: value` line
//!
//! Lines matching nothing are skipped. Extraction never fails; text without
//! a contract address yields a map without `ca`.

pub mod numeric;

#[cfg(test)]
mod tests;

pub use numeric::{currency_to_number, percent_to_decimal};

use crate::types::{keys, FieldMap};
use once_cell::sync::Lazy;
use regex::Regex;

static EMOJI: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"[\u{200D}\u{2300}-\u{23FF}\u{2600}-\u{27BF}\u{2B00}-\u{2BFF}\u{FE00}-\u{FE0F}\u{1F100}-\u{1F2FF}\u{1F300}-\u{1FAFF}]",
    )
    .expect("valid emoji regex")
});

static CJK: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\u{4E00}-\u{9FFF}]").expect("valid cjk regex"));

static SYMBOL_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\$(\S+?)\s*\((.+)\)\s*$").expect("valid symbol regex"));

static QUOTED: Lazy<Regex> = Lazy::new(|| Regex::new(r"`([^`]+)`").expect("valid quote regex"));

static BASE58_ADDRESS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[1-9A-HJ-NP-Za-km-z]{32,44}$").expect("valid base58 regex"));

static KOL_INFLOW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"KOL Inflow[^:]*:\s*\$[-\d.]+[KMB]?\s*\(\s*([-\d.]+[KMB]?)\s*(?i:sol)\)")
        .expect("valid inflow regex")
});

static HEAVY_BOUGHT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)heavy bought\s+([\d.]+[KMB]?)\s*sol").expect("valid heavy bought regex")
});

static KOL_BUY_SELL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"KOL Buy/Sell:\s*(\d+/\d+)").expect("valid buy/sell regex"));

static PRICE_CHANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(\d+m)\s*\|\s*(\d+h)\s*\|\s*(\d+h):\s*([-+>\d.]+K?%)\s*\|\s*([-+>\d.]+K?%)\s*\|\s*([-+>\d.]+K?%)",
    )
    .expect("valid price change regex")
});

static TX_VOLUME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+m)\s*TXs/Vol:\s*(\d+)\s*/\s*\$([\d.]+[KMB]?)").expect("valid tx volume regex")
});

static BURN_FLAGS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[✅❌✓✔✗✘☑☒]\u{FE0F}?\s*Burnt").expect("valid burn regex"));

static LIQUIDITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Liq:\s*([\d,.]+[KM]?)\s*SOL\s*\(\$([\d.]+[KMB]?)\s*🔥\s*([\d.]+%)\)")
        .expect("valid liquidity regex")
});

static LIQUIDITY_USD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Liq[^:]*:\s*\$([\d,.]+[KMB]?)\s*\(\s*[\d,.]+[KMB]?\s*SOL\s*\)")
        .expect("valid usd liquidity regex")
});

/// Emoji presentation selector trailing glyphs like `✔️`
const VARIATION_SELECTOR: char = '\u{FE0F}';

/// Keys that parse as `key: value` but only carry noise
const IGNORED_KEYS: &[&str] = &["devburnt", "backupbot", "new", "tip"];

/// Map a check/cross glyph to its boolean meaning
pub fn glyph_to_bool(c: char) -> Option<bool> {
    match c {
        '✅' | '✓' | '☑' | '✔' => Some(true),
        '❌' | '✗' | '☒' | '✘' => Some(false),
        _ => None,
    }
}

/// Extract every recognizable field from an alert post
pub fn extract(text: &str) -> FieldMap {
    let mut fields = FieldMap::new();

    for raw in text.lines() {
        let line = raw.replace('*', "");
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        extract_line(line, &mut fields);
    }

    fields
}

fn extract_line(line: &str, fields: &mut FieldMap) {
    if symbol_line(line, fields) || address_line(line, fields) {
        return;
    }
    if let Some(marker) = Marker::detect(line) {
        marker.extract(line, fields);
        return;
    }
    key_value_line(line, fields);
}

fn symbol_line(line: &str, fields: &mut FieldMap) -> bool {
    let Some(caps) = SYMBOL_LINE.captures(line) else {
        return false;
    };
    fields.insert(keys::SYMBOL, caps[1].trim());
    fields.insert(keys::NAME, caps[2].trim());
    true
}

fn address_line(line: &str, fields: &mut FieldMap) -> bool {
    let Some(caps) = QUOTED.captures(line) else {
        return false;
    };
    let candidate = caps[1].trim();
    if !BASE58_ADDRESS.is_match(candidate) {
        return false;
    }

    // `LP: `addr`` lines name the pool, not the token
    let label = caps
        .get(0)
        .map(|m| &line[..m.start()])
        .and_then(|prefix| prefix.split_once(':'))
        .map(|(label, _)| normalize_key(label));

    let key = match label.as_deref() {
        Some(keys::LP) => keys::LP,
        _ => keys::CA,
    };
    fields.insert(key, candidate);
    true
}

/// Lines introduced by a glyph with a dedicated pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    Inflow,
    KolBuySell,
    PriceChange,
    TxVolume,
    BurnFlags,
    Liquidity,
}

impl Marker {
    fn detect(line: &str) -> Option<Self> {
        if line.contains('💵') {
            Some(Self::Inflow)
        } else if line.contains('💳') {
            Some(Self::KolBuySell)
        } else if line.contains('📈') {
            Some(Self::PriceChange)
        } else if line.contains('🎲') {
            Some(Self::TxVolume)
        } else if BURN_FLAGS.is_match(line) {
            Some(Self::BurnFlags)
        } else if line.contains('💧') {
            Some(Self::Liquidity)
        } else {
            None
        }
    }

    fn extract(self, line: &str, fields: &mut FieldMap) {
        match self {
            Self::Inflow => {
                if let Some(caps) = KOL_INFLOW.captures(line) {
                    fields.insert(keys::KOL_INFLOW, &caps[1]);
                } else if let Some(caps) = HEAVY_BOUGHT.captures(line) {
                    fields.insert(keys::HEAVY_BOUGHT, &caps[1]);
                }
            }
            Self::KolBuySell => {
                if let Some(caps) = KOL_BUY_SELL.captures(line) {
                    fields.insert(keys::KOL_BUY_SELL, &caps[1]);
                }
            }
            Self::PriceChange => {
                if let Some(caps) = PRICE_CHANGE.captures(line) {
                    for (horizon, value) in [(1, 4), (2, 5), (3, 6)] {
                        fields.insert(format!("pump{}", &caps[horizon]), &caps[value]);
                    }
                }
            }
            Self::TxVolume => {
                if let Some(caps) = TX_VOLUME.captures(line) {
                    fields.insert(keys::TXS, &caps[2]);
                    fields.insert(keys::TX_VOL, &caps[3]);
                }
            }
            Self::BurnFlags => {
                for item in line.split('/') {
                    let item: String = item
                        .chars()
                        .filter(|c| !c.is_whitespace() && *c != VARIATION_SELECTOR)
                        .collect();
                    let mut chars = item.chars();
                    let Some(value) = chars.next().and_then(glyph_to_bool) else {
                        continue;
                    };
                    let key = chars.as_str().to_lowercase();
                    if !key.is_empty() {
                        fields.insert_bool(key, value);
                    }
                }
            }
            Self::Liquidity => {
                if let Some(caps) = LIQUIDITY.captures(line) {
                    fields.insert(keys::LIQ, &caps[2]);
                    fields.insert(keys::LP_BURN, &caps[3]);
                } else if let Some(caps) = LIQUIDITY_USD.captures(line) {
                    fields.insert(keys::LIQ, &caps[1]);
                }
            }
        }
    }
}

fn key_value_line(line: &str, fields: &mut FieldMap) {
    let Some((key, value)) = line.split_once(':') else {
        return;
    };

    let key = normalize_key(key);
    if key.is_empty() || IGNORED_KEYS.contains(&key.as_str()) {
        return;
    }

    let value = normalize_value(value);
    if !value.is_empty() {
        fields.insert(key, value);
    }
}

/// Lowercase, emoji-free, whitespace-free key. Bilingual labels
/// (`Renounced已弃权`) keep only the part before the CJK translation.
fn normalize_key(raw: &str) -> String {
    let without_emoji = EMOJI.replace_all(raw, "");
    let label = match CJK.find(&without_emoji) {
        Some(m) if !without_emoji[..m.start()].trim().is_empty() => {
            without_emoji[..m.start()].to_string()
        }
        _ => CJK.replace_all(&without_emoji, "").into_owned(),
    };

    label
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_string()
}

fn normalize_value(raw: &str) -> String {
    let value = CJK.replace_all(raw.trim(), "");

    // `'✅'` carries the glyph after a quote. A leading glyph only counts
    // when it is the whole value; `✅ 45%` keeps its number.
    let mut chars = value.chars();
    let first = chars.next();
    let second = chars.next();
    if let Some(flag) = second.and_then(glyph_to_bool) {
        return flag.to_string();
    }
    if chars.as_str().is_empty() && second.map_or(true, |c| c == VARIATION_SELECTOR) {
        if let Some(flag) = first.and_then(glyph_to_bool) {
            return flag.to_string();
        }
    }

    EMOJI.replace_all(&value, "").trim().to_string()
}
