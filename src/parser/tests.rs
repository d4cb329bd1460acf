//! Unit tests for alert text extraction

use super::*;

const FDV_SURGE: &str = "**💊💊Pump市值飙升 FDV Surge Alert**

**FDV in 5 min 🟢+$13.3K(+216.9%)**
**🚀 Status进度: 26.41%**

**$GMS**(Global Meme Syndrome)
`7ra5yfLeqDAkjG6CEbQoc5TJwbAYg5gydBEpjRpwpump`

📈 5m | 1h | 6h: **222.9%** | **222.9%** | **211.9%**
🎲 5m TXs/Vol:**201**/**$26.4K*
💡 MCP: $19.7K
💧 Liq: 25.14 SOL ($10.3K 🔥100%)
👥 Holder: 87
 Renounced: '✅'
🕒 Open: 4min ago

✅ NoMint / ✅Blacklist / ✅Burnt
✅TOP 10: 21.53%

⏳ DEV: 🚨 Sell All
👨‍🍳 DEV Burnt烧币: -";

const NEW_POOL: &str = "momo (Momo)

💊 NewPool新池子 (Pump)    Pump信号频道
🎲 CA: `6H9YAME9FjXRmCWBph7opjMcMEULvse2Hqon4C7zpump`
💧 LP: `7JxWAnYij41SD6U2rUyE7tPnr35Rd12Fq5rwvgA7z6q8`

💲 Price: $0.0{4}8188    Chart看K线
🎯 Dex: Raydium
💡 MCP: $81880.79
💧 Liq池子: $33890.14 (79.01 SOL)
💰 Initial LP底池: 20.7%


👤 Renounced已弃权: ✅
👥 Top10 前10持仓: 34.01% ❌
🔥 烧池子: 100%%


👨🏻‍💻 Dev Wallet作者钱包:
- Balance SOL: 23.13574
- Balance USD: $4961.0023
  - 🟢 Rich Dev作者挺有钱

🐦  Twitter | 💊  Pump

🌈 NEW: Add BlueChip Index to identify high-growth tokens GMGN.AI";

const HEAVY_BOUGHT: &str = "**💊Heavy Bought💊**

**💵 ****7jjw...cAC2**** Heavy Bought 17.76 SOL**

**$ELIZA**(Eliza)
`5voS9evDjxF589WuEub5i4ti7FWQmZCsAsyD5ucbuRqM`

📈 5m | 1h | 6h: **11.95%** | **-16.6%** | **>99999%**
🎲 5m TXs/Vol: **1274**/**$1.3M**
💡 MCP: **$72.6M**
💧 Liq: **161.99** **SOL** ($80K 🔥97.34%)
👥 Holder: **10967**
🕒 Open: **5h** **ago**

✅ NoMint / ✅Blacklist / ✅Burnt
❌TOP 10: **35.9%**

⏳ DEV: 🚨 Sell All
👨‍🍳 DEV Burnt烧币: -

Backup BOT: US | 01 | 02 | 03 | 04

🌏 Website

📢 **NEW:** Quickly **Auto-sell** Sol Meme on GMGN.ai";

const KOL_BUY: &str = "** 3 KOL Buy ****$MIKU****!**
🟢🟢🟢

**💵 KOL Inflow净流入:$-434.6119K(1.8325K Sol) **
**💳 KOL Buy/Sell:4/1**

**$$MIKU**(HATSUNE MIKU)
`C89bsKbhbJyoY6ssu4m1oX1dwRvJngNc6nV2Q6tBpump`

📈 5m | 1h | 6h: **35.34%** | **-47.86%** | **11.4K%**
🎲 5m TXs/Vol: **283**/**$115.6K**
💡 MCP: **$2.1M**
💧 Liq: **161.99** **SOL** ($80K 🔥97.34%)
👥 Holder: **3319**

✅ NoMint / ✅Blacklist / ❌Burnt
✅TOP 10: **15.03%**

nostaIgicgareth (🎲, 🎲) **3s ago**
📈Cost **$0.00223** B/S:**1**/**0**
⏳Holding **$140.1303**(**0.59084 Sol**)

⚡️ **TIP:** Discover **faster**, Trading **in seconds** GMGN.ai";

#[test]
fn test_fdv_surge_alert() {
    let fields = extract(FDV_SURGE);

    assert_eq!(fields.get("symbol"), Some("GMS"));
    assert_eq!(fields.get("name"), Some("Global Meme Syndrome"));
    assert_eq!(fields.ca(), Some("7ra5yfLeqDAkjG6CEbQoc5TJwbAYg5gydBEpjRpwpump"));
    assert_eq!(fields.get("status"), Some("26.41%"));
    assert_eq!(fields.get("pump5m"), Some("222.9%"));
    assert_eq!(fields.get("pump1h"), Some("222.9%"));
    assert_eq!(fields.get("pump6h"), Some("211.9%"));
    assert_eq!(fields.get("txs"), Some("201"));
    assert_eq!(fields.get("txvol"), Some("26.4K"));
    assert_eq!(fields.get("mcp"), Some("$19.7K"));
    assert_eq!(fields.get("liq"), Some("10.3K"));
    assert_eq!(fields.get("lpburn"), Some("100%"));
    assert_eq!(fields.get("holder"), Some("87"));
    assert_eq!(fields.get("renounced"), Some("true"));
    assert_eq!(fields.get("open"), Some("4min ago"));
    assert_eq!(fields.get("nomint"), Some("true"));
    assert_eq!(fields.get("blacklist"), Some("true"));
    assert_eq!(fields.get("burnt"), Some("true"));
    assert_eq!(fields.get("top10"), Some("21.53%"));
    assert_eq!(fields.get("dev"), Some("Sell All"));
    assert!(!fields.contains("devburnt"));
}

#[test]
fn test_new_pool_alert() {
    let fields = extract(NEW_POOL);

    assert_eq!(fields.ca(), Some("6H9YAME9FjXRmCWBph7opjMcMEULvse2Hqon4C7zpump"));
    assert_eq!(fields.get("lp"), Some("7JxWAnYij41SD6U2rUyE7tPnr35Rd12Fq5rwvgA7z6q8"));
    assert_eq!(fields.get("dex"), Some("Raydium"));
    assert_eq!(fields.get("mcp"), Some("$81880.79"));
    assert_eq!(fields.get("liq"), Some("33890.14"));
    assert_eq!(fields.get("initiallp"), Some("20.7%"));
    assert_eq!(fields.get("renounced"), Some("true"));
    assert_eq!(fields.get("top10"), Some("34.01%"));
    assert_eq!(fields.get("balancesol"), Some("23.13574"));
    assert!(fields.get("price").unwrap().starts_with("$0.0{4}8188"));
    // Noise lines
    assert!(!fields.contains("new"));
    assert!(!fields.contains("devwallet"));
    assert!(!fields.contains("symbol"));
}

#[test]
fn test_heavy_bought_alert() {
    let fields = extract(HEAVY_BOUGHT);

    assert_eq!(fields.get("heavybought"), Some("17.76"));
    assert_eq!(fields.get("symbol"), Some("ELIZA"));
    assert_eq!(fields.get("name"), Some("Eliza"));
    assert_eq!(fields.ca(), Some("5voS9evDjxF589WuEub5i4ti7FWQmZCsAsyD5ucbuRqM"));
    assert_eq!(fields.get("pump6h"), Some(">99999%"));
    assert_eq!(fields.get("txs"), Some("1274"));
    assert_eq!(fields.get("txvol"), Some("1.3M"));
    assert_eq!(fields.get("mcp"), Some("$72.6M"));
    assert_eq!(fields.get("liq"), Some("80K"));
    assert_eq!(fields.get("lpburn"), Some("97.34%"));
    assert_eq!(fields.get("holder"), Some("10967"));
    assert_eq!(fields.get("open"), Some("5h ago"));
    assert_eq!(fields.get("top10"), Some("35.9%"));
    assert!(!fields.contains("backupbot"));
    assert!(!fields.contains("new"));
    assert_eq!(fields.len(), 19);
}

#[test]
fn test_kol_buy_alert() {
    let fields = extract(KOL_BUY);

    assert_eq!(fields.get("kolinflow"), Some("1.8325K"));
    assert_eq!(fields.get("kolbuysell"), Some("4/1"));
    assert_eq!(fields.get("symbol"), Some("$MIKU"));
    assert_eq!(fields.get("name"), Some("HATSUNE MIKU"));
    assert_eq!(fields.get("pump6h"), Some("11.4K%"));
    assert_eq!(fields.get("burnt"), Some("false"));
    assert_eq!(fields.get("nomint"), Some("true"));
    // Trader rows under the header must not leak into token fields
    assert_eq!(fields.get("pump5m"), Some("35.34%"));
    assert_eq!(fields.get("txs"), Some("283"));
    assert!(!fields.contains("tip"));
    assert!(!fields.contains("heavybought"));
}

#[test]
fn test_extract_is_deterministic() {
    assert_eq!(extract(KOL_BUY), extract(KOL_BUY));
    assert_eq!(extract(NEW_POOL), extract(NEW_POOL));
}

#[test]
fn test_missing_address_yields_no_ca() {
    let fields = extract("💡 MCP: $19.7K\n👥 Holder: 87\n`not-an-address`");
    assert!(fields.ca().is_none());
    assert_eq!(fields.get("holder"), Some("87"));
}

#[test]
fn test_address_charset_is_enforced() {
    // 0, O, I and l are outside the base58 alphabet
    let fields = extract("`0OIl1111111111111111111111111111111`");
    assert!(fields.ca().is_none());
}

#[test]
fn test_garbage_input_never_panics() {
    for text in ["", "\n\n", ":::", "$", "$(", "`", "💧", "✅ / ❌ /", "a:b:c"] {
        let _ = extract(text);
    }
    assert_eq!(extract("a:b:c").get("a"), Some("b:c"));
}

#[test]
fn test_key_normalization() {
    let fields = extract("👤 Some Key已弃权 : ✔\n- Balance USD: $4961.0023");
    assert_eq!(fields.get("somekey"), Some("true"));
    assert_eq!(fields.get("balanceusd"), Some("$4961.0023"));
}

#[test]
fn test_cross_mark_maps_to_false() {
    let fields = extract("Renounced: '❌'\nHoneypot: ✘");
    assert_eq!(fields.get("renounced"), Some("false"));
    assert_eq!(fields.get("honeypot"), Some("false"));
}

#[test]
fn test_glyph_table() {
    for c in ['✅', '✓', '☑', '✔'] {
        assert_eq!(glyph_to_bool(c), Some(true));
    }
    for c in ['❌', '✗', '☒', '✘'] {
        assert_eq!(glyph_to_bool(c), Some(false));
    }
    assert_eq!(glyph_to_bool('🚨'), None);
}

#[test]
fn test_leading_glyph_keeps_value() {
    let fields = extract("👥 Top10: ✅ 45%\n👤 Renounced: ✅\nMint: ❌️");
    assert_eq!(fields.get("top10"), Some("45%"));
    assert_eq!(fields.get("renounced"), Some("true"));
    assert_eq!(fields.get("mint"), Some("false"));
}

#[test]
fn test_burn_flags_with_variation_selector() {
    let fields = extract("✔️ NoMint / ✔️Blacklist / ❌️Burnt");
    assert_eq!(fields.get("nomint"), Some("true"));
    assert_eq!(fields.get("blacklist"), Some("true"));
    assert_eq!(fields.get("burnt"), Some("false"));
    assert!(!fields.contains("\u{FE0F}nomint"));
}
