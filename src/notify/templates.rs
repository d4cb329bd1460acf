//! HTML alert templates, one per rule class

use crate::decision::ChannelKind;
use crate::types::{keys, TokenRecord};

const CHART_URL: &str = "https://gmgn.ai/sol/token/";

/// Render the alert for a positive verdict
pub fn render(kind: ChannelKind, record: &TokenRecord) -> String {
    match kind {
        ChannelKind::FdvSurge => fdv_surge(record),
        ChannelKind::NewPool => new_pool(record),
        ChannelKind::HeavyBought | ChannelKind::KolBuy => signal(record),
    }
}

pub fn chart_link(ca: &str) -> String {
    format!("{}{}", CHART_URL, ca)
}

/// Market-cap surge alert
pub fn fdv_surge(record: &TokenRecord) -> String {
    let f = |key| field(record, key);
    format!(
        "💊💊 <b>FDV Surge Alert</b>\n\
        ⏰ <b>Alert #{alert}</b>\n\n\
        <b>{symbol}</b> ({name})\n\
        <code>{ca}</code>\n\n\
        💲 Price: {price}   <a href=\"{chart}\">chart</a>\n\
        📈 5m | 1h | 6h: <b>{p5}</b> | <b>{p1}</b> | <b>{p6}</b>\n\
        🎲 5m TXs/Vol: <b>{txs}</b>/<b>{vol}</b>\n\
        💡 MCP: {mcp}\n\
        💧 Liq: {liq}\n\
        👥 Holder: {holder}\n\
        Renounced: {renounced}\n\
        🕒 Open: {open}\n\n\
        {safety}\n\
        TOP 10: {top10}\n\n\
        ⏳ DEV: {dev}",
        alert = record.alert,
        symbol = escape_html(record.symbol()),
        name = f(keys::NAME),
        ca = escape_html(&record.ca),
        price = f(keys::PRICE),
        chart = chart_link(&record.ca),
        p5 = f(keys::PUMP_5M),
        p1 = f(keys::PUMP_1H),
        p6 = f(keys::PUMP_6H),
        txs = f(keys::TXS),
        vol = f(keys::TX_VOL),
        mcp = f(keys::MCP),
        liq = f(keys::LIQ),
        holder = f(keys::HOLDER),
        renounced = flag(record, keys::RENOUNCED),
        open = f(keys::OPEN),
        safety = safety_line(record),
        top10 = f(keys::TOP10),
        dev = f(keys::DEV),
    )
}

/// New liquidity pool alert
pub fn new_pool(record: &TokenRecord) -> String {
    let f = |key| field(record, key);
    format!(
        "💊 <b>New Pool</b>\n\
        ⏰ <b>Alert #{alert}</b>\n\n\
        <b>{symbol}</b> ({name})\n\
        🎲 CA: <code>{ca}</code>\n\
        💧 LP: <code>{lp}</code>\n\n\
        💲 Price: {price}   <a href=\"{chart}\">chart</a>\n\
        💡 MCP: {mcp}\n\
        💧 Liq: {liq}\n\
        💰 Initial LP: {initial_lp}\n\
        👤 Renounced: {renounced}\n\
        👥 Top10: {top10}\n\
        🔥 LP burnt: {lp_burn}",
        alert = record.alert,
        symbol = escape_html(record.symbol()),
        name = f(keys::NAME),
        ca = escape_html(&record.ca),
        lp = f(keys::LP),
        price = f(keys::PRICE),
        chart = chart_link(&record.ca),
        mcp = f(keys::MCP),
        liq = f(keys::LIQ),
        initial_lp = f(keys::INITIAL_LP),
        renounced = flag(record, keys::RENOUNCED),
        top10 = f(keys::TOP10),
        lp_burn = f(keys::LP_BURN),
    )
}

/// Smart-money signal alert, shared by heavy-bought and KOL-buy topics
pub fn signal(record: &TokenRecord) -> String {
    let f = |key| field(record, key);
    let or_zero = |key| {
        record
            .get(key)
            .map(escape_html)
            .unwrap_or_else(|| "0".to_string())
    };
    format!(
        "💊 <b>Heavy Bought {heavy} SOL</b>\n\
        ⏰ <b>Alert #{alert}</b>\n\
        💳 <b>KOL inflow: {inflow} SOL</b>\n\
        💳 <b>KOL Buy/Sell: {buy_sell}</b>\n\n\
        <b>{symbol}</b> ({name})\n\
        <code>{ca}</code>\n\n\
        💲 Price: {price}   <a href=\"{chart}\">chart</a>\n\
        📈 5m | 1h | 6h: <b>{p5}</b> | <b>{p1}</b> | <b>{p6}</b>\n\
        🎲 5m TXs/Vol: <b>{txs}</b>/<b>{vol}</b>\n\
        💡 MCP: {mcp}\n\
        💧 Liq: {liq}\n\
        👥 Holder: {holder}\n\
        🕒 Open: {open}\n\n\
        {safety}\n\
        TOP 10: {top10}\n\n\
        ⏳ DEV: {dev}",
        heavy = or_zero(keys::HEAVY_BOUGHT),
        alert = record.alert,
        inflow = or_zero(keys::KOL_INFLOW),
        buy_sell = or_zero(keys::KOL_BUY_SELL),
        symbol = escape_html(record.symbol()),
        name = f(keys::NAME),
        ca = escape_html(&record.ca),
        price = or_zero(keys::PRICE),
        chart = chart_link(&record.ca),
        p5 = f(keys::PUMP_5M),
        p1 = f(keys::PUMP_1H),
        p6 = f(keys::PUMP_6H),
        txs = f(keys::TXS),
        vol = f(keys::TX_VOL),
        mcp = f(keys::MCP),
        liq = f(keys::LIQ),
        holder = f(keys::HOLDER),
        open = f(keys::OPEN),
        safety = safety_line(record),
        top10 = f(keys::TOP10),
        dev = f(keys::DEV),
    )
}

fn field(record: &TokenRecord, key: &str) -> String {
    record.get(key).map(escape_html).unwrap_or_else(|| "-".to_string())
}

fn flag(record: &TokenRecord, key: &str) -> &'static str {
    match record.get(key) {
        Some("true") => "✅",
        Some("false") => "❌",
        _ => "-",
    }
}

fn safety_line(record: &TokenRecord) -> String {
    format!(
        "{} NoMint / {} Blacklist / {} Burnt",
        flag(record, keys::NO_MINT),
        flag(record, keys::BLACKLIST),
        flag(record, keys::BURNT),
    )
}

/// Escape the characters Telegram's HTML mode treats as markup
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
