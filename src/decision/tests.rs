//! Unit tests for the rule engine

use super::*;
use crate::types::FieldMap;
use rust_decimal_macros::dec;

fn record(pairs: &[(&str, &str)]) -> TokenRecord {
    let mut fields: FieldMap = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    fields.insert("ca", "7ra5yfLeqDAkjG6CEbQoc5TJwbAYg5gydBEpjRpwpump");
    TokenRecord::from_fields(&fields).unwrap()
}

fn metrics(pairs: &[(&str, &str)]) -> TokenMetrics {
    TokenMetrics::from_record(&record(pairs))
}

fn engine() -> DecisionEngine {
    DecisionEngine::default()
}

fn heavy_bought_fields() -> Vec<(&'static str, &'static str)> {
    vec![
        ("pump5m", "150%"),
        ("top10", "21%"),
        ("lpburn", "100%"),
        ("holder", "900"),
        ("txs", "1274"),
        ("heavybought", "17.76"),
        ("txvol", "1.3M"),
        ("mcp", "$72.6M"),
        ("nomint", "true"),
        ("blacklist", "true"),
        ("burnt", "true"),
    ]
}

fn kol_buy_fields() -> Vec<(&'static str, &'static str)> {
    vec![
        ("pump5m", "135.34%"),
        ("top10", "15.03%"),
        ("holder", "3319"),
        ("txs", "283"),
        ("txvol", "115.6K"),
        ("mcp", "$2.1M"),
        ("kolinflow", "1.8325K"),
    ]
}

#[test]
fn test_metrics_coercion() {
    let m = metrics(&[
        ("renounced", "true"),
        ("nomint", "false"),
        ("initiallp", "25%"),
        ("top10", "35%"),
        ("holder", "3,319"),
        ("txvol", "$315.8K"),
        ("price", "$0.0{4}8188"),
    ]);

    assert!(m.renounced);
    assert!(!m.no_mint);
    assert_eq!(m.initial_lp, dec!(0.25));
    assert_eq!(m.top10, dec!(0.35));
    assert_eq!(m.holders, Some(3319));
    assert_eq!(m.txs, None);
    assert_eq!(m.tx_volume, dec!(315800));
    assert_eq!(m.market_cap, Decimal::ZERO);
    assert_eq!(m.price, Some(dec!(0.00008188)));
}

#[test]
fn test_new_pool_accept() {
    let m = metrics(&[("renounced", "true"), ("initiallp", "25%"), ("top10", "35%")]);
    assert!(engine().evaluate("new_pool", "", &m));
}

#[test]
fn test_new_pool_reject_concentrated_holders() {
    let m = metrics(&[("renounced", "true"), ("initiallp", "25%"), ("top10", "45%")]);
    assert!(!engine().evaluate("new_pool", "", &m));
}

#[test]
fn test_new_pool_rejects_flagged_concentration() {
    let fields = crate::parser::extract(
        "$AAA(Alpha)\n`7ra5yfLeqDAkjG6CEbQoc5TJwbAYg5gydBEpjRpwpump`\n\
         👥 Top10: ✅ 45%\n👤 Renounced: ✅\n💰 Initial LP: 25%",
    );
    let m = TokenMetrics::from_record(&TokenRecord::from_fields(&fields).unwrap());

    assert_eq!(m.top10, dec!(0.45));
    assert!(!engine().evaluate("new_pool", "", &m));
}

#[test]
fn test_new_pool_reject_not_renounced() {
    let m = metrics(&[("renounced", "false"), ("initiallp", "25%"), ("top10", "35%")]);
    assert!(!engine().evaluate("new_pool", "", &m));
}

#[test]
fn test_new_pool_ignores_child_tag() {
    let m = metrics(&[("renounced", "true"), ("initiallp", "25%"), ("top10", "35%")]);
    assert!(engine().evaluate("new_pool", "12345", &m));
}

#[test]
fn test_fdv_surge() {
    let mut pairs = vec![
        ("pump5m", "222.9%"),
        ("top10", "21.53%"),
        ("nomint", "true"),
        ("blacklist", "true"),
        ("burnt", "true"),
    ];
    assert!(engine().evaluate("fdv_surge", "", &metrics(&pairs)));

    pairs[4] = ("burnt", "false");
    assert!(!engine().evaluate("fdv_surge", "", &metrics(&pairs)));
}

#[test]
fn test_heavy_bought_accept() {
    let m = metrics(&heavy_bought_fields());
    assert!(engine().evaluate("signal", "heavy_bought", &m));
}

#[test]
fn test_heavy_bought_requires_full_burn() {
    let mut pairs = heavy_bought_fields();
    pairs[2] = ("lpburn", "97.34%");
    assert!(!engine().evaluate("signal", "heavy_bought", &metrics(&pairs)));
}

#[test]
fn test_heavy_bought_boundary_is_inclusive() {
    let mut pairs = heavy_bought_fields();
    pairs[5] = ("heavybought", "10");
    assert!(engine().evaluate("signal", "heavy_bought", &metrics(&pairs)));

    pairs[5] = ("heavybought", "9.99");
    assert!(!engine().evaluate("signal", "heavy_bought", &metrics(&pairs)));
}

#[test]
fn test_heavy_bought_missing_count_rejects() {
    let pairs: Vec<_> = heavy_bought_fields()
        .into_iter()
        .filter(|(k, _)| *k != "holder")
        .collect();
    assert!(!engine().evaluate("signal", "heavy_bought", &metrics(&pairs)));
}

#[test]
fn test_kol_buy_accept() {
    let m = metrics(&kol_buy_fields());
    assert_eq!(m.kol_inflow, Some(dec!(1832.5)));
    assert!(engine().evaluate("signal", "kol_buy", &m));
}

#[test]
fn test_kol_buy_reject_weak_inflow() {
    let mut pairs = kol_buy_fields();
    pairs[6] = ("kolinflow", "1.5");
    assert!(!engine().evaluate("signal", "kol_buy", &metrics(&pairs)));
}

#[test]
fn test_signal_channel_needs_known_child() {
    let m = metrics(&kol_buy_fields());
    assert!(!engine().evaluate("signal", "", &m));
    assert!(!engine().evaluate("signal", "other_topic", &m));
}

#[test]
fn test_unknown_channel_is_false() {
    let m = metrics(&[("renounced", "true"), ("initiallp", "25%"), ("top10", "35%")]);
    let decision = engine().decide("mystery", "x", &m);

    assert_eq!(decision.kind, None);
    assert!(!decision.actionable);
    assert!(!engine().evaluate("", "", &TokenMetrics::default()));
}

#[test]
fn test_evaluation_is_deterministic() {
    let m = metrics(&heavy_bought_fields());
    let engine = engine();
    let first = engine.evaluate("signal", "heavy_bought", &m);
    for _ in 0..5 {
        assert_eq!(engine.evaluate("signal", "heavy_bought", &m), first);
    }
}

#[test]
fn test_custom_channel_tags() {
    let channels = ChannelConfig {
        new_pool: "-100200".to_string(),
        fdv_surge: "-100300".to_string(),
        signal: "-100400".to_string(),
        heavy_bought: "11".to_string(),
        kol_buy: "22".to_string(),
    };
    let engine = DecisionEngine::new(channels, RuleConfig::default());

    assert_eq!(engine.channels().classify("-100400", "22"), Some(ChannelKind::KolBuy));
    assert_eq!(engine.channels().classify("-100400", "11"), Some(ChannelKind::HeavyBought));
    assert_eq!(engine.channels().classify("-100300", "99"), Some(ChannelKind::FdvSurge));
    assert_eq!(engine.channels().classify("new_pool", ""), None);
}

#[test]
fn test_thresholds_from_toml() {
    let rules: RuleConfig = toml::from_str(
        r#"
        [new_pool]
        min_initial_lp = "0.5"
        "#,
    )
    .unwrap();

    assert_eq!(rules.new_pool.min_initial_lp, dec!(0.5));
    assert_eq!(rules.new_pool.max_top10, dec!(0.4));
    assert_eq!(rules.kol_buy.min_txs, 200);
}
