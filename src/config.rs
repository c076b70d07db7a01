use std::collections::HashMap;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Result};

const DEFAULT_REFRESH_CYCLE_MS: u64 = 5_000;
const DEFAULT_TICKERS: &str = "BTCUSD,ETHUSD,SOLUSD";
const DEFAULT_SPREAD_WIDTH_BP: u32 = 10;
const DEFAULT_MAX_PRICE_DEVIATION_PCT: f64 = 1.0;
const DEFAULT_ORDER_SIZE: f64 = 100.0;

/// Quoting parameters for a single asset, after per-asset overrides have been
/// applied on top of the global defaults.
#[derive(Debug, Clone)]
pub struct AssetParams {
    pub order_size: f64,
    pub spread_bp: u32,
    pub max_deviation_pct: f64,
}

#[derive(Debug, Clone)]
pub struct QuoterConfig {
    pub refresh_cycle: Duration,
    pub tickers: Vec<String>,
    params: HashMap<String, AssetParams>,
}

impl QuoterConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads the `QUOTE_REFRESH_CYCLE` / `TICKERS` / `SPREAD_WIDTH` /
    /// `MAX_PRICE_DEVIATION` surface plus `{BASE}_USD_*` per-asset overrides.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let refresh_ms: u64 = parse_or(&lookup, "QUOTE_REFRESH_CYCLE", DEFAULT_REFRESH_CYCLE_MS)?;
        let spread_bp: u32 = parse_or(&lookup, "SPREAD_WIDTH", DEFAULT_SPREAD_WIDTH_BP)?;
        let max_deviation_pct: f64 =
            parse_or(&lookup, "MAX_PRICE_DEVIATION", DEFAULT_MAX_PRICE_DEVIATION_PCT)?;

        let tickers: Vec<String> = lookup("TICKERS")
            .unwrap_or_else(|| DEFAULT_TICKERS.to_string())
            .split(',')
            .map(|ticker| ticker.trim().to_uppercase())
            .filter(|ticker| !ticker.is_empty())
            .collect();

        if tickers.is_empty() {
            return Err(anyhow!("TICKERS resolved to an empty instrument list"));
        }

        let mut params = HashMap::with_capacity(tickers.len());
        for ticker in &tickers {
            let prefix = asset_env_prefix(ticker);

            let asset = AssetParams {
                order_size: parse_or(&lookup, &format!("{prefix}_ORDER_SIZE"), DEFAULT_ORDER_SIZE)?,
                spread_bp: parse_or(&lookup, &format!("{prefix}_SPREAD_WIDTH"), spread_bp)?,
                max_deviation_pct: parse_or(
                    &lookup,
                    &format!("{prefix}_MAX_PRICE_DEVIATION"),
                    max_deviation_pct,
                )?,
            };

            params.insert(ticker.clone(), asset);
        }

        Ok(Self {
            refresh_cycle: Duration::from_millis(refresh_ms),
            tickers,
            params,
        })
    }

    pub fn params_for(&self, ticker: &str) -> Option<&AssetParams> {
        self.params.get(ticker)
    }
}

/// `BTCUSD` -> `BTC_USD`, the prefix for per-asset override keys.
fn asset_env_prefix(ticker: &str) -> String {
    let base = ticker.strip_suffix("USD").unwrap_or(ticker);
    format!("{base}_USD")
}

fn parse_or<T: FromStr>(
    lookup: impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T> {
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| anyhow!("invalid value for {key}: {raw:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup_from<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn defaults_when_environment_is_empty() {
        let config = QuoterConfig::from_lookup(|_| None).unwrap();

        assert_eq!(config.refresh_cycle, Duration::from_millis(5_000));
        assert_eq!(config.tickers, vec!["BTCUSD", "ETHUSD", "SOLUSD"]);

        let btc = config.params_for("BTCUSD").unwrap();
        assert_eq!(btc.order_size, 100.0);
        assert_eq!(btc.spread_bp, 10);
        assert_eq!(btc.max_deviation_pct, 1.0);
    }

    #[test]
    fn per_asset_overrides_beat_globals() {
        let lookup = lookup_from(&[
            ("TICKERS", "BTCUSD,ETHUSD"),
            ("SPREAD_WIDTH", "20"),
            ("BTC_USD_ORDER_SIZE", "0.001"),
            ("BTC_USD_SPREAD_WIDTH", "5"),
            ("BTC_USD_MAX_PRICE_DEVIATION", "2.5"),
        ]);
        let config = QuoterConfig::from_lookup(lookup).unwrap();

        let btc = config.params_for("BTCUSD").unwrap();
        assert_eq!(btc.order_size, 0.001);
        assert_eq!(btc.spread_bp, 5);
        assert_eq!(btc.max_deviation_pct, 2.5);

        // ETHUSD has no overrides, so the global spread applies.
        let eth = config.params_for("ETHUSD").unwrap();
        assert_eq!(eth.order_size, 100.0);
        assert_eq!(eth.spread_bp, 20);
    }

    #[test]
    fn tickers_are_trimmed_and_uppercased() {
        let lookup = lookup_from(&[("TICKERS", " btcusd , SOLUSD ")]);
        let config = QuoterConfig::from_lookup(lookup).unwrap();

        assert_eq!(config.tickers, vec!["BTCUSD", "SOLUSD"]);
    }

    #[test]
    fn malformed_numeric_value_is_rejected() {
        let lookup = lookup_from(&[("QUOTE_REFRESH_CYCLE", "soon")]);

        assert!(QuoterConfig::from_lookup(lookup).is_err());
    }

    #[test]
    fn empty_ticker_list_is_rejected() {
        let lookup = lookup_from(&[("TICKERS", " , ")]);

        assert!(QuoterConfig::from_lookup(lookup).is_err());
    }
}
