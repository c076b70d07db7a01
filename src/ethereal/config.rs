use std::env;
use std::time::Duration;

use anyhow::{anyhow, Result};
use tracing::warn;

const DEFAULT_BASE_URL: &str = "https://api.etherealtest.net";
const DEFAULT_WS_URL: &str = "wss://ws.etherealtest.net";
const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Venue connection settings. Credentials are optional here so read-only and
/// dry-run setups can start; the live client refuses to build without them.
#[derive(Debug, Clone)]
pub struct EtherealConfig {
    pub base_url: String,
    pub ws_url: String,
    pub address: Option<String>,
    pub private_key: Option<String>,
    pub subaccount: Option<String>,
    pub subaccount_id: String,
    pub timeout: Duration,
}

impl EtherealConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let subaccount_id = lookup("ETHEREAL_SUBACCOUNT_ID")
            .ok_or_else(|| anyhow!("ETHEREAL_SUBACCOUNT_ID not set"))?;

        let subaccount = lookup("ETHEREAL_SUBACCOUNT");
        if subaccount.is_none() {
            warn!("ETHEREAL_SUBACCOUNT not set; cancel requests will be skipped");
        }

        let timeout_ms = match lookup("ETHEREAL_TIMEOUT") {
            None => DEFAULT_TIMEOUT_MS,
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| anyhow!("invalid value for ETHEREAL_TIMEOUT: {raw:?}"))?,
        };

        Ok(Self {
            base_url: lookup("ETHEREAL_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            ws_url: lookup("ETHEREAL_WS_URL").unwrap_or_else(|| DEFAULT_WS_URL.to_string()),
            address: lookup("ETHEREAL_ADDRESS"),
            private_key: lookup("ETHEREAL_PRIVATE_KEY"),
            subaccount,
            subaccount_id,
            timeout: Duration::from_millis(timeout_ms),
        })
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
    fn subaccount_id_is_required() {
        assert!(EtherealConfig::from_lookup(|_| None).is_err());
    }

    #[test]
    fn defaults_fill_the_rest() {
        let lookup = lookup_from(&[("ETHEREAL_SUBACCOUNT_ID", "sub-1")]);
        let config = EtherealConfig::from_lookup(lookup).unwrap();

        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout, Duration::from_millis(10_000));
        assert!(config.subaccount.is_none());
        assert!(config.address.is_none());
    }

    #[test]
    fn explicit_values_override_defaults() {
        let lookup = lookup_from(&[
            ("ETHEREAL_SUBACCOUNT_ID", "sub-1"),
            ("ETHEREAL_SUBACCOUNT", "maker"),
            ("ETHEREAL_BASE_URL", "https://api.example.com"),
            ("ETHEREAL_TIMEOUT", "2500"),
        ]);
        let config = EtherealConfig::from_lookup(lookup).unwrap();

        assert_eq!(config.subaccount.as_deref(), Some("maker"));
        assert_eq!(config.base_url, "https://api.example.com");
        assert_eq!(config.timeout, Duration::from_millis(2_500));
    }

    #[test]
    fn malformed_timeout_is_rejected() {
        let lookup = lookup_from(&[
            ("ETHEREAL_SUBACCOUNT_ID", "sub-1"),
            ("ETHEREAL_TIMEOUT", "fast"),
        ]);

        assert!(EtherealConfig::from_lookup(lookup).is_err());
    }
}
