use anyhow::Result;
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc::Sender;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info};

use crate::events::Tick;
use crate::market::oracle_source::OracleSource;

/// Ticks older than this on arrival never reach the price book.
const STALE_TICK_MAX_AGE_MS: i64 = 60_000;

#[derive(Debug)]
pub struct EtherealPriceFeed {
    websocket_url: String,
}

impl EtherealPriceFeed {
    pub fn new(websocket_url: impl Into<String>) -> Self {
        Self {
            websocket_url: websocket_url.into(),
        }
    }

    fn subscription(tickers: &[String]) -> serde_json::Value {
        serde_json::json!({
            "method": "subscribe",
            "params": {
                "channel": "oracle_price",
                "tickers": tickers,
            }
        })
    }

    fn parse_ticks(text: &str) -> Vec<Tick> {
        let frame: WsFrame = match serde_json::from_str(text) {
            Ok(frame) => frame,
            // heartbeats, acks, unrelated frames
            Err(_) => return Vec::new(),
        };

        if frame.channel.as_deref() != Some("oracle_price") {
            return Vec::new();
        }

        frame
            .data
            .unwrap_or_default()
            .into_iter()
            .filter_map(|entry| {
                let price: f64 = entry.price.parse().ok()?;
                let confidence: f64 = entry.confidence.parse().unwrap_or(0.0);

                Some(Tick {
                    instrument: entry.ticker,
                    price,
                    confidence,
                    timestamp_ms: entry.timestamp,
                })
            })
            .collect()
    }
}

#[async_trait]
impl OracleSource for EtherealPriceFeed {
    async fn subscribe(&self, tickers: &[String], channel: Sender<Tick>) -> Result<()> {
        let (stream, _http_response) = connect_async(&self.websocket_url).await?;
        let (mut writer, mut reader) = stream.split();

        writer
            .send(Message::Text(Self::subscription(tickers).to_string()))
            .await?;

        info!("oracle price websocket connected");

        while let Some(message) = reader.next().await {
            let text = match message? {
                Message::Text(text) => text,
                Message::Binary(binary) => match String::from_utf8(binary) {
                    Ok(text) => text,
                    Err(_) => continue,
                },
                Message::Close(frame) => {
                    error!("oracle price websocket closed: {:?}", frame);
                    break;
                }
                _ => continue,
            };

            let now_ms = chrono::Utc::now().timestamp_millis();
            for tick in Self::parse_ticks(&text) {
                if now_ms - tick.timestamp_ms > STALE_TICK_MAX_AGE_MS {
                    debug!(
                        instrument = %tick.instrument,
                        age_ms = now_ms - tick.timestamp_ms,
                        "dropping stale oracle tick"
                    );
                    continue;
                }

                if channel.send(tick).await.is_err() {
                    error!("tick consumer dropped; stopping oracle feed");
                    return Ok(());
                }
            }
        }

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct WsFrame {
    #[serde(default)]
    channel: Option<String>,

    #[serde(default)]
    data: Option<Vec<PriceEntry>>,
}

#[derive(Debug, Deserialize)]
struct PriceEntry {
    ticker: String,
    price: String,

    #[serde(default)]
    confidence: String,

    timestamp: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_price_frames() {
        let raw = r#"{"channel":"oracle_price","data":[
            {"ticker":"BTCUSD","price":"50000.5","confidence":"5.2","timestamp":1712000000000}
        ]}"#;

        let ticks = EtherealPriceFeed::parse_ticks(raw);
        assert_eq!(ticks.len(), 1);
        assert_eq!(ticks[0].instrument, "BTCUSD");
        assert_eq!(ticks[0].price, 50_000.5);
        assert_eq!(ticks[0].confidence, 5.2);
        assert_eq!(ticks[0].timestamp_ms, 1_712_000_000_000);
    }

    #[test]
    fn ignores_other_channels_and_acks() {
        assert!(EtherealPriceFeed::parse_ticks(r#"{"channel":"orders","data":[]}"#).is_empty());
        assert!(EtherealPriceFeed::parse_ticks(r#"{"result":"subscribed"}"#).is_empty());
        assert!(EtherealPriceFeed::parse_ticks("not json").is_empty());
    }

    #[test]
    fn unparseable_prices_are_skipped() {
        let raw = r#"{"channel":"oracle_price","data":[
            {"ticker":"BTCUSD","price":"n/a","timestamp":1},
            {"ticker":"ETHUSD","price":"3000","timestamp":2}
        ]}"#;

        let ticks = EtherealPriceFeed::parse_ticks(raw);
        assert_eq!(ticks.len(), 1);
        assert_eq!(ticks[0].instrument, "ETHUSD");
        assert_eq!(ticks[0].confidence, 0.0);
    }
}
