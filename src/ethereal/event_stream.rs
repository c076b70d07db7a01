use std::time::Duration;

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc::Sender;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{error, info};

use crate::events::{FillEvent, OrderStatusEvent};
use crate::types::order::OrderStatus;

/// Subaccount-scoped venue event stream: order status transitions drive
/// reconciliation, fill notices are informational. Reconnects with a short
/// sleep whenever the socket drops.
pub struct EtherealEventStream {
    task: tokio::task::JoinHandle<()>,
}

impl EtherealEventStream {
    pub fn spawn(
        websocket_url: &str,
        subaccount_id: &str,
        status_tx: Sender<OrderStatusEvent>,
        fill_tx: Sender<FillEvent>,
    ) -> Self {
        let url = websocket_url.to_string();
        let subaccount_id = subaccount_id.to_string();

        let task = tokio::spawn(async move {
            loop {
                if let Err(error) =
                    run_once(&url, &subaccount_id, status_tx.clone(), fill_tx.clone()).await
                {
                    error!(error = %error, "venue event stream failed");
                }

                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        });

        Self { task }
    }

    pub fn disconnect(&self) {
        self.task.abort();
    }
}

async fn run_once(
    url: &str,
    subaccount_id: &str,
    status_tx: Sender<OrderStatusEvent>,
    fill_tx: Sender<FillEvent>,
) -> Result<()> {
    let (stream, _) = connect_async(url)
        .await
        .with_context(|| format!("connect_async({url}) failed"))?;
    let (mut writer, mut reader) = stream.split();

    info!("venue event websocket connected");

    for channel in ["orders", "fills"] {
        let subscription = serde_json::json!({
            "method": "subscribe",
            "params": {
                "channel": channel,
                "subaccountId": subaccount_id,
            }
        });
        writer.send(Message::Text(subscription.to_string())).await?;
    }

    while let Some(message) = reader.next().await {
        let message = message?;
        let Ok(text) = message.into_text() else { continue };

        let frame: WsFrame = match serde_json::from_str(&text) {
            Ok(frame) => frame,
            // heartbeats, acks, unrelated frames
            Err(_) => continue,
        };

        match frame.channel.as_deref() {
            Some("orders") => {
                for entry in frame.data.unwrap_or_default() {
                    if let Some(event) = to_status_event(&entry) {
                        let _ = status_tx.send(event).await;
                    }
                }
            }
            Some("fills") => {
                for entry in frame.data.unwrap_or_default() {
                    if let Some(fill) = to_fill_event(&entry) {
                        let _ = fill_tx.send(fill).await;
                    }
                }
            }
            _ => {}
        }
    }

    Ok(())
}

fn to_status_event(value: &serde_json::Value) -> Option<OrderStatusEvent> {
    let order_id = value.get("id")?.as_str()?.to_string();
    let status: OrderStatus = value.get("status")?.as_str()?.parse().ok()?;

    Some(OrderStatusEvent { order_id, status })
}

fn to_fill_event(value: &serde_json::Value) -> Option<FillEvent> {
    let order_id = value.get("orderId")?.as_str()?.to_string();
    let price = parse_f64(value.get("price"))?;
    let quantity = parse_f64(value.get("quantity"))?;
    let timestamp_ms = value.get("timestamp").and_then(|v| v.as_i64()).unwrap_or(0);

    Some(FillEvent {
        order_id,
        price,
        quantity,
        timestamp_ms,
    })
}

fn parse_f64(value: Option<&serde_json::Value>) -> Option<f64> {
    let value = value?;
    if let Some(number) = value.as_f64() {
        return Some(number);
    }

    value.as_str()?.parse().ok()
}

#[derive(Debug, Deserialize)]
struct WsFrame {
    #[serde(default)]
    channel: Option<String>,

    #[serde(default)]
    data: Option<Vec<serde_json::Value>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_events_parse_from_order_frames() {
        let entry: serde_json::Value =
            serde_json::from_str(r#"{"id":"ord-7","status":"CANCELED"}"#).unwrap();

        let event = to_status_event(&entry).unwrap();
        assert_eq!(event.order_id, "ord-7");
        assert_eq!(event.status, OrderStatus::Canceled);
    }

    #[test]
    fn unknown_status_strings_are_dropped() {
        let entry: serde_json::Value =
            serde_json::from_str(r#"{"id":"ord-7","status":"TELEPORTED"}"#).unwrap();

        assert!(to_status_event(&entry).is_none());
    }

    #[test]
    fn fill_events_accept_string_or_numeric_decimals() {
        let entry: serde_json::Value = serde_json::from_str(
            r#"{"orderId":"ord-7","price":"49950","quantity":0.001,"timestamp":1712000000000}"#,
        )
        .unwrap();

        let fill = to_fill_event(&entry).unwrap();
        assert_eq!(fill.price, 49_950.0);
        assert_eq!(fill.quantity, 0.001);
        assert_eq!(fill.timestamp_ms, 1_712_000_000_000);
    }
}
