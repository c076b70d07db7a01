use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use hmac::{Hmac, Mac};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use sha2::{Digest, Sha256, Sha512};
use url::form_urlencoded;

use crate::ethereal::config::EtherealConfig;
use crate::execution::{
    CancelRequest, CancelResponse, ExchangeAdapter, OpenOrder, PlaceRequest, PlaceResponse,
    PositionRecord, ProductInfo,
};

type HmacSha512 = Hmac<Sha512>;

/// REST adapter for the Ethereal venue. Every call carries the configured
/// timeout; a timed-out call surfaces as an error and is not retried here.
#[derive(Debug, Clone)]
pub struct EtherealClient {
    http: reqwest::Client,
    base_url: String,
    address: String,
    private_key: String,
}

impl EtherealClient {
    pub fn new(config: &EtherealConfig) -> Result<Self> {
        let address = config
            .address
            .clone()
            .ok_or_else(|| anyhow!("ETHEREAL_ADDRESS must be set to trade"))?;
        let private_key = config
            .private_key
            .clone()
            .ok_or_else(|| anyhow!("ETHEREAL_PRIVATE_KEY must be set to trade"))?;

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("building http client failed")?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            address,
            private_key,
        })
    }

    async fn signed_post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T> {
        let encoded_body = body.to_string();
        let headers = self.signed_headers("POST", path, &encoded_body)?;

        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .headers(headers)
            .header("Content-Type", "application/json")
            .body(encoded_body)
            .send()
            .await
            .context("ethereal POST failed")?;

        Self::decode(response).await
    }

    async fn signed_get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<T> {
        let encoded_query = encode_query(query);
        let headers = self.signed_headers("GET", path, &encoded_query)?;

        let url = if encoded_query.is_empty() {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}{}?{}", self.base_url, path, encoded_query)
        };

        let response = self
            .http
            .get(url)
            .headers(headers)
            .send()
            .await
            .context("ethereal GET failed")?;

        Self::decode(response).await
    }

    async fn public_get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .context("ethereal GET failed")?;

        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        let text = response.text().await.context("read response body failed")?;

        if !status.is_success() {
            bail!("ethereal http error {status}: {text}");
        }

        let parsed: ApiResponse<T> = serde_json::from_str(&text)
            .with_context(|| format!("parse ethereal response failed; raw={text}"))?;

        if let Some(error) = parsed.error {
            bail!("ethereal api error: {error}");
        }

        parsed
            .data
            .ok_or_else(|| anyhow!("ethereal response missing `data`; raw={text}"))
    }

    fn signed_headers(&self, method: &str, path: &str, payload: &str) -> Result<HeaderMap> {
        let timestamp = chrono::Utc::now().timestamp_millis().to_string();

        let mut sha256 = Sha256::new();
        sha256.update(timestamp.as_bytes());
        sha256.update(payload.as_bytes());
        let payload_digest = sha256.finalize();

        let mut mac = HmacSha512::new_from_slice(self.private_key.as_bytes())
            .map_err(|_| anyhow!("invalid signing key"))?;
        mac.update(method.as_bytes());
        mac.update(path.as_bytes());
        mac.update(&payload_digest);
        let signature = general_purpose::STANDARD.encode(mac.finalize().into_bytes());

        let mut headers = HeaderMap::new();
        headers.insert(
            "X-Ethereal-Address",
            HeaderValue::from_str(&self.address).map_err(|_| anyhow!("invalid address header"))?,
        );
        headers.insert(
            "X-Ethereal-Timestamp",
            HeaderValue::from_str(&timestamp).map_err(|_| anyhow!("invalid timestamp header"))?,
        );
        headers.insert(
            "X-Ethereal-Signature",
            HeaderValue::from_str(&signature).map_err(|_| anyhow!("invalid signature header"))?,
        );

        Ok(headers)
    }
}

#[async_trait]
impl ExchangeAdapter for EtherealClient {
    async fn place(&self, request: &PlaceRequest) -> Result<PlaceResponse> {
        let body = serde_json::json!({
            "orderType": "LIMIT",
            "quantity": format_decimal(request.quantity),
            "side": request.side.wire_code(),
            "price": format_decimal(request.price),
            "ticker": request.instrument,
            "productId": request.product_id,
            "timeInForce": "GTD",
            "expiresAt": request.expires_at_sec,
        });

        let created: OrderCreated = self.signed_post("/v1/order", &body).await?;

        Ok(PlaceResponse {
            order_id: created.order_id,
        })
    }

    async fn cancel(&self, request: &CancelRequest) -> Result<CancelResponse> {
        let body = serde_json::json!({
            "orderIds": request.order_ids,
            "subaccount": request.subaccount,
            "sender": self.address,
        });

        let result: CancelResult = self.signed_post("/v1/order/cancel", &body).await?;

        Ok(CancelResponse {
            canceled: result.canceled.len(),
        })
    }

    async fn positions(
        &self,
        subaccount_id: &str,
        product_ids: &[String],
    ) -> Result<Vec<PositionRecord>> {
        let mut query = vec![("subaccountId".to_string(), subaccount_id.to_string())];
        if !product_ids.is_empty() {
            query.push(("productIds".to_string(), product_ids.join(",")));
        }

        let rows: Vec<PositionRow> = self.signed_get("/v1/position", &query).await?;

        rows.into_iter()
            .map(|row| {
                Ok(PositionRecord {
                    quantity: parse_decimal(&row.quantity, "quantity")?,
                    entry_price: parse_decimal(&row.entry_price, "entryPrice")?,
                    product_id: row.product_id,
                })
            })
            .collect()
    }

    async fn open_orders(&self, subaccount_id: &str) -> Result<Vec<OpenOrder>> {
        let query = vec![
            ("subaccountId".to_string(), subaccount_id.to_string()),
            ("statuses".to_string(), "NEW".to_string()),
        ];

        let rows: Vec<OpenOrderRow> = self.signed_get("/v1/order", &query).await?;

        Ok(rows.into_iter().map(|row| OpenOrder { id: row.id }).collect())
    }

    async fn products(&self) -> Result<Vec<ProductInfo>> {
        let rows: Vec<ProductRow> = self.public_get("/v1/product").await?;

        rows.into_iter()
            .map(|row| {
                Ok(ProductInfo {
                    tick_size: parse_decimal(&row.tick_size, "tickSize")?,
                    min_qty: parse_decimal(&row.min_quantity, "minQuantity")?,
                    max_qty: parse_decimal(&row.max_quantity, "maxQuantity")?,
                    ticker: row.ticker,
                    product_id: row.id,
                })
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    #[serde(default)]
    error: Option<String>,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderCreated {
    #[serde(default)]
    order_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CancelResult {
    #[serde(default)]
    canceled: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PositionRow {
    product_id: String,
    quantity: String,
    entry_price: String,
}

#[derive(Debug, Deserialize)]
struct OpenOrderRow {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductRow {
    ticker: String,
    id: String,
    tick_size: String,
    min_quantity: String,
    max_quantity: String,
}

fn encode_query(params: &[(String, String)]) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in params {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}

fn parse_decimal(raw: &str, field: &str) -> Result<f64> {
    raw.trim()
        .parse()
        .map_err(|_| anyhow!("invalid decimal for {field}: {raw:?}"))
}

fn format_decimal(value: f64) -> String {
    format!("{value:.10}")
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_decimal_trims_trailing_zeros() {
        assert_eq!(format_decimal(49_950.0), "49950");
        assert_eq!(format_decimal(0.001), "0.001");
        assert_eq!(format_decimal(52_947.5), "52947.5");
    }

    #[test]
    fn position_rows_parse_signed_quantities() {
        let raw = r#"{"data":[{"productId":"BTCUSD_PERP","quantity":"-0.005","entryPrice":"45000"}]}"#;
        let parsed: ApiResponse<Vec<PositionRow>> = serde_json::from_str(raw).unwrap();
        let rows = parsed.data.unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(parse_decimal(&rows[0].quantity, "quantity").unwrap(), -0.005);
        assert_eq!(parse_decimal(&rows[0].entry_price, "entryPrice").unwrap(), 45_000.0);
    }

    #[test]
    fn order_created_tolerates_missing_id() {
        let raw = r#"{"data":{}}"#;
        let parsed: ApiResponse<OrderCreated> = serde_json::from_str(raw).unwrap();

        assert!(parsed.data.unwrap().order_id.is_none());
    }

    #[test]
    fn api_error_field_is_surfaced() {
        let raw = r#"{"error":"insufficient margin"}"#;
        let parsed: ApiResponse<OrderCreated> = serde_json::from_str(raw).unwrap();

        assert_eq!(parsed.error.as_deref(), Some("insufficient margin"));
        assert!(parsed.data.is_none());
    }

    #[test]
    fn query_encoding_joins_pairs() {
        let query = encode_query(&[
            ("subaccountId".to_string(), "sub-1".to_string()),
            ("statuses".to_string(), "NEW".to_string()),
        ]);

        assert_eq!(query, "subaccountId=sub-1&statuses=NEW");
    }
}
