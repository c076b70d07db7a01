use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc::Sender;

use crate::events::Tick;

#[async_trait]
pub trait OracleSource: Send + Sync {
    async fn subscribe(&self, tickers: &[String], channel: Sender<Tick>) -> Result<()>;
}
