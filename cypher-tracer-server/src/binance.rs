use crate::{error::ServerError, message::PriceSnapshot};
use cypher_tracer::Asset;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Binance REST API response for `/api/v3/ticker/price`
#[derive(Debug, Deserialize)]
struct BinanceTickerPrice {
    symbol: String,
    #[serde(deserialize_with = "de_str_f64")]
    price: f64,
}

/// Deserialize a string encoded float, as Binance sends prices.
fn de_str_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::de::Deserializer<'de>,
{
    let raw = <&str>::deserialize(deserializer)?;
    raw.trim().parse::<f64>().map_err(serde::de::Error::custom)
}

/// Polls Binance spot prices for the tracked assets.
#[derive(Debug, Clone)]
pub struct PriceClient {
    client: Client,
    base_url: String,
}

impl PriceClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ServerError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub fn ticker_url(&self, asset: Asset) -> String {
        format!(
            "{}/api/v3/ticker/price?symbol={}",
            self.base_url,
            asset.binance_symbol()
        )
    }

    /// Fetch every tracked asset in turn. The first failure aborts the round.
    pub async fn fetch_prices(&self) -> Result<Vec<(Asset, f64)>, ServerError> {
        let mut prices = Vec::with_capacity(Asset::ALL.len());

        for asset in Asset::ALL {
            let body = self
                .client
                .get(self.ticker_url(asset))
                .send()
                .await?
                .error_for_status()?
                .text()
                .await?;

            let price = parse_ticker_price(&body, asset)?;
            debug!(%asset, price, "price fetched");
            prices.push((asset, price));
        }

        Ok(prices)
    }

    /// One polling round. Any failure yields a snapshot with every asset unavailable.
    pub async fn poll(&self) -> PriceSnapshot {
        match self.fetch_prices().await {
            Ok(prices) => PriceSnapshot::new(prices),
            Err(error) => {
                warn!(%error, "Binance price poll failed");
                PriceSnapshot::unavailable()
            }
        }
    }
}

/// Decode a ticker price body and check it belongs to `asset`.
fn parse_ticker_price(body: &str, asset: Asset) -> Result<f64, ServerError> {
    let ticker = serde_json::from_str::<BinanceTickerPrice>(body)?;

    if ticker.symbol != asset.binance_symbol() {
        return Err(ServerError::Decode(format!(
            "expected {} ticker, received {}",
            asset.binance_symbol(),
            ticker.symbol
        )));
    }

    if !ticker.price.is_finite() {
        return Err(ServerError::Decode(format!(
            "non-finite price for {}",
            ticker.symbol
        )));
    }

    Ok(ticker.price)
}
