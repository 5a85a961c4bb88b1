use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::str::FromStr;

use super::{PriceError, PriceSource, TokenPrice};

const HELIUS_API_BASE: &str = "https://mainnet.helius-rpc.com";

#[derive(Debug, Deserialize)]
struct AssetBatchResponse {
    #[serde(default)]
    result: Option<Vec<Option<Asset>>>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Asset {
    id: String,
    #[serde(default)]
    token_info: Option<TokenInfo>,
}

#[derive(Debug, Deserialize)]
struct TokenInfo {
    #[serde(default)]
    decimals: Option<u32>,
    #[serde(default)]
    price_info: Option<PriceInfo>,
}

#[derive(Debug, Deserialize)]
struct PriceInfo {
    price_per_token: serde_json::Number,
}

/// Token prices from the Helius DAS `getAssetBatch` method.
#[derive(Debug, Clone)]
pub struct HeliusPriceClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl HeliusPriceClient {
    pub fn new(http: Client, api_key: String) -> Self {
        Self {
            http,
            base_url: HELIUS_API_BASE.into(),
            api_key,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl PriceSource for HeliusPriceClient {
    async fn get_prices(
        &self,
        token_ids: &[String],
    ) -> Result<HashMap<String, TokenPrice>, PriceError> {
        if token_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let payload = json!({
            "jsonrpc": "2.0",
            "id": "token-prices",
            "method": "getAssetBatch",
            "params": { "ids": token_ids },
        });

        let resp: AssetBatchResponse = self
            .http
            .post(format!("{}/?api-key={}", self.base_url, self.api_key))
            .json(&payload)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(redact)?
            .json()
            .await
            .map_err(redact)?;

        if let Some(error) = resp.error {
            return Err(PriceError::Service(error.to_string()));
        }

        let prices = collect_prices(resp.result.unwrap_or_default());

        // Never fall back to a default price for a financial record.
        if let Some(missing) = token_ids.iter().find(|id| !prices.contains_key(*id)) {
            return Err(PriceError::Missing(missing.clone()));
        }

        Ok(prices)
    }
}

/// The request URL carries the API key; keep it out of errors and logs.
fn redact(e: reqwest::Error) -> PriceError {
    PriceError::Http(e.without_url())
}

fn collect_prices(assets: Vec<Option<Asset>>) -> HashMap<String, TokenPrice> {
    assets
        .into_iter()
        .flatten()
        .filter_map(|asset| {
            let info = asset.token_info?;
            let price = parse_number(&info.price_info?.price_per_token)?;
            let usd_per_unit = per_unit(price, info.decimals.unwrap_or(0))?;
            Some((asset.id, TokenPrice { usd_per_unit }))
        })
        .collect()
}

/// JSON numbers may come back in exponent form (e.g. `1.5e-7`).
fn parse_number(n: &serde_json::Number) -> Option<Decimal> {
    let s = n.to_string();
    Decimal::from_str(&s)
        .or_else(|_| Decimal::from_scientific(&s))
        .ok()
}

/// Price of one whole token → price of one raw unit.
fn per_unit(price_per_token: Decimal, decimals: u32) -> Option<Decimal> {
    let divisor = Decimal::from(10u64.checked_pow(decimals)?);
    price_per_token.checked_div(divisor).map(|p| p.normalize())
}
