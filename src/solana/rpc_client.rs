use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use thiserror::Error;

use super::types::{
    Commitment, RawTransaction, RpcErrorObject, RpcResponse, SignatureEntry, TransactionResult,
};
use crate::models::SignatureRecord;

#[derive(Debug, Error)]
pub enum RpcError {
    /// URL stripped: node endpoints often carry an API key.
    #[error("HTTP request failed: {0}")]
    Http(#[source] reqwest::Error),

    #[error("JSON-RPC error: {0}")]
    Rpc(RpcErrorObject),

    #[error("unexpected response: {0}")]
    Unexpected(String),
}

/// Ledger access the ingestion pipeline depends on.
#[async_trait]
pub trait LedgerRpc: Send + Sync {
    /// Up to `limit` confirmed signatures of the program, newest first,
    /// strictly older than `before` and strictly newer than `until`.
    async fn list_signatures(
        &self,
        before: Option<&str>,
        until: Option<&str>,
        limit: usize,
    ) -> Result<Vec<SignatureRecord>, RpcError>;

    /// Fetch transactions by signature. The result has one slot per input,
    /// in input order; `None` means the node no longer has it.
    async fn get_transactions(
        &self,
        signatures: &[String],
        commitment: Commitment,
    ) -> Result<Vec<Option<RawTransaction>>, RpcError>;
}

/// JSON-RPC client for a Solana node, scoped to one program address.
#[derive(Debug, Clone)]
pub struct SolanaRpcClient {
    http: Client,
    endpoint: String,
    program_id: String,
}

impl SolanaRpcClient {
    pub fn new(http: Client, endpoint: impl Into<String>, program_id: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            program_id: program_id.into(),
        }
    }

    async fn post<T: DeserializeOwned>(&self, payload: &Value) -> Result<T, RpcError> {
        let resp = self
            .http
            .post(&self.endpoint)
            .json(payload)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(redact)?;

        resp.json::<T>().await.map_err(redact)
    }
}

#[async_trait]
impl LedgerRpc for SolanaRpcClient {
    async fn list_signatures(
        &self,
        before: Option<&str>,
        until: Option<&str>,
        limit: usize,
    ) -> Result<Vec<SignatureRecord>, RpcError> {
        let payload = signatures_request(&self.program_id, before, until, limit);
        let resp: RpcResponse<Vec<SignatureEntry>> = self.post(&payload).await?;
        parse_signature_page(resp)
    }

    async fn get_transactions(
        &self,
        signatures: &[String],
        commitment: Commitment,
    ) -> Result<Vec<Option<RawTransaction>>, RpcError> {
        if signatures.is_empty() {
            return Ok(Vec::new());
        }

        let payload = transactions_request(signatures, commitment);
        let body: Value = self.post(&payload).await?;

        parse_transaction_batch(signatures, body)
    }
}

fn redact(e: reqwest::Error) -> RpcError {
    RpcError::Http(e.without_url())
}

fn signatures_request(
    program_id: &str,
    before: Option<&str>,
    until: Option<&str>,
    limit: usize,
) -> Value {
    let mut options = json!({
        "limit": limit,
        "commitment": Commitment::Confirmed.as_str(),
    });
    if let Some(before) = before {
        options["before"] = Value::String(before.to_string());
    }
    if let Some(until) = until {
        options["until"] = Value::String(until.to_string());
    }

    json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "getSignaturesForAddress",
        "params": [program_id, options],
    })
}

fn transactions_request(signatures: &[String], commitment: Commitment) -> Value {
    let calls: Vec<Value> = signatures
        .iter()
        .enumerate()
        .map(|(i, signature)| {
            json!({
                "jsonrpc": "2.0",
                "id": i,
                "method": "getTransaction",
                "params": [signature, {
                    "encoding": "json",
                    "commitment": commitment.as_str(),
                    "maxSupportedTransactionVersion": 0,
                }],
            })
        })
        .collect();

    Value::Array(calls)
}

fn parse_signature_page(
    resp: RpcResponse<Vec<SignatureEntry>>,
) -> Result<Vec<SignatureRecord>, RpcError> {
    if let Some(error) = resp.error {
        return Err(RpcError::Rpc(error));
    }
    let entries = resp
        .result
        .ok_or_else(|| RpcError::Unexpected("getSignaturesForAddress without result".into()))?;

    let mut page = Vec::with_capacity(entries.len());
    for entry in entries {
        match entry.block_time {
            Some(block_time) => page.push(SignatureRecord::new(entry.signature, block_time)),
            None => {
                tracing::warn!(signature = %entry.signature, "Signature without block time, skipping");
            }
        }
    }
    Ok(page)
}

/// Decode the body of a batched `getTransaction` call.
fn parse_transaction_batch(
    signatures: &[String],
    body: Value,
) -> Result<Vec<Option<RawTransaction>>, RpcError> {
    // A whole-batch failure comes back as a single error object.
    if let Some(error) = body.get("error") {
        let error: RpcErrorObject = serde_json::from_value(error.clone())
            .map_err(|e| RpcError::Unexpected(e.to_string()))?;
        return Err(RpcError::Rpc(error));
    }

    let responses: Vec<RpcResponse<TransactionResult>> = serde_json::from_value(body)
        .map_err(|e| RpcError::Unexpected(format!("batch response: {e}")))?;

    order_batch_responses(signatures, responses)
}

/// Batch responses may arrive in any order; put them back in request order.
///
/// Every request id must be answered exactly once. A `null` result means the
/// node no longer has the transaction; a missing answer is a failed request.
fn order_batch_responses(
    signatures: &[String],
    responses: Vec<RpcResponse<TransactionResult>>,
) -> Result<Vec<Option<RawTransaction>>, RpcError> {
    let mut slots: Vec<Option<Option<RawTransaction>>> = vec![None; signatures.len()];

    for resp in responses {
        if let Some(error) = resp.error {
            return Err(RpcError::Rpc(error));
        }
        let index = resp
            .id
            .as_ref()
            .and_then(Value::as_u64)
            .and_then(|i| usize::try_from(i).ok())
            .filter(|i| *i < signatures.len())
            .ok_or_else(|| RpcError::Unexpected(format!("batch response id {:?}", resp.id)))?;

        if slots[index].is_some() {
            return Err(RpcError::Unexpected(format!(
                "duplicate batch response id {index}"
            )));
        }
        slots[index] = Some(
            resp.result
                .map(|tx| tx.into_raw(signatures[index].clone())),
        );
    }

    let answered = slots.iter().filter(|s| s.is_some()).count();
    if answered < signatures.len() {
        return Err(RpcError::Unexpected(format!(
            "batch answered {answered} of {} requests",
            signatures.len()
        )));
    }

    Ok(slots.into_iter().flatten().collect())
}
