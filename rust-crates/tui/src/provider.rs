//! JSON-RPC access to the web3 provider: the wallet or node that exposes the
//! user's accounts and signs `eth_sendTransaction` on their behalf.

use crate::error::RaffleError;
use color_eyre::eyre::{
    Result,
    WrapErr,
};
use raffle_abi::{
    Address,
    TxHash,
};
use serde::{
    Deserialize,
    Serialize,
};
use serde_json::{
    Value,
    json,
};
use std::{
    future::Future,
    str::FromStr,
    sync::atomic::{
        AtomicU64,
        Ordering,
    },
    time::Duration,
};
use tokio::time;
use tracing::{
    debug,
    warn,
};

pub const DEFAULT_RPC_URL: &str = "http://localhost:8545";

/// One JSON-RPC round trip. `Ok(Value::Null)` is a valid answer (e.g. a
/// receipt that does not exist yet).
pub trait Transport: Send + Sync + 'static {
    fn request(
        &self,
        method: &'static str,
        params: Value,
    ) -> impl Future<Output = Result<Value, RaffleError>> + Send;
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

impl RpcErrorObject {
    fn into_error(self) -> RaffleError {
        // Revert data is either the bare hex string or nested as `{ data: "0x…" }`.
        let data = self.data.as_ref().and_then(|d| {
            d.as_str()
                .or_else(|| d.get("data").and_then(Value::as_str))
        });
        RaffleError::from_rpc(self.code, &self.message, data)
    }
}

pub struct HttpTransport {
    url: String,
    http: reqwest::Client,
    next_id: AtomicU64,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .wrap_err("failed to build HTTP client for web3 provider")?;
        Ok(Self {
            url,
            http,
            next_id: AtomicU64::new(1),
        })
    }
}

impl Transport for HttpTransport {
    async fn request(
        &self,
        method: &'static str,
        params: Value,
    ) -> Result<Value, RaffleError> {
        let req = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };
        let res = self.http.post(&self.url).json(&req).send().await?;
        let status = res.status();
        let bytes = res.bytes().await?;
        if !status.is_success() {
            let body = String::from_utf8_lossy(&bytes);
            return Err(RaffleError::Network(format!(
                "provider responded with {status} to {method}: {body}"
            )));
        }
        let resp: RpcResponse = serde_json::from_slice(&bytes).map_err(|e| {
            RaffleError::Network(format!("invalid JSON-RPC response to {method}: {e}"))
        })?;
        if let Some(err) = resp.error {
            return Err(err.into_error());
        }
        Ok(resp.result.unwrap_or(Value::Null))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Receipt {
    pub tx_hash: TxHash,
    pub block_number: u64,
    pub succeeded: bool,
}

/// Typed wrapper over the handful of `eth_*` methods the client needs.
pub struct RpcProvider<T> {
    transport: T,
    poll_interval: Duration,
    confirmation_timeout: Duration,
}

impl<T: Transport> RpcProvider<T> {
    pub fn new(transport: T, poll_interval: Duration, confirmation_timeout: Duration) -> Self {
        Self {
            transport,
            poll_interval,
            confirmation_timeout,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub async fn chain_id(&self) -> Result<u64, RaffleError> {
        let value = self.transport.request("eth_chainId", json!([])).await?;
        parse_quantity(&value, "eth_chainId")
    }

    pub async fn accounts(&self) -> Result<Vec<Address>, RaffleError> {
        let value = self.transport.request("eth_accounts", json!([])).await?;
        parse_accounts(&value, "eth_accounts")
    }

    /// Asks the wallet to expose accounts, which may prompt the user.
    pub async fn request_accounts(&self) -> Result<Vec<Address>, RaffleError> {
        let value = self
            .transport
            .request("eth_requestAccounts", json!([]))
            .await?;
        parse_accounts(&value, "eth_requestAccounts")
    }

    pub async fn block_number(&self) -> Result<u64, RaffleError> {
        let value = self.transport.request("eth_blockNumber", json!([])).await?;
        parse_quantity(&value, "eth_blockNumber")
    }

    /// Read-only `eth_call` against the latest block. Returns the raw hex
    /// return data.
    pub async fn call(&self, to: Address, data: &str) -> Result<String, RaffleError> {
        let value = self
            .transport
            .request(
                "eth_call",
                json!([{ "to": to.to_hex(), "data": data }, "latest"]),
            )
            .await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| RaffleError::Decode(format!("eth_call returned {value}")))
    }

    pub async fn send_transaction(
        &self,
        from: Address,
        to: Address,
        value: u128,
        data: &str,
    ) -> Result<TxHash, RaffleError> {
        let tx = json!({
            "from": from.to_hex(),
            "to": to.to_hex(),
            "value": format!("0x{value:x}"),
            "data": data,
        });
        let result = self
            .transport
            .request("eth_sendTransaction", json!([tx]))
            .await?;
        let raw = result.as_str().ok_or_else(|| {
            RaffleError::Decode(format!("eth_sendTransaction returned {result}"))
        })?;
        Ok(TxHash::from_str(raw)?)
    }

    pub async fn transaction_receipt(
        &self,
        tx_hash: TxHash,
    ) -> Result<Option<Receipt>, RaffleError> {
        let value = self
            .transport
            .request("eth_getTransactionReceipt", json!([tx_hash.to_string()]))
            .await?;
        if value.is_null() {
            return Ok(None);
        }
        let block_number = value
            .get("blockNumber")
            .filter(|v| !v.is_null())
            .map(|v| parse_quantity(v, "receipt.blockNumber"))
            .transpose()?;
        let Some(block_number) = block_number else {
            // Pending receipts from some providers carry no block yet.
            return Ok(None);
        };
        let status = value
            .get("status")
            .map(|v| parse_quantity(v, "receipt.status"))
            .transpose()?
            .unwrap_or(1);
        Ok(Some(Receipt {
            tx_hash,
            block_number,
            succeeded: status == 1,
        }))
    }

    /// Polls until the transaction is mined with `confirmations` blocks on
    /// top of (and including) its own block.
    pub async fn wait_for_receipt(
        &self,
        tx_hash: TxHash,
        confirmations: u64,
    ) -> Result<Receipt, RaffleError> {
        let confirmations = confirmations.max(1);
        let wait = async {
            loop {
                match self.transaction_receipt(tx_hash).await {
                    Ok(Some(receipt)) => {
                        if !receipt.succeeded {
                            return Err(RaffleError::Reverted {
                                reason: String::from("transaction reverted on-chain"),
                            });
                        }
                        match self.block_number().await {
                            Ok(latest) => {
                                let depth = latest.saturating_sub(receipt.block_number) + 1;
                                if depth >= confirmations {
                                    return Ok(receipt);
                                }
                                debug!(%tx_hash, depth, confirmations, "waiting for more confirmations");
                            }
                            Err(RaffleError::Network(msg)) => {
                                warn!(%tx_hash, %msg, "block number poll failed; retrying");
                            }
                            Err(other) => return Err(other),
                        }
                    }
                    Ok(None) => {}
                    Err(RaffleError::Network(msg)) => {
                        warn!(%tx_hash, %msg, "receipt poll failed; retrying");
                    }
                    Err(other) => return Err(other),
                }
                time::sleep(self.poll_interval).await;
            }
        };
        time::timeout(self.confirmation_timeout, wait)
            .await
            .map_err(|_| RaffleError::ConfirmationTimeout)?
    }
}

pub fn parse_quantity(value: &Value, what: &str) -> Result<u64, RaffleError> {
    let raw = value
        .as_str()
        .ok_or_else(|| RaffleError::Decode(format!("{what}: expected hex string, got {value}")))?;
    let stripped = raw.strip_prefix("0x").unwrap_or(raw);
    u64::from_str_radix(stripped, 16)
        .map_err(|_| RaffleError::Decode(format!("{what}: invalid quantity {raw}")))
}

fn parse_accounts(value: &Value, what: &str) -> Result<Vec<Address>, RaffleError> {
    let list = value
        .as_array()
        .ok_or_else(|| RaffleError::Decode(format!("{what}: expected array, got {value}")))?;
    list.iter()
        .map(|entry| {
            let raw = entry.as_str().ok_or_else(|| {
                RaffleError::Decode(format!("{what}: expected address string, got {entry}"))
            })?;
            Ok(Address::from_str(raw)?)
        })
        .collect()
}
