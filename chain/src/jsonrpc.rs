//! Ethereum JSON-RPC provider over HTTP.
//!
//! The endpoint must be a signing node or wallet bridge: transactions are
//! sent with `eth_sendTransaction` and signed by the endpoint for `from`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use nftvote_abi::{contracts::custom_errors, decode_revert, ContractError};
use nftvote_types::{Address, ChainDescriptor, Log, ReceiptStatus, TransactionReceipt, TxHash};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{ChainError, ChainProvider};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// EIP-1193 "user rejected request".
const USER_REJECTED_CODE: i64 = 4001;
/// Geth's code for execution reverted with data.
const EXECUTION_REVERTED_CODE: i64 = 3;

pub struct JsonRpcProvider {
    http: reqwest::Client,
    descriptor: ChainDescriptor,
    next_id: AtomicU64,
    known_errors: Vec<ContractError>,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReceipt {
    transaction_hash: TxHash,
    block_number: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    logs: Vec<RawLog>,
}

#[derive(Debug, Deserialize)]
struct RawLog {
    address: Address,
    topics: Vec<String>,
    data: String,
}

impl JsonRpcProvider {
    /// Provider for `descriptor`, talking to `descriptor.rpc_url`.
    pub fn new(descriptor: ChainDescriptor) -> Self {
        Self::with_timeout(descriptor, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(descriptor: ChainDescriptor, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "cannot build HTTP client with timeouts, using defaults");
                reqwest::Client::default()
            });
        Self {
            http,
            descriptor,
            next_id: AtomicU64::new(1),
            known_errors: custom_errors(),
        }
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, ChainError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params });

        tracing::trace!(chain = self.descriptor.chain_id, method, id, "rpc request");

        let response = self
            .http
            .post(&self.descriptor.rpc_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ChainError::Transport(format!("request timed out: {e}"))
                } else if e.is_connect() {
                    ChainError::Transport(format!("connection failed: {e}"))
                } else {
                    ChainError::Transport(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(ChainError::Transport(format!(
                "endpoint returned HTTP {}",
                response.status()
            )));
        }

        let parsed: RpcResponse = response
            .json()
            .await
            .map_err(|e| ChainError::InvalidResponse(format!("invalid JSON-RPC body: {e}")))?;

        match (parsed.error, parsed.result) {
            (Some(err), _) => Err(self.map_rpc_error(err)),
            (None, Some(result)) => Ok(result),
            (None, None) => Ok(Value::Null),
        }
    }

    fn map_rpc_error(&self, err: RpcErrorObject) -> ChainError {
        map_rpc_error(err, &self.known_errors)
    }
}

fn map_rpc_error(err: RpcErrorObject, known: &[ContractError]) -> ChainError {
    let lower = err.message.to_ascii_lowercase();
    if err.code == USER_REJECTED_CODE
        || lower.contains("user rejected")
        || lower.contains("user denied")
    {
        return ChainError::UserRejected;
    }

    let revert_data = err
        .data
        .as_ref()
        .and_then(|d| d.as_str().or_else(|| d.get("data").and_then(Value::as_str)))
        .and_then(|s| decode_hex(s).ok());
    if let Some(reason) = revert_data.as_deref().and_then(|d| decode_revert(d, known)) {
        return ChainError::Reverted(reason);
    }
    if err.code == EXECUTION_REVERTED_CODE || lower.contains("revert") {
        let reason = lower
            .find("reverted:")
            .map(|i| err.message[i + "reverted:".len()..].trim().to_string())
            .filter(|r| !r.is_empty())
            .unwrap_or(err.message);
        return ChainError::Reverted(reason);
    }
    ChainError::Rpc {
        code: err.code,
        message: err.message,
    }
}

fn decode_hex(s: &str) -> Result<Vec<u8>, ChainError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(digits).map_err(|e| ChainError::InvalidResponse(format!("bad hex data: {e}")))
}

fn encode_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

fn parse_quantity(s: &str) -> Result<u64, ChainError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    u64::from_str_radix(digits, 16)
        .map_err(|e| ChainError::InvalidResponse(format!("bad quantity {s}: {e}")))
}

fn parse_topic(s: &str) -> Result<[u8; 32], ChainError> {
    let bytes = decode_hex(s)?;
    bytes
        .try_into()
        .map_err(|_| ChainError::InvalidResponse(format!("topic is not 32 bytes: {s}")))
}

fn parse_receipt(value: Value) -> Result<Option<TransactionReceipt>, ChainError> {
    if value.is_null() {
        return Ok(None);
    }
    let raw: RawReceipt = serde_json::from_value(value)
        .map_err(|e| ChainError::InvalidResponse(format!("invalid receipt: {e}")))?;

    // Pre-Byzantium receipts carry no status; treat them as successful.
    let status = match raw.status.as_deref().map(parse_quantity).transpose()? {
        Some(0) => ReceiptStatus::Failed,
        _ => ReceiptStatus::Success,
    };
    let logs = raw
        .logs
        .into_iter()
        .map(|l| {
            Ok(Log {
                address: l.address,
                topics: l.topics.iter().map(|t| parse_topic(t)).collect::<Result<_, _>>()?,
                data: decode_hex(&l.data)?,
            })
        })
        .collect::<Result<Vec<_>, ChainError>>()?;

    Ok(Some(TransactionReceipt {
        tx_hash: raw.transaction_hash,
        block_number: parse_quantity(&raw.block_number)?,
        status,
        logs,
    }))
}

#[async_trait]
impl ChainProvider for JsonRpcProvider {
    fn descriptor(&self) -> &ChainDescriptor {
        &self.descriptor
    }

    async fn accounts(&self) -> Result<Vec<Address>, ChainError> {
        let result = self.request("eth_accounts", json!([])).await?;
        serde_json::from_value(result)
            .map_err(|e| ChainError::InvalidResponse(format!("invalid accounts: {e}")))
    }

    async fn call(&self, to: Address, data: Vec<u8>) -> Result<Vec<u8>, ChainError> {
        let params = json!([{ "to": to, "data": encode_hex(&data) }, "latest"]);
        let result = self.request("eth_call", params).await?;
        let hex_str = result
            .as_str()
            .ok_or_else(|| ChainError::InvalidResponse("eth_call result is not a string".into()))?;
        decode_hex(hex_str)
    }

    async fn send_transaction(
        &self,
        from: Address,
        to: Address,
        data: Vec<u8>,
    ) -> Result<TxHash, ChainError> {
        let params = json!([{ "from": from, "to": to, "data": encode_hex(&data) }]);
        let result = self.request("eth_sendTransaction", params).await?;
        serde_json::from_value(result)
            .map_err(|e| ChainError::InvalidResponse(format!("invalid transaction hash: {e}")))
    }

    async fn transaction_receipt(
        &self,
        hash: TxHash,
    ) -> Result<Option<TransactionReceipt>, ChainError> {
        let result = self
            .request("eth_getTransactionReceipt", json!([hash]))
            .await?;
        parse_receipt(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nftvote_abi::{encode, Token};

    fn rpc_error(code: i64, message: &str, data: Option<Value>) -> RpcErrorObject {
        RpcErrorObject {
            code,
            message: message.to_string(),
            data,
        }
    }

    #[test]
    fn user_rejection_by_code_and_text() {
        let known = custom_errors();
        assert_eq!(
            map_rpc_error(rpc_error(4001, "whatever", None), &known),
            ChainError::UserRejected
        );
        assert_eq!(
            map_rpc_error(rpc_error(-32000, "MetaMask Tx Signature: User denied transaction signature.", None), &known),
            ChainError::UserRejected
        );
    }

    #[test]
    fn revert_with_error_string_data() {
        let mut data = vec![0x08, 0xc3, 0x79, 0xa0];
        data.extend(encode(&[Token::string("Not eligible for this election area")]));
        let err = rpc_error(3, "execution reverted", Some(json!(encode_hex(&data))));
        assert_eq!(
            map_rpc_error(err, &custom_errors()),
            ChainError::Reverted("Not eligible for this election area".into())
        );
    }

    #[test]
    fn revert_with_custom_error_data() {
        let known = custom_errors();
        let selector = known
            .iter()
            .find(|e| e.name == "AlreadyVoted")
            .unwrap()
            .selector();
        let err = rpc_error(3, "execution reverted", Some(json!({ "data": encode_hex(&selector) })));
        assert_eq!(map_rpc_error(err, &known), ChainError::Reverted("AlreadyVoted".into()));
    }

    #[test]
    fn revert_reason_from_message_text() {
        let err = rpc_error(-32000, "execution reverted: Election ended", None);
        assert_eq!(
            map_rpc_error(err, &custom_errors()),
            ChainError::Reverted("Election ended".into())
        );
    }

    #[test]
    fn other_errors_are_rpc() {
        let err = rpc_error(-32000, "insufficient funds for gas * price + value", None);
        assert!(matches!(map_rpc_error(err, &custom_errors()), ChainError::Rpc { code: -32000, .. }));
    }

    #[test]
    fn parse_pending_receipt() {
        assert_eq!(parse_receipt(Value::Null).unwrap(), None);
    }

    #[test]
    fn parse_full_receipt() {
        let hash = format!("0x{}", "ab".repeat(32));
        let topic = format!("0x{}", "01".repeat(32));
        let value = json!({
            "transactionHash": hash,
            "blockNumber": "0x1b4",
            "status": "0x1",
            "logs": [{
                "address": "0xdb2c618f798c8e04db4749a05bf972c94ea979e1",
                "topics": [topic],
                "data": "0x0000"
            }]
        });
        let receipt = parse_receipt(value).unwrap().unwrap();
        assert_eq!(receipt.block_number, 436);
        assert!(receipt.is_success());
        assert_eq!(receipt.logs[0].topics[0], [1u8; 32]);
        assert_eq!(receipt.logs[0].data, vec![0, 0]);
    }

    #[test]
    fn parse_failed_receipt() {
        let value = json!({
            "transactionHash": format!("0x{}", "cd".repeat(32)),
            "blockNumber": "0x10",
            "status": "0x0",
            "logs": []
        });
        let receipt = parse_receipt(value).unwrap().unwrap();
        assert_eq!(receipt.status, ReceiptStatus::Failed);
    }

    #[test]
    fn quantity_parsing() {
        assert_eq!(parse_quantity("0x0").unwrap(), 0);
        assert_eq!(parse_quantity("0xff").unwrap(), 255);
        assert!(parse_quantity("0xzz").is_err());
    }

    #[tokio::test]
    async fn silent_endpoint_times_out_as_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut descriptor = ChainDescriptor::bsc_testnet();
        descriptor.rpc_url = format!("http://{}", listener.local_addr().unwrap());
        let provider = JsonRpcProvider::with_timeout(descriptor, Duration::from_millis(100));

        let err = provider.accounts().await.unwrap_err();
        assert!(
            matches!(&err, ChainError::Transport(message) if message.contains("timed out")),
            "{err:?}"
        );
        assert!(err.is_transient());
        drop(listener);
    }
}
