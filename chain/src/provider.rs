//! The wallet/signing provider seam.

use std::time::Duration;

use async_trait::async_trait;
use nftvote_types::{Address, ChainDescriptor, TransactionReceipt, TxHash};

use crate::ChainError;

/// Receipt polling interval used when the caller has no preference.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Access to one ledger through a wallet that can sign for its accounts.
#[async_trait]
pub trait ChainProvider: Send + Sync {
    fn descriptor(&self) -> &ChainDescriptor;

    /// Accounts the wallet will sign for. Empty when no wallet is connected.
    async fn accounts(&self) -> Result<Vec<Address>, ChainError>;

    /// Read-only contract call against the latest block.
    async fn call(&self, to: Address, data: Vec<u8>) -> Result<Vec<u8>, ChainError>;

    /// Ask the wallet to sign and broadcast a transaction.
    async fn send_transaction(
        &self,
        from: Address,
        to: Address,
        data: Vec<u8>,
    ) -> Result<TxHash, ChainError>;

    /// The receipt, or `None` while the transaction is still pending.
    async fn transaction_receipt(
        &self,
        hash: TxHash,
    ) -> Result<Option<TransactionReceipt>, ChainError>;

    /// Poll until the transaction is mined.
    ///
    /// There is no deadline: a submitted transaction is eventually mined or
    /// dropped, and callers cancel by dropping the future. Transport errors
    /// while polling are logged and retried; any other error is returned.
    async fn wait_for_receipt(
        &self,
        hash: TxHash,
        poll: Duration,
    ) -> Result<TransactionReceipt, ChainError> {
        loop {
            match self.transaction_receipt(hash).await {
                Ok(Some(receipt)) => return Ok(receipt),
                Ok(None) => {}
                Err(e) if e.is_transient() => {
                    tracing::warn!(tx = %hash, error = %e, "receipt poll failed, retrying");
                }
                Err(e) => return Err(e),
            }
            tokio::time::sleep(poll).await;
        }
    }
}
