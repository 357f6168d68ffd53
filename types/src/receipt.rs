//! Transaction receipts and event logs.

use serde::{Deserialize, Serialize};

use crate::{Address, TxHash};

/// One event log emitted during a transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
    /// Contract that emitted the event.
    pub address: Address,
    pub topics: Vec<[u8; 32]>,
    pub data: Vec<u8>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReceiptStatus {
    Success,
    Failed,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    pub tx_hash: TxHash,
    pub block_number: u64,
    pub status: ReceiptStatus,
    pub logs: Vec<Log>,
}

impl TransactionReceipt {
    pub fn is_success(&self) -> bool {
        self.status == ReceiptStatus::Success
    }

    /// Logs emitted by `contract`, in receipt order.
    pub fn logs_from<'a>(&'a self, contract: &'a Address) -> impl Iterator<Item = &'a Log> + 'a {
        self.logs.iter().filter(move |log| log.address == *contract)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logs_from_filters_by_emitter() {
        let a = Address::new([1; 20]);
        let b = Address::new([2; 20]);
        let receipt = TransactionReceipt {
            tx_hash: TxHash::ZERO,
            block_number: 9,
            status: ReceiptStatus::Success,
            logs: vec![
                Log { address: a, topics: vec![], data: vec![1] },
                Log { address: b, topics: vec![], data: vec![2] },
                Log { address: a, topics: vec![], data: vec![3] },
            ],
        };
        let data: Vec<_> = receipt.logs_from(&a).map(|l| l.data[0]).collect();
        assert_eq!(data, vec![1, 3]);
        assert!(receipt.is_success());
    }
}
