use alloy::{
    consensus::{Transaction, TxEnvelope},
    eips::{eip2930::AccessList, Typed2718},
    primitives::{Address, Bytes, ChainId, B256, U256},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GasPricing {
    /// Single gas price (legacy and access-list transactions).
    Legacy { gas_price: u128 },
    /// EIP-1559 tip cap and fee cap.
    Dynamic {
        max_priority_fee_per_gas: u128,
        max_fee_per_gas: u128,
    },
}

/// Signature-free view of a source transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalTransaction {
    /// Hash on the source chain, kept for override matching and logs only.
    pub source_hash: B256,
    pub tx_type: u8,
    pub nonce: u64,
    /// `None` for contract creation.
    pub to: Option<Address>,
    pub value: U256,
    pub input: Bytes,
    pub gas_limit: u64,
    pub pricing: GasPricing,
    pub access_list: Option<AccessList>,
    pub chain_id: Option<ChainId>,
}

impl LogicalTransaction {
    pub fn is_creation(&self) -> bool {
        self.to.is_none()
    }
}

pub fn decode(tx: &TxEnvelope) -> LogicalTransaction {
    let pricing = match tx.gas_price() {
        Some(gas_price) => GasPricing::Legacy { gas_price },
        None => GasPricing::Dynamic {
            max_priority_fee_per_gas: tx.max_priority_fee_per_gas().unwrap_or_default(),
            max_fee_per_gas: tx.max_fee_per_gas(),
        },
    };

    LogicalTransaction {
        source_hash: *tx.tx_hash(),
        tx_type: tx.ty(),
        nonce: tx.nonce(),
        to: tx.to(),
        value: tx.value(),
        input: tx.input().clone(),
        gas_limit: tx.gas_limit(),
        pricing,
        access_list: tx.access_list().cloned(),
        chain_id: tx.chain_id(),
    }
}
