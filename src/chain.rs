//! Consumed interfaces of the two chains and their alloy-backed implementation.

use crate::error::Error;
use alloy::{
    consensus::TxEnvelope,
    eips::{eip2718::Encodable2718, BlockId, BlockNumberOrTag},
    primitives::{Address, B256, U256},
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::types::TransactionRequest,
};
use async_trait::async_trait;
use std::{future::Future, time::Duration};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockHead {
    pub number: u64,
    pub timestamp: u64,
}

#[derive(Debug, Clone)]
pub struct SourceBlock {
    pub number: u64,
    pub hash: B256,
    pub timestamp: u64,
    pub transactions: Vec<TxEnvelope>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiptStatus {
    pub tx_hash: B256,
    pub success: bool,
    pub block_number: Option<u64>,
    pub gas_used: u64,
}

#[async_trait]
pub trait ChainReader: Send + Sync {
    async fn latest_block_number(&self) -> Result<u64, Error>;

    async fn latest_block(&self) -> Result<BlockHead, Error>;

    async fn block_by_number(&self, number: u64) -> Result<Option<SourceBlock>, Error>;

    /// Returns the transaction and whether it is still pending.
    async fn transaction_by_hash(&self, hash: B256) -> Result<Option<(TxEnvelope, bool)>, Error>;

    async fn balance_at(&self, address: Address, block: u64) -> Result<U256, Error>;
}

#[async_trait]
pub trait ChainWriter: Send + Sync {
    async fn send_transaction(&self, tx: &TxEnvelope) -> Result<B256, Error>;

    async fn transaction_receipt(&self, hash: B256) -> Result<Option<ReceiptStatus>, Error>;
}

#[async_trait]
pub trait GasOracle: Send + Sync {
    async fn estimate_gas(&self, call: TransactionRequest) -> Result<u64, Error>;
}

/// Everything the replay needs from the chain it writes to.
pub trait TargetChain: ChainReader + ChainWriter + GasOracle {}

impl<T: ChainReader + ChainWriter + GasOracle> TargetChain for T {}

/// Bounded retry for transport-level failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, Error>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, Error>>,
    {
        let mut attempt = 1;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < self.max_attempts => {
                    warn!(
                        operation,
                        attempt,
                        max_attempts = self.max_attempts,
                        "Transport error, retrying: {}",
                        err
                    );
                    tokio::time::sleep(self.backoff).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// JSON-RPC endpoint of one chain.
#[derive(Clone)]
pub struct RpcChain {
    label: &'static str,
    provider: DynProvider,
    retry: RetryPolicy,
}

impl RpcChain {
    pub async fn connect(
        label: &'static str,
        rpc_url: &str,
        retry: RetryPolicy,
    ) -> Result<Self, Error> {
        let provider = ProviderBuilder::new().connect(rpc_url).await?.erased();
        debug!(chain = label, rpc_url, "Connected");
        Ok(Self {
            label,
            provider,
            retry,
        })
    }

    pub fn label(&self) -> &'static str {
        self.label
    }
}

#[async_trait]
impl ChainReader for RpcChain {
    async fn latest_block_number(&self) -> Result<u64, Error> {
        self.retry
            .run("eth_blockNumber", move || async move {
                self.provider.get_block_number().await.map_err(Error::from)
            })
            .await
    }

    async fn latest_block(&self) -> Result<BlockHead, Error> {
        let block = self
            .retry
            .run("eth_getBlockByNumber", move || async move {
                self.provider
                    .get_block_by_number(BlockNumberOrTag::Latest)
                    .await
                    .map_err(Error::from)
            })
            .await?
            .ok_or_else(|| Error::Config(format!("{} chain has no latest block", self.label)))?;

        Ok(BlockHead {
            number: block.header.number,
            timestamp: block.header.timestamp,
        })
    }

    async fn block_by_number(&self, number: u64) -> Result<Option<SourceBlock>, Error> {
        let block = self
            .retry
            .run("eth_getBlockByNumber", move || async move {
                self.provider
                    .get_block_by_number(BlockNumberOrTag::Number(number))
                    .full()
                    .await
                    .map_err(Error::from)
            })
            .await?;

        let Some(block) = block else {
            return Ok(None);
        };
        let transactions = match block.transactions.as_transactions() {
            Some(txs) => txs.iter().map(|tx| tx.inner.inner().clone()).collect(),
            None if block.transactions.is_empty() => Vec::new(),
            None => return Err(Error::MissingTransactionBodies(number)),
        };

        Ok(Some(SourceBlock {
            number,
            hash: block.header.hash,
            timestamp: block.header.timestamp,
            transactions,
        }))
    }

    async fn transaction_by_hash(&self, hash: B256) -> Result<Option<(TxEnvelope, bool)>, Error> {
        let tx = self
            .retry
            .run("eth_getTransactionByHash", move || async move {
                self.provider
                    .get_transaction_by_hash(hash)
                    .await
                    .map_err(Error::from)
            })
            .await?;

        Ok(tx.map(|tx| {
            let pending = tx.block_number.is_none();
            (tx.inner.inner().clone(), pending)
        }))
    }

    async fn balance_at(&self, address: Address, block: u64) -> Result<U256, Error> {
        self.retry
            .run("eth_getBalance", move || async move {
                self.provider
                    .get_balance(address)
                    .block_id(BlockId::number(block))
                    .await
                    .map_err(Error::from)
            })
            .await
    }
}

#[async_trait]
impl ChainWriter for RpcChain {
    async fn send_transaction(&self, tx: &TxEnvelope) -> Result<B256, Error> {
        let hash = *tx.tx_hash();
        let pending = self
            .provider
            .send_raw_transaction(&tx.encoded_2718())
            .await
            .map_err(|source| Error::Submission { hash, source })?;
        Ok(*pending.tx_hash())
    }

    async fn transaction_receipt(&self, hash: B256) -> Result<Option<ReceiptStatus>, Error> {
        let receipt = self
            .retry
            .run("eth_getTransactionReceipt", move || async move {
                self.provider
                    .get_transaction_receipt(hash)
                    .await
                    .map_err(Error::from)
            })
            .await?;

        Ok(receipt.map(|receipt| ReceiptStatus {
            tx_hash: receipt.transaction_hash,
            success: receipt.status(),
            block_number: receipt.block_number,
            gas_used: receipt.gas_used,
        }))
    }
}

#[async_trait]
impl GasOracle for RpcChain {
    async fn estimate_gas(&self, call: TransactionRequest) -> Result<u64, Error> {
        let call = &call;
        self.retry
            .run("eth_estimateGas", move || async move {
                self.provider
                    .estimate_gas(call.clone())
                    .await
                    .map_err(Error::from)
            })
            .await
    }
}
