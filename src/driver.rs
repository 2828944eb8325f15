use crate::{
    builder::{self, ReplayTxType},
    chain::{ChainReader, SourceBlock, TargetChain},
    chain_config::SigningDomain,
    config::ReplayConfig,
    decoder::{self, LogicalTransaction},
    error::Error,
    gas_estimator::GasEstimator,
    override_resolver::{OverrideDirective, OverrideResolver},
    signer::{self, Keystore},
};
use alloy::{
    consensus::TxEnvelope,
    eips::Typed2718,
    primitives::{Address, B256},
};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DriverState {
    #[default]
    Idle,
    FetchingBlock,
    SkipBlock,
    ProcessingTransaction,
    AwaitingConfirmations,
    NextBlock,
    Finished,
    Aborted,
}

/// Position of the replay: the block being replayed and the target-chain
/// hashes submitted for it so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayCursor {
    block_number: u64,
    submitted: Vec<B256>,
}

impl ReplayCursor {
    pub fn new(block_number: u64) -> Self {
        Self {
            block_number,
            submitted: Vec::new(),
        }
    }

    pub fn block_number(&self) -> u64 {
        self.block_number
    }

    pub fn submitted(&self) -> &[B256] {
        &self.submitted
    }

    pub fn record(&mut self, hash: B256) {
        self.submitted.push(hash);
    }

    /// Moves to the next block and forgets the previous block's hashes.
    pub fn advance(&mut self) {
        self.block_number += 1;
        self.submitted.clear();
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayProgress {
    pub state: DriverState,
    pub current_block: u64,
    pub end_block: Option<u64>,
    pub blocks_replayed: u64,
    pub blocks_skipped: u64,
    pub transactions_submitted: u64,
    pub failed_receipts: Vec<B256>,
}

pub type SharedProgress = Arc<RwLock<ReplayProgress>>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayReport {
    pub blocks_replayed: u64,
    pub blocks_skipped: u64,
    pub transactions_submitted: u64,
    /// Included on the target chain with status zero.
    pub failed_receipts: Vec<B256>,
}

pub struct ReplayDriver<'a, S: ?Sized, T: ?Sized> {
    source: &'a S,
    target: &'a T,
    keystore: &'a dyn Keystore,
    config: &'a ReplayConfig,
    progress: SharedProgress,
}

impl<'a, S, T> ReplayDriver<'a, S, T>
where
    S: ChainReader + ?Sized,
    T: TargetChain + ?Sized,
{
    pub fn new(
        source: &'a S,
        target: &'a T,
        keystore: &'a dyn Keystore,
        config: &'a ReplayConfig,
    ) -> Self {
        Self {
            source,
            target,
            keystore,
            config,
            progress: SharedProgress::default(),
        }
    }

    pub fn progress(&self) -> SharedProgress {
        self.progress.clone()
    }

    /// Replays every block from `from_block` up to the source head observed at
    /// start (or `to_block` if lower). Any error aborts the whole run.
    pub async fn run(&self) -> Result<ReplayReport, Error> {
        let result = self.replay_range().await;
        let final_state = match result {
            Ok(_) => DriverState::Finished,
            Err(_) => DriverState::Aborted,
        };
        self.progress.write().await.state = final_state;
        result
    }

    async fn replay_range(&self) -> Result<ReplayReport, Error> {
        let latest = self.source.latest_block_number().await?;
        let end_block = self.config.to_block.map_or(latest, |to| to.min(latest));
        info!(
            from_block = self.config.from_block,
            end_block,
            source_head = latest,
            "Starting replay"
        );
        self.progress.write().await.end_block = Some(end_block);

        let mut report = ReplayReport::default();
        let mut cursor = ReplayCursor::new(self.config.from_block);
        while cursor.block_number() <= end_block {
            self.set_state(DriverState::FetchingBlock, cursor.block_number())
                .await;
            let number = cursor.block_number();
            let block = self
                .source
                .block_by_number(number)
                .await?
                .ok_or(Error::BlockNotFound(number))?;

            if block.transactions.is_empty() {
                debug!(block = number, "No transactions, skipping");
                self.set_state(DriverState::SkipBlock, number).await;
                report.blocks_skipped += 1;
                self.progress.write().await.blocks_skipped += 1;
            } else {
                self.replay_block(&block, &mut cursor, &mut report).await?;
                report.blocks_replayed += 1;
                self.progress.write().await.blocks_replayed += 1;
            }

            self.set_state(DriverState::NextBlock, number).await;
            cursor.advance();
        }

        info!(
            blocks_replayed = report.blocks_replayed,
            blocks_skipped = report.blocks_skipped,
            transactions = report.transactions_submitted,
            failed = report.failed_receipts.len(),
            "Replay finished"
        );
        Ok(report)
    }

    async fn replay_block(
        &self,
        block: &SourceBlock,
        cursor: &mut ReplayCursor,
        report: &mut ReplayReport,
    ) -> Result<(), Error> {
        info!(
            block = block.number,
            hash = %block.hash,
            transactions = block.transactions.len(),
            "Processing block"
        );

        let source_domain = self
            .config
            .source_chain
            .domain_for(block.number, block.timestamp);
        let target_head = self.target.latest_block().await?;
        let target_domain = self
            .config
            .target_chain
            .domain_for(target_head.number, target_head.timestamp);

        for source_tx in &block.transactions {
            self.set_state(DriverState::ProcessingTransaction, block.number)
                .await;
            if !self.config.tx_delay.is_zero() {
                tokio::time::sleep(self.config.tx_delay).await;
            }

            let replayed = self
                .replay_transaction(source_tx, &source_domain, &target_domain)
                .await?;
            let hash = self.target.send_transaction(&replayed).await?;
            info!(
                source_hash = %source_tx.tx_hash(),
                target_hash = %hash,
                "Submitted transaction to target chain"
            );

            cursor.record(hash);
            report.transactions_submitted += 1;
            self.progress.write().await.transactions_submitted += 1;
        }

        self.set_state(DriverState::AwaitingConfirmations, block.number)
            .await;
        if !self.config.block_delay.is_zero() {
            debug!(delay = ?self.config.block_delay, "Waiting for target inclusion");
            tokio::time::sleep(self.config.block_delay).await;
        }
        self.await_confirmations(cursor.submitted(), report).await
    }

    /// Decode, resolve overrides, estimate gas, build and sign one source transaction.
    pub async fn replay_transaction(
        &self,
        source_tx: &TxEnvelope,
        source_domain: &SigningDomain,
        target_domain: &SigningDomain,
    ) -> Result<TxEnvelope, Error> {
        ReplayTxType::try_from(source_tx.ty())?;
        let sender = source_domain.recover_sender(source_tx)?;
        let hash = *source_tx.tx_hash();

        let (fetched, pending) = self
            .source
            .transaction_by_hash(hash)
            .await?
            .ok_or(Error::TransactionNotFound(hash))?;
        if pending {
            return Err(Error::PendingTransaction(hash));
        }

        let logical = decoder::decode(&fetched);
        debug!(
            tx_hash = %hash,
            %sender,
            tx_type = logical.tx_type,
            nonce = logical.nonce,
            to = ?logical.to,
            value = %logical.value,
            "Decoded source transaction"
        );
        self.rebuild(sender, &logical, target_domain).await
    }

    async fn rebuild(
        &self,
        sender: Address,
        logical: &LogicalTransaction,
        target_domain: &SigningDomain,
    ) -> Result<TxEnvelope, Error> {
        let directive = OverrideResolver::new(&self.config.overrides)
            .resolve(sender, logical, self.target)
            .await?;
        let (recipient, value) = OverrideDirective::apply(directive.as_ref(), logical);

        let gas_limit = GasEstimator::new(self.target, self.config.gas_margin)
            .estimate(sender, recipient, value, &logical.input)
            .await?;

        let unsigned = builder::build(logical, directive.as_ref(), gas_limit)?;
        let private_key = self
            .keystore
            .private_key_for(sender)
            .ok_or(Error::MissingPrivateKey(sender))?;
        signer::sign(unsigned, target_domain, &private_key)
    }

    async fn await_confirmations(
        &self,
        hashes: &[B256],
        report: &mut ReplayReport,
    ) -> Result<(), Error> {
        let attempts = self.config.confirmation.attempts;
        for &hash in hashes {
            let mut receipt = None;
            for attempt in 1..=attempts {
                receipt = self.target.transaction_receipt(hash).await?;
                if receipt.is_some() {
                    break;
                }
                debug!(%hash, attempt, "Receipt not available yet");
                if attempt < attempts {
                    tokio::time::sleep(self.config.confirmation.interval).await;
                }
            }

            let receipt = receipt.ok_or(Error::ConfirmationTimeout { hash, attempts })?;
            if receipt.success {
                info!(
                    hash = %receipt.tx_hash,
                    block = ?receipt.block_number,
                    gas_used = receipt.gas_used,
                    "Transaction replayed on target chain"
                );
            } else {
                // Reverted on the target chain; reported, not fatal.
                warn!(
                    hash = %receipt.tx_hash,
                    block = ?receipt.block_number,
                    "Replayed transaction failed"
                );
                report.failed_receipts.push(receipt.tx_hash);
                self.progress.write().await.failed_receipts.push(receipt.tx_hash);
            }
        }
        Ok(())
    }

    async fn set_state(&self, state: DriverState, block: u64) {
        let mut progress = self.progress.write().await;
        progress.state = state;
        progress.current_block = block;
    }
}
