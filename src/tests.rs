use crate::{
    chain::{BlockHead, ChainReader, ChainWriter, GasOracle, ReceiptStatus, SourceBlock},
    chain_config::ChainSpec,
    config::{ConfirmationConfig, ReplayConfig},
    decoder,
    driver::{DriverState, ReplayDriver},
    error::{Error, ErrorKind},
    override_resolver::{
        CreationOverride, KnownHashOverride, OverrideConfig, OverrideResolver, OverrideTrigger,
    },
    signer::{self, MnemonicKeystore},
};
use alloy::{
    consensus::{
        SignableTransaction, Transaction, TxEip1559, TxEip2930, TxEip7702, TxEnvelope, TxLegacy,
        TypedTransaction,
    },
    eips::{eip2930::AccessList, Typed2718},
    primitives::{address, Address, Bytes, Signature, TxKind, B256, U256},
    rpc::types::TransactionRequest,
    signers::local::{coins_bip39::English, MnemonicBuilder, PrivateKeySigner},
    transports::TransportErrorKind,
};
use async_trait::async_trait;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::{
    collections::{HashMap, HashSet},
    sync::Mutex,
    time::Duration,
};

const MNEMONIC: &str = "test test test test test test test test test test test junk";
const SOURCE_CHAIN_ID: u64 = 8888;
const TARGET_CHAIN_ID: u64 = 9999;
const RECIPIENT: Address = address!("0x1234567890123456789012345678901234567890");
const FALLBACK: Address = address!("0x702332E028e45103a036Cf37E4cc6a9B55978A93");

fn wallet(index: u32) -> PrivateKeySigner {
    MnemonicBuilder::<English>::default()
        .phrase(MNEMONIC)
        .index(index)
        .unwrap()
        .build()
        .unwrap()
}

fn wallet_key(index: u32) -> String {
    hex::encode(wallet(index).credential().to_bytes())
}

/// In-memory chain serving both sides of a replay.
#[derive(Default)]
struct MockChain {
    head: BlockHead,
    blocks: HashMap<u64, SourceBlock>,
    pending: HashSet<B256>,
    balances: HashMap<Address, U256>,
    gas_estimate: u64,
    failing_nonces: HashSet<u64>,
    withhold_receipts: bool,
    rejecting: bool,
    fetched_blocks: Mutex<Vec<u64>>,
    balance_queries: Mutex<Vec<(Address, u64)>>,
    estimates: Mutex<Vec<TransactionRequest>>,
    sent: Mutex<Vec<TxEnvelope>>,
    receipt_queries: Mutex<Vec<B256>>,
}

impl MockChain {
    fn source(blocks: Vec<SourceBlock>) -> Self {
        let head = blocks.iter().map(|block| block.number).max().unwrap_or(0);
        Self {
            head: BlockHead {
                number: head,
                timestamp: 0,
            },
            blocks: blocks.into_iter().map(|block| (block.number, block)).collect(),
            ..Default::default()
        }
    }

    fn target(gas_estimate: u64) -> Self {
        Self {
            head: BlockHead {
                number: 500,
                timestamp: 1_700_000_000,
            },
            gas_estimate,
            ..Default::default()
        }
    }

    fn sent(&self) -> Vec<TxEnvelope> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChainReader for MockChain {
    async fn latest_block_number(&self) -> Result<u64, Error> {
        Ok(self.head.number)
    }

    async fn latest_block(&self) -> Result<BlockHead, Error> {
        Ok(self.head)
    }

    async fn block_by_number(&self, number: u64) -> Result<Option<SourceBlock>, Error> {
        self.fetched_blocks.lock().unwrap().push(number);
        Ok(self.blocks.get(&number).cloned())
    }

    async fn transaction_by_hash(&self, hash: B256) -> Result<Option<(TxEnvelope, bool)>, Error> {
        Ok(self
            .blocks
            .values()
            .flat_map(|block| block.transactions.iter())
            .find(|tx| *tx.tx_hash() == hash)
            .map(|tx| (tx.clone(), self.pending.contains(&hash))))
    }

    async fn balance_at(&self, address: Address, block: u64) -> Result<U256, Error> {
        self.balance_queries.lock().unwrap().push((address, block));
        Ok(self.balances.get(&address).copied().unwrap_or_default())
    }
}

#[async_trait]
impl ChainWriter for MockChain {
    async fn send_transaction(&self, tx: &TxEnvelope) -> Result<B256, Error> {
        self.sent.lock().unwrap().push(tx.clone());
        if self.rejecting {
            return Err(Error::Submission {
                hash: *tx.tx_hash(),
                source: TransportErrorKind::custom_str("nonce too low"),
            });
        }
        Ok(*tx.tx_hash())
    }

    async fn transaction_receipt(&self, hash: B256) -> Result<Option<ReceiptStatus>, Error> {
        self.receipt_queries.lock().unwrap().push(hash);
        if self.withhold_receipts {
            return Ok(None);
        }
        Ok(self
            .sent
            .lock()
            .unwrap()
            .iter()
            .find(|tx| *tx.tx_hash() == hash)
            .map(|tx| ReceiptStatus {
                tx_hash: hash,
                success: !self.failing_nonces.contains(&tx.nonce()),
                block_number: Some(self.head.number + 1),
                gas_used: 21_000,
            }))
    }
}

#[async_trait]
impl GasOracle for MockChain {
    async fn estimate_gas(&self, call: TransactionRequest) -> Result<u64, Error> {
        self.estimates.lock().unwrap().push(call);
        Ok(self.gas_estimate)
    }
}

fn replay_config(overrides: OverrideConfig) -> ReplayConfig {
    ReplayConfig {
        source_chain: ChainSpec::source_preset(SOURCE_CHAIN_ID),
        target_chain: ChainSpec::target_preset(TARGET_CHAIN_ID),
        from_block: 0,
        to_block: None,
        gas_margin: 100_000,
        block_delay: Duration::ZERO,
        tx_delay: Duration::ZERO,
        confirmation: ConfirmationConfig {
            attempts: 2,
            interval: Duration::ZERO,
        },
        overrides,
    }
}

fn sign_on_source(unsigned: TypedTransaction, signer_index: u32) -> TxEnvelope {
    let domain = ChainSpec::source_preset(SOURCE_CHAIN_ID).domain_for(0, 0);
    signer::sign(unsigned, &domain, &wallet_key(signer_index)).unwrap()
}

fn legacy_tx(nonce: u64, to: TxKind, value: U256) -> TypedTransaction {
    TypedTransaction::Legacy(TxLegacy {
        chain_id: None,
        nonce,
        gas_price: 1_000_000_000,
        gas_limit: 21_000,
        to,
        value,
        input: Bytes::from_static(&[0xca, 0xfe]),
    })
}

fn block(number: u64, transactions: Vec<TxEnvelope>) -> SourceBlock {
    SourceBlock {
        number,
        hash: B256::with_last_byte(number as u8),
        timestamp: number * 12,
        transactions,
    }
}

fn keystore() -> MnemonicKeystore {
    MnemonicKeystore::derive(MNEMONIC, 3).unwrap()
}

#[tokio::test]
async fn legacy_transaction_is_rebuilt_and_resigned_for_target() {
    let source_tx = sign_on_source(
        legacy_tx(7, TxKind::Call(RECIPIENT), U256::from(10u64).pow(U256::from(18u64))),
        0,
    );
    let source = MockChain::source(vec![block(0, vec![]), block(1, vec![source_tx.clone()])]);
    let target = MockChain::target(21_000);
    let config = replay_config(OverrideConfig::default());
    let keystore = keystore();

    let driver = ReplayDriver::new(&source, &target, &keystore, &config);
    let report = driver.run().await.unwrap();

    assert_eq!(report.blocks_replayed, 1);
    assert_eq!(report.blocks_skipped, 1);
    assert_eq!(report.transactions_submitted, 1);
    assert!(report.failed_receipts.is_empty());

    let sent = target.sent();
    assert_eq!(sent.len(), 1);
    let replayed = &sent[0];
    assert_eq!(replayed.ty(), 0);
    assert_eq!(replayed.nonce(), source_tx.nonce());
    assert_eq!(replayed.to(), Some(RECIPIENT));
    assert_eq!(replayed.value(), source_tx.value());
    assert_eq!(replayed.input(), source_tx.input());
    assert_eq!(replayed.gas_price(), source_tx.gas_price());
    assert_eq!(replayed.gas_limit(), 121_000);
    assert_eq!(replayed.chain_id(), Some(TARGET_CHAIN_ID));

    let target_domain = config.target_chain.domain_for(500, 1_700_000_000);
    assert_eq!(
        target_domain.recover_sender(replayed).unwrap(),
        wallet(0).address()
    );

    let estimates = target.estimates.lock().unwrap();
    assert_eq!(estimates[0].from, Some(wallet(0).address()));
    assert_eq!(estimates[0].to, Some(TxKind::Call(RECIPIENT)));

    // The submitted hash is what confirmation polling asks for
    assert_eq!(
        *target.receipt_queries.lock().unwrap(),
        vec![*replayed.tx_hash()]
    );

    let progress = driver.progress();
    let progress = progress.read().await;
    assert_eq!(progress.state, DriverState::Finished);
    assert_eq!(progress.end_block, Some(1));
    assert_eq!(progress.transactions_submitted, 1);
}

#[tokio::test]
async fn known_hash_override_recomputes_value_from_target_balance() {
    let sender = wallet(0).address();
    let source_tx = sign_on_source(legacy_tx(0, TxKind::Call(RECIPIENT), U256::from(5u64)), 0);

    let source = MockChain::source(vec![block(0, vec![source_tx.clone()])]);
    let mut target = MockChain::target(21_000);
    target.balances.insert(
        sender,
        "1000000000000000000000000000".parse::<U256>().unwrap(),
    );
    let config = replay_config(OverrideConfig {
        known_hash: Some(KnownHashOverride {
            trigger_hash: *source_tx.tx_hash(),
            deduction: "999987922985332012900325659".parse().unwrap(),
            fallback_recipient: FALLBACK,
        }),
        creation: None,
    });
    let keystore = keystore();

    ReplayDriver::new(&source, &target, &keystore, &config)
        .run()
        .await
        .unwrap();

    let sent = target.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(
        sent[0].value(),
        "12077014667987099674341".parse::<U256>().unwrap()
    );
    assert_eq!(sent[0].to(), Some(FALLBACK));
    assert_eq!(*target.balance_queries.lock().unwrap(), vec![(sender, 500)]);

    // Gas is estimated for the overridden call, not the original one
    let estimates = target.estimates.lock().unwrap();
    assert_eq!(estimates[0].to, Some(TxKind::Call(FALLBACK)));
    assert_eq!(estimates[0].value, Some(sent[0].value()));
}

#[tokio::test]
async fn override_underflow_aborts_the_replay() {
    let source_tx = sign_on_source(legacy_tx(0, TxKind::Call(RECIPIENT), U256::from(5u64)), 0);
    let source = MockChain::source(vec![block(0, vec![source_tx.clone()])]);
    let mut target = MockChain::target(21_000);
    target.balances.insert(wallet(0).address(), U256::from(10u64));
    let config = replay_config(OverrideConfig {
        known_hash: Some(KnownHashOverride {
            trigger_hash: *source_tx.tx_hash(),
            deduction: U256::from(11u64),
            fallback_recipient: FALLBACK,
        }),
        creation: None,
    });
    let keystore = keystore();

    let driver = ReplayDriver::new(&source, &target, &keystore, &config);
    let err = driver.run().await.unwrap_err();

    assert!(matches!(err, Error::OverrideUnderflow { .. }), "{err}");
    assert!(target.sent().is_empty());
    assert_eq!(driver.progress().read().await.state, DriverState::Aborted);
}

#[tokio::test]
async fn creation_by_known_sender_is_redirected() {
    let deployer = wallet(1).address();
    let creation = sign_on_source(legacy_tx(3, TxKind::Create, U256::ZERO), 1);
    let unrelated_creation = sign_on_source(legacy_tx(0, TxKind::Create, U256::ZERO), 2);

    let source = MockChain::source(vec![block(0, vec![creation, unrelated_creation])]);
    let target = MockChain::target(60_000);
    let config = replay_config(OverrideConfig {
        known_hash: None,
        creation: Some(CreationOverride {
            senders: vec![deployer],
            recipient: RECIPIENT,
            value: Some(U256::from(42u64)),
        }),
    });
    let keystore = keystore();

    ReplayDriver::new(&source, &target, &keystore, &config)
        .run()
        .await
        .unwrap();

    let sent = target.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].to(), Some(RECIPIENT));
    assert_eq!(sent[0].value(), U256::from(42u64));
    assert_eq!(sent[0].gas_limit(), 160_000);
    // Senders outside the configured set still deploy
    assert_eq!(sent[1].kind(), TxKind::Create);
}

#[tokio::test]
async fn resolver_returns_none_for_ordinary_transactions() {
    let source_tx = sign_on_source(legacy_tx(0, TxKind::Call(RECIPIENT), U256::from(5u64)), 0);
    let logical = decoder::decode(&source_tx);
    let target = MockChain::target(21_000);
    let config = OverrideConfig {
        known_hash: Some(KnownHashOverride {
            trigger_hash: B256::repeat_byte(0x42),
            deduction: U256::from(1u64),
            fallback_recipient: FALLBACK,
        }),
        creation: Some(CreationOverride {
            senders: vec![wallet(0).address()],
            recipient: FALLBACK,
            value: None,
        }),
    };

    let directive = OverrideResolver::new(&config)
        .resolve(wallet(0).address(), &logical, &target)
        .await
        .unwrap();
    assert_eq!(directive, None);
    assert!(target.balance_queries.lock().unwrap().is_empty());
}

#[tokio::test]
async fn known_hash_rule_takes_precedence_over_creation_rule() {
    let sender = wallet(0).address();
    let source_tx = sign_on_source(legacy_tx(0, TxKind::Create, U256::ZERO), 0);
    let logical = decoder::decode(&source_tx);
    let mut target = MockChain::target(21_000);
    target.balances.insert(sender, U256::from(100u64));
    let config = OverrideConfig {
        known_hash: Some(KnownHashOverride {
            trigger_hash: *source_tx.tx_hash(),
            deduction: U256::from(1u64),
            fallback_recipient: FALLBACK,
        }),
        creation: Some(CreationOverride {
            senders: vec![sender],
            recipient: RECIPIENT,
            value: None,
        }),
    };

    let directive = OverrideResolver::new(&config)
        .resolve(sender, &logical, &target)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        directive.trigger,
        OverrideTrigger::KnownHash(*source_tx.tx_hash())
    );
    assert_eq!(directive.value, Some(U256::from(99u64)));
}

#[tokio::test]
async fn every_supported_type_keeps_its_shape_and_order() {
    let access_list = AccessList::default();
    let txs = vec![
        sign_on_source(legacy_tx(0, TxKind::Call(RECIPIENT), U256::from(1u64)), 0),
        sign_on_source(
            TypedTransaction::Eip2930(TxEip2930 {
                chain_id: SOURCE_CHAIN_ID,
                nonce: 1,
                gas_price: 2_000_000_000,
                gas_limit: 30_000,
                to: TxKind::Call(RECIPIENT),
                value: U256::from(2u64),
                access_list: access_list.clone(),
                input: Bytes::new(),
            }),
            0,
        ),
        sign_on_source(
            TypedTransaction::Eip1559(TxEip1559 {
                chain_id: SOURCE_CHAIN_ID,
                nonce: 0,
                gas_limit: 30_000,
                max_fee_per_gas: 3_000_000_000,
                max_priority_fee_per_gas: 1_000_000_000,
                to: TxKind::Call(RECIPIENT),
                value: U256::from(3u64),
                access_list,
                input: Bytes::new(),
            }),
            1,
        ),
    ];
    let source = MockChain::source(vec![block(0, txs.clone())]);
    let target = MockChain::target(21_000);
    let config = replay_config(OverrideConfig::default());
    let keystore = keystore();

    ReplayDriver::new(&source, &target, &keystore, &config)
        .run()
        .await
        .unwrap();

    let sent = target.sent();
    let target_domain = config.target_chain.domain_for(500, 1_700_000_000);
    assert_eq!(sent.len(), 3);
    for (original, replayed) in txs.iter().zip(&sent) {
        assert_eq!(replayed.ty(), original.ty());
        assert_eq!(replayed.nonce(), original.nonce());
        assert_eq!(replayed.value(), original.value());
        assert_eq!(replayed.chain_id(), Some(TARGET_CHAIN_ID));
        assert_eq!(
            target_domain.recover_sender(replayed).unwrap(),
            config
                .source_chain
                .domain_for(0, 0)
                .recover_sender(original)
                .unwrap()
        );
    }
    assert_eq!(sent[1].gas_price(), Some(2_000_000_000));
    assert_eq!(sent[2].gas_price(), None);
    assert_eq!(sent[2].max_priority_fee_per_gas(), Some(1_000_000_000));
    assert_eq!(sent[2].max_fee_per_gas(), 3_000_000_000);
}

#[tokio::test]
async fn missing_private_key_aborts_before_submission() {
    let source_tx = sign_on_source(legacy_tx(0, TxKind::Call(RECIPIENT), U256::ZERO), 5);
    let source = MockChain::source(vec![block(0, vec![source_tx])]);
    let target = MockChain::target(21_000);
    let config = replay_config(OverrideConfig::default());
    let keystore = keystore();

    let err = ReplayDriver::new(&source, &target, &keystore, &config)
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, Error::MissingPrivateKey(addr) if addr == wallet(5).address()));
    assert!(target.sent().is_empty());
}

#[tokio::test]
async fn failed_receipt_is_reported_but_not_fatal() {
    let txs = vec![
        sign_on_source(legacy_tx(0, TxKind::Call(RECIPIENT), U256::ZERO), 0),
        sign_on_source(legacy_tx(1, TxKind::Call(RECIPIENT), U256::ZERO), 0),
    ];
    let source = MockChain::source(vec![block(0, txs.clone()), block(1, vec![])]);
    let mut target = MockChain::target(21_000);
    target.failing_nonces.insert(1);
    let config = replay_config(OverrideConfig::default());
    let keystore = keystore();

    let driver = ReplayDriver::new(&source, &target, &keystore, &config);
    let report = driver.run().await.unwrap();

    let sent = target.sent();
    assert_eq!(report.transactions_submitted, 2);
    assert_eq!(report.failed_receipts, vec![*sent[1].tx_hash()]);
    assert_eq!(report.blocks_skipped, 1);
    assert_eq!(
        driver.progress().read().await.failed_receipts,
        vec![*sent[1].tx_hash()]
    );
}

#[tokio::test]
async fn rejected_submission_aborts_without_retry_or_polling() {
    let txs = vec![
        sign_on_source(legacy_tx(0, TxKind::Call(RECIPIENT), U256::ZERO), 0),
        sign_on_source(legacy_tx(1, TxKind::Call(RECIPIENT), U256::ZERO), 0),
    ];
    let source = MockChain::source(vec![block(0, txs)]);
    let mut target = MockChain::target(21_000);
    target.rejecting = true;
    let config = replay_config(OverrideConfig::default());
    let keystore = keystore();

    let driver = ReplayDriver::new(&source, &target, &keystore, &config);
    let err = driver.run().await.unwrap_err();

    let sent = target.sent();
    assert_eq!(sent.len(), 1);
    assert!(matches!(err, Error::Submission { hash, .. } if hash == *sent[0].tx_hash()));
    assert_eq!(err.kind(), ErrorKind::Submission);
    assert!(!err.is_retryable());
    assert!(target.receipt_queries.lock().unwrap().is_empty());

    let progress = driver.progress();
    let progress = progress.read().await;
    assert_eq!(progress.state, DriverState::Aborted);
    assert_eq!(progress.transactions_submitted, 0);
}

#[tokio::test]
async fn unsupported_source_type_is_rejected_before_recovery() {
    let set_code = TxEip7702 {
        chain_id: SOURCE_CHAIN_ID,
        nonce: 0,
        gas_limit: 50_000,
        max_fee_per_gas: 3_000_000_000,
        max_priority_fee_per_gas: 1_000_000_000,
        to: RECIPIENT,
        ..Default::default()
    };
    let source_tx = TxEnvelope::Eip7702(
        set_code.into_signed(Signature::new(U256::from(1u64), U256::from(2u64), false)),
    );
    let source = MockChain::source(vec![block(0, vec![source_tx])]);
    let target = MockChain::target(21_000);
    let config = replay_config(OverrideConfig::default());
    let keystore = keystore();

    let err = ReplayDriver::new(&source, &target, &keystore, &config)
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, Error::UnsupportedTransactionType(4)), "{err}");
    assert!(target.sent().is_empty());
    assert!(target.estimates.lock().unwrap().is_empty());
}

#[tokio::test]
async fn missing_receipt_times_out() {
    let source_tx = sign_on_source(legacy_tx(0, TxKind::Call(RECIPIENT), U256::ZERO), 0);
    let source = MockChain::source(vec![block(0, vec![source_tx])]);
    let mut target = MockChain::target(21_000);
    target.withhold_receipts = true;
    let config = replay_config(OverrideConfig::default());
    let keystore = keystore();

    let err = ReplayDriver::new(&source, &target, &keystore, &config)
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, Error::ConfirmationTimeout { attempts: 2, .. }));
    assert_eq!(err.kind(), ErrorKind::Submission);
    assert_eq!(target.receipt_queries.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn pending_source_transaction_is_rejected() {
    let source_tx = sign_on_source(legacy_tx(0, TxKind::Call(RECIPIENT), U256::ZERO), 0);
    let mut source = MockChain::source(vec![block(0, vec![source_tx.clone()])]);
    source.pending.insert(*source_tx.tx_hash());
    let target = MockChain::target(21_000);
    let config = replay_config(OverrideConfig::default());
    let keystore = keystore();

    let err = ReplayDriver::new(&source, &target, &keystore, &config)
        .run()
        .await
        .unwrap_err();
    assert!(matches!(err, Error::PendingTransaction(hash) if hash == *source_tx.tx_hash()));
}

#[tokio::test]
async fn replay_walks_every_block_up_to_the_bound() {
    let source = MockChain::source((0..=6).map(|n| block(n, vec![])).collect());
    let target = MockChain::target(21_000);
    let mut config = replay_config(OverrideConfig::default());
    config.from_block = 2;
    config.to_block = Some(4);
    let keystore = keystore();

    let report = ReplayDriver::new(&source, &target, &keystore, &config)
        .run()
        .await
        .unwrap();

    assert_eq!(*source.fetched_blocks.lock().unwrap(), vec![2, 3, 4]);
    assert_eq!(report.blocks_skipped, 3);
    assert_eq!(report.blocks_replayed, 0);
}

#[tokio::test]
async fn missing_source_block_is_fatal() {
    let source = MockChain::source(vec![block(0, vec![]), block(2, vec![])]);
    let target = MockChain::target(21_000);
    let config = replay_config(OverrideConfig::default());
    let keystore = keystore();

    let err = ReplayDriver::new(&source, &target, &keystore, &config)
        .run()
        .await
        .unwrap_err();
    assert!(matches!(err, Error::BlockNotFound(1)));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn override_value_is_exact_balance_minus_deduction(
        balance in any::<u128>(),
        deduction in any::<u128>(),
    ) {
        prop_assume!(balance >= deduction);
        let sender = address!("0xd9dC96857daD6E570a771E8E8Ef6a94B08E55D9A");
        let source_hash = B256::repeat_byte(0x77);
        let mut target = MockChain::target(21_000);
        target.balances.insert(sender, U256::from(balance));
        let config = OverrideConfig {
            known_hash: Some(KnownHashOverride {
                trigger_hash: source_hash,
                deduction: U256::from(deduction),
                fallback_recipient: FALLBACK,
            }),
            creation: None,
        };
        let mut logical = decoder::decode(&sign_on_source(
            legacy_tx(0, TxKind::Call(RECIPIENT), U256::ZERO),
            0,
        ));
        logical.source_hash = source_hash;

        let directive = tokio_test::block_on(
            OverrideResolver::new(&config).resolve(sender, &logical, &target),
        )
        .unwrap()
        .unwrap();
        prop_assert_eq!(directive.value, Some(U256::from(balance - deduction)));
        prop_assert_eq!(directive.recipient, Some(FALLBACK));
    }
}
