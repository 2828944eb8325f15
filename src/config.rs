use crate::{
    chain::RetryPolicy,
    chain_config::ChainSpec,
    error::Error,
    gas_estimator::DEFAULT_GAS_MARGIN,
    override_resolver::{CreationOverride, KnownHashOverride, OverrideConfig},
    signer::{JsonKeystore, Keystore, MnemonicKeystore},
};
use alloy::primitives::{Address, ChainId, B256, U256};
use clap::Parser;
use serde::Deserialize;
use std::{fs, net::SocketAddr, path::PathBuf, time::Duration};

/// Replays the transactions of one chain onto another, re-signing each for the target.
#[derive(Debug, Clone, Parser)]
#[command(name = "chain-replayer", version, about)]
pub struct Cli {
    /// RPC endpoint of the chain transactions are read from
    #[arg(long, env = "SOURCE_RPC_URL", default_value = "https://rpc.uzheths.ifi.uzh.ch/")]
    pub source_rpc_url: String,

    /// RPC endpoint of the chain transactions are replayed onto
    #[arg(long, env = "TARGET_RPC_URL", default_value = "http://localhost:8545")]
    pub target_rpc_url: String,

    #[arg(long, env = "SOURCE_CHAIN_ID", default_value_t = 8888)]
    pub source_chain_id: ChainId,

    #[arg(long, env = "TARGET_CHAIN_ID", default_value_t = 8888)]
    pub target_chain_id: ChainId,

    /// JSON file with `{ "source": ChainSpec, "target": ChainSpec }`, replacing the built-in fork tables
    #[arg(long, env = "CHAIN_SPEC_FILE")]
    pub chain_spec_file: Option<PathBuf>,

    #[arg(long, env = "FROM_BLOCK", default_value_t = 0)]
    pub from_block: u64,

    /// Last block to replay; defaults to the source head observed at start
    #[arg(long, env = "TO_BLOCK")]
    pub to_block: Option<u64>,

    /// JSON keystore mapping sender addresses to hex private keys
    #[arg(long, env = "KEYSTORE_FILE", conflicts_with = "mnemonic")]
    pub keystore_file: Option<PathBuf>,

    /// BIP-39 phrase whose first accounts sign the replayed transactions
    #[arg(long, env = "MNEMONIC")]
    pub mnemonic: Option<String>,

    #[arg(long, env = "MNEMONIC_ACCOUNTS", default_value_t = 10)]
    pub mnemonic_accounts: u32,

    /// Gas added on top of the target chain's estimate
    #[arg(long, env = "GAS_MARGIN", default_value_t = DEFAULT_GAS_MARGIN)]
    pub gas_margin: u64,

    /// Pause after submitting a block, before polling receipts
    #[arg(long, env = "BLOCK_DELAY_SECS", default_value_t = 45)]
    pub block_delay_secs: u64,

    /// Pause before submitting each transaction
    #[arg(long, env = "TX_DELAY_MS", default_value_t = 1000)]
    pub tx_delay_ms: u64,

    #[arg(long, env = "CONFIRMATION_ATTEMPTS", default_value_t = 5)]
    pub confirmation_attempts: u32,

    #[arg(long, env = "CONFIRMATION_INTERVAL_SECS", default_value_t = 5)]
    pub confirmation_interval_secs: u64,

    /// Attempts per RPC read on transport errors; 1 disables retries
    #[arg(long, env = "RPC_MAX_ATTEMPTS", default_value_t = 3)]
    pub rpc_max_attempts: u32,

    #[arg(long, env = "RPC_RETRY_BACKOFF_MS", default_value_t = 2000)]
    pub rpc_retry_backoff_ms: u64,

    /// Source transaction whose value is recomputed from the target balance
    #[arg(long, env = "OVERRIDE_TRIGGER_HASH", default_value_t = OverrideConfig::DEFAULT_TRIGGER_HASH)]
    pub override_trigger_hash: B256,

    /// Amount subtracted from the sender's target balance for the trigger transaction
    #[arg(long, env = "OVERRIDE_DEDUCTION", default_value_t = OverrideConfig::default_deduction())]
    pub override_deduction: U256,

    #[arg(long, env = "OVERRIDE_FALLBACK_RECIPIENT", default_value_t = OverrideConfig::DEFAULT_FALLBACK_RECIPIENT)]
    pub override_fallback_recipient: Address,

    #[arg(long, env = "DISABLE_HASH_OVERRIDE")]
    pub disable_hash_override: bool,

    /// Deployers whose contract creations get redirected
    #[arg(
        long,
        env = "CREATION_SENDERS",
        value_delimiter = ',',
        default_values_t = OverrideConfig::DEFAULT_CREATION_SENDERS
    )]
    pub creation_senders: Vec<Address>,

    /// Existing contract that redirected creations are sent to; unset disables the rule
    #[arg(long, env = "CREATION_RECIPIENT")]
    pub creation_recipient: Option<Address>,

    #[arg(long, env = "CREATION_VALUE")]
    pub creation_value: Option<U256>,

    /// Serve `replay_status` over JSON-RPC on this address
    #[arg(long, env = "STATUS_ADDR")]
    pub status_addr: Option<SocketAddr>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationConfig {
    pub attempts: u32,
    pub interval: Duration,
}

/// Immutable settings shared by every component of one replay run.
#[derive(Debug, Clone)]
pub struct ReplayConfig {
    pub source_chain: ChainSpec,
    pub target_chain: ChainSpec,
    pub from_block: u64,
    pub to_block: Option<u64>,
    pub gas_margin: u64,
    pub block_delay: Duration,
    pub tx_delay: Duration,
    pub confirmation: ConfirmationConfig,
    pub overrides: OverrideConfig,
}

#[derive(Deserialize)]
struct ChainSpecFile {
    source: ChainSpec,
    target: ChainSpec,
}

impl Cli {
    pub fn replay_config(&self) -> Result<ReplayConfig, Error> {
        let (source_chain, target_chain) = match &self.chain_spec_file {
            Some(path) => {
                let raw = fs::read_to_string(path).map_err(|e| {
                    Error::Config(format!("Failed to read {}: {e}", path.display()))
                })?;
                let file: ChainSpecFile = serde_json::from_str(&raw)
                    .map_err(|e| Error::Config(format!("Invalid chain spec file: {e}")))?;
                (file.source, file.target)
            }
            None => (
                ChainSpec::source_preset(self.source_chain_id),
                ChainSpec::target_preset(self.target_chain_id),
            ),
        };

        if let Some(to_block) = self.to_block {
            if to_block < self.from_block {
                return Err(Error::Config(format!(
                    "TO_BLOCK {to_block} is below FROM_BLOCK {}",
                    self.from_block
                )));
            }
        }
        if self.confirmation_attempts == 0 {
            return Err(Error::Config(
                "CONFIRMATION_ATTEMPTS must be at least 1".to_string(),
            ));
        }

        let known_hash = (!self.disable_hash_override).then(|| KnownHashOverride {
            trigger_hash: self.override_trigger_hash,
            deduction: self.override_deduction,
            fallback_recipient: self.override_fallback_recipient,
        });
        let creation = self.creation_recipient.map(|recipient| CreationOverride {
            senders: self.creation_senders.clone(),
            recipient,
            value: self.creation_value,
        });

        Ok(ReplayConfig {
            source_chain,
            target_chain,
            from_block: self.from_block,
            to_block: self.to_block,
            gas_margin: self.gas_margin,
            block_delay: Duration::from_secs(self.block_delay_secs),
            tx_delay: Duration::from_millis(self.tx_delay_ms),
            confirmation: ConfirmationConfig {
                attempts: self.confirmation_attempts,
                interval: Duration::from_secs(self.confirmation_interval_secs),
            },
            overrides: OverrideConfig {
                known_hash,
                creation,
            },
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.rpc_max_attempts.max(1),
            backoff: Duration::from_millis(self.rpc_retry_backoff_ms),
        }
    }

    pub fn keystore(&self) -> Result<Box<dyn Keystore>, Error> {
        match (&self.keystore_file, &self.mnemonic) {
            (Some(path), _) => Ok(Box::new(JsonKeystore::from_file(path)?)),
            (None, Some(phrase)) => Ok(Box::new(MnemonicKeystore::derive(
                phrase,
                self.mnemonic_accounts,
            )?)),
            (None, None) => Err(Error::Config(
                "Either KEYSTORE_FILE or MNEMONIC must be set".to_string(),
            )),
        }
    }
}
