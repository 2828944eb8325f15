use crate::error::Error;
use alloy::{
    consensus::{transaction::SignerRecoverable, Transaction, TxEnvelope, TxType},
    eips::Typed2718,
    primitives::{Address, ChainId, U256},
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ethereum hard forks in activation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Hardfork {
    Frontier,
    Homestead,
    Tangerine,
    SpuriousDragon,
    Byzantium,
    Constantinople,
    Petersburg,
    Istanbul,
    Berlin,
    London,
    Paris,
    Shanghai,
    Cancun,
    Prague,
}

impl fmt::Display for Hardfork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ForkCondition {
    Block(u64),
    Timestamp(u64),
}

impl ForkCondition {
    fn is_active(&self, block_height: u64, timestamp: u64) -> bool {
        match *self {
            ForkCondition::Block(at) => block_height >= at,
            ForkCondition::Timestamp(at) => timestamp >= at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForkActivation {
    pub fork: Hardfork,
    pub at: ForkCondition,
}

/// Static fork-activation table of one chain.
///
/// Paris is never listed in `forks`: it is driven by the terminal total
/// difficulty marker, as on the historical chains this tool replays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainSpec {
    pub name: String,
    pub chain_id: ChainId,
    pub forks: Vec<ForkActivation>,
    #[serde(default)]
    pub terminal_total_difficulty: Option<U256>,
    #[serde(default)]
    pub terminal_total_difficulty_passed: bool,
}

const PRE_MERGE_FORKS: [Hardfork; 10] = [
    Hardfork::Frontier,
    Hardfork::Homestead,
    Hardfork::Tangerine,
    Hardfork::SpuriousDragon,
    Hardfork::Byzantium,
    Hardfork::Constantinople,
    Hardfork::Petersburg,
    Hardfork::Istanbul,
    Hardfork::Berlin,
    Hardfork::London,
];

fn genesis_forks() -> Vec<ForkActivation> {
    PRE_MERGE_FORKS
        .iter()
        .map(|&fork| ForkActivation {
            fork,
            at: ForkCondition::Block(0),
        })
        .collect()
}

impl ChainSpec {
    /// The proof-of-work source chain: every fork through London from genesis,
    /// terminal difficulty configured but never reached.
    pub fn source_preset(chain_id: ChainId) -> Self {
        Self {
            name: "source".to_string(),
            chain_id,
            forks: genesis_forks(),
            terminal_total_difficulty: Some(U256::from(60_000_000u64)),
            terminal_total_difficulty_passed: false,
        }
    }

    /// The post-merge target chain: merged from genesis, Shanghai by timestamp.
    pub fn target_preset(chain_id: ChainId) -> Self {
        let mut forks = genesis_forks();
        forks.push(ForkActivation {
            fork: Hardfork::Shanghai,
            at: ForkCondition::Timestamp(1_687_439_607),
        });
        Self {
            name: "target".to_string(),
            chain_id,
            forks,
            terminal_total_difficulty: Some(U256::ZERO),
            terminal_total_difficulty_passed: true,
        }
    }

    pub fn domain_for(&self, block_height: u64, timestamp: u64) -> SigningDomain {
        let mut active_forks: Vec<Hardfork> = self
            .forks
            .iter()
            .filter(|activation| activation.at.is_active(block_height, timestamp))
            .map(|activation| activation.fork)
            .collect();
        if self.terminal_total_difficulty_passed {
            active_forks.push(Hardfork::Paris);
        }
        active_forks.sort();
        active_forks.dedup();

        SigningDomain {
            chain_id: self.chain_id,
            active_forks,
            terminal_total_difficulty: self.terminal_total_difficulty,
            merged: self.terminal_total_difficulty_passed,
        }
    }
}

/// Chain ID plus the forks active at one height. Decides which fields enter
/// the signing hash and which transaction types may be signed at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningDomain {
    pub chain_id: ChainId,
    pub active_forks: Vec<Hardfork>,
    pub terminal_total_difficulty: Option<U256>,
    pub merged: bool,
}

impl SigningDomain {
    pub fn is_active(&self, fork: Hardfork) -> bool {
        self.active_forks.contains(&fork)
    }

    /// EIP-155 replay protection.
    pub fn is_replay_protected(&self) -> bool {
        self.is_active(Hardfork::SpuriousDragon)
    }

    pub fn supports_type(&self, ty: u8) -> bool {
        match TxType::try_from(ty) {
            Ok(TxType::Legacy) => true,
            Ok(TxType::Eip2930) => self.is_active(Hardfork::Berlin),
            Ok(TxType::Eip1559) => self.is_active(Hardfork::London),
            Ok(TxType::Eip4844) => self.is_active(Hardfork::Cancun),
            Ok(TxType::Eip7702) => self.is_active(Hardfork::Prague),
            Err(_) => false,
        }
    }

    /// Verifies a signed transaction under this domain and returns its signer.
    pub fn recover_sender(&self, tx: &TxEnvelope) -> Result<Address, Error> {
        if !self.supports_type(tx.ty()) {
            return Err(Error::TypeNotEnabled {
                ty: tx.ty(),
                chain_id: self.chain_id,
            });
        }
        if let Some(actual) = tx.chain_id() {
            if actual != self.chain_id {
                return Err(Error::ChainIdMismatch {
                    expected: self.chain_id,
                    actual,
                });
            }
        }
        tx.recover_signer()
            .map_err(|e| Error::Recovery(e.to_string()))
    }
}
