use crate::{chain_config::SigningDomain, error::Error};
use alloy::{
    consensus::{SignableTransaction, TxEnvelope, TypedTransaction},
    eips::Typed2718,
    primitives::Address,
    signers::{
        local::{coins_bip39::English, MnemonicBuilder, PrivateKeySigner},
        SignerSync,
    },
};
use std::{collections::HashMap, fs, path::Path};
use tracing::debug;

/// Sender address to private key lookup, owned outside the replay core.
pub trait Keystore: Send + Sync {
    /// Hex-encoded private key for `address`, if known.
    fn private_key_for(&self, address: Address) -> Option<String>;
}

/// Lowercase `0x`-prefixed hex, the key format of every keystore here.
pub fn keystore_key(address: Address) -> String {
    address.to_string().to_lowercase()
}

/// Keystore backed by a JSON object of `{ "<address>": "<hex private key>" }`.
#[derive(Debug, Clone, Default)]
pub struct JsonKeystore {
    keys: HashMap<String, String>,
}

impl JsonKeystore {
    pub fn from_file(path: &Path) -> Result<Self, Error> {
        let raw = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read keystore {}: {e}", path.display())))?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, Error> {
        let entries: HashMap<String, String> = serde_json::from_str(raw)
            .map_err(|e| Error::Config(format!("Invalid keystore JSON: {e}")))?;
        let keys = entries
            .into_iter()
            .map(|(address, key)| (address.to_lowercase(), key))
            .collect();
        Ok(Self { keys })
    }
}

impl Keystore for JsonKeystore {
    fn private_key_for(&self, address: Address) -> Option<String> {
        self.keys.get(&keystore_key(address)).cloned()
    }
}

/// First `count` accounts derived from a BIP-39 phrase, for dev chains.
#[derive(Debug, Clone)]
pub struct MnemonicKeystore {
    keys: HashMap<String, String>,
}

impl MnemonicKeystore {
    pub fn derive(phrase: &str, count: u32) -> Result<Self, Error> {
        let mut keys = HashMap::new();
        for index in 0..count {
            let wallet = MnemonicBuilder::<English>::default()
                .phrase(phrase)
                .index(index)
                .and_then(|builder| builder.build())
                .map_err(|e| Error::InvalidKey(format!("mnemonic index {index}: {e}")))?;
            let key = hex::encode(wallet.credential().to_bytes());
            keys.insert(keystore_key(wallet.address()), key);
        }
        Ok(Self { keys })
    }
}

impl Keystore for MnemonicKeystore {
    fn private_key_for(&self, address: Address) -> Option<String> {
        self.keys.get(&keystore_key(address)).cloned()
    }
}

pub fn parse_private_key(private_key: &str) -> Result<PrivateKeySigner, Error> {
    let bytes = hex::decode(private_key.trim().trim_start_matches("0x"))
        .map_err(|e| Error::InvalidKey(e.to_string()))?;
    PrivateKeySigner::from_slice(&bytes).map_err(|e| Error::InvalidKey(e.to_string()))
}

/// Sets the domain's chain ID on the transaction and rejects types whose fork
/// is not active in the domain.
pub fn bind_to_domain(
    unsigned: TypedTransaction,
    domain: &SigningDomain,
) -> Result<TypedTransaction, Error> {
    if !domain.supports_type(unsigned.ty()) {
        return Err(Error::TypeNotEnabled {
            ty: unsigned.ty(),
            chain_id: domain.chain_id,
        });
    }

    Ok(match unsigned {
        TypedTransaction::Legacy(mut tx) => {
            tx.chain_id = domain.is_replay_protected().then_some(domain.chain_id);
            TypedTransaction::Legacy(tx)
        }
        TypedTransaction::Eip2930(mut tx) => {
            tx.chain_id = domain.chain_id;
            TypedTransaction::Eip2930(tx)
        }
        TypedTransaction::Eip1559(mut tx) => {
            tx.chain_id = domain.chain_id;
            TypedTransaction::Eip1559(tx)
        }
        other => return Err(Error::UnsupportedTransactionType(other.ty())),
    })
}

pub fn sign(
    unsigned: TypedTransaction,
    domain: &SigningDomain,
    private_key: &str,
) -> Result<TxEnvelope, Error> {
    let signer = parse_private_key(private_key)?;
    let unsigned = bind_to_domain(unsigned, domain)?;
    let signature = signer.sign_hash_sync(&unsigned.signature_hash())?;

    let signed = match unsigned {
        TypedTransaction::Legacy(tx) => TxEnvelope::Legacy(tx.into_signed(signature)),
        TypedTransaction::Eip2930(tx) => TxEnvelope::Eip2930(tx.into_signed(signature)),
        TypedTransaction::Eip1559(tx) => TxEnvelope::Eip1559(tx.into_signed(signature)),
        other => return Err(Error::UnsupportedTransactionType(other.ty())),
    };

    debug!(
        signer = %signer.address(),
        chain_id = domain.chain_id,
        tx_hash = %signed.tx_hash(),
        "Signed transaction"
    );
    Ok(signed)
}
