use crate::{chain::ChainReader, decoder::LogicalTransaction, error::Error};
use alloy::primitives::{address, b256, Address, B256, U256};
use tracing::{debug, info};

/// Replaces a known transaction's value with `balance - deduction` and sends
/// it to `fallback_recipient`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnownHashOverride {
    pub trigger_hash: B256,
    pub deduction: U256,
    pub fallback_recipient: Address,
}

/// Redirects contract creations by known deployers to an existing contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreationOverride {
    pub senders: Vec<Address>,
    pub recipient: Address,
    /// Keeps the original value when `None`.
    pub value: Option<U256>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverrideConfig {
    pub known_hash: Option<KnownHashOverride>,
    pub creation: Option<CreationOverride>,
}

impl OverrideConfig {
    pub const DEFAULT_TRIGGER_HASH: B256 =
        b256!("0xbdfe0af8e439c05f2925b8cd30258b031520a4bf0c99d972aec8f359641be07e");
    pub const DEFAULT_FALLBACK_RECIPIENT: Address =
        address!("0x702332E028e45103a036Cf37E4cc6a9B55978A93");
    pub const DEFAULT_CREATION_SENDERS: [Address; 3] = [
        address!("0xd9dC96857daD6E570a771E8E8Ef6a94B08E55D9A"),
        address!("0x75452375fe402c548671B66Af159452e4018D53D"),
        address!("0x702332E028e45103a036Cf37E4cc6a9B55978A93"),
    ];

    pub fn default_deduction() -> U256 {
        U256::from(999_987_922_985_332_012_900_325_659u128)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideTrigger {
    KnownHash(B256),
    CreationBySender(Address),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideDirective {
    pub trigger: OverrideTrigger,
    pub recipient: Option<Address>,
    pub value: Option<U256>,
}

impl OverrideDirective {
    /// Recipient and value the rebuilt transaction should carry.
    pub fn apply(directive: Option<&Self>, tx: &LogicalTransaction) -> (Option<Address>, U256) {
        match directive {
            Some(directive) => (
                directive.recipient.or(tx.to),
                directive.value.unwrap_or(tx.value),
            ),
            None => (tx.to, tx.value),
        }
    }
}

pub struct OverrideResolver<'a> {
    config: &'a OverrideConfig,
}

impl<'a> OverrideResolver<'a> {
    pub fn new(config: &'a OverrideConfig) -> Self {
        Self { config }
    }

    /// The known-hash rule wins when both rules match.
    pub async fn resolve<C: ChainReader + ?Sized>(
        &self,
        sender: Address,
        tx: &LogicalTransaction,
        target: &C,
    ) -> Result<Option<OverrideDirective>, Error> {
        if let Some(rule) = &self.config.known_hash {
            if tx.source_hash == rule.trigger_hash {
                return self.resolve_known_hash(rule, sender, tx, target).await.map(Some);
            }
        }

        if let Some(rule) = &self.config.creation {
            if tx.is_creation() && rule.senders.contains(&sender) {
                info!(
                    tx_hash = %tx.source_hash,
                    %sender,
                    recipient = %rule.recipient,
                    "Redirecting contract creation"
                );
                return Ok(Some(OverrideDirective {
                    trigger: OverrideTrigger::CreationBySender(sender),
                    recipient: Some(rule.recipient),
                    value: rule.value,
                }));
            }
        }

        Ok(None)
    }

    async fn resolve_known_hash<C: ChainReader + ?Sized>(
        &self,
        rule: &KnownHashOverride,
        sender: Address,
        tx: &LogicalTransaction,
        target: &C,
    ) -> Result<OverrideDirective, Error> {
        let block = target.latest_block_number().await?;
        let balance = target.balance_at(sender, block).await?;
        debug!(%sender, block, %balance, "Fetched target balance for override");

        let value = balance
            .checked_sub(rule.deduction)
            .ok_or(Error::OverrideUnderflow {
                sender,
                balance,
                deduction: rule.deduction,
            })?;

        info!(
            tx_hash = %tx.source_hash,
            %value,
            recipient = %rule.fallback_recipient,
            "Overriding known transaction"
        );
        Ok(OverrideDirective {
            trigger: OverrideTrigger::KnownHash(rule.trigger_hash),
            recipient: Some(rule.fallback_recipient),
            value: Some(value),
        })
    }
}
