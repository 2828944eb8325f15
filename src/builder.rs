use crate::{
    decoder::{GasPricing, LogicalTransaction},
    error::Error,
    override_resolver::OverrideDirective,
};
use alloy::{
    consensus::{TxEip1559, TxEip2930, TxLegacy, TypedTransaction},
    primitives::{ChainId, TxKind},
};

/// Transaction types the replay can rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayTxType {
    Legacy,
    AccessList,
    DynamicFee,
}

impl TryFrom<u8> for ReplayTxType {
    type Error = Error;

    fn try_from(ty: u8) -> Result<Self, Self::Error> {
        match ty {
            0 => Ok(ReplayTxType::Legacy),
            1 => Ok(ReplayTxType::AccessList),
            2 => Ok(ReplayTxType::DynamicFee),
            other => Err(Error::UnsupportedTransactionType(other)),
        }
    }
}

/// Assembles an unsigned transaction of the source's type.
///
/// Recipient and value come from `directive` when present. The gas limit is
/// always `gas_limit`, never the source transaction's.
pub fn build(
    tx: &LogicalTransaction,
    directive: Option<&OverrideDirective>,
    gas_limit: u64,
) -> Result<TypedTransaction, Error> {
    let tx_type = ReplayTxType::try_from(tx.tx_type)?;
    let (recipient, value) = OverrideDirective::apply(directive, tx);
    let to = recipient.map_or(TxKind::Create, TxKind::Call);

    let unsigned = match tx_type {
        ReplayTxType::Legacy => TypedTransaction::Legacy(TxLegacy {
            // Replay protection is decided by the signing domain.
            chain_id: None,
            nonce: tx.nonce,
            gas_price: single_gas_price(tx)?,
            gas_limit,
            to,
            value,
            input: tx.input.clone(),
        }),
        ReplayTxType::AccessList => TypedTransaction::Eip2930(TxEip2930 {
            chain_id: required_chain_id(tx)?,
            nonce: tx.nonce,
            gas_price: single_gas_price(tx)?,
            gas_limit,
            to,
            value,
            access_list: tx.access_list.clone().unwrap_or_default(),
            input: tx.input.clone(),
        }),
        ReplayTxType::DynamicFee => {
            let GasPricing::Dynamic {
                max_priority_fee_per_gas,
                max_fee_per_gas,
            } = tx.pricing
            else {
                return Err(Error::MissingField {
                    hash: tx.source_hash,
                    field: "max_fee_per_gas",
                });
            };
            TypedTransaction::Eip1559(TxEip1559 {
                chain_id: required_chain_id(tx)?,
                nonce: tx.nonce,
                gas_limit,
                max_fee_per_gas,
                max_priority_fee_per_gas,
                to,
                value,
                access_list: tx.access_list.clone().unwrap_or_default(),
                input: tx.input.clone(),
            })
        }
    };

    Ok(unsigned)
}

fn single_gas_price(tx: &LogicalTransaction) -> Result<u128, Error> {
    match tx.pricing {
        GasPricing::Legacy { gas_price } => Ok(gas_price),
        GasPricing::Dynamic { .. } => Err(Error::MissingField {
            hash: tx.source_hash,
            field: "gas_price",
        }),
    }
}

fn required_chain_id(tx: &LogicalTransaction) -> Result<ChainId, Error> {
    tx.chain_id.ok_or(Error::MissingField {
        hash: tx.source_hash,
        field: "chain_id",
    })
}
