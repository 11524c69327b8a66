use std::collections::BTreeMap;
use std::ops::ControlFlow;

use near_sdk::{near, BlockHeight};

use crate::bank::{Bank, EscrowLedger};
use crate::errors::HtlcError;
use crate::hashlock::{hash_lock_to_hex, parse_hash_lock, HashLock};
use crate::htlc::{Htlc, HtlcState};
use crate::keeper::Keeper;

/// Pending HTLCs carried across a chain restart, keyed by hex hash lock.
/// Expiration heights are relative to the height the state was exported at.
#[near(serializers = [json, borsh])]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GenesisState {
    pub pending_htlcs: BTreeMap<String, Htlc>,
}

impl GenesisState {
    pub fn new(pending_htlcs: BTreeMap<String, Htlc>) -> Self {
        Self { pending_htlcs }
    }
}

pub fn validate_genesis(data: &GenesisState) -> Result<(), HtlcError> {
    for (hash_lock, htlc) in &data.pending_htlcs {
        parse_hash_lock(hash_lock)?;
        htlc.validate()?;
        if htlc.state != HtlcState::Open {
            return Err(HtlcError::InvalidRecord(format!(
                "pending HTLC {hash_lock} is {:?}",
                htlc.state
            )));
        }
    }
    Ok(())
}

/// Restores every pending HTLC as open at `genesis_height + relative height`
/// and puts its amount back into escrow.
pub fn init_genesis(
    keeper: &mut Keeper,
    bank: &mut Bank,
    data: GenesisState,
    genesis_height: BlockHeight,
) -> Result<(), HtlcError> {
    validate_genesis(&data)?;

    for (hash_lock_hex, mut htlc) in data.pending_htlcs {
        let hash_lock = parse_hash_lock(&hash_lock_hex)?;
        if keeper.has_htlc(&hash_lock) {
            return Err(HtlcError::AlreadyExists(hash_lock_hex));
        }

        htlc.state = HtlcState::Open;
        htlc.expiration_height = genesis_height
            .checked_add(htlc.expiration_height)
            .ok_or_else(|| {
                HtlcError::InvalidRecord(format!("{hash_lock_hex}: height overflow"))
            })?;

        bank.credit_module(&htlc.amount)?;
        keeper.restore_htlc(hash_lock, htlc);
    }

    Ok(())
}

/// Exports open HTLCs with heights relative to `export_height`. Expired ones
/// cannot cross the boundary and are refunded to their senders on the spot.
pub fn export_genesis<L: EscrowLedger>(
    keeper: &mut Keeper,
    ledger: &mut L,
    export_height: BlockHeight,
) -> Result<GenesisState, HtlcError> {
    let mut open = Vec::new();
    let mut expired: Vec<HashLock> = Vec::new();
    keeper.iterate_htlcs(|hash_lock, htlc| {
        match htlc.state {
            HtlcState::Open => open.push((*hash_lock, htlc.clone())),
            HtlcState::Expired => expired.push(*hash_lock),
            HtlcState::Completed | HtlcState::Refunded => {}
        }
        ControlFlow::Continue(())
    });

    for hash_lock in &expired {
        keeper.refund_htlc(ledger, hash_lock, export_height)?;
    }

    let pending_htlcs = open
        .into_iter()
        .map(|(hash_lock, mut htlc)| {
            // an overdue record whose tick has not run expires right after import
            htlc.expiration_height = htlc.expiration_height.saturating_sub(export_height).max(1);
            (hash_lock_to_hex(&hash_lock), htlc)
        })
        .collect();

    Ok(GenesisState::new(pending_htlcs))
}
