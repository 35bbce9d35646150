//! Durable snapshots of an escrow's field set.

use serde::{Deserialize, Serialize};
use timelock_types::{Address, Amount, AssetKind, DisposalPolicy, EscrowId, Timestamp};

use crate::error::EscrowError;
use crate::instance::{EscrowContext, EscrowInstance, EscrowState, EscrowStatus};

/// Every stored field of a live escrow.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowSnapshot {
    pub id: EscrowId,
    pub trustor: Address,
    pub beneficiary: Address,
    pub revocable: bool,
    pub expiration: Timestamp,
    pub deposited_amount: Amount,
    pub already_deposited: bool,
    pub asset: AssetKind,
    pub disposal: DisposalPolicy,
    pub status: EscrowStatus,
}

impl EscrowSnapshot {
    pub fn encode(&self) -> Result<Vec<u8>, EscrowError> {
        bincode::serialize(self).map_err(|e| EscrowError::Snapshot(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, EscrowError> {
        bincode::deserialize(bytes).map_err(|e| EscrowError::Snapshot(e.to_string()))
    }

    /// Check that the fields describe a reachable state.
    fn validate(&self) -> Result<(), EscrowError> {
        let consistent = match self.status {
            EscrowStatus::Created => !self.already_deposited && self.deposited_amount.is_zero(),
            EscrowStatus::Funded => self.already_deposited && !self.deposited_amount.is_zero(),
            EscrowStatus::Revoked | EscrowStatus::Withdrawn => {
                self.already_deposited && self.deposited_amount.is_zero()
            }
        };
        if !consistent {
            return Err(EscrowError::Snapshot(format!(
                "inconsistent fields for status {:?}: deposited={}, already_deposited={}",
                self.status, self.deposited_amount, self.already_deposited
            )));
        }
        if !self.beneficiary.is_valid() {
            return Err(EscrowError::InvalidBeneficiary(self.beneficiary.to_string()));
        }
        Ok(())
    }
}

impl EscrowInstance {
    /// Capture the current field set. Disposed escrows have nothing to capture.
    pub fn snapshot(&self) -> Result<EscrowSnapshot, EscrowError> {
        let view = self.view()?;
        Ok(EscrowSnapshot {
            id: view.id,
            trustor: view.trustor,
            beneficiary: view.beneficiary,
            revocable: view.revocable,
            expiration: view.expiration,
            deposited_amount: view.deposited_amount,
            already_deposited: view.already_deposited,
            asset: view.asset,
            disposal: self.disposal(),
            status: view.status,
        })
    }

    /// Rebuild an escrow from a snapshot. No event is emitted.
    pub fn restore(snapshot: EscrowSnapshot, ctx: EscrowContext) -> Result<Self, EscrowError> {
        snapshot.validate()?;
        Ok(Self::assemble(
            snapshot.id,
            snapshot.trustor,
            snapshot.revocable,
            snapshot.asset,
            snapshot.disposal,
            EscrowState {
                beneficiary: snapshot.beneficiary,
                expiration: snapshot.expiration,
                deposited_amount: snapshot.deposited_amount,
                already_deposited: snapshot.already_deposited,
                status: snapshot.status,
                disposed: false,
            },
            ctx,
        ))
    }

    /// Restore a snapshot into the same collaborators as `self`.
    pub fn restore_alongside(&self, snapshot: EscrowSnapshot) -> Result<Self, EscrowError> {
        Self::restore(snapshot, self.context().clone())
    }
}
