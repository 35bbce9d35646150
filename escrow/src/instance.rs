//! The escrow state machine.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

use timelock_ports::{AssetTransfer, Clock};
use timelock_types::{Address, Amount, AssetKind, DisposalPolicy, EscrowId, Timestamp};
use timelock_utils::format_duration;

use crate::error::EscrowError;
use crate::event::{EscrowEvent, EventLog};
use crate::guard;

/// Lifecycle position of an escrow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscrowStatus {
    /// Constructed, waiting for its one deposit.
    Created,
    /// Holding the deposit.
    Funded,
    /// Terminal: the trustor took the deposit back before expiration.
    Revoked,
    /// Terminal: the beneficiary claimed the deposit after expiration.
    Withdrawn,
}

impl EscrowStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, EscrowStatus::Revoked | EscrowStatus::Withdrawn)
    }
}

/// Collaborators shared by every escrow a factory creates.
#[derive(Clone)]
pub struct EscrowContext {
    pub assets: Arc<dyn AssetTransfer>,
    pub clock: Arc<dyn Clock>,
    pub events: Arc<EventLog>,
}

/// Construction arguments for [`EscrowInstance::new`].
#[derive(Clone, Debug)]
pub struct EscrowParams {
    pub id: EscrowId,
    pub trustor: Address,
    pub beneficiary: Address,
    pub revocable: bool,
    pub duration_secs: u64,
    pub asset: AssetKind,
    /// `None` picks the asset kind's default.
    pub disposal: Option<DisposalPolicy>,
}

/// Point-in-time copy of every stored field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EscrowView {
    pub id: EscrowId,
    pub trustor: Address,
    pub beneficiary: Address,
    pub revocable: bool,
    pub expiration: Timestamp,
    pub deposited_amount: Amount,
    pub already_deposited: bool,
    pub asset: AssetKind,
    pub status: EscrowStatus,
}

/// Mutable part of an escrow, guarded by the instance lock.
#[derive(Clone, Debug)]
pub(crate) struct EscrowState {
    pub(crate) beneficiary: Address,
    pub(crate) expiration: Timestamp,
    pub(crate) deposited_amount: Amount,
    pub(crate) already_deposited: bool,
    pub(crate) status: EscrowStatus,
    pub(crate) disposed: bool,
}

/// A single trust relationship: one trustor, one beneficiary, one deposit.
pub struct EscrowInstance {
    id: EscrowId,
    trustor: Address,
    revocable: bool,
    asset: AssetKind,
    disposal: DisposalPolicy,
    custody: Address,
    state: Mutex<EscrowState>,
    ctx: EscrowContext,
}

impl EscrowInstance {
    /// Construct an unfunded escrow expiring `duration_secs` from now.
    pub fn new(params: EscrowParams, ctx: EscrowContext) -> Result<Self, EscrowError> {
        guard::valid_beneficiary(&params.beneficiary)?;
        let expiration = ctx
            .clock
            .now()
            .checked_add_secs(params.duration_secs)
            .ok_or(EscrowError::Overflow)?;
        let disposal = params
            .disposal
            .unwrap_or_else(|| params.asset.default_disposal());

        debug!(
            escrow = %params.id,
            trustor = %params.trustor,
            beneficiary = %params.beneficiary,
            revocable = params.revocable,
            expires_in = %format_duration(params.duration_secs),
            "escrow constructed"
        );

        Ok(Self::assemble(
            params.id,
            params.trustor,
            params.revocable,
            params.asset,
            disposal,
            EscrowState {
                beneficiary: params.beneficiary,
                expiration,
                deposited_amount: Amount::ZERO,
                already_deposited: false,
                status: EscrowStatus::Created,
                disposed: false,
            },
            ctx,
        ))
    }

    pub(crate) fn assemble(
        id: EscrowId,
        trustor: Address,
        revocable: bool,
        asset: AssetKind,
        disposal: DisposalPolicy,
        state: EscrowState,
        ctx: EscrowContext,
    ) -> Self {
        Self {
            id,
            trustor,
            revocable,
            asset,
            disposal,
            custody: id.custody_address(),
            state: Mutex::new(state),
            ctx,
        }
    }

    // ── Operations ─────────────────────────────────────────────────────

    /// Receive the one-time deposit of `amount` from `caller`.
    pub fn deposit(&self, caller: &Address, amount: Amount) -> Result<(), EscrowError> {
        let mut state = self.lock();
        guard::not_disposed(&state)?;
        guard::not_deposited(&state)?;
        guard::non_zero(amount)?;
        guard::before_expiration(&state, self.clock())?;

        let available = self.ctx.assets.balance_of(caller);
        if available < amount {
            debug!(
                escrow = %self.id,
                caller = %caller,
                %amount,
                %available,
                "deposit rejected: insufficient balance"
            );
            return Err(EscrowError::InsufficientBalance {
                needed: amount.raw(),
                available: available.raw(),
            });
        }

        let previous = state.clone();
        state.already_deposited = true;
        state.deposited_amount = amount;
        state.status = EscrowStatus::Funded;

        if let Err(e) = self.ctx.assets.transfer_from(caller, &self.custody, amount) {
            *state = previous;
            warn!(
                escrow = %self.id,
                caller = %caller,
                %amount,
                error = %e,
                "deposit transfer failed, rolled back"
            );
            return Err(e.into());
        }

        self.emit(EscrowEvent::Deposit {
            escrow: self.id,
            sender: caller.clone(),
            amount,
        });
        info!(
            escrow = %self.id,
            caller = %caller,
            %amount,
            expiration = %state.expiration,
            "deposit received"
        );
        Ok(())
    }

    /// Return the deposit to the trustor before expiration.
    ///
    /// Under [`DisposalPolicy::Destroy`] the whole custody balance is swept to
    /// the trustor and the instance is disposed. Returns the amount paid out.
    pub fn revoke(&self, caller: &Address) -> Result<Amount, EscrowError> {
        let mut state = self.lock();
        guard::not_disposed(&state)?;
        guard::before_expiration(&state, self.clock())?;
        guard::only(&self.trustor, caller)?;
        guard::revocable(self.revocable)?;
        let amount = guard::funded(&state)?;

        let payout = match self.disposal {
            DisposalPolicy::Destroy => self.ctx.assets.balance_of(&self.custody).max(amount),
            DisposalPolicy::Retain => amount,
        };

        let previous = state.clone();
        state.deposited_amount = Amount::ZERO;
        state.status = EscrowStatus::Revoked;

        if let Err(e) = self.ctx.assets.transfer(&self.custody, &self.trustor, payout) {
            *state = previous;
            warn!(escrow = %self.id, %payout, error = %e, "revoke transfer failed, rolled back");
            return Err(e.into());
        }

        self.emit(EscrowEvent::Revoked {
            escrow: self.id,
            trustor: self.trustor.clone(),
            amount,
        });
        if self.disposal == DisposalPolicy::Destroy {
            state.disposed = true;
        }
        info!(
            escrow = %self.id,
            trustor = %self.trustor,
            %amount,
            %payout,
            disposal = ?self.disposal,
            "escrow revoked"
        );
        Ok(payout)
    }

    /// Pay the deposit to the beneficiary after expiration. Returns the amount paid.
    pub fn withdraw(&self, caller: &Address) -> Result<Amount, EscrowError> {
        let mut state = self.lock();
        guard::not_disposed(&state)?;
        guard::after_expiration(&state, self.clock())?;
        guard::only(&state.beneficiary, caller)?;
        let amount = guard::funded(&state)?;

        let previous = state.clone();
        state.deposited_amount = Amount::ZERO;
        state.status = EscrowStatus::Withdrawn;

        if let Err(e) = self.ctx.assets.transfer(&self.custody, caller, amount) {
            *state = previous;
            warn!(escrow = %self.id, %amount, error = %e, "withdraw transfer failed, rolled back");
            return Err(e.into());
        }

        self.emit(EscrowEvent::Withdraw {
            escrow: self.id,
            beneficiary: caller.clone(),
            amount,
        });
        info!(escrow = %self.id, beneficiary = %caller, %amount, "escrow withdrawn");
        Ok(amount)
    }

    /// Reschedule expiration to `now + new_duration_secs`.
    ///
    /// The new expiration may be earlier than the current one; a zero
    /// duration opens withdrawal one second later.
    pub fn change_expiration(
        &self,
        caller: &Address,
        new_duration_secs: u64,
    ) -> Result<Timestamp, EscrowError> {
        let mut state = self.lock();
        guard::not_disposed(&state)?;
        guard::revocable(self.revocable)?;
        guard::only(&self.trustor, caller)?;
        guard::not_terminated(&state)?;
        guard::before_expiration(&state, self.clock())?;

        let new = self
            .clock()
            .now()
            .checked_add_secs(new_duration_secs)
            .ok_or(EscrowError::Overflow)?;
        let old = std::mem::replace(&mut state.expiration, new);

        self.emit(EscrowEvent::ExpirationChanged {
            escrow: self.id,
            old,
            new,
        });
        info!(escrow = %self.id, %old, %new, "expiration changed");
        Ok(new)
    }

    /// Retarget the escrow to `new_beneficiary`.
    pub fn change_beneficiary(
        &self,
        caller: &Address,
        new_beneficiary: Address,
    ) -> Result<(), EscrowError> {
        let mut state = self.lock();
        guard::not_disposed(&state)?;
        guard::revocable(self.revocable)?;
        guard::only(&self.trustor, caller)?;
        guard::not_terminated(&state)?;
        guard::before_expiration(&state, self.clock())?;
        guard::valid_beneficiary(&new_beneficiary)?;

        let old = std::mem::replace(&mut state.beneficiary, new_beneficiary.clone());

        self.emit(EscrowEvent::BeneficiaryChanged {
            escrow: self.id,
            old: old.clone(),
            new: new_beneficiary.clone(),
        });
        info!(escrow = %self.id, %old, new = %new_beneficiary, "beneficiary changed");
        Ok(())
    }

    /// Value sent outside the defined operations is always refused.
    pub fn on_unsolicited_transfer(
        &self,
        from: &Address,
        amount: Amount,
    ) -> Result<(), EscrowError> {
        debug!(escrow = %self.id, from = %from, %amount, "unsolicited transfer rejected");
        Err(EscrowError::UnexpectedTransfer {
            from: from.to_string(),
            amount: amount.raw(),
        })
    }

    // ── Queries ────────────────────────────────────────────────────────

    pub fn id(&self) -> EscrowId {
        self.id
    }

    /// The account holding this escrow's deposit.
    pub fn custody(&self) -> &Address {
        &self.custody
    }

    pub fn disposal(&self) -> DisposalPolicy {
        self.disposal
    }

    pub fn is_disposed(&self) -> bool {
        self.lock().disposed
    }

    /// Every stored field at once.
    pub fn view(&self) -> Result<EscrowView, EscrowError> {
        let state = self.lock();
        guard::not_disposed(&state)?;
        Ok(EscrowView {
            id: self.id,
            trustor: self.trustor.clone(),
            beneficiary: state.beneficiary.clone(),
            revocable: self.revocable,
            expiration: state.expiration,
            deposited_amount: state.deposited_amount,
            already_deposited: state.already_deposited,
            asset: self.asset.clone(),
            status: state.status,
        })
    }

    pub fn trustor(&self) -> Result<Address, EscrowError> {
        guard::not_disposed(&self.lock())?;
        Ok(self.trustor.clone())
    }

    pub fn beneficiary(&self) -> Result<Address, EscrowError> {
        self.read(|s| s.beneficiary.clone())
    }

    pub fn revocable(&self) -> Result<bool, EscrowError> {
        guard::not_disposed(&self.lock())?;
        Ok(self.revocable)
    }

    pub fn expiration(&self) -> Result<Timestamp, EscrowError> {
        self.read(|s| s.expiration)
    }

    pub fn deposited_amount(&self) -> Result<Amount, EscrowError> {
        self.read(|s| s.deposited_amount)
    }

    pub fn already_deposited(&self) -> Result<bool, EscrowError> {
        self.read(|s| s.already_deposited)
    }

    pub fn asset(&self) -> Result<AssetKind, EscrowError> {
        guard::not_disposed(&self.lock())?;
        Ok(self.asset.clone())
    }

    pub fn status(&self) -> Result<EscrowStatus, EscrowError> {
        self.read(|s| s.status)
    }

    /// Funded, revocable and before expiration: the trustor may still act.
    pub fn is_mutable(&self) -> Result<bool, EscrowError> {
        let state = self.lock();
        guard::not_disposed(&state)?;
        Ok(self.revocable
            && state.status == EscrowStatus::Funded
            && guard::before_expiration(&state, self.clock()).is_ok())
    }

    /// Seconds left until expiration, zero once it has passed.
    pub fn seconds_until_expiration(&self) -> Result<u64, EscrowError> {
        let state = self.lock();
        guard::not_disposed(&state)?;
        Ok(state.expiration.remaining_from(self.clock().now()))
    }

    // ── Internals ──────────────────────────────────────────────────────

    fn read<T>(&self, f: impl FnOnce(&EscrowState) -> T) -> Result<T, EscrowError> {
        let state = self.lock();
        guard::not_disposed(&state)?;
        Ok(f(&state))
    }

    pub(crate) fn state_copy(&self) -> EscrowState {
        self.lock().clone()
    }

    pub(crate) fn context(&self) -> &EscrowContext {
        &self.ctx
    }

    fn clock(&self) -> &dyn Clock {
        self.ctx.clock.as_ref()
    }

    /// Called with the instance lock held so per-escrow records stay ordered.
    fn emit(&self, event: EscrowEvent) {
        self.ctx.events.append(self.clock().now(), event);
    }

    // A panicking port leaves the state as it was before the panicking call
    // or fully applied; both are consistent.
    fn lock(&self) -> MutexGuard<'_, EscrowState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for EscrowInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EscrowInstance")
            .field("id", &self.id)
            .field("trustor", &self.trustor)
            .field("revocable", &self.revocable)
            .field("asset", &self.asset)
            .field("disposal", &self.disposal)
            .field("state", &self.state_copy())
            .finish()
    }
}
