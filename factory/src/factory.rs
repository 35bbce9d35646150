//! Fee-gated escrow creation and owner administration.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, error, info};

use timelock_escrow::{
    EscrowContext, EscrowError, EscrowEvent, EscrowInstance, EscrowParams, EventLog,
};
use timelock_ports::FeeCollector;
use timelock_types::{Address, Amount, AssetKind, DisposalPolicy, EscrowId};

use crate::config::FactoryConfig;
use crate::error::FactoryError;

/// Arguments of [`EscrowFactory::create_escrow`]. The caller becomes the trustor.
#[derive(Clone, Debug)]
pub struct CreateEscrow {
    pub beneficiary: Address,
    pub revocable: bool,
    pub duration_secs: u64,
    pub deposit: Amount,
}

/// Owner-controlled state, serialised with every creation.
struct AdminState {
    creation_fee: Amount,
    closed: bool,
    next_id: EscrowId,
}

/// Creates funded escrows; holds the kill-switch and the creation fee.
pub struct EscrowFactory {
    owner: Address,
    asset: AssetKind,
    disposal: DisposalPolicy,
    admin: Mutex<AdminState>,
    registry: Mutex<BTreeMap<EscrowId, Arc<EscrowInstance>>>,
    fees: Arc<dyn FeeCollector>,
    ctx: EscrowContext,
}

impl EscrowFactory {
    pub fn new(
        config: FactoryConfig,
        ctx: EscrowContext,
        fees: Arc<dyn FeeCollector>,
    ) -> Result<Self, FactoryError> {
        config.validate()?;
        let disposal = config.effective_disposal();
        info!(
            owner = %config.owner,
            asset = %config.asset,
            fee = %config.creation_fee,
            ?disposal,
            "escrow factory started"
        );
        Ok(Self {
            admin: Mutex::new(AdminState {
                creation_fee: config.creation_fee,
                closed: false,
                next_id: EscrowId::FIRST,
            }),
            owner: config.owner,
            asset: config.asset,
            disposal,
            registry: Mutex::new(BTreeMap::new()),
            fees,
            ctx,
        })
    }

    /// Burn the fee, construct and fund a new escrow, and record it.
    ///
    /// Either every step commits or none is observable: a failure after the
    /// fee burn reimburses the fee, and the instance is registered (and the
    /// `NewTrust` record emitted) only after its deposit has succeeded.
    pub fn create_escrow(
        &self,
        caller: &Address,
        request: CreateEscrow,
    ) -> Result<Arc<EscrowInstance>, FactoryError> {
        let mut admin = lock(&self.admin);
        if admin.closed {
            debug!(caller = %caller, "creation rejected: factory closed");
            return Err(FactoryError::FactoryClosed);
        }
        if request.deposit.is_zero() {
            return Err(EscrowError::ZeroAmount.into());
        }
        let id = admin.next_id;
        let following = id.next().ok_or(FactoryError::Overflow)?;
        let fee = admin.creation_fee;

        if let Err(e) = self.fees.burn(caller, fee) {
            debug!(caller = %caller, %fee, error = %e, "creation rejected: fee burn failed");
            return Err(FactoryError::FeeBurnFailed(e));
        }

        let funded = EscrowInstance::new(
            EscrowParams {
                id,
                trustor: caller.clone(),
                beneficiary: request.beneficiary.clone(),
                revocable: request.revocable,
                duration_secs: request.duration_secs,
                asset: self.asset.clone(),
                disposal: Some(self.disposal),
            },
            self.ctx.clone(),
        )
        .and_then(|escrow| {
            escrow.deposit(caller, request.deposit)?;
            Ok(escrow)
        });

        let escrow = match funded {
            Ok(escrow) => Arc::new(escrow),
            Err(cause) => return Err(self.reimburse_fee(caller, fee, cause)),
        };

        admin.next_id = following;
        lock(&self.registry).insert(id, Arc::clone(&escrow));
        self.ctx.events.append(
            self.ctx.clock.now(),
            EscrowEvent::NewTrust {
                trustor: caller.clone(),
                beneficiary: request.beneficiary.clone(),
                escrow: id,
                amount: request.deposit,
            },
        );
        info!(
            escrow = %id,
            trustor = %caller,
            beneficiary = %request.beneficiary,
            amount = %request.deposit,
            %fee,
            "escrow created"
        );
        Ok(escrow)
    }

    /// Permanently stop new creations. Existing escrows are unaffected.
    pub fn close_factory(&self, caller: &Address) -> Result<(), FactoryError> {
        self.only_owner(caller)?;
        let mut admin = lock(&self.admin);
        if admin.closed {
            return Err(FactoryError::FactoryClosed);
        }
        admin.closed = true;
        info!(owner = %caller, "escrow factory closed");
        Ok(())
    }

    /// Replace the creation fee. No bounds are enforced.
    pub fn change_fee(&self, caller: &Address, new_fee: Amount) -> Result<(), FactoryError> {
        self.only_owner(caller)?;
        let mut admin = lock(&self.admin);
        let old = std::mem::replace(&mut admin.creation_fee, new_fee);
        info!(owner = %caller, %old, new = %new_fee, "creation fee changed");
        Ok(())
    }

    // ── Queries ────────────────────────────────────────────────────────

    pub fn owner(&self) -> &Address {
        &self.owner
    }

    pub fn asset(&self) -> &AssetKind {
        &self.asset
    }

    pub fn disposal(&self) -> DisposalPolicy {
        self.disposal
    }

    pub fn creation_fee(&self) -> Amount {
        lock(&self.admin).creation_fee
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.admin).closed
    }

    pub fn events(&self) -> &Arc<EventLog> {
        &self.ctx.events
    }

    pub fn get(&self, id: EscrowId) -> Option<Arc<EscrowInstance>> {
        lock(&self.registry).get(&id).cloned()
    }

    /// Number of escrows ever created, including disposed ones.
    pub fn count(&self) -> usize {
        lock(&self.registry).len()
    }

    /// Escrows created by `trustor` that have not been disposed.
    pub fn escrows_by_trustor(&self, trustor: &Address) -> Vec<Arc<EscrowInstance>> {
        self.select(|escrow| escrow.trustor().map(|t| &t == trustor).unwrap_or(false))
    }

    /// Escrows whose current beneficiary is `beneficiary`.
    pub fn escrows_by_beneficiary(&self, beneficiary: &Address) -> Vec<Arc<EscrowInstance>> {
        self.select(|escrow| {
            escrow
                .beneficiary()
                .map(|b| &b == beneficiary)
                .unwrap_or(false)
        })
    }

    // ── Internals ──────────────────────────────────────────────────────

    fn select(&self, keep: impl Fn(&EscrowInstance) -> bool) -> Vec<Arc<EscrowInstance>> {
        lock(&self.registry)
            .values()
            .filter(|escrow| keep(escrow))
            .cloned()
            .collect()
    }

    fn only_owner(&self, caller: &Address) -> Result<(), FactoryError> {
        if caller != &self.owner {
            debug!(caller = %caller, "admin call rejected: not owner");
            return Err(FactoryError::NotOwner);
        }
        Ok(())
    }

    fn reimburse_fee(&self, caller: &Address, fee: Amount, cause: EscrowError) -> FactoryError {
        match self.fees.reimburse(caller, fee) {
            Ok(()) => {
                debug!(
                    caller = %caller,
                    %fee,
                    error = %cause,
                    "creation rolled back, fee reimbursed"
                );
                FactoryError::Escrow(cause)
            }
            Err(rollback) => {
                error!(
                    caller = %caller,
                    %fee,
                    error = %cause,
                    rollback = %rollback,
                    "creation rollback failed"
                );
                FactoryError::RollbackFailed { cause, rollback }
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use timelock_nullables::{NullClock, NullFeeCollector, NullLedger};

    fn factory(fee: u64) -> (EscrowFactory, Arc<NullLedger>, Arc<NullFeeCollector>) {
        let ledger = Arc::new(NullLedger::new());
        let fees = Arc::new(NullFeeCollector::new());
        let mut config = FactoryConfig::new(Address::new("operator"));
        config.creation_fee = Amount::new(fee.into());
        let factory = EscrowFactory::new(
            config,
            EscrowContext {
                assets: ledger.clone(),
                clock: Arc::new(NullClock::new(0)),
                events: Arc::new(EventLog::new()),
            },
            fees.clone(),
        )
        .unwrap();
        (factory, ledger, fees)
    }

    fn request(deposit: u128) -> CreateEscrow {
        CreateEscrow {
            beneficiary: Address::new("bob"),
            revocable: true,
            duration_secs: 100,
            deposit: Amount::new(deposit),
        }
    }

    #[test]
    fn ids_are_sequential_and_skip_failed_creations() {
        let (factory, ledger, _fees) = factory(0);
        let alice = Address::new("alice");
        ledger.mint(&alice, 100);

        let first = factory.create_escrow(&alice, request(10)).unwrap();
        assert!(factory.create_escrow(&alice, request(1_000)).is_err());
        let second = factory.create_escrow(&alice, request(10)).unwrap();

        assert_eq!(first.id(), EscrowId::new(1));
        assert_eq!(second.id(), EscrowId::new(2));
        assert_eq!(factory.count(), 2);
    }

    #[test]
    fn only_owner_administers() {
        let (factory, _ledger, _fees) = factory(10);
        let mallory = Address::new("mallory");
        assert_eq!(
            factory.change_fee(&mallory, Amount::ZERO),
            Err(FactoryError::NotOwner)
        );
        assert_eq!(factory.close_factory(&mallory), Err(FactoryError::NotOwner));
        assert_eq!(factory.creation_fee(), Amount::new(10));
        assert!(!factory.is_closed());

        factory
            .change_fee(&Address::new("operator"), Amount::new(u128::MAX))
            .unwrap();
        assert_eq!(factory.creation_fee(), Amount::new(u128::MAX));
    }

    #[test]
    fn zero_deposit_is_rejected_before_fee_burn() {
        let (factory, _ledger, fees) = factory(5);
        let alice = Address::new("alice");
        fees.mint(&alice, 5);
        assert_eq!(
            factory.create_escrow(&alice, request(0)).unwrap_err(),
            FactoryError::Escrow(EscrowError::ZeroAmount)
        );
        assert_eq!(fees.balance_of(&alice), 5);
    }

    #[test]
    fn failed_reimbursement_is_reported() {
        let (factory, _ledger, fees) = factory(5);
        let alice = Address::new("alice");
        fees.mint(&alice, 5);
        fees.fail_reimburse(true);
        let err = factory.create_escrow(&alice, request(10)).unwrap_err();
        assert!(matches!(
            err,
            FactoryError::RollbackFailed {
                cause: EscrowError::InsufficientBalance { .. },
                ..
            }
        ));
        assert_eq!(factory.count(), 0);
        assert!(factory.events().is_empty());
    }
}
