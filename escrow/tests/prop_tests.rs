use std::sync::Arc;

use proptest::prelude::*;

use timelock_escrow::{EscrowContext, EscrowError, EscrowInstance, EscrowParams, EventLog};
use timelock_nullables::{NullClock, NullLedger};
use timelock_ports::AssetTransfer;
use timelock_types::{Address, Amount, AssetKind, DisposalPolicy, EscrowId};

const START: u64 = 1_000_000;

fn setup(
    revocable: bool,
    duration: u64,
    disposal: DisposalPolicy,
) -> (EscrowInstance, Arc<NullClock>, Arc<NullLedger>, Arc<EventLog>) {
    let clock = Arc::new(NullClock::new(START));
    let ledger = Arc::new(NullLedger::new());
    let events = Arc::new(EventLog::new());
    ledger.mint(&Address::new("alice"), u64::MAX as u128);
    let escrow = EscrowInstance::new(
        EscrowParams {
            id: EscrowId::FIRST,
            trustor: Address::new("alice"),
            beneficiary: Address::new("bob"),
            revocable,
            duration_secs: duration,
            asset: AssetKind::Native,
            disposal: Some(disposal),
        },
        EscrowContext {
            assets: ledger.clone(),
            clock: clock.clone(),
            events: events.clone(),
        },
    )
    .unwrap();
    (escrow, clock, ledger, events)
}

fn disposal_strategy() -> impl Strategy<Value = DisposalPolicy> {
    prop_oneof![Just(DisposalPolicy::Destroy), Just(DisposalPolicy::Retain)]
}

proptest! {
    /// A deposit succeeds at most once, whatever the amount or the time of the retry.
    #[test]
    fn deposit_succeeds_at_most_once(
        duration in 1u64..10_000,
        first in 1u128..1_000_000,
        second in 0u128..1_000_000,
        later in 0u64..20_000,
    ) {
        let (escrow, clock, _ledger, events) = setup(true, duration, DisposalPolicy::Retain);
        escrow.deposit(&Address::new("alice"), Amount::new(first)).unwrap();
        clock.advance(later);
        prop_assert_eq!(
            escrow.deposit(&Address::new("alice"), Amount::new(second)),
            Err(EscrowError::AlreadyDeposited)
        );
        prop_assert_eq!(escrow.deposited_amount().unwrap(), Amount::new(first));
        prop_assert_eq!(events.len(), 1);
    }

    /// Withdraw never succeeds at or before expiration; revoke never succeeds at or after it.
    #[test]
    fn terminal_transitions_respect_expiration(
        duration in 1u64..10_000,
        offset in 0u64..20_000,
        revocable in any::<bool>(),
    ) {
        let (escrow, clock, _ledger, _events) = setup(revocable, duration, DisposalPolicy::Retain);
        escrow.deposit(&Address::new("alice"), Amount::new(100)).unwrap();
        clock.advance(offset);
        if offset <= duration {
            prop_assert_eq!(escrow.withdraw(&Address::new("bob")), Err(EscrowError::NotYetExpired));
        }
        if offset >= duration {
            prop_assert_eq!(
                escrow.revoke(&Address::new("alice")),
                Err(EscrowError::AlreadyExpired)
            );
        }
    }

    /// After either terminal transition, nothing moves value again.
    #[test]
    fn terminal_transitions_are_exclusive(
        duration in 2u64..10_000,
        amount in 1u128..1_000_000,
        revoke_first in any::<bool>(),
        disposal in disposal_strategy(),
    ) {
        let (escrow, clock, ledger, _events) = setup(true, duration, disposal);
        let alice = Address::new("alice");
        let bob = Address::new("bob");
        escrow.deposit(&alice, Amount::new(amount)).unwrap();

        if revoke_first {
            prop_assert_eq!(escrow.revoke(&alice), Ok(Amount::new(amount)));
        } else {
            clock.advance(duration + 1);
            prop_assert_eq!(escrow.withdraw(&bob), Ok(Amount::new(amount)));
        }

        prop_assert!(escrow.revoke(&alice).is_err());
        clock.advance(duration + 1);
        prop_assert!(escrow.withdraw(&bob).is_err());
        prop_assert_eq!(ledger.balance_of(escrow.custody()), Amount::ZERO);
        if let Ok(held) = escrow.deposited_amount() {
            prop_assert_eq!(held, Amount::ZERO);
        }
    }

    /// Irrevocable escrows refuse every mutation, from anyone, at any time.
    #[test]
    fn irrevocable_refuses_mutation(
        duration in 1u64..10_000,
        offset in 0u64..20_000,
        caller in prop_oneof![Just("alice"), Just("bob"), Just("mallory")],
        new_duration in any::<u64>(),
    ) {
        let (escrow, clock, _ledger, _events) = setup(false, duration, DisposalPolicy::Retain);
        escrow.deposit(&Address::new("alice"), Amount::new(10)).unwrap();
        clock.advance(offset);
        let caller = Address::new(caller);
        prop_assert_eq!(
            escrow.change_beneficiary(&caller, Address::new("carol")),
            Err(EscrowError::NotRevocable)
        );
        prop_assert_eq!(
            escrow.change_expiration(&caller, new_duration),
            Err(EscrowError::NotRevocable)
        );
    }

    /// The countdown never increases as time advances and never goes below zero.
    #[test]
    fn countdown_is_monotone(
        duration in 0u64..10_000,
        steps in prop::collection::vec(0u64..1_000, 1..20),
    ) {
        let (escrow, clock, _ledger, _events) = setup(true, duration, DisposalPolicy::Retain);
        let mut last = escrow.seconds_until_expiration().unwrap();
        prop_assert_eq!(last, duration);
        for step in steps {
            clock.advance(step);
            let now = escrow.seconds_until_expiration().unwrap();
            prop_assert!(now <= last);
            last = now;
        }
    }
}
