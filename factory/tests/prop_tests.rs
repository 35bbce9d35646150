use std::sync::Arc;

use proptest::prelude::*;

use timelock_escrow::{EscrowContext, EventLog};
use timelock_factory::{CreateEscrow, EscrowFactory, FactoryConfig, FactoryError};
use timelock_nullables::{NullClock, NullFeeCollector, NullLedger};
use timelock_ports::AssetTransfer;
use timelock_types::{Address, Amount};

fn setup(fee: u64) -> (EscrowFactory, Arc<NullLedger>, Arc<NullFeeCollector>) {
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

proptest! {
    /// Once closed, no creation succeeds, however well funded.
    #[test]
    fn closed_factory_never_creates(
        fee in 0u64..1_000,
        deposit in 1u128..1_000_000,
        duration in 0u64..100_000,
        revocable in any::<bool>(),
    ) {
        let (factory, ledger, fees) = setup(fee);
        let alice = Address::new("alice");
        ledger.mint(&alice, deposit);
        fees.mint(&alice, fee as u128);
        factory.close_factory(&Address::new("operator")).unwrap();

        let result = factory.create_escrow(&alice, CreateEscrow {
            beneficiary: Address::new("bob"),
            revocable,
            duration_secs: duration,
            deposit: Amount::new(deposit),
        });
        prop_assert_eq!(result.unwrap_err(), FactoryError::FactoryClosed);
        prop_assert_eq!(fees.total_burned(), 0);
        prop_assert!(factory.events().is_empty());
    }

    /// A creation either burns the fee and moves the deposit, or does neither.
    #[test]
    fn creation_is_all_or_nothing(
        fee in 0u64..1_000,
        fee_balance in 0u128..2_000,
        deposit in 1u128..10_000,
        balance in 0u128..20_000,
    ) {
        let (factory, ledger, fees) = setup(fee);
        let alice = Address::new("alice");
        ledger.mint(&alice, balance);
        fees.mint(&alice, fee_balance);

        let result = factory.create_escrow(&alice, CreateEscrow {
            beneficiary: Address::new("bob"),
            revocable: true,
            duration_secs: 60,
            deposit: Amount::new(deposit),
        });

        match result {
            Ok(escrow) => {
                prop_assert_eq!(fees.total_burned(), fee as u128);
                prop_assert_eq!(ledger.balance_of(escrow.custody()), Amount::new(deposit));
                prop_assert_eq!(factory.events().len(), 2);
            }
            Err(_) => {
                prop_assert_eq!(fees.total_burned(), 0);
                prop_assert_eq!(fees.balance_of(&alice), fee_balance);
                prop_assert_eq!(ledger.balance_of(&alice), Amount::new(balance));
                prop_assert_eq!(factory.count(), 0);
                prop_assert!(factory.events().is_empty());
            }
        }
        prop_assert_eq!(
            factory.count() == 1,
            fee_balance >= fee as u128 && balance >= deposit
        );
    }
}
